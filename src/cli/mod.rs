// src/cli/mod.rs - CLI definition (clap derive)

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "scholarchat",
    about = "Scholarship assistant chat server with streamed Gemini replies",
    version
)]
pub struct Cli {
    /// Config file path (defaults to $SCHOLARCHAT_HOME/config.toml or ~/.scholarchat/config.toml)
    #[arg(long)]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides config and PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
