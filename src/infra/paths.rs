// src/infra/paths.rs - Config location
//
// SCHOLARCHAT_HOME overrides everything. Otherwise config lives in
// ~/.scholarchat/, falling back to the platform config dir when no home
// directory can be determined.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

fn scholarchat_home() -> Option<PathBuf> {
    std::env::var_os("SCHOLARCHAT_HOME").map(PathBuf::from)
}

/// Configuration directory: $SCHOLARCHAT_HOME/ or ~/.scholarchat/
pub fn config_dir() -> PathBuf {
    if let Some(home) = scholarchat_home() {
        return home;
    }
    if let Some(base) = BaseDirs::new() {
        return base.home_dir().join(".scholarchat");
    }
    ProjectDirs::from("", "", "scholarchat")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".scholarchat"))
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}
