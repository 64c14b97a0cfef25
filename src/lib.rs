// src/lib.rs - Library root for scholarchat

pub mod api;
pub mod cli;
pub mod infra;
pub mod provider;
pub mod relay;
pub mod session;
pub mod topic;
pub mod util;
