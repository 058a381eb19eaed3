//! Creditkitd lib

pub mod cli;
pub mod config;
pub mod env_vars;
