//! Configuration system for dockbridge.
//!
//! This module provides the configuration structures and CLI definitions for the
//! dockbridge application. Configuration loading and precedence merging is
//! handled by the `ortho_config` crate. Precedence: CLI flags override
//! environment variables, which override configuration files, which override
//! defaults.
//!
//! The configuration file is expected at `~/.config/dockbridge/config.toml` by
//! default.
//!
//! # Example Configuration
//!
//! ```toml
//! engine_socket = "unix:///run/user/1000/podman/podman.sock"
//! api_version = "1.41"
//! ```

mod cli;
mod loader;
mod types;


pub use cli::{Cli, Commands, RequestArgs};
pub use loader::{env_var_names, load_config};
pub use types::AppConfig;
