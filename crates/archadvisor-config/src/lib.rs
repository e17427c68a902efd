//! Layered TOML configuration for ArchAdvisor.
//!
//! A user config file and a project-local `archadvisor.toml` are merged,
//! later layers replacing whole sections of earlier ones. Sections convert
//! into the runtime configs of the store and event bus.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config, load_config_file, load_config_with_options, log_dir,
    user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
