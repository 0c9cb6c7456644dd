//! strangers configuration system.
//!
//! Provides TOML-based configuration with full validation. All config
//! sections use defaults so partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use strangers_config::load_config;
//!
//! let config = load_config(None).expect("failed to load config");
//! println!("listening on {}:{}", config.server.bind, config.server.port);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{LogLevel, StrangersConfig};

use std::path::Path;
use strangers_common::ConfigError;

/// Load and validate the config.
///
/// With `path`, that file must exist. Without it the platform default path
/// is used, and a commented default file is created there if missing.
pub fn load_config(path: Option<&Path>) -> Result<StrangersConfig, ConfigError> {
    let config = match path {
        Some(path) => toml_loader::load_from_path(path)?,
        None => toml_loader::load_default()?,
    };

    validation::validate(&config)?;
    Ok(config)
}
