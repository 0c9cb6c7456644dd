//! Full configuration validation.
//!
//! Validates numeric ranges, port clashes, and the welcome link format.
//! Each section has its own submodule; this orchestrator calls them all
//! and collects errors into a single `ConfigError`.

mod helpers;
mod matching;
mod server;


use crate::schema::StrangersConfig;
use strangers_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &StrangersConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    server::validate_server(&mut errors, config);
    matching::validate_matching(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
