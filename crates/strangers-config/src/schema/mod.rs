//! Configuration schema types for the strangers relay.
//!
//! All structs use `serde(default)` so partial configs work correctly.
//! Missing fields are filled with the defaults the bot has always used.

mod matching;
mod server;
mod system;

pub use matching::*;
pub use server::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Root configuration.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct StrangersConfig {
    pub server: ServerConfig,
    pub matching: MatchingConfig,
    pub logging: LoggingConfig,
}
