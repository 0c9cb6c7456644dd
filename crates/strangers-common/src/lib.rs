pub mod errors;
pub mod events;
pub mod id;

pub use errors::{ConfigError, StrangersError};
pub use events::{Event, EventBus};
pub use id::{new_correlation_id, new_id, ConnectionId, UserId};

pub type Result<T> = std::result::Result<T, StrangersError>;
