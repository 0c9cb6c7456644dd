//! Anonymous one-to-one pairing core.
//!
//! Users wait in a FIFO queue until a partner shows up, then every message
//! they send is relayed to that partner until one side leaves. The
//! [`SessionCoordinator`] owns all of this state and turns each inbound
//! user event into a list of [`Effect`]s for the transport to deliver.
//! It never performs I/O itself.

pub mod coordinator;
pub mod error;
pub mod registry;
pub mod types;
pub mod wait_queue;

pub use coordinator::SessionCoordinator;
pub use error::MatchError;
pub use registry::PairRegistry;
pub use types::{CoordinatorConfig, CoordinatorStats, Effect, OutboundMessage, UserEvent, UserState};
pub use wait_queue::WaitQueue;
