//! Events, effects, and configuration for the pairing core.

use strangers_common::UserId;

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Something a user did, already decoded by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserEvent {
    /// The user opened the chat (`/start`). `name` is their display name.
    StartCommand { name: String },
    /// Join the queue, or pair with whoever is waiting.
    RequestMatch,
    /// Drop the current partner (or queue slot) and look for a new one.
    Rotate,
    /// End the session or leave the queue.
    Leave,
    /// Forward content to the partner untouched.
    Relay(String),
}

impl UserEvent {
    /// Short name for logs; never includes relayed content.
    pub fn name(&self) -> &'static str {
        match self {
            UserEvent::StartCommand { .. } => "start",
            UserEvent::RequestMatch => "request_match",
            UserEvent::Rotate => "rotate",
            UserEvent::Leave => "leave",
            UserEvent::Relay(_) => "relay",
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A notice the transport should render and send to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Welcome { name: String, group_link: String },
    Waiting,
    Connected,
    PartnerLeft,
    LeftSession,
    LeftQueue,
    AlreadyInSession,
    AlreadyWaiting,
    NotInSession,
    Relayed { payload: String },
}

/// One delivery intent produced by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Effect {
    pub to: UserId,
    pub message: OutboundMessage,
}

impl Effect {
    pub fn new(to: UserId, message: OutboundMessage) -> Self {
        Self { to, message }
    }
}

// ---------------------------------------------------------------------------
// State views
// ---------------------------------------------------------------------------

/// Where a user currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserState {
    Idle,
    Waiting,
    Paired(UserId),
}

/// Point-in-time counters, used by the health endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    pub waiting: usize,
    pub active_sessions: usize,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Static settings the coordinator needs to build notices.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Optional community link shown in the welcome notice.
    pub group_link: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            group_link: "https://t.me/randomchat_global".into(),
        }
    }
}
