//! Client-facing wire protocol: JSON text frames tagged by `type`.

use serde::{Deserialize, Serialize};
use strangers_core::UserEvent;

/// Reply-keyboard labels, in display order.
pub const START_CHAT_LABEL: &str = "🟢 Start Chat";
pub const NEXT_LABEL: &str = "🔄 Next";
pub const END_CHAT_LABEL: &str = "❌ End Chat";
pub const KEYBOARD: [&str; 3] = [START_CHAT_LABEL, NEXT_LABEL, END_CHAT_LABEL];

/// First message a client sends to identify itself.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientHello {
    #[serde(rename = "hello")]
    Hello {
        user_id: String,
        #[serde(default)]
        name: String,
    },
}

/// Every frame after the hello.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Start,
    Match,
    Next,
    End,
    Message { text: String },
}

impl ClientFrame {
    /// Decode into a core event. Messages that are exactly a keyboard label
    /// or `/start` count as the matching button press; everything else is
    /// relayed verbatim.
    pub fn into_event(self, name: &str) -> UserEvent {
        match self {
            ClientFrame::Start => UserEvent::StartCommand {
                name: name.to_string(),
            },
            ClientFrame::Match => UserEvent::RequestMatch,
            ClientFrame::Next => UserEvent::Rotate,
            ClientFrame::End => UserEvent::Leave,
            ClientFrame::Message { text } => {
                button_event(&text, name).unwrap_or(UserEvent::Relay(text))
            }
        }
    }
}

fn button_event(text: &str, name: &str) -> Option<UserEvent> {
    let event = match text {
        "/start" => UserEvent::StartCommand {
            name: name.to_string(),
        },
        START_CHAT_LABEL => UserEvent::RequestMatch,
        NEXT_LABEL => UserEvent::Rotate,
        END_CHAT_LABEL => UserEvent::Leave,
        _ => return None,
    };
    Some(event)
}

/// Messages the server sends to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Ready {
        user_id: String,
    },
    Notice {
        kind: String,
        text: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        keyboard: Vec<String>,
    },
    Message {
        text: String,
    },
    Error {
        message: String,
    },
}

impl ServerFrame {
    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error {
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!("{{\"type\":\"error\",\"message\":\"encode failed: {e}\"}}"))
    }
}
