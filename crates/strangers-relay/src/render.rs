//! Turns core notices into the user-facing frames.

use strangers_core::OutboundMessage;

use crate::protocol::{ServerFrame, KEYBOARD};

fn notice(kind: &str, text: impl Into<String>) -> ServerFrame {
    ServerFrame::Notice {
        kind: kind.to_string(),
        text: text.into(),
        keyboard: Vec::new(),
    }
}

/// Render one outbound message. Relayed content passes through untouched.
pub fn render(message: OutboundMessage) -> ServerFrame {
    match message {
        OutboundMessage::Welcome { name, group_link } => ServerFrame::Notice {
            kind: "welcome".into(),
            text: format!(
                "👋 Welcome {name}!\n\n\
                 👉 Join our group if you'd like (optional):\n{group_link}\n\n\
                 Then tap 🟢 Start Chat to meet a random stranger!"
            ),
            keyboard: KEYBOARD.iter().map(|label| label.to_string()).collect(),
        },
        OutboundMessage::Waiting => notice("waiting", "⏳ Waiting for a stranger to connect..."),
        OutboundMessage::Connected => notice("connected", "🎉 Connected to a stranger! Say hi!"),
        OutboundMessage::PartnerLeft => notice("partner_left", "👋 Stranger left the chat."),
        OutboundMessage::LeftSession => notice("left_session", "✅ You left the chat."),
        OutboundMessage::LeftQueue => notice("left_queue", "✅ You left the waiting queue."),
        OutboundMessage::AlreadyInSession => {
            notice("already_in_session", "⚠️ You're already in a chat.")
        }
        OutboundMessage::AlreadyWaiting => notice(
            "already_waiting",
            "⏳ You're already waiting for a stranger.",
        ),
        OutboundMessage::NotInSession => notice(
            "not_in_session",
            "🟡 You're not in a chat. Press 🟢 Start Chat.",
        ),
        OutboundMessage::Relayed { payload } => ServerFrame::Message { text: payload },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_includes_name_link_and_keyboard() {
        let frame = render(OutboundMessage::Welcome {
            name: "Ada".into(),
            group_link: "https://example.org/g".into(),
        });
        let ServerFrame::Notice {
            kind,
            text,
            keyboard,
        } = frame
        else {
            panic!("welcome should render as a notice");
        };
        assert_eq!(kind, "welcome");
        assert!(text.starts_with("👋 Welcome Ada!"));
        assert!(text.contains("https://example.org/g"));
        assert_eq!(keyboard, vec!["🟢 Start Chat", "🔄 Next", "❌ End Chat"]);
    }

    #[test]
    fn relayed_payload_is_untouched() {
        let payload = "  <b>raw</b> \u{1F600}\n".to_string();
        assert_eq!(
            render(OutboundMessage::Relayed {
                payload: payload.clone()
            }),
            ServerFrame::Message { text: payload }
        );
    }

    #[test]
    fn notices_carry_snake_case_kinds() {
        let cases = [
            (OutboundMessage::Waiting, "waiting"),
            (OutboundMessage::Connected, "connected"),
            (OutboundMessage::PartnerLeft, "partner_left"),
            (OutboundMessage::LeftSession, "left_session"),
            (OutboundMessage::LeftQueue, "left_queue"),
            (OutboundMessage::AlreadyInSession, "already_in_session"),
            (OutboundMessage::AlreadyWaiting, "already_waiting"),
            (OutboundMessage::NotInSession, "not_in_session"),
        ];
        for (message, expected) in cases {
            match render(message) {
                ServerFrame::Notice { kind, keyboard, .. } => {
                    assert_eq!(kind, expected);
                    assert!(keyboard.is_empty());
                }
                other => panic!("expected notice, got {other:?}"),
            }
        }
    }
}
