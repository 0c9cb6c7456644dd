use serde::{Deserialize, Serialize};

/// Pairing and relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Community link advertised in the welcome notice.
    pub group_link: String,
    /// Frames queued per connection before sends start waiting (16-4096).
    pub outbound_buffer: u32,
    /// Largest accepted WebSocket frame in KiB (1-1024).
    pub max_frame_kib: u32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            group_link: "https://t.me/randomchat_global".into(),
            outbound_buffer: 256,
            max_frame_kib: 64,
        }
    }
}
