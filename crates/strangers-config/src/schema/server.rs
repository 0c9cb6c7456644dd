use serde::{Deserialize, Serialize};

/// Listener settings for the WebSocket transport and the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address both listeners bind to.
    pub bind: String,
    /// WebSocket port (valid range: 1024-65535).
    pub port: u32,
    /// Plain HTTP liveness endpoint port; must differ from `port`.
    pub health_port: u32,
    /// Seconds a new connection has to identify itself (valid range: 1-60).
    pub hello_timeout: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8080,
            health_port: 8081,
            hello_timeout: 10,
        }
    }
}
