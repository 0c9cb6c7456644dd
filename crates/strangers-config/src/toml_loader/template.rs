//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# strangers relay configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[server]
# bind = "0.0.0.0"
# port = 8080            # 1024-65535, WebSocket clients connect here
# health_port = 8081     # 1024-65535, plain HTTP liveness endpoint
# hello_timeout = 10     # seconds, 1-60

[matching]
# group_link = "https://t.me/randomchat_global"
# outbound_buffer = 256  # 16-4096 frames per connection
# max_frame_kib = 64     # 1-1024

[logging]
# level = "INFO"         # DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
