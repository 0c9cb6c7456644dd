//! Validation for the `[server]` section.

use std::net::IpAddr;

use crate::schema::StrangersConfig;

use super::helpers::validate_range;

/// Validate listener constraints.
pub(crate) fn validate_server(errors: &mut Vec<String>, config: &StrangersConfig) {
    let server = &config.server;

    if server.bind.parse::<IpAddr>().is_err() {
        errors.push(format!("server.bind = {:?} is not an IP address", server.bind));
    }
    validate_range(errors, "server.port", server.port, 1024, 65535);
    validate_range(errors, "server.health_port", server.health_port, 1024, 65535);
    if server.port == server.health_port {
        errors.push(format!(
            "server.health_port = {} clashes with server.port",
            server.health_port
        ));
    }
    validate_range(errors, "server.hello_timeout", server.hello_timeout, 1, 60);
}
