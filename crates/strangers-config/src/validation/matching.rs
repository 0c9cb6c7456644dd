//! Validation for the `[matching]` section.

use std::sync::LazyLock;

use regex::Regex;

use crate::schema::StrangersConfig;

use super::helpers::validate_range;

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://\S+$").unwrap());

/// Validate pairing and relay constraints.
pub(crate) fn validate_matching(errors: &mut Vec<String>, config: &StrangersConfig) {
    let matching = &config.matching;

    if !LINK_RE.is_match(&matching.group_link) {
        errors.push(format!(
            "matching.group_link = {:?} is not an http(s) URL",
            matching.group_link
        ));
    }
    validate_range(
        errors,
        "matching.outbound_buffer",
        matching.outbound_buffer,
        16,
        4096,
    );
    validate_range(
        errors,
        "matching.max_frame_kib",
        matching.max_frame_kib,
        1,
        1024,
    );
}
