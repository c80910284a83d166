pub mod database;
pub mod email;
pub mod feed;
pub mod jwt;
pub mod rate_limit;

use std::env;

/// Parse a boolean flag from the environment, accepting the usual spellings.
pub(crate) fn parse_bool_env(var_name: &str, default: bool) -> bool {
    env::var(var_name)
        .ok()
        .and_then(|value| match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "y" | "on" => Some(true),
            "0" | "false" | "no" | "n" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}
