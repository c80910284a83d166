use crate::config::parse_bool_env;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::Response;
use std::{env, sync::OnceLock};

pub const SESSION_COOKIE: &str = "session";
pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone)]
struct CookieConfig {
    secure: bool,
    same_site: &'static str,
}

impl CookieConfig {
    fn from_env() -> Self {
        let same_site = parse_same_site(
            &env::var("SESSION_COOKIE_SAMESITE").unwrap_or_else(|_| "Lax".to_string()),
        );
        // Browsers reject SameSite=None cookies that are not Secure.
        let secure = parse_bool_env("SESSION_COOKIE_SECURE", false) || same_site == "None";

        Self { secure, same_site }
    }
}

fn cookie_config() -> &'static CookieConfig {
    static CONFIG: OnceLock<CookieConfig> = OnceLock::new();
    CONFIG.get_or_init(CookieConfig::from_env)
}

fn parse_same_site(value: &str) -> &'static str {
    match value.trim().to_ascii_lowercase().as_str() {
        "strict" => "Strict",
        "none" => "None",
        _ => "Lax",
    }
}

/// Build a `Set-Cookie` value. Without `max_age` the cookie lasts for the
/// browser session.
pub fn build_cookie(name: &str, value: &str, max_age_seconds: Option<u64>) -> String {
    let config = cookie_config();
    let mut cookie = format!(
        "{name}={value}; Path=/; HttpOnly; SameSite={}",
        config.same_site
    );

    if let Some(max_age) = max_age_seconds {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    if config.secure {
        cookie.push_str("; Secure");
    }

    cookie
}

pub fn build_clear_cookie(name: &str) -> String {
    let config = cookie_config();
    let mut cookie = format!(
        "{name}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite={}",
        config.same_site
    );

    if config.secure {
        cookie.push_str("; Secure");
    }

    cookie
}

pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie_header| {
            cookie_header.split(';').find_map(|cookie| {
                let (key, value) = cookie.trim().split_once('=')?;
                (key.trim() == name && !value.trim().is_empty())
                    .then(|| value.trim().to_string())
            })
        })
}

pub fn append_set_cookie(response: &mut Response, cookie: &str) -> anyhow::Result<()> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|e| anyhow::anyhow!("Failed to build Set-Cookie header value: {}", e))?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(())
}

/// True if the response already sets (or clears) the named cookie.
pub fn sets_cookie(response: &Response, name: &str) -> bool {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&prefix))
}
