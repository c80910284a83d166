//! One-shot messages carried across a redirect in a cookie.
//!
//! The session middleware reads the incoming cookie into a [`Flash`] request
//! extension and clears it on the way out unless the handler set a new one.

use super::cookie::{append_set_cookie, build_cookie, extract_cookie, FLASH_COOKIE};
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, HeaderMap};
use axum::response::Response;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use std::convert::Infallible;

/// Message left by the previous request, if any.
#[derive(Debug, Clone, Default)]
pub struct Flash(pub Option<String>);

impl Flash {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let message = extract_cookie(headers, FLASH_COOKIE)
            .and_then(|raw| URL_SAFE_NO_PAD.decode(raw).ok())
            .and_then(|bytes| String::from_utf8(bytes).ok());
        Self(message)
    }
}

impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Flash>().cloned().unwrap_or_default())
    }
}

/// Attach a message to be shown on the next rendered page.
pub fn set_flash(response: &mut Response, message: &str) -> anyhow::Result<()> {
    let encoded = URL_SAFE_NO_PAD.encode(message.as_bytes());
    append_set_cookie(response, &build_cookie(FLASH_COOKIE, &encoded, Some(60)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    #[test]
    fn message_survives_cookie_encoding() {
        let mut response = Response::new(axum::body::Body::empty());
        set_flash(&mut response, "You are now following susan!").unwrap();

        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        let pair = set_cookie.split(';').next().unwrap().to_string();

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(&pair).unwrap());
        assert_eq!(
            Flash::from_headers(&headers).0.as_deref(),
            Some("You are now following susan!")
        );
    }

    #[test]
    fn garbage_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("flash=%%%"));
        assert!(Flash::from_headers(&headers).0.is_none());
    }
}
