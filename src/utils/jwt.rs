use crate::config::jwt::JwtConfig;
use anyhow::Result;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

static JWT_CONFIG: OnceLock<JwtConfig> = OnceLock::new();

const SESSION: &str = "session";
const RESET_PASSWORD: &str = "reset_password";

/// Install the signing configuration. Must be called once at startup.
pub fn init_jwt_config(config: JwtConfig) -> Result<()> {
    JWT_CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!("JWT config already initialized"))?;
    Ok(())
}

pub fn config() -> Result<&'static JwtConfig> {
    JWT_CONFIG
        .get()
        .ok_or_else(|| anyhow::anyhow!("JWT config not initialized, call init_jwt_config() at startup"))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id for sessions, username for reset tokens.
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    pub token_type: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token invalid: {0}")]
    Invalid(String),
    #[error("token has the wrong purpose")]
    WrongType,
    #[error(transparent)]
    Config(#[from] anyhow::Error),
}

/// Sign a session token for `user_id`, valid for `ttl_seconds`.
pub fn encode_session_token(user_id: i32, ttl_seconds: i64) -> Result<String> {
    sign(&user_id.to_string(), SESSION, ttl_seconds)
}

/// Sign a password reset token embedding `username`.
pub fn encode_reset_password_token(username: &str, ttl_seconds: i64) -> Result<String> {
    sign(username, RESET_PASSWORD, ttl_seconds)
}

/// Returns the user id carried by a valid session token.
pub fn decode_session_token(token: &str) -> Result<i32, TokenError> {
    let claims = verify(token, SESSION)?;
    claims
        .sub
        .parse()
        .map_err(|_| TokenError::Invalid("non-numeric subject".to_string()))
}

/// Returns the username carried by a valid reset token.
pub fn decode_reset_password_token(token: &str) -> Result<String, TokenError> {
    verify(token, RESET_PASSWORD).map(|claims| claims.sub)
}

fn sign(sub: &str, token_type: &str, ttl_seconds: i64) -> Result<String> {
    let config = config()?;
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: sub.to_owned(),
        exp: (now + ttl_seconds).max(0) as usize,
        iat: now as usize,
        token_type: token_type.to_string(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| anyhow::anyhow!("Failed to encode {} token: {}", token_type, e))
}

fn verify(token: &str, expected_type: &str) -> Result<Claims, TokenError> {
    let config = config()?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid(e.to_string()),
    })?;

    if claims.token_type != expected_type {
        return Err(TokenError::WrongType);
    }
    Ok(claims)
}

#[cfg(test)]
pub(crate) fn ensure_test_config() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = init_jwt_config(JwtConfig {
            secret: "unit_test_secret_that_is_at_least_32_chars".to_string(),
            session_expiry: 3600,
            remember_me_expiry: 7200,
            reset_token_expiry: 600,
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_round_trip() {
        ensure_test_config();
        let token = encode_session_token(42, 60).unwrap();
        assert_eq!(decode_session_token(&token).unwrap(), 42);
    }

    #[test]
    fn reset_token_round_trip() {
        ensure_test_config();
        let token = encode_reset_password_token("susan", 600).unwrap();
        assert_eq!(decode_reset_password_token(&token).unwrap(), "susan");
    }

    #[test]
    fn expired_reset_token_is_reported_as_expired() {
        ensure_test_config();
        let token = encode_reset_password_token("susan", -10).unwrap();
        assert!(matches!(
            decode_reset_password_token(&token),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn tampered_token_is_invalid() {
        ensure_test_config();
        let token = encode_reset_password_token("susan", 600).unwrap();
        let mut chars: Vec<char> = token.chars().collect();
        let mid = chars.len() / 2;
        chars[mid] = if chars[mid] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();
        assert!(matches!(
            decode_reset_password_token(&tampered),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn session_token_cannot_reset_password() {
        ensure_test_config();
        let token = encode_session_token(7, 600).unwrap();
        assert!(matches!(
            decode_reset_password_token(&token),
            Err(TokenError::WrongType)
        ));
    }

    #[test]
    fn empty_token_fails() {
        ensure_test_config();
        assert!(decode_session_token("").is_err());
    }
}
