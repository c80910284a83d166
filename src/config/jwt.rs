use anyhow::Result;
use std::env;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub session_expiry: u64,     // 1 day
    pub remember_me_expiry: u64, // 14 days
    pub reset_token_expiry: u64, // 10 minutes
}

impl JwtConfig {
    pub fn from_env() -> Result<Self> {
        let secret = env::var("SECRET_KEY")
            .map_err(|_| anyhow::anyhow!("SECRET_KEY environment variable must be set"))?;

        if secret.len() < 32 {
            return Err(anyhow::anyhow!("SECRET_KEY must be at least 32 characters"));
        }

        Ok(Self {
            secret,
            session_expiry: seconds_from_env("SESSION_EXPIRATION", 86_400),
            remember_me_expiry: seconds_from_env("REMEMBER_ME_EXPIRATION", 1_209_600),
            reset_token_expiry: seconds_from_env("RESET_TOKEN_EXPIRATION", 600),
        })
    }
}

fn seconds_from_env(var_name: &str, default: u64) -> u64 {
    env::var(var_name)
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}
