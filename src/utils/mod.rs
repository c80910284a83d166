pub mod avatar;
pub mod cookie;
pub mod flash;
pub mod jwt;
pub mod password;

pub use jwt::{encode_reset_password_token, encode_session_token};
