pub mod auth;
pub mod email;
pub mod follow;
pub mod post;
pub mod user;
