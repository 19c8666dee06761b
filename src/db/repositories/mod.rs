pub mod auth_log;
pub mod auth_token;
pub mod user;
