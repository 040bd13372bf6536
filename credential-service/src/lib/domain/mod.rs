pub mod auth;
pub mod credential;
pub mod identity;
pub mod session;
pub mod user;
