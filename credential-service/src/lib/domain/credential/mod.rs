pub mod errors;
pub mod issuer;
pub mod models;
pub mod ports;

pub use errors::CredentialError;
pub use issuer::TokenIssuer;
