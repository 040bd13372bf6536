pub mod errors;
pub mod models;

pub use errors::IdentityParseError;
pub use models::NodeIdentity;
pub use models::ProtocolTag;
pub use models::ScopeTag;
