pub mod errors;
pub mod models;
pub mod ports;
pub mod service;

pub use errors::SessionError;
pub use models::Session;
pub use models::SessionDisposition;
pub use models::SessionPolicy;
pub use service::SessionService;
