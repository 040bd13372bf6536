use async_trait::async_trait;

use crate::user::errors::UserError;
use crate::user::models::User;
use crate::user::models::UserId;

/// User lookups backing session issuance and the simple credential check.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Retrieve a user by their case-insensitive login key — username or
    /// email address.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_login(&self, login: &str) -> Result<Option<User>, UserError>;

    /// Retrieve a user by identifier.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError>;
}
