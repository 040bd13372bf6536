use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::session::errors::SessionError;
use crate::session::models::Session;

/// Persistence operations for web sessions.
#[async_trait]
pub trait SessionRepository: Send + Sync + 'static {
    /// Persist a new session.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, session: Session) -> Result<(), SessionError>;

    /// Retrieve a session by its opaque id.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>, SessionError>;

    /// Persist a slid idle cutoff. Concurrent writers race benignly: every
    /// candidate value is monotonically later.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn update_idle(
        &self,
        session_id: &str,
        idle_at: DateTime<Utc>,
    ) -> Result<(), SessionError>;

    /// Remove a session (logout or read-time expiry).
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn delete(&self, session_id: &str) -> Result<(), SessionError>;
}
