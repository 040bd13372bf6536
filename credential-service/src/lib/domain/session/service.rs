use std::sync::Arc;

use chrono::Utc;
use secrets::token;
use secrets::token::TokenClass;
use secrets::SecretCodec;

use crate::session::errors::SessionError;
use crate::session::models::Session;
use crate::session::models::SessionDisposition;
use crate::session::models::SessionPolicy;
use crate::session::ports::SessionRepository;
use crate::user::ports::UserRepository;

/// Session lifecycle service: issuance plus the get-or-expire read.
pub struct SessionService<SR, UR, C>
where
    SR: SessionRepository,
    UR: UserRepository,
    C: SecretCodec,
{
    sessions: Arc<SR>,
    users: Arc<UR>,
    codec: Arc<C>,
    policy: SessionPolicy,
}

impl<SR, UR, C> SessionService<SR, UR, C>
where
    SR: SessionRepository,
    UR: UserRepository,
    C: SecretCodec,
{
    pub fn new(sessions: Arc<SR>, users: Arc<UR>, codec: Arc<C>, policy: SessionPolicy) -> Self {
        Self {
            sessions,
            users,
            codec,
            policy,
        }
    }

    /// Create an interactive session for a user.
    ///
    /// Refused (None) when the user is absent or suspended. The caller has
    /// already verified the password.
    ///
    /// # Errors
    /// * `User` - User lookup failed
    /// * `DatabaseError` - Database operation failed
    pub async fn issue_session(&self, login: &str) -> Result<Option<Session>, SessionError> {
        let user = match self.users.find_by_login(login).await? {
            Some(user) if !user.suspended => user,
            _ => {
                tracing::debug!(login = %login, "Session issuance refused");
                return Ok(None);
            }
        };

        let now = Utc::now();
        let session = Session {
            id: token::generate(TokenClass::Session),
            user_id: user.id,
            expires_at: now + self.policy.lifetime,
            idle_at: now + self.policy.idle_timeout,
            refresh_digest: None,
            created_at: now,
        };

        self.sessions.create(session.clone()).await?;

        Ok(Some(session))
    }

    /// Create a device-linked session, exempt from idle expiry.
    ///
    /// Returns the session and the one-time refresh-token plaintext.
    ///
    /// # Errors
    /// * `User` - User lookup failed
    /// * `DatabaseError` - Database operation failed
    pub async fn issue_device_session(
        &self,
        login: &str,
    ) -> Result<Option<(Session, String)>, SessionError> {
        let user = match self.users.find_by_login(login).await? {
            Some(user) if !user.suspended => user,
            _ => {
                tracing::debug!(login = %login, "Session issuance refused");
                return Ok(None);
            }
        };

        let refresh_token = token::generate(TokenClass::Refresh);
        let now = Utc::now();
        let session = Session {
            id: token::generate(TokenClass::Session),
            user_id: user.id,
            expires_at: now + self.policy.lifetime,
            idle_at: now + self.policy.idle_timeout,
            refresh_digest: Some(self.codec.lookup_digest(&refresh_token)),
            created_at: now,
        };

        self.sessions.create(session.clone()).await?;

        Ok(Some((session, refresh_token)))
    }

    /// Get-or-expire read applying the lifecycle rules.
    ///
    /// An expired or idled-out session is deleted before absence is
    /// reported; a read inside the grace window slides the idle cutoff
    /// forward and persists it.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    pub async fn lookup_session(&self, session_id: &str) -> Result<Option<Session>, SessionError> {
        let Some(session) = self.sessions.find_by_id(session_id).await? else {
            return Ok(None);
        };

        match session.evaluate(&self.policy, Utc::now()) {
            SessionDisposition::Expired => {
                self.sessions.delete(session_id).await?;
                tracing::debug!(session = %session_id, "Expired session deleted on read");
                Ok(None)
            }
            SessionDisposition::Slide { idle_at } => {
                self.sessions.update_idle(session_id, idle_at).await?;
                Ok(Some(Session { idle_at, ..session }))
            }
            SessionDisposition::Active => Ok(Some(session)),
        }
    }

    /// Explicit logout.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    pub async fn delete_session(&self, session_id: &str) -> Result<(), SessionError> {
        self.sessions.delete(session_id).await
    }
}
