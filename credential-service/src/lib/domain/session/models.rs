use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use secrets::LookupDigest;

use crate::session::errors::SessionPolicyError;
use crate::user::models::UserId;

/// Interactive web session.
///
/// The opaque session id is itself the primary key — it is the lookup key
/// presented by the cookie transport and is never hashed. A session
/// carrying a refresh-token digest is device-linked and exempt from idle
/// expiry.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub idle_at: DateTime<Utc>,
    pub refresh_digest: Option<LookupDigest>,
    pub created_at: DateTime<Utc>,
}

/// Expiry policy for interactive sessions.
///
/// The grace window must be shorter than the idle timeout, so a slide
/// always produces a strictly later `idle_at` and repeated reads cannot
/// oscillate.
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub lifetime: Duration,
    pub idle_timeout: Duration,
    pub idle_grace: Duration,
}

impl SessionPolicy {
    /// Build a policy, rejecting a grace window that would not shrink the
    /// idle timeout.
    ///
    /// # Errors
    /// * `GraceExceedsTimeout` - `idle_grace >= idle_timeout`
    pub fn new(
        lifetime: Duration,
        idle_timeout: Duration,
        idle_grace: Duration,
    ) -> Result<Self, SessionPolicyError> {
        if idle_grace >= idle_timeout {
            return Err(SessionPolicyError::GraceExceedsTimeout);
        }

        Ok(Self {
            lifetime,
            idle_timeout,
            idle_grace,
        })
    }
}

impl Default for SessionPolicy {
    /// 7 day lifetime, 32 hour idle timeout, 31 hour grace window.
    fn default() -> Self {
        Self {
            lifetime: Duration::days(7),
            idle_timeout: Duration::hours(32),
            idle_grace: Duration::hours(31),
        }
    }
}

/// Outcome of applying the lifecycle rules to a session read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionDisposition {
    /// Past the hard or idle cutoff; delete and report absent.
    Expired,
    /// Inside the grace window; persist the new `idle_at`.
    Slide { idle_at: DateTime<Utc> },
    /// No change, no write.
    Active,
}

impl Session {
    /// Apply the expiry and idle-sliding rules for a read at `now`.
    pub fn evaluate(&self, policy: &SessionPolicy, now: DateTime<Utc>) -> SessionDisposition {
        if now >= self.expires_at {
            return SessionDisposition::Expired;
        }

        // Device-linked sessions only ever hit the hard cutoff.
        if self.refresh_digest.is_some() {
            return SessionDisposition::Active;
        }

        let idle_in = self.idle_at - now;
        if idle_in < Duration::zero() {
            SessionDisposition::Expired
        } else if idle_in <= policy.idle_grace {
            SessionDisposition::Slide {
                idle_at: now + policy.idle_timeout,
            }
        } else {
            SessionDisposition::Active
        }
    }
}
