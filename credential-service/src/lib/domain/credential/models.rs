use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use secrets::HashedSecret;
use secrets::LookupDigest;
use uuid::Uuid;

/// Scope string carried by password-reset tokens.
pub const SCOPE_PASSWORD_RESET: &str = "password:reset";

/// Scope string carried by device-provisioning tokens.
pub const SCOPE_DEVICE_PROVISION: &str = "device:provision";

/// Team feature flag gating broker connectivity.
pub const FEATURE_TEAM_BROKER: &str = "teamBroker";

/// Reserved username marker for one-time frontend broker identities.
pub const FRONTEND_USERNAME_MARKER: &str = "frontend:";

/// Closed set of entity kinds a credential can authorize on behalf of.
///
/// `Platform` and `Frontend` are pseudo-owners: broker identities that act
/// for the platform itself or for a short-lived frontend connection rather
/// than for a stored team resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnerKind {
    Team,
    Instance,
    Device,
    User,
    Platform,
    Frontend,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::Team => "team",
            OwnerKind::Instance => "instance",
            OwnerKind::Device => "device",
            OwnerKind::User => "user",
            OwnerKind::Platform => "platform",
            OwnerKind::Frontend => "frontend",
        }
    }

    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "team" => Some(OwnerKind::Team),
            "instance" => Some(OwnerKind::Instance),
            "device" => Some(OwnerKind::Device),
            "user" => Some(OwnerKind::User),
            "platform" => Some(OwnerKind::Platform),
            "frontend" => Some(OwnerKind::Frontend),
            _ => None,
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polymorphic credential owner: a closed kind plus the owning row id.
///
/// Pseudo-owners without a backing row use the nil UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerRef {
    pub kind: OwnerKind,
    pub id: Uuid,
}

impl OwnerRef {
    pub fn new(kind: OwnerKind, id: Uuid) -> Self {
        Self { kind, id }
    }

    pub fn team(id: Uuid) -> Self {
        Self::new(OwnerKind::Team, id)
    }

    pub fn instance(id: Uuid) -> Self {
        Self::new(OwnerKind::Instance, id)
    }

    pub fn device(id: Uuid) -> Self {
        Self::new(OwnerKind::Device, id)
    }

    pub fn user(id: Uuid) -> Self {
        Self::new(OwnerKind::User, id)
    }

    pub fn platform() -> Self {
        Self::new(OwnerKind::Platform, Uuid::nil())
    }

    pub fn frontend(instance_id: Uuid) -> Self {
        Self::new(OwnerKind::Frontend, instance_id)
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// What an access token is for; at most one live token per (owner, purpose).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    /// Named personal/API token.
    Personal,
    /// Device-provisioning token owned by a team.
    Provisioning,
    /// Short-lived password-reset token.
    PasswordReset,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::Personal => "personal",
            TokenPurpose::Provisioning => "provisioning",
            TokenPurpose::PasswordReset => "password-reset",
        }
    }

    pub fn parse(purpose: &str) -> Option<Self> {
        match purpose {
            "personal" => Some(TokenPurpose::Personal),
            "provisioning" => Some(TokenPurpose::Provisioning),
            "password-reset" => Some(TokenPurpose::PasswordReset),
            _ => None,
        }
    }
}

/// Ordered set of capability strings carried by an access token.
///
/// Insertion order is preserved; duplicates are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scope(Vec<String>);

impl Scope {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn from_capabilities<I, S>(capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut scope = Vec::new();
        for capability in capabilities {
            let capability = capability.into();
            if !scope.contains(&capability) {
                scope.push(capability);
            }
        }
        Self(scope)
    }

    pub fn contains(&self, capability: &str) -> bool {
        self.0.iter().any(|c| c == capability)
    }

    pub fn intersects(&self, capabilities: &[&str]) -> bool {
        capabilities.iter().any(|c| self.contains(c))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Comma-joined storage form.
    pub fn to_storage(&self) -> String {
        self.0.join(",")
    }

    pub fn from_storage(stored: &str) -> Self {
        Self::from_capabilities(stored.split(',').filter(|s| !s.is_empty()))
    }
}

/// Opaque bearer token, stored only as its lookup digest.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub digest: LookupDigest,
    pub owner: OwnerRef,
    pub purpose: TokenPurpose,
    pub scope: Scope,
    pub expires_at: Option<DateTime<Utc>>,
    pub refresh_digest: Option<LookupDigest>,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// Arguments for the general replace-or-create token issuance entry point.
#[derive(Debug)]
pub struct IssueTokenCommand {
    pub owner: OwnerRef,
    pub purpose: TokenPurpose,
    pub scope: Scope,
    pub expires_at: Option<DateTime<Utc>>,
    pub name: Option<String>,
    pub with_refresh: bool,
}

/// One-time plaintext handed back from an issuing call.
///
/// The store only ever sees the digests; this value is the single moment
/// the plaintext exists outside the caller's trust boundary.
#[derive(Debug)]
pub struct IssuedToken {
    pub token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// OAuth-style client-credential pair.
#[derive(Debug, Clone)]
pub struct AuthClient {
    pub client_id: String,
    pub client_secret: HashedSecret,
    pub owner: OwnerRef,
    pub created_at: DateTime<Utc>,
}

/// One-time plaintext client credentials.
#[derive(Debug)]
pub struct IssuedAuthClient {
    pub client_id: String,
    pub client_secret: String,
}

/// Globally-unique messaging-broker identity (platform and frontend
/// clients).
#[derive(Debug, Clone)]
pub struct BrokerClient {
    pub username: String,
    pub password: HashedSecret,
    pub acls: Option<String>,
    pub owner: OwnerRef,
    pub created_at: DateTime<Utc>,
}

/// Team-scoped messaging-broker identity for instances and devices.
///
/// The username is derived deterministically at issuance
/// (`instance:{team}:{owner}` or `device:{team}:{owner}`) so it can be
/// reconstructed from a parsed connection identity without a side lookup.
#[derive(Debug, Clone)]
pub struct TeamBrokerClient {
    pub username: String,
    pub team_id: TeamId,
    pub password: HashedSecret,
    pub acls: String,
    pub owner: OwnerRef,
    pub created_at: DateTime<Utc>,
}

/// Connection details returned once at issuance.
#[derive(Debug)]
pub struct BrokerCredentials {
    pub url: String,
    pub username: String,
    pub password: String,
}

/// Team unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TeamId(pub Uuid);

impl TeamId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TeamId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Team entity as seen by this subsystem: policy flags plus the
/// externally-visible id.
#[derive(Debug, Clone)]
pub struct Team {
    pub id: TeamId,
    pub external_id: String,
    pub name: String,
    pub suspended: bool,
    pub features: Vec<String>,
}

impl Team {
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn feature_enabled(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

/// Concrete entity resolved from a credential's polymorphic owner.
#[derive(Debug, Clone)]
pub struct ResolvedOwner {
    pub external_id: String,
    pub team_id: Option<TeamId>,
}
