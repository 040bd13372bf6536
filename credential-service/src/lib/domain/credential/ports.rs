use async_trait::async_trait;
use secrets::LookupDigest;
use uuid::Uuid;

use crate::credential::errors::CredentialError;
use crate::credential::models::AccessToken;
use crate::credential::models::AuthClient;
use crate::credential::models::BrokerClient;
use crate::credential::models::OwnerRef;
use crate::credential::models::ResolvedOwner;
use crate::credential::models::Team;
use crate::credential::models::TeamBrokerClient;
use crate::credential::models::TeamId;

/// Persistence for bearer access tokens, keyed by lookup digest.
#[async_trait]
pub trait AccessTokenRepository: Send + Sync + 'static {
    /// Atomically replace any live token for the same (owner, purpose) and
    /// persist the new one.
    ///
    /// The destroy-old/create-new pair must commit as one unit: two
    /// concurrent calls for the same owner leave exactly one live token.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn replace_for_owner(&self, token: AccessToken) -> Result<(), CredentialError>;

    /// Retrieve a token by the digest of its presented value.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_digest(
        &self,
        digest: &LookupDigest,
    ) -> Result<Option<AccessToken>, CredentialError>;

    /// Remove a token (revocation or read-time expiry).
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn delete(&self, digest: &LookupDigest) -> Result<(), CredentialError>;
}

/// Persistence for OAuth-style client credentials.
#[async_trait]
pub trait AuthClientRepository: Send + Sync + 'static {
    /// Atomically replace any live client for the same owner.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn replace_for_owner(&self, client: AuthClient) -> Result<(), CredentialError>;

    /// Retrieve a client by its plaintext client id.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_client_id(&self, client_id: &str)
        -> Result<Option<AuthClient>, CredentialError>;

    /// Remove a client.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn delete(&self, client_id: &str) -> Result<(), CredentialError>;
}

/// Persistence for globally-unique broker identities.
#[async_trait]
pub trait BrokerClientRepository: Send + Sync + 'static {
    /// Atomically replace any live broker client for the same owner.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn replace_for_owner(&self, client: BrokerClient) -> Result<(), CredentialError>;

    /// Case-insensitive lookup by the unique username key.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_username(&self, username: &str)
        -> Result<Option<BrokerClient>, CredentialError>;

    /// Remove a broker client (logout or one-time-use consumption).
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn delete(&self, username: &str) -> Result<(), CredentialError>;
}

/// Persistence for team-scoped broker identities.
#[async_trait]
pub trait TeamBrokerClientRepository: Send + Sync + 'static {
    /// Atomically replace any live broker client for the same owner.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn replace_for_owner(&self, client: TeamBrokerClient) -> Result<(), CredentialError>;

    /// Retrieve by (team, exact username) pair.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_username(
        &self,
        team_id: &TeamId,
        username: &str,
    ) -> Result<Option<TeamBrokerClient>, CredentialError>;

    /// Remove the broker client owned by the given entity.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn delete_for_owner(&self, owner: &OwnerRef) -> Result<(), CredentialError>;
}

/// Resolution of a credential's polymorphic owner to its concrete entity.
///
/// One dispatch point for the closed owner-kind set; pseudo-owners resolve
/// to None.
#[async_trait]
pub trait OwnerDirectory: Send + Sync + 'static {
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn resolve(&self, owner: &OwnerRef) -> Result<Option<ResolvedOwner>, CredentialError>;
}

/// Team lookup and policy flags, keyed by the externally-visible id.
#[async_trait]
pub trait TeamDirectory: Send + Sync + 'static {
    /// An undecodable external id maps to None, never an error.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_external_id(&self, external_id: &str)
        -> Result<Option<Team>, CredentialError>;
}

/// Opaque, invertible codec for externally-visible ids.
pub trait ExternalIdCodec: Send + Sync + 'static {
    fn encode(&self, id: &Uuid) -> String;

    /// None for any input that does not decode; callers treat that as
    /// "not found".
    fn decode(&self, external_id: &str) -> Option<Uuid>;
}
