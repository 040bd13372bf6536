use std::sync::Arc;

use chrono::Utc;
use secrets::SecretCodec;

use crate::auth::errors::AuthError;
use crate::auth::models::BrokerPrincipal;
use crate::auth::models::DenyReason;
use crate::credential::models::AccessToken;
use crate::credential::models::OwnerKind;
use crate::credential::models::FEATURE_TEAM_BROKER;
use crate::credential::models::FRONTEND_USERNAME_MARKER;
use crate::credential::ports::AccessTokenRepository;
use crate::credential::ports::AuthClientRepository;
use crate::credential::ports::BrokerClientRepository;
use crate::credential::ports::OwnerDirectory;
use crate::credential::ports::TeamBrokerClientRepository;
use crate::credential::ports::TeamDirectory;
use crate::identity::errors::IdentityParseError;
use crate::identity::models::NodeIdentity;
use crate::identity::models::ScopeTag;
use crate::user::ports::UserRepository;

/// Presented secrets longer than this are rejected before any hashing
/// work.
const MAX_SECRET_LENGTH: usize = 128;

/// Request-scoped verification engine for every credential kind.
///
/// Stateless between calls; all durable state lives behind the injected
/// repositories and no secret is ever cached in-process.
pub struct AuthenticationService<BC, TB, AT, AC, UR, OD, TD, C>
where
    BC: BrokerClientRepository,
    TB: TeamBrokerClientRepository,
    AT: AccessTokenRepository,
    AC: AuthClientRepository,
    UR: UserRepository,
    OD: OwnerDirectory,
    TD: TeamDirectory,
    C: SecretCodec,
{
    broker_clients: Arc<BC>,
    team_broker_clients: Arc<TB>,
    tokens: Arc<AT>,
    auth_clients: Arc<AC>,
    users: Arc<UR>,
    owners: Arc<OD>,
    teams: Arc<TD>,
    codec: Arc<C>,
}

fn deny<T>(reason: DenyReason) -> Option<T> {
    tracing::debug!(reason = ?reason, "Authentication denied");
    None
}

fn log_deny(reason: DenyReason) {
    tracing::debug!(reason = ?reason, "Authentication denied");
}

impl<BC, TB, AT, AC, UR, OD, TD, C> AuthenticationService<BC, TB, AT, AC, UR, OD, TD, C>
where
    BC: BrokerClientRepository,
    TB: TeamBrokerClientRepository,
    AT: AccessTokenRepository,
    AC: AuthClientRepository,
    UR: UserRepository,
    OD: OwnerDirectory,
    TD: TeamDirectory,
    C: SecretCodec,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        broker_clients: Arc<BC>,
        team_broker_clients: Arc<TB>,
        tokens: Arc<AT>,
        auth_clients: Arc<AC>,
        users: Arc<UR>,
        owners: Arc<OD>,
        teams: Arc<TD>,
        codec: Arc<C>,
    ) -> Self {
        Self {
            broker_clients,
            team_broker_clients,
            tokens,
            auth_clients,
            users,
            owners,
            teams,
            codec,
        }
    }

    /// Simple credential check for single-tenant broker users.
    ///
    /// Secret verification always runs — against a decoy digest when the
    /// username is unknown — so an absent record and a wrong password have
    /// the same response shape. Usernames carrying the reserved frontend
    /// marker are one-time-use: the record is deleted after a successful
    /// check.
    ///
    /// # Errors
    /// * `Credential` - Database operation failed
    pub async fn authenticate_simple(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool, AuthError> {
        if password.is_empty() || password.len() > MAX_SECRET_LENGTH {
            log_deny(DenyReason::OversizedSecret);
            return Ok(false);
        }

        let record = self.broker_clients.find_by_username(username).await?;
        let verified = self
            .codec
            .verify_or_reject(password, record.as_ref().map(|r| &r.password));

        if verified {
            if let Some(record) = record {
                if record.username.starts_with(FRONTEND_USERNAME_MARKER) {
                    self.broker_clients.delete(&record.username).await?;
                    tracing::debug!(username = %record.username, "One-time broker identity consumed");
                }
            }
        } else {
            log_deny(DenyReason::CredentialInvalid);
        }

        Ok(verified)
    }

    /// Client-credential check for instance auth clients.
    ///
    /// Same constant-shape rule as the simple check.
    ///
    /// # Errors
    /// * `Credential` - Database operation failed
    pub async fn authenticate_auth_client(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<bool, AuthError> {
        if client_secret.is_empty() || client_secret.len() > MAX_SECRET_LENGTH {
            log_deny(DenyReason::OversizedSecret);
            return Ok(false);
        }

        let client = self.auth_clients.find_by_client_id(client_id).await?;
        Ok(self
            .codec
            .verify_or_reject(client_secret, client.as_ref().map(|c| &c.client_secret)))
    }

    /// Password check for platform users, used by the login flow.
    ///
    /// Same constant-shape rule as [`Self::authenticate_simple`]: the
    /// verification primitive runs whether or not the user exists.
    ///
    /// # Errors
    /// * `User` - Database operation failed
    pub async fn verify_user_password(
        &self,
        login: &str,
        password: &str,
    ) -> Result<bool, AuthError> {
        if password.is_empty() || password.len() > MAX_SECRET_LENGTH {
            return Ok(false);
        }

        let user = self.users.find_by_login(login).await?;
        Ok(self
            .codec
            .verify_or_reject(password, user.as_ref().map(|u| &u.password_hash)))
    }

    /// Structured node-identity check for team-scoped broker clients.
    ///
    /// An ordered gate that short-circuits on the first failure; every
    /// denial collapses to None at this boundary.
    ///
    /// # Errors
    /// * `Credential` - Database operation failed
    pub async fn authenticate_structured(
        &self,
        username: &str,
        client_id: &str,
        password: &str,
    ) -> Result<Option<BrokerPrincipal>, AuthError> {
        // Gate 1: bound the hashing work before anything else runs.
        if password.is_empty() {
            return Ok(deny(DenyReason::EmptySecret));
        }
        if password.len() > MAX_SECRET_LENGTH {
            return Ok(deny(DenyReason::OversizedSecret));
        }

        // Gate 2: grammar.
        let identity = match NodeIdentity::parse(username, client_id) {
            Ok(identity) => identity,
            Err(error) => {
                let reason = match error {
                    IdentityParseError::ClientIdMismatch => DenyReason::IdentityMismatch,
                    _ => DenyReason::MalformedIdentity,
                };
                tracing::debug!(error = %error, "Broker identity rejected");
                return Ok(deny(reason));
            }
        };

        // Gate 3: resolve the team-scoped credential record.
        let Some(team) = self.teams.find_by_external_id(&identity.team_xid).await? else {
            return Ok(deny(DenyReason::CredentialNotFound));
        };

        let lookup_username = format!(
            "{}:{}:{}",
            identity.scope.credential_kind(),
            identity.team_xid,
            identity.owner_xid
        );
        let Some(record) = self
            .team_broker_clients
            .find_by_username(&team.id, &lookup_username)
            .await?
        else {
            return Ok(deny(DenyReason::CredentialNotFound));
        };

        // Gate 4: the stored owner must be what the identity claims.
        // Defends against id reuse across resource types and teams.
        let expected_kind = match identity.scope {
            ScopeTag::Node => OwnerKind::Instance,
            ScopeTag::Device => OwnerKind::Device,
        };
        if record.owner.kind != expected_kind {
            return Ok(deny(DenyReason::IdentityMismatch));
        }

        let Some(owner) = self.owners.resolve(&record.owner).await? else {
            return Ok(deny(DenyReason::CredentialNotFound));
        };
        if owner.external_id != identity.owner_xid {
            return Ok(deny(DenyReason::IdentityMismatch));
        }

        // Gate 5: team-level policy.
        if team.is_suspended() {
            return Ok(deny(DenyReason::TeamSuspended));
        }
        if !team.feature_enabled(FEATURE_TEAM_BROKER) {
            return Ok(deny(DenyReason::FeatureDisabled));
        }

        // Gate 6: the secret itself.
        if !self.codec.verify(password, &record.password) {
            return Ok(deny(DenyReason::CredentialInvalid));
        }

        Ok(Some(BrokerPrincipal {
            username: username.to_string(),
            team_id: identity.team_xid,
            ha_present: identity.ha_present,
        }))
    }

    /// Get-or-expire bearer-token lookup.
    ///
    /// An expired token is deleted before absence is reported. Tokens
    /// whose scope intersects `excluded_scopes` never satisfy this lookup,
    /// keeping password-reset and provisioning tokens out of general
    /// session use.
    ///
    /// # Errors
    /// * `Credential` - Database operation failed
    pub async fn lookup_access_token(
        &self,
        presented: &str,
        excluded_scopes: &[&str],
    ) -> Result<Option<AccessToken>, AuthError> {
        let digest = self.codec.lookup_digest(presented);
        let Some(token) = self.tokens.find_by_digest(&digest).await? else {
            return Ok(None);
        };

        if token.is_expired(Utc::now()) {
            self.tokens.delete(&token.digest).await?;
            tracing::debug!(
                reason = ?DenyReason::CredentialExpired,
                owner = %token.owner,
                "Expired token deleted on read"
            );
            return Ok(None);
        }

        if token.scope.intersects(excluded_scopes) {
            return Ok(deny(DenyReason::CredentialNotFound));
        }

        Ok(Some(token))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use chrono::Duration;
    use mockall::mock;
    use mockall::predicate::*;
    use secrets::Codec;
    use secrets::HashedSecret;
    use secrets::LookupDigest;
    use secrets::SecretError;
    use uuid::Uuid;

    use super::*;
    use crate::credential::errors::CredentialError;
    use crate::credential::models::AuthClient;
    use crate::credential::models::BrokerClient;
    use crate::credential::models::OwnerRef;
    use crate::credential::models::ResolvedOwner;
    use crate::credential::models::Scope;
    use crate::credential::models::Team;
    use crate::credential::models::TeamBrokerClient;
    use crate::credential::models::TeamId;
    use crate::credential::models::TokenPurpose;
    use crate::credential::models::SCOPE_PASSWORD_RESET;
    use crate::user::errors::UserError;
    use crate::user::models::User;
    use crate::user::models::UserId;

    mock! {
        pub TestBrokerClientRepository {}

        #[async_trait::async_trait]
        impl BrokerClientRepository for TestBrokerClientRepository {
            async fn replace_for_owner(&self, client: BrokerClient) -> Result<(), CredentialError>;
            async fn find_by_username(&self, username: &str) -> Result<Option<BrokerClient>, CredentialError>;
            async fn delete(&self, username: &str) -> Result<(), CredentialError>;
        }
    }

    mock! {
        pub TestTeamBrokerClientRepository {}

        #[async_trait::async_trait]
        impl TeamBrokerClientRepository for TestTeamBrokerClientRepository {
            async fn replace_for_owner(&self, client: TeamBrokerClient) -> Result<(), CredentialError>;
            async fn find_by_username(&self, team_id: &TeamId, username: &str) -> Result<Option<TeamBrokerClient>, CredentialError>;
            async fn delete_for_owner(&self, owner: &OwnerRef) -> Result<(), CredentialError>;
        }
    }

    mock! {
        pub TestAccessTokenRepository {}

        #[async_trait::async_trait]
        impl AccessTokenRepository for TestAccessTokenRepository {
            async fn replace_for_owner(&self, token: AccessToken) -> Result<(), CredentialError>;
            async fn find_by_digest(&self, digest: &LookupDigest) -> Result<Option<AccessToken>, CredentialError>;
            async fn delete(&self, digest: &LookupDigest) -> Result<(), CredentialError>;
        }
    }

    mock! {
        pub TestAuthClientRepository {}

        #[async_trait::async_trait]
        impl AuthClientRepository for TestAuthClientRepository {
            async fn replace_for_owner(&self, client: AuthClient) -> Result<(), CredentialError>;
            async fn find_by_client_id(&self, client_id: &str) -> Result<Option<AuthClient>, CredentialError>;
            async fn delete(&self, client_id: &str) -> Result<(), CredentialError>;
        }
    }

    mock! {
        pub TestUserRepository {}

        #[async_trait::async_trait]
        impl UserRepository for TestUserRepository {
            async fn find_by_login(&self, login: &str) -> Result<Option<User>, UserError>;
            async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError>;
        }
    }

    mock! {
        pub TestOwnerDirectory {}

        #[async_trait::async_trait]
        impl OwnerDirectory for TestOwnerDirectory {
            async fn resolve(&self, owner: &OwnerRef) -> Result<Option<ResolvedOwner>, CredentialError>;
        }
    }

    mock! {
        pub TestTeamDirectory {}

        #[async_trait::async_trait]
        impl TeamDirectory for TestTeamDirectory {
            async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Team>, CredentialError>;
        }
    }

    /// Codec decorator counting verification calls, for the
    /// constant-shape denial property.
    struct CountingCodec {
        inner: Codec,
        verifications: AtomicUsize,
    }

    impl CountingCodec {
        fn new() -> Self {
            Self {
                inner: Codec::new().unwrap(),
                verifications: AtomicUsize::new(0),
            }
        }

        fn verification_count(&self) -> usize {
            self.verifications.load(Ordering::SeqCst)
        }
    }

    impl SecretCodec for CountingCodec {
        fn hash_secret(&self, plain: &str) -> Result<HashedSecret, SecretError> {
            self.inner.hash_secret(plain)
        }

        fn verify(&self, plain: &str, stored: &HashedSecret) -> bool {
            self.verifications.fetch_add(1, Ordering::SeqCst);
            self.inner.verify(plain, stored)
        }

        fn verify_or_reject(&self, plain: &str, stored: Option<&HashedSecret>) -> bool {
            self.verifications.fetch_add(1, Ordering::SeqCst);
            self.inner.verify_or_reject(plain, stored)
        }

        fn lookup_digest(&self, plain: &str) -> LookupDigest {
            self.inner.lookup_digest(plain)
        }
    }

    struct Fixture {
        broker_clients: MockTestBrokerClientRepository,
        team_broker_clients: MockTestTeamBrokerClientRepository,
        tokens: MockTestAccessTokenRepository,
        auth_clients: MockTestAuthClientRepository,
        users: MockTestUserRepository,
        owners: MockTestOwnerDirectory,
        teams: MockTestTeamDirectory,
        codec: Arc<CountingCodec>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                broker_clients: MockTestBrokerClientRepository::new(),
                team_broker_clients: MockTestTeamBrokerClientRepository::new(),
                tokens: MockTestAccessTokenRepository::new(),
                auth_clients: MockTestAuthClientRepository::new(),
                users: MockTestUserRepository::new(),
                owners: MockTestOwnerDirectory::new(),
                teams: MockTestTeamDirectory::new(),
                codec: Arc::new(CountingCodec::new()),
            }
        }

        fn build(
            self,
        ) -> AuthenticationService<
            MockTestBrokerClientRepository,
            MockTestTeamBrokerClientRepository,
            MockTestAccessTokenRepository,
            MockTestAuthClientRepository,
            MockTestUserRepository,
            MockTestOwnerDirectory,
            MockTestTeamDirectory,
            CountingCodec,
        > {
            AuthenticationService::new(
                Arc::new(self.broker_clients),
                Arc::new(self.team_broker_clients),
                Arc::new(self.tokens),
                Arc::new(self.auth_clients),
                Arc::new(self.users),
                Arc::new(self.owners),
                Arc::new(self.teams),
                self.codec,
            )
        }
    }

    fn broker_team(suspended: bool) -> Team {
        Team {
            id: TeamId::new(),
            external_id: "T1".to_string(),
            name: "team one".to_string(),
            suspended,
            features: vec![FEATURE_TEAM_BROKER.to_string()],
        }
    }

    fn team_client(team: &Team, password_hash: HashedSecret, owner: OwnerRef) -> TeamBrokerClient {
        TeamBrokerClient {
            username: "instance:T1:I1".to_string(),
            team_id: team.id,
            password: password_hash,
            acls: "teams/T1/nodes/I1/#".to_string(),
            owner,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_simple_check_verifies_even_when_user_is_unknown() {
        let mut fixture = Fixture::new();
        fixture
            .broker_clients
            .expect_find_by_username()
            .times(1)
            .returning(|_| Ok(None));

        let codec = Arc::clone(&fixture.codec);
        let service = fixture.build();

        let result = service
            .authenticate_simple("no-such-user", "any password")
            .await;
        assert!(!result.unwrap());
        assert_eq!(codec.verification_count(), 1);
    }

    #[tokio::test]
    async fn test_simple_check_wrong_password_same_shape() {
        let mut fixture = Fixture::new();

        let stored = fixture.codec.hash_secret("right password").unwrap();
        let client = BrokerClient {
            username: "platform-monitor".to_string(),
            password: stored,
            acls: None,
            owner: OwnerRef::platform(),
            created_at: Utc::now(),
        };
        fixture
            .broker_clients
            .expect_find_by_username()
            .times(1)
            .returning(move |_| Ok(Some(client.clone())));
        fixture.broker_clients.expect_delete().times(0);

        let codec = Arc::clone(&fixture.codec);
        let service = fixture.build();

        let result = service
            .authenticate_simple("platform-monitor", "wrong password")
            .await;
        assert!(!result.unwrap());
        assert_eq!(codec.verification_count(), 1);
    }

    #[tokio::test]
    async fn test_simple_check_success() {
        let mut fixture = Fixture::new();

        let stored = fixture.codec.hash_secret("right password").unwrap();
        let client = BrokerClient {
            username: "platform-monitor".to_string(),
            password: stored,
            acls: None,
            owner: OwnerRef::platform(),
            created_at: Utc::now(),
        };
        fixture
            .broker_clients
            .expect_find_by_username()
            .times(1)
            .returning(move |_| Ok(Some(client.clone())));
        fixture.broker_clients.expect_delete().times(0);

        let service = fixture.build();
        let result = service
            .authenticate_simple("platform-monitor", "right password")
            .await;
        assert!(result.unwrap());
    }

    #[tokio::test]
    async fn test_frontend_identity_is_consumed_after_success() {
        let mut fixture = Fixture::new();

        let stored = fixture.codec.hash_secret("one-time").unwrap();
        let client = BrokerClient {
            username: "frontend:T1:I1".to_string(),
            password: stored,
            acls: None,
            owner: OwnerRef::frontend(Uuid::new_v4()),
            created_at: Utc::now(),
        };
        fixture
            .broker_clients
            .expect_find_by_username()
            .times(1)
            .returning(move |_| Ok(Some(client.clone())));
        fixture
            .broker_clients
            .expect_delete()
            .with(eq("frontend:T1:I1"))
            .times(1)
            .returning(|_| Ok(()));

        let service = fixture.build();
        let result = service.authenticate_simple("frontend:T1:I1", "one-time").await;
        assert!(result.unwrap());
    }

    #[tokio::test]
    async fn test_frontend_identity_kept_after_failed_check() {
        let mut fixture = Fixture::new();

        let stored = fixture.codec.hash_secret("one-time").unwrap();
        let client = BrokerClient {
            username: "frontend:T1:I1".to_string(),
            password: stored,
            acls: None,
            owner: OwnerRef::frontend(Uuid::new_v4()),
            created_at: Utc::now(),
        };
        fixture
            .broker_clients
            .expect_find_by_username()
            .times(1)
            .returning(move |_| Ok(Some(client.clone())));
        fixture.broker_clients.expect_delete().times(0);

        let service = fixture.build();
        let result = service.authenticate_simple("frontend:T1:I1", "wrong").await;
        assert!(!result.unwrap());
    }

    #[tokio::test]
    async fn test_structured_check_resolves_principal() {
        let mut fixture = Fixture::new();

        let team = broker_team(false);
        let instance_id = Uuid::new_v4();
        let stored = fixture.codec.hash_secret("broker password").unwrap();
        let record = team_client(&team, stored, OwnerRef::instance(instance_id));

        let team_id = team.id;
        fixture
            .teams
            .expect_find_by_external_id()
            .with(eq("T1"))
            .returning(move |_| Ok(Some(team.clone())));
        fixture
            .team_broker_clients
            .expect_find_by_username()
            .withf(move |tid, username| *tid == team_id && username == "instance:T1:I1")
            .returning(move |_, _| Ok(Some(record.clone())));
        fixture
            .owners
            .expect_resolve()
            .withf(move |owner| *owner == OwnerRef::instance(instance_id))
            .returning(|_| {
                Ok(Some(ResolvedOwner {
                    external_id: "I1".to_string(),
                    team_id: None,
                }))
            });

        let service = fixture.build();

        let principal = service
            .authenticate_structured("hosted:node:T1:I1", "hosted:node:T1:I1", "broker password")
            .await
            .unwrap()
            .expect("principal expected");
        assert_eq!(principal.username, "hosted:node:T1:I1");
        assert_eq!(principal.team_id, "T1");
        assert!(!principal.ha_present);

        // Same credential, HA replica client id.
        let principal = service
            .authenticate_structured(
                "hosted:node:T1:I1",
                "hosted:node:T1:I1:ha2",
                "broker password",
            )
            .await
            .unwrap()
            .expect("principal expected");
        assert!(principal.ha_present);
    }

    #[tokio::test]
    async fn test_structured_check_denies_suspended_team_before_hashing() {
        let mut fixture = Fixture::new();

        let team = broker_team(true);
        let stored = fixture.codec.hash_secret("broker password").unwrap();
        let record = team_client(&team, stored, OwnerRef::instance(Uuid::new_v4()));

        fixture
            .teams
            .expect_find_by_external_id()
            .returning(move |_| Ok(Some(team.clone())));
        fixture
            .team_broker_clients
            .expect_find_by_username()
            .returning(move |_, _| Ok(Some(record.clone())));
        fixture.owners.expect_resolve().returning(|_| {
            Ok(Some(ResolvedOwner {
                external_id: "I1".to_string(),
                team_id: None,
            }))
        });

        let codec = Arc::clone(&fixture.codec);
        let service = fixture.build();

        let result = service
            .authenticate_structured("hosted:node:T1:I1", "hosted:node:T1:I1", "broker password")
            .await;
        assert!(result.unwrap().is_none());
        // The gate fired before secret verification.
        assert_eq!(codec.verification_count(), 0);
    }

    #[tokio::test]
    async fn test_structured_check_denies_disabled_feature() {
        let mut fixture = Fixture::new();

        let mut team = broker_team(false);
        team.features.clear();
        let stored = fixture.codec.hash_secret("broker password").unwrap();
        let record = team_client(&team, stored, OwnerRef::instance(Uuid::new_v4()));

        fixture
            .teams
            .expect_find_by_external_id()
            .returning(move |_| Ok(Some(team.clone())));
        fixture
            .team_broker_clients
            .expect_find_by_username()
            .returning(move |_, _| Ok(Some(record.clone())));
        fixture.owners.expect_resolve().returning(|_| {
            Ok(Some(ResolvedOwner {
                external_id: "I1".to_string(),
                team_id: None,
            }))
        });

        let service = fixture.build();
        let result = service
            .authenticate_structured("hosted:node:T1:I1", "hosted:node:T1:I1", "broker password")
            .await;
        assert!(result.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_structured_check_rejects_owner_mismatch() {
        let mut fixture = Fixture::new();

        let team = broker_team(false);
        let stored = fixture.codec.hash_secret("broker password").unwrap();
        // The stored record resolves to a different external owner id than
        // the identity claims.
        let record = team_client(&team, stored, OwnerRef::instance(Uuid::new_v4()));

        fixture
            .teams
            .expect_find_by_external_id()
            .returning(move |_| Ok(Some(team.clone())));
        fixture
            .team_broker_clients
            .expect_find_by_username()
            .returning(move |_, _| Ok(Some(record.clone())));
        fixture.owners.expect_resolve().returning(|_| {
            Ok(Some(ResolvedOwner {
                external_id: "I2".to_string(),
                team_id: None,
            }))
        });

        let service = fixture.build();
        let result = service
            .authenticate_structured("hosted:node:T1:I1", "hosted:node:T1:I1", "broker password")
            .await;
        assert!(result.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_structured_check_rejects_owner_kind_mismatch() {
        let mut fixture = Fixture::new();

        let team = broker_team(false);
        let stored = fixture.codec.hash_secret("broker password").unwrap();
        // A device row answering to an instance-shaped identity.
        let record = team_client(&team, stored, OwnerRef::device(Uuid::new_v4()));

        fixture
            .teams
            .expect_find_by_external_id()
            .returning(move |_| Ok(Some(team.clone())));
        fixture
            .team_broker_clients
            .expect_find_by_username()
            .returning(move |_, _| Ok(Some(record.clone())));
        fixture.owners.expect_resolve().times(0);

        let service = fixture.build();
        let result = service
            .authenticate_structured("hosted:node:T1:I1", "hosted:node:T1:I1", "broker password")
            .await;
        assert!(result.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_structured_check_rejects_cross_owner_client_id() {
        let fixture = Fixture::new();
        let codec = Arc::clone(&fixture.codec);
        let service = fixture.build();

        // Grammar-level rejection: no store access, no hashing.
        let result = service
            .authenticate_structured("hosted:node:T1:I1", "hosted:node:T1:I2", "broker password")
            .await;
        assert!(result.unwrap().is_none());
        assert_eq!(codec.verification_count(), 0);
    }

    #[tokio::test]
    async fn test_structured_check_bounds_secret_length() {
        let fixture = Fixture::new();
        let service = fixture.build();

        let oversized = "x".repeat(MAX_SECRET_LENGTH + 1);
        let result = service
            .authenticate_structured("hosted:node:T1:I1", "hosted:node:T1:I1", &oversized)
            .await;
        assert!(result.unwrap().is_none());

        let result = service
            .authenticate_structured("hosted:node:T1:I1", "hosted:node:T1:I1", "")
            .await;
        assert!(result.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_access_token_deletes_expired() {
        let mut fixture = Fixture::new();

        let presented = "act_expired";
        let digest = fixture.codec.lookup_digest(presented);
        let token = AccessToken {
            digest: digest.clone(),
            owner: OwnerRef::user(Uuid::new_v4()),
            purpose: TokenPurpose::Personal,
            scope: Scope::empty(),
            expires_at: Some(Utc::now() - Duration::seconds(1)),
            refresh_digest: None,
            name: None,
            created_at: Utc::now() - Duration::days(1),
        };

        fixture
            .tokens
            .expect_find_by_digest()
            .with(eq(digest.clone()))
            .times(1)
            .returning(move |_| Ok(Some(token.clone())));
        fixture
            .tokens
            .expect_delete()
            .with(eq(digest))
            .times(1)
            .returning(|_| Ok(()));

        let service = fixture.build();
        let result = service.lookup_access_token(presented, &[]).await;
        assert!(result.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_access_token_excludes_scopes() {
        let mut fixture = Fixture::new();

        let presented = "act_reset";
        let token = AccessToken {
            digest: fixture.codec.lookup_digest(presented),
            owner: OwnerRef::user(Uuid::new_v4()),
            purpose: TokenPurpose::PasswordReset,
            scope: Scope::from_capabilities([SCOPE_PASSWORD_RESET]),
            expires_at: Some(Utc::now() + Duration::hours(1)),
            refresh_digest: None,
            name: None,
            created_at: Utc::now(),
        };

        fixture
            .tokens
            .expect_find_by_digest()
            .times(2)
            .returning(move |_| Ok(Some(token.clone())));
        fixture.tokens.expect_delete().times(0);

        let service = fixture.build();

        // Password-reset tokens never satisfy the general lookup.
        let result = service
            .lookup_access_token(presented, &[SCOPE_PASSWORD_RESET])
            .await;
        assert!(result.unwrap().is_none());

        // A lookup that does not exclude the scope still resolves it.
        let result = service.lookup_access_token(presented, &[]).await;
        assert!(result.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_auth_client_check_constant_shape() {
        let mut fixture = Fixture::new();

        let client = AuthClient {
            client_id: "cid_1".to_string(),
            client_secret: fixture.codec.hash_secret("ccs_secret").unwrap(),
            owner: OwnerRef::instance(Uuid::new_v4()),
            created_at: Utc::now(),
        };
        fixture
            .auth_clients
            .expect_find_by_client_id()
            .times(2)
            .returning(move |client_id| {
                if client_id == "cid_1" {
                    Ok(Some(client.clone()))
                } else {
                    Ok(None)
                }
            });

        let codec = Arc::clone(&fixture.codec);
        let service = fixture.build();

        assert!(service
            .authenticate_auth_client("cid_1", "ccs_secret")
            .await
            .unwrap());
        // Unknown client: verification still runs, result is false.
        assert!(!service
            .authenticate_auth_client("cid_2", "ccs_secret")
            .await
            .unwrap());
        assert_eq!(codec.verification_count(), 2);
    }
}
