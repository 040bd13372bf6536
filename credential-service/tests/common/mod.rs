//! In-memory store implementations backing the end-to-end credential
//! flows, so the domain services run unmodified without a database.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use secrets::Codec;
use secrets::LookupDigest;
use secrets::SecretCodec;
use uuid::Uuid;

use credential_service::auth::service::AuthenticationService;
use credential_service::credential::errors::CredentialError;
use credential_service::credential::issuer::TokenIssuer;
use credential_service::credential::models::AccessToken;
use credential_service::credential::models::AuthClient;
use credential_service::credential::models::BrokerClient;
use credential_service::credential::models::OwnerRef;
use credential_service::credential::models::ResolvedOwner;
use credential_service::credential::models::Team;
use credential_service::credential::models::TeamBrokerClient;
use credential_service::credential::models::TeamId;
use credential_service::credential::ports::AccessTokenRepository;
use credential_service::credential::ports::AuthClientRepository;
use credential_service::credential::ports::BrokerClientRepository;
use credential_service::credential::ports::OwnerDirectory;
use credential_service::credential::ports::TeamBrokerClientRepository;
use credential_service::credential::ports::TeamDirectory;
use credential_service::session::models::SessionPolicy;
use credential_service::session::service::SessionService;
use credential_service::session::errors::SessionError;
use credential_service::session::models::Session;
use credential_service::session::ports::SessionRepository;
use credential_service::user::errors::UserError;
use credential_service::user::models::User;
use credential_service::user::models::UserId;
use credential_service::user::ports::UserRepository;

#[derive(Default)]
pub struct InMemoryAccessTokens {
    pub rows: Mutex<Vec<AccessToken>>,
}

#[async_trait]
impl AccessTokenRepository for InMemoryAccessTokens {
    async fn replace_for_owner(&self, token: AccessToken) -> Result<(), CredentialError> {
        let mut rows = self.rows.lock().unwrap();
        rows.retain(|t| !(t.owner == token.owner && t.purpose == token.purpose));
        rows.push(token);
        Ok(())
    }

    async fn find_by_digest(
        &self,
        digest: &LookupDigest,
    ) -> Result<Option<AccessToken>, CredentialError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|t| &t.digest == digest).cloned())
    }

    async fn delete(&self, digest: &LookupDigest) -> Result<(), CredentialError> {
        self.rows.lock().unwrap().retain(|t| &t.digest != digest);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAuthClients {
    pub rows: Mutex<Vec<AuthClient>>,
}

#[async_trait]
impl AuthClientRepository for InMemoryAuthClients {
    async fn replace_for_owner(&self, client: AuthClient) -> Result<(), CredentialError> {
        let mut rows = self.rows.lock().unwrap();
        rows.retain(|c| c.owner != client.owner);
        rows.push(client);
        Ok(())
    }

    async fn find_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<AuthClient>, CredentialError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|c| c.client_id == client_id).cloned())
    }

    async fn delete(&self, client_id: &str) -> Result<(), CredentialError> {
        self.rows
            .lock()
            .unwrap()
            .retain(|c| c.client_id != client_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryBrokerClients {
    pub rows: Mutex<Vec<BrokerClient>>,
}

#[async_trait]
impl BrokerClientRepository for InMemoryBrokerClients {
    async fn replace_for_owner(&self, client: BrokerClient) -> Result<(), CredentialError> {
        let mut rows = self.rows.lock().unwrap();
        rows.retain(|c| c.owner != client.owner);
        rows.push(client);
        Ok(())
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<BrokerClient>, CredentialError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|c| c.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn delete(&self, username: &str) -> Result<(), CredentialError> {
        self.rows.lock().unwrap().retain(|c| c.username != username);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryTeamBrokerClients {
    pub rows: Mutex<Vec<TeamBrokerClient>>,
}

#[async_trait]
impl TeamBrokerClientRepository for InMemoryTeamBrokerClients {
    async fn replace_for_owner(&self, client: TeamBrokerClient) -> Result<(), CredentialError> {
        let mut rows = self.rows.lock().unwrap();
        rows.retain(|c| c.owner != client.owner);
        rows.push(client);
        Ok(())
    }

    async fn find_by_username(
        &self,
        team_id: &TeamId,
        username: &str,
    ) -> Result<Option<TeamBrokerClient>, CredentialError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|c| &c.team_id == team_id && c.username == username)
            .cloned())
    }

    async fn delete_for_owner(&self, owner: &OwnerRef) -> Result<(), CredentialError> {
        self.rows.lock().unwrap().retain(|c| &c.owner != owner);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySessions {
    pub rows: Mutex<HashMap<String, Session>>,
}

impl InMemorySessions {
    /// Rewind or push a stored session's cutoffs for lifecycle tests.
    pub fn set_cutoffs(
        &self,
        session_id: &str,
        expires_at: DateTime<Utc>,
        idle_at: DateTime<Utc>,
    ) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(session) = rows.get_mut(session_id) {
            session.expires_at = expires_at;
            session.idle_at = idle_at;
        }
    }
}

#[async_trait]
impl SessionRepository for InMemorySessions {
    async fn create(&self, session: Session) -> Result<(), SessionError> {
        self.rows
            .lock()
            .unwrap()
            .insert(session.id.clone(), session);
        Ok(())
    }

    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>, SessionError> {
        Ok(self.rows.lock().unwrap().get(session_id).cloned())
    }

    async fn update_idle(
        &self,
        session_id: &str,
        idle_at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        if let Some(session) = self.rows.lock().unwrap().get_mut(session_id) {
            if idle_at > session.idle_at {
                session.idle_at = idle_at;
            }
        }
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), SessionError> {
        self.rows.lock().unwrap().remove(session_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryUsers {
    pub rows: Mutex<Vec<User>>,
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn find_by_login(&self, login: &str) -> Result<Option<User>, UserError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|u| {
                u.username.as_str().eq_ignore_ascii_case(login)
                    || u.email.as_str().eq_ignore_ascii_case(login)
            })
            .cloned())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|u| &u.id == id).cloned())
    }
}

/// Team and owner resolution backed by plain maps.
#[derive(Default)]
pub struct InMemoryDirectory {
    pub teams: Mutex<Vec<Team>>,
    pub owners: Mutex<HashMap<OwnerRef, ResolvedOwner>>,
}

#[async_trait]
impl TeamDirectory for InMemoryDirectory {
    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Team>, CredentialError> {
        let teams = self.teams.lock().unwrap();
        Ok(teams.iter().find(|t| t.external_id == external_id).cloned())
    }
}

#[async_trait]
impl OwnerDirectory for InMemoryDirectory {
    async fn resolve(&self, owner: &OwnerRef) -> Result<Option<ResolvedOwner>, CredentialError> {
        Ok(self.owners.lock().unwrap().get(owner).cloned())
    }
}

pub type TestEngine = AuthenticationService<
    InMemoryBrokerClients,
    InMemoryTeamBrokerClients,
    InMemoryAccessTokens,
    InMemoryAuthClients,
    InMemoryUsers,
    InMemoryDirectory,
    InMemoryDirectory,
    Codec,
>;

pub type TestSessions = SessionService<InMemorySessions, InMemoryUsers, Codec>;

pub type TestIssuer = TokenIssuer<
    InMemoryAccessTokens,
    InMemoryAuthClients,
    InMemoryBrokerClients,
    InMemoryTeamBrokerClients,
    Codec,
>;

/// The full credential subsystem wired over in-memory stores.
pub struct TestWorld {
    pub tokens: Arc<InMemoryAccessTokens>,
    pub auth_clients: Arc<InMemoryAuthClients>,
    pub broker_clients: Arc<InMemoryBrokerClients>,
    pub team_broker_clients: Arc<InMemoryTeamBrokerClients>,
    pub session_store: Arc<InMemorySessions>,
    pub users: Arc<InMemoryUsers>,
    pub directory: Arc<InMemoryDirectory>,
    pub codec: Arc<Codec>,
    pub engine: TestEngine,
    pub sessions: TestSessions,
    pub issuer: TestIssuer,
}

impl TestWorld {
    pub fn new() -> Self {
        let tokens = Arc::new(InMemoryAccessTokens::default());
        let auth_clients = Arc::new(InMemoryAuthClients::default());
        let broker_clients = Arc::new(InMemoryBrokerClients::default());
        let team_broker_clients = Arc::new(InMemoryTeamBrokerClients::default());
        let session_store = Arc::new(InMemorySessions::default());
        let users = Arc::new(InMemoryUsers::default());
        let directory = Arc::new(InMemoryDirectory::default());
        let codec = Arc::new(Codec::new().unwrap());

        let engine = AuthenticationService::new(
            Arc::clone(&broker_clients),
            Arc::clone(&team_broker_clients),
            Arc::clone(&tokens),
            Arc::clone(&auth_clients),
            Arc::clone(&users),
            Arc::clone(&directory),
            Arc::clone(&directory),
            Arc::clone(&codec),
        );
        let sessions = SessionService::new(
            Arc::clone(&session_store),
            Arc::clone(&users),
            Arc::clone(&codec),
            SessionPolicy::default(),
        );
        let issuer = TokenIssuer::new(
            Arc::clone(&tokens),
            Arc::clone(&auth_clients),
            Arc::clone(&broker_clients),
            Arc::clone(&team_broker_clients),
            Arc::clone(&codec),
            "mqtt://broker.local:1883".to_string(),
        );

        Self {
            tokens,
            auth_clients,
            broker_clients,
            team_broker_clients,
            session_store,
            users,
            directory,
            codec,
            engine,
            sessions,
            issuer,
        }
    }

    /// Register a team with the given external id and feature flags.
    pub fn add_team(&self, external_id: &str, suspended: bool, features: &[&str]) -> Team {
        let team = Team {
            id: TeamId::new(),
            external_id: external_id.to_string(),
            name: format!("team {external_id}"),
            suspended,
            features: features.iter().map(|f| f.to_string()).collect(),
        };
        self.directory.teams.lock().unwrap().push(team.clone());
        team
    }

    /// Flip a registered team's suspension flag.
    pub fn suspend_team(&self, external_id: &str) {
        let mut teams = self.directory.teams.lock().unwrap();
        if let Some(team) = teams.iter_mut().find(|t| t.external_id == external_id) {
            team.suspended = true;
        }
    }

    /// Register an instance owner resolvable to the given external id.
    pub fn register_instance(&self, team: &Team, instance_id: Uuid, external_id: &str) -> OwnerRef {
        let owner = OwnerRef::instance(instance_id);
        self.directory.owners.lock().unwrap().insert(
            owner,
            ResolvedOwner {
                external_id: external_id.to_string(),
                team_id: Some(team.id),
            },
        );
        owner
    }

    /// Register a device owner resolvable to the given external id.
    pub fn register_device(&self, team: &Team, device_id: Uuid, external_id: &str) -> OwnerRef {
        let owner = OwnerRef::device(device_id);
        self.directory.owners.lock().unwrap().insert(
            owner,
            ResolvedOwner {
                external_id: external_id.to_string(),
                team_id: Some(team.id),
            },
        );
        owner
    }

    /// Register a platform user with the given password.
    pub fn add_user(&self, username: &str, password: &str, suspended: bool) -> User {
        use credential_service::domain::user::models::EmailAddress;
        use credential_service::user::models::Username;

        let user = User {
            id: UserId::new(),
            username: Username::new(username.to_string()).unwrap(),
            email: EmailAddress::new(format!("{username}@example.com")).unwrap(),
            password_hash: self.codec.hash_secret(password).unwrap(),
            suspended,
            created_at: Utc::now(),
        };
        self.users.rows.lock().unwrap().push(user.clone());
        user
    }
}
