use std::sync::Arc;

use chrono::Duration;
use chrono::Utc;
use secrets::token;
use secrets::token::TokenClass;
use secrets::SecretCodec;
use uuid::Uuid;

use crate::credential::errors::CredentialError;
use crate::credential::models::AccessToken;
use crate::credential::models::AuthClient;
use crate::credential::models::BrokerClient;
use crate::credential::models::BrokerCredentials;
use crate::credential::models::IssueTokenCommand;
use crate::credential::models::IssuedAuthClient;
use crate::credential::models::IssuedToken;
use crate::credential::models::OwnerKind;
use crate::credential::models::OwnerRef;
use crate::credential::models::Scope;
use crate::credential::models::Team;
use crate::credential::models::TeamBrokerClient;
use crate::credential::models::TokenPurpose;
use crate::credential::models::SCOPE_DEVICE_PROVISION;
use crate::credential::models::SCOPE_PASSWORD_RESET;
use crate::credential::ports::AccessTokenRepository;
use crate::credential::ports::AuthClientRepository;
use crate::credential::ports::BrokerClientRepository;
use crate::credential::ports::TeamBrokerClientRepository;
use crate::user::models::UserId;

/// Password-reset tokens always expire after this long.
const PASSWORD_RESET_TTL_HOURS: i64 = 48;

/// Credential issuance service.
///
/// Every entry point goes through the same replace-or-create primitive:
/// the repository replaces any live credential for the same owner in one
/// atomic step, and the plaintext secret exists only in the return value.
pub struct TokenIssuer<AT, AC, BC, TB, C>
where
    AT: AccessTokenRepository,
    AC: AuthClientRepository,
    BC: BrokerClientRepository,
    TB: TeamBrokerClientRepository,
    C: SecretCodec,
{
    tokens: Arc<AT>,
    auth_clients: Arc<AC>,
    broker_clients: Arc<BC>,
    team_broker_clients: Arc<TB>,
    codec: Arc<C>,
    broker_url: String,
}

impl<AT, AC, BC, TB, C> TokenIssuer<AT, AC, BC, TB, C>
where
    AT: AccessTokenRepository,
    AC: AuthClientRepository,
    BC: BrokerClientRepository,
    TB: TeamBrokerClientRepository,
    C: SecretCodec,
{
    pub fn new(
        tokens: Arc<AT>,
        auth_clients: Arc<AC>,
        broker_clients: Arc<BC>,
        team_broker_clients: Arc<TB>,
        codec: Arc<C>,
        broker_url: String,
    ) -> Self {
        Self {
            tokens,
            auth_clients,
            broker_clients,
            team_broker_clients,
            codec,
            broker_url,
        }
    }

    /// Replace-or-create an access token for an owner.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    pub async fn issue_access_token(
        &self,
        command: IssueTokenCommand,
    ) -> Result<IssuedToken, CredentialError> {
        let plaintext = token::generate(TokenClass::Access);
        let refresh = command
            .with_refresh
            .then(|| token::generate(TokenClass::Refresh));

        let record = AccessToken {
            digest: self.codec.lookup_digest(&plaintext),
            owner: command.owner,
            purpose: command.purpose,
            scope: command.scope,
            expires_at: command.expires_at,
            refresh_digest: refresh.as_deref().map(|r| self.codec.lookup_digest(r)),
            name: command.name,
            created_at: Utc::now(),
        };

        self.tokens.replace_for_owner(record).await?;
        tracing::debug!(
            owner = %command.owner,
            purpose = command.purpose.as_str(),
            "Access token issued"
        );

        Ok(IssuedToken {
            token: plaintext,
            refresh_token: refresh,
            expires_at: command.expires_at,
        })
    }

    /// Named personal/API token for a user.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    pub async fn issue_personal_token(
        &self,
        user_id: &UserId,
        name: String,
        scope: Scope,
        expires_at: Option<chrono::DateTime<Utc>>,
    ) -> Result<IssuedToken, CredentialError> {
        self.issue_access_token(IssueTokenCommand {
            owner: OwnerRef::user(user_id.0),
            purpose: TokenPurpose::Personal,
            scope,
            expires_at,
            name: Some(name),
            with_refresh: false,
        })
        .await
    }

    /// Device-provisioning token owned by a team.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    pub async fn issue_provisioning_token(
        &self,
        team: &Team,
        expires_at: Option<chrono::DateTime<Utc>>,
    ) -> Result<IssuedToken, CredentialError> {
        self.issue_access_token(IssueTokenCommand {
            owner: OwnerRef::team(team.id.0),
            purpose: TokenPurpose::Provisioning,
            scope: Scope::from_capabilities([SCOPE_DEVICE_PROVISION]),
            expires_at,
            name: None,
            with_refresh: false,
        })
        .await
    }

    /// Password-reset token for a user; fixed 48 hour expiry.
    ///
    /// The `password:reset` scope keeps it out of every general token
    /// lookup.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    pub async fn issue_password_reset_token(
        &self,
        user_id: &UserId,
    ) -> Result<IssuedToken, CredentialError> {
        self.issue_access_token(IssueTokenCommand {
            owner: OwnerRef::user(user_id.0),
            purpose: TokenPurpose::PasswordReset,
            scope: Scope::from_capabilities([SCOPE_PASSWORD_RESET]),
            expires_at: Some(Utc::now() + Duration::hours(PASSWORD_RESET_TTL_HOURS)),
            name: None,
            with_refresh: false,
        })
        .await
    }

    /// Broker credentials for a team resource (instance, device) or a
    /// one-time frontend connection.
    ///
    /// Usernames are derived deterministically — `instance:{team}:{owner}`,
    /// `device:{team}:{owner}`, `frontend:{team}:{owner}` — so the identity
    /// string can be reconstructed without a side lookup. Re-issuing for
    /// the same owner replaces the prior credential in one atomic step and
    /// lands on the same username, so the identity string never changes
    /// underneath a team.
    ///
    /// # Errors
    /// * `UnsupportedBrokerOwner` - Owner kind carries no broker identity
    /// * `DatabaseError` - Database operation failed
    pub async fn issue_broker_credential(
        &self,
        team: &Team,
        owner: OwnerRef,
        owner_xid: &str,
    ) -> Result<BrokerCredentials, CredentialError> {
        let password = token::generate(TokenClass::BrokerPassword);
        let password_hash = self.codec.hash_secret(&password)?;
        let now = Utc::now();

        let username = match owner.kind {
            OwnerKind::Instance | OwnerKind::Device => {
                let kind_word = match owner.kind {
                    OwnerKind::Instance => "instance",
                    _ => "device",
                };
                let topic_segment = match owner.kind {
                    OwnerKind::Instance => "nodes",
                    _ => "devices",
                };
                let username = format!("{}:{}:{}", kind_word, team.external_id, owner_xid);

                self.team_broker_clients
                    .replace_for_owner(TeamBrokerClient {
                        username: username.clone(),
                        team_id: team.id,
                        password: password_hash,
                        acls: format!(
                            "teams/{}/{}/{}/#",
                            team.external_id, topic_segment, owner_xid
                        ),
                        owner,
                        created_at: now,
                    })
                    .await?;
                username
            }
            OwnerKind::Frontend => {
                let username = format!("frontend:{}:{}", team.external_id, owner_xid);

                self.broker_clients
                    .replace_for_owner(BrokerClient {
                        username: username.clone(),
                        password: password_hash,
                        acls: Some(format!("teams/{}/nodes/{}/#", team.external_id, owner_xid)),
                        owner,
                        created_at: now,
                    })
                    .await?;
                username
            }
            kind => return Err(CredentialError::UnsupportedBrokerOwner(kind)),
        };

        tracing::debug!(team = %team.external_id, username = %username, "Broker credential issued");

        Ok(BrokerCredentials {
            url: self.broker_url.clone(),
            username,
            password,
        })
    }

    /// Broker credentials for the platform itself.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    pub async fn issue_platform_broker_credential(
        &self,
        username: &str,
    ) -> Result<BrokerCredentials, CredentialError> {
        let password = token::generate(TokenClass::BrokerPassword);
        let password_hash = self.codec.hash_secret(&password)?;

        self.broker_clients
            .replace_for_owner(BrokerClient {
                username: username.to_string(),
                password: password_hash,
                acls: None,
                owner: OwnerRef::platform(),
                created_at: Utc::now(),
            })
            .await?;

        Ok(BrokerCredentials {
            url: self.broker_url.clone(),
            username: username.to_string(),
            password,
        })
    }

    /// Client-credential pair for an instance.
    ///
    /// Each issuance mints a fresh client id, so a replaced credential can
    /// never collide with its predecessor in flight.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    pub async fn issue_auth_client(
        &self,
        owner: OwnerRef,
    ) -> Result<IssuedAuthClient, CredentialError> {
        let client_id = format!("cid_{}", Uuid::new_v4().simple());
        let client_secret = token::generate(TokenClass::ClientSecret);

        self.auth_clients
            .replace_for_owner(AuthClient {
                client_id: client_id.clone(),
                client_secret: self.codec.hash_secret(&client_secret)?,
                owner,
                created_at: Utc::now(),
            })
            .await?;

        Ok(IssuedAuthClient {
            client_id,
            client_secret,
        })
    }
}
