use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use secrets::HashedSecret;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::credential::errors::CredentialError;
use crate::credential::models::OwnerKind;
use crate::credential::models::OwnerRef;
use crate::credential::models::TeamBrokerClient;
use crate::credential::models::TeamId;
use crate::credential::ports::TeamBrokerClientRepository;

pub struct PostgresTeamBrokerClientRepository {
    pool: PgPool,
}

impl PostgresTeamBrokerClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn client_from_row(row: &PgRow) -> Result<TeamBrokerClient, CredentialError> {
    let owner_type: String = row
        .try_get("owner_type")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let owner_kind = OwnerKind::parse(&owner_type)
        .ok_or_else(|| CredentialError::DatabaseError(format!("unknown owner type: {owner_type}")))?;

    let username: String = row
        .try_get("username")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let team_id: Uuid = row
        .try_get("team_id")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let password: String = row
        .try_get("password")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let acls: String = row
        .try_get("acls")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let owner_id: Uuid = row
        .try_get("owner_id")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

    Ok(TeamBrokerClient {
        username,
        team_id: TeamId(team_id),
        password: HashedSecret::from_stored(password),
        acls,
        owner: OwnerRef::new(owner_kind, owner_id),
        created_at,
    })
}

#[async_trait]
impl TeamBrokerClientRepository for PostgresTeamBrokerClientRepository {
    async fn replace_for_owner(&self, client: TeamBrokerClient) -> Result<(), CredentialError> {
        // One transaction; the unique indexes on (owner_type, owner_id)
        // and (team_id, username) serialize concurrent replacements.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM team_broker_clients WHERE owner_type = $1 AND owner_id = $2")
            .bind(client.owner.kind.as_str())
            .bind(client.owner.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO team_broker_clients
                (username, team_id, password, acls, owner_type, owner_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&client.username)
        .bind(client.team_id.0)
        .bind(client.password.as_str())
        .bind(&client.acls)
        .bind(client.owner.kind.as_str())
        .bind(client.owner.id)
        .bind(client.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| CredentialError::DatabaseError(e.to_string()))
    }

    async fn find_by_username(
        &self,
        team_id: &TeamId,
        username: &str,
    ) -> Result<Option<TeamBrokerClient>, CredentialError> {
        let row = sqlx::query(
            r#"
            SELECT username, team_id, password, acls, owner_type, owner_id, created_at
            FROM team_broker_clients
            WHERE team_id = $1 AND username = $2
            "#,
        )
        .bind(team_id.0)
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        row.as_ref().map(client_from_row).transpose()
    }

    async fn delete_for_owner(&self, owner: &OwnerRef) -> Result<(), CredentialError> {
        sqlx::query("DELETE FROM team_broker_clients WHERE owner_type = $1 AND owner_id = $2")
            .bind(owner.kind.as_str())
            .bind(owner.id)
            .execute(&self.pool)
            .await
            .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
