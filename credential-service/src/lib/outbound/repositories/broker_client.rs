use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use secrets::HashedSecret;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::credential::errors::CredentialError;
use crate::credential::models::BrokerClient;
use crate::credential::models::OwnerKind;
use crate::credential::models::OwnerRef;
use crate::credential::ports::BrokerClientRepository;

pub struct PostgresBrokerClientRepository {
    pool: PgPool,
}

impl PostgresBrokerClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn client_from_row(row: &PgRow) -> Result<BrokerClient, CredentialError> {
    let owner_type: String = row
        .try_get("owner_type")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let owner_kind = OwnerKind::parse(&owner_type)
        .ok_or_else(|| CredentialError::DatabaseError(format!("unknown owner type: {owner_type}")))?;

    let username: String = row
        .try_get("username")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let password: String = row
        .try_get("password")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let acls: Option<String> = row
        .try_get("acls")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let owner_id: Uuid = row
        .try_get("owner_id")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

    Ok(BrokerClient {
        username,
        password: HashedSecret::from_stored(password),
        acls,
        owner: OwnerRef::new(owner_kind, owner_id),
        created_at,
    })
}

#[async_trait]
impl BrokerClientRepository for PostgresBrokerClientRepository {
    async fn replace_for_owner(&self, client: BrokerClient) -> Result<(), CredentialError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM broker_clients WHERE owner_type = $1 AND owner_id = $2")
            .bind(client.owner.kind.as_str())
            .bind(client.owner.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO broker_clients (username, password, acls, owner_type, owner_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&client.username)
        .bind(client.password.as_str())
        .bind(client.acls.as_deref())
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
        username: &str,
    ) -> Result<Option<BrokerClient>, CredentialError> {
        // Case-insensitive unique key.
        let row = sqlx::query(
            r#"
            SELECT username, password, acls, owner_type, owner_id, created_at
            FROM broker_clients
            WHERE LOWER(username) = LOWER($1)
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        row.as_ref().map(client_from_row).transpose()
    }

    async fn delete(&self, username: &str) -> Result<(), CredentialError> {
        sqlx::query("DELETE FROM broker_clients WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
