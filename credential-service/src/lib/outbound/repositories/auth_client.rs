use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use secrets::HashedSecret;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::credential::errors::CredentialError;
use crate::credential::models::AuthClient;
use crate::credential::models::OwnerKind;
use crate::credential::models::OwnerRef;
use crate::credential::ports::AuthClientRepository;

pub struct PostgresAuthClientRepository {
    pool: PgPool,
}

impl PostgresAuthClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn client_from_row(row: &PgRow) -> Result<AuthClient, CredentialError> {
    let owner_type: String = row
        .try_get("owner_type")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let owner_kind = OwnerKind::parse(&owner_type)
        .ok_or_else(|| CredentialError::DatabaseError(format!("unknown owner type: {owner_type}")))?;

    let client_id: String = row
        .try_get("client_id")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let client_secret: String = row
        .try_get("client_secret")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let owner_id: Uuid = row
        .try_get("owner_id")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

    Ok(AuthClient {
        client_id,
        client_secret: HashedSecret::from_stored(client_secret),
        owner: OwnerRef::new(owner_kind, owner_id),
        created_at,
    })
}

#[async_trait]
impl AuthClientRepository for PostgresAuthClientRepository {
    async fn replace_for_owner(&self, client: AuthClient) -> Result<(), CredentialError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM auth_clients WHERE owner_type = $1 AND owner_id = $2")
            .bind(client.owner.kind.as_str())
            .bind(client.owner.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO auth_clients (client_id, client_secret, owner_type, owner_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&client.client_id)
        .bind(client.client_secret.as_str())
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

    async fn find_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<AuthClient>, CredentialError> {
        let row = sqlx::query(
            r#"
            SELECT client_id, client_secret, owner_type, owner_id, created_at
            FROM auth_clients
            WHERE client_id = $1
            "#,
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        row.as_ref().map(client_from_row).transpose()
    }

    async fn delete(&self, client_id: &str) -> Result<(), CredentialError> {
        sqlx::query("DELETE FROM auth_clients WHERE client_id = $1")
            .bind(client_id)
            .execute(&self.pool)
            .await
            .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
