use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use secrets::LookupDigest;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::credential::errors::CredentialError;
use crate::credential::models::AccessToken;
use crate::credential::models::OwnerKind;
use crate::credential::models::OwnerRef;
use crate::credential::models::Scope;
use crate::credential::models::TokenPurpose;
use crate::credential::ports::AccessTokenRepository;

pub struct PostgresAccessTokenRepository {
    pool: PgPool,
}

impl PostgresAccessTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn token_from_row(row: &PgRow) -> Result<AccessToken, CredentialError> {
    let owner_type: String = row
        .try_get("owner_type")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let owner_kind = OwnerKind::parse(&owner_type)
        .ok_or_else(|| CredentialError::DatabaseError(format!("unknown owner type: {owner_type}")))?;

    let purpose: String = row
        .try_get("purpose")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let purpose = TokenPurpose::parse(&purpose)
        .ok_or_else(|| CredentialError::DatabaseError(format!("unknown purpose: {purpose}")))?;

    let owner_id: Uuid = row
        .try_get("owner_id")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let digest: String = row
        .try_get("digest")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let scope: String = row
        .try_get("scope")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let expires_at: Option<DateTime<Utc>> = row
        .try_get("expires_at")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let refresh_digest: Option<String> = row
        .try_get("refresh_digest")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let name: Option<String> = row
        .try_get("name")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

    Ok(AccessToken {
        digest: LookupDigest::from_stored(digest),
        owner: OwnerRef::new(owner_kind, owner_id),
        purpose,
        scope: Scope::from_storage(&scope),
        expires_at,
        refresh_digest: refresh_digest.map(LookupDigest::from_stored),
        name,
        created_at,
    })
}

#[async_trait]
impl AccessTokenRepository for PostgresAccessTokenRepository {
    async fn replace_for_owner(&self, token: AccessToken) -> Result<(), CredentialError> {
        // One transaction: the unique index on (owner_type, owner_id,
        // purpose) makes concurrent replacements serialize instead of
        // leaving two live tokens.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        sqlx::query(
            r#"
            DELETE FROM access_tokens
            WHERE owner_type = $1 AND owner_id = $2 AND purpose = $3
            "#,
        )
        .bind(token.owner.kind.as_str())
        .bind(token.owner.id)
        .bind(token.purpose.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO access_tokens
                (digest, owner_type, owner_id, purpose, scope, expires_at, refresh_digest, name, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(token.digest.as_str())
        .bind(token.owner.kind.as_str())
        .bind(token.owner.id)
        .bind(token.purpose.as_str())
        .bind(token.scope.to_storage())
        .bind(token.expires_at)
        .bind(token.refresh_digest.as_ref().map(|d| d.as_str().to_string()))
        .bind(token.name.as_deref())
        .bind(token.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| CredentialError::DatabaseError(e.to_string()))
    }

    async fn find_by_digest(
        &self,
        digest: &LookupDigest,
    ) -> Result<Option<AccessToken>, CredentialError> {
        let row = sqlx::query(
            r#"
            SELECT digest, owner_type, owner_id, purpose, scope, expires_at, refresh_digest, name, created_at
            FROM access_tokens
            WHERE digest = $1
            "#,
        )
        .bind(digest.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        row.as_ref().map(token_from_row).transpose()
    }

    async fn delete(&self, digest: &LookupDigest) -> Result<(), CredentialError> {
        sqlx::query("DELETE FROM access_tokens WHERE digest = $1")
            .bind(digest.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
