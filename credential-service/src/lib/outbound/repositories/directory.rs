use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::credential::errors::CredentialError;
use crate::credential::models::OwnerKind;
use crate::credential::models::OwnerRef;
use crate::credential::models::ResolvedOwner;
use crate::credential::models::Team;
use crate::credential::models::TeamId;
use crate::credential::ports::ExternalIdCodec;
use crate::credential::ports::OwnerDirectory;
use crate::credential::ports::TeamDirectory;

/// Owner resolution over the platform tables.
///
/// One dispatch point for the closed owner-kind set; the external-id
/// codec stays an adapter concern so the domain only ever sees encoded
/// ids.
pub struct PostgresOwnerDirectory {
    pool: PgPool,
    codec: Arc<dyn ExternalIdCodec>,
}

impl PostgresOwnerDirectory {
    pub fn new(pool: PgPool, codec: Arc<dyn ExternalIdCodec>) -> Self {
        Self { pool, codec }
    }

    async fn resolve_team_scoped(
        &self,
        table: &str,
        id: Uuid,
    ) -> Result<Option<ResolvedOwner>, CredentialError> {
        // `table` is one of two fixed literals, never caller input.
        let row = sqlx::query(&format!("SELECT id, team_id FROM {table} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let team_id: Uuid = row
            .try_get("team_id")
            .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        Ok(Some(ResolvedOwner {
            external_id: self.codec.encode(&id),
            team_id: Some(TeamId(team_id)),
        }))
    }

    async fn resolve_plain(
        &self,
        table: &str,
        id: Uuid,
    ) -> Result<Option<ResolvedOwner>, CredentialError> {
        let row = sqlx::query(&format!("SELECT id FROM {table} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        Ok(row.map(|_| ResolvedOwner {
            external_id: self.codec.encode(&id),
            team_id: None,
        }))
    }
}

#[async_trait]
impl OwnerDirectory for PostgresOwnerDirectory {
    async fn resolve(&self, owner: &OwnerRef) -> Result<Option<ResolvedOwner>, CredentialError> {
        match owner.kind {
            OwnerKind::Instance => self.resolve_team_scoped("instances", owner.id).await,
            OwnerKind::Device => self.resolve_team_scoped("devices", owner.id).await,
            OwnerKind::Team => self.resolve_plain("teams", owner.id).await,
            OwnerKind::User => self.resolve_plain("users", owner.id).await,
            // Pseudo-owners have no backing row.
            OwnerKind::Platform | OwnerKind::Frontend => Ok(None),
        }
    }
}

/// Team lookup keyed by the externally-visible id.
pub struct PostgresTeamDirectory {
    pool: PgPool,
    codec: Arc<dyn ExternalIdCodec>,
}

impl PostgresTeamDirectory {
    pub fn new(pool: PgPool, codec: Arc<dyn ExternalIdCodec>) -> Self {
        Self { pool, codec }
    }
}

#[async_trait]
impl TeamDirectory for PostgresTeamDirectory {
    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Team>, CredentialError> {
        // An undecodable external id is "not found", never a fault.
        let Some(id) = self.codec.decode(external_id) else {
            return Ok(None);
        };

        let row = sqlx::query(
            r#"
            SELECT id, name, suspended, features
            FROM teams
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let name: String = row
            .try_get("name")
            .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
        let suspended: bool = row
            .try_get("suspended")
            .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;
        let features: Vec<String> = row
            .try_get("features")
            .map_err(|e| CredentialError::DatabaseError(e.to_string()))?;

        Ok(Some(Team {
            id: TeamId(id),
            external_id: external_id.to_string(),
            name,
            suspended,
            features,
        }))
    }
}
