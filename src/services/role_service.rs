use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::auth_dto::UpdateRolePayload;
use crate::error::{Error, Result};
use crate::models::role::Role;

pub(crate) const COLUMNS: &str = "id, name, description, permissions, created_at, updated_at";

#[derive(Clone)]
pub struct RoleService {
    pool: PgPool,
}

impl RoleService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(&format!("SELECT {COLUMNS} FROM roles ORDER BY name"))
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Role> {
        sqlx::query_as::<_, Role>(&format!("SELECT {COLUMNS} FROM roles WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Role not found".into()))
    }

    /// Role names are fixed; only the description and permission set change.
    pub async fn update(&self, id: Uuid, payload: UpdateRolePayload) -> Result<Role> {
        let permissions = payload.permissions.map(|mut p| {
            p.sort_by_key(|perm| perm.as_str());
            p.dedup();
            Json(p)
        });
        let role = sqlx::query_as::<_, Role>(&format!(
            r#"
            UPDATE roles
            SET description = COALESCE($2, description),
                permissions = COALESCE($3, permissions),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&payload.description)
        .bind(permissions)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Role not found".into()))?;

        tracing::info!(role = %role.name, permissions = role.permissions.0.len(), "role updated");
        Ok(role)
    }
}
