use serde_json::Value as JsonValue;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::dto::activity_dto::ActivityListQuery;
use crate::dto::common::{Page, PageWindow};
use crate::error::Result;
use crate::models::activity_log::{ActivityLog, ActivityLogRow, ActivityTarget};
use crate::models::enums::ActivityAction;

const COLUMNS: &str = "id, actor_id, action, target_type, target_id, details, created_at";

#[derive(Clone)]
pub struct ActivityService {
    pool: PgPool,
}

impl ActivityService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends an entry inside the caller's transaction so the log commits
    /// or rolls back together with the change it describes.
    pub async fn record_in(
        conn: &mut PgConnection,
        actor_id: Option<Uuid>,
        action: ActivityAction,
        target: ActivityTarget,
        details: Option<JsonValue>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO activity_logs (id, actor_id, action, target_type, target_id, details)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor_id)
        .bind(action)
        .bind(target.kind())
        .bind(target.id())
        .bind(details)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn list(&self, query: ActivityListQuery) -> Result<Page<ActivityLog>> {
        let window = PageWindow::from_query(query.page, query.per_page);

        let mut items_sql: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM activity_logs WHERE TRUE"));
        let mut count_sql: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM activity_logs WHERE TRUE");
        for builder in [&mut items_sql, &mut count_sql] {
            if let Some(kind) = query.target_type {
                builder.push(" AND target_type = ").push_bind(kind);
            }
            if let Some(target_id) = query.target_id {
                builder.push(" AND target_id = ").push_bind(target_id);
            }
            if let Some(actor_id) = query.actor_id {
                builder.push(" AND actor_id = ").push_bind(actor_id);
            }
        }
        items_sql
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(window.per_page)
            .push(" OFFSET ")
            .push_bind(window.offset());

        let rows: Vec<ActivityLogRow> = items_sql.build_query_as().fetch_all(&self.pool).await?;
        let total: i64 = count_sql.build_query_scalar().fetch_one(&self.pool).await?;

        Ok(Page::new(
            rows.into_iter().map(ActivityLog::from).collect(),
            total,
            window,
        ))
    }
}
