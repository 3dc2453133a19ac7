use sqlx::PgConnection;
use uuid::Uuid;

use super::EntityKind;
use crate::error::{Error, Result};

/// One foreign-key-like field of a row about to be written.
#[derive(Debug, Clone, Copy)]
pub struct Reference {
    pub kind: EntityKind,
    pub id: Uuid,
    pub field: &'static str,
}

impl Reference {
    pub fn new(kind: EntityKind, id: Uuid, field: &'static str) -> Self {
        Self { kind, id, field }
    }

    pub fn optional(kind: EntityKind, id: Option<Uuid>, field: &'static str) -> Option<Self> {
        id.map(|id| Self::new(kind, id, field))
    }
}

/// Confirms the referenced row exists and holds a key-share lock on it until
/// the surrounding transaction ends, so it cannot be deleted underneath the
/// write that depends on it.
pub async fn ensure_exists(
    conn: &mut PgConnection,
    kind: EntityKind,
    id: Uuid,
    field: &str,
) -> Result<()> {
    let query = format!("SELECT id FROM {} WHERE id = $1 FOR KEY SHARE", kind.table());
    let found: Option<Uuid> = sqlx::query_scalar(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match found {
        Some(_) => Ok(()),
        None => {
            tracing::debug!(table = kind.table(), %id, field, "dangling reference rejected");
            Err(Error::InvalidReference(field.to_string()))
        }
    }
}

pub async fn ensure_optional(
    conn: &mut PgConnection,
    kind: EntityKind,
    id: Option<Uuid>,
    field: &str,
) -> Result<()> {
    match id {
        Some(id) => ensure_exists(conn, kind, id, field).await,
        None => Ok(()),
    }
}

/// Checks a batch of references in order; the first missing one wins.
pub async fn check_references<I>(conn: &mut PgConnection, refs: I) -> Result<()>
where
    I: IntoIterator<Item = Reference>,
{
    for r in refs {
        ensure_exists(conn, r.kind, r.id, r.field).await?;
    }
    Ok(())
}

/// Every id in `ids` must exist. Duplicates are tolerated. Found rows are
/// key-share locked like in [`ensure_exists`].
pub async fn ensure_all_exist(
    conn: &mut PgConnection,
    kind: EntityKind,
    ids: &[Uuid],
    field: &str,
) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let mut unique = ids.to_vec();
    unique.sort_unstable();
    unique.dedup();

    let query = format!(
        "SELECT id FROM {} WHERE id = ANY($1) ORDER BY id FOR KEY SHARE",
        kind.table()
    );
    let found: Vec<Uuid> = sqlx::query_scalar(&query)
        .bind(&unique)
        .fetch_all(&mut *conn)
        .await?;
    if found.len() == unique.len() {
        Ok(())
    } else {
        tracing::debug!(
            table = kind.table(),
            field,
            missing = unique.len() - found.len(),
            "dangling reference rejected"
        );
        Err(Error::InvalidReference(field.to_string()))
    }
}
