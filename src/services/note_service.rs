//! Free-text notes and linked files on a candidate.

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::candidate_dto::{CreateAttachmentPayload, CreateNotePayload};
use crate::error::{Error, Result};
use crate::integrity::references::ensure_exists;
use crate::integrity::EntityKind;
use crate::models::activity_log::ActivityTarget;
use crate::models::enums::ActivityAction;
use crate::models::note::{Attachment, Note};
use crate::services::activity_service::ActivityService;

pub(crate) const NOTE_COLUMNS: &str = "id, candidate_id, author_id, content, created_at, updated_at";
pub(crate) const ATTACHMENT_COLUMNS: &str =
    "id, candidate_id, uploaded_by_id, file_name, file_url, content_type, created_at, updated_at";

#[derive(Clone)]
pub struct NoteService {
    pool: PgPool,
}

impl NoteService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn add_note(
        &self,
        actor: Option<Uuid>,
        candidate_id: Uuid,
        payload: CreateNotePayload,
    ) -> Result<Note> {
        let mut tx = self.pool.begin().await?;
        ensure_exists(&mut tx, EntityKind::Candidate, candidate_id, "candidate_id").await?;

        let note: Note = sqlx::query_as(&format!(
            "INSERT INTO notes (id, candidate_id, author_id, content) VALUES ($1, $2, $3, $4) RETURNING {NOTE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(candidate_id)
        .bind(actor)
        .bind(payload.content.trim())
        .fetch_one(&mut *tx)
        .await?;

        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Updated,
            ActivityTarget::Candidate(candidate_id),
            Some(json!({ "note_id": note.id })),
        )
        .await?;
        tx.commit().await?;
        Ok(note)
    }

    pub async fn list_notes(&self, candidate_id: Uuid) -> Result<Vec<Note>> {
        let rows = sqlx::query_as::<_, Note>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE candidate_id = $1 ORDER BY created_at DESC"
        ))
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn delete_note(&self, candidate_id: Uuid, note_id: Uuid) -> Result<()> {
        let res = sqlx::query("DELETE FROM notes WHERE id = $1 AND candidate_id = $2")
            .bind(note_id)
            .bind(candidate_id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("Note not found".into()));
        }
        Ok(())
    }

    pub async fn add_attachment(
        &self,
        actor: Option<Uuid>,
        candidate_id: Uuid,
        payload: CreateAttachmentPayload,
    ) -> Result<Attachment> {
        let mut tx = self.pool.begin().await?;
        ensure_exists(&mut tx, EntityKind::Candidate, candidate_id, "candidate_id").await?;

        let attachment: Attachment = sqlx::query_as(&format!(
            r#"
            INSERT INTO attachments (id, candidate_id, uploaded_by_id, file_name, file_url, content_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ATTACHMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(candidate_id)
        .bind(actor)
        .bind(&payload.file_name)
        .bind(&payload.file_url)
        .bind(&payload.content_type)
        .fetch_one(&mut *tx)
        .await?;

        ActivityService::record_in(
            &mut tx,
            actor,
            ActivityAction::Updated,
            ActivityTarget::Candidate(candidate_id),
            Some(json!({ "attachment_id": attachment.id, "file_name": attachment.file_name })),
        )
        .await?;
        tx.commit().await?;
        Ok(attachment)
    }

    pub async fn list_attachments(&self, candidate_id: Uuid) -> Result<Vec<Attachment>> {
        let rows = sqlx::query_as::<_, Attachment>(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE candidate_id = $1 ORDER BY created_at DESC"
        ))
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn delete_attachment(&self, candidate_id: Uuid, attachment_id: Uuid) -> Result<()> {
        let res = sqlx::query("DELETE FROM attachments WHERE id = $1 AND candidate_id = $2")
            .bind(attachment_id)
            .bind(candidate_id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("Attachment not found".into()));
        }
        Ok(())
    }
}
