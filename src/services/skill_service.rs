//! Skill tags shared by jobs and candidates. Names are stored lowercased so
//! "Rust" and "rust " land on the same row.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::Result;
use crate::models::skill::Skill;

const COLUMNS: &str = "id, name, created_at, updated_at";

pub fn normalize_skill_names(names: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim().to_lowercase();
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

pub async fn upsert_skills(conn: &mut PgConnection, names: &[String]) -> Result<Vec<Skill>> {
    let mut skills = Vec::new();
    for name in normalize_skill_names(names) {
        let skill: Skill = sqlx::query_as(&format!(
            r#"
            INSERT INTO skills (id, name) VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&name)
        .fetch_one(&mut *conn)
        .await?;
        skills.push(skill);
    }
    Ok(skills)
}

/// Which join table a skill list belongs to.
#[derive(Debug, Clone, Copy)]
pub enum SkillOwner {
    Job(Uuid),
    Candidate(Uuid),
}

impl SkillOwner {
    fn table_and_column(&self) -> (&'static str, &'static str, Uuid) {
        match *self {
            SkillOwner::Job(id) => ("job_skills", "job_id", id),
            SkillOwner::Candidate(id) => ("candidate_skills", "candidate_id", id),
        }
    }
}

/// Replaces the owner's skill set with `names`.
pub async fn replace_skills(
    conn: &mut PgConnection,
    owner: SkillOwner,
    names: &[String],
) -> Result<Vec<Skill>> {
    let (table, column, owner_id) = owner.table_and_column();
    sqlx::query(&format!("DELETE FROM {table} WHERE {column} = $1"))
        .bind(owner_id)
        .execute(&mut *conn)
        .await?;

    let skills = upsert_skills(conn, names).await?;
    for skill in &skills {
        sqlx::query(&format!(
            "INSERT INTO {table} (id, {column}, skill_id) VALUES ($1, $2, $3)"
        ))
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(skill.id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(skills)
}

pub async fn skills_of(pool: &PgPool, owner: SkillOwner) -> Result<Vec<Skill>> {
    let (table, column, owner_id) = owner.table_and_column();
    let skills = sqlx::query_as::<_, Skill>(&format!(
        "SELECT s.id, s.name, s.created_at, s.updated_at
         FROM skills s JOIN {table} o ON o.skill_id = s.id
         WHERE o.{column} = $1
         ORDER BY s.name"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(skills)
}

#[cfg(test)]
mod tests {
    use super::normalize_skill_names;

    #[test]
    fn names_are_trimmed_lowercased_and_deduplicated() {
        let input = vec![
            " Rust".to_string(),
            "rust".to_string(),
            "".to_string(),
            "PostgreSQL ".to_string(),
        ];
        assert_eq!(normalize_skill_names(&input), vec!["rust", "postgresql"]);
    }
}
