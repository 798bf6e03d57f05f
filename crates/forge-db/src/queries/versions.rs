//! Database query functions for the `program_versions` table.
//!
//! Versions are immutable: there is no update function here.

use anyhow::{Context, Result};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::ProgramVersion;

/// Insert the next version of a template.
///
/// The version number is `max(version) + 1` for the template (1 for the
/// first). Two concurrent inserts for the same template collide on the
/// `(template_id, version)` unique constraint and the loser gets an error.
pub async fn insert_next_version<'e, E>(
    executor: E,
    template_id: Uuid,
    definition: &serde_json::Value,
    defaults: &serde_json::Value,
    parent_version_id: Option<Uuid>,
) -> Result<ProgramVersion>
where
    E: PgExecutor<'e>,
{
    let version = sqlx::query_as::<_, ProgramVersion>(
        "INSERT INTO program_versions (template_id, version, definition, defaults, parent_version_id) \
         VALUES ( \
             $1, \
             (SELECT COALESCE(MAX(version), 0) + 1 FROM program_versions WHERE template_id = $1), \
             $2, $3, $4 \
         ) \
         RETURNING *",
    )
    .bind(template_id)
    .bind(definition)
    .bind(defaults)
    .bind(parent_version_id)
    .fetch_one(executor)
    .await
    .with_context(|| format!("failed to insert version for template {template_id}"))?;

    Ok(version)
}

/// Fetch a version by its ID.
pub async fn get_version(pool: &PgPool, id: Uuid) -> Result<Option<ProgramVersion>> {
    let version =
        sqlx::query_as::<_, ProgramVersion>("SELECT * FROM program_versions WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch program version")?;

    Ok(version)
}

/// Fetch the highest-numbered version of a template.
pub async fn get_latest_version<'e, E>(
    executor: E,
    template_id: Uuid,
) -> Result<Option<ProgramVersion>>
where
    E: PgExecutor<'e>,
{
    let version = sqlx::query_as::<_, ProgramVersion>(
        "SELECT * FROM program_versions \
         WHERE template_id = $1 \
         ORDER BY version DESC \
         LIMIT 1",
    )
    .bind(template_id)
    .fetch_optional(executor)
    .await
    .context("failed to fetch latest program version")?;

    Ok(version)
}
