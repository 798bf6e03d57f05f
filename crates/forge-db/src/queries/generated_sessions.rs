//! Database query functions for the `generated_sessions` table.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::models::{GeneratedSession, SessionStatus};

/// Insert or refresh the generated session for `(plan_id, session_key)`.
///
/// A single `INSERT ... ON CONFLICT` statement, so concurrent callers for
/// the same key serialize on the unique index and the last writer's
/// snapshot wins. On conflict only `snapshot` and `updated_at` change: the
/// row keeps its `id`, `status`, `scheduled_at`, and `created_at`.
pub async fn upsert_generated_session(
    pool: &PgPool,
    plan_id: Uuid,
    user_id: Uuid,
    session_key: &str,
    scheduled_at: Option<DateTime<Utc>>,
    snapshot: &serde_json::Value,
) -> Result<GeneratedSession> {
    let row = sqlx::query_as::<_, GeneratedSession>(
        "INSERT INTO generated_sessions (plan_id, user_id, session_key, scheduled_at, status, snapshot) \
         VALUES ($1, $2, $3, $4, 'PLANNED', $5) \
         ON CONFLICT (plan_id, session_key) DO UPDATE SET \
             snapshot = EXCLUDED.snapshot, \
             updated_at = clock_timestamp() \
         RETURNING *",
    )
    .bind(plan_id)
    .bind(user_id)
    .bind(session_key)
    .bind(scheduled_at)
    .bind(snapshot)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to upsert generated session {session_key:?} for plan {plan_id}"))?;

    debug!(plan_id = %plan_id, session_key, id = %row.id, "generated session stored");
    Ok(row)
}

/// Fetch a generated session by its ID.
pub async fn get_generated_session_by_id(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<GeneratedSession>> {
    let row = sqlx::query_as::<_, GeneratedSession>("SELECT * FROM generated_sessions WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch generated session")?;

    Ok(row)
}

/// List a plan's generated sessions ordered by session key as text, so
/// `W10D1` sorts before `W2D1`.
pub async fn list_generated_sessions(pool: &PgPool, plan_id: Uuid) -> Result<Vec<GeneratedSession>> {
    let rows = sqlx::query_as::<_, GeneratedSession>(
        "SELECT * FROM generated_sessions WHERE plan_id = $1 ORDER BY session_key ASC",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await
    .context("failed to list generated sessions")?;

    Ok(rows)
}

/// Update the status of a generated session. Returns the updated row.
pub async fn update_session_status(
    pool: &PgPool,
    id: Uuid,
    status: SessionStatus,
) -> Result<GeneratedSession> {
    let row = sqlx::query_as::<_, GeneratedSession>(
        "UPDATE generated_sessions \
         SET status = $1, updated_at = clock_timestamp() \
         WHERE id = $2 \
         RETURNING *",
    )
    .bind(status)
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("failed to update generated session status")?;

    row.with_context(|| format!("generated session {id} not found"))
}
