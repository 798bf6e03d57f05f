//! Database query functions for the `plan_overrides` table.
//!
//! The table is an append-only log: rows are inserted and read, never
//! updated.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{OverrideScope, PlanOverride};

/// Parameters for appending an override to a plan's log.
#[derive(Debug, Clone)]
pub struct NewOverride {
    pub plan_id: Uuid,
    pub scope: OverrideScope,
    pub week_number: Option<i32>,
    pub session_key: Option<String>,
    pub patch: serde_json::Value,
    pub note: Option<String>,
}

/// Append an override. Returns the row with its id and log position.
pub async fn insert_override(pool: &PgPool, new: &NewOverride) -> Result<PlanOverride> {
    let row = sqlx::query_as::<_, PlanOverride>(
        "INSERT INTO plan_overrides (plan_id, scope, week_number, session_key, patch, note) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING *",
    )
    .bind(new.plan_id)
    .bind(new.scope)
    .bind(new.week_number)
    .bind(&new.session_key)
    .bind(&new.patch)
    .bind(&new.note)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert {} override for plan {}", new.scope, new.plan_id))?;

    Ok(row)
}

/// List the SESSION-scope overrides for one session of a plan, in the
/// order they were recorded.
pub async fn list_session_overrides(
    pool: &PgPool,
    plan_id: Uuid,
    session_key: &str,
) -> Result<Vec<PlanOverride>> {
    let rows = sqlx::query_as::<_, PlanOverride>(
        "SELECT * FROM plan_overrides \
         WHERE plan_id = $1 AND scope = 'SESSION' AND session_key = $2 \
         ORDER BY seq ASC",
    )
    .bind(plan_id)
    .bind(session_key)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to list overrides for session {session_key:?}"))?;

    Ok(rows)
}
