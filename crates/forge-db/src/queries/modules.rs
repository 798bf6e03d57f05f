//! Database query functions for the `plan_modules` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ModuleTarget, PlanModule};

/// Attach a module to a COMPOSITE plan, or replace the module already
/// attached for the same target.
pub async fn upsert_module(
    pool: &PgPool,
    plan_id: Uuid,
    target: ModuleTarget,
    program_version_id: Uuid,
    priority: i32,
    params: &serde_json::Value,
) -> Result<PlanModule> {
    let module = sqlx::query_as::<_, PlanModule>(
        "INSERT INTO plan_modules (plan_id, target, program_version_id, priority, params) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (plan_id, target) DO UPDATE SET \
             program_version_id = EXCLUDED.program_version_id, \
             priority = EXCLUDED.priority, \
             params = EXCLUDED.params \
         RETURNING *",
    )
    .bind(plan_id)
    .bind(target)
    .bind(program_version_id)
    .bind(priority)
    .bind(params)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to upsert {target} module for plan {plan_id}"))?;

    Ok(module)
}

/// List a plan's modules in session order (ascending priority). Ties are
/// broken by target name so the order is deterministic.
pub async fn list_modules_for_plan(pool: &PgPool, plan_id: Uuid) -> Result<Vec<PlanModule>> {
    let modules = sqlx::query_as::<_, PlanModule>(
        "SELECT * FROM plan_modules WHERE plan_id = $1 ORDER BY priority ASC, target ASC",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await
    .context("failed to list plan modules")?;

    Ok(modules)
}
