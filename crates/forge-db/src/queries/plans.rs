//! Database query functions for the `plans` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Plan, PlanType};

/// Parameters for inserting a new plan row.
#[derive(Debug, Clone)]
pub struct NewPlan {
    pub user_id: Uuid,
    pub name: String,
    pub plan_type: PlanType,
    pub root_program_version_id: Option<Uuid>,
    pub params: serde_json::Value,
}

/// Insert a new plan row. Returns the inserted plan with server-generated
/// defaults (id, created_at, is_archived).
pub async fn insert_plan(pool: &PgPool, new: &NewPlan) -> Result<Plan> {
    let plan = sqlx::query_as::<_, Plan>(
        "INSERT INTO plans (user_id, name, plan_type, root_program_version_id, params) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(new.user_id)
    .bind(&new.name)
    .bind(new.plan_type)
    .bind(new.root_program_version_id)
    .bind(&new.params)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert plan {:?}", new.name))?;

    Ok(plan)
}

/// Fetch a plan by its ID.
pub async fn get_plan(pool: &PgPool, id: Uuid) -> Result<Option<Plan>> {
    let plan = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch plan")?;

    Ok(plan)
}
