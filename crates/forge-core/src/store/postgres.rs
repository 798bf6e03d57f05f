//! [`PlanStore`] over a PostgreSQL pool, delegating to `forge_db::queries`.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use forge_db::models::{
    GeneratedSession, Plan, PlanModule, PlanOverride, ProgramTemplate, ProgramVersion,
    SessionStatus,
};
use forge_db::queries::{generated_sessions, modules, overrides, plans, templates, versions};

use super::{NewOverride, PlanStore, SessionUpsert};

/// PostgreSQL-backed store. Cloning shares the underlying pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PlanStore for PgStore {
    async fn plan(&self, id: Uuid) -> Result<Option<Plan>> {
        plans::get_plan(&self.pool, id).await
    }

    async fn plan_modules(&self, plan_id: Uuid) -> Result<Vec<PlanModule>> {
        modules::list_modules_for_plan(&self.pool, plan_id).await
    }

    async fn program_version(&self, id: Uuid) -> Result<Option<ProgramVersion>> {
        versions::get_version(&self.pool, id).await
    }

    async fn program_template(&self, id: Uuid) -> Result<Option<ProgramTemplate>> {
        templates::get_template(&self.pool, id).await
    }

    async fn session_overrides(
        &self,
        plan_id: Uuid,
        session_key: &str,
    ) -> Result<Vec<PlanOverride>> {
        overrides::list_session_overrides(&self.pool, plan_id, session_key).await
    }

    async fn append_override(&self, new: &NewOverride) -> Result<PlanOverride> {
        overrides::insert_override(&self.pool, new).await
    }

    async fn upsert_generated_session(&self, upsert: &SessionUpsert) -> Result<GeneratedSession> {
        generated_sessions::upsert_generated_session(
            &self.pool,
            upsert.plan_id,
            upsert.user_id,
            &upsert.session_key,
            upsert.scheduled_at,
            &upsert.snapshot,
        )
        .await
    }

    async fn generated_session(&self, id: Uuid) -> Result<Option<GeneratedSession>> {
        generated_sessions::get_generated_session_by_id(&self.pool, id).await
    }

    async fn generated_sessions(&self, plan_id: Uuid) -> Result<Vec<GeneratedSession>> {
        generated_sessions::list_generated_sessions(&self.pool, plan_id).await
    }

    async fn set_session_status(
        &self,
        id: Uuid,
        status: SessionStatus,
    ) -> Result<GeneratedSession> {
        generated_sessions::update_session_status(&self.pool, id, status).await
    }
}
