//! In-process [`PlanStore`], used for engine tests and dry runs.
//!
//! Foreign keys are not enforced, so dangling references can be set up on
//! purpose. The whole state sits behind one async mutex; each trait method
//! holds it for its full duration, which makes the upsert atomic.

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use forge_db::models::{
    GeneratedSession, ModuleTarget, OverrideScope, Plan, PlanModule, PlanOverride,
    ProgramTemplate, ProgramVersion, SessionStatus,
};
use forge_db::queries::plans::NewPlan;
use forge_db::queries::templates::NewTemplate;

use super::{NewOverride, PlanStore, SessionUpsert};

#[derive(Debug, Default)]
struct Tables {
    plans: Vec<Plan>,
    templates: Vec<ProgramTemplate>,
    versions: Vec<ProgramVersion>,
    modules: Vec<PlanModule>,
    overrides: Vec<PlanOverride>,
    sessions: Vec<GeneratedSession>,
    next_seq: i64,
}

/// A [`PlanStore`] holding its tables in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_template(&self, new: &NewTemplate) -> ProgramTemplate {
        let template = ProgramTemplate {
            id: Uuid::new_v4(),
            slug: new.slug.clone(),
            name: new.name.clone(),
            template_type: new.template_type,
            visibility: new.visibility,
            owner_user_id: new.owner_user_id,
            parent_template_id: new.parent_template_id,
            created_at: Utc::now(),
        };
        self.tables.lock().await.templates.push(template.clone());
        template
    }

    /// Add the next version of a template (`max + 1`, starting at 1).
    pub async fn insert_version(
        &self,
        template_id: Uuid,
        definition: serde_json::Value,
    ) -> ProgramVersion {
        let mut tables = self.tables.lock().await;
        let next = tables
            .versions
            .iter()
            .filter(|v| v.template_id == template_id)
            .map(|v| v.version)
            .max()
            .unwrap_or(0)
            + 1;
        let version = ProgramVersion {
            id: Uuid::new_v4(),
            template_id,
            version: next,
            definition,
            defaults: serde_json::json!({}),
            parent_version_id: None,
            created_at: Utc::now(),
        };
        tables.versions.push(version.clone());
        version
    }

    pub async fn insert_plan(&self, new: &NewPlan) -> Plan {
        let plan = Plan {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            name: new.name.clone(),
            plan_type: new.plan_type,
            root_program_version_id: new.root_program_version_id,
            params: new.params.clone(),
            is_archived: false,
            created_at: Utc::now(),
        };
        self.tables.lock().await.plans.push(plan.clone());
        plan
    }

    /// Attach a module, replacing any module with the same target.
    pub async fn insert_module(
        &self,
        plan_id: Uuid,
        target: ModuleTarget,
        program_version_id: Uuid,
        priority: i32,
        params: serde_json::Value,
    ) -> PlanModule {
        let module = PlanModule {
            plan_id,
            target,
            program_version_id,
            priority,
            params,
        };
        let mut tables = self.tables.lock().await;
        tables
            .modules
            .retain(|m| !(m.plan_id == plan_id && m.target == target));
        tables.modules.push(module.clone());
        module
    }

    /// Replace a plan's params, standing in for an edit made elsewhere.
    pub async fn set_plan_params(&self, plan_id: Uuid, params: serde_json::Value) -> Result<()> {
        let mut tables = self.tables.lock().await;
        match tables.plans.iter_mut().find(|p| p.id == plan_id) {
            Some(plan) => {
                plan.params = params;
                Ok(())
            }
            None => bail!("plan {plan_id} not found"),
        }
    }

    /// Delete a version without touching rows that reference it.
    pub async fn remove_version(&self, id: Uuid) {
        self.tables.lock().await.versions.retain(|v| v.id != id);
    }

    /// Delete a template without touching its versions.
    pub async fn remove_template(&self, id: Uuid) {
        self.tables.lock().await.templates.retain(|t| t.id != id);
    }
}

#[async_trait]
impl PlanStore for MemoryStore {
    async fn plan(&self, id: Uuid) -> Result<Option<Plan>> {
        let tables = self.tables.lock().await;
        Ok(tables.plans.iter().find(|p| p.id == id).cloned())
    }

    async fn plan_modules(&self, plan_id: Uuid) -> Result<Vec<PlanModule>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .modules
            .iter()
            .filter(|m| m.plan_id == plan_id)
            .cloned()
            .collect())
    }

    async fn program_version(&self, id: Uuid) -> Result<Option<ProgramVersion>> {
        let tables = self.tables.lock().await;
        Ok(tables.versions.iter().find(|v| v.id == id).cloned())
    }

    async fn program_template(&self, id: Uuid) -> Result<Option<ProgramTemplate>> {
        let tables = self.tables.lock().await;
        Ok(tables.templates.iter().find(|t| t.id == id).cloned())
    }

    async fn session_overrides(
        &self,
        plan_id: Uuid,
        session_key: &str,
    ) -> Result<Vec<PlanOverride>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<PlanOverride> = tables
            .overrides
            .iter()
            .filter(|o| {
                o.plan_id == plan_id
                    && o.scope == OverrideScope::Session
                    && o.session_key.as_deref() == Some(session_key)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|o| o.seq);
        Ok(rows)
    }

    async fn append_override(&self, new: &NewOverride) -> Result<PlanOverride> {
        let mut tables = self.tables.lock().await;
        tables.next_seq += 1;
        let row = PlanOverride {
            id: Uuid::new_v4(),
            seq: tables.next_seq,
            plan_id: new.plan_id,
            scope: new.scope,
            week_number: new.week_number,
            session_key: new.session_key.clone(),
            patch: new.patch.clone(),
            note: new.note.clone(),
            created_at: Utc::now(),
        };
        tables.overrides.push(row.clone());
        Ok(row)
    }

    async fn upsert_generated_session(&self, upsert: &SessionUpsert) -> Result<GeneratedSession> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();

        if let Some(existing) = tables
            .sessions
            .iter_mut()
            .find(|s| s.plan_id == upsert.plan_id && s.session_key == upsert.session_key)
        {
            existing.snapshot = upsert.snapshot.clone();
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let row = GeneratedSession {
            id: Uuid::new_v4(),
            plan_id: upsert.plan_id,
            user_id: upsert.user_id,
            session_key: upsert.session_key.clone(),
            scheduled_at: upsert.scheduled_at,
            status: SessionStatus::Planned,
            snapshot: upsert.snapshot.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.sessions.push(row.clone());
        Ok(row)
    }

    async fn generated_session(&self, id: Uuid) -> Result<Option<GeneratedSession>> {
        let tables = self.tables.lock().await;
        Ok(tables.sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn generated_sessions(&self, plan_id: Uuid) -> Result<Vec<GeneratedSession>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<GeneratedSession> = tables
            .sessions
            .iter()
            .filter(|s| s.plan_id == plan_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.session_key.cmp(&b.session_key));
        Ok(rows)
    }

    async fn set_session_status(
        &self,
        id: Uuid,
        status: SessionStatus,
    ) -> Result<GeneratedSession> {
        let mut tables = self.tables.lock().await;
        match tables.sessions.iter_mut().find(|s| s.id == id) {
            Some(session) => {
                session.status = status;
                session.updated_at = Utc::now();
                Ok(session.clone())
            }
            None => bail!("generated session {id} not found"),
        }
    }
}
