//! The `PlanStore` trait -- everything the engine reads and writes.
//!
//! Generation is a sequence of reads followed by one upsert, so the trait
//! is a thin typed view over the plan tables. [`PgStore`] backs it with
//! PostgreSQL; [`MemoryStore`] keeps everything in process.
//!
//! Implementations must not cache definitions between calls: every
//! generation has to see the current stored rows.

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use forge_db::models::{
    GeneratedSession, Plan, PlanModule, PlanOverride, ProgramTemplate, ProgramVersion,
    SessionStatus,
};
pub use forge_db::queries::overrides::NewOverride;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Input to [`PlanStore::upsert_generated_session`].
#[derive(Debug, Clone)]
pub struct SessionUpsert {
    pub plan_id: Uuid,
    pub user_id: Uuid,
    pub session_key: String,
    /// Only written when the row is created.
    pub scheduled_at: Option<DateTime<Utc>>,
    pub snapshot: serde_json::Value,
}

/// Typed access to plans, their program definitions, override logs, and
/// generated sessions.
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn plan(&self, id: Uuid) -> Result<Option<Plan>>;

    /// Modules of a COMPOSITE plan. Order is not relied upon.
    async fn plan_modules(&self, plan_id: Uuid) -> Result<Vec<PlanModule>>;

    async fn program_version(&self, id: Uuid) -> Result<Option<ProgramVersion>>;

    async fn program_template(&self, id: Uuid) -> Result<Option<ProgramTemplate>>;

    /// SESSION-scope overrides for one session key, in insertion order.
    async fn session_overrides(&self, plan_id: Uuid, session_key: &str)
    -> Result<Vec<PlanOverride>>;

    /// Append an override to the plan's log.
    async fn append_override(&self, new: &NewOverride) -> Result<PlanOverride>;

    /// Atomically insert or refresh the row for `(plan_id, session_key)`.
    ///
    /// A fresh row gets status `PLANNED`. An existing row keeps its id,
    /// status, and scheduled time; only its snapshot and `updated_at`
    /// change. Concurrent calls for the same key must not produce two rows.
    async fn upsert_generated_session(&self, upsert: &SessionUpsert) -> Result<GeneratedSession>;

    async fn generated_session(&self, id: Uuid) -> Result<Option<GeneratedSession>>;

    /// A plan's generated sessions, by session key compared as text.
    async fn generated_sessions(&self, plan_id: Uuid) -> Result<Vec<GeneratedSession>>;

    async fn set_session_status(&self, id: Uuid, status: SessionStatus)
    -> Result<GeneratedSession>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn PlanStore) {}
};
