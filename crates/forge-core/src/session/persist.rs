//! Persisting a built snapshot into `generated_sessions`.

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::info;

use forge_db::models::{GeneratedSession, Plan};

use super::snapshot::Snapshot;
use crate::error::GenerateError;
use crate::store::{PlanStore, SessionUpsert};

/// Store `snapshot` as the session `(plan.id, session_key)`.
///
/// The write is a single upsert: the first call creates a `PLANNED` row,
/// later calls replace the snapshot of the same row and leave its id,
/// status, and scheduled time alone. Two generations racing on one key end
/// with one row holding whichever snapshot was written last.
pub async fn persist_snapshot(
    store: &dyn PlanStore,
    plan: &Plan,
    session_key: &str,
    scheduled_at: Option<DateTime<Utc>>,
    snapshot: &Snapshot,
) -> Result<GeneratedSession, GenerateError> {
    let snapshot = snapshot
        .to_json()
        .context("failed to serialize session snapshot")?;

    let session = store
        .upsert_generated_session(&SessionUpsert {
            plan_id: plan.id,
            user_id: plan.user_id,
            session_key: session_key.to_owned(),
            scheduled_at,
            snapshot,
        })
        .await?;

    info!(
        session_id = %session.id,
        plan_id = %plan.id,
        session_key,
        status = %session.status,
        "stored generated session"
    );
    Ok(session)
}
