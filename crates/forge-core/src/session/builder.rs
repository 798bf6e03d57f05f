//! Snapshot building: base snapshot plus the session's override log.

use tracing::debug;

use forge_db::models::Plan;

use super::patch::apply_overrides;
use super::resolve::resolve_base_snapshot;
use super::snapshot::Snapshot;
use crate::error::GenerateError;
use crate::store::PlanStore;

/// Build the complete snapshot for one session of `plan`.
///
/// Always starts from a freshly resolved base, so regenerating never
/// stacks the effects of earlier generations.
pub async fn build_snapshot(
    store: &dyn PlanStore,
    plan: &Plan,
    session_key: &str,
    week: i32,
    day: i32,
) -> Result<Snapshot, GenerateError> {
    let mut snapshot = resolve_base_snapshot(store, plan, session_key, week, day).await?;

    let overrides = store.session_overrides(plan.id, session_key).await?;
    let applied = apply_overrides(&mut snapshot, &overrides);

    debug!(
        plan_id = %plan.id,
        session_key,
        overrides = overrides.len(),
        applied,
        "built session snapshot"
    );
    Ok(snapshot)
}
