//! Plan resolution: load a plan and build its base snapshot.
//!
//! The base snapshot is the session as the program definitions describe it,
//! before any override is applied. Each plan type fills a different part of
//! it:
//!
//! - SINGLE: one `CUSTOM` block from the plan's root program version.
//! - COMPOSITE: one block per module, ascending by priority.
//! - MANUAL: the session picked from `params.schedule` for the day.

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use forge_db::models::{ModuleTarget, Plan, PlanType, ProgramTemplate, ProgramVersion};

use super::snapshot::{Block, PlanHeader, ProgramRef, Snapshot};
use crate::error::GenerateError;
use crate::store::PlanStore;

/// `manualError` when the plan has no schedule to pick from.
pub const NO_SCHEDULE_ERROR: &str = "No schedule entry for this day. Provide plan.params.schedule.";

/// Load a plan and check that `user_id` owns it.
pub async fn load_owned_plan(
    store: &dyn PlanStore,
    user_id: Uuid,
    plan_id: Uuid,
) -> Result<Plan, GenerateError> {
    let plan = store
        .plan(plan_id)
        .await?
        .ok_or_else(|| GenerateError::not_found(format!("plan {plan_id}")))?;

    if plan.user_id != user_id {
        return Err(GenerateError::Forbidden { plan_id, user_id });
    }
    Ok(plan)
}

/// Build the base snapshot for `plan` from the current stored definitions.
pub async fn resolve_base_snapshot(
    store: &dyn PlanStore,
    plan: &Plan,
    session_key: &str,
    week: i32,
    day: i32,
) -> Result<Snapshot, GenerateError> {
    let header = PlanHeader {
        id: plan.id,
        plan_type: plan.plan_type,
        name: plan.name.clone(),
    };
    let mut snapshot = Snapshot::header(header, session_key, week, day);

    match plan.plan_type {
        PlanType::Single => {
            snapshot.blocks = Some(vec![single_block(store, plan).await?]);
        }
        PlanType::Composite => {
            snapshot.blocks = Some(composite_blocks(store, plan).await?);
        }
        PlanType::Manual => {
            resolve_manual(store, plan, day, &mut snapshot).await?;
        }
    }

    Ok(snapshot)
}

async fn single_block(store: &dyn PlanStore, plan: &Plan) -> Result<Block, GenerateError> {
    let (template, version) = load_root_program(store, plan).await?;
    Ok(Block {
        target: ModuleTarget::Custom,
        program: ProgramRef::new(&template, &version),
        definition: version.definition,
        params: plan.params.clone(),
        replacements: None,
    })
}

async fn composite_blocks(store: &dyn PlanStore, plan: &Plan) -> Result<Vec<Block>, GenerateError> {
    let mut modules = store.plan_modules(plan.id).await?;
    // Stable, so equal priorities keep the store's order.
    modules.sort_by_key(|m| m.priority);

    let mut blocks = Vec::with_capacity(modules.len());
    for module in modules {
        let version = store
            .program_version(module.program_version_id)
            .await?
            .ok_or_else(|| {
                GenerateError::DataIntegrity(format!(
                    "{} module of plan {} references missing program version {}",
                    module.target, plan.id, module.program_version_id
                ))
            })?;
        let template = store
            .program_template(version.template_id)
            .await?
            .ok_or_else(|| {
                GenerateError::DataIntegrity(format!(
                    "program version {} references missing template {}",
                    version.id, version.template_id
                ))
            })?;

        blocks.push(Block {
            target: module.target,
            program: ProgramRef::new(&template, &version),
            definition: version.definition,
            params: module.params,
            replacements: None,
        });
    }

    debug!(plan_id = %plan.id, blocks = blocks.len(), "resolved composite modules");
    Ok(blocks)
}

/// Fill the MANUAL section. A missing schedule entry or session is reported
/// through `manualError` rather than failing.
async fn resolve_manual(
    store: &dyn PlanStore,
    plan: &Plan,
    day: i32,
    snapshot: &mut Snapshot,
) -> Result<(), GenerateError> {
    let (template, version) = load_root_program(store, plan).await?;

    let schedule = schedule_from_params(&plan.params);
    if schedule.is_empty() {
        snapshot.manual_session = Some(Value::Null);
        snapshot.manual_error = Some(NO_SCHEDULE_ERROR.to_owned());
        return Ok(());
    }

    let key = &schedule[schedule_slot(schedule.len(), day)];
    match find_manual_session(&version.definition, key) {
        Some(session) => {
            snapshot.manual_session_key = Some(key.clone());
            snapshot.manual_session = Some(session);
            snapshot.program = Some(ProgramRef::new(&template, &version));
        }
        None => {
            debug!(plan_id = %plan.id, key = %key, "manual session key not in program definition");
            snapshot.manual_session = Some(Value::Null);
            snapshot.manual_error = Some(format!("Session {key:?} not found in program definition."));
        }
    }
    Ok(())
}

/// Load the plan's root program version and its template. Both are
/// required for SINGLE and MANUAL plans.
async fn load_root_program(
    store: &dyn PlanStore,
    plan: &Plan,
) -> Result<(ProgramTemplate, ProgramVersion), GenerateError> {
    let version_id = plan.root_program_version_id.ok_or_else(|| {
        GenerateError::not_found(format!("root program version of {} plan {}", plan.plan_type, plan.id))
    })?;

    let version = store
        .program_version(version_id)
        .await?
        .ok_or_else(|| GenerateError::not_found(format!("program version {version_id}")))?;
    let template = store
        .program_template(version.template_id)
        .await?
        .ok_or_else(|| GenerateError::not_found(format!("program template {}", version.template_id)))?;

    Ok((template, version))
}

/// Read `params.schedule` as a list of session keys. A missing or
/// non-array value is an empty schedule. Non-string entries keep their slot
/// (rendered as JSON text) so day indexing is not shifted.
pub fn schedule_from_params(params: &Value) -> Vec<String> {
    params
        .get("schedule")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .map(|e| e.as_str().map_or_else(|| e.to_string(), str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

/// Index into a schedule of `len` entries for a 1-based `day`:
/// `(day - 1) mod len`. `len` must be non-zero.
pub fn schedule_slot(len: usize, day: i32) -> usize {
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    // rem_euclid of a positive modulus is in 0..len.
    (i64::from(day) - 1).rem_euclid(len) as usize
}

/// Find the entry of `definition.sessions[]` whose `key` matches.
pub fn find_manual_session(definition: &Value, key: &str) -> Option<Value> {
    definition
        .get("sessions")?
        .as_array()?
        .iter()
        .find(|s| s.get("key").and_then(Value::as_str) == Some(key))
        .cloned()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn schedule_slot_wraps_by_day() {
        // schedule = ["A", "B", "A", "B"]
        assert_eq!(schedule_slot(4, 1), 0);
        assert_eq!(schedule_slot(4, 3), 2);
        assert_eq!(schedule_slot(4, 4), 3);
        assert_eq!(schedule_slot(4, 5), 0);
        assert_eq!(schedule_slot(3, 7), 0);
        assert_eq!(schedule_slot(1, 9), 0);
    }

    #[test]
    fn schedule_reads_strings_and_keeps_slots() {
        let params = json!({"schedule": ["A", 2, "C"]});
        assert_eq!(schedule_from_params(&params), vec!["A", "2", "C"]);
    }

    #[test]
    fn schedule_missing_or_wrong_type_is_empty() {
        assert!(schedule_from_params(&json!({})).is_empty());
        assert!(schedule_from_params(&json!({"schedule": "A,B"})).is_empty());
        assert!(schedule_from_params(&Value::Null).is_empty());
    }

    #[test]
    fn find_manual_session_by_key() {
        let definition = json!({
            "sessions": [
                {"key": "A", "exercises": ["Squat"]},
                {"key": "B", "exercises": ["Deadlift"]}
            ]
        });
        assert_eq!(
            find_manual_session(&definition, "B"),
            Some(json!({"key": "B", "exercises": ["Deadlift"]}))
        );
        assert_eq!(find_manual_session(&definition, "C"), None);
        assert_eq!(find_manual_session(&json!({"dsl": "531"}), "A"), None);
    }
}
