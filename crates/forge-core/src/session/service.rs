//! Session service layer.
//!
//! Entry points used by the CLI and any other front end. Each operation
//! checks plan ownership before it reads definitions or writes anything.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use forge_db::models::{GeneratedSession, OverrideScope, PlanOverride, SessionStatus};

use super::builder::build_snapshot;
use super::key::{SessionKeyMode, SessionKeyOrder, derive_session_key};
use super::patch::OverridePatch;
use super::persist::persist_snapshot;
use super::resolve::load_owned_plan;
use crate::error::GenerateError;
use crate::store::{NewOverride, PlanStore};

/// One request to materialize a session.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub user_id: Uuid,
    pub plan_id: Uuid,
    /// 1-based.
    pub week: i32,
    /// 1-based. Also indexes a MANUAL plan's schedule.
    pub day: i32,
    /// Calendar date of the session, used as the key for plans in date mode.
    pub date: Option<NaiveDate>,
    /// Stored only when the session row is first created.
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Generate (or regenerate) the session for `request` and store it.
///
/// The snapshot is rebuilt from the current plan, program versions, and
/// override log on every call. Errors other than
/// [`GenerateError::Store`] are raised before anything is written.
pub async fn generate(
    store: &dyn PlanStore,
    request: &GenerateRequest,
) -> Result<GeneratedSession, GenerateError> {
    validate_position(request.week, request.day)?;

    let plan = load_owned_plan(store, request.user_id, request.plan_id).await?;
    if plan.is_archived {
        warn!(plan_id = %plan.id, "generating a session for an archived plan");
    }

    let mode = SessionKeyMode::from_params(&plan.params);
    let session_key = derive_session_key(mode, request.week, request.day, request.date);

    let snapshot = build_snapshot(store, &plan, &session_key, request.week, request.day).await?;
    if let Some(reason) = &snapshot.manual_error {
        warn!(plan_id = %plan.id, session_key = %session_key, reason = %reason, "manual session unresolved");
    }

    let session =
        persist_snapshot(store, &plan, &session_key, request.scheduled_at, &snapshot).await?;

    info!(
        plan_id = %plan.id,
        plan_type = %plan.plan_type,
        session_key = %session_key,
        overrides_applied = snapshot.overrides_applied.len(),
        "generated session"
    );
    Ok(session)
}

fn validate_position(week: i32, day: i32) -> Result<(), GenerateError> {
    if week < 1 {
        return Err(GenerateError::InvalidRequest(format!(
            "week must be at least 1, got {week}"
        )));
    }
    if day < 1 {
        return Err(GenerateError::InvalidRequest(format!(
            "day must be at least 1, got {day}"
        )));
    }
    Ok(())
}

/// Fields of an override to record. Only SESSION overrides affect
/// generation; the other scopes are stored as given.
#[derive(Debug, Clone)]
pub struct OverrideRequest {
    pub scope: OverrideScope,
    pub week_number: Option<i32>,
    pub session_key: Option<String>,
    pub patch: OverridePatch,
    pub note: Option<String>,
}

/// Append an override to a plan's log after checking ownership.
///
/// The change shows up the next time the session is generated.
pub async fn record_override(
    store: &dyn PlanStore,
    user_id: Uuid,
    plan_id: Uuid,
    request: &OverrideRequest,
) -> Result<PlanOverride, GenerateError> {
    if request.scope == OverrideScope::Session
        && request.session_key.as_deref().is_none_or(str::is_empty)
    {
        return Err(GenerateError::InvalidRequest(
            "SESSION overrides need a session key".to_owned(),
        ));
    }
    if let Some(week) = request.week_number.filter(|w| *w < 1) {
        return Err(GenerateError::InvalidRequest(format!(
            "week_number must be at least 1, got {week}"
        )));
    }

    let plan = load_owned_plan(store, user_id, plan_id).await?;

    let patch = request
        .patch
        .to_json()
        .map_err(|e| GenerateError::InvalidRequest(format!("unserializable patch: {e}")))?;

    let row = store
        .append_override(&NewOverride {
            plan_id: plan.id,
            scope: request.scope,
            week_number: request.week_number,
            session_key: request.session_key.clone(),
            patch,
            note: request.note.clone(),
        })
        .await?;

    info!(
        override_id = %row.id,
        plan_id = %plan.id,
        scope = %row.scope,
        op = ?request.patch.op(),
        "recorded override"
    );
    Ok(row)
}

/// Decode a patch supplied as JSON text.
pub fn parse_patch(text: &str) -> Result<OverridePatch, GenerateError> {
    serde_json::from_str(text)
        .map_err(|e| GenerateError::InvalidRequest(format!("malformed patch: {e}")))
}

/// SESSION overrides for one session key, in the order they apply.
pub async fn list_session_overrides(
    store: &dyn PlanStore,
    user_id: Uuid,
    plan_id: Uuid,
    session_key: &str,
) -> Result<Vec<PlanOverride>, GenerateError> {
    let plan = load_owned_plan(store, user_id, plan_id).await?;
    Ok(store.session_overrides(plan.id, session_key).await?)
}

/// Parse a status name such as `done`, case-insensitively.
pub fn parse_status(text: &str) -> Result<SessionStatus, GenerateError> {
    text.parse::<SessionStatus>()
        .map_err(|e| GenerateError::InvalidRequest(e.to_string()))
}

/// Fetch one generated session, snapshot included.
pub async fn get_generated_session(
    store: &dyn PlanStore,
    user_id: Uuid,
    session_id: Uuid,
) -> Result<GeneratedSession, GenerateError> {
    let session = store
        .generated_session(session_id)
        .await?
        .ok_or_else(|| GenerateError::not_found(format!("generated session {session_id}")))?;
    load_owned_plan(store, user_id, session.plan_id).await?;
    Ok(session)
}

/// Mark a generated session planned, done, or skipped.
///
/// Regeneration never changes the status set here.
pub async fn set_session_status(
    store: &dyn PlanStore,
    user_id: Uuid,
    session_id: Uuid,
    status: SessionStatus,
) -> Result<GeneratedSession, GenerateError> {
    let session = get_generated_session(store, user_id, session_id).await?;

    let updated = store.set_session_status(session.id, status).await?;
    info!(session_id = %updated.id, from = %session.status, to = %status, "session status changed");
    Ok(updated)
}

/// All generated sessions of a plan in calendar order: week/day keys by
/// week then day, then date keys by date.
pub async fn list_generated_sessions(
    store: &dyn PlanStore,
    user_id: Uuid,
    plan_id: Uuid,
) -> Result<Vec<GeneratedSession>, GenerateError> {
    let plan = load_owned_plan(store, user_id, plan_id).await?;
    let mut sessions = store.generated_sessions(plan.id).await?;
    sessions.sort_by_cached_key(|s| SessionKeyOrder::of(&s.session_key));
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_must_be_positive() {
        assert!(validate_position(1, 1).is_ok());
        assert!(matches!(
            validate_position(0, 1),
            Err(GenerateError::InvalidRequest(msg)) if msg.contains("week")
        ));
        assert!(matches!(
            validate_position(2, -3),
            Err(GenerateError::InvalidRequest(msg)) if msg.contains("day")
        ));
    }

    #[test]
    fn parse_patch_rejects_unknown_op() {
        let ok = parse_patch(r#"{"op":"ADD_ACCESSORY","value":{"exerciseName":"Dips"}}"#);
        assert!(ok.is_ok());

        let err = parse_patch(r#"{"op":"DELETE_SESSION"}"#).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidRequest(_)));
    }

    #[test]
    fn parse_status_is_case_insensitive() {
        assert_eq!(parse_status("done").unwrap(), SessionStatus::Done);
        assert_eq!(parse_status("SKIPPED").unwrap(), SessionStatus::Skipped);
        assert!(matches!(
            parse_status("finished"),
            Err(GenerateError::InvalidRequest(_))
        ));
    }
}
