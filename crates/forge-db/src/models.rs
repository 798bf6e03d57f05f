use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Error returned when a stored or user-supplied string does not name a
/// variant of one of the enums below.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Shape of a plan, which decides how its base snapshot is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanType {
    /// One program version drives the whole session.
    Single,
    /// One program version per lift target, ordered by priority.
    Composite,
    /// Fixed sessions picked from a schedule.
    Manual,
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Single => "SINGLE",
            Self::Composite => "COMPOSITE",
            Self::Manual => "MANUAL",
        };
        f.write_str(s)
    }
}

impl FromStr for PlanType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SINGLE" => Ok(Self::Single),
            "COMPOSITE" => Ok(Self::Composite),
            "MANUAL" => Ok(Self::Manual),
            other => Err(ParseEnumError::new("plan type", other)),
        }
    }
}

// ---------------------------------------------------------------------------

/// Kind of program template: DSL-driven or explicit sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateType {
    Logic,
    Manual,
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Logic => "LOGIC",
            Self::Manual => "MANUAL",
        };
        f.write_str(s)
    }
}

impl FromStr for TemplateType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOGIC" => Ok(Self::Logic),
            "MANUAL" => Ok(Self::Manual),
            other => Err(ParseEnumError::new("template type", other)),
        }
    }
}

// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    Public,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Public => "PUBLIC",
            Self::Private => "PRIVATE",
        };
        f.write_str(s)
    }
}

impl FromStr for Visibility {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PUBLIC" => Ok(Self::Public),
            "PRIVATE" => Ok(Self::Private),
            other => Err(ParseEnumError::new("visibility", other)),
        }
    }
}

// ---------------------------------------------------------------------------

/// Lift a plan module (and therefore a snapshot block) is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModuleTarget {
    Squat,
    Bench,
    Deadlift,
    Ohp,
    Pull,
    Custom,
}

impl fmt::Display for ModuleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Squat => "SQUAT",
            Self::Bench => "BENCH",
            Self::Deadlift => "DEADLIFT",
            Self::Ohp => "OHP",
            Self::Pull => "PULL",
            Self::Custom => "CUSTOM",
        };
        f.write_str(s)
    }
}

impl FromStr for ModuleTarget {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SQUAT" => Ok(Self::Squat),
            "BENCH" => Ok(Self::Bench),
            "DEADLIFT" => Ok(Self::Deadlift),
            "OHP" => Ok(Self::Ohp),
            "PULL" => Ok(Self::Pull),
            "CUSTOM" => Ok(Self::Custom),
            other => Err(ParseEnumError::new("module target", other)),
        }
    }
}

// ---------------------------------------------------------------------------

/// Reach of an override. Only `Session` overrides are replayed during
/// generation; the others are stored for later use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverrideScope {
    Plan,
    Week,
    Session,
    Exercise,
}

impl fmt::Display for OverrideScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Plan => "PLAN",
            Self::Week => "WEEK",
            Self::Session => "SESSION",
            Self::Exercise => "EXERCISE",
        };
        f.write_str(s)
    }
}

impl FromStr for OverrideScope {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PLAN" => Ok(Self::Plan),
            "WEEK" => Ok(Self::Week),
            "SESSION" => Ok(Self::Session),
            "EXERCISE" => Ok(Self::Exercise),
            other => Err(ParseEnumError::new("override scope", other)),
        }
    }
}

// ---------------------------------------------------------------------------

/// Completion state of a generated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Planned,
    Done,
    Skipped,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Planned => "PLANNED",
            Self::Done => "DONE",
            Self::Skipped => "SKIPPED",
        };
        f.write_str(s)
    }
}

impl FromStr for SessionStatus {
    type Err = ParseEnumError;

    /// Accepts either case, since the CLI takes lower-case status names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PLANNED" => Ok(Self::Planned),
            "DONE" => Ok(Self::Done),
            "SKIPPED" => Ok(Self::Skipped),
            _ => Err(ParseEnumError::new("session status", s)),
        }
    }
}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A user's instantiated training program.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Plan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub plan_type: PlanType,
    pub root_program_version_id: Option<Uuid>,
    /// Schedule arrays, timezone, session-key mode.
    pub params: serde_json::Value,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
}

/// A named training strategy. Content lives in [`ProgramVersion`]s.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProgramTemplate {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub template_type: TemplateType,
    pub visibility: Visibility,
    pub owner_user_id: Option<Uuid>,
    pub parent_template_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// An immutable numbered revision of a template's definition.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProgramVersion {
    pub id: Uuid,
    pub template_id: Uuid,
    pub version: i32,
    pub definition: serde_json::Value,
    pub defaults: serde_json::Value,
    pub parent_version_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// One lift module of a COMPOSITE plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlanModule {
    pub plan_id: Uuid,
    pub target: ModuleTarget,
    pub program_version_id: Uuid,
    pub priority: i32,
    pub params: serde_json::Value,
}

/// An entry in a plan's append-only override log.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlanOverride {
    pub id: Uuid,
    /// Insertion order; overrides are replayed ascending by this.
    pub seq: i64,
    pub plan_id: Uuid,
    pub scope: OverrideScope,
    pub week_number: Option<i32>,
    pub session_key: Option<String>,
    /// Tagged patch document, decoded by the override interpreter.
    pub patch: serde_json::Value,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The stored result of generating one session of a plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GeneratedSession {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub user_id: Uuid,
    pub session_key: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub snapshot: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_type_display_matches_serde() {
        for v in [PlanType::Single, PlanType::Composite, PlanType::Manual] {
            let json = serde_json::to_value(v).unwrap();
            assert_eq!(json, serde_json::Value::String(v.to_string()));
            assert_eq!(v.to_string().parse::<PlanType>().unwrap(), v);
        }
    }

    #[test]
    fn module_target_parses_every_variant() {
        for name in ["SQUAT", "BENCH", "DEADLIFT", "OHP", "PULL", "CUSTOM"] {
            let target: ModuleTarget = name.parse().expect("should parse");
            assert_eq!(target.to_string(), name);
        }
    }

    #[test]
    fn module_target_rejects_lower_case() {
        let err = "squat".parse::<ModuleTarget>().unwrap_err();
        assert_eq!(err.kind, "module target");
        assert_eq!(err.to_string(), "invalid module target: \"squat\"");
    }

    #[test]
    fn session_status_is_case_insensitive() {
        assert_eq!("done".parse::<SessionStatus>().unwrap(), SessionStatus::Done);
        assert_eq!("Skipped".parse::<SessionStatus>().unwrap(), SessionStatus::Skipped);
        assert!("finished".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn override_scope_invalid() {
        assert!("DAY".parse::<OverrideScope>().is_err());
        assert_eq!("SESSION".parse::<OverrideScope>().unwrap(), OverrideScope::Session);
    }
}
