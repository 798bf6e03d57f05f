//! The snapshot document stored in `generated_sessions.snapshot`.
//!
//! Field names serialize in camelCase; optional sections are omitted when
//! they do not apply to the plan type. UIs read `blocks`, `manualSession`,
//! and `accessories` from this document, so its shape is a contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use forge_db::models::{ModuleTarget, PlanType, ProgramTemplate, ProgramVersion, TemplateType};

/// Current snapshot layout version.
pub const SCHEMA_VERSION: u32 = 2;

/// Order given to accessories whose patch does not specify one, which
/// places them after any explicitly ordered accessory.
pub const DEFAULT_ACCESSORY_ORDER: i32 = 99;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub schema_version: u32,
    pub session_key: String,
    pub week: i32,
    pub day: i32,
    pub plan: PlanHeader,

    /// SINGLE and COMPOSITE plans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<Block>>,

    /// MANUAL plans: the schedule entry picked for this day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_session_key: Option<String>,
    /// MANUAL plans: the session document, or JSON `null` when it could not
    /// be resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_session: Option<Value>,
    /// MANUAL plans: why `manualSession` is null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_error: Option<String>,
    /// MANUAL plans: the program the session came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<ProgramRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessories: Option<Vec<Accessory>>,

    #[serde(default)]
    pub overrides_applied: Vec<AppliedOverride>,
}

impl Snapshot {
    /// A snapshot holding only the header, ready for a plan-type branch to
    /// fill in.
    pub fn header(plan: PlanHeader, session_key: &str, week: i32, day: i32) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            session_key: session_key.to_owned(),
            week,
            day,
            plan,
            blocks: None,
            manual_session_key: None,
            manual_session: None,
            manual_error: None,
            program: None,
            accessories: None,
            overrides_applied: Vec::new(),
        }
    }

    /// Serialize to the stored JSON form.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanHeader {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub plan_type: PlanType,
    pub name: String,
}

/// Identity of the program a block or manual session came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramRef {
    pub slug: String,
    pub name: String,
    #[serde(rename = "type")]
    pub template_type: TemplateType,
    pub version: i32,
}

impl ProgramRef {
    pub fn new(template: &ProgramTemplate, version: &ProgramVersion) -> Self {
        Self {
            slug: template.slug.clone(),
            name: template.name.clone(),
            template_type: template.template_type,
            version: version.version,
        }
    }
}

/// One program's contribution to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub target: ModuleTarget,
    pub program: ProgramRef,
    pub definition: Value,
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacements: Option<Replacements>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Replacements {
    pub main_exercise: String,
    pub source: OverrideSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideSource {
    pub override_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessory {
    pub exercise_name: String,
    pub sets: Option<Value>,
    pub order: i32,
    pub source: OverrideSource,
}

/// Tag of an override patch, as recorded in `overridesApplied`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatchOp {
    AddAccessory,
    ReplaceExercise,
    ReorderBlocks,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedOverride {
    pub override_id: Uuid,
    pub op: PatchOp,
    /// Block the patch acted on, for REPLACE_EXERCISE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ModuleTarget>,
}
