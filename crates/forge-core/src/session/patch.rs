//! Override patches and their interpreter.
//!
//! A patch is a tagged JSON document stored in `plan_overrides.patch`:
//!
//! ```json
//! { "op": "ADD_ACCESSORY", "value": { "exerciseName": "Face Pull", "sets": 3, "order": 2 } }
//! { "op": "REPLACE_EXERCISE", "target": { "blockTarget": "BENCH" }, "value": { "exerciseName": "Close-Grip Bench" } }
//! { "op": "REORDER_BLOCKS", "value": { "order": ["BENCH", "SQUAT"] } }
//! ```
//!
//! [`apply_overrides`] replays a session's overrides, in log order, onto a
//! freshly built base snapshot. It is never run against a stored snapshot.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use forge_db::models::{ModuleTarget, PlanOverride};

use super::snapshot::{
    Accessory, AppliedOverride, Block, DEFAULT_ACCESSORY_ORDER, OverrideSource, PatchOp,
    Replacements, Snapshot,
};

/// A decoded override patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverridePatch {
    /// Append an accessory exercise to the session.
    AddAccessory { value: AddAccessory },
    /// Swap the main exercise of one block.
    ReplaceExercise {
        target: BlockSelector,
        value: ReplaceExercise,
    },
    /// Move the listed blocks to the front, in the listed order.
    ReorderBlocks { value: ReorderBlocks },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAccessory {
    pub exercise_name: String,
    /// Carried through untouched: a count, a scheme such as `"3x12"`, or
    /// per-set detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sets: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSelector {
    pub block_target: ModuleTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceExercise {
    pub exercise_name: String,
}

/// Target names are kept as written so a name that is not a module
/// target does not invalidate the rest of the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderBlocks {
    pub order: Vec<String>,
}

impl ReorderBlocks {
    /// The listed names that are module targets, in listed order.
    pub fn targets(&self) -> Vec<ModuleTarget> {
        self.order.iter().filter_map(|name| name.parse().ok()).collect()
    }
}

impl OverridePatch {
    pub fn op(&self) -> PatchOp {
        match self {
            Self::AddAccessory { .. } => PatchOp::AddAccessory,
            Self::ReplaceExercise { .. } => PatchOp::ReplaceExercise,
            Self::ReorderBlocks { .. } => PatchOp::ReorderBlocks,
        }
    }

    /// Decode a stored patch document.
    pub fn from_json(value: &serde_json::Value) -> serde_json::Result<Self> {
        Self::deserialize(value)
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// Replay `overrides` onto `snapshot`, then sort accessories by `order`.
///
/// `overrides` must already be the SESSION-scope overrides for the
/// snapshot's session key, in insertion order. Rows whose patch does not
/// decode are skipped with a warning. Returns the number of overrides
/// recorded in `overridesApplied`.
pub fn apply_overrides(snapshot: &mut Snapshot, overrides: &[PlanOverride]) -> usize {
    let mut applied = 0;

    for row in overrides {
        let patch = match OverridePatch::from_json(&row.patch) {
            Ok(patch) => patch,
            Err(e) => {
                warn!(
                    override_id = %row.id,
                    plan_id = %row.plan_id,
                    error = %e,
                    "skipping override with undecodable patch"
                );
                continue;
            }
        };

        if apply_patch(snapshot, row.id, &patch) {
            applied += 1;
        } else {
            debug!(override_id = %row.id, op = ?patch.op(), "override had nothing to act on");
        }
    }

    if let Some(accessories) = snapshot.accessories.as_mut() {
        // `sort_by_key` is stable: equal orders keep application order.
        accessories.sort_by_key(|a| a.order);
    }

    applied
}

/// Apply one patch. Returns whether it was recorded in `overridesApplied`.
pub fn apply_patch(snapshot: &mut Snapshot, override_id: Uuid, patch: &OverridePatch) -> bool {
    let source = OverrideSource { override_id };

    match patch {
        OverridePatch::AddAccessory { value } => {
            snapshot
                .accessories
                .get_or_insert_with(Vec::new)
                .push(Accessory {
                    exercise_name: value.exercise_name.clone(),
                    sets: value.sets.clone(),
                    order: value.order.unwrap_or(DEFAULT_ACCESSORY_ORDER),
                    source,
                });
            record(snapshot, override_id, PatchOp::AddAccessory, None);
            true
        }

        OverridePatch::ReplaceExercise { target, value } => {
            // No matching block: nothing changes and nothing is recorded.
            let Some(block) = snapshot
                .blocks
                .as_mut()
                .and_then(|blocks| blocks.iter_mut().find(|b| b.target == target.block_target))
            else {
                return false;
            };
            block.replacements = Some(Replacements {
                main_exercise: value.exercise_name.clone(),
                source,
            });
            record(
                snapshot,
                override_id,
                PatchOp::ReplaceExercise,
                Some(target.block_target),
            );
            true
        }

        OverridePatch::ReorderBlocks { value } => {
            let Some(blocks) = snapshot.blocks.take() else {
                return false;
            };
            snapshot.blocks = Some(reorder_blocks(blocks, &value.targets()));
            record(snapshot, override_id, PatchOp::ReorderBlocks, None);
            true
        }
    }
}

/// Blocks named in `order` (in that order) followed by the rest in their
/// original relative order. Unknown or repeated targets are ignored.
pub fn reorder_blocks(blocks: Vec<Block>, order: &[ModuleTarget]) -> Vec<Block> {
    let mut remaining = blocks;
    let mut reordered = Vec::with_capacity(remaining.len());

    for target in order {
        if let Some(pos) = remaining.iter().position(|b| b.target == *target) {
            reordered.push(remaining.remove(pos));
        }
    }

    reordered.extend(remaining);
    reordered
}

fn record(snapshot: &mut Snapshot, override_id: Uuid, op: PatchOp, target: Option<ModuleTarget>) {
    snapshot.overrides_applied.push(AppliedOverride {
        override_id,
        op,
        target,
    });
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::{Value, json};

    use forge_db::models::{OverrideScope, PlanType, TemplateType};

    use super::*;
    use crate::session::snapshot::{PlanHeader, ProgramRef};

    fn block(target: ModuleTarget) -> Block {
        Block {
            target,
            program: ProgramRef {
                slug: "531".to_owned(),
                name: "5/3/1".to_owned(),
                template_type: TemplateType::Logic,
                version: 1,
            },
            definition: json!({}),
            params: json!({}),
            replacements: None,
        }
    }

    fn snapshot_with(targets: &[ModuleTarget]) -> Snapshot {
        let mut s = Snapshot::header(
            PlanHeader {
                id: Uuid::nil(),
                plan_type: PlanType::Composite,
                name: "test".to_owned(),
            },
            "W1D1",
            1,
            1,
        );
        s.blocks = Some(targets.iter().copied().map(block).collect());
        s
    }

    fn row(patch: Value) -> PlanOverride {
        PlanOverride {
            id: Uuid::new_v4(),
            seq: 0,
            plan_id: Uuid::nil(),
            scope: OverrideScope::Session,
            week_number: Some(1),
            session_key: Some("W1D1".to_owned()),
            patch,
            note: None,
            created_at: Utc::now(),
        }
    }

    fn targets(s: &Snapshot) -> Vec<ModuleTarget> {
        s.blocks.as_ref().unwrap().iter().map(|b| b.target).collect()
    }

    use ModuleTarget::{Bench, Deadlift, Squat};

    #[test]
    fn decodes_each_op() {
        let add = OverridePatch::from_json(
            &json!({"op": "ADD_ACCESSORY", "value": {"exerciseName": "Dips", "sets": 3}}),
        )
        .unwrap();
        assert_eq!(add.op(), PatchOp::AddAccessory);

        let replace = OverridePatch::from_json(&json!({
            "op": "REPLACE_EXERCISE",
            "target": {"blockTarget": "BENCH"},
            "value": {"exerciseName": "Floor Press"}
        }))
        .unwrap();
        assert_eq!(
            replace,
            OverridePatch::ReplaceExercise {
                target: BlockSelector { block_target: Bench },
                value: ReplaceExercise {
                    exercise_name: "Floor Press".to_owned()
                },
            }
        );

        let reorder =
            OverridePatch::from_json(&json!({"op": "REORDER_BLOCKS", "value": {"order": ["BENCH"]}}))
                .unwrap();
        assert_eq!(reorder.op(), PatchOp::ReorderBlocks);
    }

    #[test]
    fn rejects_unknown_op() {
        assert!(OverridePatch::from_json(&json!({"op": "DELETE_BLOCK", "value": {}})).is_err());
    }

    #[test]
    fn add_accessory_defaults_order_to_99() {
        let mut s = snapshot_with(&[Squat]);
        let r = row(json!({"op": "ADD_ACCESSORY", "value": {"exerciseName": "Plank"}}));

        assert_eq!(apply_overrides(&mut s, &[r.clone()]), 1);

        let accessories = s.accessories.unwrap();
        assert_eq!(accessories.len(), 1);
        assert_eq!(accessories[0].order, 99);
        assert_eq!(accessories[0].sets, None);
        assert_eq!(accessories[0].source.override_id, r.id);
        assert_eq!(s.overrides_applied[0].op, PatchOp::AddAccessory);
        assert_eq!(s.overrides_applied[0].target, None);
    }

    #[test]
    fn accessories_sorted_stably_by_order() {
        let mut s = snapshot_with(&[Squat]);
        let rows = vec![
            row(json!({"op": "ADD_ACCESSORY", "value": {"exerciseName": "A", "order": 5}})),
            row(json!({"op": "ADD_ACCESSORY", "value": {"exerciseName": "B", "order": 1}})),
            row(json!({"op": "ADD_ACCESSORY", "value": {"exerciseName": "C", "order": 5}})),
            row(json!({"op": "ADD_ACCESSORY", "value": {"exerciseName": "D"}})),
            row(json!({"op": "ADD_ACCESSORY", "value": {"exerciseName": "E", "order": 1}})),
        ];

        apply_overrides(&mut s, &rows);

        let names: Vec<String> = s
            .accessories
            .unwrap()
            .into_iter()
            .map(|a| a.exercise_name)
            .collect();
        assert_eq!(names, ["B", "E", "A", "C", "D"]);
        // overridesApplied keeps application order, not sorted order.
        let applied: Vec<Uuid> = s.overrides_applied.iter().map(|a| a.override_id).collect();
        let expected: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        assert_eq!(applied, expected);
    }

    #[test]
    fn replace_exercise_sets_replacement_on_matching_block() {
        let mut s = snapshot_with(&[Squat, Bench]);
        let r = row(json!({
            "op": "REPLACE_EXERCISE",
            "target": {"blockTarget": "BENCH"},
            "value": {"exerciseName": "Larsen Press"}
        }));

        apply_overrides(&mut s, &[r.clone()]);

        let blocks = s.blocks.as_ref().unwrap();
        assert!(blocks[0].replacements.is_none());
        let replacement = blocks[1].replacements.as_ref().unwrap();
        assert_eq!(replacement.main_exercise, "Larsen Press");
        assert_eq!(replacement.source.override_id, r.id);
        assert_eq!(
            s.overrides_applied,
            vec![AppliedOverride {
                override_id: r.id,
                op: PatchOp::ReplaceExercise,
                target: Some(Bench),
            }]
        );
    }

    /// Pinned behaviour: a REPLACE_EXERCISE whose block is absent changes
    /// nothing and is not listed in `overridesApplied`.
    #[test]
    fn replace_exercise_on_missing_block_is_silent_noop() {
        let mut s = snapshot_with(&[Squat, Bench]);
        let before = s.clone();
        let r = row(json!({
            "op": "REPLACE_EXERCISE",
            "target": {"blockTarget": "DEADLIFT"},
            "value": {"exerciseName": "Rack Pull"}
        }));

        assert_eq!(apply_overrides(&mut s, &[r]), 0);
        assert_eq!(s, before);
        assert!(s.overrides_applied.is_empty());
    }

    #[test]
    fn replace_exercise_without_blocks_is_noop() {
        let mut s = snapshot_with(&[]);
        s.blocks = None;
        let r = row(json!({
            "op": "REPLACE_EXERCISE",
            "target": {"blockTarget": "SQUAT"},
            "value": {"exerciseName": "Box Squat"}
        }));

        assert_eq!(apply_overrides(&mut s, &[r]), 0);
        assert!(s.blocks.is_none());
    }

    #[test]
    fn reorder_moves_listed_blocks_first() {
        let mut s = snapshot_with(&[Squat, Bench, Deadlift]);
        let r = row(json!({"op": "REORDER_BLOCKS", "value": {"order": ["BENCH", "SQUAT"]}}));

        assert_eq!(apply_overrides(&mut s, &[r]), 1);
        assert_eq!(targets(&s), vec![Bench, Squat, Deadlift]);
        assert_eq!(s.overrides_applied[0].op, PatchOp::ReorderBlocks);
    }

    #[test]
    fn reorder_ignores_unknown_and_repeated_targets() {
        let blocks = vec![block(Squat), block(Bench), block(Deadlift)];
        let out = reorder_blocks(
            blocks,
            &[Deadlift, ModuleTarget::Ohp, Deadlift, Squat],
        );
        let got: Vec<ModuleTarget> = out.iter().map(|b| b.target).collect();
        assert_eq!(got, vec![Deadlift, Squat, Bench]);
    }

    #[test]
    fn reorder_skips_names_that_are_not_targets() {
        let mut s = snapshot_with(&[Squat, Bench, Deadlift]);
        let r = row(json!({"op": "REORDER_BLOCKS", "value": {"order": ["BENCH", "ARMS", "SQUAT"]}}));

        assert_eq!(apply_overrides(&mut s, &[r.clone()]), 1);
        assert_eq!(targets(&s), vec![Bench, Squat, Deadlift]);
        assert_eq!(
            s.overrides_applied,
            vec![AppliedOverride {
                override_id: r.id,
                op: PatchOp::ReorderBlocks,
                target: None,
            }]
        );
    }

    #[test]
    fn accessory_sets_are_carried_verbatim() {
        let mut s = snapshot_with(&[Squat]);
        let rows = vec![
            row(json!({"op": "ADD_ACCESSORY", "value": {"exerciseName": "Curl", "sets": "3x12"}})),
            row(json!({"op": "ADD_ACCESSORY", "value": {"exerciseName": "Row", "sets": [10, 10, 8]}})),
        ];

        assert_eq!(apply_overrides(&mut s, &rows), 2);

        let accessories = s.accessories.unwrap();
        assert_eq!(accessories[0].sets, Some(json!("3x12")));
        assert_eq!(accessories[1].sets, Some(json!([10, 10, 8])));
    }

    #[test]
    fn reorder_without_blocks_is_not_recorded() {
        let mut s = snapshot_with(&[]);
        s.blocks = None;
        let r = row(json!({"op": "REORDER_BLOCKS", "value": {"order": ["SQUAT"]}}));

        assert_eq!(apply_overrides(&mut s, &[r]), 0);
        assert!(s.blocks.is_none());
        assert!(s.overrides_applied.is_empty());
    }

    #[test]
    fn undecodable_patch_is_skipped() {
        let mut s = snapshot_with(&[Squat]);
        let rows = vec![
            row(json!({"op": "ADD_ACCESSORY"})),
            row(json!({"op": "ADD_ACCESSORY", "value": {"exerciseName": "Curl"}})),
        ];

        assert_eq!(apply_overrides(&mut s, &rows), 1);
        assert_eq!(s.accessories.unwrap().len(), 1);
    }

    #[test]
    fn patch_json_round_trips_through_wire_shape() {
        let patch = OverridePatch::AddAccessory {
            value: AddAccessory {
                exercise_name: "Face Pull".to_owned(),
                sets: Some(json!(3)),
                order: None,
            },
        };
        assert_eq!(
            patch.to_json().unwrap(),
            json!({"op": "ADD_ACCESSORY", "value": {"exerciseName": "Face Pull", "sets": 3}})
        );
    }
}
