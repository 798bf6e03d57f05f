//! Session generation: key derivation, plan resolution, override replay,
//! and persistence of the resulting snapshot.

pub mod builder;
pub mod key;
pub mod patch;
pub mod persist;
pub mod resolve;
pub mod service;
pub mod snapshot;

pub use builder::build_snapshot;
pub use key::{SessionKeyMode, SessionKeyOrder, derive_session_key, week_day_key};
pub use patch::{OverridePatch, apply_overrides, apply_patch};
pub use persist::persist_snapshot;
pub use resolve::{load_owned_plan, resolve_base_snapshot};
pub use service::{
    GenerateRequest, OverrideRequest, generate, get_generated_session, list_generated_sessions,
    list_session_overrides, parse_patch, parse_status, record_override, set_session_status,
};
pub use snapshot::{PatchOp, Snapshot};
