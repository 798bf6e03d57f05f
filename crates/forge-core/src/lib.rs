//! Session snapshot generation engine.
//!
//! Given a plan and a week/day, [`session::generate`] rebuilds the session
//! from the plan's current program definitions, replays the session's
//! override log on top, and upserts the result keyed by
//! `(plan_id, session_key)`.

pub mod error;
pub mod session;
pub mod store;
pub mod templates;

pub use error::GenerateError;
