//! Typed query functions, one module per table.

pub mod generated_sessions;
pub mod modules;
pub mod overrides;
pub mod plans;
pub mod templates;
pub mod versions;
