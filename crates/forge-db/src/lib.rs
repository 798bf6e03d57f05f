//! Storage layer for forge: schema migrations, row models, and typed
//! query functions over PostgreSQL.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
