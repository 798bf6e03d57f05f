//! Connection pools, database bootstrap, and embedded migrations.

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, FromRow, PgPool};
use tracing::info;

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/forge-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

const POOL_SIZE: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Create a connection pool for the forge database.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    connect(&config.database_url, POOL_SIZE)
        .await
        .with_context(|| format!("failed to connect to database at {}", config.database_url))
}

async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(url)
        .await
}

/// Apply any pending embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;

    info!(migrations = MIGRATOR.iter().count(), "schema up to date");
    Ok(())
}

/// Create the database named in `config` if the server does not have it.
///
/// Connects to the server's `postgres` database to check and create.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<()> {
    let db_name = config
        .database_name()
        .context("could not determine database name from URL")?;
    check_database_name(db_name)?;

    let maintenance_url = config.maintenance_url();
    let maint_pool = connect(&maintenance_url, 1)
        .await
        .with_context(|| format!("failed to connect to maintenance database at {maintenance_url}"))?;

    let result = create_if_missing(&maint_pool, db_name).await;
    maint_pool.close().await;
    result
}

async fn create_if_missing(maint_pool: &PgPool, db_name: &str) -> Result<()> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(maint_pool)
            .await
            .context("failed to query pg_database")?;

    if exists {
        info!(db = db_name, "database already exists");
        return Ok(());
    }

    maint_pool
        .execute(format!("CREATE DATABASE {db_name}").as_str())
        .await
        .with_context(|| format!("failed to create database {db_name}"))?;
    info!(db = db_name, "database created");
    Ok(())
}

/// `CREATE DATABASE` takes no bind parameters, so the name is spliced into
/// the statement and must be a plain identifier.
fn check_database_name(name: &str) -> Result<()> {
    let plain = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !plain {
        anyhow::bail!("database name {name:?} must be letters, digits, and underscores");
    }
    Ok(())
}

/// Row counts for forge's tables, as reported by `forge db-init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct RowCounts {
    pub program_templates: i64,
    pub program_versions: i64,
    pub plans: i64,
    pub plan_modules: i64,
    pub plan_overrides: i64,
    pub generated_sessions: i64,
}

impl RowCounts {
    /// `(table, rows)` pairs in dependency order.
    pub fn by_table(&self) -> [(&'static str, i64); 6] {
        [
            ("program_templates", self.program_templates),
            ("program_versions", self.program_versions),
            ("plans", self.plans),
            ("plan_modules", self.plan_modules),
            ("plan_overrides", self.plan_overrides),
            ("generated_sessions", self.generated_sessions),
        ]
    }
}

/// Count the rows of every forge table in one round trip.
pub async fn row_counts(pool: &PgPool) -> Result<RowCounts> {
    sqlx::query_as::<_, RowCounts>(
        "SELECT \
             (SELECT COUNT(*) FROM program_templates) AS program_templates, \
             (SELECT COUNT(*) FROM program_versions) AS program_versions, \
             (SELECT COUNT(*) FROM plans) AS plans, \
             (SELECT COUNT(*) FROM plan_modules) AS plan_modules, \
             (SELECT COUNT(*) FROM plan_overrides) AS plan_overrides, \
             (SELECT COUNT(*) FROM generated_sessions) AS generated_sessions",
    )
    .fetch_one(pool)
    .await
    .context("failed to count forge rows")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_names_must_be_plain_identifiers() {
        assert!(check_database_name("forge").is_ok());
        assert!(check_database_name("forge_test_0a1b").is_ok());
        assert!(check_database_name("").is_err());
        assert!(check_database_name("9lives").is_err());
        assert!(check_database_name("forge-dev").is_err());
        assert!(check_database_name("forge; DROP DATABASE x").is_err());
    }

    #[test]
    fn row_counts_list_tables_in_dependency_order() {
        let counts = RowCounts {
            program_templates: 1,
            program_versions: 2,
            plans: 3,
            plan_modules: 4,
            plan_overrides: 5,
            generated_sessions: 6,
        };
        let tables: Vec<&str> = counts.by_table().iter().map(|(t, _)| *t).collect();
        assert_eq!(
            tables,
            [
                "program_templates",
                "program_versions",
                "plans",
                "plan_modules",
                "plan_overrides",
                "generated_sessions",
            ]
        );
        assert_eq!(counts.by_table()[5].1, 6);
    }
}
