mod config;
mod generate_cmd;
mod override_cmds;
mod session_cmds;
mod template_cmds;

use anyhow::Context;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use forge_db::pool;

use config::ForgeConfig;

#[derive(Parser)]
#[command(name = "forge", about = "Training session snapshot generator")]
struct Cli {
    /// Database URL (overrides FORGE_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a forge config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/forge")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the database if needed and run migrations
    DbInit,
    /// Generate (or regenerate) one session of a plan
    Generate {
        /// Requesting user ID
        #[arg(long)]
        user: String,
        /// Plan ID
        plan_id: String,
        /// Week number, starting at 1
        #[arg(long)]
        week: i32,
        /// Day number within the week, starting at 1
        #[arg(long)]
        day: i32,
        /// Session date (YYYY-MM-DD), used as the key for date-keyed plans
        #[arg(long)]
        date: Option<String>,
        /// When the session is scheduled (RFC 3339), stored on first generation
        #[arg(long)]
        scheduled_at: Option<String>,
    },
    /// Session override management
    Override {
        #[command(subcommand)]
        command: OverrideCommands,
    },
    /// Generated session management
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Program template management
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
}

#[derive(Subcommand)]
pub enum OverrideCommands {
    /// Record a patch for one session
    Add {
        /// Requesting user ID
        #[arg(long)]
        user: String,
        /// Plan ID
        plan_id: String,
        /// Session key the patch applies to (e.g. W1D2)
        #[arg(long)]
        session_key: String,
        /// Week number the session belongs to
        #[arg(long)]
        week: Option<i32>,
        /// Patch document, e.g. '{"op":"ADD_ACCESSORY","value":{"exerciseName":"Dips"}}'
        #[arg(long)]
        patch: String,
        /// Free-form note
        #[arg(long)]
        note: Option<String>,
    },
    /// List a session's overrides in application order
    List {
        /// Requesting user ID
        #[arg(long)]
        user: String,
        /// Plan ID
        plan_id: String,
        /// Session key
        #[arg(long)]
        session_key: String,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// List a plan's generated sessions
    List {
        /// Requesting user ID
        #[arg(long)]
        user: String,
        /// Plan ID
        plan_id: String,
    },
    /// Print a generated session with its snapshot
    Show {
        /// Requesting user ID
        #[arg(long)]
        user: String,
        /// Generated session ID
        session_id: String,
    },
    /// Set a generated session's status
    Status {
        /// Requesting user ID
        #[arg(long)]
        user: String,
        /// Generated session ID
        session_id: String,
        /// New status: planned, done, or skipped
        status: String,
    },
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    /// Create a private copy of a template
    Fork {
        /// Requesting user ID
        #[arg(long)]
        user: String,
        /// Template ID to fork
        template_id: String,
    },
}

/// Parse a UUID argument, naming what it identifies in the error.
pub(crate) fn parse_id(kind: &str, value: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(value).with_context(|| format!("invalid {kind} ID: {value}"))
}

fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_owned(),
        },
    };
    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!();
    println!("Next: run `forge db-init` to create and migrate the database.");

    Ok(())
}

async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = ForgeConfig::resolve(cli_db_url)?;

    println!("Initializing forge database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::row_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, rows) in counts.by_table() {
        println!("  {table}: {rows} rows");
    }

    db_pool.close().await;

    println!("forge db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Generate {
            user,
            plan_id,
            week,
            day,
            date,
            scheduled_at,
        } => {
            let resolved = ForgeConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let args = generate_cmd::GenerateArgs {
                user: &user,
                plan_id: &plan_id,
                week,
                day,
                date: date.as_deref(),
                scheduled_at: scheduled_at.as_deref(),
            };
            let result = generate_cmd::run_generate(&db_pool, &args).await;
            db_pool.close().await;
            result?;
        }
        Commands::Override { command } => {
            let resolved = ForgeConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = override_cmds::run_override_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Session { command } => {
            let resolved = ForgeConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = session_cmds::run_session_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Template { command } => {
            let resolved = ForgeConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = template_cmds::run_template_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod test_util {
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Serialize tests that read or write process environment variables.
    pub fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_parses_week_day_and_date() {
        let cli = Cli::try_parse_from([
            "forge",
            "generate",
            "--user",
            "00000000-0000-0000-0000-000000000001",
            "00000000-0000-0000-0000-000000000002",
            "--week",
            "3",
            "--day",
            "2",
            "--date",
            "2026-10-13",
        ])
        .unwrap();

        match cli.command {
            Commands::Generate { week, day, date, .. } => {
                assert_eq!((week, day), (3, 2));
                assert_eq!(date.as_deref(), Some("2026-10-13"));
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn generate_requires_week_and_day() {
        assert!(Cli::try_parse_from(["forge", "generate", "--user", "u", "p", "--week", "1"]).is_err());
    }

    #[test]
    fn reads_require_a_user() {
        assert!(Cli::try_parse_from(["forge", "session", "show", "s"]).is_err());
        assert!(
            Cli::try_parse_from(["forge", "override", "list", "p", "--session-key", "W1D1"]).is_err()
        );

        let cli = Cli::try_parse_from(["forge", "session", "show", "--user", "u", "s"]).unwrap();
        match cli.command {
            Commands::Session {
                command: SessionCommands::Show { user, session_id },
            } => assert_eq!((user.as_str(), session_id.as_str()), ("u", "s")),
            _ => panic!("expected session show"),
        }
    }

    #[test]
    fn parse_id_names_the_argument() {
        let err = parse_id("plan", "not-a-uuid").unwrap_err();
        assert!(err.to_string().contains("invalid plan ID"));
        assert!(parse_id("plan", "00000000-0000-0000-0000-000000000002").is_ok());
    }
}
