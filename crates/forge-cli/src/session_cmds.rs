//! CLI handlers for `forge session` subcommands.
//!
//! - `forge session list --user <uuid> <plan-id>`
//! - `forge session show --user <uuid> <session-id>`
//! - `forge session status --user <uuid> <session-id> <status>`

use anyhow::{Context, Result};
use sqlx::PgPool;

use forge_core::session::{
    get_generated_session, list_generated_sessions, parse_status, set_session_status,
};
use forge_core::store::PgStore;

use crate::{SessionCommands, parse_id};

pub async fn run_session_command(command: SessionCommands, pool: &PgPool) -> Result<()> {
    match command {
        SessionCommands::List { user, plan_id } => cmd_list(pool, &user, &plan_id).await,
        SessionCommands::Show { user, session_id } => cmd_show(pool, &user, &session_id).await,
        SessionCommands::Status {
            user,
            session_id,
            status,
        } => cmd_status(pool, &user, &session_id, &status).await,
    }
}

async fn cmd_list(pool: &PgPool, user: &str, plan_id: &str) -> Result<()> {
    let store = PgStore::new(pool.clone());
    let sessions =
        list_generated_sessions(&store, parse_id("user", user)?, parse_id("plan", plan_id)?).await?;

    if sessions.is_empty() {
        println!("No generated sessions.");
        return Ok(());
    }

    println!("{:<38} {:<12} {:<8} {}", "ID", "KEY", "STATUS", "UPDATED");
    for s in &sessions {
        println!(
            "{:<38} {:<12} {:<8} {}",
            s.id,
            s.session_key,
            s.status,
            s.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

async fn cmd_show(pool: &PgPool, user: &str, session_id: &str) -> Result<()> {
    let store = PgStore::new(pool.clone());
    let session = get_generated_session(
        &store,
        parse_id("user", user)?,
        parse_id("session", session_id)?,
    )
    .await?;

    let json = serde_json::to_string_pretty(&session).context("failed to render session")?;
    println!("{json}");
    Ok(())
}

async fn cmd_status(pool: &PgPool, user: &str, session_id: &str, status: &str) -> Result<()> {
    let store = PgStore::new(pool.clone());
    let status = parse_status(status)?;
    let session = set_session_status(
        &store,
        parse_id("user", user)?,
        parse_id("session", session_id)?,
        status,
    )
    .await?;

    println!("Session {} ({}) is now {}.", session.id, session.session_key, session.status);
    Ok(())
}
