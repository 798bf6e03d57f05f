//! CLI handlers for `forge override` subcommands.
//!
//! - `forge override add --user <uuid> <plan-id> --session-key K --patch '<json>'`
//! - `forge override list --user <uuid> <plan-id> --session-key K`

use anyhow::Result;
use sqlx::PgPool;

use forge_core::session::{OverrideRequest, list_session_overrides, parse_patch, record_override};
use forge_core::store::PgStore;
use forge_db::models::OverrideScope;

use crate::{OverrideCommands, parse_id};

pub async fn run_override_command(command: OverrideCommands, pool: &PgPool) -> Result<()> {
    let store = PgStore::new(pool.clone());

    match command {
        OverrideCommands::Add {
            user,
            plan_id,
            session_key,
            week,
            patch,
            note,
        } => {
            let request = OverrideRequest {
                scope: OverrideScope::Session,
                week_number: week,
                session_key: Some(session_key),
                patch: parse_patch(&patch)?,
                note,
            };
            let row = record_override(
                &store,
                parse_id("user", &user)?,
                parse_id("plan", &plan_id)?,
                &request,
            )
            .await?;

            println!("Override recorded.");
            println!();
            println!("  Override ID: {}", row.id);
            println!("  Session:     {}", row.session_key.as_deref().unwrap_or("-"));
            println!("  Op:          {:?}", request.patch.op());
            println!();
            println!("Regenerate the session to apply it.");
        }
        OverrideCommands::List {
            user,
            plan_id,
            session_key,
        } => {
            let rows = list_session_overrides(
                &store,
                parse_id("user", &user)?,
                parse_id("plan", &plan_id)?,
                &session_key,
            )
            .await?;
            if rows.is_empty() {
                println!("No overrides for session {session_key}.");
                return Ok(());
            }

            println!("{:<38} {:<20} {}", "ID", "CREATED", "PATCH");
            for row in &rows {
                println!(
                    "{:<38} {:<20} {}",
                    row.id,
                    row.created_at.format("%Y-%m-%d %H:%M:%S"),
                    row.patch
                );
                if let Some(note) = &row.note {
                    println!("{:<38} note: {note}", "");
                }
            }
        }
    }
    Ok(())
}
