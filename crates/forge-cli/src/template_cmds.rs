//! CLI handlers for `forge template` subcommands.

use anyhow::Result;
use sqlx::PgPool;

use forge_core::templates::fork_template;

use crate::{TemplateCommands, parse_id};

pub async fn run_template_command(command: TemplateCommands, pool: &PgPool) -> Result<()> {
    match command {
        TemplateCommands::Fork { user, template_id } => {
            let (template, version) =
                fork_template(pool, parse_id("user", &user)?, parse_id("template", &template_id)?)
                    .await?;

            println!("Template forked.");
            println!();
            println!("  Template ID: {}", template.id);
            println!("  Slug:        {}", template.slug);
            println!("  Visibility:  {}", template.visibility);
            println!("  Version ID:  {}", version.id);
        }
    }
    Ok(())
}
