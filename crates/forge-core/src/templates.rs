//! Template forking.
//!
//! A fork is a PRIVATE copy of a template owned by the forking user. Its
//! first version copies the source's latest definition and defaults, and
//! both rows point back at what they were copied from.

use anyhow::Context;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use forge_db::models::{ProgramTemplate, ProgramVersion, Visibility};
use forge_db::queries::templates::{self, NewTemplate};
use forge_db::queries::versions;

use crate::error::GenerateError;

/// Fork `template_id` for `user_id`.
///
/// Private templates belonging to someone else are reported as not found.
/// The template row and its version 1 are inserted in one transaction.
pub async fn fork_template(
    pool: &PgPool,
    user_id: Uuid,
    template_id: Uuid,
) -> Result<(ProgramTemplate, ProgramVersion), GenerateError> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let source = templates::get_template(&mut *tx, template_id)
        .await?
        .filter(|t| is_visible_to(t, user_id))
        .ok_or_else(|| GenerateError::not_found(format!("program template {template_id}")))?;

    let latest = versions::get_latest_version(&mut *tx, source.id)
        .await?
        .ok_or_else(|| GenerateError::not_found(format!("versions of program template {}", source.slug)))?;

    let new = NewTemplate::private_fork(&source, fork_slug(&source.slug, Uuid::new_v4()), user_id);
    let fork = templates::insert_template(&mut *tx, &new).await?;
    let version = versions::insert_next_version(
        &mut *tx,
        fork.id,
        &latest.definition,
        &latest.defaults,
        Some(latest.id),
    )
    .await?;

    tx.commit().await.context("failed to commit fork")?;

    info!(
        template_id = %fork.id,
        source_template_id = %source.id,
        source_version = latest.version,
        user_id = %user_id,
        slug = %fork.slug,
        "forked template"
    );
    Ok((fork, version))
}

fn is_visible_to(template: &ProgramTemplate, user_id: Uuid) -> bool {
    template.visibility == Visibility::Public || template.owner_user_id == Some(user_id)
}

/// `<slug>-fork-<first 8 hex digits of nonce>`.
fn fork_slug(slug: &str, nonce: Uuid) -> String {
    let simple = nonce.simple().to_string();
    format!("{slug}-fork-{}", &simple[..8])
}
