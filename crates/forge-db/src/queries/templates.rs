//! Database query functions for the `program_templates` table.

use anyhow::{Context, Result};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::{ProgramTemplate, TemplateType, Visibility};

/// Parameters for inserting a new template row.
#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub slug: String,
    pub name: String,
    pub template_type: TemplateType,
    pub visibility: Visibility,
    pub owner_user_id: Option<Uuid>,
    pub parent_template_id: Option<Uuid>,
}

impl NewTemplate {
    /// A public template with no owner and no lineage.
    pub fn public(slug: &str, name: &str, template_type: TemplateType) -> Self {
        Self {
            slug: slug.to_owned(),
            name: name.to_owned(),
            template_type,
            visibility: Visibility::Public,
            owner_user_id: None,
            parent_template_id: None,
        }
    }

    /// A private copy of `source` owned by `owner_user_id`.
    pub fn private_fork(source: &ProgramTemplate, slug: String, owner_user_id: Uuid) -> Self {
        Self {
            slug,
            name: source.name.clone(),
            template_type: source.template_type,
            visibility: Visibility::Private,
            owner_user_id: Some(owner_user_id),
            parent_template_id: Some(source.id),
        }
    }
}

/// Insert a new template row.
///
/// Generic over the executor so template forking can run it inside its
/// transaction.
pub async fn insert_template<'e, E>(executor: E, new: &NewTemplate) -> Result<ProgramTemplate>
where
    E: PgExecutor<'e>,
{
    let template = sqlx::query_as::<_, ProgramTemplate>(
        "INSERT INTO program_templates \
         (slug, name, template_type, visibility, owner_user_id, parent_template_id) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING *",
    )
    .bind(&new.slug)
    .bind(&new.name)
    .bind(new.template_type)
    .bind(new.visibility)
    .bind(new.owner_user_id)
    .bind(new.parent_template_id)
    .fetch_one(executor)
    .await
    .with_context(|| format!("failed to insert template {:?}", new.slug))?;

    Ok(template)
}

/// Fetch a template by its ID.
pub async fn get_template<'e, E>(executor: E, id: Uuid) -> Result<Option<ProgramTemplate>>
where
    E: PgExecutor<'e>,
{
    let template =
        sqlx::query_as::<_, ProgramTemplate>("SELECT * FROM program_templates WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
            .context("failed to fetch template")?;

    Ok(template)
}
