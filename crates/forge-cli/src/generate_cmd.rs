//! `forge generate`: materialize one session and print the stored row.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use forge_core::session::{GenerateRequest, generate};
use forge_core::store::PgStore;

use crate::parse_id;

pub struct GenerateArgs<'a> {
    pub user: &'a str,
    pub plan_id: &'a str,
    pub week: i32,
    pub day: i32,
    pub date: Option<&'a str>,
    pub scheduled_at: Option<&'a str>,
}

pub async fn run_generate(pool: &PgPool, args: &GenerateArgs<'_>) -> Result<()> {
    let date = args
        .date
        .map(|d| {
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .with_context(|| format!("invalid date {d:?}, expected YYYY-MM-DD"))
        })
        .transpose()?;
    let scheduled_at = args
        .scheduled_at
        .map(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .with_context(|| format!("invalid timestamp {s:?}, expected RFC 3339"))
        })
        .transpose()?;

    let request = GenerateRequest {
        user_id: parse_id("user", args.user)?,
        plan_id: parse_id("plan", args.plan_id)?,
        week: args.week,
        day: args.day,
        date,
        scheduled_at,
    };

    let store = PgStore::new(pool.clone());
    let session = generate(&store, &request).await?;

    let json = serde_json::to_string_pretty(&session).context("failed to render session")?;
    println!("{json}");
    Ok(())
}
