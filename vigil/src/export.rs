//! Phase C: dump users with their prayers, testimonies and comments as one
//! nested JSON document.
use crate::error::ExportError;
use crate::provision::connect_options;
use serde::Serialize;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::FromRow;
use std::collections::HashMap;
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn};
use vigil_core::ExportConfig;

#[derive(Clone, Debug, PartialEq, Serialize, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: Option<String>,
    pub otp: Option<String>,
    pub otp_date: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, FromRow)]
pub struct PrayerRow {
    pub uuid: String,
    #[serde(rename = "userId")]
    #[sqlx(rename = "userId")]
    pub user_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, FromRow)]
pub struct TestimonyRow {
    pub uuid: String,
    pub prayer_uuid: Option<String>,
    pub testimony: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, FromRow)]
pub struct CommentRow {
    pub uuid: String,
    pub prayer_uuid: Option<String>,
    pub testimony_uuid: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TestimonyDetails {
    #[serde(flatten)]
    pub testimony: TestimonyRow,
    pub comments: Vec<CommentRow>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PrayerDetails {
    #[serde(flatten)]
    pub prayer: PrayerRow,
    pub testimonies: Vec<TestimonyDetails>,
    pub comments: Vec<CommentRow>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserDetails {
    #[serde(flatten)]
    pub user: UserRow,
    pub prayers: Vec<PrayerDetails>,
}

/// Nests the flat tables. A comment goes under its testimony when that
/// testimony exists, otherwise under its prayer; rows whose parent is
/// unknown are dropped. Row order is preserved at every level.
pub fn link(
    users: Vec<UserRow>,
    prayers: Vec<PrayerRow>,
    testimonies: Vec<TestimonyRow>,
    comments: Vec<CommentRow>,
) -> Vec<UserDetails> {
    let mut prayers: Vec<PrayerDetails> = prayers
        .into_iter()
        .map(|prayer| PrayerDetails {
            prayer,
            testimonies: vec![],
            comments: vec![],
        })
        .collect();
    let prayer_index: HashMap<String, usize> = prayers
        .iter()
        .enumerate()
        .map(|(i, p)| (p.prayer.uuid.clone(), i))
        .collect();

    let mut testimonies: Vec<TestimonyDetails> = testimonies
        .into_iter()
        .map(|testimony| TestimonyDetails {
            testimony,
            comments: vec![],
        })
        .collect();
    let testimony_index: HashMap<String, usize> = testimonies
        .iter()
        .enumerate()
        .map(|(i, t)| (t.testimony.uuid.clone(), i))
        .collect();

    for comment in comments {
        let testimony = comment
            .testimony_uuid
            .as_ref()
            .and_then(|uuid| testimony_index.get(uuid))
            .copied();
        let prayer = comment
            .prayer_uuid
            .as_ref()
            .and_then(|uuid| prayer_index.get(uuid))
            .copied();

        match (testimony, prayer) {
            (Some(t), _) => testimonies[t].comments.push(comment),
            (None, Some(p)) => prayers[p].comments.push(comment),
            (None, None) => debug!("Dropping orphaned comment {}", comment.uuid),
        }
    }

    for testimony in testimonies {
        let parent = testimony
            .testimony
            .prayer_uuid
            .as_ref()
            .and_then(|uuid| prayer_index.get(uuid))
            .copied();
        match parent {
            Some(p) => prayers[p].testimonies.push(testimony),
            None => debug!("Dropping orphaned testimony {}", testimony.testimony.uuid),
        }
    }

    let mut by_user: HashMap<i64, Vec<PrayerDetails>> = HashMap::new();
    for prayer in prayers {
        if let Some(user_id) = prayer.prayer.user_id {
            by_user.entry(user_id).or_default().push(prayer);
        }
    }

    users
        .into_iter()
        .map(|user| UserDetails {
            prayers: by_user.remove(&user.id).unwrap_or_default(),
            user,
        })
        .collect()
}

async fn fetch_all<T>(pool: &MySqlPool, table: &str, sql: &str) -> Result<Vec<T>, sqlx::Error>
where
    T: for<'r> FromRow<'r, sqlx::mysql::MySqlRow> + Send + Unpin,
{
    let rows: Vec<T> = sqlx::query_as(sql).fetch_all(pool).await?;
    info!("Fetched {} rows from the `{table}` table.", rows.len());
    Ok(rows)
}

async fn fetch_details(pool: &MySqlPool) -> Result<Vec<UserDetails>, sqlx::Error> {
    let users = fetch_all(
        pool,
        "user",
        "SELECT CAST(id AS SIGNED) AS id, email, CAST(otp AS CHAR) AS otp, \
         CAST(otp_date AS CHAR) AS otp_date FROM `user`",
    )
    .await?;
    let prayers = fetch_all(
        pool,
        "prayer",
        "SELECT CAST(uuid AS CHAR) AS uuid, CAST(userId AS SIGNED) AS userId, title, description FROM prayer",
    )
    .await?;
    let testimonies = fetch_all(
        pool,
        "testimony",
        "SELECT CAST(uuid AS CHAR) AS uuid, CAST(prayer_uuid AS CHAR) AS prayer_uuid, testimony FROM testimony",
    )
    .await?;
    let comments = fetch_all(
        pool,
        "comment",
        "SELECT CAST(uuid AS CHAR) AS uuid, CAST(prayer_uuid AS CHAR) AS prayer_uuid, \
         CAST(testimony_uuid AS CHAR) AS testimony_uuid, description FROM comment",
    )
    .await?;

    Ok(link(users, prayers, testimonies, comments))
}

/// Reads the four tables, links them and writes the result as pretty JSON.
#[instrument(name = "export", skip_all, fields(output = %config.output.display()))]
pub async fn export_users(config: &ExportConfig) -> Result<Vec<UserDetails>, ExportError> {
    let pool = MySqlPoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options(&config.database))
        .await?;
    info!("Database connection established.");

    let details = fetch_details(&pool).await;
    pool.close().await;
    info!("Database connection closed.");
    let details = details?;

    let json = serde_json::to_string_pretty(&details)?;
    std::fs::write(&config.output, json).map_err(|source| ExportError::Io {
        path: config.output.display().to_string(),
        source,
    })?;
    info!(
        outcome = "success",
        "Exported {} users to {}",
        details.len(),
        config.output.display()
    );

    Ok(details)
}
