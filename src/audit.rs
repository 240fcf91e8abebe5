//! Append-only modification log.
//!
//! Every course-hierarchy mutation gets a row attributed to the acting user
//! and the owning course, written after the mutation it describes. Entries
//! are never updated, deleted, or read back by the authorization layer.
//! Handlers treat a failed write as log noise, not as a request failure.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::modification::ModificationKind;
use crate::utils::utc_now;

pub async fn record(
    pool: &SqlitePool,
    kind: ModificationKind,
    user_id: Uuid,
    course_id: Uuid,
    description: &str,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO modifications (id, course_id, user_id, kind, description, occurred_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(course_id.to_string())
    .bind(user_id.to_string())
    .bind(kind.as_str())
    .bind(description)
    .bind(utc_now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Fire-and-forget variant used by handlers: the mutation already happened,
/// so an audit failure is logged and swallowed.
pub async fn record_or_log(
    pool: &SqlitePool,
    kind: ModificationKind,
    user_id: Uuid,
    course_id: Uuid,
    description: &str,
) {
    if let Err(err) = record(pool, kind, user_id, course_id, description).await {
        tracing::error!(%course_id, %user_id, "failed to write modification log: {err}");
    }
}
