use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of mutation an audit entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModificationKind {
    Create,
    Update,
    Delete,
}

impl ModificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModificationKind::Create => "CREATE",
            ModificationKind::Update => "UPDATE",
            ModificationKind::Delete => "DELETE",
        }
    }
}

/// Append-only audit entry. Written after the mutation it describes, never
/// updated or deleted, and never read back by the authorization layer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Modification {
    pub id: Uuid,
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub kind: ModificationKind,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}
