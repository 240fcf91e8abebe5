use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Closed role set. A position's role is fixed at creation; only `is_active`
/// and campus membership change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrator,
    EducationManager,
    Coordinator,
    Teacher,
    Analyst,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::EducationManager => "education_manager",
            Role::Coordinator => "coordinator",
            Role::Teacher => "teacher",
            Role::Analyst => "analyst",
        }
    }

    pub fn parse(raw: &str) -> Option<Role> {
        match raw {
            "administrator" => Some(Role::Administrator),
            "education_manager" => Some(Role::EducationManager),
            "coordinator" => Some(Role::Coordinator),
            "teacher" => Some(Role::Teacher),
            "analyst" => Some(Role::Analyst),
            _ => None,
        }
    }

    /// Roles allowed to update or delete course metadata at their campuses.
    pub fn is_course_admin(&self) -> bool {
        matches!(self, Role::Analyst | Role::Coordinator)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Position {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub is_active: bool,
    pub campus_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
