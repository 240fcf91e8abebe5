use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WeeklyPlanning {
    pub id: Uuid,
    pub course_id: Uuid,
    pub week_number: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WeeklyPlanningCreateRequest {
    #[schema(example = 3)]
    pub week_number: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WeeklyPlanningUpdateRequest {
    pub week_number: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProgrammaticContent {
    pub id: Uuid,
    pub weekly_planning_id: Uuid,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProgrammaticContentCreateRequest {
    #[schema(example = "Introduction to relational algebra")]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Activity {
    pub id: Uuid,
    pub programmatic_content_id: Uuid,
    pub description: String,
    pub kind: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ActivityCreateRequest {
    #[schema(example = "Practice sheet on joins")]
    pub description: String,
    #[schema(example = "exercise")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OfficeHours {
    pub id: Uuid,
    pub course_id: Uuid,
    pub weekday: i64,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OfficeHoursCreateRequest {
    /// 0 = Monday .. 6 = Sunday.
    #[schema(example = 2)]
    pub weekday: i64,
    #[schema(example = "14:00")]
    pub start_time: String,
    #[schema(example = "16:00")]
    pub end_time: String,
}
