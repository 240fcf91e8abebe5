use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Rti {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Campus {
    pub id: Uuid,
    pub rti_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Program {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Term {
    pub id: Uuid,
    pub program_id: Uuid,
    pub name: String,
    pub number: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurricularUnit {
    pub id: Uuid,
    pub term_id: Uuid,
    pub name: String,
    pub workload_hours: Option<i64>,
}
