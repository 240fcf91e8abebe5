use std::collections::HashSet;

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::position::Role;

/// Campus reference with its owning RTI, as granted to a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CampusRef {
    pub id: Uuid,
    pub rti_id: Uuid,
}

/// One active position held by the caller. Inactive positions are filtered
/// out at load time and never reach the evaluator.
#[derive(Debug, Clone)]
pub struct ActivePosition {
    pub role: Role,
    pub campuses: Vec<CampusRef>,
}

/// The authenticated caller with their active positions and campus grants
/// fully resolved. Built once per request and handed to every evaluator
/// operation as an explicit argument.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub positions: Vec<ActivePosition>,
}

impl Principal {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            positions: Vec::new(),
        }
    }

    pub fn with_position(mut self, role: Role, campuses: impl IntoIterator<Item = CampusRef>) -> Self {
        self.positions.push(ActivePosition {
            role,
            campuses: campuses.into_iter().collect(),
        });
        self
    }

    /// Union of campus ids across all active positions.
    pub fn campus_ids(&self) -> HashSet<Uuid> {
        self.positions
            .iter()
            .flat_map(|p| p.campuses.iter().map(|c| c.id))
            .collect()
    }

    /// Union of the RTI ids behind those campuses.
    pub fn rti_ids(&self) -> HashSet<Uuid> {
        self.positions
            .iter()
            .flat_map(|p| p.campuses.iter().map(|c| c.rti_id))
            .collect()
    }

    /// True iff every active position is Teacher. A caller with zero active
    /// positions is not teacher-only; the campus gate already denies them.
    pub fn has_only_teacher_role(&self) -> bool {
        !self.positions.is_empty() && self.positions.iter().all(|p| p.role == Role::Teacher)
    }

    /// True iff at least one active position is Teacher, whatever else is held.
    pub fn has_teacher_role(&self) -> bool {
        self.positions.iter().any(|p| p.role == Role::Teacher)
    }

    /// True iff some active Analyst or Coordinator position reaches one of the
    /// given campuses, directly or through an RTI grant.
    pub fn has_course_admin_at(&self, campuses: &[CampusRef]) -> bool {
        self.positions
            .iter()
            .filter(|p| p.role.is_course_admin())
            .any(|p| {
                p.campuses.iter().any(|held| {
                    campuses
                        .iter()
                        .any(|target| target.id == held.id || target.rti_id == held.rti_id)
                })
            })
    }

    /// Load the caller's active positions with their campus/RTI grants.
    pub async fn load(pool: &SqlitePool, user_id: Uuid) -> Result<Principal, AppError> {
        let rows = sqlx::query(
            "SELECT p.id AS position_id, p.role, c.id AS campus_id, c.rti_id \
             FROM positions p \
             LEFT JOIN position_campuses pc ON pc.position_id = p.id \
             LEFT JOIN campuses c ON c.id = pc.campus_id \
             WHERE p.user_id = ? AND p.is_active = 1 \
             ORDER BY p.id",
        )
        .bind(user_id.to_string())
        .fetch_all(pool)
        .await?;

        let mut principal = Principal::new(user_id);
        let mut current_id: Option<String> = None;

        for row in rows {
            let position_id: String = row.get("position_id");
            let role_raw: String = row.get("role");
            let role = Role::parse(&role_raw)
                .ok_or_else(|| AppError::internal(format!("unknown role in position: {role_raw}")))?;

            if current_id.as_deref() != Some(position_id.as_str()) {
                principal.positions.push(ActivePosition {
                    role,
                    campuses: Vec::new(),
                });
                current_id = Some(position_id);
            }

            let campus_id: Option<String> = row.get("campus_id");
            let rti_id: Option<String> = row.get("rti_id");
            if let (Some(campus_id), Some(rti_id)) = (campus_id, rti_id) {
                let campus = Uuid::parse_str(&campus_id)
                    .map_err(|_| AppError::internal("malformed campus id"))?;
                let rti = Uuid::parse_str(&rti_id)
                    .map_err(|_| AppError::internal("malformed rti id"))?;
                if let Some(position) = principal.positions.last_mut() {
                    position.campuses.push(CampusRef { id: campus, rti_id: rti });
                }
            }
        }

        Ok(principal)
    }
}
