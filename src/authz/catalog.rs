use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::principal::CampusRef;
use crate::errors::AppError;

/// The campus scope a target resource resolves to: the set of campuses where
/// the owning program is offered. Empty means the program is offered nowhere,
/// a data anomaly the evaluator treats as Forbidden for everyone.
#[derive(Debug, Clone, Default)]
pub struct CourseScope {
    pub program_id: Uuid,
    pub campuses: Vec<CampusRef>,
}

/// Lookup collaborator for the access evaluator. Production uses [`SqlCatalog`];
/// tests substitute an in-memory implementation. All methods are narrow
/// existence/association queries, never full list scans.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Resolve Course -> CurricularUnit -> Term -> Program and the program's
    /// campus set. None when the course id does not exist.
    async fn course_scope(&self, course_id: Uuid) -> Result<Option<CourseScope>, AppError>;

    /// Campus set of the program owning the given curricular unit.
    async fn unit_scope(&self, unit_id: Uuid) -> Result<Option<CourseScope>, AppError>;

    /// Program owning the given term.
    async fn term_program(&self, term_id: Uuid) -> Result<Option<Uuid>, AppError>;

    /// Campus set where the program itself is offered.
    async fn program_campuses(&self, program_id: Uuid) -> Result<Option<Vec<CampusRef>>, AppError>;

    /// The RTI owning a campus. None when the campus does not exist.
    async fn campus_rti(&self, campus_id: Uuid) -> Result<Option<Uuid>, AppError>;

    async fn rti_exists(&self, rti_id: Uuid) -> Result<bool, AppError>;

    /// Is the user one of the course's assigned teachers?
    async fn is_course_teacher(&self, course_id: Uuid, user_id: Uuid) -> Result<bool, AppError>;

    /// Does the user have at least one assigned course within the scope?
    async fn teacher_in_program(&self, program_id: Uuid, user_id: Uuid) -> Result<bool, AppError>;
    async fn teacher_in_term(&self, term_id: Uuid, user_id: Uuid) -> Result<bool, AppError>;
    async fn teacher_in_unit(&self, unit_id: Uuid, user_id: Uuid) -> Result<bool, AppError>;

    /// Upward resolution of the planning chain to its owning course.
    async fn planning_course(&self, planning_id: Uuid) -> Result<Option<Uuid>, AppError>;
    async fn content_course(&self, content_id: Uuid) -> Result<Option<Uuid>, AppError>;
    async fn activity_course(&self, activity_id: Uuid) -> Result<Option<Uuid>, AppError>;
}

/// sqlx-backed catalog over the SQLite schema.
#[derive(Clone)]
pub struct SqlCatalog {
    pool: SqlitePool,
}

impl SqlCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn campuses_of_program(&self, program_id: &str) -> Result<Vec<CampusRef>, AppError> {
        let rows = sqlx::query(
            "SELECT c.id, c.rti_id FROM program_campuses pc \
             JOIN campuses c ON c.id = pc.campus_id \
             WHERE pc.program_id = ?",
        )
        .bind(program_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let id = Uuid::parse_str(row.get::<&str, _>("id"))
                    .map_err(|_| AppError::internal("malformed campus id"))?;
                let rti_id = Uuid::parse_str(row.get::<&str, _>("rti_id"))
                    .map_err(|_| AppError::internal("malformed rti id"))?;
                Ok(CampusRef { id, rti_id })
            })
            .collect()
    }

    async fn scalar_exists(&self, sql: &str, binds: &[String]) -> Result<bool, AppError> {
        let mut query = sqlx::query_scalar::<_, i64>(sql);
        for bind in binds {
            query = query.bind(bind.clone());
        }
        Ok(query.fetch_one(&self.pool).await? > 0)
    }

    async fn single_parent(&self, sql: &str, id: Uuid) -> Result<Option<Uuid>, AppError> {
        let parent: Option<String> = sqlx::query_scalar(sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match parent {
            Some(raw) => Uuid::parse_str(&raw)
                .map(Some)
                .map_err(|_| AppError::internal("malformed parent id")),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Catalog for SqlCatalog {
    async fn course_scope(&self, course_id: Uuid) -> Result<Option<CourseScope>, AppError> {
        let program: Option<String> = sqlx::query_scalar(
            "SELECT t.program_id FROM courses co \
             JOIN curricular_units cu ON cu.id = co.curricular_unit_id \
             JOIN terms t ON t.id = cu.term_id \
             WHERE co.id = ?",
        )
        .bind(course_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(program_raw) = program else {
            return Ok(None);
        };
        let program_id = Uuid::parse_str(&program_raw)
            .map_err(|_| AppError::internal("malformed program id"))?;
        let campuses = self.campuses_of_program(&program_raw).await?;

        Ok(Some(CourseScope {
            program_id,
            campuses,
        }))
    }

    async fn unit_scope(&self, unit_id: Uuid) -> Result<Option<CourseScope>, AppError> {
        let program: Option<String> = sqlx::query_scalar(
            "SELECT t.program_id FROM curricular_units cu \
             JOIN terms t ON t.id = cu.term_id \
             WHERE cu.id = ?",
        )
        .bind(unit_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(program_raw) = program else {
            return Ok(None);
        };
        let program_id = Uuid::parse_str(&program_raw)
            .map_err(|_| AppError::internal("malformed program id"))?;
        let campuses = self.campuses_of_program(&program_raw).await?;

        Ok(Some(CourseScope {
            program_id,
            campuses,
        }))
    }

    async fn term_program(&self, term_id: Uuid) -> Result<Option<Uuid>, AppError> {
        self.single_parent("SELECT program_id FROM terms WHERE id = ?", term_id)
            .await
    }

    async fn program_campuses(&self, program_id: Uuid) -> Result<Option<Vec<CampusRef>>, AppError> {
        let exists = self
            .scalar_exists(
                "SELECT COUNT(1) FROM programs WHERE id = ?",
                &[program_id.to_string()],
            )
            .await?;
        if !exists {
            return Ok(None);
        }

        Ok(Some(self.campuses_of_program(&program_id.to_string()).await?))
    }

    async fn campus_rti(&self, campus_id: Uuid) -> Result<Option<Uuid>, AppError> {
        self.single_parent("SELECT rti_id FROM campuses WHERE id = ?", campus_id)
            .await
    }

    async fn rti_exists(&self, rti_id: Uuid) -> Result<bool, AppError> {
        self.scalar_exists("SELECT COUNT(1) FROM rtis WHERE id = ?", &[rti_id.to_string()])
            .await
    }

    async fn is_course_teacher(&self, course_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        self.scalar_exists(
            "SELECT COUNT(1) FROM course_teachers WHERE course_id = ? AND user_id = ?",
            &[course_id.to_string(), user_id.to_string()],
        )
        .await
    }

    async fn teacher_in_program(&self, program_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        self.scalar_exists(
            "SELECT COUNT(1) FROM course_teachers ct \
             JOIN courses co ON co.id = ct.course_id \
             JOIN curricular_units cu ON cu.id = co.curricular_unit_id \
             JOIN terms t ON t.id = cu.term_id \
             WHERE t.program_id = ? AND ct.user_id = ?",
            &[program_id.to_string(), user_id.to_string()],
        )
        .await
    }

    async fn teacher_in_term(&self, term_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        self.scalar_exists(
            "SELECT COUNT(1) FROM course_teachers ct \
             JOIN courses co ON co.id = ct.course_id \
             JOIN curricular_units cu ON cu.id = co.curricular_unit_id \
             WHERE cu.term_id = ? AND ct.user_id = ?",
            &[term_id.to_string(), user_id.to_string()],
        )
        .await
    }

    async fn teacher_in_unit(&self, unit_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        self.scalar_exists(
            "SELECT COUNT(1) FROM course_teachers ct \
             JOIN courses co ON co.id = ct.course_id \
             WHERE co.curricular_unit_id = ? AND ct.user_id = ?",
            &[unit_id.to_string(), user_id.to_string()],
        )
        .await
    }

    async fn planning_course(&self, planning_id: Uuid) -> Result<Option<Uuid>, AppError> {
        self.single_parent(
            "SELECT course_id FROM weekly_plannings WHERE id = ?",
            planning_id,
        )
        .await
    }

    async fn content_course(&self, content_id: Uuid) -> Result<Option<Uuid>, AppError> {
        self.single_parent(
            "SELECT wp.course_id FROM programmatic_contents pcnt \
             JOIN weekly_plannings wp ON wp.id = pcnt.weekly_planning_id \
             WHERE pcnt.id = ?",
            content_id,
        )
        .await
    }

    async fn activity_course(&self, activity_id: Uuid) -> Result<Option<Uuid>, AppError> {
        self.single_parent(
            "SELECT wp.course_id FROM activities a \
             JOIN programmatic_contents pcnt ON pcnt.id = a.programmatic_content_id \
             JOIN weekly_plannings wp ON wp.id = pcnt.weekly_planning_id \
             WHERE a.id = ?",
            activity_id,
        )
        .await
    }
}
