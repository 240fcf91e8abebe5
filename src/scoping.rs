//! Query scoping for listing/existence endpoints.
//!
//! All filter parameters are optional; combining them is conjunctive. A
//! period string that fails to parse is treated as "no period filter" rather
//! than an error: list endpoints tolerate malformed query parameters, unlike
//! the access evaluator, which always raises on a violation. `parse_period`
//! is the single shared helper enforcing that policy.

use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

/// Academic half-year, derived from a course's start month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semester {
    /// Start month in January..=July.
    First,
    /// Start month in August..=December.
    Second,
}

impl Semester {
    pub fn month_bounds(&self) -> (u32, u32) {
        match self {
            Semester::First => (1, 7),
            Semester::Second => (8, 12),
        }
    }
}

/// Parse an academic period label (`YYYY-1S` / `YYYY-2S`). Returns None on
/// any malformed input; callers drop the filter instead of failing.
pub fn parse_period(raw: &str) -> Option<(i32, Semester)> {
    let (year_raw, semester_raw) = raw.split_once('-')?;

    // Exactly four digits; `parse` alone would also accept "+125".
    if year_raw.len() != 4 || !year_raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = year_raw.parse().ok()?;

    let semester = match semester_raw {
        "1S" => Semester::First,
        "2S" => Semester::Second,
        _ => return None,
    };

    Some((year, semester))
}

/// Composable course listing filter. Joins are only added for the filters
/// actually present, and the projection is DISTINCT since the teacher and
/// campus joins can multiply rows.
#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub user_id: Option<Uuid>,
    pub campus_id: Option<Uuid>,
    pub period: Option<String>,
}

impl CourseFilter {
    pub fn query(&self) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new(
            "SELECT DISTINCT co.id, co.curricular_unit_id, co.name, co.start_date, \
             co.created_at, co.updated_at FROM courses co",
        );

        if self.user_id.is_some() {
            builder.push(" JOIN course_teachers ct ON ct.course_id = co.id");
        }
        if self.campus_id.is_some() {
            builder.push(
                " JOIN curricular_units cu ON cu.id = co.curricular_unit_id \
                 JOIN terms t ON t.id = cu.term_id \
                 JOIN program_campuses pcam ON pcam.program_id = t.program_id",
            );
        }

        builder.push(" WHERE 1 = 1");

        if let Some(user_id) = self.user_id {
            builder.push(" AND ct.user_id = ");
            builder.push_bind(user_id.to_string());
        }
        if let Some(campus_id) = self.campus_id {
            builder.push(" AND pcam.campus_id = ");
            builder.push_bind(campus_id.to_string());
        }
        if let Some((year, semester)) = self.period.as_deref().and_then(parse_period) {
            let (first, last) = semester.month_bounds();
            builder.push(" AND CAST(strftime('%Y', co.start_date) AS INTEGER) = ");
            builder.push_bind(year);
            builder.push(" AND CAST(strftime('%m', co.start_date) AS INTEGER) BETWEEN ");
            builder.push_bind(first as i64);
            builder.push(" AND ");
            builder.push_bind(last as i64);
        }

        // Stable secondary ordering for deterministic pagination.
        builder.push(" ORDER BY co.name ASC, co.start_date DESC");
        builder
    }
}
