use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use sqlx::Row;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::app::AppState;
use crate::audit;
use crate::authz::Principal;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::course::{Course, CourseUpdateRequest};
use crate::models::modification::ModificationKind;
use crate::routes::programs::parse_id;
use crate::scoping::CourseFilter;
use crate::utils::utc_now;

#[derive(Debug, Deserialize, IntoParams)]
pub struct CourseListParams {
    /// Restrict to courses assigned to this teacher.
    pub user_id: Option<Uuid>,
    /// Restrict to courses of programs offered at this campus.
    pub campus_id: Option<Uuid>,
    /// Academic period label, e.g. `2025-1S`. Malformed values are ignored.
    pub period: Option<String>,
}

#[utoipa::path(
    get,
    path = "/courses",
    tag = "Courses",
    params(CourseListParams),
    responses((status = 200, description = "Courses matching the filters", body = [Course]))
)]
pub async fn list_courses(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<CourseListParams>,
) -> AppResult<Json<Vec<Course>>> {
    let filter = CourseFilter {
        user_id: params.user_id,
        campus_id: params.campus_id,
        period: params.period,
    };

    let mut builder = filter.query();
    let rows = builder.build().fetch_all(&state.pool).await?;

    let courses = rows
        .iter()
        .map(|row| {
            Ok(Course {
                id: parse_id(row.get("id"))?,
                curricular_unit_id: parse_id(row.get("curricular_unit_id"))?,
                name: row.get("name"),
                start_date: row.get("start_date"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(courses))
}

#[utoipa::path(
    get,
    path = "/courses/{id}",
    tag = "Courses",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course detail", body = Course),
        (status = 403, description = "Caller may not access this course"),
        (status = 404, description = "Course does not exist")
    )
)]
pub async fn get_course(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Course>> {
    let principal = Principal::load(&state.pool, auth.user_id).await?;
    state.evaluator.validate_course_access(&principal, id).await?;

    let course = fetch_course(&state, id).await?;
    Ok(Json(course))
}

#[utoipa::path(
    put,
    path = "/courses/{id}",
    tag = "Courses",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = CourseUpdateRequest,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 403, description = "Caller may not update this course")
    )
)]
pub async fn update_course(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CourseUpdateRequest>,
) -> AppResult<Json<Course>> {
    let principal = Principal::load(&state.pool, auth.user_id).await?;
    state.evaluator.validate_course_update_access(&principal, id).await?;

    let mut course = fetch_course(&state, id).await?;
    if let Some(name) = payload.name {
        course.name = name;
    }
    if let Some(start_date) = payload.start_date {
        course.start_date = start_date;
    }

    let now = utc_now();
    sqlx::query("UPDATE courses SET name = ?, start_date = ?, updated_at = ? WHERE id = ?")
        .bind(&course.name)
        .bind(course.start_date)
        .bind(now)
        .bind(id.to_string())
        .execute(&state.pool)
        .await?;
    course.updated_at = now;

    audit::record_or_log(
        &state.pool,
        ModificationKind::Update,
        auth.user_id,
        id,
        "course metadata updated",
    )
    .await;

    Ok(Json(course))
}

#[utoipa::path(
    delete,
    path = "/courses/{id}",
    tag = "Courses",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 403, description = "Only analysts and coordinators may delete courses")
    )
)]
pub async fn delete_course(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let principal = Principal::load(&state.pool, auth.user_id).await?;
    state.evaluator.validate_course_delete_access(&principal, id).await?;

    // Modification rows cascade with the course, so a delete leaves no audit
    // entry of its own; the tracing layer records the request.
    let affected = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id.to_string())
        .execute(&state.pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("course not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_course(state: &AppState, id: Uuid) -> AppResult<Course> {
    let row = sqlx::query(
        "SELECT id, curricular_unit_id, name, start_date, created_at, updated_at \
         FROM courses WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("course not found"))?;

    Ok(Course {
        id,
        curricular_unit_id: parse_id(row.get("curricular_unit_id"))?,
        name: row.get("name"),
        start_date: row.get("start_date"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
