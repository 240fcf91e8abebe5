use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::Row;
use uuid::Uuid;

use crate::app::AppState;
use crate::audit;
use crate::authz::Principal;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::modification::ModificationKind;
use crate::models::planning::{
    Activity, ActivityCreateRequest, OfficeHours, OfficeHoursCreateRequest, ProgrammaticContent,
    ProgrammaticContentCreateRequest, WeeklyPlanning, WeeklyPlanningCreateRequest,
    WeeklyPlanningUpdateRequest,
};
use crate::routes::programs::parse_id;
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/courses/{course_id}/plannings",
    tag = "Planning",
    params(("course_id" = Uuid, Path, description = "Course id")),
    responses((status = 200, description = "Weekly plannings of the course", body = [WeeklyPlanning]))
)]
pub async fn list_plannings(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<Vec<WeeklyPlanning>>> {
    let principal = Principal::load(&state.pool, auth.user_id).await?;
    state.evaluator.validate_course_access(&principal, course_id).await?;

    let rows = sqlx::query(
        "SELECT id, course_id, week_number, notes, created_at, updated_at \
         FROM weekly_plannings WHERE course_id = ? ORDER BY week_number",
    )
    .bind(course_id.to_string())
    .fetch_all(&state.pool)
    .await?;

    let plannings = rows
        .iter()
        .map(|row| {
            Ok(WeeklyPlanning {
                id: parse_id(row.get("id"))?,
                course_id,
                week_number: row.get("week_number"),
                notes: row.get("notes"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(plannings))
}

#[utoipa::path(
    post,
    path = "/courses/{course_id}/plannings",
    tag = "Planning",
    params(("course_id" = Uuid, Path, description = "Course id")),
    request_body = WeeklyPlanningCreateRequest,
    responses(
        (status = 201, description = "Weekly planning created", body = WeeklyPlanning),
        (status = 403, description = "Planning management requires an assigned teacher")
    )
)]
pub async fn create_planning(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<WeeklyPlanningCreateRequest>,
) -> AppResult<(StatusCode, Json<WeeklyPlanning>)> {
    let principal = Principal::load(&state.pool, auth.user_id).await?;
    state
        .evaluator
        .validate_course_planning_management(&principal, course_id)
        .await?;

    let now = utc_now();
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO weekly_plannings (id, course_id, week_number, notes, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(course_id.to_string())
    .bind(payload.week_number)
    .bind(&payload.notes)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    audit::record_or_log(
        &state.pool,
        ModificationKind::Create,
        auth.user_id,
        course_id,
        "weekly planning created",
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(WeeklyPlanning {
            id,
            course_id,
            week_number: payload.week_number,
            notes: payload.notes,
            created_at: now,
            updated_at: now,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/courses/{course_id}/plannings/{id}",
    tag = "Planning",
    params(
        ("course_id" = Uuid, Path, description = "Course id"),
        ("id" = Uuid, Path, description = "Weekly planning id")
    ),
    responses((status = 200, description = "Weekly planning detail", body = WeeklyPlanning))
)]
pub async fn get_planning(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((course_id, id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<WeeklyPlanning>> {
    let principal = Principal::load(&state.pool, auth.user_id).await?;
    state.evaluator.validate_weekly_planning_access(&principal, id).await?;

    let planning = fetch_planning(&state, course_id, id).await?;
    Ok(Json(planning))
}

#[utoipa::path(
    put,
    path = "/courses/{course_id}/plannings/{id}",
    tag = "Planning",
    params(
        ("course_id" = Uuid, Path, description = "Course id"),
        ("id" = Uuid, Path, description = "Weekly planning id")
    ),
    request_body = WeeklyPlanningUpdateRequest,
    responses((status = 200, description = "Weekly planning updated", body = WeeklyPlanning))
)]
pub async fn update_planning(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((course_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<WeeklyPlanningUpdateRequest>,
) -> AppResult<Json<WeeklyPlanning>> {
    let principal = Principal::load(&state.pool, auth.user_id).await?;
    state
        .evaluator
        .validate_course_planning_management(&principal, course_id)
        .await?;

    let mut planning = fetch_planning(&state, course_id, id).await?;
    if let Some(week_number) = payload.week_number {
        planning.week_number = week_number;
    }
    if payload.notes.is_some() {
        planning.notes = payload.notes;
    }

    let now = utc_now();
    sqlx::query("UPDATE weekly_plannings SET week_number = ?, notes = ?, updated_at = ? WHERE id = ?")
        .bind(planning.week_number)
        .bind(&planning.notes)
        .bind(now)
        .bind(id.to_string())
        .execute(&state.pool)
        .await?;
    planning.updated_at = now;

    audit::record_or_log(
        &state.pool,
        ModificationKind::Update,
        auth.user_id,
        course_id,
        "weekly planning updated",
    )
    .await;

    Ok(Json(planning))
}

#[utoipa::path(
    delete,
    path = "/courses/{course_id}/plannings/{id}",
    tag = "Planning",
    params(
        ("course_id" = Uuid, Path, description = "Course id"),
        ("id" = Uuid, Path, description = "Weekly planning id")
    ),
    responses((status = 204, description = "Weekly planning deleted"))
)]
pub async fn delete_planning(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((course_id, id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let principal = Principal::load(&state.pool, auth.user_id).await?;
    state
        .evaluator
        .validate_course_planning_management(&principal, course_id)
        .await?;

    let affected = sqlx::query("DELETE FROM weekly_plannings WHERE id = ? AND course_id = ?")
        .bind(id.to_string())
        .bind(course_id.to_string())
        .execute(&state.pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("weekly planning not found"));
    }

    audit::record_or_log(
        &state.pool,
        ModificationKind::Delete,
        auth.user_id,
        course_id,
        "weekly planning deleted",
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/courses/{course_id}/plannings/{id}/contents",
    tag = "Planning",
    params(
        ("course_id" = Uuid, Path, description = "Course id"),
        ("id" = Uuid, Path, description = "Weekly planning id")
    ),
    responses((status = 200, description = "Programmatic contents of the planning", body = [ProgrammaticContent]))
)]
pub async fn list_contents(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((course_id, id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Vec<ProgrammaticContent>>> {
    let principal = Principal::load(&state.pool, auth.user_id).await?;
    state.evaluator.validate_weekly_planning_access(&principal, id).await?;
    let _ = fetch_planning(&state, course_id, id).await?;

    let rows = sqlx::query(
        "SELECT id, weekly_planning_id, description, created_at, updated_at \
         FROM programmatic_contents WHERE weekly_planning_id = ? ORDER BY created_at",
    )
    .bind(id.to_string())
    .fetch_all(&state.pool)
    .await?;

    let contents = rows
        .iter()
        .map(|row| {
            Ok(ProgrammaticContent {
                id: parse_id(row.get("id"))?,
                weekly_planning_id: id,
                description: row.get("description"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(contents))
}

#[utoipa::path(
    post,
    path = "/courses/{course_id}/plannings/{id}/contents",
    tag = "Planning",
    params(
        ("course_id" = Uuid, Path, description = "Course id"),
        ("id" = Uuid, Path, description = "Weekly planning id")
    ),
    request_body = ProgrammaticContentCreateRequest,
    responses((status = 201, description = "Programmatic content created", body = ProgrammaticContent))
)]
pub async fn create_content(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((course_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ProgrammaticContentCreateRequest>,
) -> AppResult<(StatusCode, Json<ProgrammaticContent>)> {
    let principal = Principal::load(&state.pool, auth.user_id).await?;
    state
        .evaluator
        .validate_course_planning_management(&principal, course_id)
        .await?;

    // The planning must exist and belong to the course in the path.
    let _ = fetch_planning(&state, course_id, id).await?;

    let now = utc_now();
    let content_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO programmatic_contents (id, weekly_planning_id, description, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(content_id.to_string())
    .bind(id.to_string())
    .bind(&payload.description)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    audit::record_or_log(
        &state.pool,
        ModificationKind::Create,
        auth.user_id,
        course_id,
        "programmatic content created",
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(ProgrammaticContent {
            id: content_id,
            weekly_planning_id: id,
            description: payload.description,
            created_at: now,
            updated_at: now,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/courses/{course_id}/plannings/contents/{id}/activities",
    tag = "Planning",
    params(
        ("course_id" = Uuid, Path, description = "Course id"),
        ("id" = Uuid, Path, description = "Programmatic content id")
    ),
    responses((status = 200, description = "Activities of the content", body = [Activity]))
)]
pub async fn list_activities(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((course_id, id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Vec<Activity>>> {
    let principal = Principal::load(&state.pool, auth.user_id).await?;
    ensure_content_in_course(&state, course_id, id).await?;
    state
        .evaluator
        .validate_programmatic_content_access(&principal, id)
        .await?;

    let rows = sqlx::query(
        "SELECT id, programmatic_content_id, description, kind, created_at, updated_at \
         FROM activities WHERE programmatic_content_id = ? ORDER BY created_at",
    )
    .bind(id.to_string())
    .fetch_all(&state.pool)
    .await?;

    let activities = rows
        .iter()
        .map(|row| {
            Ok(Activity {
                id: parse_id(row.get("id"))?,
                programmatic_content_id: id,
                description: row.get("description"),
                kind: row.get("kind"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(activities))
}

#[utoipa::path(
    post,
    path = "/courses/{course_id}/plannings/contents/{id}/activities",
    tag = "Planning",
    params(
        ("course_id" = Uuid, Path, description = "Course id"),
        ("id" = Uuid, Path, description = "Programmatic content id")
    ),
    request_body = ActivityCreateRequest,
    responses((status = 201, description = "Activity created", body = Activity))
)]
pub async fn create_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((course_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ActivityCreateRequest>,
) -> AppResult<(StatusCode, Json<Activity>)> {
    let principal = Principal::load(&state.pool, auth.user_id).await?;
    // The content must live under the course in the path; otherwise the
    // management check below would run against the wrong course.
    ensure_content_in_course(&state, course_id, id).await?;
    state
        .evaluator
        .validate_course_planning_management(&principal, course_id)
        .await?;

    let now = utc_now();
    let activity_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO activities (id, programmatic_content_id, description, kind, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(activity_id.to_string())
    .bind(id.to_string())
    .bind(&payload.description)
    .bind(&payload.kind)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    audit::record_or_log(
        &state.pool,
        ModificationKind::Create,
        auth.user_id,
        course_id,
        "activity created",
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(Activity {
            id: activity_id,
            programmatic_content_id: id,
            description: payload.description,
            kind: payload.kind,
            created_at: now,
            updated_at: now,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/courses/{course_id}/office-hours",
    tag = "Planning",
    params(("course_id" = Uuid, Path, description = "Course id")),
    responses((status = 200, description = "Office hours of the course", body = [OfficeHours]))
)]
pub async fn list_office_hours(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<Vec<OfficeHours>>> {
    let principal = Principal::load(&state.pool, auth.user_id).await?;
    state.evaluator.validate_course_access(&principal, course_id).await?;

    let rows = sqlx::query(
        "SELECT id, course_id, weekday, start_time, end_time \
         FROM office_hours WHERE course_id = ? ORDER BY weekday, start_time",
    )
    .bind(course_id.to_string())
    .fetch_all(&state.pool)
    .await?;

    let slots = rows
        .iter()
        .map(|row| {
            Ok(OfficeHours {
                id: parse_id(row.get("id"))?,
                course_id,
                weekday: row.get("weekday"),
                start_time: row.get("start_time"),
                end_time: row.get("end_time"),
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(slots))
}

#[utoipa::path(
    post,
    path = "/courses/{course_id}/office-hours",
    tag = "Planning",
    params(("course_id" = Uuid, Path, description = "Course id")),
    request_body = OfficeHoursCreateRequest,
    responses(
        (status = 201, description = "Office hours slot created", body = OfficeHours),
        (status = 403, description = "Planning management requires an assigned teacher")
    )
)]
pub async fn create_office_hours(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<OfficeHoursCreateRequest>,
) -> AppResult<(StatusCode, Json<OfficeHours>)> {
    let principal = Principal::load(&state.pool, auth.user_id).await?;
    state
        .evaluator
        .validate_course_planning_management(&principal, course_id)
        .await?;

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO office_hours (id, course_id, weekday, start_time, end_time) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(course_id.to_string())
    .bind(payload.weekday)
    .bind(&payload.start_time)
    .bind(&payload.end_time)
    .execute(&state.pool)
    .await?;

    audit::record_or_log(
        &state.pool,
        ModificationKind::Create,
        auth.user_id,
        course_id,
        "office hours slot created",
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(OfficeHours {
            id,
            course_id,
            weekday: payload.weekday,
            start_time: payload.start_time,
            end_time: payload.end_time,
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/courses/{course_id}/office-hours/{id}",
    tag = "Planning",
    params(
        ("course_id" = Uuid, Path, description = "Course id"),
        ("id" = Uuid, Path, description = "Office hours slot id")
    ),
    responses((status = 204, description = "Office hours slot deleted"))
)]
pub async fn delete_office_hours(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((course_id, id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let principal = Principal::load(&state.pool, auth.user_id).await?;
    state
        .evaluator
        .validate_course_planning_management(&principal, course_id)
        .await?;

    let affected = sqlx::query("DELETE FROM office_hours WHERE id = ? AND course_id = ?")
        .bind(id.to_string())
        .bind(course_id.to_string())
        .execute(&state.pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("office hours slot not found"));
    }

    audit::record_or_log(
        &state.pool,
        ModificationKind::Delete,
        auth.user_id,
        course_id,
        "office hours slot deleted",
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_planning(state: &AppState, course_id: Uuid, id: Uuid) -> AppResult<WeeklyPlanning> {
    let row = sqlx::query(
        "SELECT id, course_id, week_number, notes, created_at, updated_at \
         FROM weekly_plannings WHERE id = ? AND course_id = ?",
    )
    .bind(id.to_string())
    .bind(course_id.to_string())
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("weekly planning not found"))?;

    Ok(WeeklyPlanning {
        id,
        course_id,
        week_number: row.get("week_number"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

async fn ensure_content_in_course(state: &AppState, course_id: Uuid, id: Uuid) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(1) FROM programmatic_contents pc \
         JOIN weekly_plannings wp ON wp.id = pc.weekly_planning_id \
         WHERE pc.id = ? AND wp.course_id = ?",
    )
    .bind(id.to_string())
    .bind(course_id.to_string())
    .fetch_one(&state.pool)
    .await?;

    if count == 0 {
        return Err(AppError::not_found("programmatic content not found"));
    }

    Ok(())
}
