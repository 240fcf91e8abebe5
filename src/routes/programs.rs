use axum::extract::{Path, State};
use axum::Json;
use sqlx::Row;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Principal;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::academic::{Campus, CurricularUnit, Program, Rti, Term};

#[utoipa::path(
    get,
    path = "/programs",
    tag = "Catalog",
    responses((status = 200, description = "Programs offered at the caller's campuses", body = [Program]))
)]
pub async fn list_programs(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<Program>>> {
    let principal = Principal::load(&state.pool, auth.user_id).await?;
    let campus_ids: Vec<String> = principal.campus_ids().iter().map(|id| id.to_string()).collect();
    let rti_ids: Vec<String> = principal.rti_ids().iter().map(|id| id.to_string()).collect();

    // Both unions are derived from the same campus grants, so they are empty together.
    if campus_ids.is_empty() {
        return Ok(Json(Vec::new()));
    }

    // Visible iff the program is offered at one of the caller's campuses, or
    // at any campus of an RTI the caller holds.
    let campus_marks = vec!["?"; campus_ids.len()].join(", ");
    let rti_marks = vec!["?"; rti_ids.len()].join(", ");
    let sql = format!(
        "SELECT DISTINCT p.id, p.name, p.created_at, p.updated_at FROM programs p \
         JOIN program_campuses pc ON pc.program_id = p.id \
         JOIN campuses c ON c.id = pc.campus_id \
         WHERE c.id IN ({campus_marks}) OR c.rti_id IN ({rti_marks}) \
         ORDER BY p.name"
    );

    let mut query = sqlx::query(&sql);
    for id in campus_ids.iter().chain(rti_ids.iter()) {
        query = query.bind(id.clone());
    }

    let rows = query.fetch_all(&state.pool).await?;
    let programs = rows
        .iter()
        .map(|row| {
            Ok(Program {
                id: parse_id(row.get("id"))?,
                name: row.get("name"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(programs))
}

#[utoipa::path(
    get,
    path = "/programs/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "Program id")),
    responses(
        (status = 200, description = "Program detail", body = Program),
        (status = 403, description = "No campus access to this program"),
        (status = 404, description = "Program does not exist")
    )
)]
pub async fn get_program(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Program>> {
    let principal = Principal::load(&state.pool, auth.user_id).await?;
    state.evaluator.validate_program_access(&principal, id).await?;

    let row = sqlx::query("SELECT id, name, created_at, updated_at FROM programs WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::not_found("program not found"))?;

    Ok(Json(Program {
        id,
        name: row.get("name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }))
}

#[utoipa::path(
    get,
    path = "/terms/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "Term id")),
    responses((status = 200, description = "Term detail", body = Term))
)]
pub async fn get_term(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Term>> {
    let principal = Principal::load(&state.pool, auth.user_id).await?;
    state.evaluator.validate_term_access(&principal, id).await?;

    let row = sqlx::query("SELECT id, program_id, name, number FROM terms WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::not_found("term not found"))?;

    Ok(Json(Term {
        id,
        program_id: parse_id(row.get("program_id"))?,
        name: row.get("name"),
        number: row.get("number"),
    }))
}

#[utoipa::path(
    get,
    path = "/units/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "Curricular unit id")),
    responses((status = 200, description = "Curricular unit detail", body = CurricularUnit))
)]
pub async fn get_curricular_unit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CurricularUnit>> {
    let principal = Principal::load(&state.pool, auth.user_id).await?;
    state.evaluator.validate_curricular_unit_access(&principal, id).await?;

    let row = sqlx::query("SELECT id, term_id, name, workload_hours FROM curricular_units WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::not_found("curricular unit not found"))?;

    Ok(Json(CurricularUnit {
        id,
        term_id: parse_id(row.get("term_id"))?,
        name: row.get("name"),
        workload_hours: row.get("workload_hours"),
    }))
}

#[utoipa::path(
    get,
    path = "/campuses/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "Campus id")),
    responses((status = 200, description = "Campus detail", body = Campus))
)]
pub async fn get_campus(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Campus>> {
    let principal = Principal::load(&state.pool, auth.user_id).await?;
    state.evaluator.validate_campus_access(&principal, id).await?;

    let row = sqlx::query("SELECT id, rti_id, name FROM campuses WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::not_found("campus not found"))?;

    Ok(Json(Campus {
        id,
        rti_id: parse_id(row.get("rti_id"))?,
        name: row.get("name"),
    }))
}

#[utoipa::path(
    get,
    path = "/rtis/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "RTI id")),
    responses((status = 200, description = "RTI detail", body = Rti))
)]
pub async fn get_rti(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Rti>> {
    let principal = Principal::load(&state.pool, auth.user_id).await?;
    state.evaluator.validate_rti_access(&principal, id).await?;

    let row = sqlx::query("SELECT id, name FROM rtis WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::not_found("rti not found"))?;

    Ok(Json(Rti {
        id,
        name: row.get("name"),
    }))
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::internal(format!("malformed id: {raw}")))
}
