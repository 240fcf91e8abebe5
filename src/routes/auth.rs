use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::identity::{
    AuthResponse, DbIdentity, Identity, LoginRequest, RegisterRequest, PROVIDER_LOCAL,
};
use crate::utils::{client_ip, hash_password, utc_now, verify_password};

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    message: String,
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Identity registered", body = AuthResponse),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    ensure_email_available(&state.pool, &payload.email).await?;

    let password_hash = hash_password(&payload.password)?;
    let now = utc_now();
    let user_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, provider, provider_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id.to_string())
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(password_hash)
    .bind(PROVIDER_LOCAL)
    .bind(Option::<String>::None)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let db_user = fetch_identity_by_id(&state.pool, user_id).await?;
    let user: Identity = db_user.try_into()?;
    let token = state.jwt.encode(user.id)?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many failed attempts for this address or account")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let ip = client_ip(&headers);
    let ip = ip.as_deref();
    let account = payload.email.as_str();

    // Lockout gate runs before any credential work; the response carries the
    // remaining wait so clients can show a countdown.
    if let Some(minutes) = state.limiter.locked_minutes(ip, account) {
        return Err(AppError::locked(minutes));
    }

    let db_user = sqlx::query_as::<_, DbIdentity>(
        "SELECT id, name, email, password_hash, provider, provider_id, enabled, last_login_at, \
         created_at, updated_at, deleted_at FROM users WHERE email = ? AND deleted_at IS NULL",
    )
    .bind(&payload.email)
    .fetch_optional(&state.pool)
    .await?;

    // An unknown account and a wrong password are recorded and answered
    // identically; each failed attempt counts exactly once per keyspace.
    let Some(db_user) = db_user else {
        state.limiter.record_failure(ip, account);
        return Err(AppError::unauthorized("invalid credentials"));
    };

    let password_ok = match db_user.password_hash.as_deref() {
        Some(hash) => verify_password(&payload.password, hash)?,
        // Directory-backed identities have no local password.
        None => false,
    };

    if !password_ok || !db_user.enabled {
        state.limiter.record_failure(ip, account);
        return Err(AppError::unauthorized("invalid credentials"));
    }

    state.limiter.record_success(ip, account);

    let now = utc_now();
    sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
        .bind(now)
        .bind(&db_user.id)
        .execute(&state.pool)
        .await?;

    let mut user: Identity = db_user.try_into()?;
    user.last_login_at = Some(now);
    let token = state.jwt.encode(user.id)?;

    Ok(Json(AuthResponse { token, user }))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses((status = 200, description = "Current identity", body = Identity))
)]
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Identity>> {
    let db_user = fetch_identity_by_id(&state.pool, auth.user_id).await?;
    let user: Identity = db_user.try_into()?;
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Logout acknowledged"))
)]
pub async fn logout(_auth: AuthUser) -> AppResult<Json<MessageResponse>> {
    Ok(Json(MessageResponse {
        message: "Logged out".to_string(),
    }))
}

async fn ensure_email_available(pool: &SqlitePool, email: &str) -> AppResult<()> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ? AND deleted_at IS NULL")
            .bind(email)
            .fetch_one(pool)
            .await?;

    if count > 0 {
        return Err(AppError::conflict("email already in use"));
    }

    Ok(())
}

async fn fetch_identity_by_id(pool: &SqlitePool, user_id: Uuid) -> AppResult<DbIdentity> {
    sqlx::query_as::<_, DbIdentity>(
        "SELECT id, name, email, password_hash, provider, provider_id, enabled, last_login_at, \
         created_at, updated_at, deleted_at FROM users WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("user not found"))
}
