use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{AccessEvaluator, SqlCatalog};
use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::limiter::LoginAttemptService;
use crate::routes::{auth, courses, health, plannings, programs};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub limiter: Arc<LoginAttemptService>,
    pub evaluator: Arc<AccessEvaluator<SqlCatalog>>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig) -> Self {
        let evaluator = AccessEvaluator::new(SqlCatalog::new(pool.clone()));
        Self {
            pool,
            jwt: Arc::new(jwt),
            limiter: Arc::new(LoginAttemptService::default()),
            evaluator: Arc::new(evaluator),
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let state = AppState::new(pool, jwt_config);

    spawn_limiter_sweep(state.limiter.clone());

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout));

    let catalog_routes = Router::new()
        .route("/programs", get(programs::list_programs))
        .route("/programs/:id", get(programs::get_program))
        .route("/terms/:id", get(programs::get_term))
        .route("/units/:id", get(programs::get_curricular_unit))
        .route("/campuses/:id", get(programs::get_campus))
        .route("/rtis/:id", get(programs::get_rti));

    let course_routes = Router::new()
        .route("/", get(courses::list_courses))
        .route("/:id", get(courses::get_course))
        .route("/:id", put(courses::update_course))
        .route("/:id", delete(courses::delete_course));

    // The planning hierarchy is nested under its owning course; mutations run
    // behind the stricter planning-management check.
    let planning_routes = Router::new()
        .route("/", get(plannings::list_plannings))
        .route("/", post(plannings::create_planning))
        .route("/:id", get(plannings::get_planning))
        .route("/:id", put(plannings::update_planning))
        .route("/:id", delete(plannings::delete_planning))
        .route("/:id/contents", get(plannings::list_contents))
        .route("/:id/contents", post(plannings::create_content))
        .route("/contents/:id/activities", get(plannings::list_activities))
        .route("/contents/:id/activities", post(plannings::create_activity));

    let office_hour_routes = Router::new()
        .route("/", get(plannings::list_office_hours))
        .route("/", post(plannings::create_office_hours))
        .route("/:id", delete(plannings::delete_office_hours));

    let router = Router::new()
        .route("/health", get(health::health))
        .nest("/auth", auth_routes)
        .merge(catalog_routes)
        .nest("/courses", course_routes)
        .nest("/courses/:course_id/plannings", planning_routes)
        .nest("/courses/:course_id/office-hours", office_hour_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}

/// Hourly maintenance keeping the limiter maps bounded: one-off failures that
/// never reach the lockout threshold are removed once their window elapses.
fn spawn_limiter_sweep(limiter: Arc<LoginAttemptService>) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(3600));
        tick.tick().await; // the first tick completes immediately
        loop {
            tick.tick().await;
            limiter.sweep_expired();
            tracing::debug!("login attempt records swept");
        }
    });
}
