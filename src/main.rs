mod app;
mod audit;
mod authz;
mod db;
mod errors;
mod jwt;
mod limiter;
mod models;
mod routes;
mod scoping;
mod utils;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health,
        routes::auth::register,
        routes::auth::login,
        routes::auth::me,
        routes::auth::logout,
        routes::programs::list_programs,
        routes::programs::get_program,
        routes::programs::get_term,
        routes::programs::get_curricular_unit,
        routes::programs::get_campus,
        routes::programs::get_rti,
        routes::courses::list_courses,
        routes::courses::get_course,
        routes::courses::update_course,
        routes::courses::delete_course,
        routes::plannings::list_plannings,
        routes::plannings::create_planning,
        routes::plannings::get_planning,
        routes::plannings::update_planning,
        routes::plannings::delete_planning,
        routes::plannings::list_contents,
        routes::plannings::create_content,
        routes::plannings::list_activities,
        routes::plannings::create_activity,
        routes::plannings::list_office_hours,
        routes::plannings::create_office_hours,
        routes::plannings::delete_office_hours,
    ),
    components(
        schemas(
            models::identity::Identity,
            models::identity::AuthResponse,
            models::identity::LoginRequest,
            models::identity::RegisterRequest,
            models::position::Role,
            models::position::Position,
            models::academic::Rti,
            models::academic::Campus,
            models::academic::Program,
            models::academic::Term,
            models::academic::CurricularUnit,
            models::course::Course,
            models::course::CourseUpdateRequest,
            models::planning::WeeklyPlanning,
            models::planning::WeeklyPlanningCreateRequest,
            models::planning::WeeklyPlanningUpdateRequest,
            models::planning::ProgrammaticContent,
            models::planning::ProgrammaticContentCreateRequest,
            models::planning::Activity,
            models::planning::ActivityCreateRequest,
            models::planning::OfficeHours,
            models::planning::OfficeHoursCreateRequest,
            models::modification::Modification,
            models::modification::ModificationKind
        )
    ),
    tags(
        (name = "Auth", description = "Authentication with login attempt limiting"),
        (name = "Catalog", description = "Programs, terms, units, campuses, RTIs"),
        (name = "Courses", description = "Course metadata and scoped listing"),
        (name = "Planning", description = "Weekly planning hierarchy"),
        (name = "Health", description = "Liveness")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let pool = db::init().await?;
    let app = app::create_app(pool).await?;

    let app = app.merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let port = std::env::var("APP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8000);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
