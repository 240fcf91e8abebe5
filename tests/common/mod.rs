use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

use campusplan::create_app;

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    // tempdir is dropped with the app, removing the sqlite file
    _dir: tempfile::TempDir,
}

pub async fn spawn_app() -> Result<TestApp> {
    let dir = tempfile::tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test.db");
    let opts = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"),
    )
    .await?;
    migrator.run(&pool).await?;

    std::env::set_var("JWT_SECRET", "test-secret");
    let app = create_app(pool.clone()).await?;

    Ok(TestApp {
        app,
        pool,
        _dir: dir,
    })
}

pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body_json: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body_json {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };

    let resp: Response = app.clone().oneshot(builder.body(body)?).await?;
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };

    Ok((status, value))
}

/// Register an identity via the API; returns (user_id, token).
pub async fn register_user(app: &Router, name: &str, email: &str) -> Result<(Uuid, String)> {
    let (status, body) = send_json(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "name": name, "email": email, "password": "password123" })),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::CREATED, "register failed: {status} - {body}");

    let token = body
        .get("token")
        .and_then(|v| v.as_str())
        .context("missing token")?
        .to_string();
    let user_id = body
        .get("user")
        .and_then(|u| u.get("id"))
        .and_then(|v| v.as_str())
        .context("missing user id")?;

    Ok((Uuid::parse_str(user_id)?, token))
}

/// Minimal academic fixture: one RTI, two campuses in it, one program offered
/// at campus A, one term/unit/course chain under it.
pub struct Fixture {
    pub rti: Uuid,
    pub campus_a: Uuid,
    pub campus_b: Uuid,
    pub program: Uuid,
    pub term: Uuid,
    pub unit: Uuid,
    pub course: Uuid,
}

pub async fn seed_academics(pool: &SqlitePool, course_start: DateTime<Utc>) -> Result<Fixture> {
    let fx = Fixture {
        rti: Uuid::new_v4(),
        campus_a: Uuid::new_v4(),
        campus_b: Uuid::new_v4(),
        program: Uuid::new_v4(),
        term: Uuid::new_v4(),
        unit: Uuid::new_v4(),
        course: Uuid::new_v4(),
    };
    let now = Utc::now();

    sqlx::query("INSERT INTO rtis (id, name) VALUES (?, ?)")
        .bind(fx.rti.to_string())
        .bind("North RTI")
        .execute(pool)
        .await?;
    for (campus, name) in [(fx.campus_a, "Campus A"), (fx.campus_b, "Campus B")] {
        sqlx::query("INSERT INTO campuses (id, rti_id, name) VALUES (?, ?, ?)")
            .bind(campus.to_string())
            .bind(fx.rti.to_string())
            .bind(name)
            .execute(pool)
            .await?;
    }
    sqlx::query("INSERT INTO programs (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)")
        .bind(fx.program.to_string())
        .bind("Software Engineering")
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;
    sqlx::query("INSERT INTO program_campuses (program_id, campus_id) VALUES (?, ?)")
        .bind(fx.program.to_string())
        .bind(fx.campus_a.to_string())
        .execute(pool)
        .await?;
    sqlx::query("INSERT INTO terms (id, program_id, name, number) VALUES (?, ?, ?, ?)")
        .bind(fx.term.to_string())
        .bind(fx.program.to_string())
        .bind("Term 1")
        .bind(1_i64)
        .execute(pool)
        .await?;
    sqlx::query("INSERT INTO curricular_units (id, term_id, name, workload_hours) VALUES (?, ?, ?, ?)")
        .bind(fx.unit.to_string())
        .bind(fx.term.to_string())
        .bind("Databases")
        .bind(60_i64)
        .execute(pool)
        .await?;
    sqlx::query(
        "INSERT INTO courses (id, curricular_unit_id, name, start_date, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(fx.course.to_string())
    .bind(fx.unit.to_string())
    .bind("Databases 2025")
    .bind(course_start)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(fx)
}

/// Grant an active position with the given role and campuses directly in the
/// database (positions have no public admin API in this service).
pub async fn grant_position(
    pool: &SqlitePool,
    user_id: Uuid,
    role: &str,
    campuses: &[Uuid],
) -> Result<()> {
    let position_id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO positions (id, user_id, role, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, 1, ?, ?)",
    )
    .bind(position_id.to_string())
    .bind(user_id.to_string())
    .bind(role)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    for campus in campuses {
        sqlx::query("INSERT INTO position_campuses (position_id, campus_id) VALUES (?, ?)")
            .bind(position_id.to_string())
            .bind(campus.to_string())
            .execute(pool)
            .await?;
    }

    Ok(())
}

pub async fn assign_teacher(pool: &SqlitePool, course: Uuid, user_id: Uuid) -> Result<()> {
    sqlx::query("INSERT INTO course_teachers (course_id, user_id) VALUES (?, ?)")
        .bind(course.to_string())
        .bind(user_id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Second course under an existing unit, for cross-course checks.
pub async fn seed_course(
    pool: &SqlitePool,
    unit: Uuid,
    name: &str,
    start: DateTime<Utc>,
) -> Result<Uuid> {
    let course = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO courses (id, curricular_unit_id, name, start_date, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(course.to_string())
    .bind(unit.to_string())
    .bind(name)
    .bind(start)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(course)
}

/// One weekly planning with a single programmatic content under a course.
pub async fn seed_planning_with_content(pool: &SqlitePool, course: Uuid) -> Result<(Uuid, Uuid)> {
    let planning = Uuid::new_v4();
    let content = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO weekly_plannings (id, course_id, week_number, notes, created_at, updated_at) \
         VALUES (?, ?, 1, NULL, ?, ?)",
    )
    .bind(planning.to_string())
    .bind(course.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    sqlx::query(
        "INSERT INTO programmatic_contents (id, weekly_planning_id, description, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(content.to_string())
    .bind(planning.to_string())
    .bind("Seeded content")
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok((planning, content))
}
