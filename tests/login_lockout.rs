mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{register_user, send_json, spawn_app};

#[tokio::test]
async fn five_failures_lock_the_account() -> Result<()> {
    let test = spawn_app().await?;
    let _ = register_user(&test.app, "Locked Out", "locked@example.edu").await?;

    let bad_login = json!({ "email": "locked@example.edu", "password": "wrong-password" });
    for attempt in 1..=5 {
        let (status, _) = send_json(&test.app, "POST", "/auth/login", None, Some(bad_login.clone())).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "attempt {attempt} should be 401");
    }

    // Sixth attempt is rejected before credential verification, even with the
    // correct password, and the payload carries the remaining wait.
    let good_login = json!({ "email": "locked@example.edu", "password": "password123" });
    let (status, body) = send_json(&test.app, "POST", "/auth/login", None, Some(good_login.clone())).await?;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body.get("error").and_then(|v| v.as_str()), Some("locked"));
    let minutes = body
        .get("retry_after_minutes")
        .and_then(|v| v.as_i64())
        .expect("locked response should carry retry_after_minutes");
    assert!((1..=15).contains(&minutes), "unexpected countdown: {minutes}");

    Ok(())
}

#[tokio::test]
async fn lockout_keys_are_independent_per_account() -> Result<()> {
    let test = spawn_app().await?;
    let _ = register_user(&test.app, "Victim", "victim@example.edu").await?;
    let _ = register_user(&test.app, "Bystander", "bystander@example.edu").await?;

    let bad_login = json!({ "email": "victim@example.edu", "password": "wrong-password" });
    for _ in 0..5 {
        let (status, _) = send_json(&test.app, "POST", "/auth/login", None, Some(bad_login.clone())).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, _) = send_json(&test.app, "POST", "/auth/login", None, Some(bad_login.clone())).await?;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // A different account is untouched by the victim's lockout.
    let bystander = json!({ "email": "bystander@example.edu", "password": "password123" });
    let (status, body) = send_json(&test.app, "POST", "/auth/login", None, Some(bystander)).await?;
    assert_eq!(status, StatusCode::OK, "bystander login failed: {body}");

    Ok(())
}

#[tokio::test]
async fn success_clears_accumulated_failures() -> Result<()> {
    let test = spawn_app().await?;
    let _ = register_user(&test.app, "Fumbler", "fumbler@example.edu").await?;

    let bad_login = json!({ "email": "fumbler@example.edu", "password": "wrong-password" });
    for _ in 0..4 {
        let (status, _) = send_json(&test.app, "POST", "/auth/login", None, Some(bad_login.clone())).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // A success below the threshold resets the counter entirely.
    let good_login = json!({ "email": "fumbler@example.edu", "password": "password123" });
    let (status, body) = send_json(&test.app, "POST", "/auth/login", None, Some(good_login)).await?;
    assert_eq!(status, StatusCode::OK, "login after reset failed: {body}");
    assert!(body
        .get("user")
        .and_then(|u| u.get("last_login_at"))
        .map(|v| !v.is_null())
        .unwrap_or(false));

    // The window restarts from zero: four more failures still do not lock.
    for _ in 0..4 {
        let (status, _) = send_json(&test.app, "POST", "/auth/login", None, Some(bad_login.clone())).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    Ok(())
}

#[tokio::test]
async fn unknown_accounts_accumulate_failures_too() -> Result<()> {
    let test = spawn_app().await?;

    // No such user exists; the limiter still counts per attempted account so
    // probing cannot distinguish unknown accounts from locked ones forever.
    let ghost = json!({ "email": "ghost@example.edu", "password": "whatever123" });
    for _ in 0..5 {
        let (status, _) = send_json(&test.app, "POST", "/auth/login", None, Some(ghost.clone())).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, _) = send_json(&test.app, "POST", "/auth/login", None, Some(ghost)).await?;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    Ok(())
}
