// SPDX-License-Identifier: MIT OR Apache-2.0
//! Integration tests for the progression REST API.

use std::sync::Arc;

use aura_progression::{Clock, ManualClock, MemoryStore, ProgressionConfig, ProgressionEngine};
use aura_server::{AuditEvent, AuditLogger, AuraServer, ServerConfig};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Build a router over a fresh in-memory engine.
fn create_app(progression: ProgressionConfig, config: ServerConfig) -> (Router, Arc<AuditLogger>) {
    let engine = ProgressionEngine::new(Arc::new(MemoryStore::new()), progression).unwrap();
    let server = AuraServer::new(Arc::new(engine), config);
    let logger = Arc::clone(server.audit_logger().unwrap());
    (server.router(), logger)
}

fn quiet_app() -> (Router, Arc<AuditLogger>) {
    create_app(
        ProgressionConfig::default().with_achievements(Vec::new()),
        ServerConfig::default(),
    )
}

/// Helper to get response body as JSON (Null for non-JSON bodies).
async fn body_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response.into_body()).await)
}

async fn create_user(app: &Router, user: &str) {
    let (status, _) = send(app, Method::POST, &format!("/api/v1/users/{user}"), None).await;
    assert_eq!(status, StatusCode::CREATED);
}

// ========== Progression ==========

#[tokio::test]
async fn test_health() {
    let (app, _) = quiet_app();
    let (status, body) = send(&app, Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["level_ceiling"], 100);
    assert_eq!(body["achievements"], 0);
}

#[tokio::test]
async fn test_create_user_twice_conflicts() {
    let (app, _) = quiet_app();
    create_user(&app, "alice").await;

    let (status, body) = send(&app, Method::POST, "/api/v1/users/alice", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "conflict");
    assert_eq!(body["code"], 409);
}

#[tokio::test]
async fn test_unknown_user_not_found() {
    let (app, _) = quiet_app();
    let (status, body) = send(&app, Method::GET, "/api/v1/users/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "not_found");
}

#[tokio::test]
async fn test_grant_xp_levels_up() {
    let (app, logger) = quiet_app();
    create_user(&app, "alice").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/users/alice/xp",
        Some(json!({"amount": 150, "reason": "scan_completed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], 150);
    assert_eq!(body["previous_level"], 1);
    assert_eq!(body["level"], 2);
    assert_eq!(body["leveled_up"], true);

    let (status, snapshot) = send(&app, Method::GET, "/api/v1/users/alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["progression"]["total_xp"], 150);
    assert_eq!(snapshot["progress"]["xp_into_level"], 50);
    assert_eq!(snapshot["title"], "Initiate");

    let events: Vec<_> = logger.by_user("alice").into_iter().map(|e| e.event).collect();
    assert!(events.contains(&AuditEvent::LevelUp {
        user_id: "alice".to_string(),
        from: 1,
        to: 2,
    }));
}

#[tokio::test]
async fn test_invalid_grants_rejected() {
    let (app, _) = quiet_app();
    create_user(&app, "alice").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/users/alice/xp",
        Some(json!({"amount": 0, "reason": "scan_completed"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/users/alice/xp",
        Some(json!({"amount": -5, "reason": "post_created"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, history) = send(&app, Method::GET, "/api/v1/users/alice/xp", None).await;
    assert_eq!(history["events"].as_array().unwrap().len(), 0);
    assert_eq!(history["ledger_total"], 0);
}

#[tokio::test]
async fn test_xp_history_and_reconcile() {
    let (app, _) = quiet_app();
    create_user(&app, "alice").await;
    for amount in [40, 60] {
        send(
            &app,
            Method::POST,
            "/api/v1/users/alice/xp",
            Some(json!({"amount": amount, "reason": "guild_joined"})),
        )
        .await;
    }

    let (status, history) = send(&app, Method::GET, "/api/v1/users/alice/xp", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["ledger_total"], 100);
    assert_eq!(history["events"][0]["reason"], "guild_joined");

    let (status, report) = send(&app, Method::POST, "/api/v1/users/alice/reconcile", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["corrected"], false);
    assert_eq!(report["ledger_total"], 100);
    assert_eq!(report["level"], 2);
}

#[tokio::test]
async fn test_karma_adjustment() {
    let (app, _) = quiet_app();
    create_user(&app, "alice").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/users/alice/karma",
        Some(json!({"delta": -3})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["karma"], -3);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/users/alice/karma",
        Some(json!({"delta": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_daily_activity_starts_streak() {
    let (app, _) = quiet_app();
    create_user(&app, "alice").await;

    let (status, body) = send(&app, Method::POST, "/api/v1/users/alice/activity", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["streak"]["streak_days"], 1);
    assert_eq!(body["xp_awarded"], 10);

    // Same day: counted once.
    let (_, body) = send(&app, Method::POST, "/api/v1/users/alice/activity", None).await;
    assert_eq!(body["streak"]["streak_days"], 1);
    assert_eq!(body["xp_awarded"], 0);
}

#[tokio::test]
async fn test_level_lookup() {
    let (app, _) = quiet_app();

    let (status, body) = send(&app, Method::GET, "/api/v1/levels/215", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["level"], 3);
    assert_eq!(body["cumulative_xp_for_level"], 215);
    assert_eq!(body["xp_required_for_next_level"], 132);
    assert_eq!(body["title"], "Initiate");

    let (status, _) = send(&app, Method::GET, "/api/v1/levels/lots", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ========== Quests ==========

#[tokio::test]
async fn test_quest_claim_flow() {
    let (app, logger) = quiet_app();
    create_user(&app, "alice").await;

    let (status, quest) = send(
        &app,
        Method::POST,
        "/api/v1/users/alice/quests",
        Some(json!({
            "cadence": "daily",
            "category": "analysis",
            "difficulty": "easy",
            "target": 2
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(quest["status"], "active");
    let id = quest["id"].as_str().unwrap().to_string();
    let base = format!("/api/v1/users/alice/quests/{id}");

    let (status, body) = send(&app, Method::POST, &format!("{base}/claim"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "bad_request");

    let (status, progress) = send(
        &app,
        Method::POST,
        &format!("{base}/progress"),
        Some(json!({"delta": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress["newly_completed"], true);

    let (status, claim) = send(&app, Method::POST, &format!("{base}/claim"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(claim["xp_awarded"], 25);
    assert_eq!(claim["karma"], 1);
    assert_eq!(claim["quest"]["status"], "claimed");

    let (status, _) = send(&app, Method::POST, &format!("{base}/claim"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, list) = send(&app, Method::GET, "/api/v1/users/alice/quests", None).await;
    assert_eq!(list["quests"].as_array().unwrap().len(), 1);

    let claimed = logger
        .by_user("alice")
        .into_iter()
        .filter(|e| matches!(e.event, AuditEvent::QuestClaimed { .. }))
        .count();
    assert_eq!(claimed, 1);
}

#[tokio::test]
async fn test_quest_deadline_defaults_from_engine_clock() {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let engine = ProgressionEngine::with_clock(
        Arc::new(MemoryStore::new()),
        ProgressionConfig::default().with_achievements(Vec::new()),
        Arc::clone(&clock) as Arc<dyn Clock>,
    )
    .unwrap();
    let app = AuraServer::new(Arc::new(engine), ServerConfig::default()).router();
    create_user(&app, "alice").await;

    let (status, quest) = send(
        &app,
        Method::POST,
        "/api/v1/users/alice/quests",
        Some(json!({
            "cadence": "weekly",
            "category": "social",
            "difficulty": "medium",
            "target": 3
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let ends_at: DateTime<Utc> = serde_json::from_value(quest["ends_at"].clone()).unwrap();
    assert_eq!(ends_at, start + Duration::weeks(1));
}

#[tokio::test]
async fn test_quest_ids_are_validated() {
    let (app, _) = quiet_app();
    create_user(&app, "alice").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/users/alice/quests/not-a-uuid/claim",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("invalid quest id"));

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/users/alice/quests/6f1c1a52-8b36-4e44-9d0c-8c1f7a0a5b11/claim",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_quest_with_zero_target_rejected() {
    let (app, _) = quiet_app();
    create_user(&app, "alice").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/users/alice/quests",
        Some(json!({
            "cadence": "weekly",
            "category": "guild",
            "difficulty": "hard",
            "target": 0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ========== Achievements ==========

#[tokio::test]
async fn test_catalogue_masks_secrets() {
    let (app, _) = create_app(ProgressionConfig::default(), ServerConfig::default());

    let (status, body) = send(&app, Method::GET, "/api/v1/achievements", None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["achievements"].as_array().unwrap();
    assert_eq!(entries.len(), 17);

    let secret = entries
        .iter()
        .find(|e| e["id"] == "century_streak")
        .unwrap();
    assert_eq!(secret["name"], "???");
}

#[tokio::test]
async fn test_manual_unlock() {
    let (app, logger) = create_app(ProgressionConfig::default(), ServerConfig::default());
    create_user(&app, "alice").await;

    let uri = "/api/v1/users/alice/achievements/early_adopter/unlock";
    let (status, body) = send(&app, Method::POST, uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unlocked"][0]["achievement_id"], "early_adopter");

    let (status, _) = send(&app, Method::POST, uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, list) = send(&app, Method::GET, "/api/v1/users/alice/achievements", None).await;
    assert!(list["unlocked"].as_u64().unwrap() >= 1);

    assert!(logger.by_user("alice").iter().any(|e| e.event
        == AuditEvent::AchievementUnlocked {
            user_id: "alice".to_string(),
            achievement_id: "early_adopter".to_string(),
        }));
}

#[tokio::test]
async fn test_evaluate_achievement() {
    let (app, _) = create_app(ProgressionConfig::default(), ServerConfig::default());
    create_user(&app, "alice").await;

    let uri = "/api/v1/users/alice/achievements/scan_apprentice/evaluate";
    let (status, body) = send(&app, Method::POST, uri, Some(json!({"progress": 3}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unlocked"].as_array().unwrap().len(), 0);

    let (_, body) = send(&app, Method::POST, uri, Some(json!({"progress": 10}))).await;
    assert_eq!(body["unlocked"][0]["achievement_id"], "scan_apprentice");

    // Re-evaluation is idempotent.
    let (status, body) = send(&app, Method::POST, uri, Some(json!({"progress": 50}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unlocked"].as_array().unwrap().len(), 0);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/users/alice/achievements/no_such_badge/evaluate",
        Some(json!({"progress": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ========== Limits ==========

#[tokio::test]
async fn test_body_limit() {
    let (app, _) = create_app(
        ProgressionConfig::default().with_achievements(Vec::new()),
        ServerConfig::default().with_max_body_size(16),
    );
    create_user(&app, "alice").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/users/alice/xp",
        Some(json!({"amount": 10, "reason": "scan_completed", "padding": "x".repeat(64)})),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
