//! Integration tests for the HTTP API.
//!
//! Drive the router end to end against in-memory storage.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sports_tournament::db::{InMemoryRepository, TournamentRepository};
use sports_tournament::tournament::PhaseKind;
use sports_tournament::PhaseOrchestrator;
use st_server::api::{AppState, create_router};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

const TOURNAMENT: i64 = 1;

/// Helper to create a test server with one phase and registered teams
async fn create_test_server(kind: PhaseKind, teams: &[i64]) -> (axum::Router, i64) {
    let repo = Arc::new(InMemoryRepository::new());
    let phase = repo
        .create_phase(TOURNAMENT, "Test phase", kind)
        .await
        .unwrap();
    for &team_id in teams {
        repo.register_team(TOURNAMENT, None, team_id).await.unwrap();
        repo.register_team(TOURNAMENT, Some(phase.id), team_id)
            .await
            .unwrap();
    }

    let state = AppState {
        orchestrator: Arc::new(PhaseOrchestrator::with_defaults(repo)),
    };
    (create_router(state), phase.id)
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
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
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn match_ids(matchday: &Value) -> Vec<i64> {
    matchday["matches"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_i64().unwrap())
        .collect()
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let (app, _) = create_test_server(PhaseKind::League, &[]).await;

    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], true);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let (app, _) = create_test_server(PhaseKind::League, &[]).await;

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

// ============================================================================
// League Tests
// ============================================================================

#[tokio::test]
async fn test_generate_fixture_and_read_matchdays() {
    let (app, phase_id) = create_test_server(PhaseKind::League, &[1, 2, 3, 4]).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/phases/{phase_id}/fixture"),
        Some(json!({"isLocalAway": true, "startDate": "2025-03-05", "weekDay": 0})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let matchdays = body.as_array().unwrap();
    assert_eq!(matchdays.len(), 6);
    // First Sunday on or after Wednesday 2025-03-05
    assert_eq!(matchdays[0]["matchday"]["date"], "2025-03-09");
    assert_eq!(matchdays[1]["matchday"]["date"], "2025-03-16");

    let (status, listed) = send(
        &app,
        "GET",
        &format!("/api/v1/phases/{phase_id}/matchdays"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, body);
}

#[tokio::test]
async fn test_invalid_weekday_rejected() {
    let (app, phase_id) = create_test_server(PhaseKind::League, &[1, 2]).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/phases/{phase_id}/fixture"),
        Some(json!({"weekDay": 7})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("weekDay"));
}

#[tokio::test]
async fn test_submit_result_updates_tables() {
    let (app, phase_id) = create_test_server(PhaseKind::League, &[1, 2, 3, 4]).await;
    let (_, matchdays) = send(
        &app,
        "POST",
        &format!("/api/v1/phases/{phase_id}/fixture"),
        Some(json!({})),
    )
    .await;
    let match_id = match_ids(&matchdays[0])[0];

    let (status, outcome) = send(
        &app,
        "PUT",
        &format!("/api/v1/matches/{match_id}/result"),
        Some(json!({
            "homeScore": 2,
            "awayScore": 0,
            "events": [{"kind": "red_card", "minute": 77, "side": "team_a"}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["recorded"]["result"], "team_a");
    assert_eq!(outcome["round_complete"], false);
    let winner = outcome["recorded"]["team_a"].as_i64().unwrap();

    let (status, table) = send(
        &app,
        "GET",
        &format!("/api/v1/phases/{phase_id}/standings"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(table[0]["team_id"].as_i64().unwrap(), winner);
    assert_eq!(table[0]["stats"]["points"], 3);
    assert_eq!(table[0]["stats"]["fair_play_score"], -3);
    assert_eq!(table[0]["rank"], 1);

    let (status, table) = send(
        &app,
        "GET",
        &format!("/api/v1/tournaments/{TOURNAMENT}/standings"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(table[0]["team_id"].as_i64().unwrap(), winner);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{TOURNAMENT}/reset"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, table) = send(
        &app,
        "GET",
        &format!("/api/v1/phases/{phase_id}/standings"),
        None,
    )
    .await;
    assert!(table.as_array().unwrap().iter().all(|r| r["stats"]["points"] == 0));
}

#[tokio::test]
async fn test_advance_on_league_conflicts() {
    let (app, phase_id) = create_test_server(PhaseKind::League, &[1, 2]).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/phases/{phase_id}/advance"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

// ============================================================================
// Knockout Tests
// ============================================================================

#[tokio::test]
async fn test_knockout_flow_over_http() {
    let (app, phase_id) = create_test_server(PhaseKind::Knockout, &[1, 2, 3, 4, 5, 6]).await;

    let (status, round) = send(
        &app,
        "POST",
        &format!("/api/v1/phases/{phase_id}/bracket"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(round["matches"].as_array().unwrap().len(), 4);

    let (_, state) = send(
        &app,
        "GET",
        &format!("/api/v1/phases/{phase_id}/bracket"),
        None,
    )
    .await;
    assert_eq!(state["state"], "seeded");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/phases/{phase_id}/advance"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let mut current = round;
    loop {
        for m in current["matches"].as_array().unwrap() {
            if m["completed"] == true {
                continue;
            }
            let (status, _) = send(
                &app,
                "PUT",
                &format!("/api/v1/matches/{}/result", m["id"]),
                Some(json!({"homeScore": 1, "awayScore": 0})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, advanced) = send(
            &app,
            "POST",
            &format!("/api/v1/phases/{phase_id}/advance"),
            None,
        )
        .await;
        if status == StatusCode::CONFLICT {
            // The final's result already recorded the champion
            break;
        }
        assert_eq!(status, StatusCode::OK);
        assert_eq!(advanced["outcome"], "next_round");
        current = advanced["data"].clone();
    }

    let (_, state) = send(
        &app,
        "GET",
        &format!("/api/v1/phases/{phase_id}/bracket"),
        None,
    )
    .await;
    assert_eq!(state["state"], "completed");
    assert_eq!(state["champion"], 1);

    let (_, matchdays) = send(
        &app,
        "GET",
        &format!("/api/v1/phases/{phase_id}/matchdays"),
        None,
    )
    .await;
    assert_eq!(matchdays.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_knockout_draw_is_unprocessable() {
    let (app, phase_id) = create_test_server(PhaseKind::Knockout, &[1, 2]).await;
    let (_, round) = send(
        &app,
        "POST",
        &format!("/api/v1/phases/{phase_id}/bracket"),
        Some(json!({"startDate": "2025-06-01"})),
    )
    .await;
    assert_eq!(round["matchday"]["date"], "2025-06-01");
    let match_id = match_ids(&round)[0];

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/v1/matches/{match_id}/result"),
        Some(json!({"homeScore": 2, "awayScore": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, outcome) = send(
        &app,
        "PUT",
        &format!("/api/v1/matches/{match_id}/result"),
        Some(json!({"homeScore": 2, "awayScore": 2, "outcome": "team_b"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["champion"], 2);
}

// ============================================================================
// Not Found Tests
// ============================================================================

#[tokio::test]
async fn test_unknown_entities_not_found() {
    let (app, _) = create_test_server(PhaseKind::League, &[]).await;

    let (status, body) = send(&app, "GET", "/api/v1/phases/999/matchdays", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("999"));

    let (status, _) = send(
        &app,
        "PUT",
        "/api/v1/matches/999/result",
        Some(json!({"homeScore": 1, "awayScore": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Result Validation and Table Repair Tests
// ============================================================================

#[tokio::test]
async fn test_invalid_scores_are_unprocessable() {
    let (app, phase_id) = create_test_server(PhaseKind::League, &[1, 2]).await;
    let (_, matchdays) = send(
        &app,
        "POST",
        &format!("/api/v1/phases/{phase_id}/fixture"),
        Some(json!({})),
    )
    .await;
    let match_id = match_ids(&matchdays[0])[0];
    let uri = format!("/api/v1/matches/{match_id}/result");

    let (status, _) = send(
        &app,
        "PUT",
        &uri,
        Some(json!({"homeScore": 3_000_000_000u32, "awayScore": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app,
        "PUT",
        &uri,
        Some(json!({"homeScore": 1, "awayScore": 1, "outcome": "team_a"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, table) = send(
        &app,
        "GET",
        &format!("/api/v1/phases/{phase_id}/standings"),
        None,
    )
    .await;
    assert!(table.as_array().unwrap().iter().all(|r| r["stats"]["played"] == 0));
}

#[tokio::test]
async fn test_recompute_standings_endpoints() {
    let (app, phase_id) = create_test_server(PhaseKind::League, &[1, 2, 3, 4]).await;
    let (_, matchdays) = send(
        &app,
        "POST",
        &format!("/api/v1/phases/{phase_id}/fixture"),
        Some(json!({})),
    )
    .await;
    let match_id = match_ids(&matchdays[0])[0];
    send(
        &app,
        "PUT",
        &format!("/api/v1/matches/{match_id}/result"),
        Some(json!({"homeScore": 3, "awayScore": 1})),
    )
    .await;

    for scope in [
        format!("phases/{phase_id}"),
        format!("tournaments/{TOURNAMENT}"),
    ] {
        let (_, stored) = send(&app, "GET", &format!("/api/v1/{scope}/standings"), None).await;
        let (status, rebuilt) = send(
            &app,
            "POST",
            &format!("/api/v1/{scope}/standings/recompute"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rebuilt, stored);
        assert_eq!(rebuilt[0]["stats"]["points"], 3);
    }

    let (status, _) = send(&app, "POST", "/api/v1/phases/999/standings/recompute", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
