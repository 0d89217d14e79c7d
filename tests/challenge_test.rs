//! Integration tests for presence and challenge coordination.

mod helpers;

use axum::http::StatusCode;

#[tokio::test]
async fn test_identity_required() {
    let app = helpers::TestApp::new().await;
    let resp = app.request("GET", "/api/presence/online", None, None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.body["error"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_heartbeat_and_offline() {
    let app = helpers::TestApp::new().await;
    let resp = app
        .request(
            "POST",
            "/api/presence/heartbeat",
            Some(serde_json::json!({ "display_name": "Alice", "status": "away" })),
            Some("alice"),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"]["display_name"], "Alice");
    assert_eq!(resp.body["data"]["status"], "away");

    let online = app.request("GET", "/api/presence/online", None, Some("bob")).await;
    assert_eq!(online.body["data"].as_array().map(Vec::len), Some(1));

    let resp = app.request("DELETE", "/api/presence", None, Some("alice")).await;
    assert_eq!(resp.status, StatusCode::OK);

    let gone = app
        .request("GET", "/api/presence/alice", None, Some("bob"))
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_offline_target_rejected() {
    let app = helpers::TestApp::new().await;
    app.online(&["alice"]).await;
    let resp = app
        .request(
            "POST",
            "/api/challenges",
            Some(serde_json::json!({ "to": "bob", "app_id": "tictactoe" })),
            Some("alice"),
        )
        .await;
    assert_eq!(resp.status, StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn test_unknown_app_rejected() {
    let app = helpers::TestApp::new().await;
    app.online(&["alice", "bob"]).await;
    let resp = app
        .request(
            "POST",
            "/api/challenges",
            Some(serde_json::json!({ "to": "bob", "app_id": "chess" })),
            Some("alice"),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_one_pending_challenge_per_pair() {
    let app = helpers::TestApp::new().await;
    app.online(&["alice", "bob"]).await;
    app.challenge("alice", "bob").await;

    let reverse = app
        .request(
            "POST",
            "/api/challenges",
            Some(serde_json::json!({ "to": "alice", "app_id": "tictactoe" })),
            Some("bob"),
        )
        .await;
    assert_eq!(reverse.status, StatusCode::CONFLICT);
    assert_eq!(reverse.body["error"], "CONFLICT");
}

#[tokio::test]
async fn test_queues_and_reject() {
    let app = helpers::TestApp::new().await;
    app.online(&["alice", "bob", "carol"]).await;
    let id = app.challenge("alice", "bob").await;

    let incoming = app
        .request("GET", "/api/challenges/incoming", None, Some("bob"))
        .await;
    assert_eq!(incoming.body["data"][0]["id"], id.as_str());
    let outgoing = app
        .request("GET", "/api/challenges/outgoing", None, Some("alice"))
        .await;
    assert_eq!(outgoing.body["data"][0]["id"], id.as_str());

    let peek = app
        .request("GET", &format!("/api/challenges/{id}"), None, Some("carol"))
        .await;
    assert_eq!(peek.status, StatusCode::FORBIDDEN);

    let hijack = app
        .request("POST", &format!("/api/challenges/{id}/accept"), None, Some("carol"))
        .await;
    assert_eq!(hijack.status, StatusCode::FORBIDDEN);

    let rejected = app
        .request("POST", &format!("/api/challenges/{id}/reject"), None, Some("bob"))
        .await;
    assert_eq!(rejected.status, StatusCode::OK);
    assert_eq!(rejected.body["data"]["status"], "rejected");

    let incoming = app
        .request("GET", "/api/challenges/incoming", None, Some("bob"))
        .await;
    assert_eq!(incoming.body["data"].as_array().map(Vec::len), Some(0));

    let late = app
        .request("POST", &format!("/api/challenges/{id}/accept"), None, Some("bob"))
        .await;
    assert_eq!(late.status, StatusCode::CONFLICT);
    assert_eq!(late.body["error"], "INVALID_STATE");

    // The pair is free again.
    app.challenge("bob", "alice").await;
}

#[tokio::test]
async fn test_group_waits_for_threshold_then_seats_three() {
    let app = helpers::TestApp::new().await;
    app.online(&["x", "y", "z", "w"]).await;
    let resp = app
        .request(
            "POST",
            "/api/challenges/group",
            Some(serde_json::json!({
                "player_ids": ["x", "y", "z", "w"],
                "app_id": "tictactoe",
                "min_players": 3,
                "max_players": 5,
            })),
            Some("x"),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{:?}", resp.body);
    assert_eq!(resp.body["data"]["kind"], "group");
    let id = resp.body["data"]["id"].as_str().expect("challenge id").to_string();

    for user in ["y", "z"] {
        let resp = app
            .request("POST", &format!("/api/challenges/{id}/accept"), None, Some(user))
            .await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body["data"]["status"], "pending");
        assert!(resp.body["data"].get("session_id").is_none());
    }

    let resp = app
        .request("GET", &format!("/api/challenges/{id}"), None, Some("x"))
        .await;
    assert_eq!(resp.body["data"]["accepted"], serde_json::json!(["y", "z"]));

    let ready = app
        .request("POST", &format!("/api/challenges/{id}/accept"), None, Some("w"))
        .await;
    assert_eq!(ready.status, StatusCode::OK, "{:?}", ready.body);
    assert_eq!(ready.body["data"]["status"], "ready");
    let session_id = ready.body["data"]["session_id"]
        .as_str()
        .expect("session id")
        .to_string();

    let session = app
        .request("GET", &format!("/api/sessions/{session_id}"), None, Some("y"))
        .await;
    assert_eq!(session.status, StatusCode::OK);
    let seated: Vec<&str> = session.body["data"]["participants"]
        .as_array()
        .expect("participants")
        .iter()
        .filter_map(|p| p["id"].as_str())
        .collect();
    assert_eq!(seated, vec!["y", "z", "w"]);
    assert_eq!(session.body["data"]["current_turn"], "y");
}

#[tokio::test]
async fn test_group_larger_than_the_board_is_rejected() {
    let app = helpers::TestApp::new().await;
    let players = ["x", "a", "b", "c", "d", "e"];
    app.online(&players).await;
    let resp = app
        .request(
            "POST",
            "/api/challenges/group",
            Some(serde_json::json!({
                "player_ids": players,
                "app_id": "tictactoe",
                "min_players": 5,
            })),
            Some("x"),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["error"], "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_group_starts_once_ready() {
    let app = helpers::TestApp::new().await;
    app.online(&["x", "y", "z", "w"]).await;
    let resp = app
        .request(
            "POST",
            "/api/challenges/group",
            Some(serde_json::json!({
                "player_ids": ["y", "z", "w"],
                "app_id": "tictactoe",
                "min_players": 2,
            })),
            Some("x"),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{:?}", resp.body);
    assert_eq!(resp.body["data"]["max_players"], 3);
    let id = resp.body["data"]["id"].as_str().expect("challenge id").to_string();

    app.request("POST", &format!("/api/challenges/{id}/accept"), None, Some("z"))
        .await;
    let ready = app
        .request("POST", &format!("/api/challenges/{id}/accept"), None, Some("w"))
        .await;
    assert_eq!(ready.status, StatusCode::OK);
    assert_eq!(ready.body["data"]["status"], "ready");
    let session_id = ready.body["data"]["session_id"]
        .as_str()
        .expect("session id")
        .to_string();

    let session = app
        .request("GET", &format!("/api/sessions/{session_id}"), None, Some("z"))
        .await;
    assert_eq!(session.body["data"]["participants"][0]["id"], "z");
    assert_eq!(session.body["data"]["participants"][1]["id"], "w");

    let late = app
        .request("POST", &format!("/api/challenges/{id}/accept"), None, Some("y"))
        .await;
    assert_eq!(late.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_health() {
    let app = helpers::TestApp::new().await;
    let resp = app.request("GET", "/api/health", None, None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"]["status"], "ok");
    assert_eq!(resp.body["data"]["store"], "memory");
    assert_eq!(resp.body["data"]["ws_connections"], 0);
}
