use serde_json::json;

use super::*;
use crate::config::AuthMode;
use crate::error::ErrorKind;
use crate::testutil::{MockBackend, MockReply, fixture, fresh_jwt};

#[tokio::test]
async fn config_is_fetched_once_and_public() {
    let backend = MockBackend::start().await;
    backend.on(
        "GET",
        SERVER_CONFIG_ENDPOINT,
        MockReply::json(
            200,
            &json!({"message": "ok", "status": "success", "data": {"serverName": "Antica", "rateExp": 5, "loginPort": 7171}}),
        ),
    );
    let fx = fixture(&backend.api_url, AuthMode::LocalCredential, "/");
    fx.state.auth.save_token(&fresh_jwt());
    let service = ServerService::new(Arc::clone(&fx.state.api));

    let (a, b) = tokio::join!(service.config(), service.config());
    let config = a.unwrap();

    assert_eq!(config, b.unwrap());
    assert_eq!(config.server_name, "Antica");
    assert!((config.rate_exp - 5.0).abs() < f64::EPSILON);
    assert_eq!(config.login_port, 7171);
    assert_eq!(service.server_name().await.unwrap(), "Antica");
    assert_eq!(backend.hits(SERVER_CONFIG_ENDPOINT), 1);
    assert!(backend.last_request(SERVER_CONFIG_ENDPOINT).unwrap().header("authorization").is_none());
}

#[tokio::test]
async fn blank_server_name_falls_back() {
    let backend = MockBackend::start().await;
    backend.on("GET", SERVER_CONFIG_ENDPOINT, MockReply::json(200, &json!({"data": {"serverName": ""}})));
    let fx = fixture(&backend.api_url, AuthMode::LocalCredential, "/");
    let service = ServerService::new(Arc::clone(&fx.state.api));

    assert_eq!(service.server_name().await.unwrap(), DEFAULT_SERVER_NAME);
}

#[tokio::test]
async fn stages_decode_and_clear_cache_refetches() {
    let backend = MockBackend::start().await;
    backend.on(
        "GET",
        SERVER_STAGES_ENDPOINT,
        MockReply::json(
            200,
            &json!({"data": {
                "experienceStages": [{"minLevel": 1, "maxLevel": 50, "multiplier": 7}, {"minLevel": 51, "multiplier": 2}],
                "skillsStages": [],
                "magicLevelStages": []
            }}),
        ),
    );
    let fx = fixture(&backend.api_url, AuthMode::LocalCredential, "/");
    let service = ServerService::new(Arc::clone(&fx.state.api));

    let stages = service.stages().await.unwrap();
    assert_eq!(stages.experience_stages.len(), 2);
    assert_eq!(stages.experience_stages[1].max_level, None);

    service.clear_cache().await;
    service.stages().await.unwrap();
    assert_eq!(backend.hits(SERVER_STAGES_ENDPOINT), 2);
}

#[tokio::test]
async fn failed_fetch_is_retried() {
    let backend = MockBackend::start().await;
    backend.on("GET", SERVER_CONFIG_ENDPOINT, MockReply::json(500, &json!({"message": "config unavailable"})));
    let fx = fixture(&backend.api_url, AuthMode::LocalCredential, "/");
    let service = ServerService::new(Arc::clone(&fx.state.api));

    let err = service.config().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Request);
    assert_eq!(err.message(), "config unavailable");

    backend.on("GET", SERVER_CONFIG_ENDPOINT, MockReply::json(200, &json!({"data": {"serverName": "Antica"}})));
    assert_eq!(service.server_name().await.unwrap(), "Antica");
    assert_eq!(backend.hits(SERVER_CONFIG_ENDPOINT), 2);
}
