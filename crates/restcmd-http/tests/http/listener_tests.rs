use super::test_utilities::{listener_url, start_listener};
use restcmd_http::{HealthCheckResponse, REPLY_ACK};
use std::time::Duration;

#[tokio::test]
async fn test_well_formed_reply_reaches_correlator() {
    let (listener, correlator) = start_listener().await;
    let client = reqwest::Client::new();

    let response = client
        .post(listener_url(&listener, "/response"))
        .json(&serde_json::json!({
            "appname": "readout",
            "data": {"cmdid": "init"},
            "success": true,
            "result": "OK"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), REPLY_ACK);

    let reply = correlator.take().await;
    assert_eq!(reply.cmdid, "init");
    assert_eq!(reply.appname.as_deref(), Some("readout"));
    listener.stop().await.unwrap();
}

#[tokio::test]
async fn test_body_decoded_without_json_content_type() {
    let (listener, correlator) = start_listener().await;

    let response = reqwest::Client::new()
        .post(listener_url(&listener, "/response"))
        .header("content-type", "text/plain")
        .body(r#"{"cmdid": "conf", "success": true, "result": null}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(correlator.take().await.cmdid, "conf");
    listener.stop().await.unwrap();
}

#[tokio::test]
async fn test_failed_reply_is_still_delivered() {
    let (listener, correlator) = start_listener().await;

    let response = reqwest::Client::new()
        .post(listener_url(&listener, "/response"))
        .json(&serde_json::json!({
            "data": {"cmdid": "start"},
            "success": false,
            "result": "module not configured"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let reply = correlator.take().await;
    assert!(!reply.success);
    assert_eq!(reply.result, serde_json::json!("module not configured"));
    listener.stop().await.unwrap();
}

#[test_log::test(tokio::test)]
async fn test_malformed_replies_are_rejected() {
    let (listener, correlator) = start_listener().await;
    let client = reqwest::Client::new();
    let url = listener_url(&listener, "/response");

    let response = client.post(&url).body("invalid json").send().await.unwrap();
    assert_eq!(response.status(), 400);
    let error: serde_json::Value = response.json().await.unwrap();
    assert_eq!(error["error"], "invalid_json");

    let response = client
        .post(&url)
        .json(&serde_json::json!({"data": {"cmdid": "init"}, "result": "OK"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let error: serde_json::Value = response.json().await.unwrap();
    assert_eq!(error["error"], "malformed_reply");
    assert_eq!(error["details"]["field"], "success");

    assert!(correlator.is_empty());
    listener.stop().await.unwrap();
}

#[tokio::test]
async fn test_replies_queue_in_arrival_order() {
    let (listener, correlator) = start_listener().await;
    let client = reqwest::Client::new();
    let url = listener_url(&listener, "/response");

    for id in ["init", "conf", "start"] {
        let response = client
            .post(&url)
            .json(&serde_json::json!({"cmdid": id, "success": true, "result": "OK"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    assert_eq!(correlator.len(), 3);
    for id in ["init", "conf", "start"] {
        assert_eq!(correlator.take().await.cmdid, id);
    }
    listener.stop().await.unwrap();
}

#[tokio::test]
async fn test_health_reports_pending_replies() {
    let (listener, correlator) = start_listener().await;
    correlator.deposit(restcmd::ReplyMessage::new(
        None,
        "init",
        true,
        serde_json::json!("OK"),
    ));

    let response = reqwest::Client::new()
        .get(listener_url(&listener, "/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let health: HealthCheckResponse = response.json().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.pending_replies, 1);
    listener.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_releases_port() {
    let (listener, _correlator) = start_listener().await;
    let addr = listener.local_addr();

    listener.stop().await.unwrap();

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let result = client
        .post(format!("http://{addr}/response"))
        .body("{}")
        .send()
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_bind_conflict_is_listener_error() {
    let (listener, correlator) = start_listener().await;

    let result = restcmd_http::ReplyListener::start("127.0.0.1", listener.port(), correlator).await;

    assert!(matches!(result, Err(restcmd::ListenerError::Bind { .. })));
    listener.stop().await.unwrap();
}
