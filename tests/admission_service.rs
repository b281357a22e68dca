//! Service-level admission behaviour over real sockets.

mod common;

use std::time::Duration;

use common::{service_config, start_service};
use retry_storm::http::{parse_retry_after, ServiceReply};

async fn post(client: &reqwest::Client, endpoint: &str, id: &str) -> reqwest::Response {
    client
        .post(endpoint)
        .json(&serde_json::json!({ "id": id }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_single_slot_sheds_concurrent_load() {
    let service = start_service(service_config(1, 5, 1000)).await;
    let endpoint = service.endpoint();
    let client = reqwest::Client::new();

    let mut tasks = Vec::new();
    for i in 0..10 {
        let client = client.clone();
        let endpoint = endpoint.clone();
        tasks.push(tokio::spawn(async move {
            let id = format!("req-{}", i);
            let response = post(&client, &endpoint, &id).await;
            let status = response.status().as_u16();
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            let reply: ServiceReply = response.json().await.unwrap();
            assert_eq!(reply.id, id);
            (status, retry_after)
        }));
    }

    let mut ok = 0;
    let mut rejected = 0;
    for task in tasks {
        match task.await.unwrap() {
            (200, None) => ok += 1,
            (429, Some(hint)) => {
                assert_eq!(hint, Duration::from_secs(5));
                rejected += 1;
            }
            other => panic!("unexpected response {:?}", other),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(rejected, 9);

    // The slot is free again once the admitted work has finished.
    let response = post(&client, &endpoint, "after").await;
    assert_eq!(response.status().as_u16(), 200);

    service.shutdown.trigger();
}

#[tokio::test]
async fn test_capacity_recovers_between_sequential_requests() {
    let service = start_service(service_config(1, 5, 20)).await;
    let client = reqwest::Client::new();

    for i in 0..5 {
        let response = post(&client, &service.endpoint(), &i.to_string()).await;
        assert_eq!(response.status().as_u16(), 200);
    }
}

#[tokio::test]
async fn test_health_reports_gate_state() {
    let service = start_service(service_config(4, 5, 10)).await;
    let body: serde_json::Value = reqwest::get(format!("http://{}/health", service.addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["capacity"], 4);
    assert_eq!(body["available"], 4);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let service = start_service(service_config(1, 5, 10)).await;
    let client = reqwest::Client::new();

    let response = client
        .post(service.endpoint())
        .header("x-request-id", "corr-123")
        .json(&serde_json::json!({ "id": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "corr-123");

    let response = post(&client, &service.endpoint(), "y").await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_graceful_shutdown_stops_server() {
    let service = start_service(service_config(1, 5, 10)).await;
    let response = post(&reqwest::Client::new(), &service.endpoint(), "z").await;
    assert_eq!(response.status().as_u16(), 200);

    service.shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), service.handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}
