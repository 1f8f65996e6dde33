use idlink_server::config::{AppConfig, Environment, StorageBackend};
use idlink_server::build_app;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.storage.backend = StorageBackend::Memory;
    cfg
}

async fn start_server(cfg: AppConfig) -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let app = build_app(&cfg).await.expect("build app");

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), tx, server)
}

#[tokio::test]
async fn health_endpoints_work() {
    let (base, shutdown_tx, handle) = start_server(test_config()).await;
    let client = reqwest::Client::new();

    // GET /
    let resp = client.get(format!("{base}/")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["service"], "idlink");
    assert_eq!(body["status"], "ok");

    // GET /healthz
    let resp = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    // Request id is mirrored on responses.
    let resp = client
        .get(format!("{base}/healthz"))
        .header("x-request-id", "test-req-1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], "test-req-1");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn identify_links_contacts_across_requests() {
    let (base, shutdown_tx, handle) = start_server(test_config()).await;
    let client = reqwest::Client::new();
    let url = format!("{base}/identify");

    // Fresh pair creates a primary.
    let resp = client
        .post(&url)
        .json(&json!({ "email": "lorraine@hillvalley.edu", "phoneNumber": "123456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let contact = &body["contact"];
    let primary_id = contact["primaryContatctId"].as_i64().unwrap();
    assert_eq!(contact["emails"], json!(["lorraine@hillvalley.edu"]));
    assert_eq!(contact["phoneNumbers"], json!(["123456"]));
    assert_eq!(contact["secondaryContactIds"], json!([]));

    // Same phone with a new email attaches a secondary. The numeric phone
    // form coerces to the same canonical string.
    let resp = client
        .post(&url)
        .json(&json!({ "email": "mcfly@hillvalley.edu", "phoneNumber": 123456 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let contact = &body["contact"];
    assert_eq!(contact["primaryContatctId"].as_i64().unwrap(), primary_id);
    assert_eq!(
        contact["emails"],
        json!(["lorraine@hillvalley.edu", "mcfly@hillvalley.edu"])
    );
    assert_eq!(contact["phoneNumbers"], json!(["123456"]));
    assert_eq!(contact["secondaryContactIds"].as_array().unwrap().len(), 1);

    // Exact re-submission changes nothing.
    let resp = client
        .post(&url)
        .json(&json!({ "email": "mcfly@hillvalley.edu", "phoneNumber": "123456" }))
        .send()
        .await
        .unwrap();
    let again: Value = resp.json().await.unwrap();
    assert_eq!(again, body);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn identify_rejects_empty_and_malformed_input() {
    let (base, shutdown_tx, handle) = start_server(test_config()).await;
    let client = reqwest::Client::new();
    let url = format!("{base}/identify");

    // Neither field supplied.
    let resp = client.post(&url).json(&json!({})).send().await.unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("email or phoneNumber"));

    // Explicit nulls behave like absent fields.
    let resp = client
        .post(&url)
        .json(&json!({ "email": null, "phoneNumber": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Syntactically invalid email.
    let resp = client
        .post(&url)
        .json(&json!({ "email": "not-an-email", "phoneNumber": "123456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);

    // Fractional phone numbers have no canonical string form.
    let resp = client
        .post(&url)
        .json(&json!({ "phoneNumber": 12.5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn identify_merges_two_groups() {
    let (base, shutdown_tx, handle) = start_server(test_config()).await;
    let client = reqwest::Client::new();
    let url = format!("{base}/identify");

    let first: Value = client
        .post(&url)
        .json(&json!({ "email": "george@hillvalley.edu", "phoneNumber": "919191" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let second: Value = client
        .post(&url)
        .json(&json!({ "email": "biffsucks@hillvalley.edu", "phoneNumber": "717171" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let older = first["contact"]["primaryContatctId"].as_i64().unwrap();
    let newer = second["contact"]["primaryContatctId"].as_i64().unwrap();
    assert_ne!(older, newer);

    // Bridge the two groups: older email, newer phone.
    let merged: Value = client
        .post(&url)
        .json(&json!({ "email": "george@hillvalley.edu", "phoneNumber": "717171" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let contact = &merged["contact"];
    assert_eq!(contact["primaryContatctId"].as_i64().unwrap(), older);
    assert_eq!(
        contact["emails"],
        json!(["george@hillvalley.edu", "biffsucks@hillvalley.edu"])
    );
    assert_eq!(contact["phoneNumbers"], json!(["919191", "717171"]));
    assert_eq!(contact["secondaryContactIds"], json!([newer]));

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn production_environment_is_configured_for_generic_errors() {
    let mut cfg = test_config();
    cfg.environment = Environment::Production;
    assert!(!cfg.expose_error_detail());

    // The memory backend cannot be made to fail from the outside, so the
    // suppression itself is covered at the unit level in error.rs; here we
    // just confirm a production-configured server still serves.
    let (base, shutdown_tx, handle) = start_server(cfg).await;
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base}/identify"))
        .json(&json!({ "phoneNumber": "55555" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
