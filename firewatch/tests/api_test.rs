//! Live API tests against a running server, e.g.
//! `DATABASE_URL=memory cargo run -p firewatch` then
//! `cargo test -p firewatch -- --ignored`.

use serde_json::{json, Value};

fn base_url() -> String {
    std::env::var("FIREWATCH_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

#[tokio::test]
#[ignore]
async fn sensor_to_dashboard_flow() {
    let client = reqwest::Client::new();
    let base = base_url();

    let resp = client
        .post(format!("{base}/api/sensor"))
        .json(&json!({"smoke": 400, "temperature": 25, "humidity": 40}))
        .send()
        .await
        .expect("server reachable");
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["status"], "DANGER");

    let current: Value = client
        .get(format!("{base}/api/current"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(current["status"], "DANGER");
    assert_eq!(current["online"], true);

    let history: Value = client
        .get(format!("{base}/api/history?limit=5"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history["ok"], true);
    let items = history["items"].as_array().unwrap();
    assert!(!items.is_empty());
    assert_eq!(items[0]["status"], "DANGER");
}

#[tokio::test]
#[ignore]
async fn admin_round_trip() {
    let client = reqwest::Client::new();
    let base = base_url();

    // gated endpoints reject without a token
    let resp = client
        .post(format!("{base}/api/admin/delete_history"))
        .json(&json!({"mode": "all"}))
        .send()
        .await
        .expect("server reachable");
    assert_eq!(resp.status(), 401);

    let login: Value = client
        .post(format!("{base}/api/login"))
        .json(&json!({"username": "admin", "password": "123456"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(login["ok"], true);
    let token = login["token"].as_str().unwrap();

    let deleted: Value = client
        .post(format!("{base}/api/admin/delete_history"))
        .bearer_auth(token)
        .json(&json!({"mode": "all"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(deleted["ok"], true);
    assert!(deleted["deleted"].as_u64().is_some());

    // export works as a direct link with the query token
    let export = client
        .get(format!("{base}/api/admin/export_excel?limit=10&token={token}"))
        .send()
        .await
        .unwrap();
    assert!(export.status().is_success());
    assert!(export
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("attachment"));

    let logout = client
        .post(format!("{base}/api/logout"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert!(logout.status().is_success());

    let after = client
        .post(format!("{base}/api/admin/train_ai"))
        .bearer_auth(token)
        .json(&json!({"limit": 100}))
        .send()
        .await
        .unwrap();
    assert_eq!(after.status(), 401);
}
