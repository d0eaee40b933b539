use std::collections::HashSet;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use service::store::{FailPoint, MemoryHashStore};
use service::CookieService;
use tower::Service;

const API_KEY: &str = "test-secret";
const BASE: &str = "/api/v3/cookies/session/u1";

fn build_app() -> (Router, MemoryHashStore) {
    let store = MemoryHashStore::new();
    let cookies = CookieService::new(Arc::new(store.clone()));
    (server::startup::build_app(cookies, API_KEY), store)
}

fn post(uri: &str, key: Option<&str>, body: Value) -> anyhow::Result<Request<Body>> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(k) = key {
        builder = builder.header("x-api-key", k);
    }
    Ok(builder.body(Body::from(serde_json::to_vec(&body)?))?)
}

fn get(uri: &str, key: Option<&str>) -> anyhow::Result<Request<Body>> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(k) = key {
        builder = builder.header("x-api-key", k);
    }
    Ok(builder.body(Body::empty())?)
}

async fn send(app: &Router, req: Request<Body>) -> anyhow::Result<(StatusCode, Value)> {
    let resp = app.clone().call(req).await?;
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
    Ok((status, body))
}

async fn save(app: &Router, cookie: &str, category: Option<&str>) -> anyhow::Result<()> {
    let mut details = json!({"cookie": cookie});
    if let Some(c) = category {
        details["category"] = json!(c);
    }
    let (status, body) = send(app, post(BASE, Some(API_KEY), json!({"operation": "saveCookie", "details": details}))?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    Ok(())
}

async fn remove(app: &Router, cookie: &str) -> anyhow::Result<(StatusCode, Value)> {
    send(app, post(BASE, Some(API_KEY), json!({"operation": "removeCookie", "details": {"cookie": cookie}}))?).await
}

async fn list(app: &Router, query: &str) -> anyhow::Result<Vec<Value>> {
    let (status, body) = send(app, get(&format!("{BASE}{query}"), Some(API_KEY))?).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(body.as_array().cloned().unwrap_or_default())
}

async fn stats(app: &Router) -> anyhow::Result<Value> {
    let (status, body) = send(app, get(&format!("{BASE}/stats"), Some(API_KEY))?).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(body["details"].clone())
}

#[tokio::test]
async fn saved_cookie_is_listed_once_with_recent_timestamp() -> anyhow::Result<()> {
    let (app, _) = build_app();
    let before = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH)?.as_secs() as i64;
    save(&app, "tok-1", Some("work")).await?;

    let items = list(&app, "").await?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["cookie"], "tok-1");
    assert_eq!(items[0]["category"], "work");
    let ts = items[0]["timestamp"].as_i64().unwrap_or_default();
    assert!(ts >= before && ts <= before + 60, "timestamp {ts} not recent");
    Ok(())
}

#[tokio::test]
async fn save_without_category_uses_default() -> anyhow::Result<()> {
    let (app, _) = build_app();
    save(&app, "tok", None).await?;
    let items = list(&app, "").await?;
    assert_eq!(items[0]["category"], "default");
    assert_eq!(stats(&app).await?, json!({"default": 1}));
    Ok(())
}

#[tokio::test]
async fn saving_same_value_twice_counts_twice() -> anyhow::Result<()> {
    let (app, _) = build_app();
    save(&app, "dup", Some("work")).await?;
    save(&app, "dup", Some("work")).await?;

    // one entry, but the count drifts to 2
    assert_eq!(list(&app, "").await?.len(), 1);
    assert_eq!(stats(&app).await?, json!({"work": 2}));
    Ok(())
}

#[tokio::test]
async fn remove_decrements_then_drops_category() -> anyhow::Result<()> {
    let (app, _) = build_app();
    save(&app, "a", Some("work")).await?;
    save(&app, "b", Some("work")).await?;
    save(&app, "c", Some("home")).await?;

    let (status, body) = remove(&app, "a").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    assert_eq!(stats(&app).await?, json!({"work": 1, "home": 1}));

    remove(&app, "c").await?;
    assert_eq!(stats(&app).await?, json!({"work": 1}));

    let remaining: Vec<_> = list(&app, "").await?.iter().map(|v| v["cookie"].clone()).collect();
    assert_eq!(remaining, vec![json!("b")]);
    Ok(())
}

#[tokio::test]
async fn removing_unknown_value_succeeds_without_changes() -> anyhow::Result<()> {
    let (app, _) = build_app();
    save(&app, "a", Some("work")).await?;
    let before = stats(&app).await?;

    let (status, body) = remove(&app, "ghost").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    assert_eq!(stats(&app).await?, before);
    Ok(())
}

#[tokio::test]
async fn list_filters_and_caps() -> anyhow::Result<()> {
    let (app, _) = build_app();
    for i in 0..5 {
        save(&app, &format!("w{i}"), Some("work")).await?;
    }
    save(&app, "h0", Some("home")).await?;

    let home = list(&app, "?category=home").await?;
    assert_eq!(home.len(), 1);
    assert!(home.iter().all(|v| v["category"] == "home"));

    let capped = list(&app, "?category=work&qty=2").await?;
    assert_eq!(capped.len(), 2);
    let work: HashSet<String> = (0..5).map(|i| format!("w{i}")).collect();
    assert!(capped.iter().all(|v| work.contains(v["cookie"].as_str().unwrap_or_default())));

    let shuffled = list(&app, "?random=true").await?;
    assert_eq!(shuffled.len(), 6);

    assert!(list(&app, "?category=missing").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn empty_listing_is_an_empty_array() -> anyhow::Result<()> {
    let (app, _) = build_app();
    let (status, body) = send(&app, get(BASE, Some(API_KEY))?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
    assert_eq!(stats(&app).await?, json!({}));
    Ok(())
}

#[tokio::test]
async fn invalid_qty_is_rejected() -> anyhow::Result<()> {
    let (app, _) = build_app();
    for bad in ["0", "-1", "abc"] {
        let (status, body) = send(&app, get(&format!("{BASE}?qty={bad}"), Some(API_KEY))?).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "qty={bad}");
        assert_eq!(body, json!({"error": "Invalid qty parameter"}));
    }
    Ok(())
}

#[tokio::test]
async fn bad_post_bodies_are_rejected() -> anyhow::Result<()> {
    let (app, _) = build_app();

    let (status, body) = send(&app, post(BASE, Some(API_KEY), json!({"operation": "dropAll"}))?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid operation"}));

    let raw = Request::builder()
        .method("POST")
        .uri(BASE)
        .header("x-api-key", API_KEY)
        .body(Body::from("{not json"))?;
    let (status, body) = send(&app, raw).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid JSON"}));

    let empty = json!({"operation": "saveCookie", "details": {"cookie": ""}});
    let (status, body) = send(&app, post(BASE, Some(API_KEY), empty)?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid request"}));

    let (status, _) = send(&app, post(BASE, Some(API_KEY), json!({"operation": "removeCookie", "details": {}}))?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn missing_or_wrong_key_is_unauthorized_and_never_hits_store() -> anyhow::Result<()> {
    let (app, store) = build_app();
    let save_body = json!({"operation": "saveCookie", "details": {"cookie": "x"}});

    for key in [None, Some("wrong"), Some("")] {
        let requests = vec![
            post(BASE, key, save_body.clone())?,
            get(BASE, key)?,
            get(&format!("{BASE}/stats"), key)?,
        ];
        for req in requests {
            let (status, body) = send(&app, req).await?;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body, json!({"error": "Unauthorized"}));
        }
    }
    assert_eq!(store.command_count(), 0);
    Ok(())
}

#[tokio::test]
async fn failed_stats_update_still_reports_success() -> anyhow::Result<()> {
    let (app, store) = build_app();
    store.fail_increments(true);
    save(&app, "tok", Some("work")).await?;

    assert_eq!(list(&app, "").await?.len(), 1);
    assert_eq!(stats(&app).await?, json!({}));
    Ok(())
}

#[tokio::test]
async fn store_failures_are_internal_errors_without_detail() -> anyhow::Result<()> {
    let (app, store) = build_app();
    save(&app, "tok", Some("work")).await?;

    let save_body = json!({"operation": "saveCookie", "details": {"cookie": "next"}});
    let remove_body = json!({"operation": "removeCookie", "details": {"cookie": "tok"}});
    let cases = [
        (FailPoint::Write, post(BASE, Some(API_KEY), save_body)?, "Failed to save cookie"),
        (FailPoint::Scan, post(BASE, Some(API_KEY), remove_body)?, "Failed to remove cookie"),
        (FailPoint::Scan, get(BASE, Some(API_KEY))?, "Failed to retrieve cookies"),
        (FailPoint::Read, get(&format!("{BASE}/stats"), Some(API_KEY))?, "Failed to retrieve stats"),
    ];
    for (point, req, message) in cases {
        store.fail(point, true);
        let (status, body) = send(&app, req).await?;
        store.fail(point, false);

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{message}");
        assert_eq!(body, json!({"error": message}));
        assert!(!body.to_string().contains("injected"));
    }

    // nothing was lost or changed by the failed calls
    assert_eq!(list(&app, "").await?.len(), 1);
    assert_eq!(stats(&app).await?, json!({"work": 1}));
    Ok(())
}

#[tokio::test]
async fn health_and_metrics_are_public() -> anyhow::Result<()> {
    let (app, _) = build_app();
    let (status, body) = send(&app, get("/health", None)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let resp = app.clone().call(get("/metrics", None)?).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = String::from_utf8(to_bytes(resp.into_body(), usize::MAX).await?.to_vec())?;
    assert!(text.contains("cookie_api_cookies_saved_total"));
    assert!(text.contains("cookie_api_stats_update_failures_total"));
    Ok(())
}
