//! Session middleware integration tests

use parapet_core::{Application, HttpRequest, HttpResponse, Router};
use parapet_session::{
    MemorySessionStore, SessionConfig, SessionHandle, SessionMiddleware, SessionStore,
};
use std::sync::Arc;

fn app(store: Arc<MemorySessionStore>) -> Application {
    let router = Router::new()
        .post("/visit", |req| async move {
            let handle = req
                .extensions
                .get::<SessionHandle>()
                .cloned()
                .expect("session middleware installed");
            let visits = handle.get::<u32>("visits").unwrap_or(0) + 1;
            handle.set("visits", visits)?;
            HttpResponse::ok().with_json(&serde_json::json!({ "visits": visits }))
        })
        .post("/reject", |req| async move {
            if let Some(handle) = req.extensions.get::<SessionHandle>() {
                handle.set("attempted", true)?;
            }
            Ok(HttpResponse::forbidden())
        })
        .post("/logout", |req| async move {
            if let Some(handle) = req.extensions.get::<SessionHandle>() {
                handle.destroy();
            }
            Ok(HttpResponse::no_content())
        });

    Application::new(router).with_middleware(SessionMiddleware::new(store, SessionConfig::default()))
}

#[tokio::test]
async fn test_new_session_sets_cookie() {
    let store = Arc::new(MemorySessionStore::default());
    let response = app(store.clone())
        .handle(HttpRequest::new("POST", "/visit"))
        .await;

    assert_eq!(response.status, 200);
    let cookie = response.cookie("sid").expect("sid cookie");
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_existing_session_is_reused_and_saved() {
    let store = Arc::new(MemorySessionStore::default());
    let app = app(store.clone());

    let first = app.handle(HttpRequest::new("POST", "/visit")).await;
    let sid = first.cookie("sid").unwrap().value().to_string();

    let second = app
        .handle(HttpRequest::new("POST", "/visit").with_header("Cookie", format!("sid={}", sid)))
        .await;

    let body: serde_json::Value = second.json().unwrap();
    assert_eq!(body["visits"], 2);
    assert!(second.cookie("sid").is_none());
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_unknown_session_id_gets_fresh_session() {
    let store = Arc::new(MemorySessionStore::default());
    let response = app(store.clone())
        .handle(HttpRequest::new("POST", "/visit").with_header("Cookie", "sid=forged"))
        .await;

    let cookie = response.cookie("sid").unwrap();
    assert_ne!(cookie.value(), "forged");
}

#[tokio::test]
async fn test_logout_deletes_session_and_expires_cookie() {
    let store = Arc::new(MemorySessionStore::default());
    let app = app(store.clone());

    let first = app.handle(HttpRequest::new("POST", "/visit")).await;
    let sid = first.cookie("sid").unwrap().value().to_string();

    let response = app
        .handle(HttpRequest::new("POST", "/logout").with_header("Cookie", format!("sid={}", sid)))
        .await;

    assert_eq!(response.status, 204);
    let cookie = response.cookie("sid").unwrap();
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(cookie::time::Duration::ZERO));
    assert!(store.get(&sid).await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_request_does_not_persist_new_session() {
    let store = Arc::new(MemorySessionStore::default());
    let app = app(store.clone());

    for _ in 0..10 {
        let response = app.handle(HttpRequest::new("POST", "/reject")).await;
        assert_eq!(response.status, 403);
        assert!(response.cookie("sid").is_none());
    }
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_failed_request_still_saves_existing_session() {
    let store = Arc::new(MemorySessionStore::default());
    let app = app(store.clone());

    let first = app.handle(HttpRequest::new("POST", "/visit")).await;
    let sid = first.cookie("sid").unwrap().value().to_string();

    let rejected = app
        .handle(HttpRequest::new("POST", "/reject").with_header("Cookie", format!("sid={}", sid)))
        .await;
    assert_eq!(rejected.status, 403);

    let session = store.get(&sid).await.unwrap().expect("session kept");
    assert_eq!(session.data.get("attempted"), Some(&serde_json::json!(true)));
}
