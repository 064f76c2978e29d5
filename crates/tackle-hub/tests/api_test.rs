// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! REST API tests driven through the router with `oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tackle_api::{Codec, Identity, Proxy};
use tackle_hub::api::{AppState, router};
use tackle_hub::cluster::MockCluster;
use tackle_hub::scheduler::{TaskManager, TaskManagerConfig};
use tackle_hub::store::SqliteStore;
use tower::ServiceExt;

const NS: &str = "tackle-hub";

struct TestApp {
    router: Router,
    store: Arc<SqliteStore>,
    cluster: MockCluster,
}

async fn test_app() -> TestApp {
    let store = Arc::new(
        SqliteStore::in_memory(Codec::new("p1"))
            .await
            .expect("Failed to create store"),
    );
    let cluster = MockCluster::new();
    cluster
        .register_addon(NS, "windup", "quay.io/windup:1.0")
        .await;
    let router = router(AppState::new(store.clone(), Arc::new(cluster.clone())));
    TestApp {
        router,
        store,
        cluster,
    }
}

impl TestApp {
    fn manager(&self) -> TaskManager {
        TaskManager::new(
            self.store.clone(),
            Arc::new(self.cluster.clone()),
            TaskManagerConfig {
                namespace: NS.to_string(),
                ..Default::default()
            },
        )
    }

    async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(payload) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&payload).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(req).await
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn create_task(&self) -> i64 {
        let (status, body) = self
            .request(
                Method::POST,
                "/tasks",
                Some(json!({"name": "windup", "addon": "windup", "data": {"application": 3}})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn test_create_and_get_task() {
    let app = test_app().await;
    let id = app.create_task().await;

    let (status, body) = app.request(Method::GET, &format!("/tasks/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "");
    assert_eq!(body["job"], "");
    assert_eq!(body["data"], json!({"application": 3}));
    assert!(body.get("report").is_none());

    let (status, body) = app.request(Method::GET, "/tasks", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_task_validation() {
    let app = test_app().await;

    let (status, body) = app
        .request(Method::POST, "/tasks", Some(json!({"name": "windup"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "addon is required");

    let req = Request::builder()
        .method(Method::POST)
        .uri("/tasks")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_get_missing_task() {
    let app = test_app().await;
    let (status, body) = app.request(Method::GET, "/tasks/77", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "task 77 not found");
}

#[tokio::test]
async fn test_report_lifecycle() {
    let app = test_app().await;
    let id = app.create_task().await;
    let uri = format!("/tasks/{id}/report");

    let (status, _) = app
        .request(Method::PUT, &uri, Some(json!({"status": "Running"})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .request(Method::POST, &uri, Some(json!({"status": "Running"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["task"], id);

    let (status, body) = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({"status": "Running", "total": 5, "completed": 2, "activity": "scanning"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed"], 2);

    let (status, body) = app.request(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["activity"], "scanning");

    let (_, task) = app.request(Method::GET, &format!("/tasks/{id}"), None).await;
    assert_eq!(task["report"]["total"], 5);
    assert_eq!(task["report"]["status"], "Running");
}

#[tokio::test]
async fn test_report_for_missing_task() {
    let app = test_app().await;
    let (status, _) = app
        .request(Method::POST, "/tasks/9/report", Some(json!({"status": "Running"})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.request(Method::GET, "/tasks/9/report", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_task_deletes_job() {
    let app = test_app().await;
    let id = app.create_task().await;
    app.manager().tick().await.unwrap();
    assert_eq!(app.cluster.jobs().await.len(), 1);
    assert_eq!(app.cluster.secrets().await.len(), 1);

    let (status, _) = app
        .request(Method::POST, &format!("/tasks/{id}/report"), Some(json!({"status": "Running"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.request(Method::DELETE, &format!("/tasks/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.cluster.jobs().await.is_empty());
    assert!(app.cluster.secrets().await.is_empty());

    let (status, _) = app.request(Method::GET, &format!("/tasks/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .request(Method::GET, &format!("/tasks/{id}/report"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_task_with_vanished_job() {
    let app = test_app().await;
    let id = app.create_task().await;
    app.manager().tick().await.unwrap();

    let job = app.cluster.jobs().await.remove(0);
    app.cluster
        .remove_job(NS, job.metadata.name.as_deref().unwrap())
        .await;

    let (status, _) = app.request(Method::DELETE, &format!("/tasks/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.cluster.secrets().await.is_empty());
}

#[tokio::test]
async fn test_identity_plaintext_never_returned() {
    let app = test_app().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/identities",
            Some(json!({"kind": "source", "name": "git", "user": "bob", "password": "s3cr3t"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"], "");
    assert_eq!(body["password"], "");
    assert_ne!(body["encrypted"], "");
    let id = body["id"].as_i64().unwrap();

    let (status, body) = app
        .request(Method::GET, &format!("/identities/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let mut identity: Identity = serde_json::from_value(body).unwrap();
    Codec::new("p1").decrypt(&mut identity).unwrap();
    assert_eq!(identity.user, "bob");
    assert_eq!(identity.password, "s3cr3t");

    let mut wrong: Identity = serde_json::from_value(
        app.request(Method::GET, &format!("/identities/{id}"), None)
            .await
            .1,
    )
    .unwrap();
    assert!(Codec::new("wrong").decrypt(&mut wrong).is_err());
}

#[tokio::test]
async fn test_identity_update_and_delete() {
    let app = test_app().await;
    let (_, body) = app
        .request(
            Method::POST,
            "/identities",
            Some(json!({"name": "git", "user": "bob", "password": "s3cr3t"})),
        )
        .await;
    let id = body["id"].as_i64().unwrap();

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/identities/{id}"),
            Some(json!({"name": "git", "password": "n3w"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let mut identity: Identity = serde_json::from_value(body).unwrap();
    Codec::new("p1").decrypt(&mut identity).unwrap();
    assert_eq!(identity.user, "bob");
    assert_eq!(identity.password, "n3w");

    let (status, _) = app
        .request(Method::DELETE, &format!("/identities/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app
        .request(Method::GET, &format!("/identities/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_identity_name_conflict() {
    let app = test_app().await;
    let body = json!({"name": "git"});
    let (status, _) = app
        .request(Method::POST, "/identities", Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app.request(Method::POST, "/identities", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_proxy_crud() {
    let app = test_app().await;
    let (status, body) = app
        .request(
            Method::POST,
            "/proxies",
            Some(json!({
                "enabled": true,
                "kind": "https",
                "host": "proxy.local",
                "port": 3128,
                "user": "u",
                "password": "p",
                "excluded": ["*.svc"]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let mut proxy: Proxy = serde_json::from_value(body).unwrap();
    assert!(proxy.user.is_empty());
    assert_eq!(proxy.excluded, vec!["*.svc".to_string()]);

    Codec::new("p1").decrypt(&mut proxy).unwrap();
    assert_eq!(proxy.user, "u");

    let (status, body) = app.request(Method::GET, "/proxies", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = app
        .request(Method::DELETE, &format!("/proxies/{}", proxy.id), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = test_app().await;
    let (status, body) = app.request(Method::GET, "/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not found: /nope");
}
