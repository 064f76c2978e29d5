// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! JSON client for the hub REST surface.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{AddonError, Result};

/// Hub REST client bound to one base URL and optional bearer token.
///
/// Calls are never retried; transport failures are returned to the caller.
#[derive(Debug, Clone)]
pub struct HubClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HubClient {
    /// Create a client for `base_url` with the given request timeout.
    pub fn new(base_url: &str, timeout: Duration, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` and decode the JSON body.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(self.request(Method::GET, path)).await?;
        Ok(response.json().await?)
    }

    /// POST `body` to `path`.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        self.send(self.request(Method::POST, path).json(body))
            .await
            .map(drop)
    }

    /// POST `body` to `path` and decode the created resource.
    pub async fn create<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(self.request(Method::POST, path).json(body)).await?;
        Ok(response.json().await?)
    }

    /// DELETE `path`.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(self.request(Method::DELETE, path))
            .await
            .map(drop)
    }

    /// PUT `body` to `path`.
    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        self.send(self.request(Method::PUT, path).json(body))
            .await
            .map(drop)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "Hub request");
        let request = self.http.request(method, url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().path().to_string();
        let message = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(AddonError::NotFound(url));
        }
        Err(AddonError::Hub {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, token: Option<&str>) -> HubClient {
        HubClient::new(
            &format!("{}/", server.uri()),
            Duration::from_secs(5),
            token.map(str::to_string),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_decodes_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tags/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "Java"})))
            .mount(&server)
            .await;

        let value: Value = client(&server, None).get("/tags/1").await.unwrap();
        assert_eq!(value["name"], "Java");
    }

    #[tokio::test]
    async fn test_bearer_token_sent() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/tasks/1/report"))
            .and(header("authorization", "Bearer t0ken"))
            .and(body_json(json!({"status": "Running"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(&server, Some("t0ken"))
            .put("/tasks/1/report", &json!({"status": "Running"}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_returns_stored_resource() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tags"))
            .and(body_json(json!({"name": "Java"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 9, "name": "Java"})))
            .mount(&server)
            .await;

        let created: Value = client(&server, None)
            .create("/tags", &json!({"name": "Java"}))
            .await
            .unwrap();
        assert_eq!(created["id"], 9);
    }

    #[tokio::test]
    async fn test_delete() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/tags/9"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, None);
        client.delete("/tags/9").await.unwrap();
        let err = client.delete("/tags/10").await.unwrap_err();
        assert!(matches!(err, AddonError::NotFound(ref p) if p == "/tags/10"));
    }

    #[tokio::test]
    async fn test_not_found_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .get::<Value>("/identities/9")
            .await
            .unwrap_err();
        assert!(matches!(err, AddonError::NotFound(ref p) if p == "/identities/9"));
    }

    #[tokio::test]
    async fn test_error_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("database locked"))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .post("/tasks/1/report", &json!({}))
            .await
            .unwrap_err();
        match err {
            AddonError::Hub { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "database locked");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_hub_is_transport_error() {
        let client =
            HubClient::new("http://127.0.0.1:1", Duration::from_millis(500), None).unwrap();
        let err = client.get::<Value>("/tags").await.unwrap_err();
        assert!(matches!(err, AddonError::Transport(_)));
    }
}
