//! Resolver API client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use framedev_common::{ActionBody, Dispatch, Error, InteractionRecord, Result};

/// Client for the devtools resolver API (`<base_path>/api`)
#[derive(Clone)]
pub struct FrameClient {
    api_base: Url,
    http: reqwest::Client,
}

impl FrameClient {
    /// Create a client for the API rooted at `api_base`,
    /// e.g. `http://127.0.0.1:5173/dev/api`.
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self> {
        // A trailing slash makes relative joins land under the API root.
        let mut api_base = Url::parse(api_base)?;
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("http client: {}", e)))?;

        Ok(Self { api_base, http })
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Check if the resolver API is up
    pub async fn health_check(&self) -> bool {
        match self.endpoint("health") {
            Ok(url) => self
                .http
                .get(url)
                .send()
                .await
                .map(|r| r.status().is_success())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Frame routes registered on the inspected application
    pub async fn list_routes(&self) -> Result<Vec<String>> {
        let url = self.endpoint("frames")?;
        self.send(self.http.get(url)).await
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.api_base.join(path)?)
    }

    /// Endpoint resolving the route (path and query) of `frame_url`.
    fn frame_endpoint(&self, frame_url: &str) -> Result<Url> {
        let parsed = Url::parse(frame_url)?;
        let route = match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_string(),
        };
        self.endpoint(&format!("frames/{}", urlencoding::encode(&route)))
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(resolver_error(status, response).await);
        }

        // A body that arrives but does not decode is a bad answer, not a
        // missing one.
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| Error::Resolver {
            status: status.as_u16(),
            message: format!("undecodable response body: {}", e),
        })
    }
}

/// Error bodies from the resolver look like `{"error": "..."}`.
async fn resolver_error(status: StatusCode, response: reqwest::Response) -> Error {
    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| body.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| status.to_string());

    // The resolver reports upstream connection failures as 502.
    if status == StatusCode::BAD_GATEWAY {
        return Error::Network(message);
    }
    Error::Resolver {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl Dispatch for FrameClient {
    async fn get_frame(&self, url: &str) -> Result<InteractionRecord> {
        let endpoint = self.frame_endpoint(url)?;
        debug!("GET {}", endpoint);
        self.send(self.http.get(endpoint)).await
    }

    async fn post_frame_action(&self, body: &ActionBody) -> Result<InteractionRecord> {
        let endpoint = self.endpoint("action")?;
        debug!("POST {} (button {})", endpoint, body.button_index);
        self.send(self.http.post(endpoint).json(body)).await
    }

    async fn post_frame_redirect(&self, body: &ActionBody) -> Result<InteractionRecord> {
        let endpoint = self.endpoint("redirect")?;
        debug!("POST {} (button {})", endpoint, body.button_index);
        self.send(self.http.post(endpoint).json(body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> FrameClient {
        FrameClient::new(base, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_api_base_gets_trailing_slash() {
        let c = client("http://127.0.0.1:5173/dev/api");
        assert_eq!(c.api_base().as_str(), "http://127.0.0.1:5173/dev/api/");
        assert_eq!(
            c.endpoint("frames").unwrap().as_str(),
            "http://127.0.0.1:5173/dev/api/frames"
        );
    }

    #[test]
    fn test_frame_endpoint_encodes_route() {
        let c = client("http://127.0.0.1:5173/dev/api/");
        assert_eq!(
            c.frame_endpoint("http://localhost:3000/").unwrap().as_str(),
            "http://127.0.0.1:5173/dev/api/frames/%2F"
        );
        assert_eq!(
            c.frame_endpoint("http://localhost:3000/foo?x=1").unwrap().as_str(),
            "http://127.0.0.1:5173/dev/api/frames/%2Ffoo%3Fx%3D1"
        );
    }

    #[test]
    fn test_invalid_frame_url() {
        let c = client("http://127.0.0.1:5173/dev/api");
        assert!(matches!(
            c.frame_endpoint("not a url"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_resolver_error() {
        let api = axum::Router::new()
            .route("/api/frames", axum::routing::get(|| async { "[not json" }))
            .route("/api/frames/*route", axum::routing::get(|| async { "<html></html>" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, api).await.unwrap();
        });

        let c = client(&format!("http://{}/api", addr));
        let err = c.get_frame("http://localhost:3000/").await.unwrap_err();
        assert!(!err.is_network());
        assert!(matches!(err, Error::Resolver { status: 200, .. }));

        let err = c.list_routes().await.unwrap_err();
        assert!(matches!(err, Error::Resolver { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_network_error() {
        let c = client("http://127.0.0.1:9/dev/api");
        let err = c.get_frame("http://localhost:3000/").await.unwrap_err();
        assert!(err.is_network());
        assert!(!c.health_check().await);
    }
}
