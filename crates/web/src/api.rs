//! Resolver API routes
//!
//! - `GET /frames`: frame routes known to the registry
//! - `GET /frames/*route`: resolve a route as an `initial` interaction
//! - `POST /action`, `POST /redirect`: submit a stored action body

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::warn;
use url::Url;

use framedev_common::{ActionBody, Error};

use crate::resolver::{frame_url, FrameResolver};

// ============================================================================
// State
// ============================================================================

/// Resolver API state
pub struct ApiState {
    pub resolver: FrameResolver,
    /// Origin of the inspected application. When unset, the origin of the
    /// incoming request is used.
    pub app_origin: Option<Url>,
}

impl ApiState {
    pub fn new(resolver: FrameResolver, app_origin: Option<Url>) -> Self {
        Self {
            resolver,
            app_origin,
        }
    }

    fn origin_for(&self, headers: &HeaderMap) -> Result<Url, Error> {
        if let Some(origin) = &self.app_origin {
            return Ok(origin.clone());
        }

        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::InvalidUrl("request has no Host header".to_string()))?;
        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("http");
        Ok(Url::parse(&format!("{}://{}", scheme, host))?)
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "framedev-web"
    }))
}

/// List frame routes
async fn list_frames_handler(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(state.resolver.list_routes())
}

/// Resolve a single frame route
async fn resolve_frame_handler(
    State(state): State<Arc<ApiState>>,
    Path(route): Path<String>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    let route = route_with_query(route, uri.query());
    let url = match state
        .origin_for(&headers)
        .and_then(|origin| frame_url(&origin, &route))
    {
        Ok(url) => url,
        Err(e) => return error_response(e),
    };

    match state.resolver.resolve_frame(&url).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn frame_action_handler(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<ActionBody>,
) -> Response {
    match state.resolver.submit_action(&body).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn frame_redirect_handler(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<ActionBody>,
) -> Response {
    match state.resolver.submit_redirect(&body).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => error_response(e),
    }
}

/// A raw route (`/frames//foo?x=1`) loses its query to the path extractor;
/// an encoded one (`%2Ffoo%3Fx%3D1`) carries it inside the segment.
fn route_with_query(route: String, query: Option<&str>) -> String {
    match query {
        Some(query) if !route.contains('?') => format!("{}?{}", route, query),
        _ => route,
    }
}

/// Network failures become 502 so clients can tell them apart from a frame
/// that answered with an error status (which is a 200 carrying that status).
fn error_response(e: Error) -> Response {
    let status = match &e {
        Error::Network(_) => StatusCode::BAD_GATEWAY,
        Error::InvalidUrl(_) | Error::InvalidInteraction(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!("resolver request failed ({}): {}", status, e);
    (
        status,
        Json(serde_json::json!({"error": e.to_string()})),
    )
        .into_response()
}

// ============================================================================
// Routes
// ============================================================================

/// Build the resolver API routes
pub fn api_routes(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/frames", get(list_frames_handler))
        .route("/frames/*route", get(resolve_frame_handler))
        .route("/action", post(frame_action_handler))
        .route("/redirect", post(frame_redirect_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::AppCredentials;
    use std::time::Duration;

    fn state(app_origin: Option<&str>) -> ApiState {
        let resolver =
            FrameResolver::new(vec![], AppCredentials::default(), Duration::from_secs(1)).unwrap();
        ApiState::new(resolver, app_origin.map(|o| Url::parse(o).unwrap()))
    }

    #[test]
    fn test_origin_prefers_configured_app_origin() {
        let state = state(Some("http://app.local:3000"));
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "devtools.local".parse().unwrap());
        assert_eq!(
            state.origin_for(&headers).unwrap().as_str(),
            "http://app.local:3000/"
        );
    }

    #[test]
    fn test_origin_from_host_header() {
        let state = state(None);
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "localhost:5173".parse().unwrap());
        headers.insert("x-forwarded-proto", "https".parse().unwrap());
        assert_eq!(
            state.origin_for(&headers).unwrap().as_str(),
            "https://localhost:5173/"
        );
    }

    #[test]
    fn test_origin_without_host_is_rejected() {
        let state = state(None);
        assert!(state.origin_for(&HeaderMap::new()).is_err());
    }

    #[test]
    fn test_route_with_query() {
        assert_eq!(route_with_query("/foo".to_string(), Some("x=1")), "/foo?x=1");
        assert_eq!(route_with_query("/foo?x=1".to_string(), Some("y=2")), "/foo?x=1");
        assert_eq!(route_with_query("/foo".to_string(), None), "/foo");
    }

    #[test]
    fn test_error_status_mapping() {
        let resp = error_response(Error::Network("refused".to_string()));
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let resp = error_response(Error::InvalidUrl("bad".to_string()));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
