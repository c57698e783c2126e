//! Devtools mount and standalone server

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{OriginalUri, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;
use url::Url;

use framedev_common::{Error, Result, RouteEntry, DEFAULT_BASE_PATH};

use crate::api::{api_routes, ApiState};
use crate::config::DevtoolsConfig;
use crate::resolver::{AppCredentials, FrameResolver};

/// Options for mounting the devtools onto an application router
#[derive(Debug, Clone)]
pub struct DevtoolsOptions {
    pub credentials: AppCredentials,
    /// Mount point, defaults to `/dev`
    pub base_path: String,
    /// Public path the UI bundle is served under
    pub assets_path: Option<String>,
    /// Directory served as the UI bundle
    pub assets_dir: Option<PathBuf>,
    /// Origin of the inspected application (request origin when unset)
    pub app_origin: Option<Url>,
    pub request_timeout: Duration,
}

impl Default for DevtoolsOptions {
    fn default() -> Self {
        Self {
            credentials: AppCredentials::default(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            assets_path: None,
            assets_dir: None,
            app_origin: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl TryFrom<&DevtoolsConfig> for DevtoolsOptions {
    type Error = Error;

    fn try_from(cfg: &DevtoolsConfig) -> Result<Self> {
        let app_origin = cfg.app_origin.as_deref().map(Url::parse).transpose()?;
        Ok(Self {
            credentials: cfg.credentials(),
            base_path: cfg.base_path.clone(),
            assets_path: cfg.assets_path.clone(),
            assets_dir: cfg.assets_dir.clone(),
            app_origin,
            request_timeout: cfg.request_timeout(),
        })
    }
}

#[derive(Clone)]
struct ShellState {
    public_path: String,
}

/// Mount the devtools (shell page, resolver API, UI bundle) under
/// `options.base_path` of `app`.
pub fn devtools(app: Router, routes: Vec<RouteEntry>, options: DevtoolsOptions) -> Result<Router> {
    let base_path = normalize_base_path(&options.base_path)?;

    let resolver = FrameResolver::new(routes, options.credentials, options.request_timeout)?;
    let api_state = Arc::new(ApiState::new(resolver, options.app_origin));

    let public_path = match (&options.assets_path, &options.assets_dir) {
        (Some(path), _) => path.trim_end_matches('/').to_string(),
        (None, Some(_)) => base_path.clone(),
        (None, None) => String::new(),
    };

    let mut dev = Router::new()
        .route("/", get(shell_handler))
        .with_state(ShellState { public_path })
        .nest("/api", api_routes(api_state));

    if let Some(dir) = options.assets_dir {
        info!("serving devtools assets from {}", dir.display());
        dev = dev.fallback_service(ServeDir::new(dir));
    }

    info!("devtools mounted at {}", base_path);
    Ok(app.nest(&base_path, dev))
}

/// Mount points must be absolute and cannot be the root.
fn normalize_base_path(path: &str) -> Result<String> {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() || !trimmed.starts_with('/') {
        return Err(Error::InvalidConfig(format!(
            "base_path must be an absolute, non-root path, got {:?}",
            path
        )));
    }
    Ok(trimmed.to_string())
}

/// HTML shell the UI bundle boots from
async fn shell_handler(
    State(shell): State<ShellState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> impl IntoResponse {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let base_url = format!("http://{}{}", host, uri);
    // Script-safe string literal
    let base_url = serde_json::to_string(&base_url)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace('<', "\\u003c");

    let public_path = &shell.public_path;
    let page = format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>framedev</title>
    <script type="module">globalThis.__FRAMEDEV_BASE_URL__ = {base_url}</script>
    <script type="module" crossorigin="" src="{public_path}/main.js"></script>
    <link rel="stylesheet" crossorigin="" href="{public_path}/assets/main.css" />
  </head>
  <body>
    <div id="root"></div>
  </body>
</html>"#
    );
    (StatusCode::OK, Html(page))
}

/// Run the standalone devtools server described by `cfg`
pub async fn serve(cfg: DevtoolsConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = cfg.listen_addr()?;
    let options = DevtoolsOptions::try_from(&cfg)?;

    let router = devtools(Router::new(), cfg.routes.clone(), options)?
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http());

    info!(
        "framedev listening on http://{}{} (app: {})",
        addr,
        cfg.base_path,
        cfg.app_origin.as_deref().unwrap_or("request origin")
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
