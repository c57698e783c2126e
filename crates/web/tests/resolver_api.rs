//! Resolver API tests
//!
//! Runs the devtools router against a local frame application bound to an
//! ephemeral port.

use std::time::Duration;

use axum::{
    body::Body,
    extract::RawQuery,
    http::{header, Request, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use tower::util::ServiceExt;
use url::Url;

use framedev_common::{ActionBody, ButtonAction, HttpMethod, Interaction, InteractionRecord, RouteEntry};
use framedev_web::{devtools, DevtoolsOptions};

const IMAGE_BYTES: usize = 1234;

fn frame_html(state: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta property="fc:frame" content="vNext">
    <meta property="fc:frame:image" content="/image.png">
    <meta property="fc:frame:post_url" content="/">
    <meta property="fc:frame:state" content="{state}">
    <meta property="fc:frame:button:1" content="Next">
    <meta property="fc:frame:button:2" content="Leave">
    <meta property="fc:frame:button:2:action" content="post_redirect">
    <meta property="fc:frame:button:2:post_url" content="/redirect">
  </head>
  <body></body>
</html>"#
    )
}

fn upstream_app() -> Router {
    Router::new()
        .route(
            "/",
            get(|| async { Html(frame_html("initial")) }).post(
                |Json(packet): Json<serde_json::Value>| async move {
                    let button = packet["untrustedData"]["buttonIndex"].as_u64().unwrap_or(0);
                    let text = packet["untrustedData"]["inputText"].as_str().unwrap_or("");
                    Html(frame_html(&format!("button-{}-{}", button, text)))
                },
            ),
        )
        .route(
            "/image.png",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "image/png")],
                    vec![0u8; IMAGE_BYTES],
                )
            }),
        )
        .route(
            "/echo",
            get(|RawQuery(query): RawQuery| async move {
                Html(frame_html(&query.unwrap_or_default()))
            }),
        )
        .route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, Html("<html>nope</html>")).into_response() }),
        )
        .route(
            "/redirect",
            axum::routing::post(|| async {
                (
                    StatusCode::FOUND,
                    [(header::LOCATION, "https://example.com/out")],
                )
            }),
        )
}

async fn spawn_upstream() -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream_app()).await.unwrap();
    });
    Url::parse(&format!("http://{}", addr)).unwrap()
}

fn route_table() -> Vec<RouteEntry> {
    vec![
        RouteEntry {
            path: "/*".to_string(),
            method: "ALL".to_string(),
            is_middleware: true,
        },
        RouteEntry::frame("/"),
        RouteEntry {
            path: "/image.png".to_string(),
            method: "GET".to_string(),
            is_middleware: false,
        },
        RouteEntry::frame("/foo"),
    ]
}

fn inspector(app_origin: Url) -> Router {
    let options = DevtoolsOptions {
        app_origin: Some(app_origin),
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    };
    devtools(Router::new(), route_table(), options).unwrap()
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_json(app: Router, uri: &str, body: &ActionBody) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn lists_only_frame_routes() {
    let origin = spawn_upstream().await;
    let (status, json) = get_json(inspector(origin), "/dev/api/frames").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!(["/", "/foo"]));
}

#[tokio::test]
async fn resolves_root_route_as_initial_record() {
    let origin = spawn_upstream().await;
    let (status, json) = get_json(inspector(origin.clone()), "/dev/api/frames//").await;
    assert_eq!(status, StatusCode::OK);

    let record: InteractionRecord = serde_json::from_value(json.clone()).unwrap();
    assert_eq!(json["type"], "initial");
    assert_eq!(record.method, HttpMethod::Get);
    assert_eq!(record.response.status, 200);
    assert_eq!(record.response.status_text, "OK");
    assert_eq!(
        record.frame.image_url.as_deref(),
        Some(origin.join("/image.png").unwrap().as_str())
    );
    assert_eq!(record.frame.buttons.len(), 2);
    assert_eq!(record.frame.buttons[1].action, ButtonAction::PostRedirect);
    assert_eq!(record.context.route.as_deref(), Some("/"));
    assert_eq!(record.metrics.html_size, frame_html("initial").len() as u64);
    assert_eq!(record.metrics.image_size, IMAGE_BYTES as u64);
    assert!(record.metrics.speed >= 0.0);
    assert_eq!(
        record.interaction,
        Interaction::Initial {
            url: origin.join("/").unwrap().to_string()
        }
    );
}

#[tokio::test]
async fn encoded_route_resolves_the_same_path() {
    let origin = spawn_upstream().await;
    let (status, json) = get_json(inspector(origin.clone()), "/dev/api/frames/%2F").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["url"], origin.join("/").unwrap().as_str());
}

#[tokio::test]
async fn raw_route_keeps_its_query() {
    let origin = spawn_upstream().await;
    let (status, json) = get_json(inspector(origin.clone()), "/dev/api/frames//echo?x=1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["url"], origin.join("/echo?x=1").unwrap().as_str());
    assert_eq!(json["frame"]["state"], "x=1");
}

#[tokio::test]
async fn double_slash_route_stays_on_app_origin() {
    let origin = spawn_upstream().await;
    let (status, json) = get_json(inspector(origin.clone()), "/dev/api/frames/%2F%2Fecho").await;

    assert_eq!(status, StatusCode::OK);
    let url = Url::parse(json["url"].as_str().unwrap()).unwrap();
    assert_eq!(url.host_str(), origin.host_str());
    assert_eq!(url.port(), origin.port());
    assert_eq!(url.path(), "//echo");
}

#[tokio::test]
async fn upstream_error_status_is_an_observation() {
    let origin = spawn_upstream().await;
    let (status, json) = get_json(inspector(origin), "/dev/api/frames/%2Fmissing").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["response"]["status"], 404);
    assert_eq!(json["response"]["statusText"], "Not Found");
    assert!(json["frame"]["imageUrl"].is_null());
}

#[tokio::test]
async fn unreachable_app_is_a_resolver_failure() {
    // Bind then drop to get a port nobody is listening on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let origin = Url::parse(&format!("http://{}", addr)).unwrap();
    let (status, json) = get_json(inspector(origin), "/dev/api/frames//").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"].as_str().unwrap().contains("Network error"));
}

#[tokio::test]
async fn action_posts_stored_body() {
    let origin = spawn_upstream().await;
    let body = ActionBody {
        url: origin.join("/").unwrap().to_string(),
        post_url: "/".to_string(),
        button_index: 1,
        input_text: Some("gm".to_string()),
        state: Some("initial".to_string()),
        fid: None,
    };

    let (status, json) = post_json(inspector(origin), "/dev/api/action", &body).await;
    assert_eq!(status, StatusCode::OK);

    let record: InteractionRecord = serde_json::from_value(json).unwrap();
    assert_eq!(record.method, HttpMethod::Post);
    assert_eq!(record.interaction, Interaction::Action { body });
    assert_eq!(record.frame.state.as_deref(), Some("button-1-gm"));
    assert_eq!(record.metrics.image_size, IMAGE_BYTES as u64);
}

#[tokio::test]
async fn redirect_records_location_without_following() {
    let origin = spawn_upstream().await;
    let body = ActionBody {
        url: origin.join("/").unwrap().to_string(),
        post_url: "/redirect".to_string(),
        button_index: 2,
        input_text: None,
        state: None,
        fid: Some(3),
    };

    let (status, json) = post_json(inspector(origin), "/dev/api/redirect", &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["type"], "redirect");
    assert_eq!(json["method"], "post");
    assert_eq!(json["response"]["status"], 302);
    assert_eq!(json["location"], "https://example.com/out");
}

#[tokio::test]
async fn health_endpoint() {
    let origin = spawn_upstream().await;
    let (status, json) = get_json(inspector(origin), "/dev/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["service"], "framedev-web");
}
