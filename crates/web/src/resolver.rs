//! Frame resolver
//!
//! Performs the actual round trips against the inspected application and
//! turns each response into an [`InteractionRecord`].

use std::fmt;
use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use tracing::{debug, info, warn};
use url::Url;

use framedev_common::{
    html_to_metadata, uid, ActionBody, Error, Interaction, InteractionRecord, Metrics,
    ResponseInfo, Result, RouteEntry,
};

use crate::metrics::MetricsCollector;

/// fid used in action packets when neither the body nor the app sets one
const FALLBACK_FID: u64 = 1;

/// Credentials of the app the inspector acts as. Opaque to the resolver.
#[derive(Clone, Default)]
pub struct AppCredentials {
    pub fid: Option<u64>,
    pub mnemonic: Option<String>,
}

impl AppCredentials {
    pub fn has_signer(&self) -> bool {
        self.mnemonic.as_deref().is_some_and(|m| !m.trim().is_empty())
    }
}

impl fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCredentials")
            .field("fid", &self.fid)
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Raw upstream response plus the time it took to receive it in full.
struct Fetched {
    status: u16,
    reason: Option<&'static str>,
    location: Option<String>,
    body: Bytes,
    speed: f64,
}

/// Resolves frame routes, actions and redirects against the inspected app
pub struct FrameResolver {
    routes: Vec<RouteEntry>,
    credentials: AppCredentials,
    client: reqwest::Client,
    /// Same as `client` but never follows redirects
    redirect_client: reqwest::Client,
    metrics: MetricsCollector,
}

impl FrameResolver {
    pub fn new(
        routes: Vec<RouteEntry>,
        credentials: AppCredentials,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("http client: {}", e)))?;
        let redirect_client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| Error::InvalidConfig(format!("http client: {}", e)))?;

        info!(
            routes = routes.len(),
            fid = ?credentials.fid,
            signer = credentials.has_signer(),
            "frame resolver ready"
        );

        Ok(Self {
            routes,
            credentials,
            metrics: MetricsCollector::new(client.clone()),
            client,
            redirect_client,
        })
    }

    /// Paths of frame handlers, in registration order.
    pub fn list_routes(&self) -> Vec<String> {
        self.routes
            .iter()
            .filter(|r| r.is_frame_route())
            .map(|r| r.path.clone())
            .collect()
    }

    /// GET `frame_url` and record it as an `initial` interaction.
    pub async fn resolve_frame(&self, frame_url: &Url) -> Result<InteractionRecord> {
        debug!("resolving frame {}", frame_url);
        let fetched = self.fetch(self.client.get(frame_url.clone())).await?;

        let interaction = Interaction::Initial {
            url: frame_url.to_string(),
        };
        Ok(self.build_record(interaction, frame_url, fetched).await)
    }

    /// POST the action packet for `body` and record the returned frame.
    pub async fn submit_action(&self, body: &ActionBody) -> Result<InteractionRecord> {
        let target = post_target(body)?;
        debug!("posting action to {} (button {})", target, body.button_index);

        let request = self.client.post(target.clone()).json(&self.action_packet(body));
        let fetched = self.fetch(request).await?;

        let interaction = Interaction::Action { body: body.clone() };
        Ok(self.build_record(interaction, &target, fetched).await)
    }

    /// POST the action packet for `body` without following the redirect.
    pub async fn submit_redirect(&self, body: &ActionBody) -> Result<InteractionRecord> {
        let target = post_target(body)?;
        debug!("posting redirect to {} (button {})", target, body.button_index);

        let request = self
            .redirect_client
            .post(target.clone())
            .json(&self.action_packet(body));
        let fetched = self.fetch(request).await?;

        if fetched.location.is_none() {
            warn!(
                "redirect button on {} answered {} without a location",
                body.url, fetched.status
            );
        }

        let location = fetched
            .location
            .as_deref()
            .map(|loc| target.join(loc).map(|u| u.to_string()).unwrap_or_else(|_| loc.to_string()));
        let interaction = Interaction::Redirect {
            body: body.clone(),
            location,
        };
        Ok(self.build_record(interaction, &target, fetched).await)
    }

    async fn fetch(&self, request: reqwest::RequestBuilder) -> Result<Fetched> {
        let t0 = Instant::now();
        let response = request.send().await?;
        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;
        let speed = t0.elapsed().as_secs_f64() * 1000.0;

        Ok(Fetched {
            status: status.as_u16(),
            reason: status.canonical_reason(),
            location,
            body,
            speed,
        })
    }

    async fn build_record(
        &self,
        interaction: Interaction,
        document_url: &Url,
        fetched: Fetched,
    ) -> InteractionRecord {
        let html = String::from_utf8_lossy(&fetched.body);
        let metadata = html_to_metadata(&html, Some(document_url));

        let sizes = self
            .metrics
            .collect(&fetched.body, metadata.frame.image_url.as_deref())
            .await;

        let record = InteractionRecord::new(
            interaction,
            metadata.context,
            metadata.frame,
            Metrics {
                html_size: sizes.html_size,
                image_size: sizes.image_size,
                speed: fetched.speed,
            },
            ResponseInfo::from_status(fetched.status, fetched.reason),
        );

        info!(
            id = %record.id,
            kind = record.kind(),
            status = fetched.status,
            speed_ms = fetched.speed,
            "resolved {}",
            document_url
        );
        record
    }

    /// Unsigned frame action packet. The stored body is sent unchanged.
    fn action_packet(&self, body: &ActionBody) -> serde_json::Value {
        let fid = body.fid.or(self.credentials.fid).unwrap_or(FALLBACK_FID);
        serde_json::json!({
            "untrustedData": {
                "fid": fid,
                "url": body.url,
                "messageHash": format!("0x{}", uid()),
                "timestamp": chrono::Utc::now().timestamp_millis(),
                "network": 1,
                "buttonIndex": body.button_index,
                "inputText": body.input_text,
                "state": body.state,
                "castId": {
                    "fid": fid,
                    "hash": "0x0000000000000000000000000000000000000000",
                },
            },
            "trustedData": {
                "messageBytes": "",
            },
        })
    }
}

/// Absolute URL for `route` on `origin`. A missing leading `/` is added.
///
/// The route only replaces path and query; `//host` stays a path on `origin`.
pub fn frame_url(origin: &Url, route: &str) -> Result<Url> {
    if origin.cannot_be_a_base() {
        return Err(Error::InvalidUrl(format!("{} cannot be an app origin", origin)));
    }

    let (path, query) = match route.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (route, None),
    };

    let mut url = origin.clone();
    if path.starts_with('/') {
        url.set_path(path);
    } else {
        url.set_path(&format!("/{}", path));
    }
    url.set_query(query);
    url.set_fragment(None);
    Ok(url)
}

fn post_target(body: &ActionBody) -> Result<Url> {
    let base = Url::parse(&body.url)?;
    Ok(base.join(&body.post_url)?)
}
