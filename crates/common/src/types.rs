//! Core types for framedev

use serde::{Deserialize, Serialize};

use crate::uid::uid;

/// HTTP verb that produced an interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
}

/// The three interaction kinds, each carrying what is needed to replay it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Interaction {
    /// Plain GET of a frame document.
    Initial { url: String },
    /// Button press answered with another frame.
    Action { body: ActionBody },
    /// Button press answered with a navigation instruction.
    Redirect {
        body: ActionBody,
        location: Option<String>,
    },
}

impl Interaction {
    pub fn method(&self) -> HttpMethod {
        match self {
            Interaction::Initial { .. } => HttpMethod::Get,
            Interaction::Action { .. } | Interaction::Redirect { .. } => HttpMethod::Post,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Interaction::Initial { .. } => "initial",
            Interaction::Action { .. } => "action",
            Interaction::Redirect { .. } => "redirect",
        }
    }

    /// URL of the frame document the interaction started from.
    pub fn frame_url(&self) -> &str {
        match self {
            Interaction::Initial { url } => url,
            Interaction::Action { body } | Interaction::Redirect { body, .. } => &body.url,
        }
    }
}

/// Payload of an action or redirect submission, stored verbatim for replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionBody {
    /// Frame document the button belongs to
    pub url: String,
    /// Target the packet is posted to (may be relative to `url`)
    pub post_url: String,
    /// 1-based button index
    pub button_index: u8,
    #[serde(default)]
    pub input_text: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub fid: Option<u64>,
}

/// Unit of navigation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: String,
    /// Epoch milliseconds
    pub timestamp: i64,
    #[serde(flatten)]
    pub interaction: Interaction,
    pub method: HttpMethod,
    pub context: FrameContext,
    pub frame: Frame,
    pub metrics: Metrics,
    pub response: ResponseInfo,
}

impl InteractionRecord {
    /// Build a record with a fresh id and the current time.
    pub fn new(
        interaction: Interaction,
        context: FrameContext,
        frame: Frame,
        metrics: Metrics,
        response: ResponseInfo,
    ) -> Self {
        Self {
            id: uid(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            method: interaction.method(),
            interaction,
            context,
            frame,
            metrics,
            response,
        }
    }

    /// Re-key a freshly replayed record so it occupies an existing history slot.
    pub fn into_slot(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn kind(&self) -> &'static str {
        self.interaction.kind()
    }
}

/// Parsed frame fields. Missing tags stay `None` and serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub version: Option<String>,
    /// Absolute when a base URL was known
    pub image_url: Option<String>,
    pub image_aspect_ratio: Option<String>,
    #[serde(default)]
    pub buttons: Vec<FrameButton>,
    pub input: Option<FrameInput>,
    pub post_url: Option<String>,
    pub state: Option<String>,
    pub title: Option<String>,
}

impl Frame {
    /// Whether the document declared any frame tags at all.
    pub fn is_present(&self) -> bool {
        self.version.is_some() || self.image_url.is_some() || !self.buttons.is_empty()
    }

    pub fn button(&self, index: u8) -> Option<&FrameButton> {
        self.buttons.iter().find(|b| b.index == index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameButton {
    /// 1-based position
    pub index: u8,
    pub title: String,
    #[serde(rename = "type")]
    pub action: ButtonAction,
    pub target: Option<String>,
    pub post_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    #[default]
    Post,
    PostRedirect,
    Link,
    Mint,
    Tx,
}

impl ButtonAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "post" => Some(Self::Post),
            "post_redirect" => Some(Self::PostRedirect),
            "link" => Some(Self::Link),
            "mint" => Some(Self::Mint),
            "tx" => Some(Self::Tx),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameInput {
    pub text: String,
}

/// Metadata around the frame that is not part of what gets rendered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameContext {
    /// Absolute URL the document was fetched from
    pub url: Option<String>,
    /// Path of `url` on the inspected application
    pub route: Option<String>,
    /// Absolute post target declared by the frame
    pub post_url: Option<String>,
    /// Application supplied context (`frog:context` JSON)
    pub app: Option<serde_json::Value>,
}

/// Observational measurements. Never used for control flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// Bytes of the decoded HTML body
    pub html_size: u64,
    /// Bytes of the frame image, 0 when unknown
    pub image_size: u64,
    /// Milliseconds for the upstream round trip
    pub speed: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseInfo {
    pub status: u16,
    pub status_text: String,
}

impl ResponseInfo {
    pub fn from_status(status: u16, reason: Option<&str>) -> Self {
        Self {
            status,
            status_text: reason.unwrap_or_default().to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One entry of the route table handed to the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub path: String,
    #[serde(default = "default_route_method")]
    pub method: String,
    #[serde(default)]
    pub is_middleware: bool,
}

fn default_route_method() -> String {
    "ALL".to_string()
}

impl RouteEntry {
    pub fn frame(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: default_route_method(),
            is_middleware: false,
        }
    }

    /// Frame handlers are registered for every method and are not middleware.
    pub fn is_frame_route(&self) -> bool {
        !self.is_middleware && self.method == "ALL"
    }
}
