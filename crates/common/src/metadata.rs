//! Frame metadata extraction
//!
//! Turns a raw HTML document into the `(context, frame)` pair shown by the
//! inspector. Extraction never fails: a page without frame tags produces
//! empty defaults so the caller can still display something.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tracing::debug;
use url::Url;

use crate::types::{ButtonAction, Frame, FrameButton, FrameContext, FrameInput};

/// Maximum number of buttons a frame may declare
pub const MAX_BUTTONS: u8 = 4;

const DEFAULT_ASPECT_RATIO: &str = "1.91:1";

// Attribute list that tolerates `>` inside quoted values.
const ATTRS: &str = r#"((?:\s+[^\s=/>]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?)*)\s*/?>"#;

static META_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("(?i)<meta{ATTRS}")).expect("valid meta regex"));

static BASE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("(?i)<base{ATTRS}")).expect("valid base regex"));

static ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s=/>]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .expect("valid attribute regex")
});

static TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title regex"));

/// Extracted protocol metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub context: FrameContext,
    pub frame: Frame,
}

/// Parse `html`, resolving relative URLs against the document's declared base.
///
/// The base is `<base href>`, then `og:url`, then `document_url`.
pub fn html_to_metadata(html: &str, document_url: Option<&Url>) -> Metadata {
    let properties = meta_properties(html);
    let base = document_base(html, &properties, document_url);

    let frame = properties_to_frame(html, &properties, base.as_ref());

    let app = properties.get("frog:context").and_then(|raw| {
        serde_json::from_str::<serde_json::Value>(raw)
            .map_err(|e| debug!("ignoring unparseable frog:context: {}", e))
            .ok()
    });

    let context = FrameContext {
        url: document_url.map(|u| u.to_string()),
        route: document_url.map(|u| u.path().to_string()),
        post_url: frame
            .post_url
            .as_deref()
            .map(|p| resolve(base.as_ref(), p)),
        app,
    };

    Metadata { context, frame }
}

fn properties_to_frame(
    html: &str,
    properties: &HashMap<String, String>,
    base: Option<&Url>,
) -> Frame {
    let prop = |key: &str| properties.get(key).cloned();

    let image_url = prop("fc:frame:image")
        .or_else(|| prop("og:image"))
        .map(|img| resolve(base, &img));

    let mut buttons = Vec::new();
    for index in 1..=MAX_BUTTONS {
        let Some(title) = prop(&format!("fc:frame:button:{index}")) else {
            continue;
        };
        let action = match prop(&format!("fc:frame:button:{index}:action")) {
            None => ButtonAction::default(),
            Some(raw) => ButtonAction::parse(&raw).unwrap_or_else(|| {
                debug!("unknown action {:?} on button {}, treating as post", raw, index);
                ButtonAction::default()
            }),
        };
        buttons.push(FrameButton {
            index,
            title,
            action,
            target: prop(&format!("fc:frame:button:{index}:target")),
            post_url: prop(&format!("fc:frame:button:{index}:post_url")),
        });
    }

    let version = prop("fc:frame");
    let is_frame = version.is_some() || prop("fc:frame:image").is_some();
    let image_aspect_ratio = prop("fc:frame:image:aspect_ratio")
        .or_else(|| is_frame.then(|| DEFAULT_ASPECT_RATIO.to_string()));

    let title = prop("og:title").or_else(|| {
        TITLE
            .captures(html)
            .map(|c| decode_entities(c[1].trim()))
            .filter(|t| !t.is_empty())
    });

    Frame {
        version,
        image_url,
        image_aspect_ratio,
        buttons,
        input: prop("fc:frame:input:text").map(|text| FrameInput { text }),
        post_url: prop("fc:frame:post_url"),
        state: prop("fc:frame:state"),
        title,
    }
}

/// Collect `property`/`name` → `content` pairs. First declaration wins.
fn meta_properties(html: &str) -> HashMap<String, String> {
    let mut properties = HashMap::new();
    for tag in META_TAG.captures_iter(html) {
        let attrs = parse_attributes(&tag[1]);
        let key = attrs.get("property").or_else(|| attrs.get("name"));
        if let (Some(key), Some(content)) = (key, attrs.get("content")) {
            properties
                .entry(key.clone())
                .or_insert_with(|| content.clone());
        }
    }
    properties
}

fn parse_attributes(raw: &str) -> HashMap<String, String> {
    ATTR.captures_iter(raw)
        .map(|c| {
            let value = c
                .get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map(|m| decode_entities(m.as_str()))
                .unwrap_or_default();
            (c[1].to_ascii_lowercase(), value)
        })
        .collect()
}

fn document_base(
    html: &str,
    properties: &HashMap<String, String>,
    document_url: Option<&Url>,
) -> Option<Url> {
    let declared = BASE_TAG
        .captures(html)
        .and_then(|c| parse_attributes(&c[1]).remove("href"))
        .and_then(|href| match document_url {
            Some(doc) => doc.join(&href).ok(),
            None => Url::parse(&href).ok(),
        });

    declared
        .or_else(|| properties.get("og:url").and_then(|u| Url::parse(u).ok()))
        .or_else(|| document_url.cloned())
}

/// Absolute URLs pass through; relative ones are joined onto `base` when known.
fn resolve(base: Option<&Url>, value: &str) -> String {
    if Url::parse(value).is_ok() {
        return value.to_string();
    }
    base.and_then(|b| b.join(value).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| value.to_string())
}

/// Decode the character references that show up in attribute values.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail
            .find(';')
            .filter(|end| *end <= 10)
            .and_then(|end| decode_reference(&tail[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}
