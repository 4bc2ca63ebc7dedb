//! Classification of response bodies by content type.
//!
//! # Design
//! The content type maps to a closed `ContentKind` through one exhaustive
//! function, so a new media type needs an explicit decision instead of
//! falling through. An empty body is always `Raw("")`, whatever the server
//! declared (e.g. a 204 that still carries `Content-Type: application/json`).

use serde_json::Value;

use crate::error::HalError;
use crate::navigator::Navigator;

const HAL_JSON: &str = "application/hal+json";
const JSON: &str = "application/json";

/// How a response body is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Hypermedia,
    PlainJson,
    Raw,
}

impl ContentKind {
    /// Media type comparison ignores parameters such as `charset` and ASCII
    /// case.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let essence = content_type
            .and_then(|value| value.split(';').next())
            .map(str::trim)
            .unwrap_or_default();
        if essence.eq_ignore_ascii_case(HAL_JSON) {
            ContentKind::Hypermedia
        } else if essence.eq_ignore_ascii_case(JSON) {
            ContentKind::PlainJson
        } else {
            ContentKind::Raw
        }
    }
}

/// A classified response.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Hypermedia(Navigator),
    Json(Value),
    /// The body as text. Bytes that are not valid UTF-8 are replaced with
    /// U+FFFD; use `HalClient::get_file` for the exact bytes.
    Raw(String),
}

impl Classified {
    pub fn as_navigator(&self) -> Option<&Navigator> {
        match self {
            Classified::Hypermedia(nav) => Some(nav),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Classified::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Classified::Raw(body) => Some(body),
            _ => None,
        }
    }

    /// True for an empty raw body.
    pub fn is_empty(&self) -> bool {
        matches!(self, Classified::Raw(body) if body.is_empty())
    }
}

pub fn classify(content_type: Option<&str>, body: &[u8]) -> Result<Classified, HalError> {
    if body.is_empty() {
        return Ok(Classified::Raw(String::new()));
    }
    match ContentKind::from_content_type(content_type) {
        ContentKind::Hypermedia => Ok(Classified::Hypermedia(Navigator::new(serde_json::from_slice(body)?))),
        ContentKind::PlainJson => Ok(Classified::Json(serde_json::from_slice(body)?)),
        ContentKind::Raw => Ok(Classified::Raw(String::from_utf8_lossy(body).into_owned())),
    }
}
