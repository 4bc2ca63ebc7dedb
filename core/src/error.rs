//! Error types for the HAL client.
//!
//! # Design
//! Every call either fully succeeds or fails with exactly one `HalError`.
//! Transport failures and non-2xx responses both land in `Upstream` so callers
//! never see transport-specific error types. Nothing here is retried.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::template::TemplateError;

/// Errors returned by `HalClient` operations.
#[derive(Debug, Error)]
pub enum HalError {
    /// The relation is not advertised by the index resource.
    #[error("relation {0} not found")]
    UnknownRelation(String),

    /// The server answered with a non-2xx status, or the request never got a
    /// response at all (`status` is `None`, `body` holds the transport message).
    #[error("upstream error ({}): {body}", describe_status(.status))]
    Upstream { status: Option<u16>, body: String },

    /// A body declared as JSON could not be decoded, or a JSON payload could
    /// not be encoded.
    #[error("malformed JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// The relation's href is not a valid URI template.
    #[error("invalid URI template: {0}")]
    InvalidTemplate(#[from] TemplateError),

    /// A file attached to a command could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn describe_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {code}"),
        None => "no response".to_string(),
    }
}

impl HalError {
    /// HTTP status of an `Upstream` error, if the server responded.
    pub fn status(&self) -> Option<u16> {
        match self {
            HalError::Upstream { status, .. } => *status,
            _ => None,
        }
    }
}
