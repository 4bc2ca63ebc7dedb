//! Synchronous client core for HAL hypermedia APIs.
//!
//! # Overview
//! A HAL API advertises its endpoints as named relations in the `_links` of
//! an index resource. `HalClient` loads that index once, resolves relation
//! names to URI templates, expands them with caller parameters and dispatches
//! the request through a pluggable `Transport`. Responses come back
//! classified as a `Navigator` (hal+json), a plain JSON value, or a raw
//! string.
//!
//! # Design
//! - Parameters consumed by a URI template never reappear in a command body:
//!   the expanded URL is matched back against the template to find them.
//! - Commands with files are sent as `multipart/form-data`; `FormData` parses
//!   such bodies back and is the reference for the wire format.
//! - Requests and responses are plain data (`HttpRequest`, `HttpResponse`),
//!   so every call can be inspected without a network.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod multipart;
pub mod navigator;
pub mod relations;
pub mod response;
pub mod template;
pub mod transport;

pub use client::{parse_response, HalClient};
pub use config::ClientConfig;
pub use error::HalError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
pub use multipart::{FilePart, FormData, MultipartBody, MultipartError, MultipartPart};
pub use navigator::Navigator;
pub use relations::{Link, RelationTable};
pub use response::{classify, Classified, ContentKind};
pub use template::{Params, TemplateError, UriTemplate};
pub use transport::{Transport, TransportError, UreqTransport};
