//! Relation resolution and request dispatch for HAL APIs.
//!
//! # Design
//! `HalClient` knows a single URL, the index. Every other URL is found by
//! looking a relation name up in the index's `_links` and expanding the
//! href as a URI template. The relation table is fetched on first use and
//! cached in the client, one slot for the regular index and one for the
//! public index; it is never refreshed.
//!
//! Each operation is split into a `build_*` step that produces an
//! `HttpRequest` and a dispatch step that hands it to the `Transport` and
//! classifies the `HttpResponse`. Cache mutation needs `&mut self`; sharing a
//! client between threads needs external synchronization.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::ClientConfig;
use crate::error::HalError;
use crate::http::{HttpRequest, HttpResponse, RequestBody};
use crate::multipart::{MultipartBody, MultipartPart};
use crate::relations::RelationTable;
use crate::response::{classify, Classified};
use crate::template::{Params, UriTemplate};
use crate::transport::{Transport, UreqTransport};

/// Client for a HAL API rooted at an index resource.
#[derive(Debug)]
pub struct HalClient<T = UreqTransport> {
    config: ClientConfig,
    transport: T,
    relations: Option<RelationTable>,
    public_relations: Option<RelationTable>,
}

impl HalClient<UreqTransport> {
    pub fn new(index_url: &str) -> Self {
        Self::from_config(ClientConfig::new(index_url))
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }
}

impl<T: Transport> HalClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            relations: None,
            public_relations: None,
        }
    }

    /// Seed the cache so the index is never fetched for this variant.
    pub fn with_relations(mut self, table: RelationTable, is_public: bool) -> Self {
        self.set_relations(table, is_public);
        self
    }

    pub fn set_relations(&mut self, table: RelationTable, is_public: bool) {
        *self.slot_mut(is_public) = Some(table);
    }

    /// The cached table, if the index has been loaded.
    pub fn relations(&self, is_public: bool) -> Option<&RelationTable> {
        if is_public {
            self.public_relations.as_ref()
        } else {
            self.relations.as_ref()
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The href of `relation`, loading the index on first use.
    pub fn resolve(&mut self, relation: &str, is_public: bool) -> Result<String, HalError> {
        let table = self.load_relations(is_public)?;
        table.href(relation).map(str::to_string)
    }

    pub fn build_query(&mut self, relation: &str, params: &Params, is_public: bool) -> Result<HttpRequest, HalError> {
        let template = self.template(relation, is_public)?;
        Ok(HttpRequest::get(template.expand(params)))
    }

    /// Build the POST for `relation`. Parameters consumed by the URI template
    /// are left out of the body. Without `files` the body is the remaining
    /// parameters as JSON; otherwise a multipart body with the files first and
    /// one field per remaining parameter.
    pub fn build_command(
        &mut self,
        relation: &str,
        params: &Params,
        files: Vec<MultipartPart>,
    ) -> Result<HttpRequest, HalError> {
        let template = self.template(relation, false)?;
        let url = template.expand(params);
        let consumed = template.extract_for(&url, params);
        let remaining: Params = params
            .iter()
            .filter(|(name, _)| !consumed.contains_key(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let body = if files.is_empty() {
            RequestBody::Json(serde_json::to_string(&remaining)?)
        } else {
            let mut parts = files;
            parts.extend(
                remaining
                    .iter()
                    .map(|(name, value)| MultipartPart::field(name.as_str(), field_text(value))),
            );
            RequestBody::Multipart(MultipartBody::new(parts))
        };
        Ok(HttpRequest::post(url, body))
    }

    /// GET `relation` and classify the response.
    pub fn query(&mut self, relation: &str, params: &Params, is_public: bool) -> Result<Classified, HalError> {
        let request = self.build_query(relation, params, is_public)?;
        let response = send(&self.transport, &request)?;
        parse_response(&response)
    }

    /// GET `relation` and return the body untouched.
    pub fn get_file(&mut self, relation: &str, params: &Params) -> Result<Vec<u8>, HalError> {
        let request = self.build_query(relation, params, false)?;
        Ok(send(&self.transport, &request)?.body)
    }

    /// POST to `relation`. Each `(field, path)` in `files` is uploaded under
    /// `field` with the basename of `path` as filename.
    pub fn command(&mut self, relation: &str, params: &Params, files: &[(&str, &Path)]) -> Result<Classified, HalError> {
        let parts = files
            .iter()
            .map(|(name, path)| read_file_part(name, path))
            .collect::<Result<Vec<_>, _>>()?;
        self.command_with_parts(relation, params, parts)
    }

    /// Like `command`, with file parts already in memory.
    pub fn command_with_parts(
        &mut self,
        relation: &str,
        params: &Params,
        files: Vec<MultipartPart>,
    ) -> Result<Classified, HalError> {
        let request = self.build_command(relation, params, files)?;
        let response = send(&self.transport, &request)?;
        parse_response(&response)
    }

    fn template(&mut self, relation: &str, is_public: bool) -> Result<UriTemplate, HalError> {
        let href = self.resolve(relation, is_public)?;
        Ok(UriTemplate::parse(&href)?)
    }

    fn load_relations(&mut self, is_public: bool) -> Result<&RelationTable, HalError> {
        let table = match self.slot_mut(is_public).take() {
            Some(table) => {
                trace!(is_public, "relation cache hit");
                table
            }
            None => fetch_index(&self.transport, &self.config, is_public)?,
        };
        let table: &RelationTable = self.slot_mut(is_public).insert(table);
        Ok(table)
    }

    fn slot_mut(&mut self, is_public: bool) -> &mut Option<RelationTable> {
        if is_public {
            &mut self.public_relations
        } else {
            &mut self.relations
        }
    }
}

/// Classify a successful response by its content type.
pub fn parse_response(response: &HttpResponse) -> Result<Classified, HalError> {
    classify(response.content_type(), &response.body)
}

fn fetch_index<T: Transport>(transport: &T, config: &ClientConfig, is_public: bool) -> Result<RelationTable, HalError> {
    let url = config.index_url(is_public);
    debug!(%url, is_public, "loading relations from index");
    let response = send(transport, &HttpRequest::get(url))?;
    let table = RelationTable::from_index(&response.body)?;
    debug!(relations = table.len(), "relations loaded");
    Ok(table)
}

fn send<T: Transport>(transport: &T, request: &HttpRequest) -> Result<HttpResponse, HalError> {
    debug!(method = request.method.as_str(), url = %request.url, "sending request");
    let response = transport.execute(request).map_err(|e| {
        warn!(url = %request.url, error = %e, "request failed");
        HalError::Upstream {
            status: None,
            body: e.to_string(),
        }
    })?;
    check_status(response)
}

/// Map non-success status codes to `HalError::Upstream`.
fn check_status(response: HttpResponse) -> Result<HttpResponse, HalError> {
    if response.is_success() {
        return Ok(response);
    }
    warn!(status = response.status, "upstream returned an error status");
    Err(HalError::Upstream {
        status: Some(response.status),
        body: String::from_utf8_lossy(&response.body).into_owned(),
    })
}

fn read_file_part(name: &str, path: &Path) -> Result<MultipartPart, HalError> {
    let content = std::fs::read(path).map_err(|source| HalError::File {
        path: path.to_path_buf(),
        source,
    })?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(MultipartPart::file(name, filename, content))
}

/// Multipart fields carry strings verbatim and other values as JSON text.
fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
