//! `multipart/form-data` encoding and decoding.
//!
//! # Design
//! `MultipartBody` renders parts to the wire format: a `--boundary` line per
//! part, its headers, an empty line, the raw content, and a final
//! `--boundary--` line, all CRLF-separated.
//!
//! `FormData::parse` is the inverse. It is a line-oriented state machine
//! (`SeekBoundary` → `ReadHeaders` → `ReadBody`) driven by an index into the
//! CRLF-split body. Each pass consumes exactly one part and leaves the cursor
//! on the next boundary line; parsing stops as soon as the terminator is
//! consumed. Any deviation is fatal, there is no best-effort decoding.
//!
//! Part names and filenames are percent-escaped on the wire (`"` as `%22`,
//! CR as `%0D`, LF as `%0A`) and decoded verbatim, so such names come back
//! escaped.

use std::collections::BTreeMap;

use thiserror::Error;
use uuid::Uuid;

const CRLF: &[u8] = b"\r\n";

/// A single part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartPart {
    Field {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        content_type: String,
        content: Vec<u8>,
    },
}

impl MultipartPart {
    pub fn field(name: impl Into<String>, value: impl Into<String>) -> Self {
        MultipartPart::Field {
            name: name.into(),
            value: value.into(),
        }
    }

    /// A file part whose content type is guessed from `filename`.
    pub fn file(name: impl Into<String>, filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        let filename = filename.into();
        let content_type = mime_guess::from_path(&filename)
            .first()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        MultipartPart::File {
            name: name.into(),
            filename,
            content_type,
            content: content.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            MultipartPart::Field { name, .. } | MultipartPart::File { name, .. } => name,
        }
    }
}

/// An ordered list of parts plus the boundary that separates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    boundary: String,
    parts: Vec<MultipartPart>,
}

impl MultipartBody {
    /// Body with a fresh random boundary.
    pub fn new(parts: Vec<MultipartPart>) -> Self {
        Self::with_boundary(generate_boundary(), parts)
    }

    pub fn with_boundary(boundary: impl Into<String>, parts: Vec<MultipartPart>) -> Self {
        Self {
            boundary: boundary.into(),
            parts,
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn parts(&self) -> &[MultipartPart] {
        &self.parts
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for part in &self.parts {
            out.extend_from_slice(b"--");
            out.extend_from_slice(self.boundary.as_bytes());
            out.extend_from_slice(CRLF);
            match part {
                MultipartPart::Field { name, value } => {
                    let disposition = format!("Content-Disposition: form-data; name=\"{}\"", escape_quoted(name));
                    out.extend_from_slice(disposition.as_bytes());
                    out.extend_from_slice(CRLF);
                    out.extend_from_slice(CRLF);
                    out.extend_from_slice(value.as_bytes());
                }
                MultipartPart::File {
                    name,
                    filename,
                    content_type,
                    content,
                } => {
                    let disposition = format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"",
                        escape_quoted(name),
                        escape_quoted(filename)
                    );
                    out.extend_from_slice(disposition.as_bytes());
                    out.extend_from_slice(CRLF);
                    out.extend_from_slice(format!("Content-Type: {content_type}").as_bytes());
                    out.extend_from_slice(CRLF);
                    out.extend_from_slice(CRLF);
                    out.extend_from_slice(content);
                }
            }
            out.extend_from_slice(CRLF);
        }
        out.extend_from_slice(b"--");
        out.extend_from_slice(self.boundary.as_bytes());
        out.extend_from_slice(b"--");
        out.extend_from_slice(CRLF);
        out
    }
}

/// Boundary token built from a v4 UUID, unlikely to occur in any content.
pub fn generate_boundary() -> String {
    format!("------------------------{}", Uuid::new_v4().simple())
}

/// Extract the `boundary` parameter from a `multipart/form-data` content type.
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.trim().split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("boundary")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}

// Quotes and line breaks would terminate the header early. Not undone by
// `FormData::parse`.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Errors raised while decoding a multipart body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MultipartError {
    /// A boundary line was expected but something else (or nothing) was found.
    #[error("expected boundary, got {0:?}")]
    MissingBoundary(String),

    #[error("missing Content-Disposition header")]
    MissingContentDisposition,

    #[error("wrong Content-Disposition header: {0}")]
    InvalidDisposition(String),

    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),
}

/// A file recovered from a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub filename: String,
    pub content_type: Option<String>,
    pub content: Vec<u8>,
}

/// Fields and files decoded from a multipart body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pub fields: BTreeMap<String, String>,
    pub files: BTreeMap<String, FilePart>,
}

enum State {
    SeekBoundary,
    ReadHeaders,
    ReadBody(Disposition, Option<String>),
    Done,
}

enum Disposition {
    Field { name: String },
    File { name: String, filename: String },
}

impl FormData {
    /// Decode a body produced by `MultipartBody::encode`. The boundary token is
    /// taken from the first line.
    pub fn parse(body: &[u8]) -> Result<Self, MultipartError> {
        let lines = split_lines(body);
        let first = lines.first().copied().unwrap_or_default();
        let token = first
            .strip_prefix(b"--")
            .ok_or_else(|| MultipartError::MissingBoundary(lossy(first)))?;
        // Tokens may end in `-`, so only a lone first line is read as the
        // terminator of an empty form.
        let lone = lines.iter().skip(1).all(|line| line.is_empty());
        let token = match token.strip_suffix(b"--") {
            Some(bare) if lone => bare,
            _ => token,
        };
        Parser::new(lines, token).run()
    }
}

struct Parser<'a> {
    lines: Vec<&'a [u8]>,
    cursor: usize,
    start: Vec<u8>,
    end: Vec<u8>,
}

impl<'a> Parser<'a> {
    fn new(lines: Vec<&'a [u8]>, token: &[u8]) -> Self {
        let mut start = b"--".to_vec();
        start.extend_from_slice(token);
        let mut end = start.clone();
        end.extend_from_slice(b"--");
        Self {
            lines,
            cursor: 0,
            start,
            end,
        }
    }

    fn run(mut self) -> Result<FormData, MultipartError> {
        let mut form = FormData::default();
        let mut state = State::SeekBoundary;
        loop {
            state = match state {
                State::SeekBoundary => self.seek_boundary()?,
                State::ReadHeaders => self.read_headers()?,
                State::ReadBody(disposition, content_type) => {
                    let content = self.read_body()?;
                    match disposition {
                        Disposition::Field { name } => {
                            form.fields.insert(name, String::from_utf8_lossy(&content).into_owned());
                        }
                        Disposition::File { name, filename } => {
                            form.files.insert(
                                name,
                                FilePart {
                                    filename,
                                    content_type,
                                    content,
                                },
                            );
                        }
                    }
                    State::SeekBoundary
                }
                State::Done => return Ok(form),
            };
        }
    }

    fn next_line(&mut self) -> Option<&'a [u8]> {
        let line = self.lines.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(line)
    }

    fn is_boundary(&self, line: &[u8]) -> bool {
        line == self.start.as_slice() || line == self.end.as_slice()
    }

    fn seek_boundary(&mut self) -> Result<State, MultipartError> {
        let line = self
            .next_line()
            .ok_or_else(|| MultipartError::MissingBoundary("end of input".to_string()))?;
        if line == self.start.as_slice() {
            Ok(State::ReadHeaders)
        } else if line == self.end.as_slice() {
            Ok(State::Done)
        } else {
            Err(MultipartError::MissingBoundary(lossy(line)))
        }
    }

    fn read_headers(&mut self) -> Result<State, MultipartError> {
        let mut headers = BTreeMap::new();
        loop {
            let line = self
                .next_line()
                .ok_or_else(|| MultipartError::MissingBoundary("end of input".to_string()))?;
            let line = String::from_utf8_lossy(line);
            let line = line.trim();
            if line.is_empty() {
                break;
            }
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| MultipartError::MalformedHeader(line.to_string()))?;
            headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        let header = headers
            .remove("content-disposition")
            .ok_or(MultipartError::MissingContentDisposition)?;
        let attributes = parse_content_disposition(&header);
        let disposition = match (attributes.get("name"), attributes.get("filename")) {
            (Some(name), Some(filename)) => Disposition::File {
                name: name.clone(),
                filename: filename.clone(),
            },
            (Some(name), None) => Disposition::Field { name: name.clone() },
            _ => return Err(MultipartError::InvalidDisposition(header)),
        };
        Ok(State::ReadBody(disposition, headers.remove("content-type")))
    }

    /// Collects lines up to, but not including, the next boundary line.
    fn read_body(&mut self) -> Result<Vec<u8>, MultipartError> {
        let mut body: Vec<&[u8]> = Vec::new();
        loop {
            let line = self
                .lines
                .get(self.cursor)
                .copied()
                .ok_or_else(|| MultipartError::MissingBoundary("end of input".to_string()))?;
            if self.is_boundary(line) {
                return Ok(body.join(CRLF));
            }
            body.push(line);
            self.cursor += 1;
        }
    }
}

/// Attributes of a Content-Disposition value. Bare tokens such as
/// `form-data` are kept under their own text as key with an empty value.
fn parse_content_disposition(value: &str) -> BTreeMap<String, String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once('=') {
            Some((key, value)) => (key.trim().to_string(), strip_quotes(value.trim()).to_string()),
            None => (segment.to_string(), String::new()),
        })
        .collect()
}

fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn split_lines(body: &[u8]) -> Vec<&[u8]> {
    let mut lines = Vec::new();
    let mut rest = body;
    while let Some(pos) = rest.windows(2).position(|w| w == CRLF) {
        lines.push(&rest[..pos]);
        rest = &rest[pos + 2..];
    }
    lines.push(rest);
    lines
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
