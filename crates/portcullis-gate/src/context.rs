//! Request and response seams of the pipeline.
//!
//! The gate only needs attribute lookup on requests and status/body
//! control on responses. [`Request`] and [`Response`] are minimal
//! in-memory implementations; host frameworks implement the traits for
//! their own types.

use std::fmt::Write as _;

use serde_json::{Map, Value};

/// Read access to request attributes set by earlier pipeline stages.
pub trait PipelineRequest {
    fn attribute(&self, name: &str) -> Option<&Value>;
}

/// A response the gate can turn into a denial.
pub trait PipelineResponse {
    /// Returns a derived response carrying `status`.
    #[must_use]
    fn with_status(self, status: u16) -> Self;

    /// Appends to the response body.
    fn write_body(&mut self, chunk: &str);
}

/// In-memory request with named attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    method: String,
    path: String,
    attributes: Map<String, Value>,
}

impl Request {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            attributes: Map::new(),
        }
    }

    /// Sets an attribute, as a router or earlier middleware would.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl PipelineRequest for Request {
    fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// In-memory response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: String::new(),
        }
    }
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Renders a minimal HTTP/1.1 response.
    pub fn to_http(&self) -> String {
        let mut out = format!("HTTP/1.1 {} {}\r\n", self.status, reason_phrase(self.status));

        if self.header("content-type").is_none() {
            out.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        }
        for (name, value) in &self.headers {
            let _ = write!(out, "{name}: {value}\r\n");
        }
        let _ = write!(
            out,
            "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.body.len(),
            self.body
        );
        out
    }
}

impl PipelineResponse for Response {
    fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    fn write_body(&mut self, chunk: &str) {
        self.body.push_str(chunk);
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
