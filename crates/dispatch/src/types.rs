//! Shared value types for the dispatch domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! the data that flows through an invocation: the target a client is bound
//! to, the mutable request template interceptors work on, the resolved request
//! handed to a transport, and the response that comes back.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ConfigError, InterfaceName, ServiceName};

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// The remote service a client is bound to.
///
/// The target's [`ServiceName`] is the fault-isolation group of every method
/// bound against it. When no explicit name is supplied the URL is used, so two
/// clients pointed at the same URL share isolation groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    interface: InterfaceName,
    name: ServiceName,
    url: String,
}

impl Target {
    /// Creates a target named after its URL, trailing `/` removed.
    pub fn new(interface: InterfaceName, url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        let name = ServiceName::new(url.trim_end_matches('/')).ok_or_else(|| {
            ConfigError::InvalidTarget {
                message: "target URL must not be empty".to_string(),
            }
        })?;
        Self::named(interface, name, url)
    }

    /// Creates a target with an explicit service name.
    pub fn named(
        interface: InterfaceName,
        name: ServiceName,
        url: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let url = url.into();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidTarget {
                message: format!("target URL '{url}' must use the http or https scheme"),
            });
        }
        Ok(Self {
            interface,
            name,
            url: url.trim_end_matches('/').to_string(),
        })
    }

    /// The interface this target serves.
    pub fn interface(&self) -> &InterfaceName {
        &self.interface
    }

    /// The service name, used as the isolation group key.
    pub fn name(&self) -> &ServiceName {
        &self.name
    }

    /// Base URL without a trailing slash.
    pub fn url(&self) -> &str {
        &self.url
    }
}

// ---------------------------------------------------------------------------
// HTTP method
// ---------------------------------------------------------------------------

/// HTTP verb of a request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Returns the canonical upper-case verb.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

/// Returned when a request line names a verb outside [`HttpMethod`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown HTTP method '{0}'")]
pub struct UnknownHttpMethod(pub String);

impl FromStr for HttpMethod {
    type Err = UnknownHttpMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(UnknownHttpMethod(s.to_string())),
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

/// Multi-valued header map. Names are case-insensitive and stored lower-case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(BTreeMap<String, Vec<String>>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, keeping any values already present under `name`.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.0
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// Replaces every value under `name` with `value`.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), vec![value.into()]);
    }

    /// First value under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.0
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    /// Iterates `(name, value)` pairs; a multi-valued header yields one pair per value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v.as_str())))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Request template and resolved request
// ---------------------------------------------------------------------------

/// A request that has been expanded from a method's metadata but not yet
/// bound to a target URL.
///
/// Request interceptors receive a `&mut RequestTemplate` and may mutate any
/// part of it before it is resolved and handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTemplate {
    method: HttpMethod,
    path_segments: Vec<String>,
    query: Vec<(String, String)>,
    headers: Headers,
    body: Option<Vec<u8>>,
}

impl RequestTemplate {
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            path_segments: Vec::new(),
            query: Vec::new(),
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Decoded path segments; percent-encoding is the transport's job.
    pub fn path_segments(&self) -> &[String] {
        &self.path_segments
    }

    pub fn push_segment(&mut self, segment: impl Into<String>) {
        self.path_segments.push(segment.into());
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn add_query(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.query.push((name.into(), value.into()));
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Sets a header, replacing existing values.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.set(name, value);
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn set_body(&mut self, body: Vec<u8>) {
        self.body = Some(body);
    }

    /// Binds the template to a target, producing the request a transport sends.
    pub fn resolve(self, target: &Target) -> Request {
        Request {
            method: self.method,
            base_url: target.url().to_string(),
            path_segments: self.path_segments,
            query: self.query,
            headers: self.headers,
            body: self.body,
        }
    }
}

/// A fully prepared outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: HttpMethod,
    /// Target URL without a trailing slash.
    pub base_url: String,
    pub path_segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// Human-readable URL for logs. Not percent-encoded.
    pub fn display_url(&self) -> String {
        let mut url = self.base_url.clone();
        for segment in &self.path_segments {
            url.push('/');
            url.push_str(segment);
        }
        for (i, (name, value)) in self.query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(name);
            url.push('=');
            url.push_str(value);
        }
        url
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// A response returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub reason: Option<String>,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            reason: None,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body as text, with invalid UTF-8 replaced.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

// ---------------------------------------------------------------------------
// Transport options
// ---------------------------------------------------------------------------

/// Per-client connection settings handed to the transport with every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub follow_redirects: bool,
}

impl RequestOptions {
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            read_timeout: Self::DEFAULT_READ_TIMEOUT,
            follow_redirects: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// Time remaining until this timestamp; zero if it is already past.
    pub fn duration_from_now(self) -> Duration {
        (self.0 - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
