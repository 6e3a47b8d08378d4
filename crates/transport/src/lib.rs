//! Courier HTTP transport.
//!
//! Implements the [`dispatch::Transport`] trait over a pooled
//! [`reqwest::Client`].
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** URL encoding, connection pooling, TLS, and timeouts
//! live here. The [`dispatch`] crate sees only [`dispatch::Transport`].
//!
//! ## Timeouts
//!
//! The connect timeout and redirect policy are fixed when the transport is
//! built (they belong to the connection pool). The read timeout is applied per
//! request from the [`RequestOptions`] passed to
//! [`execute`](dispatch::Transport::execute).

use async_trait::async_trait;
use dispatch::{Headers, Request, RequestOptions, Response, Transport, TransportError};
use reqwest::redirect::Policy;
use reqwest::Url;
use tracing::trace;

/// The default transport.
///
/// Cloning is cheap and shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport with its own connection pool.
    pub fn new(options: &RequestOptions) -> Result<Self, TransportError> {
        let redirect = if options.follow_redirects {
            Policy::default()
        } else {
            Policy::none()
        };
        let client = reqwest::Client::builder()
            .connect_timeout(options.connect_timeout)
            .redirect(redirect)
            .build()
            .map_err(|e| TransportError::Io {
                message: format!("building HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    /// Wraps an existing client, e.g. one with custom TLS roots.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn build_url(request: &Request) -> Result<Url, TransportError> {
    let mut url = Url::parse(&request.base_url).map_err(|e| TransportError::InvalidRequest {
        message: format!("invalid URL '{}': {e}", request.base_url),
    })?;
    url.path_segments_mut()
        .map_err(|()| TransportError::InvalidRequest {
            message: format!("URL '{}' cannot carry a path", request.base_url),
        })?
        .pop_if_empty()
        .extend(&request.path_segments);
    if !request.query.is_empty() {
        url.query_pairs_mut().extend_pairs(
            request
                .query
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str())),
        );
    }
    Ok(url)
}

fn map_error(error: reqwest::Error) -> TransportError {
    let message = match std::error::Error::source(&error) {
        Some(cause) => format!("{error}: {cause}"),
        None => error.to_string(),
    };
    if error.is_builder() {
        TransportError::InvalidRequest { message }
    } else if error.is_timeout() {
        TransportError::Timeout { message }
    } else if error.is_connect() {
        TransportError::Connect { message }
    } else {
        TransportError::Io { message }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(
        &self,
        request: &Request,
        options: &RequestOptions,
    ) -> Result<Response, TransportError> {
        let url = build_url(request)?;
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes()).map_err(
            |e| TransportError::InvalidRequest {
                message: e.to_string(),
            },
        )?;
        trace!(%method, %url, "sending request");

        let mut builder = self
            .client
            .request(method, url)
            .timeout(options.read_timeout);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(map_error)?;
        let status = response.status();
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            headers.append(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
        }
        let body = response.bytes().await.map_err(map_error)?;

        Ok(Response {
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            headers,
            body: body.to_vec(),
        })
    }
}
