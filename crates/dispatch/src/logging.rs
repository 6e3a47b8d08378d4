//! Request/response trace logging.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ClientError, CommandKey, Headers, Logger, Request, Response};

/// How much of each exchange the [`Logger`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Nothing.
    None,
    /// Request line, response status and elapsed time.
    Basic,
    /// `Basic` plus headers.
    Headers,
    /// `Headers` plus bodies.
    #[default]
    Full,
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "basic" => Ok(Self::Basic),
            "headers" => Ok(Self::Headers),
            "full" => Ok(Self::Full),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// [`Logger`] that emits `tracing` events at `debug` level.
///
/// `Authorization` values are redacted.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

fn render_headers(headers: &Headers) -> String {
    headers
        .iter()
        .map(|(name, value)| {
            if name == "authorization" {
                format!("{name}: <redacted>")
            } else {
                format!("{name}: {value}")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn render_body(body: Option<&[u8]>) -> String {
    body.map(|b| String::from_utf8_lossy(b).into_owned())
        .unwrap_or_default()
}

impl Logger for TracingLogger {
    fn log_request(&self, command_key: &CommandKey, level: LogLevel, request: &Request) {
        if level == LogLevel::None {
            return;
        }
        let url = request.display_url();
        match level {
            LogLevel::Full => debug!(
                command = %command_key,
                method = %request.method,
                url = %url,
                headers = %render_headers(&request.headers),
                body = %render_body(request.body.as_deref()),
                "---> request"
            ),
            LogLevel::Headers => debug!(
                command = %command_key,
                method = %request.method,
                url = %url,
                headers = %render_headers(&request.headers),
                "---> request"
            ),
            _ => debug!(command = %command_key, method = %request.method, url = %url, "---> request"),
        }
    }

    fn log_response(
        &self,
        command_key: &CommandKey,
        level: LogLevel,
        response: &Response,
        elapsed: Duration,
    ) {
        let elapsed_ms = elapsed.as_millis() as u64;
        match level {
            LogLevel::None => {}
            LogLevel::Full => debug!(
                command = %command_key,
                status = response.status,
                elapsed_ms,
                headers = %render_headers(&response.headers),
                body = %render_body(Some(&response.body)),
                "<--- response"
            ),
            LogLevel::Headers => debug!(
                command = %command_key,
                status = response.status,
                elapsed_ms,
                headers = %render_headers(&response.headers),
                "<--- response"
            ),
            LogLevel::Basic => debug!(
                command = %command_key,
                status = response.status,
                elapsed_ms,
                "<--- response"
            ),
        }
    }

    fn log_retry(&self, command_key: &CommandKey, level: LogLevel, attempt: u32, delay: Duration) {
        if level != LogLevel::None {
            debug!(command = %command_key, attempt, delay_ms = delay.as_millis() as u64, "---> retrying");
        }
    }

    fn log_error(&self, command_key: &CommandKey, level: LogLevel, error: &ClientError) {
        if level != LogLevel::None {
            debug!(command = %command_key, error = %error, "<--- error");
        }
    }
}
