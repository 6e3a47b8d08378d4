//! Default mapping of non-success responses onto [`ClientError::Remote`].

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{ClientError, CommandKey, ErrorDecoder, Response, Timestamp};

const RETRY_AFTER: &str = "Retry-After";

/// Treats every non-2xx response as a remote error.
///
/// A `Retry-After` header, in delta-seconds or HTTP-date form, marks the
/// error retryable; see [`ClientError::retry_policy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorDecoder;

impl ErrorDecoder for DefaultErrorDecoder {
    fn decode(&self, command_key: &CommandKey, response: &Response) -> ClientError {
        ClientError::Remote {
            command_key: command_key.clone(),
            status: response.status,
            reason: response.reason.clone(),
            body: response.body_text(),
            retry_after: response.headers.get(RETRY_AFTER).and_then(parse_retry_after),
        }
    }
}

/// Parses a `Retry-After` value relative to now.
pub fn parse_retry_after(value: &str) -> Option<Timestamp> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        let delay = chrono::Duration::from_std(Duration::from_secs(seconds)).ok()?;
        return Some(Timestamp::from_utc(Utc::now() + delay));
    }
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|at| Timestamp::from_utc(at.with_timezone(&Utc)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> CommandKey {
        CommandKey::new("Vehicles#list()").unwrap()
    }

    #[test]
    fn remote_error_carries_status_and_body() {
        let response = Response::new(404).with_body(r#"{"error":"no such vehicle"}"#);
        match DefaultErrorDecoder.decode(&key(), &response) {
            ClientError::Remote {
                status,
                body,
                retry_after,
                ..
            } => {
                assert_eq!(status, 404);
                assert!(body.contains("no such vehicle"));
                assert!(retry_after.is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn retry_after_seconds_makes_error_retryable() {
        let response = Response::new(503).with_header("Retry-After", "2");
        let err = DefaultErrorDecoder.decode(&key(), &response);
        assert!(matches!(
            err.retry_policy(),
            crate::RetryPolicy::Retryable { after: Some(d) } if d <= Duration::from_secs(2)
        ));
    }

    #[test]
    fn retry_after_accepts_http_dates() {
        let at = parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT").unwrap();
        assert_eq!(at.to_string(), "2015-10-21T07:28:00+00:00");
        assert!(parse_retry_after("soon").is_none());
    }
}
