//! Error taxonomy and retry-policy types for the dispatch domain.
//!
//! [`ConfigError`] covers everything detected while building a configuration
//! or binding an interface; it is surfaced to the builder caller before any
//! call is attempted. [`ClientError`] covers everything that can go wrong
//! during one invocation of a bound method.
//!
//! [`RetryPolicy`] is the cross-cutting classification the retryer consults:
//! every [`ClientError`] can say whether it is safe to retry.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CommandKey, InterfaceName, Timestamp};

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// ## Rules
///
/// - `Retryable`: network-level transport failures, and remote errors whose
///   response carried a `Retry-After` header.
/// - `NonRetryable`: everything else, including requests the transport
///   refused as unsendable, decode failures, timeouts, rejections and remote
///   errors without a retry hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means apply the
        /// retryer's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors raised while building a client configuration or binding an interface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No target was supplied. A target can never be synthesised.
    #[error("Configuration error: a target is required")]
    MissingTarget,

    /// The supplied target is unusable (empty or non-HTTP URL).
    #[error("Configuration error: invalid target: {message}")]
    InvalidTarget { message: String },

    /// A method declaration could not be mapped to a request.
    #[error("Configuration error: invalid method '{command_key}': {message}")]
    InvalidMethod {
        command_key: CommandKey,
        message: String,
    },

    /// Two method declarations produce the same command key.
    #[error("Configuration error: duplicate method declaration '{command_key}'")]
    DuplicateMethod { command_key: CommandKey },

    /// The interface being bound is not the one the target serves.
    #[error("Configuration error: target serves '{expected}' but interface '{actual}' was bound")]
    InterfaceMismatch {
        expected: InterfaceName,
        actual: InterfaceName,
    },

    /// The default transport could not be constructed.
    #[error("Configuration error: transport: {message}")]
    Transport { message: String },
}

// ---------------------------------------------------------------------------
// Collaborator errors
// ---------------------------------------------------------------------------

/// Network-level failure reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection could not be established (refused, DNS failure, TLS).
    #[error("connect failed: {message}")]
    Connect { message: String },

    /// The transport's own read/connect timeout elapsed.
    #[error("transport timed out: {message}")]
    Timeout { message: String },

    /// The request could not be sent or the response could not be read.
    #[error("transport failure: {message}")]
    Io { message: String },

    /// The request can never be sent as built: an unparsable URL, or a header
    /// name or value the wire format forbids. Never retried.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

/// Failure to turn a request body into wire bytes, or to expand a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EncodeError {
    pub message: String,
}

impl EncodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure to turn a response body into a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DecodeError {
    pub message: String,
}

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Invocation errors
// ---------------------------------------------------------------------------

/// Everything that can fail during one call of a bound method.
///
/// Configuration problems never appear here: they are reported as
/// [`ConfigError`] by the builder or by binding, before any call exists.
///
/// No variant is ever swallowed or converted into a default value: each one
/// reaches the immediate caller unless a configured retryer or an explicitly
/// enabled fallback handles it.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No bound method matches the requested name and arity.
    #[error("No bound method '{method}' accepting {arity} argument(s)")]
    UnknownMethod {
        /// Method name the caller asked for.
        method: String,
        /// Number of arguments supplied.
        arity: usize,
    },

    /// More than one overload matches the requested name and arity.
    #[error("Call to '{method}' with {arity} argument(s) is ambiguous")]
    AmbiguousMethod {
        /// Method name the caller asked for.
        method: String,
        /// Number of arguments supplied; every matching overload takes this many.
        arity: usize,
    },

    /// The arguments could not be expanded or encoded into a request.
    #[error("Encoding request for '{command_key}' failed: {source}")]
    Encode {
        /// Endpoint whose request could not be built.
        command_key: CommandKey,
        /// What the contract or encoder rejected.
        #[source]
        source: EncodeError,
    },

    /// The transport failed, or refused the request as unsendable.
    #[error("Transport failure calling '{command_key}': {source}")]
    Transport {
        /// Endpoint being called.
        command_key: CommandKey,
        /// The transport's own classification of the failure.
        #[source]
        source: TransportError,
    },

    /// Execution exceeded the isolation policy's time budget.
    #[error("Call to '{command_key}' timed out after {timeout_ms} ms")]
    Timeout {
        /// Endpoint being called.
        command_key: CommandKey,
        /// The policy's execution timeout, covering every attempt.
        timeout_ms: u64,
    },

    /// The endpoint's bulkhead was full.
    #[error("Call to '{command_key}' rejected: all {capacity} slots in use")]
    Rejected {
        /// Endpoint being called.
        command_key: CommandKey,
        /// Size of the endpoint's pool.
        capacity: usize,
    },

    /// The response body did not match the expected contract.
    #[error("Decoding response from '{command_key}' failed: {source}")]
    Decode {
        /// Endpoint that answered.
        command_key: CommandKey,
        /// What the decoder rejected.
        #[source]
        source: DecodeError,
    },

    /// The remote service answered with a non-success status.
    #[error("'{command_key}' returned status {status}")]
    Remote {
        /// Endpoint that answered.
        command_key: CommandKey,
        /// HTTP status code, never 2xx.
        status: u16,
        /// Reason phrase, when the transport reported one.
        reason: Option<String>,
        /// Response body as text, with invalid UTF-8 replaced.
        body: String,
        /// Earliest time a retry may be attempted, from `Retry-After`.
        retry_after: Option<Timestamp>,
    },

    /// The isolated work panicked or was cancelled by the executor.
    #[error("Execution of '{command_key}' aborted: {message}")]
    Execution {
        /// Endpoint being called.
        command_key: CommandKey,
        /// Panic payload or cancellation reason.
        message: String,
    },
}

impl ClientError {
    /// Classifies this error for the retryer.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Transport {
                source: TransportError::InvalidRequest { .. },
                ..
            } => RetryPolicy::NonRetryable,
            Self::Transport { .. } => RetryPolicy::Retryable { after: None },
            Self::Remote {
                retry_after: Some(at),
                ..
            } => RetryPolicy::Retryable {
                after: Some(at.duration_from_now()),
            },
            _ => RetryPolicy::NonRetryable,
        }
    }

    /// Command key of the call that failed, when one had been resolved.
    pub fn command_key(&self) -> Option<&CommandKey> {
        match self {
            Self::Encode { command_key, .. }
            | Self::Transport { command_key, .. }
            | Self::Timeout { command_key, .. }
            | Self::Rejected { command_key, .. }
            | Self::Decode { command_key, .. }
            | Self::Remote { command_key, .. }
            | Self::Execution { command_key, .. } => Some(command_key),
            Self::UnknownMethod { .. } | Self::AmbiguousMethod { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> CommandKey {
        CommandKey::new("Vehicles#list()").unwrap()
    }

    #[test]
    fn transport_failures_are_retryable() {
        let err = ClientError::Transport {
            command_key: key(),
            source: TransportError::Connect {
                message: "refused".into(),
            },
        };
        assert_eq!(err.retry_policy(), RetryPolicy::Retryable { after: None });
    }

    #[test]
    fn unsendable_requests_are_final() {
        let err = ClientError::Transport {
            command_key: key(),
            source: TransportError::InvalidRequest {
                message: "header value contains CR/LF".into(),
            },
        };
        assert_eq!(err.retry_policy(), RetryPolicy::NonRetryable);
    }

    #[test]
    fn method_lookup_failures_carry_no_command_key() {
        let unknown = ClientError::UnknownMethod {
            method: "deleteVehicle".into(),
            arity: 0,
        };
        let ambiguous = ClientError::AmbiguousMethod {
            method: "find".into(),
            arity: 1,
        };
        assert_eq!(unknown.command_key(), None);
        assert_eq!(ambiguous.command_key(), None);
        assert_eq!(unknown.retry_policy(), RetryPolicy::NonRetryable);
    }

    #[test]
    fn remote_errors_need_a_retry_hint() {
        let plain = ClientError::Remote {
            command_key: key(),
            status: 503,
            reason: None,
            body: String::new(),
            retry_after: None,
        };
        assert_eq!(plain.retry_policy(), RetryPolicy::NonRetryable);

        let hinted = ClientError::Remote {
            command_key: key(),
            status: 503,
            reason: None,
            body: String::new(),
            retry_after: Some(Timestamp::now()),
        };
        assert!(matches!(hinted.retry_policy(), RetryPolicy::Retryable { after: Some(_) }));
    }

    #[test]
    fn timeouts_and_decode_failures_are_final() {
        let timeout = ClientError::Timeout {
            command_key: key(),
            timeout_ms: 30_000,
        };
        let decode = ClientError::Decode {
            command_key: key(),
            source: DecodeError::new("expected object"),
        };
        assert_eq!(timeout.retry_policy(), RetryPolicy::NonRetryable);
        assert_eq!(decode.retry_policy(), RetryPolicy::NonRetryable);
        assert_eq!(timeout.command_key(), Some(&key()));
    }
}
