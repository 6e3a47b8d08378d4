//! Port traits for the capabilities a client configuration bundles.
//!
//! Each capability is independently replaceable. Default implementations of
//! the pure ones live in this crate ([`crate::codec`], [`crate::auth`],
//! [`crate::contract`], [`crate::retry`], [`crate::error_decoder`],
//! [`crate::logging`]); the default [`Transport`] lives in the `transport`
//! crate because it performs I/O.
//!
//! All traits are dyn-compatible so a configuration can hold them as
//! `Arc<dyn Trait>`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    ClientError, CommandKey, ConfigError, DecodeError, EncodeError, InterfaceDescriptor,
    LogLevel, MethodMetadata, Request, RequestOptions, RequestTemplate, Response, TransportError,
};

/// Maps a request body onto wire bytes in the template.
pub trait Encoder: Send + Sync + fmt::Debug {
    fn encode(&self, body: &Value, template: &mut RequestTemplate) -> Result<(), EncodeError>;
}

/// Maps a successful response onto a value.
///
/// Decoders must tolerate fields they do not know about.
pub trait Decoder: Send + Sync + fmt::Debug {
    fn decode(&self, response: &Response) -> Result<Value, DecodeError>;
}

/// Turns a non-success response into the error surfaced to the caller.
pub trait ErrorDecoder: Send + Sync + fmt::Debug {
    fn decode(&self, command_key: &CommandKey, response: &Response) -> ClientError;
}

/// Decides whether a failed attempt is retried.
///
/// A retryer is shared by every call of a client; [`Retryer::start`] hands out
/// the per-invocation state.
pub trait Retryer: Send + Sync + fmt::Debug {
    fn start(&self) -> Box<dyn RetryState>;
}

/// Retry bookkeeping for one invocation.
pub trait RetryState: Send {
    /// Returns the delay before the next attempt, or `None` to give up and
    /// surface `error`.
    fn next_delay(&mut self, error: &ClientError) -> Option<Duration>;
}

/// Maps interface method declarations onto request metadata.
pub trait Contract: Send + Sync + fmt::Debug {
    fn parse_and_validate(
        &self,
        interface: &InterfaceDescriptor,
    ) -> Result<Vec<MethodMetadata>, ConfigError>;
}

/// Executes a prepared request.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    async fn execute(
        &self,
        request: &Request,
        options: &RequestOptions,
    ) -> Result<Response, TransportError>;
}

/// Mutation hook applied to every outgoing request before dispatch.
///
/// Must be idempotent and must not have side effects beyond the template.
pub trait RequestInterceptor: Send + Sync + fmt::Debug {
    fn apply(&self, template: &mut RequestTemplate);
}

/// Receives request/response trace data.
///
/// Methods return nothing: a logger can never change the outcome of a call.
pub trait Logger: Send + Sync + fmt::Debug {
    fn log_request(&self, command_key: &CommandKey, level: LogLevel, request: &Request);

    fn log_response(
        &self,
        command_key: &CommandKey,
        level: LogLevel,
        response: &Response,
        elapsed: Duration,
    );

    fn log_retry(&self, command_key: &CommandKey, level: LogLevel, attempt: u32, delay: Duration);

    fn log_error(&self, command_key: &CommandKey, level: LogLevel, error: &ClientError);
}
