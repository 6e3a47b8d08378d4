//! Core dispatch domain for Courier.
//!
//! This crate contains every domain concept a remote-procedure client is built
//! from: newtype identifiers, endpoint identity, isolation policies, the value
//! types that flow through an invocation, the error taxonomy, and the port
//! traits each configurable capability implements. Infrastructure crates
//! implement the I/O-bound ports; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! The default *pure* capabilities (JSON codec, basic auth, contract, retryer,
//! error decoder, logger) live here because they need nothing but data.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype names and keys (`ServiceName`, `CommandKey`, etc.) |
//! | [`types`] | `Target`, `RequestTemplate`, `Request`, `Response`, `RequestOptions` |
//! | [`errors`] | `ConfigError`, `ClientError`, `RetryPolicy` |
//! | [`endpoint`] | Interface descriptions, `EndpointIdentity`, `EndpointIndex` |
//! | [`isolation`] | `IsolationPolicy` and its factories |
//! | [`ports`] | Capability traits |
//! | [`codec`], [`auth`], [`contract`], [`retry`], [`error_decoder`], [`logging`] | Default capabilities |

pub mod auth;
pub mod codec;
pub mod contract;
pub mod endpoint;
pub mod error_decoder;
pub mod errors;
pub mod identifiers;
pub mod isolation;
pub mod logging;
pub mod ports;
pub mod retry;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use auth::{BasicAuth, BasicAuthInterceptor};
pub use codec::{JsonDecoder, JsonEncoder, JsonEncoderOptions};
pub use contract::{DefaultContract, MethodMetadata, PathPart};
pub use endpoint::{
    config_key, EndpointIdentity, EndpointIndex, InterfaceDescriptor, MethodDescriptor,
    MethodSignature, ParamBinding, ParamDescriptor,
};
pub use error_decoder::DefaultErrorDecoder;
pub use errors::{ClientError, ConfigError, DecodeError, EncodeError, RetryPolicy, TransportError};
pub use identifiers::{CommandKey, GroupKey, InterfaceName, InvocationId, MethodName, ServiceName};
pub use isolation::{
    DefaultIsolationPolicyFactory, FixedIsolationPolicyFactory, IsolationPolicy,
    IsolationPolicyFactory, IsolationStrategy,
};
pub use logging::{LogLevel, TracingLogger};
pub use ports::{
    Contract, Decoder, Encoder, ErrorDecoder, Logger, RequestInterceptor, RetryState, Retryer,
    Transport,
};
pub use retry::{DefaultRetryer, NeverRetry};
pub use types::{
    Headers, HttpMethod, Request, RequestOptions, RequestTemplate, Response, Target, Timestamp,
    UnknownHttpMethod,
};
