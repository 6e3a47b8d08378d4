//! Binding a configuration to an interface, and running calls.
//!
//! [`ClientFactory::bind`] does all the work that can fail for configuration
//! reasons: the contract validates every method, identities are computed into
//! an [`EndpointIndex`], and each method's isolation policy is created and
//! cached. A [`Client`] then only ever fails for call-time reasons.
//!
//! Each call runs inside the bulkhead for its endpoint. Inside the envelope:
//! build the request template, apply interceptors, resolve against the
//! target, then attempt until the retryer gives up. The execution timeout
//! covers every attempt of one call.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bulkhead::{BulkheadError, BulkheadExecutor};
use dispatch::{
    ClientError, CommandKey, ConfigError, DecodeError, Decoder, Encoder, EndpointIdentity,
    EndpointIndex, ErrorDecoder, InterfaceDescriptor, InvocationId, IsolationPolicy, LogLevel,
    Logger, MethodMetadata, MethodSignature, Request, RequestInterceptor, RequestOptions, Retryer,
    Target, Transport,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{info, info_span, warn, Instrument};

use crate::ClientConfig;

/// Supplies a substitute value for a failed call.
///
/// Consulted only for endpoints whose policy has `fallback_enabled`; returning
/// `None` lets the original error through.
pub trait Fallback: Send + Sync + fmt::Debug {
    fn fallback(&self, identity: &EndpointIdentity, error: &ClientError) -> Option<Value>;
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Produces [`Client`]s.
///
/// Clients bound by the same factory share one [`BulkheadExecutor`], so calls
/// to the same endpoint from different clients share a pool.
#[derive(Debug, Clone, Default)]
pub struct ClientFactory {
    executor: Arc<BulkheadExecutor>,
}

impl ClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_executor(executor: Arc<BulkheadExecutor>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Arc<BulkheadExecutor> {
        &self.executor
    }

    /// Binds `config` to `interface`.
    pub fn bind<C>(&self, config: C, interface: &InterfaceDescriptor) -> Result<Client, ConfigError>
    where
        C: ClientConfig + 'static,
    {
        self.bind_shared(Arc::new(config), interface)
    }

    /// Binds an already shared configuration.
    pub fn bind_shared(
        &self,
        config: Arc<dyn ClientConfig>,
        interface: &InterfaceDescriptor,
    ) -> Result<Client, ConfigError> {
        let target = config.target().clone();
        let index = EndpointIndex::build(&target, interface)?;
        let policies = config.isolation_policy_factory();

        let mut methods = Vec::with_capacity(index.len());
        for metadata in config.contract().parse_and_validate(interface)? {
            let identity = index
                .get(metadata.signature())
                .cloned()
                .ok_or_else(|| ConfigError::InvalidMethod {
                    command_key: metadata.command_key().clone(),
                    message: "contract produced a method the interface does not declare"
                        .to_string(),
                })?;
            let policy = policies.create_policy(&identity);
            methods.push(Arc::new(BoundMethod {
                identity,
                metadata,
                policy,
            }));
        }

        let by_signature = methods
            .iter()
            .enumerate()
            .map(|(i, m)| (m.metadata.signature().clone(), i))
            .collect();

        info!(
            interface = %interface.name(),
            target = %target.name(),
            url = target.url(),
            methods = methods.len(),
            "bound client"
        );

        Ok(Client {
            inner: Arc::new(ClientInner {
                target,
                methods,
                by_signature,
                capabilities: Arc::new(Capabilities::resolve(config.as_ref())),
                executor: Arc::clone(&self.executor),
                fallback: None,
            }),
        })
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct BoundMethod {
    identity: EndpointIdentity,
    metadata: MethodMetadata,
    policy: IsolationPolicy,
}

/// Capabilities resolved once at bind time.
#[derive(Debug)]
struct Capabilities {
    encoder: Arc<dyn Encoder>,
    decoder: Arc<dyn Decoder>,
    error_decoder: Arc<dyn ErrorDecoder>,
    retryer: Arc<dyn Retryer>,
    transport: Arc<dyn Transport>,
    logger: Arc<dyn Logger>,
    log_level: LogLevel,
    options: RequestOptions,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
}

impl Capabilities {
    fn resolve(config: &dyn ClientConfig) -> Self {
        Self {
            encoder: config.encoder(),
            decoder: config.decoder(),
            error_decoder: config.error_decoder(),
            retryer: config.retryer(),
            transport: config.transport(),
            logger: config.logger(),
            log_level: config.log_level(),
            options: config.options(),
            interceptors: config.request_interceptors(),
        }
    }
}

#[derive(Debug, Clone)]
struct ClientInner {
    target: Target,
    methods: Vec<Arc<BoundMethod>>,
    by_signature: HashMap<MethodSignature, usize>,
    capabilities: Arc<Capabilities>,
    executor: Arc<BulkheadExecutor>,
    fallback: Option<Arc<dyn Fallback>>,
}

/// A bound, callable client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    pub fn target(&self) -> &Target {
        &self.inner.target
    }

    /// Identities of every bound method.
    pub fn identities(&self) -> impl Iterator<Item = &EndpointIdentity> {
        self.inner.methods.iter().map(|m| &m.identity)
    }

    pub fn identity(&self, signature: &MethodSignature) -> Option<&EndpointIdentity> {
        self.bound(signature).map(|m| &m.identity)
    }

    /// The cached isolation policy of a bound method.
    pub fn policy(&self, signature: &MethodSignature) -> Option<&IsolationPolicy> {
        self.bound(signature).map(|m| &m.policy)
    }

    pub fn executor(&self) -> &Arc<BulkheadExecutor> {
        &self.inner.executor
    }

    /// Returns a client that consults `fallback` for endpoints with fallback enabled.
    pub fn with_fallback(self, fallback: impl Fallback + 'static) -> Self {
        let mut inner = (*self.inner).clone();
        inner.fallback = Some(Arc::new(fallback));
        Self {
            inner: Arc::new(inner),
        }
    }

    fn bound(&self, signature: &MethodSignature) -> Option<&Arc<BoundMethod>> {
        self.inner
            .by_signature
            .get(signature)
            .map(|&i| &self.inner.methods[i])
    }

    /// Picks the overload of `method` taking `arity` arguments.
    fn resolve(&self, method: &str, arity: usize) -> Result<Arc<BoundMethod>, ClientError> {
        let mut candidates = self
            .inner
            .methods
            .iter()
            .filter(|m| m.metadata.signature().name.as_str() == method && m.metadata.arity() == arity);
        match (candidates.next(), candidates.next()) {
            (Some(found), None) => Ok(Arc::clone(found)),
            (None, _) => Err(ClientError::UnknownMethod {
                method: method.to_string(),
                arity,
            }),
            (Some(_), Some(_)) => Err(ClientError::AmbiguousMethod {
                method: method.to_string(),
                arity,
            }),
        }
    }

    /// Calls `method` with positional `args`, returning the decoded body.
    pub async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, ClientError> {
        let bound = self.resolve(method, args.len())?;
        self.dispatch(bound, args).await
    }

    /// Calls the method with exactly `signature`.
    pub async fn invoke_signature(
        &self,
        signature: &MethodSignature,
        args: Vec<Value>,
    ) -> Result<Value, ClientError> {
        let bound = self
            .bound(signature)
            .cloned()
            .ok_or_else(|| ClientError::UnknownMethod {
                method: signature.name.to_string(),
                arity: signature.param_types.len(),
            })?;
        self.dispatch(bound, args).await
    }

    /// Like [`invoke`](Self::invoke), converting the body into `T`.
    ///
    /// Fields of the body that `T` does not declare are ignored.
    pub async fn call<T>(&self, method: &str, args: Vec<Value>) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let bound = self.resolve(method, args.len())?;
        let command_key = bound.identity.command_key().clone();
        let value = self.dispatch(bound, args).await?;
        serde_json::from_value(value).map_err(|e| ClientError::Decode {
            command_key,
            source: DecodeError::new(e.to_string()),
        })
    }

    async fn dispatch(&self, bound: Arc<BoundMethod>, args: Vec<Value>) -> Result<Value, ClientError> {
        let invocation_id = InvocationId::new_random();
        let span = info_span!(
            "invoke",
            group = %bound.identity.group_key(),
            command = %bound.identity.command_key(),
            %invocation_id
        );

        let work = {
            let inner = Arc::clone(&self.inner);
            let bound = Arc::clone(&bound);
            async move { run_attempts(&inner, &bound, args).await }.instrument(span.clone())
        };
        let outcome = self
            .inner
            .executor
            .execute(&bound.policy, work)
            .instrument(span.clone())
            .await;

        let error = match outcome {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(error)) => error,
            Err(bulkhead_error) => from_bulkhead(&bound.policy, bulkhead_error),
        };

        span.in_scope(|| {
            let caps = &self.inner.capabilities;
            caps.logger
                .log_error(bound.identity.command_key(), caps.log_level, &error);
            self.apply_fallback(&bound, error)
        })
    }

    fn apply_fallback(&self, bound: &BoundMethod, error: ClientError) -> Result<Value, ClientError> {
        if !bound.policy.fallback_enabled() {
            return Err(error);
        }
        let Some(fallback) = &self.inner.fallback else {
            return Err(error);
        };
        match fallback.fallback(&bound.identity, &error) {
            Some(value) => {
                warn!(command = %bound.identity.command_key(), %error, "serving fallback value");
                Ok(value)
            }
            None => Err(error),
        }
    }
}

fn from_bulkhead(policy: &IsolationPolicy, error: BulkheadError) -> ClientError {
    let command_key = policy.command_key().clone();
    match error {
        BulkheadError::Rejected { capacity } => ClientError::Rejected {
            command_key,
            capacity,
        },
        BulkheadError::TimedOut { .. } => ClientError::Timeout {
            command_key,
            timeout_ms: policy.execution_timeout_ms(),
        },
        BulkheadError::Panicked { message } => ClientError::Execution {
            command_key,
            message: format!("panicked: {message}"),
        },
        BulkheadError::Cancelled => ClientError::Execution {
            command_key,
            message: "cancelled".to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Invocation pipeline
// ---------------------------------------------------------------------------

async fn run_attempts(
    inner: &ClientInner,
    bound: &BoundMethod,
    args: Vec<Value>,
) -> Result<Value, ClientError> {
    let caps = &inner.capabilities;
    let command_key = bound.identity.command_key();

    let mut template = bound
        .metadata
        .build_template(&args, caps.encoder.as_ref())
        .map_err(|source| ClientError::Encode {
            command_key: command_key.clone(),
            source,
        })?;
    for interceptor in &caps.interceptors {
        interceptor.apply(&mut template);
    }
    let request = template.resolve(&inner.target);

    let mut retry = caps.retryer.start();
    let mut attempt = 1u32;
    loop {
        let error = match attempt_once(caps, command_key, &request).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        let Some(delay) = retry.next_delay(&error) else {
            return Err(error);
        };
        caps.logger
            .log_retry(command_key, caps.log_level, attempt, delay);
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

async fn attempt_once(
    caps: &Capabilities,
    command_key: &CommandKey,
    request: &Request,
) -> Result<Value, ClientError> {
    caps.logger.log_request(command_key, caps.log_level, request);
    let started = Instant::now();
    let response = caps
        .transport
        .execute(request, &caps.options)
        .await
        .map_err(|source| ClientError::Transport {
            command_key: command_key.clone(),
            source,
        })?;
    caps.logger
        .log_response(command_key, caps.log_level, &response, started.elapsed());

    if response.is_success() {
        caps.decoder
            .decode(&response)
            .map_err(|source| ClientError::Decode {
                command_key: command_key.clone(),
                source,
            })
    } else {
        Err(caps.error_decoder.decode(command_key, &response))
    }
}
