//! Client configuration: the capability set a client is built from.
//!
//! [`ClientConfig`] is the read-only view the factory consumes.
//! [`ConfigurableClientConfig`] is the standard implementation: a
//! [`ClientConfigBuilder`] collects optional overrides, and
//! [`ClientConfigBuilder::build`] resolves each one to its override or its
//! default exactly once. The resulting configuration is immutable; every
//! accessor returns the same capability object on every call.

use std::fmt;
use std::sync::Arc;

use dispatch::{
    BasicAuth, BasicAuthInterceptor, ConfigError, Contract, Decoder, DefaultContract,
    DefaultErrorDecoder, DefaultIsolationPolicyFactory, DefaultRetryer, Encoder, ErrorDecoder,
    IsolationPolicyFactory, JsonDecoder, JsonEncoder, LogLevel, Logger, RequestInterceptor,
    RequestOptions, Retryer, Target, TracingLogger, Transport,
};
use transport::ReqwestTransport;

/// Everything needed to construct a working client.
///
/// Implementations must be immutable after construction so a configuration
/// can be shared read-only across threads.
pub trait ClientConfig: Send + Sync + fmt::Debug {
    /// The remote service. Always present.
    fn target(&self) -> &Target;

    fn basic_auth(&self) -> Option<&BasicAuth> {
        None
    }

    /// Interceptor derived from [`basic_auth`](Self::basic_auth), if any.
    fn basic_auth_interceptor(&self) -> Option<BasicAuthInterceptor> {
        self.basic_auth().map(BasicAuthInterceptor::new)
    }

    fn isolation_policy_factory(&self) -> Arc<dyn IsolationPolicyFactory>;

    fn logger(&self) -> Arc<dyn Logger>;

    fn log_level(&self) -> LogLevel;

    fn retryer(&self) -> Arc<dyn Retryer>;

    fn contract(&self) -> Arc<dyn Contract>;

    fn error_decoder(&self) -> Arc<dyn ErrorDecoder>;

    fn transport(&self) -> Arc<dyn Transport>;

    fn decoder(&self) -> Arc<dyn Decoder>;

    fn encoder(&self) -> Arc<dyn Encoder>;

    fn options(&self) -> RequestOptions;

    /// Interceptors in the order they are applied to every request.
    ///
    /// The default is just the basic-auth interceptor, when configured.
    fn request_interceptors(&self) -> Vec<Arc<dyn RequestInterceptor>> {
        self.basic_auth_interceptor()
            .map(|interceptor| Arc::new(interceptor) as Arc<dyn RequestInterceptor>)
            .into_iter()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// ConfigurableClientConfig
// ---------------------------------------------------------------------------

/// A fully resolved [`ClientConfig`] with sensible defaults.
///
/// | Capability | Default |
/// |------------|---------|
/// | encoder | [`JsonEncoder`]: omit nulls, pretty print |
/// | decoder | [`JsonDecoder`]: tolerant of unknown fields |
/// | isolation | [`DefaultIsolationPolicyFactory`]: 10 workers, 30 s, thread, interrupt, no fallback |
/// | retryer | [`DefaultRetryer`] |
/// | contract | [`DefaultContract`] |
/// | error decoder | [`DefaultErrorDecoder`]: every non-2xx is an error |
/// | transport | [`ReqwestTransport`] |
/// | logger / level | [`TracingLogger`] / [`LogLevel::Full`] |
/// | options | [`RequestOptions::default`] |
#[derive(Debug, Clone)]
pub struct ConfigurableClientConfig {
    target: Target,
    basic_auth: Option<BasicAuth>,
    isolation_policy_factory: Arc<dyn IsolationPolicyFactory>,
    logger: Arc<dyn Logger>,
    log_level: LogLevel,
    retryer: Arc<dyn Retryer>,
    contract: Arc<dyn Contract>,
    error_decoder: Arc<dyn ErrorDecoder>,
    transport: Arc<dyn Transport>,
    decoder: Arc<dyn Decoder>,
    encoder: Arc<dyn Encoder>,
    options: RequestOptions,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
}

impl ConfigurableClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

impl ClientConfig for ConfigurableClientConfig {
    fn target(&self) -> &Target {
        &self.target
    }

    fn basic_auth(&self) -> Option<&BasicAuth> {
        self.basic_auth.as_ref()
    }

    fn isolation_policy_factory(&self) -> Arc<dyn IsolationPolicyFactory> {
        Arc::clone(&self.isolation_policy_factory)
    }

    fn logger(&self) -> Arc<dyn Logger> {
        Arc::clone(&self.logger)
    }

    fn log_level(&self) -> LogLevel {
        self.log_level
    }

    fn retryer(&self) -> Arc<dyn Retryer> {
        Arc::clone(&self.retryer)
    }

    fn contract(&self) -> Arc<dyn Contract> {
        Arc::clone(&self.contract)
    }

    fn error_decoder(&self) -> Arc<dyn ErrorDecoder> {
        Arc::clone(&self.error_decoder)
    }

    fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    fn decoder(&self) -> Arc<dyn Decoder> {
        Arc::clone(&self.decoder)
    }

    fn encoder(&self) -> Arc<dyn Encoder> {
        Arc::clone(&self.encoder)
    }

    fn options(&self) -> RequestOptions {
        self.options
    }

    /// Explicitly configured interceptors first, then basic auth.
    fn request_interceptors(&self) -> Vec<Arc<dyn RequestInterceptor>> {
        self.request_interceptors.clone()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects overrides for a [`ConfigurableClientConfig`].
///
/// Every field except the target is optional; an override replaces its
/// default wholesale.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    target: Option<Target>,
    basic_auth: Option<BasicAuth>,
    isolation_policy_factory: Option<Arc<dyn IsolationPolicyFactory>>,
    logger: Option<Arc<dyn Logger>>,
    log_level: Option<LogLevel>,
    retryer: Option<Arc<dyn Retryer>>,
    contract: Option<Arc<dyn Contract>>,
    error_decoder: Option<Arc<dyn ErrorDecoder>>,
    transport: Option<Arc<dyn Transport>>,
    decoder: Option<Arc<dyn Decoder>>,
    encoder: Option<Arc<dyn Encoder>>,
    options: Option<RequestOptions>,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
}

impl ClientConfigBuilder {
    pub fn target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    pub fn basic_auth(mut self, credential: BasicAuth) -> Self {
        self.basic_auth = Some(credential);
        self
    }

    pub fn isolation_policy_factory(mut self, factory: impl IsolationPolicyFactory + 'static) -> Self {
        self.isolation_policy_factory = Some(Arc::new(factory));
        self
    }

    pub fn logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn retryer(mut self, retryer: impl Retryer + 'static) -> Self {
        self.retryer = Some(Arc::new(retryer));
        self
    }

    pub fn contract(mut self, contract: impl Contract + 'static) -> Self {
        self.contract = Some(Arc::new(contract));
        self
    }

    pub fn error_decoder(mut self, decoder: impl ErrorDecoder + 'static) -> Self {
        self.error_decoder = Some(Arc::new(decoder));
        self
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn decoder(mut self, decoder: impl Decoder + 'static) -> Self {
        self.decoder = Some(Arc::new(decoder));
        self
    }

    pub fn encoder(mut self, encoder: impl Encoder + 'static) -> Self {
        self.encoder = Some(Arc::new(encoder));
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Adds an interceptor; interceptors run in the order they were added.
    pub fn request_interceptor(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.request_interceptors.push(Arc::new(interceptor));
        self
    }

    /// Validates the target, then resolves every capability.
    ///
    /// A missing target fails before anything else is constructed.
    pub fn build(self) -> Result<ConfigurableClientConfig, ConfigError> {
        let target = self.target.ok_or(ConfigError::MissingTarget)?;
        let options = self.options.unwrap_or_default();

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&options).map_err(|e| {
                ConfigError::Transport {
                    message: e.to_string(),
                }
            })?),
        };

        let mut request_interceptors = self.request_interceptors;
        if let Some(credential) = &self.basic_auth {
            request_interceptors.push(Arc::new(BasicAuthInterceptor::new(credential)));
        }

        Ok(ConfigurableClientConfig {
            target,
            basic_auth: self.basic_auth,
            isolation_policy_factory: self
                .isolation_policy_factory
                .unwrap_or_else(|| Arc::new(DefaultIsolationPolicyFactory)),
            logger: self.logger.unwrap_or_else(|| Arc::new(TracingLogger)),
            log_level: self.log_level.unwrap_or_default(),
            retryer: self
                .retryer
                .unwrap_or_else(|| Arc::new(DefaultRetryer::default())),
            contract: self.contract.unwrap_or_else(|| Arc::new(DefaultContract)),
            error_decoder: self
                .error_decoder
                .unwrap_or_else(|| Arc::new(DefaultErrorDecoder)),
            transport,
            decoder: self.decoder.unwrap_or_else(|| Arc::new(JsonDecoder)),
            encoder: self
                .encoder
                .unwrap_or_else(|| Arc::new(JsonEncoder::default())),
            options,
            request_interceptors,
        })
    }
}
