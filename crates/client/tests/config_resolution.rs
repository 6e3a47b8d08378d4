//! How a `ConfigurableClientConfig` resolves overrides against defaults.

mod support;

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use client::{ClientConfig, ConfigurableClientConfig};
use dispatch::{
    BasicAuth, ConfigError, DecodeError, Decoder, EndpointIdentity, FixedIsolationPolicyFactory,
    HttpMethod, IsolationStrategy, LogLevel, MethodDescriptor, MethodName, RequestInterceptor,
    RequestOptions, RequestTemplate, Response,
};
use serde_json::{json, Value};
use support::{builder, target, MockTransport, URL};

#[derive(Debug)]
struct StatusDecoder;

impl Decoder for StatusDecoder {
    fn decode(&self, response: &Response) -> Result<Value, DecodeError> {
        Ok(json!({ "status": response.status }))
    }
}

#[derive(Debug)]
struct TraceHeader;

impl RequestInterceptor for TraceHeader {
    fn apply(&self, template: &mut RequestTemplate) {
        template.headers_mut().append("X-Trace", "abc");
    }
}

fn get_vehicle_identity() -> EndpointIdentity {
    EndpointIdentity::identify(
        &target(),
        &MethodDescriptor::new(MethodName::new("getVehicle").unwrap())
            .request_line("GET /vehicles/{id}")
            .path_param("id", "i64"),
    )
}

fn encoded(config: &impl ClientConfig, body: Value) -> String {
    let mut template = RequestTemplate::new(HttpMethod::Post);
    config.encoder().encode(&body, &mut template).unwrap();
    String::from_utf8(template.body().unwrap().to_vec()).unwrap()
}

#[test]
fn target_alone_yields_a_complete_configuration() {
    let config = ConfigurableClientConfig::builder()
        .target(target())
        .build()
        .unwrap();

    assert_eq!(config.target(), &target());
    assert!(config.basic_auth().is_none());
    assert!(config.basic_auth_interceptor().is_none());
    assert!(config.request_interceptors().is_empty());
    assert_eq!(config.log_level(), LogLevel::Full);
    assert_eq!(config.options(), RequestOptions::default());

    let body = encoded(&config, json!({ "plate": "AB-123", "owner": null }));
    assert_eq!(body, "{\n  \"plate\": \"AB-123\"\n}");

    let decoded = config
        .decoder()
        .decode(&Response::new(200).with_body(r#"{"plate":"AB-123","extra":1}"#))
        .unwrap();
    assert_eq!(decoded["plate"], "AB-123");
}

#[test]
fn missing_target_fails_the_build() {
    let err = ConfigurableClientConfig::builder()
        .basic_auth(BasicAuth::new("user", "pass"))
        .build()
        .unwrap_err();
    assert_eq!(err, ConfigError::MissingTarget);
}

#[test]
fn basic_auth_becomes_an_interceptor() {
    let transport = MockTransport::new();
    let config = builder(&transport)
        .basic_auth(BasicAuth::new("user", "pass"))
        .build()
        .unwrap();

    let first = config.basic_auth_interceptor().unwrap();
    let second = config.basic_auth_interceptor().unwrap();
    assert_eq!(first, second);

    let mut template = RequestTemplate::new(HttpMethod::Get);
    first.apply(&mut template);
    assert_eq!(
        template.headers().get("authorization"),
        Some("Basic dXNlcjpwYXNz")
    );
}

#[test]
fn explicit_interceptors_precede_basic_auth() {
    let transport = MockTransport::new();
    let config = builder(&transport)
        .basic_auth(BasicAuth::new("user", "pass"))
        .request_interceptor(TraceHeader)
        .build()
        .unwrap();

    let interceptors = config.request_interceptors();
    assert_eq!(interceptors.len(), 2);
    assert!(format!("{:?}", interceptors[0]).contains("TraceHeader"));
    assert!(format!("{:?}", interceptors[1]).contains("BasicAuthInterceptor"));
}

#[test]
fn overriding_the_decoder_keeps_the_default_encoder() {
    let transport = MockTransport::new();
    let config = builder(&transport).decoder(StatusDecoder).build().unwrap();

    let decoded = config.decoder().decode(&Response::new(201)).unwrap();
    assert_eq!(decoded, json!({ "status": 201 }));

    let body = encoded(&config, json!({ "a": 1, "b": null }));
    assert_eq!(body, "{\n  \"a\": 1\n}");
}

#[test]
fn accessors_return_the_same_instance_every_time() {
    let transport = MockTransport::new();
    let config = builder(&transport).build().unwrap();

    assert!(Arc::ptr_eq(&config.encoder(), &config.encoder()));
    assert!(Arc::ptr_eq(&config.decoder(), &config.decoder()));
    assert!(Arc::ptr_eq(&config.retryer(), &config.retryer()));
    assert!(Arc::ptr_eq(&config.contract(), &config.contract()));
    assert!(Arc::ptr_eq(&config.logger(), &config.logger()));
    assert!(Arc::ptr_eq(&config.transport(), &config.transport()));
    assert!(Arc::ptr_eq(
        &config.isolation_policy_factory(),
        &config.isolation_policy_factory()
    ));
}

#[test]
fn default_isolation_policy_uses_the_documented_envelope() {
    let transport = MockTransport::new();
    let config = builder(&transport).build().unwrap();
    let identity = get_vehicle_identity();

    let policy = config.isolation_policy_factory().create_policy(&identity);

    assert_eq!(policy.group_key().as_str(), URL);
    assert_eq!(policy.command_key().as_str(), "Vehicles#getVehicle(i64)");
    assert_eq!(policy.thread_pool_size(), 10);
    assert_eq!(policy.execution_timeout_ms(), 30_000);
    assert_eq!(policy.isolation_strategy(), IsolationStrategy::Thread);
    assert!(policy.interrupt_on_timeout());
    assert!(!policy.fallback_enabled());
}

#[test]
fn isolation_override_changes_the_envelope_not_the_identity() {
    let transport = MockTransport::new();
    let config = builder(&transport)
        .isolation_policy_factory(FixedIsolationPolicyFactory {
            thread_pool_size: NonZeroUsize::new(2).unwrap(),
            execution_timeout: Duration::from_millis(500),
            ..FixedIsolationPolicyFactory::default()
        })
        .build()
        .unwrap();
    let identity = get_vehicle_identity();

    let policy = config.isolation_policy_factory().create_policy(&identity);

    assert_eq!(policy.identity(), identity);
    assert_eq!(policy.thread_pool_size(), 2);
    assert_eq!(policy.execution_timeout_ms(), 500);
}

#[test]
fn log_level_and_options_overrides_are_kept() {
    let transport = MockTransport::new();
    let options = RequestOptions {
        read_timeout: Duration::from_secs(5),
        ..RequestOptions::default()
    };
    let config = builder(&transport)
        .log_level(LogLevel::Basic)
        .options(options)
        .build()
        .unwrap();

    assert_eq!(config.log_level(), LogLevel::Basic);
    assert_eq!(config.options(), options);
}
