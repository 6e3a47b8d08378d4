//! Courier CLI entry point.
//!
//! Issues a single call through a fully configured client and prints the
//! decoded JSON body. Responsibilities:
//!
//! 1. **Parse arguments**: flags and `COURIER_*` environment variables.
//! 2. **Wire observability**: `tracing-subscriber` with a plain or JSON
//!    formatter, plus an optional OpenTelemetry OTLP exporter.
//! 3. **Describe the call**: the method and path become a one-method
//!    interface; `--query`, `--header` and `--body` become its parameters.
//! 4. **Bind and invoke** through [`client::ClientFactory`].

use std::num::NonZeroUsize;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use client::{ClientFactory, ConfigurableClientConfig};
use dispatch::{
    BasicAuth, FixedIsolationPolicyFactory, HttpMethod, InterfaceDescriptor, InterfaceName,
    LogLevel, MethodDescriptor, MethodName, ServiceName, Target,
};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::{runtime, Resource};
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const INTERFACE: &str = "Cli";
const METHOD: &str = "call";

/// Call an HTTP JSON endpoint through an isolated, retrying client.
#[derive(Debug, Parser)]
#[command(name = "courier")]
#[command(version)]
pub struct Cli {
    /// Base URL of the target service.
    #[arg(long, env = "COURIER_URL")]
    pub url: String,

    /// Service name used as the isolation group. Defaults to the URL.
    #[arg(long, env = "COURIER_SERVICE")]
    pub name: Option<String>,

    #[arg(long, env = "COURIER_USERNAME", requires = "password")]
    pub username: Option<String>,

    #[arg(long, env = "COURIER_PASSWORD", hide_env_values = true, requires = "username")]
    pub password: Option<String>,

    /// Query parameter, repeatable.
    #[arg(long = "query", value_name = "NAME=VALUE", value_parser = parse_pair)]
    pub query: Vec<(String, String)>,

    /// Static request header, repeatable.
    #[arg(long = "header", value_name = "NAME: VALUE")]
    pub headers: Vec<String>,

    /// JSON request body.
    #[arg(long)]
    pub body: Option<String>,

    /// none, basic, headers or full.
    #[arg(long, env = "COURIER_LOG_LEVEL", default_value = "basic")]
    pub log_level: LogLevel,

    /// Maximum concurrent calls to the endpoint.
    #[arg(long, default_value = "10")]
    pub pool_size: NonZeroUsize,

    /// Execution budget for the whole call, retries included.
    #[arg(long = "timeout", default_value = "30000")]
    pub timeout_ms: u64,

    /// Emit logs as JSON lines.
    #[arg(long = "json-logs", env = "COURIER_JSON_LOGS")]
    pub json_logs: bool,

    /// OTLP gRPC endpoint; spans are exported when set.
    #[arg(long = "otlp-endpoint", env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// HTTP verb.
    pub method: HttpMethod,

    /// Request path, e.g. `/vehicles/7`.
    pub path: String,
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

// ---------------------------------------------------------------------------
// Observability
// ---------------------------------------------------------------------------

fn init_tracing(json: bool, otlp_endpoint: Option<&str>) -> Result<Option<TracerProvider>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,dispatch=debug"));

    let (json_layer, plain_layer) = if json {
        (
            Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
            None,
        )
    } else {
        (
            None,
            Some(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr)),
        )
    };

    let provider = match otlp_endpoint {
        Some(endpoint) => {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .build()
                .context("building OTLP span exporter")?;
            Some(
                TracerProvider::builder()
                    .with_batch_exporter(exporter, runtime::Tokio)
                    .with_resource(Resource::new(vec![KeyValue::new("service.name", "courier")]))
                    .build(),
            )
        }
        None => None,
    };
    let otel_layer = provider
        .as_ref()
        .map(|provider| tracing_opentelemetry::layer().with_tracer(provider.tracer("courier")));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(plain_layer)
        .with(otel_layer)
        .try_init()
        .context("installing tracing subscriber")?;
    Ok(provider)
}

// ---------------------------------------------------------------------------
// Call
// ---------------------------------------------------------------------------

/// Builds the one-method interface and its positional arguments.
fn describe(cli: &Cli) -> Result<(InterfaceDescriptor, Vec<Value>)> {
    let interface = InterfaceName::new(INTERFACE).context("interface name")?;
    let name = MethodName::new(METHOD).context("method name")?;

    let path = if cli.path.starts_with('/') {
        cli.path.clone()
    } else {
        format!("/{}", cli.path)
    };
    let mut method = MethodDescriptor::new(name).request_line(format!("{} {path}", cli.method));
    let mut args = Vec::new();

    for header in &cli.headers {
        method = method.header(header.clone());
    }
    for (key, value) in &cli.query {
        method = method.query_param(key.clone(), "String");
        args.push(Value::String(value.clone()));
    }
    if let Some(body) = &cli.body {
        let body: Value = serde_json::from_str(body).context("--body is not valid JSON")?;
        method = method.body("Json");
        args.push(body);
    }

    Ok((
        InterfaceDescriptor::new(interface).method(method.returns("Json")),
        args,
    ))
}

fn target(cli: &Cli) -> Result<Target> {
    let interface = InterfaceName::new(INTERFACE).context("interface name")?;
    let target = match &cli.name {
        Some(name) => {
            let name = ServiceName::new(name.clone()).context("--name must not be empty")?;
            Target::named(interface, name, cli.url.clone())
        }
        None => Target::new(interface, cli.url.clone()),
    };
    Ok(target?)
}

async fn run(cli: &Cli) -> Result<Value> {
    let mut builder = ConfigurableClientConfig::builder()
        .target(target(cli)?)
        .log_level(cli.log_level)
        .isolation_policy_factory(FixedIsolationPolicyFactory {
            thread_pool_size: cli.pool_size,
            execution_timeout: Duration::from_millis(cli.timeout_ms),
            ..FixedIsolationPolicyFactory::default()
        });
    if let (Some(username), Some(password)) = (&cli.username, &cli.password) {
        builder = builder.basic_auth(BasicAuth::new(username.clone(), password.clone()));
    }
    let config = builder.build().context("building client configuration")?;

    let (interface, args) = describe(cli)?;
    let client = ClientFactory::new()
        .bind(config, &interface)
        .context("binding request")?;

    info!(method = %cli.method, path = %cli.path, "calling");
    client
        .invoke(METHOD, args)
        .await
        .with_context(|| format!("{} {} failed", cli.method, cli.path))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let provider = init_tracing(cli.json_logs, cli.otlp_endpoint.as_deref())?;

    let result = run(&cli).await;

    if let Some(provider) = provider {
        if let Err(e) = provider.shutdown() {
            error!(error = %e, "flushing spans failed");
        }
    }

    let value = result?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("courier").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn pairs_split_on_the_first_equals_sign() {
        assert_eq!(
            parse_pair("filter=a=b").unwrap(),
            ("filter".to_string(), "a=b".to_string())
        );
        assert!(parse_pair("novalue").is_err());
        assert!(parse_pair("=x").is_err());
    }

    #[test]
    fn flags_become_method_parameters() {
        let cli = parse(&[
            "--url",
            "http://fleet.test",
            "--query",
            "owner=ann",
            "--header",
            "Accept: application/json",
            "--body",
            r#"{"plate":"AB-123"}"#,
            "post",
            "vehicles",
        ]);

        let (interface, args) = describe(&cli).unwrap();

        let method = &interface.methods()[0];
        assert_eq!(method.request_line_str(), Some("POST /vehicles"));
        assert_eq!(method.headers(), ["Accept: application/json".to_string()]);
        assert_eq!(method.params().len(), 2);
        assert_eq!(
            args,
            vec![Value::from("ann"), serde_json::json!({ "plate": "AB-123" })]
        );
    }

    #[test]
    fn invalid_body_is_reported() {
        let cli = parse(&["--url", "http://fleet.test", "--body", "{", "put", "/x"]);
        assert!(describe(&cli).is_err());
    }

    #[test]
    fn credentials_must_come_in_pairs() {
        let result = Cli::try_parse_from([
            "courier",
            "--url",
            "http://fleet.test",
            "--username",
            "user",
            "get",
            "/",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn service_name_defaults_to_the_url() {
        let cli = parse(&["--url", "http://fleet.test/", "get", "/"]);
        assert_eq!(target(&cli).unwrap().name().as_str(), "http://fleet.test");

        let cli = parse(&["--url", "http://fleet.test", "--name", "fleet", "get", "/"]);
        assert_eq!(target(&cli).unwrap().name().as_str(), "fleet");
    }
}
