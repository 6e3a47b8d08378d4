//! Shared fixtures for client integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use client::{ClientConfigBuilder, ConfigurableClientConfig};
use dispatch::{
    InterfaceDescriptor, InterfaceName, MethodDescriptor, MethodName, Request, RequestOptions,
    Response, Target, Transport, TransportError,
};

pub const URL: &str = "http://fleet.test";

#[derive(Debug)]
enum Step {
    Respond(Response),
    Fail(TransportError),
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<Step>,
    requests: Vec<Request>,
    delay: Option<Duration>,
}

/// Scripted transport. Every clone shares one script and request log.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    pub fn respond(self, response: Response) -> Self {
        self.state.lock().unwrap().script.push_back(Step::Respond(response));
        self
    }

    /// Queues a 200 with a JSON body.
    pub fn respond_json(self, body: &str) -> Self {
        self.respond(
            Response::new(200)
                .with_header("Content-Type", "application/json")
                .with_body(body),
        )
    }

    /// Queues a transport failure.
    pub fn fail(self, error: TransportError) -> Self {
        self.state.lock().unwrap().script.push_back(Step::Fail(error));
        self
    }

    /// Makes every exchange take `delay` before answering.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(
        &self,
        request: &Request,
        _options: &RequestOptions,
    ) -> Result<Response, TransportError> {
        let (step, delay) = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request.clone());
            (state.script.pop_front(), state.delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match step {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Fail(error)) => Err(error),
            None => Err(TransportError::Io {
                message: "mock transport script exhausted".to_string(),
            }),
        }
    }
}

pub fn interface_name() -> InterfaceName {
    InterfaceName::new("Vehicles").unwrap()
}

pub fn target() -> Target {
    Target::new(interface_name(), URL).unwrap()
}

/// A builder targeting [`URL`] with `transport` installed.
pub fn builder(transport: &MockTransport) -> ClientConfigBuilder {
    ConfigurableClientConfig::builder()
        .target(target())
        .transport(transport.clone())
}

/// The `Vehicles` interface used throughout the tests.
pub fn vehicles() -> InterfaceDescriptor {
    InterfaceDescriptor::new(interface_name())
        .method(
            MethodDescriptor::new(MethodName::new("getVehicle").unwrap())
                .request_line("GET /vehicles/{id}")
                .header("Accept: application/json")
                .path_param("id", "i64")
                .returns("Vehicle"),
        )
        .method(
            MethodDescriptor::new(MethodName::new("listVehicles").unwrap())
                .request_line("GET /vehicles")
                .query_param("owner", "String")
                .query_param("tag", "Vec<String>")
                .returns("Vec<Vehicle>"),
        )
        .method(
            MethodDescriptor::new(MethodName::new("register").unwrap())
                .request_line("POST /vehicles")
                .body("Vehicle")
                .returns("Vehicle"),
        )
}
