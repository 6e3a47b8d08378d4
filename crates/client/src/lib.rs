//! Courier client factory.
//!
//! Turns a [`ClientConfig`] and an [`InterfaceDescriptor`](dispatch::InterfaceDescriptor)
//! into a callable [`Client`].
//!
//! ## Architectural Layer
//!
//! **Application.** This crate wires the capability traits from [`dispatch`]
//! together with the [`bulkhead`] executor and the default [`transport`]. It
//! owns no protocol logic of its own.
//!
//! ## Example
//!
//! ```no_run
//! use client::{ClientFactory, ConfigurableClientConfig};
//! use dispatch::{InterfaceDescriptor, InterfaceName, MethodDescriptor, MethodName, Target};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let interface = InterfaceName::new("Vehicles").unwrap();
//! let config = ConfigurableClientConfig::builder()
//!     .target(Target::new(interface.clone(), "http://fleet.local")?)
//!     .build()?;
//! let descriptor = InterfaceDescriptor::new(interface).method(
//!     MethodDescriptor::new(MethodName::new("getVehicle").unwrap())
//!         .request_line("GET /vehicles/{id}")
//!         .path_param("id", "i64"),
//! );
//!
//! let client = ClientFactory::new().bind(config, &descriptor)?;
//! let vehicle = client.invoke("getVehicle", vec![json!(7)]).await?;
//! # let _ = vehicle;
//! # Ok(())
//! # }
//! ```

mod config;
mod factory;

pub use config::{ClientConfig, ClientConfigBuilder, ConfigurableClientConfig};
pub use factory::{Client, ClientFactory, Fallback};
