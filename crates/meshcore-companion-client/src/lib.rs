//! MeshCore Companion Client
//!
//! Async engine for talking to a MeshCore companion radio. Bytes from a
//! [`Transport`] are reassembled and decoded by `meshcore-companion-protocol`
//! and published through an [`EventDispatcher`]; commands are sent through a
//! [`Correlator`] that resolves each one to its response event.
//!
//! # Example
//!
//! ```rust,no_run
//! use meshcore_companion_client::{ClientConfig, MeshCore, TcpTransport};
//! use meshcore_companion_protocol::EventPayload;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::default();
//! let client = MeshCore::new(TcpTransport::new("192.168.1.20", 5000), config);
//! client.connect().await?;
//!
//! if let EventPayload::Battery(mv) = client.commands().get_bat().await.payload {
//!     println!("battery: {mv} mV");
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod commands;
mod config;
mod correlator;
mod dispatcher;
mod error;
pub mod logging;
mod tcp;
mod transport;

pub use client::*;
pub use commands::*;
pub use config::*;
pub use correlator::*;
pub use dispatcher::*;
pub use error::*;
pub use tcp::*;
pub use transport::*;
