//! # microticks-core
//!
//! Core library for microticks - an event-tracking client for the
//! Microticks analytics API.
//!
//! This library provides:
//! - A FIFO request queue with single-flight dispatch
//! - Lazy session management: a session starts before the first event,
//!   and the server-issued token is stamped onto every request at
//!   dispatch time
//! - A pluggable transport boundary with HTTP and offline ("dummy")
//!   implementations
//! - Configuration management and logging infrastructure
//!
//! ## Example
//!
//! ```rust,no_run
//! use microticks_core::{Client, TrackerConfig};
//!
//! # async fn run() -> microticks_core::Result<()> {
//! let client = Client::new(TrackerConfig {
//!     host: "http://localhost:5000".to_string(),
//!     consumer_key: "my-consumer-key".to_string(),
//!     ..Default::default()
//! })?;
//!
//! // Queued FIFO behind an automatic session start; awaiting the
//! // returned handle is optional.
//! let receipt = client.track_event("click", &serde_json::json!({ "target": "save" }));
//! let body = receipt.await?;
//! println!("stored as {}", body["event_id"]);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use client::{Client, Completion, SessionPhase, DUMMY_TOKEN};
pub use config::{Config, LoggingConfig, TrackerConfig, DUMMY_HOST};
pub use error::{Error, Result, TransportFailure};
pub use transport::{DummyTransport, HttpTransport, Payload, Transport, TransportResult};

// Public modules
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod transport;
pub mod url;
