//! # appfire
//!
//! A Rust client library and polling coordinator for `AppFire` pellet stoves.
//!
//! This library talks to a stove's network module over TCP using its binary
//! request/response protocol, and keeps a merged status snapshot up to date
//! for any number of subscribers.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - Single-flight refreshes shared by all concurrent callers
//! - Polling that runs only while someone is subscribed
//! - Checksummed frames with typed errors for every failure mode
//!
//! ## Quick Start
//!
//! ```no_run
//! use appfire::{Coordinator, StoveConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), appfire::Error> {
//!     let config = StoveConfig::new("192.168.1.50").label("Living room");
//!
//!     // Validate the address before setting anything up
//!     if !appfire::probe(&config).await? {
//!         eprintln!("stove not reachable");
//!         return Ok(());
//!     }
//!
//!     let coordinator = Coordinator::new(config)?;
//!     let snapshot = coordinator.first_refresh().await?;
//!     println!("{}: {}", coordinator.display_name(), snapshot.status);
//!
//!     coordinator.set_desired_temperature(21.5).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`protocol`] - Frames, checksums, message kinds and payload codecs
//! - [`types`] - Status codes, status blocks and the merged snapshot
//! - [`transport`] - Transport implementations (TCP)
//! - [`client`] - One round-trip per call, no retries
//! - [`event`] - Subscriber events and subscription counting
//! - [`coordinator`] - Polling, single-flight refresh and commands

pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod protocol;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use client::{StoveClient, probe};
pub use config::StoveConfig;
pub use coordinator::Coordinator;
pub use error::{ClientError, Error, FrameError, RefreshError, RefreshStage, Result};
pub use event::{CoordinatorEvent, Subscription};
pub use protocol::{Command, DesiredTemperature};
pub use transport::{TcpTransport, Transport};
pub use types::{
    FieldValue, PrimaryStatus, SecondaryStatus, SnapshotField, StoveSnapshot, StoveStatusCode,
};
