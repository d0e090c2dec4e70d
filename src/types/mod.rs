//! Data types for AppFire stoves.
//!
//! This module contains the core data structures used throughout the library:
//! - Status codes and the two decoded status blocks
//! - The merged snapshot published by the coordinator

pub mod snapshot;
pub mod status;

pub use snapshot::{FieldValue, SnapshotField, StoveSnapshot};
pub use status::{PrimaryStatus, SecondaryStatus, StoveStatusCode, code_to_key};
