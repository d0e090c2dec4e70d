//! Transport layer for AppFire communication.
//!
//! This module provides the abstraction for different transport methods.
//! Stoves are reached over TCP; other implementations exist for testing.

pub mod tcp;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::error::ClientError;

/// Boxed future returned by [`Transport`] methods.
pub type TransportFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, ClientError>> + Send + 'a>>;

/// Trait for transport implementations.
///
/// A transport carries whole frames. It does not verify checksums and does
/// not apply timeouts; the client does both.
pub trait Transport: Send + Sync {
    /// Connects to the stove.
    fn connect(&mut self) -> TransportFuture<'_, ()>;

    /// Disconnects from the stove, dropping any buffered data.
    fn disconnect(&mut self) -> TransportFuture<'_, ()>;

    /// Sends one encoded frame.
    fn send(&mut self, frame: Bytes) -> TransportFuture<'_, ()>;

    /// Receives the next raw frame, checksum included.
    fn receive(&mut self) -> TransportFuture<'_, Bytes>;

    /// Returns true if connected.
    fn is_connected(&self) -> bool;
}

pub use tcp::TcpTransport;
