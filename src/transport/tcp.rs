//! TCP transport implementation.
//!
//! This module provides the socket connection to the stove's network module.

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::StoveConfig;
use crate::error::ClientError;
use crate::protocol::{FrameDecoder, MIN_FRAME_SIZE};
use crate::transport::{Transport, TransportFuture};

/// TCP transport for AppFire communication.
pub struct TcpTransport {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
    decoder: FrameDecoder,
}

impl TcpTransport {
    /// Creates a new transport for the given host and port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            stream: None,
            decoder: FrameDecoder::new(),
        }
    }

    /// Creates a new transport from a stove configuration.
    #[must_use]
    pub fn from_config(config: &StoveConfig) -> Self {
        Self::new(config.host.clone(), config.port)
    }

    /// Returns `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn connection_error(&self, err: std::io::Error) -> ClientError {
        ClientError::connection(self.address(), err)
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if self.stream.is_some() {
                return Ok(());
            }

            tracing::info!("connecting to stove at {}", self.address());

            let stream = TcpStream::connect((self.host.as_str(), self.port))
                .await
                .map_err(|e| self.connection_error(e))?;

            if let Err(e) = stream.set_nodelay(true) {
                tracing::warn!("failed to set TCP_NODELAY: {}", e);
            }

            self.decoder.clear();
            self.stream = Some(stream);

            tracing::info!("connected to stove");
            Ok(())
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if let Some(mut stream) = self.stream.take() {
                tracing::info!("disconnecting from stove at {}", self.address());
                if let Err(e) = stream.shutdown().await {
                    tracing::debug!("socket shutdown failed: {}", e);
                }
            }
            self.decoder.clear();
            Ok(())
        })
    }

    fn send(&mut self, frame: Bytes) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let addr = self.address();
            let stream = self.stream.as_mut().ok_or_else(|| {
                ClientError::connection(
                    addr.clone(),
                    std::io::Error::new(std::io::ErrorKind::NotConnected, "not connected"),
                )
            })?;

            tracing::trace!("sending frame: {}", hex::encode(&frame));

            stream
                .write_all(&frame)
                .await
                .map_err(|e| ClientError::connection(addr.clone(), e))?;
            stream
                .flush()
                .await
                .map_err(|e| ClientError::connection(addr, e))?;

            Ok(())
        })
    }

    fn receive(&mut self) -> TransportFuture<'_, Bytes> {
        Box::pin(async move {
            let addr = self.address();
            let Some(stream) = self.stream.as_mut() else {
                return Err(ClientError::connection(
                    addr,
                    std::io::Error::new(std::io::ErrorKind::NotConnected, "not connected"),
                ));
            };

            let mut buf = [0u8; 512];
            loop {
                if let Some(frame) = self.decoder.decode() {
                    tracing::trace!("received frame: {}", hex::encode(&frame));
                    return Ok(frame);
                }

                let n = stream
                    .read(&mut buf)
                    .await
                    .map_err(|e| ClientError::connection(addr.clone(), e))?;
                if n == 0 {
                    tracing::debug!("stove closed the connection mid-frame");
                    return Err(ClientError::ShortRead {
                        expected: self.decoder.pending_frame_size().unwrap_or(MIN_FRAME_SIZE),
                        got: self.decoder.buffered(),
                    });
                }

                tracing::trace!("received {} bytes", n);
                self.decoder.feed(&buf[..n]);
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}
