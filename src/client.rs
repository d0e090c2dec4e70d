//! Protocol client for AppFire stoves.
//!
//! [`StoveClient`] performs one request/response round-trip per call. It
//! never retries; retry policy belongs to the coordinator.

use std::time::Duration;

use bytes::Bytes;

use crate::config::{DEFAULT_IO_TIMEOUT, StoveConfig};
use crate::error::ClientError;
use crate::protocol::{Command, DecodedFrame, Request, decode_frame, encode_request};
use crate::transport::{TcpTransport, Transport};
use crate::types::{PrimaryStatus, SecondaryStatus};

/// Client for communicating with an AppFire stove.
pub struct StoveClient<T> {
    transport: T,
    timeout: Duration,
    // Set while an exchange is underway; still set afterwards means the
    // exchange was abandoned and the connection state is unknown.
    exchange_pending: bool,
}

impl StoveClient<TcpTransport> {
    /// Creates a new client for the stove described by `config`.
    ///
    /// No connection is opened until the first request.
    #[must_use]
    pub fn tcp(config: &StoveConfig) -> Self {
        let mut client = Self::new(TcpTransport::from_config(config));
        client.set_timeout(config.io_timeout);
        client
    }
}

impl<T: Transport> StoveClient<T> {
    /// Creates a new client with the given transport.
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            timeout: DEFAULT_IO_TIMEOUT,
            exchange_pending: false,
        }
    }

    /// Sets the timeout for one exchange, connect included.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Returns the exchange timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns true if the transport holds an open connection.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Returns the transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Closes the connection, if any.
    pub async fn disconnect(&mut self) {
        if let Err(e) = self.transport.disconnect().await {
            tracing::debug!("disconnect failed: {}", e);
        }
        self.exchange_pending = false;
    }

    /// Sends one request and decodes the reply.
    ///
    /// Any failure closes the connection so the next call starts clean.
    async fn round_trip(&mut self, request: Request) -> Result<DecodedFrame, ClientError> {
        if self.exchange_pending {
            tracing::debug!("previous exchange was abandoned, reconnecting");
            self.disconnect().await;
        }

        let frame = encode_request(&request);
        let timeout = self.timeout;

        self.exchange_pending = true;
        let result = match tokio::time::timeout(timeout, self.exchange(frame)).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::timeout(timeout)),
        };
        self.exchange_pending = false;

        if let Err(e) = &result {
            tracing::debug!("{:?} failed: {}", request.kind(), e);
            self.disconnect().await;
        }
        result
    }

    /// Handles a well-formed reply that does not answer the request.
    async fn desync(&mut self, request: Request, reply: &DecodedFrame) -> ClientError {
        tracing::warn!("unexpected reply to {:?}: {:?}", request.kind(), reply);
        self.disconnect().await;
        ClientError::Protocol {
            message: format!("unexpected reply to {:?}", request.kind()),
        }
    }

    async fn exchange(&mut self, frame: Bytes) -> Result<DecodedFrame, ClientError> {
        if !self.transport.is_connected() {
            self.transport.connect().await?;
        }
        self.transport.send(frame).await?;
        let reply = self.transport.receive().await?;
        Ok(decode_frame(&reply)?)
    }

    /// Fetches the primary status block.
    pub async fn fetch_primary_status(&mut self) -> Result<PrimaryStatus, ClientError> {
        match self.round_trip(Request::QueryPrimary).await? {
            DecodedFrame::PrimaryStatus(status) => Ok(status),
            other => Err(self.desync(Request::QueryPrimary, &other).await),
        }
    }

    /// Fetches the secondary status block.
    pub async fn fetch_secondary_status(&mut self) -> Result<SecondaryStatus, ClientError> {
        match self.round_trip(Request::QuerySecondary).await? {
            DecodedFrame::SecondaryStatus(status) => Ok(status),
            other => Err(self.desync(Request::QuerySecondary, &other).await),
        }
    }

    /// Sends a control command and waits for its acknowledgement.
    ///
    /// Does not refresh any state; callers decide whether to poll.
    pub async fn send_command(&mut self, command: Command) -> Result<(), ClientError> {
        tracing::debug!("sending command: {}", command);
        let request = Request::Command(command);
        match self.round_trip(request).await? {
            DecodedFrame::Ack(acked) if acked == command => Ok(()),
            other => Err(self.desync(request, &other).await),
        }
    }

    /// Checks whether a connection to the stove can be opened.
    ///
    /// Intended for setup-time validation, not for polling.
    pub async fn is_reachable(&mut self) -> bool {
        if self.transport.is_connected() && !self.exchange_pending {
            return true;
        }
        self.disconnect().await;
        match tokio::time::timeout(self.timeout, self.transport.connect()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::debug!("stove unreachable: {}", e);
                self.disconnect().await;
                false
            }
            Err(_) => {
                tracing::debug!("stove unreachable: connect timed out");
                self.disconnect().await;
                false
            }
        }
    }
}

/// Checks whether the stove described by `config` accepts connections.
///
/// Use this to validate user input before creating a coordinator.
pub async fn probe(config: &StoveConfig) -> crate::Result<bool> {
    config.validate()?;
    let mut client = StoveClient::tcp(config);
    let reachable = client.is_reachable().await;
    client.disconnect().await;
    Ok(reachable)
}
