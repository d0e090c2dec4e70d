//! Stove connection and polling configuration.

use std::time::Duration;

use crate::error::{Error, Result};

/// Default TCP port of the stove's network module.
pub const DEFAULT_PORT: u16 = 5000;

/// Default polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Shortest polling interval; shorter values are raised to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default timeout for one request/response exchange.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for one stove.
///
/// Immutable once handed to a [`Coordinator`](crate::Coordinator); build a
/// new coordinator to change it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoveConfig {
    /// Host name or IP address of the stove.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Interval between scheduled refreshes.
    pub poll_interval: Duration,
    /// Timeout for one exchange, connect included.
    pub io_timeout: Duration,
    /// Optional user-facing name.
    pub label: Option<String>,
    /// Optional stove serial number, a stable identity across address changes.
    pub serial: Option<String>,
}

impl StoveConfig {
    /// Creates a new configuration with default settings.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            io_timeout: DEFAULT_IO_TIMEOUT,
            label: None,
            serial: None,
        }
    }

    /// Sets the TCP port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the polling interval, raised to [`MIN_POLL_INTERVAL`] if shorter.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        if interval < MIN_POLL_INTERVAL {
            tracing::warn!(
                "polling interval {:?} below minimum, using {:?}",
                interval,
                MIN_POLL_INTERVAL
            );
            self.poll_interval = MIN_POLL_INTERVAL;
        } else {
            self.poll_interval = interval;
        }
        self
    }

    /// Sets the polling interval in seconds.
    #[must_use]
    pub fn poll_interval_secs(self, secs: u64) -> Self {
        self.poll_interval(Duration::from_secs(secs))
    }

    /// Sets the I/O timeout.
    #[must_use]
    pub const fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Sets the user-facing name.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the stove serial number.
    #[must_use]
    pub fn serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    /// Applies the polling floor to an interval set directly on the field.
    #[must_use]
    pub(crate) fn clamped(self) -> Self {
        let interval = self.poll_interval;
        self.poll_interval(interval)
    }

    /// Returns `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the label, else the serial, else the address.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.label_text()
            .or_else(|| self.serial_number())
            .map_or_else(|| self.address(), str::to_owned)
    }

    /// Returns a title such as `Stove Living room (AF1234)`.
    #[must_use]
    pub fn title(&self) -> String {
        match (self.label_text(), self.serial_number()) {
            (Some(label), Some(serial)) => format!("Stove {label} ({serial})"),
            (None, Some(serial)) => format!("Stove {serial}"),
            (Some(label), None) => format!("Stove {label}"),
            (None, None) => format!("Stove {}", self.address()),
        }
    }

    fn label_text(&self) -> Option<&str> {
        non_blank(self.label.as_deref())
    }

    fn serial_number(&self) -> Option<&str> {
        non_blank(self.serial.as_deref())
    }

    /// Checks that the configuration can be used.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::InvalidConfig {
                reason: "host is empty".into(),
            });
        }
        if self.port == 0 {
            return Err(Error::InvalidConfig {
                reason: "port must be between 1 and 65535".into(),
            });
        }
        if self.io_timeout.is_zero() {
            return Err(Error::InvalidConfig {
                reason: "I/O timeout must be positive".into(),
            });
        }
        Ok(())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
