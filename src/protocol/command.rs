//! Message kinds and control commands for the AppFire protocol.
//!
//! Every exchange is a single request frame answered by a single response
//! frame. Responses reuse the request kind with the high bit set.

use std::fmt;

use crate::error::{Error, Result};

/// Message kinds carried in the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    // Requests
    /// Query the primary status block.
    QueryPrimary = 0x01,
    /// Query the secondary status block.
    QuerySecondary = 0x02,
    /// Turn the stove on.
    PowerOn = 0x10,
    /// Turn the stove off.
    PowerOff = 0x11,
    /// Set the desired ambient temperature.
    SetDesiredTemperature = 0x12,

    // Responses
    /// Primary status block.
    PrimaryStatus = 0x81,
    /// Secondary status block.
    SecondaryStatus = 0x82,
    /// Power on acknowledged.
    PowerOnAck = 0x90,
    /// Power off acknowledged.
    PowerOffAck = 0x91,
    /// Desired temperature acknowledged.
    SetDesiredTemperatureAck = 0x92,
}

/// Bit that marks a response kind.
pub const RESPONSE_FLAG: u8 = 0x80;

impl MessageKind {
    /// Parses a message kind from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::QueryPrimary),
            0x02 => Some(Self::QuerySecondary),
            0x10 => Some(Self::PowerOn),
            0x11 => Some(Self::PowerOff),
            0x12 => Some(Self::SetDesiredTemperature),
            0x81 => Some(Self::PrimaryStatus),
            0x82 => Some(Self::SecondaryStatus),
            0x90 => Some(Self::PowerOnAck),
            0x91 => Some(Self::PowerOffAck),
            0x92 => Some(Self::SetDesiredTemperatureAck),
            _ => None,
        }
    }

    /// Returns true for kinds sent by the stove.
    #[must_use]
    pub const fn is_response(self) -> bool {
        self as u8 & RESPONSE_FLAG != 0
    }

    /// Returns the kind the stove answers this request with.
    #[must_use]
    pub const fn response(self) -> Option<Self> {
        if self.is_response() {
            None
        } else {
            Self::from_byte(self as u8 | RESPONSE_FLAG)
        }
    }
}

impl From<MessageKind> for u8 {
    fn from(kind: MessageKind) -> Self {
        kind as Self
    }
}

/// Lowest desired temperature the stove accepts, in °C.
pub const DESIRED_TEMPERATURE_MIN: f64 = 10.0;

/// Highest desired temperature the stove accepts, in °C.
pub const DESIRED_TEMPERATURE_MAX: f64 = 50.0;

/// A desired ambient temperature, stored in tenths of a degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DesiredTemperature(i16);

impl DesiredTemperature {
    const MIN_TENTHS: i16 = 100;
    const MAX_TENTHS: i16 = 500;

    /// Creates a desired temperature from degrees Celsius, rounded to the
    /// nearest 0.1°C.
    pub fn from_celsius(celsius: f64) -> Result<Self> {
        let invalid = || Error::InvalidTemperature {
            value: celsius,
            min: DESIRED_TEMPERATURE_MIN,
            max: DESIRED_TEMPERATURE_MAX,
        };
        if !celsius.is_finite() {
            return Err(invalid());
        }
        let tenths = (celsius * 10.0).round();
        if tenths < f64::from(Self::MIN_TENTHS) || tenths > f64::from(Self::MAX_TENTHS) {
            return Err(invalid());
        }
        Ok(Self(tenths as i16))
    }

    /// Creates a desired temperature from its wire value.
    #[must_use]
    pub const fn from_tenths(tenths: i16) -> Option<Self> {
        if tenths >= Self::MIN_TENTHS && tenths <= Self::MAX_TENTHS {
            Some(Self(tenths))
        } else {
            None
        }
    }

    /// Returns the wire value in tenths of a degree.
    #[must_use]
    pub const fn tenths(self) -> i16 {
        self.0
    }

    /// Returns the temperature in degrees Celsius.
    #[must_use]
    pub fn celsius(self) -> f64 {
        f64::from(self.0) / 10.0
    }
}

impl fmt::Display for DesiredTemperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}°C", self.celsius())
    }
}

/// Control commands the stove accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Turn the stove on.
    TurnOn,
    /// Turn the stove off.
    TurnOff,
    /// Set the desired ambient temperature.
    SetDesiredTemperature(DesiredTemperature),
}

impl Command {
    /// Returns the request kind for this command.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::TurnOn => MessageKind::PowerOn,
            Self::TurnOff => MessageKind::PowerOff,
            Self::SetDesiredTemperature(_) => MessageKind::SetDesiredTemperature,
        }
    }

    /// Returns the kind the stove acknowledges this command with.
    #[must_use]
    pub const fn ack_kind(&self) -> MessageKind {
        match self {
            Self::TurnOn => MessageKind::PowerOnAck,
            Self::TurnOff => MessageKind::PowerOffAck,
            Self::SetDesiredTemperature(_) => MessageKind::SetDesiredTemperatureAck,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TurnOn => f.write_str("turn on"),
            Self::TurnOff => f.write_str("turn off"),
            Self::SetDesiredTemperature(value) => write!(f, "set desired temperature {value}"),
        }
    }
}

/// Requests the client sends to the stove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Request {
    /// Query the primary status block.
    QueryPrimary,
    /// Query the secondary status block.
    QuerySecondary,
    /// Control command.
    Command(Command),
}

impl Request {
    /// Returns the message kind for this request.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::QueryPrimary => MessageKind::QueryPrimary,
            Self::QuerySecondary => MessageKind::QuerySecondary,
            Self::Command(command) => command.kind(),
        }
    }
}
