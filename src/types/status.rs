//! Stove status types.

use std::borrow::Cow;
use std::fmt;

use serde::{Serialize, Serializer};

/// Operational and error states reported by the stove.
///
/// Codes the library does not know are kept as [`StoveStatusCode::Unknown`]
/// so the raw value stays available for diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoveStatusCode {
    /// Stove is off.
    Off,
    /// Checks before ignition.
    CheckingBeforeStart,
    /// Burner cleaning before ignition.
    CleaningBeforeStart,
    /// Pellet preload.
    Preload,
    /// Waiting for the fire to catch.
    WaitingFire,
    /// Ignition.
    StartBurning,
    /// Flame stabilization.
    Stabilization,
    /// Running.
    On,
    /// Shutdown cleaning.
    TurningOff,
    /// Cooling down after shutdown.
    CoolingDown,
    /// Pellet level low.
    WarningLowPellet,
    /// Out of pellets.
    ErrorEndPellet,
    /// Feed screw jammed.
    ErrorScrewJammed,
    /// Burner cleaning required.
    CleanBurner,
    /// Code not in the list above.
    Unknown(u8),
}

impl StoveStatusCode {
    /// Every known status, in code order.
    pub const KNOWN: [Self; 14] = [
        Self::Off,
        Self::CheckingBeforeStart,
        Self::CleaningBeforeStart,
        Self::Preload,
        Self::WaitingFire,
        Self::StartBurning,
        Self::Stabilization,
        Self::On,
        Self::TurningOff,
        Self::CoolingDown,
        Self::WarningLowPellet,
        Self::ErrorEndPellet,
        Self::ErrorScrewJammed,
        Self::CleanBurner,
    ];

    /// Parses a status from its wire code.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Off,
            1 => Self::CheckingBeforeStart,
            2 => Self::CleaningBeforeStart,
            3 => Self::Preload,
            4 => Self::WaitingFire,
            5 => Self::StartBurning,
            7 => Self::Stabilization,
            8 => Self::On,
            9 => Self::TurningOff,
            10 => Self::CoolingDown,
            14 => Self::WarningLowPellet,
            15 => Self::ErrorEndPellet,
            65 => Self::ErrorScrewJammed,
            70 => Self::CleanBurner,
            other => Self::Unknown(other),
        }
    }

    /// Returns the wire code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::CheckingBeforeStart => 1,
            Self::CleaningBeforeStart => 2,
            Self::Preload => 3,
            Self::WaitingFire => 4,
            Self::StartBurning => 5,
            Self::Stabilization => 7,
            Self::On => 8,
            Self::TurningOff => 9,
            Self::CoolingDown => 10,
            Self::WarningLowPellet => 14,
            Self::ErrorEndPellet => 15,
            Self::ErrorScrewJammed => 65,
            Self::CleanBurner => 70,
            Self::Unknown(code) => code,
        }
    }

    /// Returns the stable semantic key for this status.
    ///
    /// Unknown codes map to `unknown_<code>`, which is outside the set
    /// returned by [`StoveStatusCode::all_keys`]. Consumers must accept it.
    #[must_use]
    pub fn key(self) -> Cow<'static, str> {
        let key = match self {
            Self::Off => "off",
            Self::CheckingBeforeStart => "checking_before_start",
            Self::CleaningBeforeStart => "cleaning_before_start",
            Self::Preload => "preloading",
            Self::WaitingFire => "waiting_fire",
            Self::StartBurning => "start_burning",
            Self::Stabilization => "stabilization",
            Self::On => "on",
            Self::TurningOff => "turning_off",
            Self::CoolingDown => "cooling_down",
            Self::WarningLowPellet => "warning_low_pellet",
            Self::ErrorEndPellet => "error_end_pellet",
            Self::ErrorScrewJammed => "error_screw_jammed",
            Self::CleanBurner => "clean_burner",
            Self::Unknown(code) => return Cow::Owned(format!("unknown_{code}")),
        };
        Cow::Borrowed(key)
    }

    /// Returns true unless this is an unknown code.
    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Returns the keys of all known statuses.
    #[must_use]
    pub fn all_keys() -> Vec<&'static str> {
        Self::KNOWN
            .iter()
            .filter_map(|status| match status.key() {
                Cow::Borrowed(key) => Some(key),
                Cow::Owned(_) => None,
            })
            .collect()
    }
}

impl fmt::Display for StoveStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl Serialize for StoveStatusCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.key())
    }
}

/// Maps a raw status code to its semantic key.
#[must_use]
pub fn code_to_key(code: u8) -> Cow<'static, str> {
    StoveStatusCode::from_code(code).key()
}

/// Fields decoded from the primary status query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimaryStatus {
    /// Operational state.
    pub status: StoveStatusCode,
    /// Power switch state.
    pub power_on: bool,
    /// Eco mode enabled.
    pub eco_mode: bool,
    /// Ambient temperature in °C.
    pub ambient_temperature: f64,
    /// Desired ambient temperature in °C.
    pub desired_temperature: f64,
    /// Lowest desired temperature the stove allows, in °C.
    pub desired_temperature_min: f64,
    /// Highest desired temperature the stove allows, in °C.
    pub desired_temperature_max: f64,
    /// Smoke temperature in °C.
    pub smoke_temperature: f64,
    /// Burner power in percent.
    pub power_percentage: u8,
    /// Smoke extraction fan speed in RPM.
    pub smoke_fan_rpm: u16,
}

/// Fields decoded from the secondary status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecondaryStatus {
    /// Fan 1 speed in percent.
    pub fan1_percentage: u8,
}
