//! Merged stove state published by the coordinator.

use std::fmt;

use serde::Serialize;

use crate::types::status::{PrimaryStatus, SecondaryStatus, StoveStatusCode};

/// Semantic fields of a [`StoveSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotField {
    /// Operational state key.
    Status,
    /// Power switch state.
    PowerStatus,
    /// Eco mode flag.
    EcoMode,
    /// Ambient temperature in °C.
    AmbientTemperature,
    /// Desired ambient temperature in °C.
    DesiredTemperature,
    /// Lowest desired temperature in °C.
    DesiredTemperatureMin,
    /// Highest desired temperature in °C.
    DesiredTemperatureMax,
    /// Smoke temperature in °C.
    SmokeTemperature,
    /// Burner power in percent.
    PowerPercentage,
    /// Smoke fan speed in RPM.
    SmokeFanRpm,
    /// Fan 1 speed in percent.
    Fan1Percentage,
}

impl SnapshotField {
    /// Every field, in key order.
    pub const ALL: [Self; 11] = [
        Self::Status,
        Self::PowerStatus,
        Self::EcoMode,
        Self::AmbientTemperature,
        Self::DesiredTemperature,
        Self::DesiredTemperatureMin,
        Self::DesiredTemperatureMax,
        Self::SmokeTemperature,
        Self::PowerPercentage,
        Self::SmokeFanRpm,
        Self::Fan1Percentage,
    ];

    /// Returns the external key name.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::PowerStatus => "power_status",
            Self::EcoMode => "eco_mode",
            Self::AmbientTemperature => "ambient_temperature",
            Self::DesiredTemperature => "desired_ambient_temperature",
            Self::DesiredTemperatureMin => "desired_ambient_temperature_min",
            Self::DesiredTemperatureMax => "desired_ambient_temperature_max",
            Self::SmokeTemperature => "smoke_temperature",
            Self::PowerPercentage => "power_percentage",
            Self::SmokeFanRpm => "smoke_fan_rpm",
            Self::Fan1Percentage => "fan1_percentage",
        }
    }

    /// Looks up a field by its external key name.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }
}

/// A single snapshot value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Status key.
    Text(String),
    /// On/off flags.
    Boolean(bool),
    /// Percentages and RPM.
    Integer(i64),
    /// Temperatures in °C.
    Float(f64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => f.write_str(value),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
        }
    }
}

/// Merged view of both status queries.
///
/// Serializes with the external key names; `version` is not serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoveSnapshot {
    /// Publication counter, starting at 1.
    #[serde(skip)]
    pub version: u64,
    /// Operational state.
    pub status: StoveStatusCode,
    /// Power switch state.
    #[serde(rename = "power_status")]
    pub power_on: bool,
    /// Eco mode enabled.
    pub eco_mode: bool,
    /// Ambient temperature in °C.
    pub ambient_temperature: f64,
    /// Desired ambient temperature in °C.
    #[serde(rename = "desired_ambient_temperature")]
    pub desired_temperature: f64,
    /// Lowest desired temperature in °C.
    #[serde(rename = "desired_ambient_temperature_min")]
    pub desired_temperature_min: f64,
    /// Highest desired temperature in °C.
    #[serde(rename = "desired_ambient_temperature_max")]
    pub desired_temperature_max: f64,
    /// Smoke temperature in °C.
    pub smoke_temperature: f64,
    /// Burner power in percent.
    pub power_percentage: u8,
    /// Smoke fan speed in RPM.
    pub smoke_fan_rpm: u16,
    /// Fan 1 speed in percent.
    pub fan1_percentage: u8,
}

impl StoveSnapshot {
    /// Merges both status blocks into a snapshot.
    #[must_use]
    pub const fn merge(version: u64, primary: &PrimaryStatus, secondary: &SecondaryStatus) -> Self {
        Self {
            version,
            status: primary.status,
            power_on: primary.power_on,
            eco_mode: primary.eco_mode,
            ambient_temperature: primary.ambient_temperature,
            desired_temperature: primary.desired_temperature,
            desired_temperature_min: primary.desired_temperature_min,
            desired_temperature_max: primary.desired_temperature_max,
            smoke_temperature: primary.smoke_temperature,
            power_percentage: primary.power_percentage,
            smoke_fan_rpm: primary.smoke_fan_rpm,
            fan1_percentage: secondary.fan1_percentage,
        }
    }

    /// Returns the value of a field.
    #[must_use]
    pub fn get(&self, field: SnapshotField) -> FieldValue {
        match field {
            SnapshotField::Status => FieldValue::Text(self.status.key().into_owned()),
            SnapshotField::PowerStatus => FieldValue::Boolean(self.power_on),
            SnapshotField::EcoMode => FieldValue::Boolean(self.eco_mode),
            SnapshotField::AmbientTemperature => FieldValue::Float(self.ambient_temperature),
            SnapshotField::DesiredTemperature => FieldValue::Float(self.desired_temperature),
            SnapshotField::DesiredTemperatureMin => FieldValue::Float(self.desired_temperature_min),
            SnapshotField::DesiredTemperatureMax => FieldValue::Float(self.desired_temperature_max),
            SnapshotField::SmokeTemperature => FieldValue::Float(self.smoke_temperature),
            SnapshotField::PowerPercentage => FieldValue::Integer(i64::from(self.power_percentage)),
            SnapshotField::SmokeFanRpm => FieldValue::Integer(i64::from(self.smoke_fan_rpm)),
            SnapshotField::Fan1Percentage => FieldValue::Integer(i64::from(self.fan1_percentage)),
        }
    }

    /// Returns the value stored under an external key name.
    #[must_use]
    pub fn get_key(&self, key: &str) -> Option<FieldValue> {
        SnapshotField::from_key(key).map(|field| self.get(field))
    }

    /// Iterates over all `(key, value)` pairs.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, FieldValue)> + '_ {
        SnapshotField::ALL
            .into_iter()
            .map(|field| (field.key(), self.get(field)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StoveSnapshot {
        let primary = PrimaryStatus {
            status: StoveStatusCode::On,
            power_on: true,
            eco_mode: false,
            ambient_temperature: 21.5,
            desired_temperature: 22.0,
            desired_temperature_min: 10.0,
            desired_temperature_max: 50.0,
            smoke_temperature: 120.0,
            power_percentage: 60,
            smoke_fan_rpm: 1500,
        };
        let secondary = SecondaryStatus { fan1_percentage: 45 };
        StoveSnapshot::merge(1, &primary, &secondary)
    }

    #[test]
    fn test_merge() {
        let snapshot = sample();
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.status, StoveStatusCode::On);
        assert_eq!(snapshot.power_percentage, 60);
        assert_eq!(snapshot.fan1_percentage, 45);
    }

    #[test]
    fn test_get_by_key() {
        let snapshot = sample();
        assert_eq!(
            snapshot.get_key("status"),
            Some(FieldValue::Text("on".into()))
        );
        assert_eq!(
            snapshot.get_key("power_status"),
            Some(FieldValue::Boolean(true))
        );
        assert_eq!(
            snapshot.get_key("ambient_temperature"),
            Some(FieldValue::Float(21.5))
        );
        assert_eq!(
            snapshot.get_key("fan1_percentage"),
            Some(FieldValue::Integer(45))
        );
        assert_eq!(snapshot.get_key("humidity"), None);
    }

    #[test]
    fn test_field_keys_are_unique() {
        for field in SnapshotField::ALL {
            assert_eq!(SnapshotField::from_key(field.key()), Some(field));
        }
        assert_eq!(sample().fields().count(), 11);
    }

    #[test]
    fn test_serialized_keys() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["status"], "on");
        assert_eq!(value["power_status"], true);
        assert_eq!(value["ambient_temperature"], 21.5);
        assert_eq!(value["desired_ambient_temperature"], 22.0);
        assert_eq!(value["power_percentage"], 60);
        assert_eq!(value["fan1_percentage"], 45);
        assert!(value.get("version").is_none());

        let object = value.as_object().unwrap();
        for (key, _) in sample().fields() {
            assert!(object.contains_key(key), "missing {key}");
        }
    }
}
