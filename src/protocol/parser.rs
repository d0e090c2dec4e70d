//! Payload encoding and decoding for the AppFire protocol.
//!
//! All multi-byte integers are big-endian. Temperatures travel as signed
//! tenths of a degree Celsius and are converted to `f64` degrees here.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::FrameError;
use crate::protocol::command::{Command, DesiredTemperature, MessageKind, Request};
use crate::protocol::frame::{self, encode};
use crate::types::{PrimaryStatus, SecondaryStatus, StoveStatusCode};

/// Temperature scaling factor (raw value is tenths of a degree).
const TEMPERATURE_SCALE: f64 = 10.0;

/// Primary status payload size.
pub const PRIMARY_STATUS_SIZE: usize = 15;

/// Minimum secondary status payload size.
pub const SECONDARY_STATUS_SIZE: usize = 1;

const FLAG_POWER_ON: u8 = 0x01;
const FLAG_ECO_MODE: u8 = 0x02;

/// A validated, decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedFrame {
    /// A request sent to the stove.
    Request(Request),
    /// Primary status block.
    PrimaryStatus(PrimaryStatus),
    /// Secondary status block.
    SecondaryStatus(SecondaryStatus),
    /// Command acknowledgement echoing the command.
    Ack(Command),
}

fn temperature_from_raw(raw: i16) -> f64 {
    f64::from(raw) / TEMPERATURE_SCALE
}

fn temperature_to_raw(celsius: f64) -> i16 {
    (celsius * TEMPERATURE_SCALE).round() as i16
}

fn ensure_len(kind: u8, payload: &[u8], expected: usize) -> Result<(), FrameError> {
    if payload.len() < expected {
        return Err(FrameError::PayloadTooShort {
            kind,
            expected,
            got: payload.len(),
        });
    }
    Ok(())
}

fn command_payload(command: &Command) -> Bytes {
    match command {
        Command::TurnOn | Command::TurnOff => Bytes::new(),
        Command::SetDesiredTemperature(value) => {
            Bytes::copy_from_slice(&value.tenths().to_be_bytes())
        }
    }
}

/// Encodes a request into a complete frame.
#[must_use]
pub fn encode_request(request: &Request) -> Bytes {
    let payload = match request {
        Request::QueryPrimary | Request::QuerySecondary => Bytes::new(),
        Request::Command(command) => command_payload(command),
    };
    encode(request.kind().into(), &payload)
}

/// Encodes a command into a complete frame.
#[must_use]
pub fn encode_command(command: &Command) -> Bytes {
    encode_request(&Request::Command(*command))
}

/// Encodes the acknowledgement the stove sends for a command.
#[must_use]
pub fn encode_ack(command: &Command) -> Bytes {
    encode(command.ack_kind().into(), &command_payload(command))
}

/// Encodes a primary status block into a complete frame.
///
/// Format:
/// ```text
/// [status:1] [flags:1] [ambient:2] [desired:2] [desired_min:2]
/// [desired_max:2] [smoke:2] [power_pct:1] [smoke_rpm:2]
/// ```
#[must_use]
pub fn encode_primary_status(status: &PrimaryStatus) -> Bytes {
    let mut buf = BytesMut::with_capacity(PRIMARY_STATUS_SIZE);
    buf.put_u8(status.status.code());
    let mut flags = 0;
    if status.power_on {
        flags |= FLAG_POWER_ON;
    }
    if status.eco_mode {
        flags |= FLAG_ECO_MODE;
    }
    buf.put_u8(flags);
    buf.put_i16(temperature_to_raw(status.ambient_temperature));
    buf.put_i16(temperature_to_raw(status.desired_temperature));
    buf.put_i16(temperature_to_raw(status.desired_temperature_min));
    buf.put_i16(temperature_to_raw(status.desired_temperature_max));
    buf.put_i16(temperature_to_raw(status.smoke_temperature));
    buf.put_u8(status.power_percentage);
    buf.put_u16(status.smoke_fan_rpm);
    encode(MessageKind::PrimaryStatus.into(), &buf)
}

/// Encodes a secondary status block into a complete frame.
#[must_use]
pub fn encode_secondary_status(status: &SecondaryStatus) -> Bytes {
    encode(MessageKind::SecondaryStatus.into(), &[status.fan1_percentage])
}

/// Parses a primary status payload.
pub fn parse_primary_status(data: &[u8]) -> Result<PrimaryStatus, FrameError> {
    ensure_len(MessageKind::PrimaryStatus.into(), data, PRIMARY_STATUS_SIZE)?;

    let mut cursor = std::io::Cursor::new(data);
    let status = StoveStatusCode::from_code(cursor.get_u8());
    let flags = cursor.get_u8();
    let ambient = cursor.get_i16();
    let desired = cursor.get_i16();
    let desired_min = cursor.get_i16();
    let desired_max = cursor.get_i16();
    let smoke = cursor.get_i16();
    let power_percentage = cursor.get_u8();
    let smoke_fan_rpm = cursor.get_u16();

    Ok(PrimaryStatus {
        status,
        power_on: flags & FLAG_POWER_ON != 0,
        eco_mode: flags & FLAG_ECO_MODE != 0,
        ambient_temperature: temperature_from_raw(ambient),
        desired_temperature: temperature_from_raw(desired),
        desired_temperature_min: temperature_from_raw(desired_min),
        desired_temperature_max: temperature_from_raw(desired_max),
        smoke_temperature: temperature_from_raw(smoke),
        power_percentage,
        smoke_fan_rpm,
    })
}

/// Parses a secondary status payload.
///
/// Bytes past the known fields are reserved and ignored.
pub fn parse_secondary_status(data: &[u8]) -> Result<SecondaryStatus, FrameError> {
    ensure_len(MessageKind::SecondaryStatus.into(), data, SECONDARY_STATUS_SIZE)?;
    Ok(SecondaryStatus {
        fan1_percentage: data[0],
    })
}

fn parse_command(kind: MessageKind, data: &[u8]) -> Result<Command, FrameError> {
    match kind {
        MessageKind::PowerOn | MessageKind::PowerOnAck => Ok(Command::TurnOn),
        MessageKind::PowerOff | MessageKind::PowerOffAck => Ok(Command::TurnOff),
        _ => {
            ensure_len(kind.into(), data, 2)?;
            let tenths = i16::from_be_bytes([data[0], data[1]]);
            DesiredTemperature::from_tenths(tenths)
                .map(Command::SetDesiredTemperature)
                .ok_or_else(|| FrameError::InvalidValue {
                    reason: format!("desired temperature {tenths} tenths out of range"),
                })
        }
    }
}

/// Validates and decodes a complete frame.
///
/// The checksum is checked first; on mismatch nothing is decoded.
pub fn decode_frame(data: &[u8]) -> Result<DecodedFrame, FrameError> {
    let frame = frame::verify(data)?;
    let kind = MessageKind::from_byte(frame.kind).ok_or(FrameError::UnknownKind(frame.kind))?;
    let payload = &frame.payload[..];

    let decoded = match kind {
        MessageKind::QueryPrimary => DecodedFrame::Request(Request::QueryPrimary),
        MessageKind::QuerySecondary => DecodedFrame::Request(Request::QuerySecondary),
        MessageKind::PowerOn | MessageKind::PowerOff | MessageKind::SetDesiredTemperature => {
            DecodedFrame::Request(Request::Command(parse_command(kind, payload)?))
        }
        MessageKind::PrimaryStatus => DecodedFrame::PrimaryStatus(parse_primary_status(payload)?),
        MessageKind::SecondaryStatus => {
            DecodedFrame::SecondaryStatus(parse_secondary_status(payload)?)
        }
        MessageKind::PowerOnAck
        | MessageKind::PowerOffAck
        | MessageKind::SetDesiredTemperatureAck => {
            DecodedFrame::Ack(parse_command(kind, payload)?)
        }
    };

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary() -> PrimaryStatus {
        PrimaryStatus {
            status: StoveStatusCode::On,
            power_on: true,
            eco_mode: true,
            ambient_temperature: 21.5,
            desired_temperature: 22.0,
            desired_temperature_min: 10.0,
            desired_temperature_max: 50.0,
            smoke_temperature: 142.3,
            power_percentage: 60,
            smoke_fan_rpm: 1480,
        }
    }

    #[test]
    fn test_request_round_trip() {
        let requests = [
            Request::QueryPrimary,
            Request::QuerySecondary,
            Request::Command(Command::TurnOn),
            Request::Command(Command::TurnOff),
            Request::Command(Command::SetDesiredTemperature(
                DesiredTemperature::from_celsius(10.0).unwrap(),
            )),
            Request::Command(Command::SetDesiredTemperature(
                DesiredTemperature::from_celsius(23.7).unwrap(),
            )),
            Request::Command(Command::SetDesiredTemperature(
                DesiredTemperature::from_celsius(50.0).unwrap(),
            )),
        ];
        for request in requests {
            let frame = encode_request(&request);
            assert_eq!(
                decode_frame(&frame).unwrap(),
                DecodedFrame::Request(request)
            );
        }
    }

    #[test]
    fn test_ack_round_trip() {
        let command =
            Command::SetDesiredTemperature(DesiredTemperature::from_celsius(19.5).unwrap());
        let frame = encode_ack(&command);
        assert_eq!(frame[1], MessageKind::SetDesiredTemperatureAck as u8);
        assert_eq!(decode_frame(&frame).unwrap(), DecodedFrame::Ack(command));
        assert_eq!(
            decode_frame(&encode_ack(&Command::TurnOff)).unwrap(),
            DecodedFrame::Ack(Command::TurnOff)
        );
    }

    #[test]
    fn test_set_desired_temperature_wire_format() {
        let command =
            Command::SetDesiredTemperature(DesiredTemperature::from_celsius(22.0).unwrap());
        let frame = encode_command(&command);
        assert_eq!(&frame[..5], &[0xa5, 0x12, 0x02, 0x00, 0xdc]);
    }

    #[test]
    fn test_primary_status_round_trip() {
        let status = primary();
        let frame = encode_primary_status(&status);
        assert_eq!(frame.len(), PRIMARY_STATUS_SIZE + 4);
        assert_eq!(
            decode_frame(&frame).unwrap(),
            DecodedFrame::PrimaryStatus(status)
        );
    }

    #[test]
    fn test_primary_status_negative_temperature() {
        let mut status = primary();
        status.ambient_temperature = -3.5;
        let decoded = decode_frame(&encode_primary_status(&status)).unwrap();
        let DecodedFrame::PrimaryStatus(decoded) = decoded else {
            panic!("expected primary status");
        };
        assert!((decoded.ambient_temperature + 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_primary_status_unknown_code() {
        let mut status = primary();
        status.status = StoveStatusCode::Unknown(200);
        let DecodedFrame::PrimaryStatus(decoded) =
            decode_frame(&encode_primary_status(&status)).unwrap()
        else {
            panic!("expected primary status");
        };
        assert_eq!(decoded.status, StoveStatusCode::Unknown(200));
        assert!((decoded.ambient_temperature - 21.5).abs() < f64::EPSILON);
        assert_eq!(decoded.power_percentage, 60);
    }

    #[test]
    fn test_secondary_status_ignores_reserved_bytes() {
        let frame = encode(MessageKind::SecondaryStatus.into(), &[45, 0xff, 0x00]);
        assert_eq!(
            decode_frame(&frame).unwrap(),
            DecodedFrame::SecondaryStatus(SecondaryStatus { fan1_percentage: 45 })
        );
    }

    #[test]
    fn test_primary_status_payload_too_short() {
        let frame = encode(MessageKind::PrimaryStatus.into(), &[8, 1, 0]);
        assert_eq!(
            decode_frame(&frame),
            Err(FrameError::PayloadTooShort {
                kind: 0x81,
                expected: PRIMARY_STATUS_SIZE,
                got: 3
            })
        );
    }

    #[test]
    fn test_decode_rejects_corruption_without_partial_decode() {
        let frame = encode_primary_status(&primary());
        for index in 0..frame.len() {
            let mut corrupted = frame.to_vec();
            corrupted[index] = corrupted[index].wrapping_add(1);
            assert!(
                matches!(decode_frame(&corrupted), Err(FrameError::Checksum { .. })),
                "byte {index}"
            );
        }
    }

    #[test]
    fn test_decode_unknown_kind() {
        let frame = encode(0x42, &[]);
        assert_eq!(decode_frame(&frame), Err(FrameError::UnknownKind(0x42)));
    }

    #[test]
    fn test_decode_out_of_range_temperature() {
        let frame = encode(MessageKind::SetDesiredTemperature.into(), &[0x02, 0x58]);
        assert!(matches!(
            decode_frame(&frame),
            Err(FrameError::InvalidValue { .. })
        ));
    }
}
