//! Protocol definitions for AppFire communication.
//!
//! This module contains the low-level protocol types including:
//! - Frame encoding/decoding and checksum verification
//! - Message kinds and control commands
//! - Status payload parsing

pub mod command;
pub mod frame;
pub mod parser;

pub use command::{
    Command, DESIRED_TEMPERATURE_MAX, DESIRED_TEMPERATURE_MIN, DesiredTemperature, MessageKind,
    Request,
};
pub use frame::{FRAME_START, Frame, FrameDecoder, MIN_FRAME_SIZE, encode as encode_frame};
pub use parser::{
    DecodedFrame, decode_frame, encode_ack, encode_command, encode_primary_status, encode_request,
    encode_secondary_status, parse_primary_status, parse_secondary_status,
};
