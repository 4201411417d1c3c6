// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `UberSmart` command definitions.
//!
//! A command is one opcode byte followed by a fixed payload, written to the
//! device's write characteristic in a single GATT write. Commands are also
//! rendered as lowercase hex for logging and for the textual form accepted
//! by [`RawCommand`].
//!
//! # Available Commands
//!
//! | Command Type | Opcode | Payload |
//! |-------------|--------|---------|
//! | [`StatusRequest`] | - | none; only (re)establishes the link |
//! | [`SwitchCommand`] | `06` | element, pump, holiday, solenoid (4 bytes) |
//! | [`SetTimeCommand`] | `09` | [`TimePayload`](crate::types::TimePayload) (12 bytes) |
//! | [`EnableAccessPointCommand`] | `14` | none |
//! | [`RawCommand`] | any | any |
//!
//! # Examples
//!
//! ```
//! use ubersolar_lib::command::{Command, SwitchCommand};
//! use ubersolar_lib::types::Switches;
//!
//! let cmd = SwitchCommand::new("00000002".parse::<Switches>().unwrap());
//! assert_eq!(cmd.to_hex(), "0600000002");
//! ```

mod switch;
mod system;
mod time;

pub use switch::SwitchCommand;
pub use system::{EnableAccessPointCommand, StatusRequest};
pub use time::SetTimeCommand;

use crate::error::ValueError;

/// Opcode that writes all four switches at once.
pub const OPCODE_SET_SWITCHES: u8 = 0x06;

/// Opcode that sets the device clock.
pub const OPCODE_SET_TIME: u8 = 0x09;

/// Opcode that starts the device's Wi-Fi access point.
pub const OPCODE_ENABLE_ACCESS_POINT: u8 = 0x14;

/// A command that can be sent to an `UberSmart` device.
pub trait Command {
    /// Returns the opcode, or `None` for requests that write nothing.
    fn opcode(&self) -> Option<u8>;

    /// Returns the payload following the opcode.
    fn payload(&self) -> Vec<u8>;

    /// Returns the bytes written to the device.
    fn to_bytes(&self) -> Vec<u8> {
        match self.opcode() {
            Some(opcode) => {
                let payload = self.payload();
                let mut bytes = Vec::with_capacity(1 + payload.len());
                bytes.push(opcode);
                bytes.extend_from_slice(&payload);
                bytes
            }
            None => Vec::new(),
        }
    }

    /// Returns the command as lowercase hex.
    fn to_hex(&self) -> String {
        encode_hex(&self.to_bytes())
    }
}

/// An arbitrary command given as raw bytes.
///
/// # Examples
///
/// ```
/// use ubersolar_lib::command::{Command, RawCommand};
///
/// let cmd: RawCommand = "0600010000".parse().unwrap();
/// assert_eq!(cmd.opcode(), Some(0x06));
/// assert_eq!(cmd.payload(), vec![0, 1, 0, 0]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommand(Vec<u8>);

impl RawCommand {
    /// Wraps raw bytes, opcode first.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl std::str::FromStr for RawCommand {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex(s).map(Self)
    }
}

impl Command for RawCommand {
    fn opcode(&self) -> Option<u8> {
        self.0.first().copied()
    }

    fn payload(&self) -> Vec<u8> {
        self.0.get(1..).map(<[u8]>::to_vec).unwrap_or_default()
    }
}

/// Encodes bytes as lowercase hex.
#[must_use]
pub fn encode_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
            // Writing to a String cannot fail
            let _ = write!(out, "{b:02x}");
            out
        })
}

/// Decodes a hex string into bytes.
///
/// # Errors
///
/// Returns [`ValueError::InvalidHex`] if the string has an odd length or
/// contains non-hex characters.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, ValueError> {
    if s.len() % 2 != 0 || !s.is_ascii() {
        return Err(ValueError::InvalidHex(s.to_string()));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| ValueError::InvalidHex(s.to_string()))
        })
        .collect()
}
