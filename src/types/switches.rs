// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Switch types for the `UberSmart` controller.
//!
//! The controller exposes four switch fields that are always written together:
//! heating element, circulation pump, holiday mode and solenoid mode. The
//! device reports them in the tag-2 status frame and accepts them back in
//! opcode `06` commands, so the library keeps the raw 5-byte buffer around
//! and mutates it in place.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::command::{OPCODE_SET_SWITCHES, decode_hex, encode_hex};
use crate::error::ValueError;

/// Operating mode of the solenoid valve.
///
/// # Examples
///
/// ```
/// use ubersolar_lib::types::SolenoidMode;
///
/// assert_eq!(SolenoidMode::Auto.as_byte(), 2);
/// assert_eq!(SolenoidMode::try_from(1).unwrap(), SolenoidMode::On);
/// assert!(SolenoidMode::try_from(7).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SolenoidMode {
    /// Valve closed.
    #[default]
    Off,
    /// Valve open.
    On,
    /// Valve driven by the controller.
    Auto,
}

impl SolenoidMode {
    /// Returns the wire value of the mode.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::On => 1,
            Self::Auto => 2,
        }
    }
}

impl TryFrom<u8> for SolenoidMode {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Off),
            1 => Ok(Self::On),
            2 => Ok(Self::Auto),
            other => Err(ValueError::InvalidSolenoidMode(other)),
        }
    }
}

impl fmt::Display for SolenoidMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Off => "off",
            Self::On => "on",
            Self::Auto => "auto",
        };
        f.write_str(name)
    }
}

/// How the element and pump switches interact.
///
/// Some firmware revisions refuse to run the element and the pump at the
/// same time. With [`InterlockPolicy::Exclusive`] turning one of them on
/// forces the other off in the same write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InterlockPolicy {
    /// Element and pump are never on together.
    #[default]
    Exclusive,
    /// Element and pump are switched independently.
    Independent,
}

/// The 5-byte `AllSwitches` buffer.
///
/// Byte 0 is the opcode marker, bytes 1-4 hold element, pump, holiday mode
/// and solenoid mode, in that order.
///
/// # Examples
///
/// ```
/// use ubersolar_lib::types::{InterlockPolicy, Switches};
///
/// let mut switches: Switches = "00000002".parse().unwrap();
/// switches.set_element(true, InterlockPolicy::Exclusive);
///
/// assert_eq!(switches.to_string(), "0601000002");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Switches([u8; Switches::LEN]);

impl Switches {
    /// Size of the buffer in bytes.
    pub const LEN: usize = 5;

    /// Number of hex digits in the four switch fields.
    pub const HEX_DIGITS: usize = 8;

    /// Wraps a raw buffer as reported by the device.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Copies a buffer from a slice.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidSwitchBuffer`] if the slice is not
    /// exactly five bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ValueError> {
        let buffer: [u8; Self::LEN] =
            bytes
                .try_into()
                .map_err(|_| ValueError::InvalidSwitchBuffer {
                    expected: Self::LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(buffer))
    }

    /// Builds a switch command buffer from its four fields.
    #[must_use]
    pub const fn new(element: bool, pump: bool, holiday: bool, solenoid: SolenoidMode) -> Self {
        Self([
            OPCODE_SET_SWITCHES,
            element as u8,
            pump as u8,
            holiday as u8,
            solenoid.as_byte(),
        ])
    }

    /// Returns the raw buffer.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Returns the four switch field bytes, without the marker.
    #[must_use]
    pub fn fields(&self) -> [u8; 4] {
        [self.0[1], self.0[2], self.0[3], self.0[4]]
    }

    /// Returns `true` if the heating element is on.
    #[must_use]
    pub const fn element_on(&self) -> bool {
        self.0[1] != 0
    }

    /// Returns `true` if the pump is on.
    #[must_use]
    pub const fn pump_on(&self) -> bool {
        self.0[2] != 0
    }

    /// Returns `true` if holiday mode is enabled.
    #[must_use]
    pub const fn holiday_mode(&self) -> bool {
        self.0[3] != 0
    }

    /// Returns the solenoid mode, or `None` if the device reported an
    /// unknown value.
    #[must_use]
    pub fn solenoid_mode(&self) -> Option<SolenoidMode> {
        SolenoidMode::try_from(self.0[4]).ok()
    }

    /// Switches the heating element.
    pub fn set_element(&mut self, on: bool, policy: InterlockPolicy) {
        self.0[1] = u8::from(on);
        if on && policy == InterlockPolicy::Exclusive {
            self.0[2] = 0;
        }
    }

    /// Switches the pump.
    pub fn set_pump(&mut self, on: bool, policy: InterlockPolicy) {
        self.0[2] = u8::from(on);
        if on && policy == InterlockPolicy::Exclusive {
            self.0[1] = 0;
        }
    }

    /// Switches holiday mode.
    pub fn set_holiday(&mut self, on: bool) {
        self.0[3] = u8::from(on);
    }

    /// Sets the solenoid mode.
    pub fn set_solenoid(&mut self, mode: SolenoidMode) {
        self.0[4] = mode.as_byte();
    }

    /// Returns a copy with byte 0 forced to the switch opcode, ready to be
    /// written back to the device.
    #[must_use]
    pub fn to_command(mut self) -> Self {
        self.0[0] = OPCODE_SET_SWITCHES;
        self
    }
}

impl FromStr for Switches {
    type Err = ValueError;

    /// Parses the four switch fields from 8 hex digits, e.g. `"00000002"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != Self::HEX_DIGITS {
            return Err(ValueError::InvalidSwitchLength {
                expected: Self::HEX_DIGITS,
                actual: s.len(),
            });
        }
        let fields = decode_hex(s)?;
        let mut buffer = [OPCODE_SET_SWITCHES; Self::LEN];
        buffer[1..].copy_from_slice(&fields);
        Ok(Self(buffer))
    }
}

impl fmt::Display for Switches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_hex(&self.0))
    }
}
