// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoder and encoder for tagged status frames.
//!
//! | Tag | Layout (offset:width) |
//! |-----|-----------------------|
//! | 1 | water temp f32 (1:4), manifold temp f32 (5:4), stored water f32 (9:4) |
//! | 2 | element u8 (1), pump u8 (2), holiday u8 (3), solenoid mode u8 (4), solenoid state f32 (5:4) |
//! | 3 | device time u64 (1:8), runtime hours f32 (9:4), light u16 (13:2) |
//! | 4 | rssi i16 (1:2), panel V f32 (3:4), chip temp f32 (7:4), water level f32 (11:4), tank size f32 (15:4) |
//! | 5 | panel, element, pump, solenoid fault codes u8 (1..=4) |

use crate::error::ParseError;
use crate::state::StatusFragment;
use crate::types::Switches;

/// Returns the minimum frame length for a tag, or `None` for unknown tags.
#[must_use]
pub fn frame_len(tag: u8) -> Option<usize> {
    match tag {
        1 => Some(13),
        2 => Some(9),
        3 => Some(15),
        4 => Some(19),
        5 => Some(5),
        _ => None,
    }
}

/// Decodes one notification frame.
///
/// Frames with an unknown tag decode to [`StatusFragment::Unknown`].
/// Trailing bytes beyond a tag's layout are ignored.
///
/// # Errors
///
/// Returns [`ParseError::EmptyFrame`] for an empty frame and
/// [`ParseError::Truncated`] when the frame is shorter than its layout.
pub fn decode_frame(data: &[u8]) -> Result<StatusFragment, ParseError> {
    let Some(&tag) = data.first() else {
        return Err(ParseError::EmptyFrame);
    };
    let Some(expected) = frame_len(tag) else {
        return Ok(StatusFragment::Unknown(tag));
    };
    if data.len() < expected {
        return Err(ParseError::Truncated {
            tag,
            expected,
            actual: data.len(),
        });
    }

    let reader = Reader(data);
    let fragment = match tag {
        1 => StatusFragment::Temperatures {
            water_temperature: reader.f32(1),
            manifold_temperature: reader.f32(5),
            stored_water: reader.f32(9),
        },
        2 => StatusFragment::Switches {
            element_on: data[1],
            pump_on: data[2],
            holiday_mode: data[3],
            solenoid_mode: data[4],
            solenoid_state: reader.f32(5),
            all_switches: Switches::from_bytes([data[0], data[1], data[2], data[3], data[4]]),
        },
        3 => StatusFragment::Runtime {
            device_time: u64::from_le_bytes(reader.array(1)),
            runtime_hours: reader.f32(9),
            light_level: u16::from_le_bytes(reader.array(13)),
        },
        4 => StatusFragment::Diagnostics {
            rssi: i16::from_le_bytes(reader.array(1)),
            panel_voltage: reader.f32(3),
            chip_temperature: reader.f32(7),
            water_level: reader.f32(11),
            tank_size: reader.f32(15),
        },
        _ => StatusFragment::Faults {
            panel: data[1],
            element: data[2],
            pump: data[3],
            solenoid: data[4],
        },
    };

    Ok(fragment)
}

/// Encodes a fragment back into its frame layout.
///
/// This is the inverse of [`decode_frame`]; for tag 2 the switch bytes are
/// taken from the individual fields, not from `all_switches`.
/// [`StatusFragment::Unknown`] encodes to its bare tag.
#[must_use]
pub fn encode_frame(fragment: &StatusFragment) -> Vec<u8> {
    let tag = fragment.tag();
    let mut frame = Vec::with_capacity(frame_len(tag).unwrap_or(1));
    frame.push(tag);

    match fragment {
        StatusFragment::Temperatures {
            water_temperature,
            manifold_temperature,
            stored_water,
        } => {
            frame.extend_from_slice(&water_temperature.to_le_bytes());
            frame.extend_from_slice(&manifold_temperature.to_le_bytes());
            frame.extend_from_slice(&stored_water.to_le_bytes());
        }
        StatusFragment::Switches {
            element_on,
            pump_on,
            holiday_mode,
            solenoid_mode,
            solenoid_state,
            ..
        } => {
            frame.extend_from_slice(&[*element_on, *pump_on, *holiday_mode, *solenoid_mode]);
            frame.extend_from_slice(&solenoid_state.to_le_bytes());
        }
        StatusFragment::Runtime {
            device_time,
            runtime_hours,
            light_level,
        } => {
            frame.extend_from_slice(&device_time.to_le_bytes());
            frame.extend_from_slice(&runtime_hours.to_le_bytes());
            frame.extend_from_slice(&light_level.to_le_bytes());
        }
        StatusFragment::Diagnostics {
            rssi,
            panel_voltage,
            chip_temperature,
            water_level,
            tank_size,
        } => {
            frame.extend_from_slice(&rssi.to_le_bytes());
            frame.extend_from_slice(&panel_voltage.to_le_bytes());
            frame.extend_from_slice(&chip_temperature.to_le_bytes());
            frame.extend_from_slice(&water_level.to_le_bytes());
            frame.extend_from_slice(&tank_size.to_le_bytes());
        }
        StatusFragment::Faults {
            panel,
            element,
            pump,
            solenoid,
        } => frame.extend_from_slice(&[*panel, *element, *pump, *solenoid]),
        StatusFragment::Unknown(_) => {}
    }

    frame
}

/// Fixed-offset little-endian reads over a length-checked frame.
struct Reader<'a>(&'a [u8]);

impl Reader<'_> {
    fn array<const N: usize>(&self, offset: usize) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.0[offset..offset + N]);
        out
    }

    fn f32(&self, offset: usize) -> f32 {
        f32::from_le_bytes(self.array(offset))
    }
}
