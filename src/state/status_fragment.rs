// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoded status fragments.
//!
//! The controller never sends its full status in one frame. It cycles
//! through five fixed-shape frames, each identified by its first byte and
//! carrying a disjoint subset of the status fields. A [`StatusFragment`] is
//! one such decoded frame; merging fragments into a
//! [`DeviceStatus`](super::DeviceStatus) reconstructs the full picture.
//!
//! | Tag | Variant |
//! |-----|---------|
//! | 1 | [`StatusFragment::Temperatures`] |
//! | 2 | [`StatusFragment::Switches`] |
//! | 3 | [`StatusFragment::Runtime`] |
//! | 4 | [`StatusFragment::Diagnostics`] |
//! | 5 | [`StatusFragment::Faults`] |
//! | other | [`StatusFragment::Unknown`] |

use serde::{Deserialize, Serialize};

use crate::types::Switches;

/// One decoded notification frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatusFragment {
    /// Tag 1: temperatures and stored water.
    Temperatures {
        /// Tank water temperature.
        water_temperature: f32,
        /// Collector manifold temperature.
        manifold_temperature: f32,
        /// Stored hot water metric.
        stored_water: f32,
    },

    /// Tag 2: switch states.
    Switches {
        /// Heating element (0 = off).
        element_on: u8,
        /// Circulation pump (0 = off).
        pump_on: u8,
        /// Holiday mode (0 = off).
        holiday_mode: u8,
        /// Solenoid mode (0 = off, 1 = on, 2 = auto).
        solenoid_mode: u8,
        /// Analog solenoid state.
        solenoid_state: f32,
        /// Frame bytes 0-4, kept verbatim for read-modify-write.
        all_switches: Switches,
    },

    /// Tag 3: clock and counters.
    Runtime {
        /// Device clock as a Unix timestamp.
        device_time: u64,
        /// Accumulated runtime in hours.
        runtime_hours: f32,
        /// Ambient light level.
        light_level: u16,
    },

    /// Tag 4: radio, electrical and tank diagnostics.
    Diagnostics {
        /// Signal strength seen by the device.
        rssi: i16,
        /// Solar panel voltage.
        panel_voltage: f32,
        /// Controller chip temperature.
        chip_temperature: f32,
        /// Water level.
        water_level: f32,
        /// Configured tank size.
        tank_size: f32,
    },

    /// Tag 5: fault codes.
    Faults {
        /// Panel fault code.
        panel: u8,
        /// Element fault code.
        element: u8,
        /// Pump fault code.
        pump: u8,
        /// Solenoid fault code.
        solenoid: u8,
    },

    /// A frame with an unrecognized tag; carries no fields.
    Unknown(u8),
}

impl StatusFragment {
    /// Returns the frame tag this fragment was decoded from.
    #[must_use]
    pub fn tag(&self) -> u8 {
        match self {
            Self::Temperatures { .. } => 1,
            Self::Switches { .. } => 2,
            Self::Runtime { .. } => 3,
            Self::Diagnostics { .. } => 4,
            Self::Faults { .. } => 5,
            Self::Unknown(tag) => *tag,
        }
    }

    /// Returns `true` if the fragment carries no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}
