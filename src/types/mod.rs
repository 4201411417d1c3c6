// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for `UberSmart` device control.
//!
//! # Types
//!
//! - [`DeviceInfo`] - Address, name and signal strength of a peripheral
//! - [`Switches`] - The 5-byte `AllSwitches` buffer
//! - [`SolenoidMode`] - Off/On/Auto solenoid valve mode
//! - [`InterlockPolicy`] - Element/pump exclusivity rule
//! - [`TimePayload`] - Encoded set-time payload

mod datetime;
mod device_info;
mod switches;

pub use datetime::{TIME_PAYLOAD_LEN, TimePayload, TimePayloadWarning};
pub use device_info::DeviceInfo;
pub use switches::{InterlockPolicy, SolenoidMode, Switches};
