// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Notification frame parsing for `UberSmart` devices.
//!
//! The device pushes its status on the notify characteristic as a stream of
//! small binary frames. The first byte is a tag selecting one of five fixed
//! layouts; all multi-byte fields are little-endian.
//!
//! # Examples
//!
//! ```
//! use ubersolar_lib::state::StatusFragment;
//! use ubersolar_lib::telemetry::decode_frame;
//!
//! let frame = [0x05, 0, 1, 0, 0];
//! let fragment = decode_frame(&frame).unwrap();
//!
//! assert_eq!(
//!     fragment,
//!     StatusFragment::Faults { panel: 0, element: 1, pump: 0, solenoid: 0 }
//! );
//! ```

mod frame_parser;

pub use frame_parser::{decode_frame, encode_frame, frame_len};
