// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device status aggregation types.
//!
//! Decoded notification frames arrive as [`StatusFragment`]s. Each one is
//! merged into a [`DeviceStatus`], and the [`StatusStore`] keeps one status
//! per device address, shared between the notification path and callers.
//!
//! # Examples
//!
//! ```
//! use ubersolar_lib::state::{DeviceStatus, StatusFragment};
//!
//! let mut status = DeviceStatus::new();
//! let changed = status.apply(&StatusFragment::Runtime {
//!     device_time: 1_705_314_600,
//!     runtime_hours: 3.5,
//!     light_level: 120,
//! });
//!
//! assert!(changed);
//! assert_eq!(status.light_level(), Some(120));
//! ```

mod device_status;
mod status_fragment;
mod status_store;

pub use device_status::DeviceStatus;
pub use status_fragment::StatusFragment;
pub use status_store::StatusStore;
