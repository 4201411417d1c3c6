// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identity of a discovered `UberSmart` peripheral.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A device as seen in a discovery event.
///
/// The address is the stable key used by the status store. On Linux and
/// Windows it is the Bluetooth MAC address, on macOS the platform UUID.
///
/// # Examples
///
/// ```
/// use ubersolar_lib::types::DeviceInfo;
///
/// let info = DeviceInfo::new("AA:BB:CC:DD:EE:FF", "UberSmart_1234").with_rssi(-67);
/// assert_eq!(info.to_string(), "UberSmart_1234 (AA:BB:CC:DD:EE:FF)");
/// assert_eq!(info.rssi(), Some(-67));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceInfo {
    address: String,
    name: String,
    rssi: Option<i16>,
}

impl DeviceInfo {
    /// Creates a device identity without signal strength.
    #[must_use]
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            rssi: None,
        }
    }

    /// Sets the last-known signal strength in dBm.
    #[must_use]
    pub fn with_rssi(mut self, rssi: i16) -> Self {
        self.rssi = Some(rssi);
        self
    }

    /// Returns the device address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the advertised name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the last-known signal strength in dBm.
    #[must_use]
    pub fn rssi(&self) -> Option<i16> {
        self.rssi
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}
