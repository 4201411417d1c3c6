// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device status aggregation.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::types::Switches;

use super::{DeviceStatus, StatusFragment};

/// Latest known status of every device, keyed by address.
///
/// The store is written from the notification path and read by callers
/// waiting on commands, possibly on different tasks. Writes take a short
/// exclusive lock per fragment; the last write wins per field.
///
/// # Examples
///
/// ```
/// use ubersolar_lib::state::{StatusFragment, StatusStore};
///
/// let store = StatusStore::new();
/// store.apply("AA:BB:CC:DD:EE:FF", &StatusFragment::Faults {
///     panel: 1, element: 0, pump: 0, solenoid: 0,
/// });
///
/// let status = store.get("AA:BB:CC:DD:EE:FF").unwrap();
/// assert_eq!(status.panel_fault_code(), Some(1));
/// ```
#[derive(Debug, Default)]
pub struct StatusStore {
    devices: RwLock<HashMap<String, DeviceStatus>>,
}

impl StatusStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a fragment into a device's status.
    ///
    /// Returns `true` if any field changed.
    pub fn apply(&self, address: &str, fragment: &StatusFragment) -> bool {
        let mut devices = self.devices.write();
        devices
            .entry(address.to_string())
            .or_default()
            .apply(fragment)
    }

    /// Records a switch buffer written to a device, ahead of its report.
    pub fn record_switches(&self, address: &str, switches: Switches) {
        self.devices
            .write()
            .entry(address.to_string())
            .or_default()
            .record_switches(switches);
    }

    /// Returns a snapshot of a device's status.
    #[must_use]
    pub fn get(&self, address: &str) -> Option<DeviceStatus> {
        self.devices.read().get(address).cloned()
    }

    /// Returns the cached `AllSwitches` buffer for a device.
    #[must_use]
    pub fn switches(&self, address: &str) -> Option<Switches> {
        self.devices
            .read()
            .get(address)
            .and_then(DeviceStatus::all_switches)
    }

    /// Returns `true` if at least one field is known for the device.
    #[must_use]
    pub fn has_status(&self, address: &str) -> bool {
        self.devices
            .read()
            .get(address)
            .is_some_and(|status| !status.is_empty())
    }

    /// Forgets everything known about a device.
    pub fn clear(&self, address: &str) {
        self.devices.write().remove(address);
    }

    /// Returns the addresses with a known status.
    #[must_use]
    pub fn addresses(&self) -> Vec<String> {
        self.devices.read().keys().cloned().collect()
    }
}
