// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for device subscriptions.
//!
//! This module provides the core types for managing subscription callbacks:
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackRegistry`] - Registry for storing and dispatching callbacks

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::state::StatusFragment;
use crate::types::Switches;

/// Unique identifier for a subscription.
///
/// Returned when registering a callback and used to unsubscribe later.
/// IDs are unique within a registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

type StatusCallback = Arc<dyn Fn(&str, &StatusFragment) + Send + Sync>;

type SwitchesCallback = Arc<dyn Fn(Switches) + Send + Sync>;

type UpdatedCallback = Arc<dyn Fn() + Send + Sync>;

/// Receives `true` when the disconnect was requested by the library.
type DisconnectedCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Registry for device subscription callbacks.
///
/// Notifications arrive on the BLE stack's task, so callbacks are invoked
/// synchronously from there and must not block.
///
/// # Thread Safety
///
/// The registry is fully thread-safe. Callbacks are wrapped in `Arc` so the
/// maps can be read concurrently while dispatching.
pub struct CallbackRegistry {
    next_id: AtomicU64,
    status_callbacks: RwLock<HashMap<SubscriptionId, StatusCallback>>,
    switches_callbacks: RwLock<HashMap<SubscriptionId, SwitchesCallback>>,
    updated_callbacks: RwLock<HashMap<SubscriptionId, UpdatedCallback>>,
    disconnected_callbacks: RwLock<HashMap<SubscriptionId, DisconnectedCallback>>,
}

impl CallbackRegistry {
    /// Creates a new empty callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            status_callbacks: RwLock::new(HashMap::new()),
            switches_callbacks: RwLock::new(HashMap::new()),
            updated_callbacks: RwLock::new(HashMap::new()),
            disconnected_callbacks: RwLock::new(HashMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // =========================================================================
    // Registration methods
    // =========================================================================

    /// Registers a callback for every decoded status fragment.
    ///
    /// The callback receives the device address and the fragment.
    pub fn on_status_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&str, &StatusFragment) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.status_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for switch frames.
    pub fn on_switches_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Switches) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.switches_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback fired after each full status refresh.
    pub fn on_updated<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.updated_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for link loss.
    ///
    /// The flag is `true` for disconnects the library initiated itself.
    pub fn on_disconnected<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.disconnected_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    // =========================================================================
    // Unsubscription
    // =========================================================================

    /// Unregisters a callback by its subscription ID.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.status_callbacks.write().remove(&id).is_some()
            || self.switches_callbacks.write().remove(&id).is_some()
            || self.updated_callbacks.write().remove(&id).is_some()
            || self.disconnected_callbacks.write().remove(&id).is_some()
    }

    /// Clears all callbacks.
    pub fn clear(&self) {
        self.status_callbacks.write().clear();
        self.switches_callbacks.write().clear();
        self.updated_callbacks.write().clear();
        self.disconnected_callbacks.write().clear();
    }

    // =========================================================================
    // Dispatch methods
    // =========================================================================

    /// Dispatches a decoded fragment to the relevant callbacks.
    pub fn dispatch_status(&self, address: &str, fragment: &StatusFragment) {
        for callback in self.status_callbacks.read().values() {
            callback(address, fragment);
        }

        if let StatusFragment::Switches { all_switches, .. } = fragment {
            for callback in self.switches_callbacks.read().values() {
                callback(*all_switches);
            }
        }
    }

    /// Dispatches the updated event.
    pub fn dispatch_updated(&self) {
        for callback in self.updated_callbacks.read().values() {
            callback();
        }
    }

    /// Dispatches the disconnected event.
    pub fn dispatch_disconnected(&self, expected: bool) {
        for callback in self.disconnected_callbacks.read().values() {
            callback(expected);
        }
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.status_callbacks.read().len()
            + self.switches_callbacks.read().len()
            + self.updated_callbacks.read().len()
            + self.disconnected_callbacks.read().len()
    }

    /// Returns `true` if there are no registered callbacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn switches_fragment() -> StatusFragment {
        StatusFragment::Switches {
            element_on: 1,
            pump_on: 0,
            holiday_mode: 0,
            solenoid_mode: 2,
            solenoid_state: 0.0,
            all_switches: Switches::from_bytes([2, 1, 0, 0, 2]),
        }
    }

    #[test]
    fn subscription_id_display() {
        let id = SubscriptionId::new(42);
        assert_eq!(id.to_string(), "Sub(42)");
    }

    #[test]
    fn registry_new_is_empty() {
        let registry = CallbackRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.callback_count(), 0);
    }

    #[test]
    fn status_callback_receives_address_and_fragment() {
        let registry = CallbackRegistry::new();
        let seen = Arc::new(RwLock::new(Vec::<(String, u8)>::new()));
        let seen_clone = seen.clone();

        registry.on_status_changed(move |address, fragment| {
            seen_clone
                .write()
                .push((address.to_string(), fragment.tag()));
        });

        registry.dispatch_status("AA:BB", &StatusFragment::Unknown(9));
        registry.dispatch_status("AA:BB", &switches_fragment());

        assert_eq!(
            *seen.read(),
            vec![("AA:BB".to_string(), 9), ("AA:BB".to_string(), 2)]
        );
    }

    #[test]
    fn switches_callback_only_fires_for_switch_frames() {
        let registry = CallbackRegistry::new();
        let received = Arc::new(RwLock::new(None::<Switches>));
        let received_clone = received.clone();

        registry.on_switches_changed(move |switches| {
            *received_clone.write() = Some(switches);
        });

        registry.dispatch_status("AA:BB", &StatusFragment::Unknown(7));
        assert!(received.read().is_none());

        registry.dispatch_status("AA:BB", &switches_fragment());
        assert_eq!(
            *received.read(),
            Some(Switches::from_bytes([2, 1, 0, 0, 2]))
        );
    }

    #[test]
    fn unsubscribe_stops_dispatch() {
        let registry = CallbackRegistry::new();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let id = registry.on_updated(move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        registry.dispatch_updated();
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        assert!(registry.unsubscribe(id));
        assert!(registry.is_empty());

        registry.dispatch_updated();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_nonexistent() {
        let registry = CallbackRegistry::new();
        assert!(!registry.unsubscribe(SubscriptionId::new(999)));
    }

    #[test]
    fn disconnected_callback_receives_flag() {
        let registry = CallbackRegistry::new();
        let flags = Arc::new(RwLock::new(Vec::new()));
        let flags_clone = flags.clone();

        registry.on_disconnected(move |expected| flags_clone.write().push(expected));

        registry.dispatch_disconnected(false);
        registry.dispatch_disconnected(true);

        assert_eq!(*flags.read(), vec![false, true]);
    }

    #[test]
    fn clear_removes_everything() {
        let registry = CallbackRegistry::new();
        registry.on_updated(|| {});
        registry.on_disconnected(|_| {});
        registry.on_status_changed(|_, _| {});
        assert_eq!(registry.callback_count(), 3);

        registry.clear();
        assert!(registry.is_empty());
    }
}
