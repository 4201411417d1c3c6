// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscribable trait for devices that push status notifications.

use crate::state::StatusFragment;
use crate::subscription::SubscriptionId;
use crate::types::Switches;

/// Trait for types that support event subscriptions.
///
/// # Examples
///
/// ```no_run
/// use ubersolar_lib::subscription::Subscribable;
/// # fn example(device: &impl Subscribable) {
/// let sub_id = device.on_status_changed(|address, fragment| {
///     println!("{address}: {fragment:?}");
/// });
///
/// device.on_disconnected(|expected| {
///     if !expected {
///         println!("link lost");
///     }
/// });
///
/// device.unsubscribe(sub_id);
/// # }
/// ```
pub trait Subscribable {
    /// Subscribes to every decoded status fragment.
    fn on_status_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&str, &StatusFragment) + Send + Sync + 'static;

    /// Subscribes to switch reports.
    fn on_switches_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Switches) + Send + Sync + 'static;

    /// Subscribes to completed status refreshes.
    fn on_updated<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static;

    /// Subscribes to link loss.
    ///
    /// The callback receives `true` when the library closed the link itself.
    fn on_disconnected<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static;

    /// Removes a subscription.
    ///
    /// Returns `true` if a callback was removed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
