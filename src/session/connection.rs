// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Link establishment, idle timer and teardown.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::{ConnectionState, DisconnectReason, IdleTimer, Inner, OpenLink, Shared};
use crate::command::encode_hex;
use crate::error::TransportError;
use crate::telemetry::decode_frame;
use crate::transport::{
    DisconnectHandler, NotificationHandler, READ_CHARACTERISTIC_UUID, SERVICE_UUID, Transport,
    WRITE_CHARACTERISTIC_UUID,
};
use crate::types::DeviceInfo;

impl<T: Transport> Shared<T> {
    /// Returns a ready link, opening one if needed.
    ///
    /// Every successful return pushes the idle deadline back.
    pub(super) async fn ensure_connected(self: &Arc<Self>) -> Result<OpenLink<T>, TransportError> {
        if let Some(link) = self.connected_link() {
            return Ok(link);
        }

        if self.connect_guard.try_lock().is_err() {
            debug!(device = %self.device_info(), "Connection already in progress, waiting");
        }
        let _connect = self.connect_guard.lock().await;

        // Another task may have connected while we waited.
        if let Some(link) = self.connected_link() {
            return Ok(link);
        }

        self.inner.lock().state = ConnectionState::Connecting;
        let result = self.establish().await;
        if result.is_err() {
            let mut inner = self.inner.lock();
            inner.link = None;
            inner.state = ConnectionState::Disconnected;
        }
        result
    }

    fn connected_link(self: &Arc<Self>) -> Option<OpenLink<T>> {
        let mut inner = self.inner.lock();
        if inner.state != ConnectionState::Connected {
            return None;
        }
        let link = inner.link.clone()?;
        self.reset_idle_timer(&mut inner);
        Some(link)
    }

    async fn establish(self: &Arc<Self>) -> Result<OpenLink<T>, TransportError> {
        let device = self.device_info();
        let epoch = {
            let mut inner = self.inner.lock();
            inner.epoch += 1;
            inner.expected_disconnect = false;
            inner.epoch
        };

        debug!(device = %device, rssi = ?device.rssi(), "Connecting");
        let link = self
            .transport
            .connect(&device, self.disconnect_handler(epoch))
            .await?;
        debug!(device = %device, "Connected");

        let (read, write) = match self.resolve_characteristics(&link) {
            Ok(characteristics) => characteristics,
            Err(err) => {
                debug!(device = %device, error = %err, "Clearing service cache");
                if let Err(cache_err) = self.transport.clear_service_cache(&link).await {
                    debug!(device = %device, error = %cache_err, "Failed to clear service cache");
                }
                self.discard_link(&device, &link).await;
                return Err(err);
            }
        };
        let open = OpenLink { link, read, write };

        let handler = self.notification_handler(&device);
        if let Err(err) = self.transport.subscribe(&open.link, &open.read, handler).await {
            self.discard_link(&device, &open.link).await;
            return Err(err);
        }

        debug!(
            device = %device,
            delay = ?self.config.settle_delay,
            "Subscribed, waiting for status frames"
        );
        tokio::time::sleep(self.config.settle_delay).await;

        // The link is only published together with the Connected state. A
        // loss during the settle delay moves the state back to Disconnected.
        let ready = {
            let mut inner = self.inner.lock();
            let ready = inner.epoch == epoch && inner.state == ConnectionState::Connecting;
            if ready {
                inner.link = Some(open.clone());
                inner.state = ConnectionState::Connected;
                self.reset_idle_timer(&mut inner);
            }
            ready
        };
        if ready {
            return Ok(open);
        }

        debug!(device = %device, "Link lost while waiting for status");
        self.discard_link(&device, &open.link).await;
        Err(TransportError::Transient(
            "link lost while waiting for status".to_string(),
        ))
    }

    fn resolve_characteristics(
        &self,
        link: &T::Link,
    ) -> Result<(T::Characteristic, T::Characteristic), TransportError> {
        let read =
            self.transport
                .resolve_characteristic(link, SERVICE_UUID, READ_CHARACTERISTIC_UUID)?;
        let write =
            self.transport
                .resolve_characteristic(link, SERVICE_UUID, WRITE_CHARACTERISTIC_UUID)?;
        Ok((read, write))
    }

    /// Closes a link that never became ready.
    async fn discard_link(&self, device: &DeviceInfo, link: &T::Link) {
        self.inner.lock().expected_disconnect = true;
        if let Err(err) = self.transport.disconnect(link).await {
            debug!(device = %device, error = %err, "Failed to close link");
        }
    }

    fn notification_handler(&self, device: &DeviceInfo) -> NotificationHandler {
        let store = Arc::clone(&self.store);
        let callbacks = Arc::clone(&self.callbacks);
        let address = device.address().to_string();

        Arc::new(move |data: &[u8]| {
            trace!(device = %address, data = %encode_hex(data), "Notification received");
            match decode_frame(data) {
                Ok(fragment) => {
                    store.apply(&address, &fragment);
                    callbacks.dispatch_status(&address, &fragment);
                }
                Err(err) => {
                    warn!(device = %address, error = %err, "Dropping malformed status frame");
                }
            }
        })
    }

    fn disconnect_handler(self: &Arc<Self>, epoch: u64) -> DisconnectHandler {
        let weak = Arc::downgrade(self);
        Arc::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.on_link_lost(epoch);
            }
        })
    }

    fn on_link_lost(&self, epoch: u64) {
        let device = self.device_info();
        let (expected, lost) = {
            let mut inner = self.inner.lock();
            if inner.epoch != epoch {
                trace!(device = %device, "Ignoring disconnect of a previous link");
                return;
            }
            let expected = inner.expected_disconnect;
            let mut lost = None;
            if !expected {
                lost = inner.link.take();
                inner.state = ConnectionState::Disconnected;
                if let Some(timer) = inner.timer.take() {
                    timer.handle.abort();
                }
            }
            (expected, lost)
        };

        if let Some(lost) = lost {
            self.transport.release(&lost.link);
        }
        if expected {
            debug!(device = %device, "Disconnected from device");
        } else {
            warn!(device = %device, rssi = ?device.rssi(), "Device unexpectedly disconnected");
        }
        self.callbacks.dispatch_disconnected(expected);
    }

    // =========================================================================
    // Idle timer
    // =========================================================================

    /// Pushes the idle deadline back by the configured delay.
    pub(super) fn reset_idle_timer(self: &Arc<Self>, inner: &mut Inner<T>) {
        if let Some(timer) = inner.timer.take() {
            timer.handle.abort();
        }
        inner.expected_disconnect = false;
        inner.timer_generation += 1;

        let generation = inner.timer_generation;
        let delay = self.config.disconnect_delay;
        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = weak.upgrade() {
                shared.idle_timeout(generation).await;
            }
        });
        inner.timer = Some(IdleTimer { generation, handle });
    }

    /// Resets the idle timer if a link is ready.
    pub(super) fn touch(self: &Arc<Self>) {
        let mut inner = self.inner.lock();
        if inner.state == ConnectionState::Connected {
            self.reset_idle_timer(&mut inner);
        }
    }

    fn cancel_idle_timer(&self) {
        let timer = self.inner.lock().timer.take();
        if let Some(timer) = timer {
            timer.handle.abort();
        }
    }

    async fn idle_timeout(self: Arc<Self>, generation: u64) {
        {
            let mut inner = self.inner.lock();
            match &inner.timer {
                Some(timer) if timer.generation == generation => {}
                _ => return,
            }
            // Detach our own handle; aborting it here would cancel this task.
            inner.timer = None;

            if self.operation_in_progress() && inner.state == ConnectionState::Connected {
                debug!(
                    device = %self.device_info(),
                    "Operation in progress, re-arming disconnect timer"
                );
                self.reset_idle_timer(&mut inner);
                return;
            }
        }

        debug!(
            device = %self.device_info(),
            delay = ?self.config.disconnect_delay,
            "Disconnecting after inactivity"
        );
        self.execute_disconnect(DisconnectReason::Idle).await;
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Cancels the idle timer and closes the link.
    pub(super) async fn execute_forced_disconnect(self: &Arc<Self>) {
        self.cancel_idle_timer();
        self.execute_disconnect(DisconnectReason::Forced).await;
    }

    async fn execute_disconnect(self: &Arc<Self>, reason: DisconnectReason) {
        let _connect = self.connect_guard.lock().await;
        let device = self.device_info();

        let link = {
            let mut inner = self.inner.lock();
            if inner.timer.is_some() {
                debug!(device = %device, "Activity resumed, not disconnecting");
                return;
            }
            if reason == DisconnectReason::Idle && self.operation_in_progress() {
                if inner.state == ConnectionState::Connected {
                    self.reset_idle_timer(&mut inner);
                }
                return;
            }

            inner.expected_disconnect = true;
            let link = inner.link.take();
            inner.state = if link.is_some() {
                ConnectionState::Disconnecting
            } else {
                ConnectionState::Disconnected
            };
            link
        };

        let Some(link) = link else {
            return;
        };

        debug!(device = %device, ?reason, "Disconnecting");
        if let Err(err) = self.transport.disconnect(&link.link).await {
            debug!(device = %device, error = %err, "Disconnect reported an error");
        }
        self.inner.lock().state = ConnectionState::Disconnected;
        debug!(device = %device, "Disconnect completed");
    }
}
