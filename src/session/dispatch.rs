// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Serialized command dispatch with bounded retries.

use std::sync::Arc;

use tracing::{debug, error, trace};

use super::{Session, Shared};
use crate::command::{Command, encode_hex};
use crate::error::{Result, TransportError};
use crate::state::DeviceStatus;
use crate::transport::Transport;

impl<T: Transport> Session<T> {
    /// Sends a command with the configured retry count.
    ///
    /// See [`Session::send_with_retry`].
    ///
    /// # Errors
    ///
    /// Returns the last transport error once all attempts have failed.
    pub async fn send<C: Command + ?Sized>(&self, command: &C) -> Result<DeviceStatus> {
        self.send_with_retry(command, self.shared.config.retry_count).await
    }

    /// Sends a command, retrying up to `retry_count` times after the first
    /// attempt.
    ///
    /// Commands are serialized: a call waits for any in-flight command to
    /// finish before touching the link. The link is opened if needed. A
    /// command with an empty encoding only ensures the link is up, which is
    /// how a status refresh is requested since the controller streams its
    /// status on its own once notifications are enabled.
    ///
    /// On success the aggregated status known at that point is returned.
    ///
    /// # Errors
    ///
    /// - [`TransportError::NotFound`] is returned immediately, without retry
    /// - any other transport error is returned after the last attempt
    pub async fn send_with_retry<C: Command + ?Sized>(
        &self,
        command: &C,
        retry_count: u32,
    ) -> Result<DeviceStatus> {
        let bytes = command.to_bytes();
        let device = self.shared.device_info();
        debug!(device = %device, command = %encode_hex(&bytes), "Sending command");

        if self.shared.operation_in_progress() {
            debug!(
                device = %device,
                rssi = ?device.rssi(),
                "Operation already in progress, waiting for it to complete"
            );
        }
        let _operation = self.shared.operation_guard.lock().await;

        let mut attempt = 0;
        loop {
            match self.shared.send_locked(&bytes).await {
                Ok(()) => return Ok(self.status()),
                Err(err) if err.is_fatal() => {
                    error!(
                        device = %device,
                        rssi = ?device.rssi(),
                        error = %err,
                        "Device not found, no longer in range, or poor RSSI"
                    );
                    return Err(err.into());
                }
                Err(err) if attempt >= retry_count => {
                    error!(
                        device = %device,
                        rssi = ?device.rssi(),
                        attempts = attempt + 1,
                        error = %err,
                        "Communication failed; stopping"
                    );
                    return Err(err.into());
                }
                Err(err) => {
                    debug!(
                        device = %device,
                        rssi = ?device.rssi(),
                        attempt = attempt + 1,
                        error = %err,
                        "Communication failed, retrying"
                    );
                }
            }
            attempt += 1;
        }
    }
}

impl<T: Transport> Shared<T> {
    /// One attempt of a command, with the operation guard held.
    ///
    /// Any failure after the peripheral was found closes the link, so the
    /// next attempt starts from a fresh connection.
    async fn send_locked(
        self: &Arc<Self>,
        bytes: &[u8],
    ) -> std::result::Result<(), TransportError> {
        let result = self.write_connected(bytes).await;

        if let Err(err) = &result
            && !err.is_fatal()
        {
            if err.requires_backoff() {
                debug!(
                    device = %self.device_info(),
                    backoff = ?self.config.reconnect_backoff,
                    "Backing off before reconnecting"
                );
                tokio::time::sleep(self.config.reconnect_backoff).await;
            }
            debug!(device = %self.device_info(), error = %err, "Disconnecting due to error");
            self.execute_forced_disconnect().await;
        }
        result
    }

    async fn write_connected(
        self: &Arc<Self>,
        bytes: &[u8],
    ) -> std::result::Result<(), TransportError> {
        let link = self.ensure_connected().await?;
        if bytes.is_empty() {
            return Ok(());
        }

        trace!(device = %self.device_info(), data = %encode_hex(bytes), "GATT write");
        self.transport.write(&link.link, &link.write, bytes).await?;
        self.touch();
        Ok(())
    }
}
