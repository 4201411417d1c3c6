// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level API for `UberSmart` controllers.
//!
//! [`UberSmart`] wraps a [`Session`] with the operations a home-automation
//! integration needs: status refresh and polling, switch control, clock
//! setting and access-point mode. Every operation goes through the
//! session's command dispatcher, so connection handling, retries and
//! serialization of concurrent calls are taken care of.
//!
//! # Examples
//!
//! ```no_run
//! use ubersolar_lib::UberSmart;
//! use ubersolar_lib::transport::BtleplugTransport;
//! use ubersolar_lib::types::DeviceInfo;
//!
//! # async fn example() -> ubersolar_lib::Result<()> {
//! let transport = BtleplugTransport::default_adapter().await?;
//! let device = UberSmart::builder(transport, DeviceInfo::new("AA:BB:CC:DD:EE:FF", "UberSmart_1"))
//!     .build();
//!
//! device.update().await?;
//! println!("water: {:?}", device.status().water_temperature());
//!
//! device.turn_on_pump().await?;
//! # Ok(())
//! # }
//! ```

mod builder;

pub use builder::UberSmartBuilder;

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use parking_lot::Mutex;
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::command::{
    Command, EnableAccessPointCommand, SetTimeCommand, StatusRequest, SwitchCommand, encode_hex,
};
use crate::error::{DeviceError, Error, Result};
use crate::session::{ConnectionState, Session, SessionConfig};
use crate::state::{DeviceStatus, StatusFragment, StatusStore};
use crate::subscription::{CallbackRegistry, Subscribable, SubscriptionId};
use crate::transport::Transport;
use crate::types::{DeviceInfo, SolenoidMode, Switches, TimePayload};

/// An `UberSmart` solar water heater controller.
///
/// The type parameter selects the BLE backend, usually
/// [`BtleplugTransport`](crate::transport::BtleplugTransport).
///
/// Cloning is cheap and clones share the same session and status.
pub struct UberSmart<T: Transport> {
    session: Session<T>,
    last_full_update: Arc<Mutex<Option<Instant>>>,
    /// Held from reading the cached switches until the new buffer is written.
    switch_guard: Arc<tokio::sync::Mutex<()>>,
}

impl<T: Transport> UberSmart<T> {
    /// Starts building a device handle.
    #[must_use]
    pub fn builder(transport: T, device: DeviceInfo) -> UberSmartBuilder<T> {
        UberSmartBuilder::new(transport, device)
    }

    /// Wraps an existing session.
    #[must_use]
    pub fn from_session(session: Session<T>) -> Self {
        Self {
            session,
            last_full_update: Arc::new(Mutex::new(None)),
            switch_guard: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Returns the underlying session.
    #[must_use]
    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    /// Returns the device information.
    #[must_use]
    pub fn device_info(&self) -> DeviceInfo {
        self.session.device_info()
    }

    /// Returns the device address.
    #[must_use]
    pub fn address(&self) -> String {
        self.session.device_info().address().to_string()
    }

    /// Returns the connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.session.state()
    }

    /// Returns the session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        self.session.config()
    }

    /// Returns the status aggregated so far.
    #[must_use]
    pub fn status(&self) -> DeviceStatus {
        self.session.status()
    }

    /// Returns the status store shared with the session.
    #[must_use]
    pub fn store(&self) -> &Arc<StatusStore> {
        self.session.store()
    }

    /// Returns the callback registry.
    #[must_use]
    pub fn callbacks(&self) -> &Arc<CallbackRegistry> {
        self.session.callbacks()
    }

    // ========== Raw commands ==========

    /// Sends any command with the configured retry count.
    ///
    /// # Errors
    ///
    /// Returns the transport error once retries are exhausted.
    pub async fn send_command<C: Command + Sync + ?Sized>(
        &self,
        command: &C,
    ) -> Result<DeviceStatus> {
        self.session.send(command).await
    }

    /// Sends any command with an explicit retry count.
    ///
    /// # Errors
    ///
    /// Returns the transport error once retries are exhausted.
    pub async fn send_command_with_retry<C: Command + Sync + ?Sized>(
        &self,
        command: &C,
        retry_count: u32,
    ) -> Result<DeviceStatus> {
        self.session.send_with_retry(command, retry_count).await
    }

    // ========== Status ==========

    /// Makes sure the link is up and returns the aggregated status.
    ///
    /// Returns `None` if the device has not reported anything yet.
    ///
    /// # Errors
    ///
    /// Returns error if the link cannot be established.
    pub async fn get_info(&self) -> Result<Option<DeviceStatus>> {
        let status = self.session.send(&StatusRequest).await?;
        if status.is_empty() {
            error!(device = %self.device_info(), "Unsuccessful, no result from device");
            return Ok(None);
        }
        Ok(Some(status))
    }

    /// Refreshes the status and notifies `on_updated` subscribers.
    ///
    /// # Errors
    ///
    /// Returns error if the link cannot be established.
    pub async fn update(&self) -> Result<bool> {
        self.get_info().await?;
        *self.last_full_update.lock() = Some(Instant::now());
        debug!(device = %self.device_info(), "Fire callbacks");
        self.session.callbacks().dispatch_updated();
        Ok(true)
    }

    /// Returns `true` if a poll is due.
    ///
    /// A poll is due once both the caller's own poll and the last full
    /// [`update`](Self::update) are older than the poll interval.
    #[must_use]
    pub fn poll_needed(&self, seconds_since_last_poll: Option<f64>) -> bool {
        let interval = self.config().poll_interval;
        if let Some(seconds) = seconds_since_last_poll
            && seconds < interval.as_secs_f64()
        {
            return false;
        }
        self.last_full_update
            .lock()
            .is_none_or(|at| at.elapsed() >= interval)
    }

    /// Returns the time since the last full update, if any.
    #[must_use]
    pub fn since_last_update(&self) -> Option<Duration> {
        self.last_full_update.lock().map(|at| at.elapsed())
    }

    // ========== Switches ==========

    /// Writes all four switches from their 8-hex-digit form, e.g. `"00010002"`.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError`](crate::error::ValueError) if the string is not
    /// eight hex digits, or the transport error if sending fails.
    pub async fn toggle_switches_all(&self, switches: &str) -> Result<()> {
        let switches: Switches = switches.parse()?;
        self.set_switches(switches).await
    }

    /// Writes all four switches at once.
    ///
    /// # Errors
    ///
    /// Returns error if sending fails.
    pub async fn set_switches(&self, switches: Switches) -> Result<()> {
        let command = {
            let _switches = self.switch_guard.lock().await;
            self.write_switches(switches).await?
        };
        info!(device = %self.device_info(), switches = %command.switches(), "Switches set");
        self.update().await?;
        Ok(())
    }

    /// Turns the heating element on.
    ///
    /// # Errors
    ///
    /// Returns error if the current switch state cannot be read or sending fails.
    pub async fn turn_on_element(&self) -> Result<()> {
        let policy = self.config().interlock;
        self.modify_switches("element on", |s| s.set_element(true, policy)).await
    }

    /// Turns the heating element off.
    ///
    /// # Errors
    ///
    /// Returns error if the current switch state cannot be read or sending fails.
    pub async fn turn_off_element(&self) -> Result<()> {
        let policy = self.config().interlock;
        self.modify_switches("element off", |s| s.set_element(false, policy)).await
    }

    /// Turns the circulation pump on.
    ///
    /// # Errors
    ///
    /// Returns error if the current switch state cannot be read or sending fails.
    pub async fn turn_on_pump(&self) -> Result<()> {
        let policy = self.config().interlock;
        self.modify_switches("pump on", |s| s.set_pump(true, policy)).await
    }

    /// Turns the circulation pump off.
    ///
    /// # Errors
    ///
    /// Returns error if the current switch state cannot be read or sending fails.
    pub async fn turn_off_pump(&self) -> Result<()> {
        let policy = self.config().interlock;
        self.modify_switches("pump off", |s| s.set_pump(false, policy)).await
    }

    /// Enables holiday mode.
    ///
    /// # Errors
    ///
    /// Returns error if the current switch state cannot be read or sending fails.
    pub async fn turn_on_holiday(&self) -> Result<()> {
        self.modify_switches("holiday on", |s| s.set_holiday(true)).await
    }

    /// Disables holiday mode.
    ///
    /// # Errors
    ///
    /// Returns error if the current switch state cannot be read or sending fails.
    pub async fn turn_off_holiday(&self) -> Result<()> {
        self.modify_switches("holiday off", |s| s.set_holiday(false)).await
    }

    /// Sets the solenoid mode.
    ///
    /// # Errors
    ///
    /// Returns error if the current switch state cannot be read or sending fails.
    pub async fn set_solenoid(&self, mode: SolenoidMode) -> Result<()> {
        self.modify_switches("solenoid", |s| s.set_solenoid(mode)).await
    }

    /// Read-modify-write of the cached `AllSwitches` buffer.
    async fn modify_switches<F>(&self, action: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Switches),
    {
        let command = {
            let _switches = self.switch_guard.lock().await;
            let mut switches = self.current_switches().await?;
            mutate(&mut switches);
            self.write_switches(switches).await?
        };
        info!(
            device = %self.device_info(),
            action,
            switches = %command.switches(),
            "Switches updated"
        );
        self.update().await?;
        Ok(())
    }

    /// Writes a switch buffer and records it as the cached state.
    async fn write_switches(&self, switches: Switches) -> Result<SwitchCommand> {
        let command = SwitchCommand::new(switches);
        self.session.send(&command).await?;
        self.store().record_switches(&self.address(), *command.switches());
        Ok(command)
    }

    async fn current_switches(&self) -> Result<Switches> {
        let address = self.address();
        if let Some(switches) = self.store().switches(&address) {
            return Ok(switches);
        }

        debug!(device = %self.device_info(), "No cached switch state, refreshing");
        self.update().await?;
        self.store()
            .switches(&address)
            .ok_or_else(|| DeviceError::SwitchStateUnavailable(address).into())
    }

    // ========== System ==========

    /// Starts the device's Wi-Fi access point.
    ///
    /// # Errors
    ///
    /// Returns error if sending fails.
    pub async fn enable_wifi_ap(&self) -> Result<()> {
        self.session.send(&EnableAccessPointCommand).await?;
        info!(device = %self.device_info(), "Wi-Fi access point enabled");
        self.update().await?;
        Ok(())
    }

    /// Sets the device clock.
    ///
    /// Offsets that are not whole hours are truncated and logged.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::TimestampBeforeEpoch`](crate::error::ValueError::TimestampBeforeEpoch)
    /// for instants before 1970, or the transport error if sending fails.
    pub async fn set_time<Tz: TimeZone>(&self, value: &DateTime<Tz>) -> Result<()> {
        let payload = TimePayload::from_datetime(value)?;
        self.send_time(payload).await
    }

    /// Sets the device clock from a datetime without timezone, taken as UTC.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::TimestampBeforeEpoch`](crate::error::ValueError::TimestampBeforeEpoch)
    /// for instants before 1970, or the transport error if sending fails.
    pub async fn set_time_naive(&self, value: NaiveDateTime) -> Result<()> {
        let payload = TimePayload::from_naive(value)?;
        self.send_time(payload).await
    }

    /// Sets the device clock to the host's local time.
    ///
    /// # Errors
    ///
    /// Returns error if sending fails.
    pub async fn set_current_time(&self) -> Result<()> {
        let now = Local::now().fixed_offset();
        self.set_time(&now).await
    }

    async fn send_time(&self, payload: TimePayload) -> Result<()> {
        let device = self.device_info();
        for warning in payload.warnings() {
            warn!(device = %device, %warning, "Adjusted time payload");
        }

        let command = SetTimeCommand::new(payload);
        self.session.send(&command).await?;
        info!(
            device = %device,
            timestamp = command.time_payload().timestamp(),
            offset_hours = command.time_payload().offset_hours(),
            "Device time set"
        );
        self.update().await?;
        Ok(())
    }

    /// Closes the link after any in-flight command.
    pub async fn disconnect(&self) {
        self.session.disconnect().await;
    }

    /// Checks one byte of a command response.
    ///
    /// Returns whether `result[index]` is one of `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationResult`] if there is no response or it is
    /// too short to contain `index`.
    pub fn check_command_result(
        &self,
        result: Option<&[u8]>,
        index: usize,
        expected: &[u8],
    ) -> Result<bool> {
        match result.and_then(|bytes| bytes.get(index)) {
            Some(byte) => Ok(expected.contains(byte)),
            None => Err(Error::OperationResult {
                result: result
                    .filter(|bytes| !bytes.is_empty())
                    .map_or_else(|| "None".to_string(), encode_hex),
                index,
                expected: expected.to_vec(),
                rssi: self.device_info().rssi(),
            }),
        }
    }
}

impl<T: Transport> Subscribable for UberSmart<T> {
    fn on_status_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&str, &StatusFragment) + Send + Sync + 'static,
    {
        self.callbacks().on_status_changed(callback)
    }

    fn on_switches_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Switches) + Send + Sync + 'static,
    {
        self.callbacks().on_switches_changed(callback)
    }

    fn on_updated<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks().on_updated(callback)
    }

    fn on_disconnected<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.callbacks().on_disconnected(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.callbacks().unsubscribe(id)
    }
}

impl<T: Transport> Clone for UberSmart<T> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            last_full_update: Arc::clone(&self.last_full_update),
            switch_guard: Arc::clone(&self.switch_guard),
        }
    }
}

impl<T: Transport> std::fmt::Debug for UberSmart<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UberSmart")
            .field("session", &self.session)
            .field("last_full_update", &*self.last_full_update.lock())
            .finish()
    }
}
