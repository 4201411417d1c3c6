// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection session and command dispatch.
//!
//! A [`Session`] owns at most one BLE link to one controller. Links are
//! opened lazily by the first command and closed again after
//! [`SessionConfig::disconnect_delay`] of inactivity, so callers never manage
//! the connection explicitly.
//!
//! # Connection lifecycle
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Disconnecting -> Disconnected
//!       ^             |             |
//!       +-------------+-------------+ (failure or link loss)
//! ```
//!
//! Two async locks coordinate concurrent callers:
//!
//! - the *connect guard* makes sure only one task opens or closes the link
//! - the *operation guard* serializes commands, and keeps the idle timer
//!   from closing the link while a command is in flight
//!
//! Status notifications stay subscribed for as long as the link is open and
//! are merged into the shared [`StatusStore`].

mod config;
mod connection;
mod dispatch;

pub use config::SessionConfig;

use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::state::{DeviceStatus, StatusStore};
use crate::subscription::CallbackRegistry;
use crate::transport::Transport;
use crate::types::DeviceInfo;

/// Connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No link is open.
    Disconnected,
    /// A link is being opened and prepared.
    Connecting,
    /// The link is ready for commands.
    Connected,
    /// The link is being closed.
    Disconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
        };
        f.write_str(name)
    }
}

/// A BLE session with one `UberSmart` controller.
///
/// Cloning a session is cheap; clones share the same link, locks and timer.
pub struct Session<T: Transport> {
    shared: Arc<Shared<T>>,
}

impl<T: Transport> Session<T> {
    /// Creates a disconnected session.
    ///
    /// `store` and `callbacks` may be shared between several sessions, e.g.
    /// to aggregate the status of multiple controllers.
    #[must_use]
    pub fn new(
        transport: T,
        device: DeviceInfo,
        config: SessionConfig,
        store: Arc<StatusStore>,
        callbacks: Arc<CallbackRegistry>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                device: parking_lot::RwLock::new(device),
                config,
                store,
                callbacks,
                connect_guard: tokio::sync::Mutex::new(()),
                operation_guard: tokio::sync::Mutex::new(()),
                inner: parking_lot::Mutex::new(Inner::default()),
            }),
        }
    }

    /// Returns the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.inner.lock().state
    }

    /// Returns `true` if a link is open and ready.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Returns `true` if the idle timer is armed.
    #[must_use]
    pub fn idle_timer_armed(&self) -> bool {
        self.shared.inner.lock().timer.is_some()
    }

    /// Returns the device this session talks to.
    #[must_use]
    pub fn device_info(&self) -> DeviceInfo {
        self.shared.device_info()
    }

    /// Replaces the device information, e.g. after a fresh advertisement.
    ///
    /// The new information is used from the next connection attempt on.
    pub fn set_device_info(&self, device: DeviceInfo) {
        *self.shared.device.write() = device;
    }

    /// Returns the session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Returns the status aggregated for this device so far.
    ///
    /// Empty until the first notifications have been received.
    #[must_use]
    pub fn status(&self) -> DeviceStatus {
        let address = self.shared.device.read().address().to_string();
        self.shared.store.get(&address).unwrap_or_default()
    }

    /// Returns the shared status store.
    #[must_use]
    pub fn store(&self) -> &Arc<StatusStore> {
        &self.shared.store
    }

    /// Returns the callback registry notifications are dispatched to.
    #[must_use]
    pub fn callbacks(&self) -> &Arc<CallbackRegistry> {
        &self.shared.callbacks
    }

    /// Returns the underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.shared.transport
    }

    /// Closes the link, waiting for any in-flight command first.
    ///
    /// Does nothing if no link is open.
    pub async fn disconnect(&self) {
        let _operation = self.shared.operation_guard.lock().await;
        self.shared.execute_forced_disconnect().await;
    }
}

impl<T: Transport> Clone for Session<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Transport> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("device", &*self.shared.device.read())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Why a link is being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DisconnectReason {
    /// The idle timer expired.
    Idle,
    /// A failure or an explicit request.
    Forced,
}

/// State shared between a session, its clones and its background tasks.
struct Shared<T: Transport> {
    transport: T,
    device: parking_lot::RwLock<DeviceInfo>,
    config: SessionConfig,
    store: Arc<StatusStore>,
    callbacks: Arc<CallbackRegistry>,
    connect_guard: tokio::sync::Mutex<()>,
    operation_guard: tokio::sync::Mutex<()>,
    inner: parking_lot::Mutex<Inner<T>>,
}

impl<T: Transport> Shared<T> {
    fn device_info(&self) -> DeviceInfo {
        self.device.read().clone()
    }

    fn operation_in_progress(&self) -> bool {
        self.operation_guard.try_lock().is_err()
    }
}

impl<T: Transport> Drop for Shared<T> {
    fn drop(&mut self) {
        if let Some(timer) = self.inner.get_mut().timer.take() {
            timer.handle.abort();
        }
    }
}

/// Mutable connection bookkeeping, always accessed under a short sync lock.
struct Inner<T: Transport> {
    state: ConnectionState,
    link: Option<OpenLink<T>>,
    timer: Option<IdleTimer>,
    timer_generation: u64,
    /// Incremented for every connection attempt; stale disconnect
    /// notifications carry an older value.
    epoch: u64,
    expected_disconnect: bool,
}

impl<T: Transport> Default for Inner<T> {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            link: None,
            timer: None,
            timer_generation: 0,
            epoch: 0,
            expected_disconnect: false,
        }
    }
}

/// An open link with its resolved characteristics.
struct OpenLink<T: Transport> {
    link: T::Link,
    read: T::Characteristic,
    write: T::Characteristic,
}

impl<T: Transport> Clone for OpenLink<T> {
    fn clone(&self) -> Self {
        Self {
            link: self.link.clone(),
            read: self.read.clone(),
            write: self.write.clone(),
        }
    }
}

struct IdleTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(ConnectionState::Disconnecting.to_string(), "disconnecting");
    }
}
