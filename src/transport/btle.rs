// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [`Transport`] implementation on top of `btleplug`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use btleplug::api::{
    BDAddr, Central as _, CentralEvent, Characteristic, Manager as _, Peripheral as _, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use uuid::Uuid;

use super::{DisconnectHandler, NotificationHandler, Transport};
use crate::error::TransportError;
use crate::types::DeviceInfo;

/// BLE transport backed by a `btleplug` adapter.
///
/// Peripherals are looked up among the adapter's known devices, so the
/// adapter must have seen the controller in a scan first (see
/// [`Scanner`](crate::discovery::Scanner)).
#[derive(Debug, Clone)]
pub struct BtleplugTransport {
    adapter: Adapter,
}

impl BtleplugTransport {
    /// Wraps an existing adapter.
    #[must_use]
    pub fn new(adapter: Adapter) -> Self {
        Self { adapter }
    }

    /// Uses the first adapter reported by the platform.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotFound`] if no adapter is available.
    pub async fn default_adapter() -> Result<Self, TransportError> {
        let manager = Manager::new().await.map_err(map_btleplug_error)?;
        let adapter = manager
            .adapters()
            .await
            .map_err(map_btleplug_error)?
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::NotFound("no Bluetooth adapter".to_string()))?;
        Ok(Self::new(adapter))
    }

    /// Returns the underlying adapter.
    #[must_use]
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    async fn find_peripheral(&self, address: &str) -> Result<Peripheral, TransportError> {
        let peripherals = self
            .adapter
            .peripherals()
            .await
            .map_err(map_btleplug_error)?;
        peripherals
            .into_iter()
            .find(|p| peripheral_address(p.address(), &p.id()).eq_ignore_ascii_case(address))
            .ok_or_else(|| TransportError::NotFound(address.to_string()))
    }
}

/// Fires the session's disconnect callback at most once per link.
struct DisconnectNotifier {
    handler: DisconnectHandler,
    fired: AtomicBool,
}

impl DisconnectNotifier {
    fn fire(&self) {
        if !self.fired.swap(true, Ordering::SeqCst) {
            (self.handler)();
        }
    }
}

/// An open `btleplug` connection and its background tasks.
#[derive(Clone)]
pub struct BtleplugLink {
    peripheral: Peripheral,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
    notifier: Arc<DisconnectNotifier>,
}

impl fmt::Debug for BtleplugLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BtleplugLink")
            .field("peripheral", &self.peripheral.id())
            .field("tasks", &self.tasks.lock().len())
            .finish_non_exhaustive()
    }
}

impl BtleplugLink {
    /// Returns the connected peripheral.
    #[must_use]
    pub fn peripheral(&self) -> &Peripheral {
        &self.peripheral
    }

    fn track(&self, task: JoinHandle<()>) {
        self.tasks.lock().push(task);
    }

    fn abort_tasks(&self) {
        abort_all(&self.tasks);
    }
}

fn abort_all(tasks: &Mutex<Vec<JoinHandle<()>>>) {
    for task in tasks.lock().drain(..) {
        task.abort();
    }
}

/// Runs `cleanup` if `result` is an error, then hands `result` back.
async fn cleanup_on_err<T, C, F>(
    result: Result<T, TransportError>,
    cleanup: C,
) -> Result<T, TransportError>
where
    C: FnOnce() -> F,
    F: Future<Output = ()>,
{
    if result.is_err() {
        cleanup().await;
    }
    result
}

impl Transport for BtleplugTransport {
    type Link = BtleplugLink;
    type Characteristic = Characteristic;

    async fn connect(
        &self,
        device: &DeviceInfo,
        on_disconnect: DisconnectHandler,
    ) -> Result<Self::Link, TransportError> {
        let peripheral = self.find_peripheral(device.address()).await?;
        let mut events = self.adapter.events().await.map_err(map_btleplug_error)?;

        if !peripheral.is_connected().await.map_err(map_btleplug_error)? {
            peripheral.connect().await.map_err(map_btleplug_error)?;
        }
        let discovered = peripheral
            .discover_services()
            .await
            .map_err(map_btleplug_error);
        let target = &peripheral;
        cleanup_on_err(discovered, || async move {
            if let Err(err) = target.disconnect().await {
                debug!(peripheral = %target.id(), error = %err, "Failed to close link");
            }
        })
        .await?;

        let notifier = Arc::new(DisconnectNotifier {
            handler: on_disconnect,
            fired: AtomicBool::new(false),
        });
        let tasks = Arc::new(Mutex::new(Vec::new()));
        let id = peripheral.id();
        let watcher = {
            let notifier = Arc::clone(&notifier);
            let tasks = Arc::clone(&tasks);
            tokio::spawn(async move {
                while let Some(event) = events.next().await {
                    if let CentralEvent::DeviceDisconnected(gone) = event
                        && gone == id
                    {
                        // Stop the notification forwarders of the dead link.
                        abort_all(&tasks);
                        notifier.fire();
                        break;
                    }
                }
            })
        };

        let link = BtleplugLink {
            peripheral,
            tasks,
            notifier,
        };
        link.track(watcher);
        Ok(link)
    }

    fn resolve_characteristic(
        &self,
        link: &Self::Link,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<Self::Characteristic, TransportError> {
        link.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.service_uuid == service && c.uuid == characteristic)
            .ok_or(TransportError::CharacteristicMissing(characteristic))
    }

    async fn write(
        &self,
        link: &Self::Link,
        characteristic: &Self::Characteristic,
        data: &[u8],
    ) -> Result<(), TransportError> {
        trace!(uuid = %characteristic.uuid, len = data.len(), "GATT write");
        link.peripheral
            .write(characteristic, data, WriteType::WithoutResponse)
            .await
            .map_err(map_btleplug_error)
    }

    async fn subscribe(
        &self,
        link: &Self::Link,
        characteristic: &Self::Characteristic,
        handler: NotificationHandler,
    ) -> Result<(), TransportError> {
        // Open the stream before enabling notifications so the first frames
        // are not lost.
        let mut stream = link
            .peripheral
            .notifications()
            .await
            .map_err(map_btleplug_error)?;
        link.peripheral
            .subscribe(characteristic)
            .await
            .map_err(map_btleplug_error)?;

        let uuid = characteristic.uuid;
        let task = tokio::spawn(async move {
            while let Some(notification) = stream.next().await {
                if notification.uuid == uuid {
                    handler(&notification.value);
                }
            }
        });
        link.track(task);
        Ok(())
    }

    async fn clear_service_cache(&self, link: &Self::Link) -> Result<(), TransportError> {
        debug!(peripheral = %link.peripheral.id(), "Rediscovering services");
        link.peripheral
            .discover_services()
            .await
            .map_err(map_btleplug_error)
    }

    fn release(&self, link: &Self::Link) {
        link.abort_tasks();
    }

    async fn disconnect(&self, link: &Self::Link) -> Result<(), TransportError> {
        link.abort_tasks();
        let result = link
            .peripheral
            .disconnect()
            .await
            .map_err(map_btleplug_error);
        // The watcher is gone, so report the closed link here.
        link.notifier.fire();
        result
    }
}

/// Returns the string a peripheral is known by.
///
/// CoreBluetooth hides the MAC address and reports all zeros, so the
/// platform identifier is used instead.
pub(crate) fn peripheral_address(address: BDAddr, id: &impl fmt::Display) -> String {
    if address == BDAddr::default() {
        id.to_string()
    } else {
        address.to_string()
    }
}

/// Maps a `btleplug` error onto the dispatcher's retry classes.
pub(crate) fn map_btleplug_error(error: btleplug::Error) -> TransportError {
    let message = error.to_string();
    match error {
        btleplug::Error::DeviceNotFound => TransportError::NotFound(message),
        btleplug::Error::PermissionDenied | btleplug::Error::Other(_) => {
            TransportError::Stack(message)
        }
        _ => TransportError::Transient(message),
    }
}
