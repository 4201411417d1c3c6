// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BLE transport abstraction.
//!
//! The session layer only needs a handful of GATT primitives: open a link,
//! look up characteristics, write without response, subscribe to
//! notifications and close the link. [`Transport`] captures exactly those,
//! so the session logic can be driven by a real BLE stack or by an
//! in-memory fake in tests.
//!
//! # Backends
//!
//! - `BtleplugTransport` (feature `btleplug`, enabled by default): the
//!   cross-platform `btleplug` stack

#[cfg(feature = "btleplug")]
mod btle;

#[cfg(feature = "btleplug")]
pub use btle::{BtleplugLink, BtleplugTransport};
#[cfg(feature = "btleplug")]
pub(crate) use btle::{map_btleplug_error, peripheral_address};

use std::future::Future;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::TransportError;
use crate::types::DeviceInfo;

/// Primary GATT service of the `UberSmart` controller.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x8866_5b98_0bfb_11ec_9a03_0242_ac13_0003);

/// Characteristic commands are written to.
pub const WRITE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x95b1_0712_0bfb_11ec_9a03_0242_ac13_0003);

/// Characteristic status frames are notified on.
pub const READ_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x9af9_0c38_0bfb_11ec_9a03_0242_ac13_0003);

/// Firmware version characteristic.
pub const FIRMWARE_VERSION_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x9af9_0c40_0bfb_11ec_9a03_0242_ac13_0003);

/// Advertised local name prefix of `UberSmart` controllers.
pub const DEVICE_NAME_PREFIX: &str = "UberSmart_";

/// Callback invoked with the payload of each notification.
pub type NotificationHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Callback invoked when the stack reports the link as gone.
pub type DisconnectHandler = Arc<dyn Fn() + Send + Sync>;

/// GATT primitives required by the connection session.
///
/// Implementations must map their native failures onto [`TransportError`]
/// so the dispatcher can apply its retry policy:
///
/// - unreachable peripheral or stale identity: [`TransportError::NotFound`]
/// - absent characteristic: [`TransportError::CharacteristicMissing`]
/// - host stack refusal: [`TransportError::Stack`]
/// - anything else: [`TransportError::Transient`]
pub trait Transport: Send + Sync + 'static {
    /// An open connection to one peripheral.
    type Link: Clone + Send + Sync + 'static;

    /// A resolved characteristic handle.
    type Characteristic: Clone + Send + Sync + 'static;

    /// Opens a link to the device.
    ///
    /// `on_disconnect` must be called once if the stack later reports the
    /// link as lost, whether or not [`Transport::disconnect`] was called.
    fn connect(
        &self,
        device: &DeviceInfo,
        on_disconnect: DisconnectHandler,
    ) -> impl Future<Output = Result<Self::Link, TransportError>> + Send;

    /// Looks up a characteristic in the link's service table.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::CharacteristicMissing`] if the service or
    /// characteristic is not present.
    fn resolve_characteristic(
        &self,
        link: &Self::Link,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<Self::Characteristic, TransportError>;

    /// Writes bytes without waiting for a GATT response.
    fn write(
        &self,
        link: &Self::Link,
        characteristic: &Self::Characteristic,
        data: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Enables notifications and routes their payloads to `handler`.
    fn subscribe(
        &self,
        link: &Self::Link,
        characteristic: &Self::Characteristic,
        handler: NotificationHandler,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Drops any cached service table so the next lookup rediscovers it.
    fn clear_service_cache(
        &self,
        link: &Self::Link,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Frees what the link still holds after the stack reported it lost.
    ///
    /// Called instead of [`Transport::disconnect`] for links that went away
    /// on their own. Must not touch the radio, since the peripheral may
    /// already be reconnecting.
    fn release(&self, link: &Self::Link);

    /// Closes the link.
    fn disconnect(
        &self,
        link: &Self::Link,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
