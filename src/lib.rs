// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `UberSolar` Lib - A Rust library to control `UberSmart` solar water heater
//! controllers over Bluetooth Low Energy.
//!
//! The controller exposes one GATT service with a write characteristic for
//! commands and a notify characteristic on which it streams its status as
//! five small tagged frames. This library keeps a lazily opened, idle-closed
//! link per device, serializes commands with bounded retries, and merges the
//! notified frames into an always up-to-date status.
//!
//! # Supported Features
//!
//! - **Status**: tank and manifold temperatures, stored water, runtime,
//!   light level, panel voltage, fault codes
//! - **Switches**: heating element, circulation pump, holiday mode, solenoid
//! - **Clock**: set the device time with UTC offset
//! - **Maintenance**: enable the Wi-Fi access point
//! - **Discovery**: scan for advertising controllers (feature `btleplug`)
//!
//! # Quick Start
//!
//! ```no_run
//! use ubersolar_lib::UberSmart;
//! use ubersolar_lib::discovery::{DiscoveryOptions, Scanner};
//! use ubersolar_lib::transport::BtleplugTransport;
//!
//! #[tokio::main]
//! async fn main() -> ubersolar_lib::Result<()> {
//!     let transport = BtleplugTransport::default_adapter().await?;
//!     let scanner = Scanner::new(transport.adapter().clone());
//!
//!     let devices = scanner.discover(&DiscoveryOptions::new()).await?;
//!     let Some(info) = devices.into_iter().next() else {
//!         return Ok(());
//!     };
//!
//!     let device = UberSmart::builder(transport, info).build();
//!     device.update().await?;
//!     println!("{}", serde_json::Value::Object(device.status().to_map()));
//!
//!     device.turn_on_element().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Custom Transports
//!
//! Everything except discovery is generic over
//! [`Transport`](transport::Transport). Disable default features to use the
//! core without `btleplug`, e.g. with a platform-specific stack.
//!
//! # Event Subscriptions
//!
//! ```no_run
//! use ubersolar_lib::subscription::Subscribable;
//! # fn example(device: &ubersolar_lib::UberSmart<ubersolar_lib::transport::BtleplugTransport>) {
//! device.on_switches_changed(|switches| {
//!     println!("element on: {}", switches.element_on());
//! });
//! # }
//! ```

pub mod command;
mod device;
#[cfg(feature = "btleplug")]
pub mod discovery;
pub mod error;
pub mod session;
pub mod state;
pub mod subscription;
pub mod telemetry;
pub mod transport;
pub mod types;

pub use command::{
    Command, EnableAccessPointCommand, RawCommand, SetTimeCommand, StatusRequest, SwitchCommand,
};
pub use device::{UberSmart, UberSmartBuilder};
pub use error::{DeviceError, Error, ParseError, Result, TransportError, ValueError};
pub use session::{ConnectionState, Session, SessionConfig};
pub use state::{DeviceStatus, StatusFragment, StatusStore};
pub use subscription::{CallbackRegistry, Subscribable, SubscriptionId};
pub use transport::Transport;
pub use types::{DeviceInfo, InterlockPolicy, SolenoidMode, Switches, TimePayload};
