// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scripted in-memory transport shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use ubersolar_lib::TransportError;
use ubersolar_lib::state::StatusFragment;
use ubersolar_lib::telemetry::encode_frame;
use ubersolar_lib::transport::{DisconnectHandler, NotificationHandler, Transport};
use ubersolar_lib::types::{DeviceInfo, Switches};
use uuid::Uuid;

pub const ADDRESS: &str = "AA:BB:CC:DD:EE:FF";

pub fn device_info() -> DeviceInfo {
    DeviceInfo::new(ADDRESS, "UberSmart_Test").with_rssi(-60)
}

pub fn temperatures_frame() -> Vec<u8> {
    encode_frame(&StatusFragment::Temperatures {
        water_temperature: 55.5,
        manifold_temperature: 71.25,
        stored_water: 12.5,
    })
}

pub fn switches_frame(bytes: [u8; 5]) -> Vec<u8> {
    let switches = Switches::from_bytes(bytes);
    encode_frame(&StatusFragment::Switches {
        element_on: bytes[1],
        pump_on: bytes[2],
        holiday_mode: bytes[3],
        solenoid_mode: bytes[4],
        solenoid_state: 0.0,
        all_switches: switches,
    })
}

/// An in-memory stand-in for a BLE stack.
///
/// Failures are queued and consumed in order. On subscribe the configured
/// frames are pushed to the notification handler; a switch write is echoed
/// back as a tag-2 frame, the way the controller reports its new state.
#[derive(Clone, Default)]
pub struct FakeTransport {
    inner: Arc<FakeInner>,
}

#[derive(Default)]
struct FakeInner {
    connect_failures: Mutex<VecDeque<TransportError>>,
    write_failures: Mutex<VecDeque<TransportError>>,
    always_fail_writes: Mutex<Option<TransportError>>,
    missing_characteristic_connects: AtomicUsize,
    missing_now: AtomicBool,
    frames: Mutex<Vec<Vec<u8>>>,
    echo_switches: AtomicBool,
    write_delay: Mutex<Duration>,

    connect_attempts: AtomicUsize,
    write_attempts: AtomicUsize,
    disconnects: AtomicUsize,
    released: AtomicUsize,
    cache_clears: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    writes: Mutex<Vec<Vec<u8>>>,

    next_link: AtomicUsize,
    handler: Mutex<Option<NotificationHandler>>,
    on_disconnect: Mutex<Option<DisconnectHandler>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.inner.echo_switches.store(true, Ordering::SeqCst);
        fake
    }

    /// Uses the usual frames: temperatures plus the given switch buffer.
    pub fn with_status(self, switches: [u8; 5]) -> Self {
        self.set_frames(vec![temperatures_frame(), switches_frame(switches)]);
        self
    }

    pub fn set_frames(&self, frames: Vec<Vec<u8>>) {
        *self.inner.frames.lock() = frames;
    }

    pub fn set_echo_switches(&self, echo: bool) {
        self.inner.echo_switches.store(echo, Ordering::SeqCst);
    }

    pub fn fail_next_connect(&self, error: TransportError) {
        self.inner.connect_failures.lock().push_back(error);
    }

    pub fn fail_next_write(&self, error: TransportError) {
        self.inner.write_failures.lock().push_back(error);
    }

    pub fn fail_every_write(&self, error: TransportError) {
        *self.inner.always_fail_writes.lock() = Some(error);
    }

    pub fn hide_characteristics_for(&self, connects: usize) {
        self.inner
            .missing_characteristic_connects
            .store(connects, Ordering::SeqCst);
    }

    pub fn set_write_delay(&self, delay: Duration) {
        *self.inner.write_delay.lock() = delay;
    }

    /// Pushes a notification as if the device had sent it.
    pub fn emit(&self, frame: &[u8]) {
        let handler = self.inner.handler.lock().clone();
        if let Some(handler) = handler {
            handler(frame);
        }
    }

    /// Simulates the peripheral dropping the link on its own.
    pub fn drop_link(&self) {
        let callback = self.inner.on_disconnect.lock().take();
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Returns the disconnect callback of the current link, if any.
    pub fn disconnect_handler(&self) -> Option<DisconnectHandler> {
        self.inner.on_disconnect.lock().clone()
    }

    pub fn connect_attempts(&self) -> usize {
        self.inner.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn write_attempts(&self) -> usize {
        self.inner.write_attempts.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.inner.disconnects.load(Ordering::SeqCst)
    }

    /// Links released after the stack reported them lost.
    pub fn released(&self) -> usize {
        self.inner.released.load(Ordering::SeqCst)
    }

    pub fn cache_clears(&self) -> usize {
        self.inner.cache_clears.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    /// Successful writes, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.inner.writes.lock().clone()
    }
}

impl Transport for FakeTransport {
    type Link = usize;
    type Characteristic = Uuid;

    async fn connect(
        &self,
        _device: &DeviceInfo,
        on_disconnect: DisconnectHandler,
    ) -> Result<usize, TransportError> {
        self.inner.connect_attempts.fetch_add(1, Ordering::SeqCst);
        let failure = self.inner.connect_failures.lock().pop_front();
        if let Some(error) = failure {
            return Err(error);
        }

        let missing = self
            .inner
            .missing_characteristic_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        self.inner.missing_now.store(missing, Ordering::SeqCst);

        *self.inner.on_disconnect.lock() = Some(on_disconnect);
        Ok(self.inner.next_link.fetch_add(1, Ordering::SeqCst))
    }

    fn resolve_characteristic(
        &self,
        _link: &usize,
        _service: Uuid,
        characteristic: Uuid,
    ) -> Result<Uuid, TransportError> {
        if self.inner.missing_now.load(Ordering::SeqCst) {
            return Err(TransportError::CharacteristicMissing(characteristic));
        }
        Ok(characteristic)
    }

    async fn write(
        &self,
        _link: &usize,
        _characteristic: &Uuid,
        data: &[u8],
    ) -> Result<(), TransportError> {
        self.inner.write_attempts.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner
            .max_in_flight
            .fetch_max(in_flight, Ordering::SeqCst);

        let delay = *self.inner.write_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);

        let always = self.inner.always_fail_writes.lock().clone();
        if let Some(error) = always {
            return Err(error);
        }
        let failure = self.inner.write_failures.lock().pop_front();
        if let Some(error) = failure {
            return Err(error);
        }

        self.inner.writes.lock().push(data.to_vec());

        if self.inner.echo_switches.load(Ordering::SeqCst)
            && data.len() == Switches::LEN
            && data[0] == 0x06
        {
            let mut report = [0u8; Switches::LEN];
            report.copy_from_slice(data);
            report[0] = 2;
            self.emit(&switches_frame(report));
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        _link: &usize,
        _characteristic: &Uuid,
        handler: NotificationHandler,
    ) -> Result<(), TransportError> {
        *self.inner.handler.lock() = Some(Arc::clone(&handler));
        let frames = self.inner.frames.lock().clone();
        for frame in &frames {
            handler(frame);
        }
        Ok(())
    }

    async fn clear_service_cache(&self, _link: &usize) -> Result<(), TransportError> {
        self.inner.cache_clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self, _link: &usize) {
        self.inner.released.fetch_add(1, Ordering::SeqCst);
        *self.inner.handler.lock() = None;
    }

    async fn disconnect(&self, _link: &usize) -> Result<(), TransportError> {
        self.inner.disconnects.fetch_add(1, Ordering::SeqCst);
        *self.inner.handler.lock() = None;
        let callback = self.inner.on_disconnect.lock().take();
        if let Some(callback) = callback {
            callback();
        }
        Ok(())
    }
}
