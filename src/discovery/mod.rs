// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BLE discovery of `UberSmart` controllers.
//!
//! Controllers advertise a local name starting with `UberSmart_`. The
//! [`Scanner`] runs a timed scan on a `btleplug` adapter and reports every
//! matching peripheral as a [`DeviceInfo`], ready to build an
//! [`UberSmart`](crate::UberSmart) handle.
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//! use ubersolar_lib::discovery::{DiscoveryOptions, Scanner};
//! use ubersolar_lib::transport::BtleplugTransport;
//!
//! # async fn example() -> ubersolar_lib::Result<()> {
//! let transport = BtleplugTransport::default_adapter().await?;
//! let scanner = Scanner::new(transport.adapter().clone());
//!
//! let options = DiscoveryOptions::new().with_timeout(Duration::from_secs(10));
//! for device in scanner.discover(&options).await? {
//!     println!("{device} rssi={:?}", device.rssi());
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use btleplug::api::{Central as _, Peripheral as _, ScanFilter};
use btleplug::platform::Adapter;
use tracing::{debug, error, warn};

use crate::error::TransportError;
use crate::transport::{DEVICE_NAME_PREFIX, map_btleplug_error, peripheral_address};
use crate::types::DeviceInfo;

/// Default scan duration.
const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of retries after a failed scan.
const DEFAULT_RETRY_COUNT: u32 = 3;

/// Pause between failed scans.
const DEFAULT_RETRY_PAUSE: Duration = Duration::from_secs(2);

/// Options for a discovery run.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use ubersolar_lib::discovery::DiscoveryOptions;
///
/// let options = DiscoveryOptions::new()
///     .with_timeout(Duration::from_secs(10))
///     .with_retry(1);
///
/// assert_eq!(options.timeout(), Duration::from_secs(10));
/// assert_eq!(options.retry(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    timeout: Option<Duration>,
    retry: Option<u32>,
    retry_pause: Option<Duration>,
}

impl DiscoveryOptions {
    /// Creates options with default settings.
    ///
    /// Default scan time is 5 seconds, with 3 retries 2 seconds apart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how long each scan listens for advertisements.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets how many times a failed scan is retried.
    #[must_use]
    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Sets the pause between failed scans.
    #[must_use]
    pub fn with_retry_pause(mut self, pause: Duration) -> Self {
        self.retry_pause = Some(pause);
        self
    }

    /// Returns the scan duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_SCAN_TIMEOUT)
    }

    /// Returns the retry count.
    #[must_use]
    pub fn retry(&self) -> u32 {
        self.retry.unwrap_or(DEFAULT_RETRY_COUNT)
    }

    /// Returns the pause between failed scans.
    #[must_use]
    pub fn retry_pause(&self) -> Duration {
        self.retry_pause.unwrap_or(DEFAULT_RETRY_PAUSE)
    }
}

/// Returns `true` if an advertised name belongs to an `UberSmart` controller.
#[must_use]
pub fn is_ubersmart_name(name: &str) -> bool {
    name.contains(DEVICE_NAME_PREFIX)
}

/// Scans a `btleplug` adapter for `UberSmart` controllers.
#[derive(Debug, Clone)]
pub struct Scanner {
    adapter: Adapter,
}

impl Scanner {
    /// Creates a scanner on the given adapter.
    #[must_use]
    pub fn new(adapter: Adapter) -> Self {
        Self { adapter }
    }

    /// Scans for controllers, retrying failed scans.
    ///
    /// Devices are returned sorted by address, one entry per address.
    ///
    /// # Errors
    ///
    /// Returns the last scan error once all retries have failed.
    pub async fn discover(
        &self,
        options: &DiscoveryOptions,
    ) -> Result<Vec<DeviceInfo>, TransportError> {
        let mut remaining = options.retry();
        loop {
            match self.scan_once(options.timeout()).await {
                Ok(devices) => {
                    debug!(count = devices.len(), "Scan completed");
                    return Ok(devices);
                }
                Err(err) if remaining == 0 => {
                    error!(error = %err, "Scanning for UberSolar devices failed; stopping");
                    return Err(err);
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        remaining,
                        "Error scanning for UberSolar devices; retrying"
                    );
                    remaining -= 1;
                    tokio::time::sleep(options.retry_pause()).await;
                }
            }
        }
    }

    /// Scans and returns the controller with the given address, if seen.
    ///
    /// # Errors
    ///
    /// Returns the last scan error once all retries have failed.
    pub async fn find(
        &self,
        address: &str,
        options: &DiscoveryOptions,
    ) -> Result<Option<DeviceInfo>, TransportError> {
        let devices = self.discover(options).await?;
        Ok(devices
            .into_iter()
            .find(|d| d.address().eq_ignore_ascii_case(address)))
    }

    async fn scan_once(&self, duration: Duration) -> Result<Vec<DeviceInfo>, TransportError> {
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(map_btleplug_error)?;
        tokio::time::sleep(duration).await;
        self.adapter.stop_scan().await.map_err(map_btleplug_error)?;

        let mut found = BTreeMap::new();
        for peripheral in self
            .adapter
            .peripherals()
            .await
            .map_err(map_btleplug_error)?
        {
            let Some(properties) = peripheral
                .properties()
                .await
                .map_err(map_btleplug_error)?
            else {
                continue;
            };
            let Some(name) = properties.local_name else {
                continue;
            };
            if !is_ubersmart_name(&name) {
                continue;
            }

            let address = peripheral_address(properties.address, &peripheral.id());
            let mut info = DeviceInfo::new(address.clone(), name);
            if let Some(rssi) = properties.rssi {
                info = info.with_rssi(rssi);
            }
            debug!(device = %info, rssi = ?info.rssi(), "Found controller");
            found.insert(address, info);
        }

        Ok(found.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_defaults() {
        let options = DiscoveryOptions::new();
        assert_eq!(options.timeout(), Duration::from_secs(5));
        assert_eq!(options.retry(), 3);
        assert_eq!(options.retry_pause(), Duration::from_secs(2));
    }

    #[test]
    fn options_overrides() {
        let options = DiscoveryOptions::new()
            .with_retry(0)
            .with_retry_pause(Duration::from_millis(100));
        assert_eq!(options.retry(), 0);
        assert_eq!(options.retry_pause(), Duration::from_millis(100));
    }

    #[test]
    fn name_filter() {
        assert!(is_ubersmart_name("UberSmart_1234"));
        assert!(is_ubersmart_name("x UberSmart_"));
        assert!(!is_ubersmart_name("UberSmart"));
        assert!(!is_ubersmart_name("Thermostat"));
    }
}
