// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `UberSmart` device builder.

use std::sync::Arc;

use crate::device::UberSmart;
use crate::session::{Session, SessionConfig};
use crate::state::StatusStore;
use crate::subscription::CallbackRegistry;
use crate::transport::Transport;
use crate::types::{DeviceInfo, InterlockPolicy};

/// Builder for [`UberSmart`] devices.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use ubersolar_lib::UberSmart;
/// use ubersolar_lib::state::StatusStore;
/// use ubersolar_lib::transport::BtleplugTransport;
/// use ubersolar_lib::types::{DeviceInfo, InterlockPolicy};
///
/// # async fn example() -> ubersolar_lib::Result<()> {
/// let transport = BtleplugTransport::default_adapter().await?;
/// let store = Arc::new(StatusStore::new());
///
/// let device = UberSmart::builder(transport, DeviceInfo::new("AA:BB:CC:DD:EE:FF", "UberSmart_1"))
///     .with_retry_count(5)
///     .with_interlock(InterlockPolicy::Independent)
///     .with_status_store(Arc::clone(&store))
///     .build();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct UberSmartBuilder<T: Transport> {
    transport: T,
    device: DeviceInfo,
    config: SessionConfig,
    store: Option<Arc<StatusStore>>,
}

impl<T: Transport> UberSmartBuilder<T> {
    pub(crate) fn new(transport: T, device: DeviceInfo) -> Self {
        Self {
            transport,
            device,
            config: SessionConfig::default(),
            store: None,
        }
    }

    /// Replaces the whole session configuration.
    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the number of retries per command.
    #[must_use]
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.config.retry_count = retry_count;
        self
    }

    /// Sets the element/pump interlock policy.
    #[must_use]
    pub fn with_interlock(mut self, interlock: InterlockPolicy) -> Self {
        self.config.interlock = interlock;
        self
    }

    /// Shares an existing status store instead of creating a private one.
    #[must_use]
    pub fn with_status_store(mut self, store: Arc<StatusStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds the device.
    ///
    /// No connection is made; the first command opens the link.
    #[must_use]
    pub fn build(self) -> UberSmart<T> {
        let store = self.store.unwrap_or_default();
        let session = Session::new(
            self.transport,
            self.device,
            self.config,
            store,
            Arc::new(CallbackRegistry::new()),
        );
        UberSmart::from_session(session)
    }
}
