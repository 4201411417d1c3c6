// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session timing and retry configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::InterlockPolicy;

/// Tunables for a device session.
///
/// The defaults match the controller's firmware: it drops idle links on its
/// own after roughly ten seconds, and starts pushing status frames a few
/// seconds after notifications are enabled.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use ubersolar_lib::session::SessionConfig;
///
/// let config = SessionConfig::default()
///     .with_retry_count(5)
///     .with_disconnect_delay(Duration::from_secs(4));
///
/// assert_eq!(config.retry_count, 5);
/// assert_eq!(config.settle_delay, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle time after the last activity before the link is closed.
    pub disconnect_delay: Duration,
    /// Wait after enabling notifications before the link is considered ready.
    pub settle_delay: Duration,
    /// Retries after the first attempt of each command.
    pub retry_count: u32,
    /// Pause before reconnecting after a host stack error.
    pub reconnect_backoff: Duration,
    /// Minimum age of the last full refresh before a poll is due.
    pub poll_interval: Duration,
    /// Element/pump interlock applied by the switch helpers.
    pub interlock: InterlockPolicy,
}

impl SessionConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the idle disconnect delay.
    #[must_use]
    pub fn with_disconnect_delay(mut self, delay: Duration) -> Self {
        self.disconnect_delay = delay;
        self
    }

    /// Sets the post-subscription settle delay.
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Sets the number of retries per command.
    #[must_use]
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Sets the backoff applied after host stack errors.
    #[must_use]
    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    /// Sets the polling interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the element/pump interlock policy.
    #[must_use]
    pub fn with_interlock(mut self, interlock: InterlockPolicy) -> Self {
        self.interlock = interlock;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            disconnect_delay: Duration::from_millis(8_500),
            settle_delay: Duration::from_secs(5),
            retry_count: 3,
            reconnect_backoff: Duration::from_millis(250),
            poll_interval: Duration::from_secs(60),
            interlock: InterlockPolicy::Exclusive,
        }
    }
}
