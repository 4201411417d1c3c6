// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `UberSolar` library.
//!
//! This module provides the error hierarchy for the library: value
//! validation, BLE transport failures, frame decoding and device operations.
//!
//! Transport failures carry their own retry classification (see
//! [`TransportError::is_fatal`] and [`TransportError::requires_backoff`]),
//! which the command dispatcher uses to decide between retrying and giving up.

use thiserror::Error;
use uuid::Uuid;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred on the BLE link.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Error occurred while decoding a notification frame.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error occurred during a device operation.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// A response byte was missing or outside the expected set.
    #[error(
        "operation failed (result={result} index={index} expected={expected:?} rssi={rssi:?})"
    )]
    OperationResult {
        /// Hex rendering of the response, or `None` when nothing came back.
        result: String,
        /// The byte index that was checked.
        index: usize,
        /// The accepted values for that byte.
        expected: Vec<u8>,
        /// Signal strength at the time of the check.
        rssi: Option<i16>,
    },
}

impl Error {
    /// Returns the underlying transport error, if this is one.
    #[must_use]
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A switch string did not have the expected number of hex digits.
    #[error("switch string must be {expected} hex digits, got {actual}")]
    InvalidSwitchLength {
        /// Expected number of hex digits.
        expected: usize,
        /// Number of hex digits provided.
        actual: usize,
    },

    /// A string contained characters that are not hex digits.
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    /// A solenoid mode byte was not 0, 1 or 2.
    #[error("invalid solenoid mode: {0}")]
    InvalidSolenoidMode(u8),

    /// A switch buffer did not have the expected size.
    #[error("switch buffer must be {expected} bytes, got {actual}")]
    InvalidSwitchBuffer {
        /// Expected buffer size.
        expected: usize,
        /// Actual buffer size.
        actual: usize,
    },

    /// The device clock cannot represent instants before the Unix epoch.
    #[error("timestamp {0} is before the Unix epoch")]
    TimestampBeforeEpoch(i64),
}

/// Failures reported by the BLE transport.
///
/// The variants map one-to-one onto the dispatcher's retry policy:
///
/// | Variant | Retried | Reconnect | Backoff |
/// |---------|---------|-----------|---------|
/// | `NotFound` | no | - | - |
/// | `CharacteristicMissing` | yes | yes (cache cleared) | no |
/// | `Transient` | yes | yes | no |
/// | `Stack` | yes | yes | yes |
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The peripheral is out of range or its identity is no longer valid.
    #[error("device not found: {0}")]
    NotFound(String),

    /// A required characteristic is absent from the service table.
    #[error("characteristic missing: {0}")]
    CharacteristicMissing(Uuid),

    /// A generic, retryable link failure.
    #[error("communication failed: {0}")]
    Transient(String),

    /// The host BLE stack rejected the operation and needs time to settle.
    #[error("BLE stack error: {0}")]
    Stack(String),
}

impl TransportError {
    /// Returns `true` if the failure must not be retried.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` if the dispatcher should pause before reconnecting.
    #[must_use]
    pub fn requires_backoff(&self) -> bool {
        matches!(self, Self::Stack(_))
    }
}

/// Errors related to decoding notification frames.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The frame had no tag byte.
    #[error("empty frame")]
    EmptyFrame,

    /// The frame is shorter than its tag's fixed layout.
    #[error("frame with tag {tag} is {actual} bytes, expected at least {expected}")]
    Truncated {
        /// The frame tag.
        tag: u8,
        /// Minimum size for this tag.
        expected: usize,
        /// Actual frame size.
        actual: usize,
    },
}

/// Errors related to device operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// No switch snapshot could be obtained from the device.
    #[error("switch state unavailable for {0}")]
    SwitchStateUnavailable(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
