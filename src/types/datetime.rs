// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Clock payload for the set-time command.
//!
//! The controller keeps its own wall clock. It is set with a 12-byte
//! payload: a little-endian 64-bit Unix timestamp and four padding bytes,
//! the second of which carries the UTC offset in whole hours as a signed
//! byte:
//!
//! ```text
//! offset: 0 1 2 3 4 5 6 7 8 9 10 11
//!         [  timestamp LE  ] 0 H  0  0
//! ```
//!
//! Offsets that do not fit the device's model (naive datetimes, fractional
//! hours, values outside `i8`) are still accepted but reported through
//! [`TimePayload::warnings`].
//!
//! # Examples
//!
//! ```
//! use chrono::{FixedOffset, TimeZone};
//! use ubersolar_lib::types::TimePayload;
//!
//! let tz = FixedOffset::east_opt(2 * 3600).unwrap();
//! let value = tz.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
//!
//! let payload = TimePayload::from_datetime(&value).unwrap();
//! assert_eq!(payload.offset_hours(), 2);
//! assert!(payload.warnings().is_empty());
//! ```

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Offset, TimeZone};

use crate::error::ValueError;

/// Size of the set-time payload in bytes.
pub const TIME_PAYLOAD_LEN: usize = 12;

/// Index of the UTC offset byte inside the payload.
const OFFSET_INDEX: usize = 9;

const SECONDS_PER_HOUR: i64 = 3600;

/// Caveats raised while building a [`TimePayload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimePayloadWarning {
    /// The input carried no timezone and was treated as UTC.
    NaiveAssumedUtc,
    /// The offset was not a whole number of hours and was truncated.
    FractionalOffset {
        /// The original offset in seconds.
        offset_seconds: i64,
        /// The hour value that was sent.
        truncated_hours: i64,
    },
    /// The offset did not fit in a signed byte and was clamped.
    OffsetClamped {
        /// The offset in hours before clamping.
        hours: i64,
    },
}

impl fmt::Display for TimePayloadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NaiveAssumedUtc => write!(f, "naive datetime provided; assuming UTC"),
            Self::FractionalOffset {
                offset_seconds,
                truncated_hours,
            } => write!(
                f,
                "timezone offset {offset_seconds}s is not an integer hour; truncating to {truncated_hours}"
            ),
            Self::OffsetClamped { hours } => {
                write!(f, "timezone offset {hours}h out of supported range; clamping")
            }
        }
    }
}

/// Encoded set-time payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimePayload {
    bytes: [u8; TIME_PAYLOAD_LEN],
    warnings: Vec<TimePayloadWarning>,
}

impl TimePayload {
    /// Builds the payload for a timezone-aware instant.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::TimestampBeforeEpoch`] for instants before 1970.
    pub fn from_datetime<Tz: TimeZone>(value: &DateTime<Tz>) -> Result<Self, ValueError> {
        let offset_seconds = i64::from(value.offset().fix().local_minus_utc());
        Self::build(value.timestamp(), offset_seconds, Vec::new())
    }

    /// Builds the payload for a datetime without timezone, treating it as UTC.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::TimestampBeforeEpoch`] for instants before 1970.
    pub fn from_naive(value: NaiveDateTime) -> Result<Self, ValueError> {
        Self::build(
            value.and_utc().timestamp(),
            0,
            vec![TimePayloadWarning::NaiveAssumedUtc],
        )
    }

    /// Builds the payload from a raw Unix timestamp and offset in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::TimestampBeforeEpoch`] for negative timestamps.
    pub fn from_parts(timestamp: i64, offset_seconds: i64) -> Result<Self, ValueError> {
        Self::build(timestamp, offset_seconds, Vec::new())
    }

    fn build(
        timestamp: i64,
        offset_seconds: i64,
        mut warnings: Vec<TimePayloadWarning>,
    ) -> Result<Self, ValueError> {
        let seconds =
            u64::try_from(timestamp).map_err(|_| ValueError::TimestampBeforeEpoch(timestamp))?;

        // Integer division truncates toward zero.
        let mut hours = offset_seconds / SECONDS_PER_HOUR;
        if offset_seconds % SECONDS_PER_HOUR != 0 {
            warnings.push(TimePayloadWarning::FractionalOffset {
                offset_seconds,
                truncated_hours: hours,
            });
        }
        if !(i64::from(i8::MIN)..=i64::from(i8::MAX)).contains(&hours) {
            warnings.push(TimePayloadWarning::OffsetClamped { hours });
            hours = hours.clamp(i64::from(i8::MIN), i64::from(i8::MAX));
        }
        let hours = i8::try_from(hours).unwrap_or(if hours < 0 { i8::MIN } else { i8::MAX });

        let mut bytes = [0u8; TIME_PAYLOAD_LEN];
        bytes[..8].copy_from_slice(&seconds.to_le_bytes());
        bytes[OFFSET_INDEX] = hours.to_le_bytes()[0];

        Ok(Self { bytes, warnings })
    }

    /// Returns the encoded payload.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; TIME_PAYLOAD_LEN] {
        &self.bytes
    }

    /// Returns the Unix timestamp stored in the payload.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.bytes[..8]);
        u64::from_le_bytes(raw)
    }

    /// Returns the UTC offset in hours stored in the payload.
    #[must_use]
    pub fn offset_hours(&self) -> i8 {
        i8::from_le_bytes([self.bytes[OFFSET_INDEX]])
    }

    /// Returns the caveats raised while building the payload.
    #[must_use]
    pub fn warnings(&self) -> &[TimePayloadWarning] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate, Utc};

    use super::*;

    #[test]
    fn utc_payload_layout() {
        let value = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let payload = TimePayload::from_datetime(&value).unwrap();

        let mut expected = [0u8; TIME_PAYLOAD_LEN];
        expected[..8].copy_from_slice(&1_705_314_600u64.to_le_bytes());
        assert_eq!(payload.as_bytes(), &expected);
        assert_eq!(payload.timestamp(), 1_705_314_600);
        assert_eq!(payload.offset_hours(), 0);
    }

    #[test]
    fn positive_offset_round_trip() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let value = tz.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let payload = TimePayload::from_datetime(&value).unwrap();

        assert_eq!(payload.as_bytes()[9], 2);
        assert_eq!(payload.as_bytes()[8], 0);
        assert_eq!(payload.offset_hours(), 2);
        assert_eq!(payload.timestamp(), value.timestamp().unsigned_abs());
    }

    #[test]
    fn negative_offset_is_twos_complement() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let value = tz.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let payload = TimePayload::from_datetime(&value).unwrap();

        assert_eq!(payload.as_bytes()[9], 0xFB);
        assert_eq!(payload.offset_hours(), -5);
        assert!(payload.warnings().is_empty());
    }

    #[test]
    fn fractional_offset_truncates_with_warning() {
        let tz = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let value = tz.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let payload = TimePayload::from_datetime(&value).unwrap();

        assert_eq!(payload.offset_hours(), 5);
        assert_eq!(
            payload.warnings(),
            &[TimePayloadWarning::FractionalOffset {
                offset_seconds: 19_800,
                truncated_hours: 5
            }]
        );
    }

    #[test]
    fn negative_fractional_offset_truncates_toward_zero() {
        let payload = TimePayload::from_parts(1_700_000_000, -(3 * 3600 + 1800)).unwrap();
        assert_eq!(payload.offset_hours(), -3);
        assert_eq!(payload.warnings().len(), 1);
    }

    #[test]
    fn out_of_range_offset_is_clamped() {
        let payload = TimePayload::from_parts(1_700_000_000, 200 * 3600).unwrap();
        assert_eq!(payload.offset_hours(), 127);

        let payload = TimePayload::from_parts(1_700_000_000, -200 * 3600).unwrap();
        assert_eq!(payload.offset_hours(), -128);
        assert_eq!(
            payload.warnings(),
            &[TimePayloadWarning::OffsetClamped { hours: -200 }]
        );
    }

    #[test]
    fn naive_is_treated_as_utc() {
        let naive = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        let payload = TimePayload::from_naive(naive).unwrap();

        assert_eq!(payload.timestamp(), 1_705_314_600);
        assert_eq!(payload.offset_hours(), 0);
        assert_eq!(payload.warnings(), &[TimePayloadWarning::NaiveAssumedUtc]);
    }

    #[test]
    fn rejects_pre_epoch() {
        assert_eq!(
            TimePayload::from_parts(-1, 0),
            Err(ValueError::TimestampBeforeEpoch(-1))
        );
    }

    #[test]
    fn warning_display() {
        let warning = TimePayloadWarning::FractionalOffset {
            offset_seconds: 19_800,
            truncated_hours: 5,
        };
        assert_eq!(
            warning.to_string(),
            "timezone offset 19800s is not an integer hour; truncating to 5"
        );
    }
}
