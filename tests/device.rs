// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level device operations against a scripted transport.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{FixedOffset, NaiveDate, TimeZone};
use common::{ADDRESS, FakeTransport, device_info, temperatures_frame};
use parking_lot::Mutex;
use ubersolar_lib::subscription::Subscribable;
use ubersolar_lib::types::DeviceInfo;
use ubersolar_lib::{
    DeviceError, Error, InterlockPolicy, SolenoidMode, StatusStore, Switches, UberSmart,
    ValueError,
};

fn device(fake: &FakeTransport) -> UberSmart<FakeTransport> {
    UberSmart::builder(fake.clone(), device_info()).build()
}

// ============================================================================
// Switches
// ============================================================================

mod switches {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn toggle_all_writes_the_full_buffer() {
        let fake = FakeTransport::new().with_status([2, 0, 0, 0, 0]);
        let device = device(&fake);

        device.toggle_switches_all("00000002").await.unwrap();

        assert_eq!(fake.writes(), vec![vec![0x06, 0, 0, 0, 2]]);
        assert_eq!(device.status().solenoid_mode(), Some(SolenoidMode::Auto));
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_all_rejects_malformed_input() {
        let fake = FakeTransport::new();
        let device = device(&fake);

        let err = device.toggle_switches_all("0000002").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Value(ValueError::InvalidSwitchLength { actual: 7, .. })
        ));

        let err = device.toggle_switches_all("0000000g").await.unwrap_err();
        assert!(matches!(err, Error::Value(ValueError::InvalidHex(_))));

        assert_eq!(fake.connect_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn element_on_turns_pump_off_by_default() {
        let fake = FakeTransport::new().with_status([2, 0, 1, 1, 2]);
        let device = device(&fake);
        device.update().await.unwrap();

        device.turn_on_element().await.unwrap();

        assert_eq!(fake.writes(), vec![vec![0x06, 1, 0, 1, 2]]);
        let status = device.status();
        assert_eq!(status.element_on(), Some(1));
        assert_eq!(status.pump_on(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn independent_interlock_keeps_pump_running() {
        let fake = FakeTransport::new().with_status([2, 0, 1, 0, 2]);
        let device = UberSmart::builder(fake.clone(), device_info())
            .with_interlock(InterlockPolicy::Independent)
            .build();
        device.update().await.unwrap();

        device.turn_on_element().await.unwrap();

        assert_eq!(fake.writes(), vec![vec![0x06, 1, 1, 0, 2]]);
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_status_when_nothing_is_cached() {
        let fake = FakeTransport::new().with_status([2, 0, 0, 0, 2]);
        let device = device(&fake);
        assert!(!device.store().has_status(ADDRESS));

        device.turn_on_pump().await.unwrap();

        assert_eq!(fake.connect_attempts(), 1);
        assert_eq!(fake.writes(), vec![vec![0x06, 0, 1, 0, 2]]);
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_without_a_switch_report() {
        let fake = FakeTransport::new();
        fake.set_frames(vec![temperatures_frame()]);
        let device = device(&fake);

        let err = device.turn_on_pump().await.unwrap_err();

        assert!(matches!(
            err,
            Error::Device(DeviceError::SwitchStateUnavailable(ref address)) if address == ADDRESS
        ));
        assert!(fake.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn successive_changes_build_on_each_other() {
        let fake = FakeTransport::new().with_status([2, 0, 0, 0, 0]);
        let device = device(&fake);

        device.turn_on_holiday().await.unwrap();
        device.set_solenoid(SolenoidMode::On).await.unwrap();
        device.turn_on_pump().await.unwrap();
        device.turn_off_holiday().await.unwrap();

        assert_eq!(
            fake.writes(),
            vec![
                vec![0x06, 0, 0, 1, 0],
                vec![0x06, 0, 0, 1, 1],
                vec![0x06, 0, 1, 1, 1],
                vec![0x06, 0, 1, 0, 1],
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_changes_do_not_overwrite_each_other() {
        let fake = FakeTransport::new().with_status([2, 0, 0, 0, 0]);
        fake.set_echo_switches(false);
        let device = device(&fake);
        device.update().await.unwrap();
        fake.set_write_delay(Duration::from_millis(500));

        let (element, holiday) = tokio::join!(device.turn_on_element(), device.turn_on_holiday());
        element.unwrap();
        holiday.unwrap();

        assert_eq!(
            fake.writes(),
            vec![vec![0x06, 1, 0, 0, 0], vec![0x06, 1, 0, 1, 0]]
        );
        let status = device.status();
        assert_eq!(status.element_on(), Some(1));
        assert_eq!(status.holiday_mode(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn written_switches_are_cached_without_a_report() {
        let fake = FakeTransport::new().with_status([2, 0, 1, 0, 2]);
        fake.set_echo_switches(false);
        let device = device(&fake);

        device.turn_on_element().await.unwrap();

        let status = device.status();
        assert_eq!(status.element_on(), Some(1));
        assert_eq!(status.pump_on(), Some(0));
        assert_eq!(
            device.store().switches(ADDRESS),
            Some(Switches::from_bytes([2, 1, 0, 0, 2]))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn turning_off_leaves_other_switches_alone() {
        let fake = FakeTransport::new().with_status([2, 1, 1, 1, 2]);
        let device = device(&fake);

        device.turn_off_element().await.unwrap();
        device.turn_off_pump().await.unwrap();

        assert_eq!(
            fake.writes(),
            vec![vec![0x06, 0, 1, 1, 2], vec![0x06, 0, 0, 1, 2]]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn set_switches_writes_given_buffer() {
        let fake = FakeTransport::new().with_status([2, 0, 0, 0, 0]);
        let device = device(&fake);

        device
            .set_switches(Switches::new(true, false, true, SolenoidMode::Auto))
            .await
            .unwrap();

        assert_eq!(fake.writes(), vec![vec![0x06, 1, 0, 1, 2]]);
    }
}

// ============================================================================
// Clock and system commands
// ============================================================================

mod system {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn set_time_writes_timestamp_and_offset() {
        let fake = FakeTransport::new().with_status([2, 0, 0, 0, 2]);
        let device = device(&fake);
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let value = offset.with_ymd_and_hms(2024, 1, 15, 12, 30, 0).unwrap();

        device.set_time(&value).await.unwrap();

        let mut expected = vec![0x09];
        expected.extend_from_slice(&1_705_314_600u64.to_le_bytes());
        expected.extend_from_slice(&[0, 2, 0, 0]);
        assert_eq!(fake.writes(), vec![expected]);
    }

    #[tokio::test(start_paused = true)]
    async fn set_time_truncates_fractional_offsets() {
        let fake = FakeTransport::new().with_status([2, 0, 0, 0, 2]);
        let device = device(&fake);
        let offset = FixedOffset::west_opt(3 * 3600 + 1800).unwrap();
        let value = offset.with_ymd_and_hms(2024, 1, 15, 7, 0, 0).unwrap();

        device.set_time(&value).await.unwrap();

        let written = &fake.writes()[0];
        assert_eq!(written.len(), 13);
        assert_eq!(written[10], (-3i8).to_le_bytes()[0]);
    }

    #[tokio::test(start_paused = true)]
    async fn naive_time_is_sent_as_utc() {
        let fake = FakeTransport::new().with_status([2, 0, 0, 0, 2]);
        let device = device(&fake);
        let value = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();

        device.set_time_naive(value).await.unwrap();

        let written = &fake.writes()[0];
        assert_eq!(&written[1..9], &1_705_314_600u64.to_le_bytes());
        assert_eq!(written[10], 0);
    }

    #[tokio::test(start_paused = true)]
    async fn time_before_epoch_is_rejected() {
        let fake = FakeTransport::new();
        let device = device(&fake);
        let value = NaiveDate::from_ymd_opt(1969, 12, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        let err = device.set_time_naive(value).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Value(ValueError::TimestampBeforeEpoch(_))
        ));
        assert_eq!(fake.connect_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn current_time_is_written() {
        let fake = FakeTransport::new().with_status([2, 0, 0, 0, 2]);
        let device = device(&fake);

        device.set_current_time().await.unwrap();

        let written = &fake.writes()[0];
        assert_eq!(written[0], 0x09);
        assert_eq!(written.len(), 13);
    }

    #[tokio::test(start_paused = true)]
    async fn enable_wifi_ap_sends_opcode() {
        let fake = FakeTransport::new().with_status([2, 0, 0, 0, 2]);
        let device = device(&fake);

        device.enable_wifi_ap().await.unwrap();

        assert_eq!(fake.writes(), vec![vec![0x14]]);
    }
}

// ============================================================================
// Status and polling
// ============================================================================

mod status {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn get_info_returns_none_without_reports() {
        let fake = FakeTransport::new();
        let device = device(&fake);

        assert!(device.get_info().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn get_info_returns_aggregated_status() {
        let fake = FakeTransport::new().with_status([2, 1, 0, 0, 2]);
        let device = device(&fake);

        let status = device.get_info().await.unwrap().unwrap();

        assert_eq!(status.manifold_temperature(), Some(71.25));
        assert_eq!(status.element_on(), Some(1));
        let map = status.to_map();
        assert_eq!(map["AllSwitches"], "0201000002");
        assert_eq!(map["bElementOn"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_is_due_until_first_update() {
        let fake = FakeTransport::new().with_status([2, 0, 0, 0, 2]);
        let device = device(&fake);

        assert!(device.poll_needed(None));
        assert!(device.since_last_update().is_none());

        device.update().await.unwrap();

        assert!(!device.poll_needed(None));
        assert!(!device.poll_needed(Some(120.0)));
        assert!(!device.poll_needed(Some(10.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_is_due_once_interval_has_passed() {
        let fake = FakeTransport::new().with_status([2, 0, 0, 0, 2]);
        let device = device(&fake);
        device.update().await.unwrap();

        tokio::time::sleep(Duration::from_secs(61)).await;

        assert!(device.since_last_update().unwrap() >= Duration::from_secs(61));
        assert!(device.poll_needed(None));
        assert!(device.poll_needed(Some(120.0)));
        // The caller polled recently.
        assert!(!device.poll_needed(Some(10.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn devices_can_share_a_store() {
        let store = Arc::new(StatusStore::new());
        let first = FakeTransport::new().with_status([2, 1, 0, 0, 2]);
        let second = FakeTransport::new().with_status([2, 0, 1, 0, 2]);

        let a = UberSmart::builder(first, device_info())
            .with_status_store(Arc::clone(&store))
            .build();
        let b = UberSmart::builder(second, DeviceInfo::new("11:22:33:44:55:66", "UberSmart_2"))
            .with_status_store(Arc::clone(&store))
            .build();

        a.update().await.unwrap();
        b.update().await.unwrap();

        assert_eq!(store.addresses().len(), 2);
        assert_eq!(a.status().element_on(), Some(1));
        assert_eq!(b.status().pump_on(), Some(1));
    }
}

// ============================================================================
// Callbacks
// ============================================================================

mod callbacks {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn update_fires_on_updated() {
        let fake = FakeTransport::new().with_status([2, 0, 0, 0, 2]);
        let device = device(&fake);
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let id = device.on_updated(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        device.update().await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(device.unsubscribe(id));
        device.update().await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn switch_changes_are_reported() {
        let fake = FakeTransport::new().with_status([2, 0, 0, 0, 2]);
        let device = device(&fake);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        device.on_switches_changed(move |switches| seen_clone.lock().push(switches));

        device.turn_on_element().await.unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(!seen[0].element_on());
        assert!(seen[1].element_on());
    }

    #[tokio::test(start_paused = true)]
    async fn every_frame_reaches_status_subscribers() {
        let fake = FakeTransport::new().with_status([2, 0, 0, 0, 2]);
        let device = device(&fake);
        let tags = Arc::new(Mutex::new(Vec::new()));
        let tags_clone = Arc::clone(&tags);
        device.on_status_changed(move |address, fragment| {
            assert_eq!(address, ADDRESS);
            tags_clone.lock().push(fragment.tag());
        });

        device.update().await.unwrap();

        assert_eq!(*tags.lock(), vec![1, 2]);
    }
}

// ============================================================================
// Response checks
// ============================================================================

mod response {
    use super::*;

    #[test]
    fn check_command_result_matches_expected_byte() {
        let device = device(&FakeTransport::new());

        assert!(device.check_command_result(Some(&[1, 2, 3]), 1, &[2]).unwrap());
        assert!(!device.check_command_result(Some(&[1, 2, 3]), 0, &[2, 3]).unwrap());
    }

    #[test]
    fn check_command_result_reports_missing_response() {
        let device = device(&FakeTransport::new());

        let err = device.check_command_result(None, 0, &[1]).unwrap_err();
        match err {
            Error::OperationResult {
                result,
                index,
                expected,
                rssi,
            } => {
                assert_eq!(result, "None");
                assert_eq!(index, 0);
                assert_eq!(expected, vec![1]);
                assert_eq!(rssi, Some(-60));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn check_command_result_reports_short_response() {
        let device = device(&FakeTransport::new());

        let err = device.check_command_result(Some(&[0x01]), 3, &[1]).unwrap_err();
        assert!(matches!(err, Error::OperationResult { ref result, .. } if result == "01"));
    }
}
