// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Aggregated device status.

use chrono::DateTime;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::command::encode_hex;
use crate::types::{SolenoidMode, Switches};

use super::StatusFragment;

/// Last known status of an `UberSmart` device.
///
/// Every field is optional because each one only becomes known once the
/// frame carrying it has been received. Fragments are merged with
/// [`apply`](Self::apply); a fragment only overwrites its own fields, so a
/// value stays readable until a newer frame of the same tag replaces it.
///
/// # Examples
///
/// ```
/// use ubersolar_lib::state::{DeviceStatus, StatusFragment};
///
/// let mut status = DeviceStatus::new();
/// status.apply(&StatusFragment::Faults { panel: 0, element: 3, pump: 0, solenoid: 0 });
///
/// assert_eq!(status.element_fault_code(), Some(3));
/// assert!(status.water_temperature().is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceStatus {
    water_temperature: Option<f32>,
    manifold_temperature: Option<f32>,
    stored_water: Option<f32>,
    element_on: Option<u8>,
    pump_on: Option<u8>,
    holiday_mode: Option<u8>,
    solenoid_mode: Option<u8>,
    solenoid_state: Option<f32>,
    all_switches: Option<Switches>,
    device_time: Option<u64>,
    runtime_hours: Option<f32>,
    light_level: Option<u16>,
    rssi: Option<i16>,
    panel_voltage: Option<f32>,
    chip_temperature: Option<f32>,
    water_level: Option<f32>,
    tank_size: Option<f32>,
    panel_fault_code: Option<u8>,
    element_fault_code: Option<u8>,
    pump_fault_code: Option<u8>,
    solenoid_fault_code: Option<u8>,
}

impl DeviceStatus {
    /// Creates an empty status.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no frame has been merged yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    // ========== Tag 1 ==========

    /// Tank water temperature.
    #[must_use]
    pub fn water_temperature(&self) -> Option<f32> {
        self.water_temperature
    }

    /// Collector manifold temperature.
    #[must_use]
    pub fn manifold_temperature(&self) -> Option<f32> {
        self.manifold_temperature
    }

    /// Stored hot water metric.
    #[must_use]
    pub fn stored_water(&self) -> Option<f32> {
        self.stored_water
    }

    // ========== Tag 2 ==========

    /// Heating element state byte.
    #[must_use]
    pub fn element_on(&self) -> Option<u8> {
        self.element_on
    }

    /// Pump state byte.
    #[must_use]
    pub fn pump_on(&self) -> Option<u8> {
        self.pump_on
    }

    /// Holiday mode state byte.
    #[must_use]
    pub fn holiday_mode(&self) -> Option<u8> {
        self.holiday_mode
    }

    /// Raw solenoid mode byte.
    #[must_use]
    pub fn solenoid_mode_raw(&self) -> Option<u8> {
        self.solenoid_mode
    }

    /// Solenoid mode, if known and valid.
    #[must_use]
    pub fn solenoid_mode(&self) -> Option<SolenoidMode> {
        self.solenoid_mode
            .and_then(|raw| SolenoidMode::try_from(raw).ok())
    }

    /// Analog solenoid state.
    #[must_use]
    pub fn solenoid_state(&self) -> Option<f32> {
        self.solenoid_state
    }

    /// The raw `AllSwitches` buffer from the last tag-2 frame.
    #[must_use]
    pub fn all_switches(&self) -> Option<Switches> {
        self.all_switches
    }

    // ========== Tag 3 ==========

    /// Device clock as a Unix timestamp.
    #[must_use]
    pub fn device_time(&self) -> Option<u64> {
        self.device_time
    }

    /// Accumulated runtime in hours.
    #[must_use]
    pub fn runtime_hours(&self) -> Option<f32> {
        self.runtime_hours
    }

    /// Ambient light level.
    #[must_use]
    pub fn light_level(&self) -> Option<u16> {
        self.light_level
    }

    // ========== Tag 4 ==========

    /// Signal strength reported by the device.
    #[must_use]
    pub fn rssi(&self) -> Option<i16> {
        self.rssi
    }

    /// Solar panel voltage.
    #[must_use]
    pub fn panel_voltage(&self) -> Option<f32> {
        self.panel_voltage
    }

    /// Controller chip temperature.
    #[must_use]
    pub fn chip_temperature(&self) -> Option<f32> {
        self.chip_temperature
    }

    /// Water level.
    #[must_use]
    pub fn water_level(&self) -> Option<f32> {
        self.water_level
    }

    /// Configured tank size.
    #[must_use]
    pub fn tank_size(&self) -> Option<f32> {
        self.tank_size
    }

    // ========== Tag 5 ==========

    /// Panel fault code.
    #[must_use]
    pub fn panel_fault_code(&self) -> Option<u8> {
        self.panel_fault_code
    }

    /// Element fault code.
    #[must_use]
    pub fn element_fault_code(&self) -> Option<u8> {
        self.element_fault_code
    }

    /// Pump fault code.
    #[must_use]
    pub fn pump_fault_code(&self) -> Option<u8> {
        self.pump_fault_code
    }

    /// Solenoid fault code.
    #[must_use]
    pub fn solenoid_fault_code(&self) -> Option<u8> {
        self.solenoid_fault_code
    }

    // ========== Merging ==========

    /// Merges a fragment and returns whether any field changed.
    ///
    /// Fields not carried by the fragment are left untouched.
    pub fn apply(&mut self, fragment: &StatusFragment) -> bool {
        let mut changed = false;

        macro_rules! update_field {
            ($field:ident, $value:expr) => {
                if self.$field != Some($value) {
                    self.$field = Some($value);
                    changed = true;
                }
            };
        }

        match fragment {
            StatusFragment::Temperatures {
                water_temperature,
                manifold_temperature,
                stored_water,
            } => {
                update_field!(water_temperature, *water_temperature);
                update_field!(manifold_temperature, *manifold_temperature);
                update_field!(stored_water, *stored_water);
            }
            StatusFragment::Switches {
                element_on,
                pump_on,
                holiday_mode,
                solenoid_mode,
                solenoid_state,
                all_switches,
            } => {
                update_field!(element_on, *element_on);
                update_field!(pump_on, *pump_on);
                update_field!(holiday_mode, *holiday_mode);
                update_field!(solenoid_mode, *solenoid_mode);
                update_field!(solenoid_state, *solenoid_state);
                update_field!(all_switches, *all_switches);
            }
            StatusFragment::Runtime {
                device_time,
                runtime_hours,
                light_level,
            } => {
                update_field!(device_time, *device_time);
                update_field!(runtime_hours, *runtime_hours);
                update_field!(light_level, *light_level);
            }
            StatusFragment::Diagnostics {
                rssi,
                panel_voltage,
                chip_temperature,
                water_level,
                tank_size,
            } => {
                update_field!(rssi, *rssi);
                update_field!(panel_voltage, *panel_voltage);
                update_field!(chip_temperature, *chip_temperature);
                update_field!(water_level, *water_level);
                update_field!(tank_size, *tank_size);
            }
            StatusFragment::Faults {
                panel,
                element,
                pump,
                solenoid,
            } => {
                update_field!(panel_fault_code, *panel);
                update_field!(element_fault_code, *element);
                update_field!(pump_fault_code, *pump);
                update_field!(solenoid_fault_code, *solenoid);
            }
            StatusFragment::Unknown(_) => {}
        }

        changed
    }

    /// Records a switch buffer that was written to the device.
    ///
    /// The four switch fields and `AllSwitches` take the written values;
    /// the marker byte of a previously reported buffer is kept.
    pub fn record_switches(&mut self, switches: Switches) {
        let marker = self.all_switches.map_or(2, |s| s.as_bytes()[0]);
        let [element, pump, holiday, solenoid] = switches.fields();
        self.element_on = Some(element);
        self.pump_on = Some(pump);
        self.holiday_mode = Some(holiday);
        self.solenoid_mode = Some(solenoid);
        self.all_switches = Some(Switches::from_bytes([marker, element, pump, holiday, solenoid]));
    }

    /// Clears all fields.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    // ========== Export ==========

    /// Exports the known fields under the controller's own field names.
    ///
    /// Floats are rounded to two decimals, `AllSwitches` is rendered as hex
    /// and `lluTime` as `%Y-%m-%d %H:%M:%S` in UTC. Unknown fields are
    /// omitted.
    ///
    /// # Examples
    ///
    /// ```
    /// use ubersolar_lib::state::{DeviceStatus, StatusFragment};
    ///
    /// let mut status = DeviceStatus::new();
    /// status.apply(&StatusFragment::Temperatures {
    ///     water_temperature: 55.123,
    ///     manifold_temperature: 80.0,
    ///     stored_water: 1.5,
    /// });
    ///
    /// let map = status.to_map();
    /// assert_eq!(map["fWaterTemperature"], 55.12);
    /// assert!(map.get("bElementOn").is_none());
    /// ```
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();

        let mut put_float = |key: &str, value: Option<f32>| {
            if let Some(v) = value {
                map.insert(key.to_string(), Value::from(round2(v)));
            }
        };
        put_float("fWaterTemperature", self.water_temperature);
        put_float("fManifoldTemperature", self.manifold_temperature);
        put_float("fStoredWater", self.stored_water);
        put_float("fSolenoidState", self.solenoid_state);
        put_float("fHours", self.runtime_hours);
        put_float("fPanelVoltage", self.panel_voltage);
        put_float("fChipTemp", self.chip_temperature);
        put_float("fWaterLevel", self.water_level);
        put_float("fTankSize", self.tank_size);

        let mut put_int = |key: &str, value: Option<i64>| {
            if let Some(v) = value {
                map.insert(key.to_string(), Value::from(v));
            }
        };
        put_int("bElementOn", self.element_on.map(i64::from));
        put_int("bPumpOn", self.pump_on.map(i64::from));
        put_int("bHolidayMode", self.holiday_mode.map(i64::from));
        put_int("eSolenoidMode", self.solenoid_mode.map(i64::from));
        put_int("wLux", self.light_level.map(i64::from));
        put_int("wRSSI", self.rssi.map(i64::from));
        put_int("bPanelFaultCode", self.panel_fault_code.map(i64::from));
        put_int("bElementFaultCode", self.element_fault_code.map(i64::from));
        // Key spelling matches what existing consumers read.
        put_int("bPumpFultCode", self.pump_fault_code.map(i64::from));
        put_int("bSolenoidFaultCode", self.solenoid_fault_code.map(i64::from));

        if let Some(switches) = self.all_switches {
            map.insert(
                "AllSwitches".to_string(),
                Value::from(encode_hex(switches.as_bytes())),
            );
        }
        if let Some(time) = self
            .device_time
            .and_then(|t| i64::try_from(t).ok())
            .and_then(|t| DateTime::from_timestamp(t, 0))
        {
            map.insert(
                "lluTime".to_string(),
                Value::from(time.format("%Y-%m-%d %H:%M:%S").to_string()),
            );
        }

        map
    }
}

fn round2(value: f32) -> f64 {
    (f64::from(value) * 100.0).round() / 100.0
}
