// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::weight::Calibration;
use core::fmt::Debug;
use core::time::Duration;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

mod memory;

pub use memory::MemorySettings;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SettingsAccessorId {
    #[strum(to_string = "scale_type", serialize = "chip")]
    ScaleType,
    Offset,
    CalFactor,
    #[strum(to_string = "hx_clockpin")]
    HxClockPin,
    #[strum(to_string = "hx_datapin")]
    HxDataPin,
    NauBusId,
    LastKnownWeight,
    SpoolWeight,
    UpdateDelay,
}

impl SettingsAccessorId {
    /// Key the host stores this setting under.
    pub fn key(&self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Int(i64),
    Float(f32),
    Text(String),
}

impl SettingValue {
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            SettingValue::Int(v) => Some(*v as f32),
            SettingValue::Float(v) => Some(*v),
            SettingValue::Text(v) => v.trim().parse().ok(),
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            SettingValue::Int(v) => u32::try_from(*v).ok(),
            SettingValue::Float(v) if v.fract() == 0.0 && *v >= 0.0 && *v <= u32::MAX as f32 => {
                Some(*v as u32)
            }
            SettingValue::Float(_) => None,
            SettingValue::Text(v) => v.trim().parse().ok(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

pub trait SettingsAccessor {
    type Error: Debug;

    /// Getting required setting from the settings storage. Will return None if it is not available
    /// in the storage.
    fn get_setting(&self, id: SettingsAccessorId) -> Option<SettingValue>;

    /// Save setting value to the settings storage. Will pass back a storage error if it is unable
    /// to complete the save action.
    fn save_setting(
        &mut self,
        id: SettingsAccessorId,
        value: SettingValue,
    ) -> Result<(), Self::Error>;
}

/// Everything needed to build a scale and run the periodic weight updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleSettings {
    #[serde(alias = "chip")]
    pub scale_type: String,
    pub offset: f32,
    pub cal_factor: f32,
    #[serde(rename = "hx_clockpin")]
    pub hx_clock_pin: u32,
    #[serde(rename = "hx_datapin")]
    pub hx_data_pin: u32,
    pub nau_bus_id: u32,
    pub last_known_weight: f32,
    pub spool_weight: f32,
    /// Seconds between periodic weight updates.
    pub update_delay: f32,
}

impl Default for ScaleSettings {
    fn default() -> Self {
        Self {
            scale_type: "nau7802".into(),
            offset: 0.0,
            cal_factor: 1.0,
            hx_clock_pin: 21,
            hx_data_pin: 20,
            nau_bus_id: 1,
            last_known_weight: 0.0,
            spool_weight: 200.0,
            update_delay: 3.0,
        }
    }
}

impl ScaleSettings {
    /// Resolve every setting from the accessor. Missing or malformed values fall back to the
    /// defaults.
    pub fn from_accessor<SA: SettingsAccessor>(settings: &SA) -> Self {
        let defaults = Self::default();
        Self {
            scale_type: text_setting(settings, SettingsAccessorId::ScaleType, defaults.scale_type),
            offset: float_setting(settings, SettingsAccessorId::Offset, defaults.offset),
            cal_factor: float_setting(settings, SettingsAccessorId::CalFactor, defaults.cal_factor),
            hx_clock_pin: uint_setting(
                settings,
                SettingsAccessorId::HxClockPin,
                defaults.hx_clock_pin,
            ),
            hx_data_pin: uint_setting(settings, SettingsAccessorId::HxDataPin, defaults.hx_data_pin),
            nau_bus_id: uint_setting(settings, SettingsAccessorId::NauBusId, defaults.nau_bus_id),
            last_known_weight: float_setting(
                settings,
                SettingsAccessorId::LastKnownWeight,
                defaults.last_known_weight,
            ),
            spool_weight: float_setting(
                settings,
                SettingsAccessorId::SpoolWeight,
                defaults.spool_weight,
            ),
            update_delay: float_setting(
                settings,
                SettingsAccessorId::UpdateDelay,
                defaults.update_delay,
            ),
        }
    }

    pub fn calibration(&self) -> Calibration {
        Calibration::new(self.offset, self.cal_factor)
    }

    /// Interval for the host's repeating timer. Non-positive delays are clamped to zero.
    pub fn update_interval(&self) -> Duration {
        Duration::try_from_secs_f32(self.update_delay).unwrap_or(Duration::ZERO)
    }
}

fn float_setting<SA: SettingsAccessor>(settings: &SA, id: SettingsAccessorId, default: f32) -> f32 {
    match settings.get_setting(id) {
        Some(value) => value.as_f32().unwrap_or_else(|| {
            warn!("Setting {} has unusable value {:?}, using {}", id.key(), value, default);
            default
        }),
        None => {
            debug!("Setting {} not stored, using {}", id.key(), default);
            default
        }
    }
}

fn uint_setting<SA: SettingsAccessor>(settings: &SA, id: SettingsAccessorId, default: u32) -> u32 {
    match settings.get_setting(id) {
        Some(value) => value.as_u32().unwrap_or_else(|| {
            warn!("Setting {} has unusable value {:?}, using {}", id.key(), value, default);
            default
        }),
        None => {
            debug!("Setting {} not stored, using {}", id.key(), default);
            default
        }
    }
}

fn text_setting<SA: SettingsAccessor>(
    settings: &SA,
    id: SettingsAccessorId,
    default: String,
) -> String {
    match settings.get_setting(id) {
        Some(SettingValue::Text(value)) => value,
        Some(value) => {
            warn!("Setting {} has unusable value {:?}, using {}", id.key(), value, default);
            default
        }
        None => {
            debug!("Setting {} not stored, using {}", id.key(), default);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_match_host_settings() {
        assert_eq!(SettingsAccessorId::ScaleType.key(), "scale_type");
        assert_eq!(SettingsAccessorId::HxClockPin.key(), "hx_clockpin");
        assert_eq!(SettingsAccessorId::NauBusId.key(), "nau_bus_id");
        assert_eq!(SettingsAccessorId::LastKnownWeight.key(), "last_known_weight");
        assert_eq!("chip".parse(), Ok(SettingsAccessorId::ScaleType));
        assert_eq!("cal_factor".parse(), Ok(SettingsAccessorId::CalFactor));
        assert!("colour".parse::<SettingsAccessorId>().is_err());
    }

    #[test]
    fn value_conversions() {
        assert_eq!(SettingValue::Int(21).as_u32(), Some(21));
        assert_eq!(SettingValue::Int(-1).as_u32(), None);
        assert_eq!(SettingValue::Float(20.0).as_u32(), Some(20));
        assert_eq!(SettingValue::Float(20.5).as_u32(), None);
        assert_eq!(SettingValue::Text(" 1.5 ".into()).as_f32(), Some(1.5));
        assert_eq!(SettingValue::Int(3).as_f32(), Some(3.0));
        assert_eq!(SettingValue::Float(3.0).as_str(), None);
    }

    #[test]
    fn missing_settings_use_defaults() {
        let settings = ScaleSettings::from_accessor(&MemorySettings::new());
        assert_eq!(settings, ScaleSettings::default());
        assert_eq!(settings.calibration(), Calibration::new(0.0, 1.0));
        assert_eq!(settings.update_interval(), Duration::from_secs(3));
    }

    #[test]
    fn stored_settings_override_defaults() {
        let store = MemorySettings::new()
            .with(SettingsAccessorId::ScaleType, SettingValue::Text("rpi_hx711".into()))
            .with(SettingsAccessorId::Offset, SettingValue::Float(8123.5))
            .with(SettingsAccessorId::CalFactor, SettingValue::Int(-420))
            .with(SettingsAccessorId::HxClockPin, SettingValue::Text("5".into()))
            .with(SettingsAccessorId::HxDataPin, SettingValue::Float(6.0))
            .with(SettingsAccessorId::SpoolWeight, SettingValue::Text("heavy".into()));
        let settings = ScaleSettings::from_accessor(&store);

        assert_eq!(settings.scale_type, "rpi_hx711");
        assert_eq!(settings.calibration(), Calibration::new(8123.5, -420.0));
        assert_eq!(settings.hx_clock_pin, 5);
        assert_eq!(settings.hx_data_pin, 6);
        assert_eq!(settings.spool_weight, 200.0);
    }

    #[test]
    fn deserialises_host_json() {
        let json = r#"{"chip": "none", "offset": 12.5, "cal_factor": 2, "hx_clockpin": 4}"#;
        let settings: ScaleSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.scale_type, "none");
        assert_eq!(settings.offset, 12.5);
        assert_eq!(settings.cal_factor, 2.0);
        assert_eq!(settings.hx_clock_pin, 4);
        assert_eq!(settings.nau_bus_id, 1);
        assert_eq!(settings.update_delay, 3.0);
    }

    #[test]
    fn update_interval_clamps_negative_delay() {
        let settings = ScaleSettings {
            update_delay: -1.0,
            ..ScaleSettings::default()
        };
        assert_eq!(settings.update_interval(), Duration::ZERO);
    }
}
