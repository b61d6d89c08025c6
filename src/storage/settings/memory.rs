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

use super::{ScaleSettings, SettingValue, SettingsAccessor, SettingsAccessorId};
use core::convert::Infallible;
use log::warn;
use std::collections::HashMap;

/// Settings held in memory, keyed the same way as the host's settings store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySettings {
    values: HashMap<SettingsAccessorId, SettingValue>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: SettingsAccessorId, value: SettingValue) -> Self {
        self.values.insert(id, value);
        self
    }

    /// Build from host key/value pairs. Unknown keys are skipped.
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, SettingValue)>,
    {
        let mut values = HashMap::new();
        for (key, value) in pairs {
            match key.as_ref().parse::<SettingsAccessorId>() {
                Ok(id) => {
                    values.insert(id, value);
                }
                Err(_) => warn!("Ignoring unknown setting {}", key.as_ref()),
            }
        }
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<&ScaleSettings> for MemorySettings {
    fn from(settings: &ScaleSettings) -> Self {
        Self::new()
            .with(
                SettingsAccessorId::ScaleType,
                SettingValue::Text(settings.scale_type.clone()),
            )
            .with(SettingsAccessorId::Offset, SettingValue::Float(settings.offset))
            .with(
                SettingsAccessorId::CalFactor,
                SettingValue::Float(settings.cal_factor),
            )
            .with(
                SettingsAccessorId::HxClockPin,
                SettingValue::Int(settings.hx_clock_pin.into()),
            )
            .with(
                SettingsAccessorId::HxDataPin,
                SettingValue::Int(settings.hx_data_pin.into()),
            )
            .with(
                SettingsAccessorId::NauBusId,
                SettingValue::Int(settings.nau_bus_id.into()),
            )
            .with(
                SettingsAccessorId::LastKnownWeight,
                SettingValue::Float(settings.last_known_weight),
            )
            .with(
                SettingsAccessorId::SpoolWeight,
                SettingValue::Float(settings.spool_weight),
            )
            .with(
                SettingsAccessorId::UpdateDelay,
                SettingValue::Float(settings.update_delay),
            )
    }
}

impl SettingsAccessor for MemorySettings {
    type Error = Infallible;

    fn get_setting(&self, id: SettingsAccessorId) -> Option<SettingValue> {
        self.values.get(&id).cloned()
    }

    fn save_setting(
        &mut self,
        id: SettingsAccessorId,
        value: SettingValue,
    ) -> Result<(), Self::Error> {
        self.values.insert(id, value);
        Ok(())
    }
}
