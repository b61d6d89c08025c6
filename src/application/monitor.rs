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

use crate::clock::Clock;
use crate::storage::settings::{ScaleSettings, SettingValue, SettingsAccessor, SettingsAccessorId};
use crate::weight::factory::{build_scale, Platform};
use crate::weight::{check_calibration_weight, Scale};
use crate::Error;
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info, warn};

/// Readings younger than this are served from the scale's last value.
const FRESH_READING_WINDOW_MS: i64 = 5000;
/// Minimum spacing between accepted host requests.
const REQUEST_THROTTLE_MS: i64 = 100;

/// Result of a periodic refresh, ready to be pushed to the host's UI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightUpdate {
    pub weight: f32,
    /// Filament left once the empty spool is subtracted.
    pub remaining: f32,
}

/// Owns the single live scale and bridges it to the host's settings store and request handlers.
///
/// The monitor does not schedule anything itself. The host calls [`ScaleMonitor::poll`] from its
/// repeating timer, using [`ScaleSettings::update_interval`] as the period.
pub struct ScaleMonitor<SA, P, C> {
    settings_accessor: SA,
    platform: P,
    clock: C,
    settings: ScaleSettings,
    scale: Option<Box<dyn Scale>>,
    polling: bool,
    last_request: Option<DateTime<Utc>>,
}

impl<SA, P, C> ScaleMonitor<SA, P, C>
where
    SA: SettingsAccessor,
    P: Platform,
    C: Clock + Clone + 'static,
{
    pub fn start(settings_accessor: SA, mut platform: P, clock: C) -> Result<Self, Error> {
        let settings = ScaleSettings::from_accessor(&settings_accessor);
        info!(
            "Setting up scale, type: [{}], offset: [{}], cal_factor: [{}]",
            settings.scale_type, settings.offset, settings.cal_factor
        );
        let scale = build_scale(&settings, &mut platform, clock.clone())?;
        Ok(Self::with_scale(
            settings_accessor,
            platform,
            clock,
            settings,
            scale,
        ))
    }

    fn with_scale(
        settings_accessor: SA,
        platform: P,
        clock: C,
        settings: ScaleSettings,
        mut scale: Box<dyn Scale>,
    ) -> Self {
        let polling = Self::ready_for_polling(scale.as_mut(), &settings);
        Self {
            settings_accessor,
            platform,
            clock,
            settings,
            scale: Some(scale),
            polling,
            last_request: None,
        }
    }

    fn ready_for_polling(scale: &mut dyn Scale, settings: &ScaleSettings) -> bool {
        if scale.is_ready() {
            info!(
                "{} ready, polling weight every {:?}",
                scale.name(),
                settings.update_interval()
            );
            true
        } else {
            warn!("Scale is not ready, periodic weight updates are disabled");
            false
        }
    }

    pub fn settings(&self) -> &ScaleSettings {
        &self.settings
    }

    pub fn settings_accessor(&self) -> &SA {
        &self.settings_accessor
    }

    /// False when the scale was not ready at start up, in which case `poll` does nothing.
    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn scale(&self) -> Option<&dyn Scale> {
        self.scale.as_deref()
    }

    /// Swap to a scale built from `settings`. The live scale is released first so the two never
    /// hold the same hardware.
    pub fn reconfigure(&mut self, settings: ScaleSettings) -> Result<(), Error> {
        self.release_scale()?;
        info!("Reconfiguring scale, type: [{}]", settings.scale_type);
        let mut scale = build_scale(&settings, &mut self.platform, self.clock.clone())?;
        self.polling = Self::ready_for_polling(scale.as_mut(), &settings);
        self.scale = Some(scale);
        self.settings = settings;
        Ok(())
    }

    /// Periodic refresh. Takes a fresh weight and stores it as the last known weight.
    pub fn poll(&mut self) -> Result<Option<WeightUpdate>, Error> {
        let polling = self.polling;
        let scale = self.scale_mut()?;
        if !polling {
            return Ok(None);
        }
        let weight = scale.get_weight()?;
        debug!("weight: [{}]", weight);

        self.settings.last_known_weight = weight;
        if let Err(e) = self
            .settings_accessor
            .save_setting(SettingsAccessorId::LastKnownWeight, SettingValue::Float(weight))
        {
            warn!("Unable to store last known weight: {:?}", e);
        }

        Ok(Some(WeightUpdate {
            weight,
            remaining: weight - self.settings.spool_weight,
        }))
    }

    /// Weight for a host request. Served from the last reading while it is fresh.
    pub fn weight(&mut self) -> Result<f32, Error> {
        self.accept_request()?;
        let now = self.clock.now();
        let scale = self.scale_mut()?;
        let last = scale.state().last_reading();
        let weight = if now.signed_duration_since(last.time)
            < TimeDelta::milliseconds(FRESH_READING_WINDOW_MS)
        {
            last.value
        } else {
            scale.get_weight()?
        };
        info!("Scale weight: [{}]", weight);
        Ok(weight)
    }

    pub fn tare(&mut self) -> Result<f32, Error> {
        self.accept_request()?;
        info!("Tare started, current offset: [{}]", self.settings.offset);
        let scale = self.scale_mut()?;
        scale.enable()?;
        let offset = scale.tare()?;

        self.settings.offset = offset;
        self.persist(SettingsAccessorId::Offset, SettingValue::Float(offset))?;
        info!("Tare complete, new offset: [{}]", offset);
        Ok(offset)
    }

    pub fn calibrate(&mut self, weight: f32) -> Result<f32, Error> {
        self.accept_request()?;
        check_calibration_weight(weight)?;
        info!(
            "Calibration started, weight: [{}], current cal_factor: [{}]",
            weight, self.settings.cal_factor
        );
        let scale = self.scale_mut()?;
        scale.enable()?;
        let cal_factor = scale.calibrate(weight)?;

        self.settings.cal_factor = cal_factor;
        self.persist(SettingsAccessorId::CalFactor, SettingValue::Float(cal_factor))?;
        info!("Calibration complete, new cal_factor: [{}]", cal_factor);
        Ok(cal_factor)
    }

    pub fn status(&mut self) -> Result<String, Error> {
        self.accept_request()?;
        let status = self.scale_mut()?.status();
        info!("Scale status: [{}]", status);
        Ok(status)
    }

    /// Release the live scale. Later requests fail with [`Error::NoScale`] until reconfigured.
    pub fn shutdown(&mut self) -> Result<(), Error> {
        self.release_scale()
    }

    fn release_scale(&mut self) -> Result<(), Error> {
        self.polling = false;
        match self.scale.take() {
            Some(scale) => {
                info!("Releasing {} scale", scale.name());
                scale.deinit()
            }
            None => Ok(()),
        }
    }

    fn scale_mut(&mut self) -> Result<&mut (dyn Scale + 'static), Error> {
        self.scale.as_deref_mut().ok_or(Error::NoScale)
    }

    fn accept_request(&mut self) -> Result<(), Error> {
        let now = self.clock.now();
        if let Some(last) = self.last_request {
            if now.signed_duration_since(last) < TimeDelta::milliseconds(REQUEST_THROTTLE_MS) {
                warn!("Request rejected, previous one was less than {}ms ago", REQUEST_THROTTLE_MS);
                return Err(Error::RateLimited);
            }
        }
        self.last_request = Some(now);
        Ok(())
    }

    fn persist(&mut self, id: SettingsAccessorId, value: SettingValue) -> Result<(), Error> {
        self.settings_accessor
            .save_setting(id, value)
            .map_err(|e| {
                warn!("Unable to store {}: {:?}", id.key(), e);
                Error::Settings(format!("{}: {:?}", id.key(), e))
            })
    }
}
