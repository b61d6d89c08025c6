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

pub mod factory;
pub(crate) mod filter;
pub mod hx711_scale;
pub mod interface;
pub mod nau7802_scale;
pub mod none_scale;

use crate::Error;
use chrono::{DateTime, Utc};

pub const DEFAULT_OFFSET: f32 = 0.0;
pub const DEFAULT_CAL_FACTOR: f32 = 1.0;

/// Tare point and scaling used to turn raw ADC counts into a weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub offset: f32,
    pub cal_factor: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            offset: DEFAULT_OFFSET,
            cal_factor: DEFAULT_CAL_FACTOR,
        }
    }
}

impl Calibration {
    pub fn new(offset: f32, cal_factor: f32) -> Self {
        Self { offset, cal_factor }
    }

    pub fn weight_from_raw(&self, raw: f32) -> f32 {
        (raw - self.offset) / self.cal_factor
    }

    /// Derives the factor that maps `raw` to `weight` with the current offset. Fails rather than
    /// produce a factor that would later be divided by.
    pub fn factor_for(&self, raw: f32, weight: f32) -> Result<f32, Error> {
        check_calibration_weight(weight)?;
        let cal_factor = (raw - self.offset) / weight;
        check_cal_factor(cal_factor)?;
        Ok(cal_factor)
    }
}

pub(crate) fn check_calibration_weight(weight: f32) -> Result<(), Error> {
    if weight > 0.0 && weight.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidCalibrationWeight(weight))
    }
}

pub(crate) fn check_cal_factor(cal_factor: f32) -> Result<(), Error> {
    if cal_factor != 0.0 && cal_factor.is_finite() {
        Ok(())
    } else {
        Err(Error::CalibrationFailed(cal_factor))
    }
}

/// A computed weight and the moment it was taken. Always replaced as a whole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub value: f32,
    pub time: DateTime<Utc>,
}

/// State shared by every backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleState {
    calibration: Calibration,
    last: Reading,
}

impl ScaleState {
    pub fn new(calibration: Calibration, now: DateTime<Utc>) -> Self {
        Self {
            calibration,
            last: Reading {
                value: 0.0,
                time: now,
            },
        }
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    pub fn offset(&self) -> f32 {
        self.calibration.offset
    }

    pub fn cal_factor(&self) -> f32 {
        self.calibration.cal_factor
    }

    pub fn last_reading(&self) -> Reading {
        self.last
    }

    pub(crate) fn set_offset(&mut self, offset: f32) {
        self.calibration.offset = offset;
    }

    pub(crate) fn set_cal_factor(&mut self, cal_factor: f32) {
        self.calibration.cal_factor = cal_factor;
    }

    pub(crate) fn record(&mut self, value: f32, time: DateTime<Utc>) -> f32 {
        self.last = Reading { value, time };
        value
    }

    pub(crate) fn describe(&self, chip: &str, is_ready: bool, now: DateTime<Utc>) -> String {
        let age = now.signed_duration_since(self.last.time);
        format!(
            "{} status, offset: [{}], cal_factor: [{}], is_ready: [{}], last_value: [{}], last_value_time: [{}], time since last_value_time: [{:.3}s]",
            chip,
            self.calibration.offset,
            self.calibration.cal_factor,
            is_ready,
            self.last.value,
            self.last.time.to_rfc3339(),
            age.num_milliseconds() as f64 / 1000.0,
        )
    }
}

/// Rounds a weight to the single decimal place reported to the host.
pub fn round_weight(weight: f32) -> f32 {
    (weight * 10.0).round() / 10.0
}

/// Operations every scale backend offers to the host.
pub trait Scale {
    /// Short chip name used in status output.
    fn name(&self) -> &'static str;

    fn state(&self) -> &ScaleState;

    /// True when the backend is initialised and can be read. Bus faults are reported as not ready.
    fn is_ready(&mut self) -> bool;

    fn enable(&mut self) -> Result<(), Error>;

    fn disable(&mut self) -> Result<(), Error>;

    /// Re-initialise the hardware link. Offset and calibration factor are kept.
    fn reset(&mut self) -> Result<(), Error>;

    /// Take a fresh measurement and record it as the last value.
    fn get_weight(&mut self) -> Result<f32, Error>;

    /// Capture the current raw reading as the zero point and return it.
    fn tare(&mut self) -> Result<f32, Error>;

    /// Derive the calibration factor from a known `weight` currently on the scale.
    fn calibrate(&mut self, weight: f32) -> Result<f32, Error>;

    fn status(&mut self) -> String;

    /// Power down and release the hardware. The scale is consumed.
    fn deinit(self: Box<Self>) -> Result<(), Error>;
}
