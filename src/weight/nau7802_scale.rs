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
use crate::weight::interface::nau7802::Nau7802;
use crate::weight::{
    check_cal_factor, check_calibration_weight, round_weight, Calibration, Scale, ScaleState,
};
use crate::Error;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, warn};

pub const NAU7802_SAMPLE_COUNT: usize = 50;
const STARTUP_SETTLE_MS: u32 = 1000;

/// Scale backed by a NAU7802. Averaging, zero offset and calibration factor all live in the chip
/// driver; this type keeps the shared [`ScaleState`] in step with it.
pub struct Nau7802Scale<I2C, D, C> {
    nau: Nau7802<I2C, D>,
    clock: C,
    state: ScaleState,
}

impl<I2C, D, C> Nau7802Scale<I2C, D, C>
where
    I2C: I2c,
    D: DelayNs,
    C: Clock,
{
    /// Bring the chip up and apply any persisted offset and calibration factor. Values that are
    /// not positive are treated as unset and the driver defaults are kept.
    pub fn new(
        mut nau: Nau7802<I2C, D>,
        mut delay: D,
        clock: C,
        calibration: Calibration,
    ) -> Result<Self, Error> {
        nau.begin()?;
        delay.delay_ms(STARTUP_SETTLE_MS);

        if calibration.offset > 0.0 {
            nau.set_zero_offset(calibration.offset);
        }
        if calibration.cal_factor > 0.0 {
            nau.set_calibration_factor(calibration.cal_factor);
        }

        let calibration = Calibration::new(nau.zero_offset(), nau.calibration_factor());
        debug!(
            "NAU7802 scale ready, offset = {}, cal_factor = {}",
            calibration.offset, calibration.cal_factor
        );
        let state = ScaleState::new(calibration, clock.now());
        Ok(Self { nau, clock, state })
    }

    /// Give the bus back to the caller without powering the chip down.
    pub fn release(self) -> I2C {
        self.nau.release().0
    }
}

impl<I2C, D, C> Scale for Nau7802Scale<I2C, D, C>
where
    I2C: I2c,
    D: DelayNs,
    C: Clock,
{
    fn name(&self) -> &'static str {
        "NAU7802"
    }

    fn state(&self) -> &ScaleState {
        &self.state
    }

    fn is_ready(&mut self) -> bool {
        match self.nau.available() {
            Ok(available) => available,
            Err(e) => {
                warn!("Unable to read NAU7802 status: {:?}", e);
                false
            }
        }
    }

    fn enable(&mut self) -> Result<(), Error> {
        Ok(self.nau.power_up()?)
    }

    fn disable(&mut self) -> Result<(), Error> {
        Ok(self.nau.power_down()?)
    }

    fn reset(&mut self) -> Result<(), Error> {
        // offset and factor are held by the driver, not the chip, so they survive this
        Ok(self.nau.begin()?)
    }

    fn get_weight(&mut self) -> Result<f32, Error> {
        let weight = round_weight(self.nau.weight(false, NAU7802_SAMPLE_COUNT)?);
        self.state.record(weight, self.clock.now());
        debug!("NAU7802 weight = {}", weight);
        Ok(weight)
    }

    fn tare(&mut self) -> Result<f32, Error> {
        self.nau.calculate_zero_offset(NAU7802_SAMPLE_COUNT)?;
        let offset = self.nau.zero_offset();
        self.state.set_offset(offset);
        debug!("NAU7802 tare offset = {}", offset);
        Ok(offset)
    }

    fn calibrate(&mut self, weight: f32) -> Result<f32, Error> {
        check_calibration_weight(weight)?;
        let previous = self.nau.calibration_factor();
        self.nau
            .calculate_calibration_factor(weight, NAU7802_SAMPLE_COUNT)?;

        let cal_factor = self.nau.calibration_factor();
        if let Err(e) = check_cal_factor(cal_factor) {
            self.nau.set_calibration_factor(previous);
            return Err(e);
        }
        self.state.set_cal_factor(cal_factor);
        debug!("NAU7802 calibration factor = {} at {}", cal_factor, weight);
        Ok(cal_factor)
    }

    fn status(&mut self) -> String {
        let is_ready = self.is_ready();
        self.state.describe(self.name(), is_ready, self.clock.now())
    }

    fn deinit(mut self: Box<Self>) -> Result<(), Error> {
        self.nau.power_down()?;
        debug!("NAU7802 released");
        Ok(())
    }
}
