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
use crate::weight::filter::mean_without_outliers;
use crate::weight::interface::StrainGaugeInterface;
use crate::weight::{check_calibration_weight, round_weight, Calibration, Scale, ScaleState};
use crate::Error;
use embedded_hal::delay::DelayNs;
use heapless::Vec;
use log::{debug, trace};

pub const HX711_SAMPLE_COUNT: usize = 20;
const SETTLE_DELAY_MS: u32 = 10;

/// Scale backed by a raw strain gauge ADC such as the HX711. Batches of readings are filtered for
/// outliers in software.
///
/// Only `get_weight` power cycles the gauge. `tare` and `calibrate` expect it to have been enabled
/// and fail with [`Error::NotReady`] otherwise.
pub struct Hx711Scale<G, D, C> {
    gauge: G,
    delay: D,
    clock: C,
    state: ScaleState,
    ready: bool,
}

impl<G, D, C> Hx711Scale<G, D, C>
where
    G: StrainGaugeInterface,
    Error: From<G::Error>,
    D: DelayNs,
    C: Clock,
{
    pub fn new(mut gauge: G, delay: D, clock: C, calibration: Calibration) -> Result<Self, Error> {
        gauge.initialize()?;
        let state = ScaleState::new(calibration, clock.now());
        debug!(
            "HX711 scale ready, offset = {}, cal_factor = {}",
            calibration.offset, calibration.cal_factor
        );
        Ok(Self {
            gauge,
            delay,
            clock,
            state,
            ready: true,
        })
    }

    /// Give the gauge back to the caller without powering it down.
    pub fn release(self) -> G {
        self.gauge
    }

    fn read_raw_mean(&mut self) -> Result<f32, Error> {
        let batch = (0..HX711_SAMPLE_COUNT)
            .map(|_| self.gauge.get_next_reading().map(|raw| raw as f32))
            .collect::<Result<Vec<f32, HX711_SAMPLE_COUNT>, _>>()?;
        let raw_mean = mean_without_outliers(&batch)?;
        trace!("HX711 filtered raw mean = {}", raw_mean);
        Ok(raw_mean)
    }

    fn ensure_ready(&self) -> Result<(), Error> {
        if self.ready {
            Ok(())
        } else {
            Err(Error::NotReady)
        }
    }
}

impl<G, D, C> Scale for Hx711Scale<G, D, C>
where
    G: StrainGaugeInterface,
    Error: From<G::Error>,
    D: DelayNs,
    C: Clock,
{
    fn name(&self) -> &'static str {
        "HX711"
    }

    fn state(&self) -> &ScaleState {
        &self.state
    }

    fn is_ready(&mut self) -> bool {
        self.ready
    }

    fn enable(&mut self) -> Result<(), Error> {
        self.gauge.power_up()?;
        self.ready = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<(), Error> {
        self.gauge.power_down()?;
        self.ready = false;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), Error> {
        self.gauge.reset()?;
        self.ready = true;
        Ok(())
    }

    fn get_weight(&mut self) -> Result<f32, Error> {
        self.enable()?;
        self.delay.delay_ms(SETTLE_DELAY_MS);
        let raw_mean = self.read_raw_mean();
        // power down even when the read failed
        self.delay.delay_ms(SETTLE_DELAY_MS);
        self.disable()?;

        let weight = round_weight(self.state.calibration().weight_from_raw(raw_mean?));
        self.state.record(weight, self.clock.now());
        debug!("HX711 weight = {}", weight);
        Ok(weight)
    }

    fn tare(&mut self) -> Result<f32, Error> {
        self.ensure_ready()?;
        let offset = self.read_raw_mean()?;
        self.state.set_offset(offset);
        debug!("HX711 tare offset = {}", offset);
        Ok(offset)
    }

    fn calibrate(&mut self, weight: f32) -> Result<f32, Error> {
        check_calibration_weight(weight)?;
        self.ensure_ready()?;
        let raw_mean = self.read_raw_mean()?;
        let cal_factor = self.state.calibration().factor_for(raw_mean, weight)?;
        self.state.set_cal_factor(cal_factor);
        debug!("HX711 calibration factor = {} at {}", cal_factor, weight);
        Ok(cal_factor)
    }

    fn status(&mut self) -> String {
        self.state.describe(self.name(), self.ready, self.clock.now())
    }

    fn deinit(mut self: Box<Self>) -> Result<(), Error> {
        self.gauge.power_down()?;
        debug!("HX711 released");
        Ok(())
    }
}
