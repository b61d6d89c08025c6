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
use crate::weight::{Calibration, Scale, ScaleState};
use crate::Error;

/// Placeholder used when no load cell is fitted. Never touches hardware.
pub struct NoneScale<C> {
    clock: C,
    state: ScaleState,
    ready: bool,
}

impl<C: Clock> NoneScale<C> {
    pub fn new(clock: C, calibration: Calibration) -> Self {
        let state = ScaleState::new(calibration, clock.now());
        Self {
            clock,
            state,
            ready: true,
        }
    }
}

impl<C: Clock> Scale for NoneScale<C> {
    fn name(&self) -> &'static str {
        "NoneScale"
    }

    fn state(&self) -> &ScaleState {
        &self.state
    }

    fn is_ready(&mut self) -> bool {
        self.ready
    }

    fn enable(&mut self) -> Result<(), Error> {
        self.ready = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<(), Error> {
        self.ready = false;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn get_weight(&mut self) -> Result<f32, Error> {
        Ok(self.state.last_reading().value)
    }

    fn tare(&mut self) -> Result<f32, Error> {
        Ok(self.state.offset())
    }

    fn calibrate(&mut self, _weight: f32) -> Result<f32, Error> {
        Ok(self.state.cal_factor())
    }

    fn status(&mut self) -> String {
        self.state.describe(self.name(), self.ready, self.clock.now())
    }

    fn deinit(self: Box<Self>) -> Result<(), Error> {
        Ok(())
    }
}
