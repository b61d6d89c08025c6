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

//! Load cell scale backends for weighing a filament spool.
//!
//! A [`Scale`] is built from [`ScaleSettings`] by [`build_scale`], using a [`Platform`] to
//! open the GPIO lines or I2C bus it needs. [`ScaleMonitor`] wraps the live scale for a host
//! that polls it on a timer and persists tare and calibration results.

pub mod application;
pub mod clock;
mod error;
pub mod platform;
pub mod storage;
pub mod weight;

#[cfg(test)]
mod testing;

pub use application::monitor::{ScaleMonitor, WeightUpdate};
pub use clock::{Clock, SystemClock};
pub use error::Error;
pub use storage::settings::{MemorySettings, ScaleSettings, SettingValue, SettingsAccessor};
pub use weight::factory::{build_scale, Platform, ScaleType};
pub use weight::{Calibration, Reading, Scale, ScaleState};
