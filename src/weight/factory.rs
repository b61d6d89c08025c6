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
use crate::storage::settings::ScaleSettings;
use crate::weight::hx711_scale::Hx711Scale;
use crate::weight::interface::hx711::{Hx711, Hx711Gain};
use crate::weight::interface::nau7802::Nau7802;
use crate::weight::nau7802_scale::Nau7802Scale;
use crate::weight::none_scale::NoneScale;
use crate::weight::{check_cal_factor, Scale};
use crate::Error;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::i2c::I2c;
use log::info;
use strum::{Display, EnumString};

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumString, Display)]
pub enum ScaleType {
    #[strum(to_string = "rpi_hx711", serialize = "hx711")]
    RpiHx711,
    #[strum(serialize = "nau7802")]
    Nau7802,
    #[strum(serialize = "none")]
    None,
}

/// Source of the pins, buses and delays a scale backend is built from.
pub trait Platform {
    type ClockPin: OutputPin + 'static;
    type DataPin: InputPin + 'static;
    type I2c: I2c + 'static;
    type Delay: DelayNs + 'static;

    fn clock_pin(&mut self, pin: u32) -> Result<Self::ClockPin, Error>;
    fn data_pin(&mut self, pin: u32) -> Result<Self::DataPin, Error>;
    fn i2c_bus(&mut self, bus_id: u32) -> Result<Self::I2c, Error>;
    fn delay(&mut self) -> Self::Delay;
}

/// Build the backend named by `settings.scale_type`. The type and calibration are checked before
/// any hardware is requested from the platform.
pub fn build_scale<P, C>(
    settings: &ScaleSettings,
    platform: &mut P,
    clock: C,
) -> Result<Box<dyn Scale>, Error>
where
    P: Platform,
    C: Clock + 'static,
{
    let scale_type: ScaleType = settings.scale_type.parse().map_err(|_| {
        Error::InvalidConfiguration(format!("unknown scale type '{}'", settings.scale_type))
    })?;
    let calibration = settings.calibration();

    if !calibration.offset.is_finite() {
        return Err(Error::InvalidConfiguration(format!(
            "offset must be a finite number, got {}",
            calibration.offset
        )));
    }
    // the NAU7802 treats a non-positive factor as unset, the other backends divide by it
    let cal_factor_check = match scale_type {
        ScaleType::Nau7802 if calibration.cal_factor.is_finite() => Ok(()),
        _ => check_cal_factor(calibration.cal_factor),
    };
    cal_factor_check.map_err(|_| {
        Error::InvalidConfiguration(format!(
            "cal_factor {} is not usable for {}",
            calibration.cal_factor, scale_type
        ))
    })?;

    info!("Building {} scale", scale_type);
    let scale: Box<dyn Scale> = match scale_type {
        ScaleType::RpiHx711 => {
            let clock_pin = platform.clock_pin(settings.hx_clock_pin)?;
            let data_pin = platform.data_pin(settings.hx_data_pin)?;
            let hx711 = Hx711::new(clock_pin, data_pin, platform.delay(), Hx711Gain::Gain128);
            Box::new(Hx711Scale::new(
                hx711,
                platform.delay(),
                clock,
                calibration,
            )?)
        }
        ScaleType::Nau7802 => {
            let i2c = platform.i2c_bus(settings.nau_bus_id)?;
            let nau = Nau7802::new(i2c, platform.delay());
            Box::new(Nau7802Scale::new(nau, platform.delay(), clock, calibration)?)
        }
        ScaleType::None => Box::new(NoneScale::new(clock, calibration)),
    };
    Ok(scale)
}
