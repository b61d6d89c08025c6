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

use embedded_hal::digital;
use embedded_hal::i2c;

use crate::weight::interface::{hx711, nau7802};

/// Errors reported by the scale backends and the monitor wrapped around them.
///
/// Hardware faults are passed through as the `embedded-hal` error kind of the pin or bus that
/// failed. Nothing here is retried internally.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum Error {
    #[error("invalid scale configuration: {0}")]
    InvalidConfiguration(String),
    #[error("scale is not ready")]
    NotReady,
    #[error("calibration weight must be greater than zero, got {0}")]
    InvalidCalibrationWeight(f32),
    #[error("calibration produced an unusable factor ({0}), is the reference weight on the scale?")]
    CalibrationFailed(f32),
    #[error("ADC front end calibration failed")]
    AfeCalibrationFailed,
    #[error("no samples left to average")]
    EmptySampleBatch,
    #[error("GPIO fault: {0:?}")]
    Pin(digital::ErrorKind),
    #[error("I2C bus fault: {0:?}")]
    Bus(i2c::ErrorKind),
    #[error("unable to open hardware: {0}")]
    Platform(String),
    #[error("requests are arriving too quickly, slow down")]
    RateLimited,
    #[error("no scale is configured")]
    NoScale,
    #[error("unable to store setting: {0}")]
    Settings(String),
}

impl<OutPinE, InPinE> From<hx711::Error<OutPinE, InPinE>> for Error
where
    OutPinE: digital::Error,
    InPinE: digital::Error,
{
    fn from(err: hx711::Error<OutPinE, InPinE>) -> Self {
        log::warn!("HX711 pin fault: {:?}", err);
        match err {
            hx711::Error::OutPin(e) => Error::Pin(e.kind()),
            hx711::Error::InPin(e) => Error::Pin(e.kind()),
        }
    }
}

impl<I2cE> From<nau7802::Error<I2cE>> for Error
where
    I2cE: i2c::Error,
{
    fn from(err: nau7802::Error<I2cE>) -> Self {
        log::warn!("NAU7802 fault: {:?}", err);
        match err {
            nau7802::Error::I2c(e) => Error::Bus(e.kind()),
            nau7802::Error::PowerUpTimeout => Error::NotReady,
            nau7802::Error::AfeCalibrationTimeout | nau7802::Error::AfeCalibrationFailed => {
                Error::AfeCalibrationFailed
            }
        }
    }
}
