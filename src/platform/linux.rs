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

use crate::weight::factory::Platform;
use crate::Error;
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::{CdevPin, Delay, I2cdev};
use log::debug;

const DEFAULT_GPIO_CHIP: &str = "/dev/gpiochip0";
const CONSUMER: &str = "filament-scale";

/// GPIO character device lines and `/dev/i2c-N` buses on a Linux host such as a Raspberry Pi.
pub struct LinuxPlatform {
    gpio_chip: String,
}

impl Default for LinuxPlatform {
    fn default() -> Self {
        Self::new(DEFAULT_GPIO_CHIP)
    }
}

impl LinuxPlatform {
    pub fn new(gpio_chip: impl Into<String>) -> Self {
        Self {
            gpio_chip: gpio_chip.into(),
        }
    }

    fn request_line(&self, pin: u32, flags: LineRequestFlags, default: u8) -> Result<CdevPin, Error> {
        let mut chip = Chip::new(&self.gpio_chip)
            .map_err(|e| Error::Platform(format!("{}: {}", self.gpio_chip, e)))?;
        let handle = chip
            .get_line(pin)
            .and_then(|line| line.request(flags, default, CONSUMER))
            .map_err(|e| Error::Platform(format!("GPIO {}: {}", pin, e)))?;
        debug!("Requested GPIO {} on {}", pin, self.gpio_chip);
        CdevPin::new(handle).map_err(|e| Error::Platform(format!("GPIO {}: {}", pin, e)))
    }
}

impl Platform for LinuxPlatform {
    type ClockPin = CdevPin;
    type DataPin = CdevPin;
    type I2c = I2cdev;
    type Delay = Delay;

    fn clock_pin(&mut self, pin: u32) -> Result<Self::ClockPin, Error> {
        self.request_line(pin, LineRequestFlags::OUTPUT, 0)
    }

    fn data_pin(&mut self, pin: u32) -> Result<Self::DataPin, Error> {
        self.request_line(pin, LineRequestFlags::INPUT, 0)
    }

    fn i2c_bus(&mut self, bus_id: u32) -> Result<Self::I2c, Error> {
        let path = format!("/dev/i2c-{}", bus_id);
        debug!("Opening {}", path);
        I2cdev::new(&path).map_err(|e| Error::Platform(format!("{}: {}", path, e)))
    }

    fn delay(&mut self) -> Self::Delay {
        Delay
    }
}
