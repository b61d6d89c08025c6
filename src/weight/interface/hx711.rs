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

//! Bit-banged driver for the HX711 load cell ADC.

use crate::weight::interface::StrainGaugeInterface;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hx711Gain {
    Gain128,
    Gain64,
    Gain32ChannelB,
}

impl Hx711Gain {
    fn tick_count(&self) -> usize {
        match self {
            Hx711Gain::Gain128 => 25,
            Hx711Gain::Gain64 => 27,
            Hx711Gain::Gain32ChannelB => 26,
        }
    }
}

const POWER_MODE_CHANGE_DELAY_US: u32 = 60;
const CLK_LOW_PERIOD_US: u32 = 1;
const READY_POLL_INTERVAL_US: u32 = 100;
const VALID_DATA_BITS: usize = 24;

#[derive(Debug)]
pub enum Error<OutPinE, InPinE> {
    OutPin(OutPinE),
    InPin(InPinE),
}

pub struct Hx711<CLK, DATA, D> {
    clock_pin: CLK,
    data_pin: DATA,
    delay: D,
    gain_clocks: usize,
    powered_up: bool,
}

impl<CLK, DATA, D, ClkE, DataE> Hx711<CLK, DATA, D>
where
    CLK: OutputPin<Error = ClkE>,
    DATA: InputPin<Error = DataE>,
    D: DelayNs,
{
    pub fn new(clock_pin: CLK, data_pin: DATA, delay: D, gain: Hx711Gain) -> Self {
        Self {
            clock_pin,
            data_pin,
            delay,
            gain_clocks: gain.tick_count(),
            powered_up: false,
        }
    }

    /// Takes effect from the conversion after the next reading.
    pub fn set_gain(&mut self, gain: Hx711Gain) {
        self.gain_clocks = gain.tick_count();
    }

    pub fn is_powered_up(&self) -> bool {
        self.powered_up
    }

    /// Give the pins and delay back to the caller.
    pub fn release(self) -> (CLK, DATA, D) {
        (self.clock_pin, self.data_pin, self.delay)
    }

    fn wait_for_conversion(&mut self) -> Result<(), Error<ClkE, DataE>> {
        // DOUT goes low when conversion is ready
        while self.data_pin.is_high().map_err(Error::InPin)? {
            self.delay.delay_us(READY_POLL_INTERVAL_US);
        }
        Ok(())
    }
}

impl<CLK, DATA, D, ClkE, DataE> StrainGaugeInterface for Hx711<CLK, DATA, D>
where
    CLK: OutputPin<Error = ClkE>,
    DATA: InputPin<Error = DataE>,
    D: DelayNs,
{
    type Error = Error<ClkE, DataE>;

    fn initialize(&mut self) -> Result<(), Self::Error> {
        self.power_up()
    }

    fn get_next_reading(&mut self) -> Result<i32, Self::Error> {
        if !self.powered_up {
            self.power_up()?;
        }

        self.wait_for_conversion()?;
        let mut data: i32 = 0;

        for _ in 0..self.gain_clocks {
            data <<= 1;
            // PD_SCK held high past 60us powers the chip down, so the high phase is only as
            // long as the two pin writes. A sleeping delay here can overshoot that limit.
            self.clock_pin.set_high().map_err(Error::OutPin)?;
            self.clock_pin.set_low().map_err(Error::OutPin)?;
            if self.data_pin.is_high().map_err(Error::InPin)? {
                data |= 0x1;
            }
            self.delay.delay_us(CLK_LOW_PERIOD_US);
        }

        let data_bits_to_discard = self.gain_clocks - VALID_DATA_BITS;
        data >>= data_bits_to_discard;
        let data_mask = (1 << VALID_DATA_BITS) - 1;
        data &= data_mask;
        // extend sign if bit 24 is 1
        if (data >> 23) & 0x1 == 0x1 {
            data |= 0xFF000000u32 as i32;
        }
        trace!("HX711 raw reading = {}", data);
        Ok(data)
    }

    fn power_down(&mut self) -> Result<(), Self::Error> {
        self.clock_pin.set_high().map_err(Error::OutPin)?;
        self.delay.delay_us(POWER_MODE_CHANGE_DELAY_US);
        self.powered_up = false;
        Ok(())
    }

    fn power_up(&mut self) -> Result<(), Self::Error> {
        self.clock_pin.set_low().map_err(Error::OutPin)?;
        self.delay.delay_us(POWER_MODE_CHANGE_DELAY_US);
        self.powered_up = true;
        Ok(())
    }
}
