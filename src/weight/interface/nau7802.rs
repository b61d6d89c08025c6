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

//! Driver for the NAU7802 24-bit I2C load cell ADC.
//!
//! Zero offset and calibration factor are held by the driver and applied to averaged readings,
//! so a caller only has to supply the number of samples to average.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, trace};

pub const NAU7802_ADDR: u8 = 0x2A;

pub(crate) mod register {
    pub const PU_CTRL: u8 = 0x00;
    pub const CTRL1: u8 = 0x01;
    pub const CTRL2: u8 = 0x02;
    pub const ADCO_B2: u8 = 0x12;
    pub const ADC: u8 = 0x15;
    pub const PGA: u8 = 0x1B;
    pub const PGA_PWR: u8 = 0x1C;
}

pub(crate) mod bit {
    // PU_CTRL
    pub const RR: u8 = 0;
    pub const PUD: u8 = 1;
    pub const PUA: u8 = 2;
    pub const PUR: u8 = 3;
    pub const CR: u8 = 5;
    pub const AVDDS: u8 = 7;
    // CTRL2
    pub const CALS: u8 = 2;
    pub const CAL_ERR: u8 = 3;
    // PGA
    pub const LDOMODE: u8 = 6;
    // PGA_PWR
    pub const PGA_CAP_EN: u8 = 7;
}

const POWER_UP_POLLS: usize = 200;
const AFE_CALIBRATION_POLLS: usize = 1000;
const POLL_INTERVAL_MS: u32 = 1;
const RESET_DELAY_MS: u32 = 1;
const LDO_RAMP_DELAY_MS: u32 = 250;
const FLUSH_SAMPLES: usize = 10;
/// Turns off the chopper clock, see the power-on sequence in the datasheet.
const ADC_CHOPPER_CLOCK_OFF: u8 = 0x30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ldo {
    V2_4 = 0b111,
    V2_7 = 0b110,
    V3_0 = 0b101,
    V3_3 = 0b100,
    V3_6 = 0b011,
    V3_9 = 0b010,
    V4_2 = 0b001,
    V4_5 = 0b000,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gain {
    Gain1 = 0b000,
    Gain2 = 0b001,
    Gain4 = 0b010,
    Gain8 = 0b011,
    Gain16 = 0b100,
    Gain32 = 0b101,
    Gain64 = 0b110,
    Gain128 = 0b111,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRate {
    Sps10 = 0b000,
    Sps20 = 0b001,
    Sps40 = 0b010,
    Sps80 = 0b011,
    Sps320 = 0b111,
}

#[derive(Debug)]
pub enum Error<I2cE> {
    I2c(I2cE),
    PowerUpTimeout,
    AfeCalibrationTimeout,
    AfeCalibrationFailed,
}

pub struct Nau7802<I2C, D> {
    i2c: I2C,
    delay: D,
    zero_offset: f32,
    calibration_factor: f32,
}

impl<I2C, D, I2cE> Nau7802<I2C, D>
where
    I2C: I2c<Error = I2cE>,
    D: DelayNs,
{
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            i2c,
            delay,
            zero_offset: 0.0,
            calibration_factor: 1.0,
        }
    }

    /// Reset the chip and bring it up with 3.3V LDO, gain 128, 80 samples per second, then run
    /// the internal front end calibration.
    pub fn begin(&mut self) -> Result<(), Error<I2cE>> {
        self.reset()?;
        self.power_up()?;
        self.set_ldo(Ldo::V3_3)?;
        self.set_gain(Gain::Gain128)?;
        self.set_sample_rate(SampleRate::Sps80)?;

        let adc = self.register(register::ADC)?;
        self.set_register(register::ADC, adc | ADC_CHOPPER_CLOCK_OFF)?;
        // 330pF decoupling cap on channel 2
        self.set_bit(register::PGA_PWR, bit::PGA_CAP_EN)?;
        self.clear_bit(register::PGA, bit::LDOMODE)?;

        self.delay.delay_ms(LDO_RAMP_DELAY_MS);
        // first conversions after the LDO settles are discarded
        self.average(FLUSH_SAMPLES)?;
        self.calibrate_afe()?;
        debug!("NAU7802 initialised");
        Ok(())
    }

    /// True when a new conversion is waiting to be read.
    pub fn available(&mut self) -> Result<bool, Error<I2cE>> {
        self.bit(register::PU_CTRL, bit::CR)
    }

    /// Latest conversion as a signed 24-bit value.
    pub fn reading(&mut self) -> Result<i32, Error<I2cE>> {
        let mut bytes = [0u8; 3];
        self.i2c
            .write_read(NAU7802_ADDR, &[register::ADCO_B2], &mut bytes)
            .map_err(Error::I2c)?;
        let raw = ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | (bytes[2] as u32);
        // extend sign from bit 23
        let value = ((raw << 8) as i32) >> 8;
        trace!("NAU7802 raw reading = {}", value);
        Ok(value)
    }

    /// Average of the next `samples` conversions. Waits for each one without a timeout.
    pub fn average(&mut self, samples: usize) -> Result<f32, Error<I2cE>> {
        let samples = samples.max(1);
        let mut total: i64 = 0;
        let mut taken = 0;
        while taken < samples {
            if self.available()? {
                total += self.reading()? as i64;
                taken += 1;
            } else {
                self.delay.delay_ms(POLL_INTERVAL_MS);
            }
        }
        Ok(total as f32 / samples as f32)
    }

    pub fn calculate_zero_offset(&mut self, samples: usize) -> Result<(), Error<I2cE>> {
        self.zero_offset = self.average(samples)?;
        trace!("NAU7802 zero offset = {}", self.zero_offset);
        Ok(())
    }

    pub fn calculate_calibration_factor(
        &mut self,
        weight_on_scale: f32,
        samples: usize,
    ) -> Result<(), Error<I2cE>> {
        let on_scale = self.average(samples)?;
        self.calibration_factor = (on_scale - self.zero_offset) / weight_on_scale;
        trace!("NAU7802 calibration factor = {}", self.calibration_factor);
        Ok(())
    }

    /// Weight from the average of `samples` conversions. Loads below the zero point read as zero
    /// unless `allow_negative` is set.
    pub fn weight(&mut self, allow_negative: bool, samples: usize) -> Result<f32, Error<I2cE>> {
        let mut on_scale = self.average(samples)?;
        if !allow_negative && on_scale < self.zero_offset {
            on_scale = self.zero_offset;
        }
        Ok((on_scale - self.zero_offset) / self.calibration_factor)
    }

    pub fn zero_offset(&self) -> f32 {
        self.zero_offset
    }

    pub fn set_zero_offset(&mut self, zero_offset: f32) {
        self.zero_offset = zero_offset;
    }

    pub fn calibration_factor(&self) -> f32 {
        self.calibration_factor
    }

    pub fn set_calibration_factor(&mut self, calibration_factor: f32) {
        self.calibration_factor = calibration_factor;
    }

    pub fn power_up(&mut self) -> Result<(), Error<I2cE>> {
        self.set_bit(register::PU_CTRL, bit::PUD)?;
        self.set_bit(register::PU_CTRL, bit::PUA)?;

        for _ in 0..POWER_UP_POLLS {
            if self.bit(register::PU_CTRL, bit::PUR)? {
                return Ok(());
            }
            self.delay.delay_ms(POLL_INTERVAL_MS);
        }
        Err(Error::PowerUpTimeout)
    }

    pub fn power_down(&mut self) -> Result<(), Error<I2cE>> {
        self.clear_bit(register::PU_CTRL, bit::PUD)?;
        self.clear_bit(register::PU_CTRL, bit::PUA)
    }

    /// Register reset. All registers return to their defaults, leaving the chip powered down.
    pub fn reset(&mut self) -> Result<(), Error<I2cE>> {
        self.set_bit(register::PU_CTRL, bit::RR)?;
        self.delay.delay_ms(RESET_DELAY_MS);
        self.clear_bit(register::PU_CTRL, bit::RR)
    }

    pub fn set_ldo(&mut self, ldo: Ldo) -> Result<(), Error<I2cE>> {
        self.modify(register::CTRL1, 0b0011_1000, (ldo as u8) << 3)?;
        self.set_bit(register::PU_CTRL, bit::AVDDS)
    }

    pub fn set_gain(&mut self, gain: Gain) -> Result<(), Error<I2cE>> {
        self.modify(register::CTRL1, 0b0000_0111, gain as u8)
    }

    pub fn set_sample_rate(&mut self, rate: SampleRate) -> Result<(), Error<I2cE>> {
        self.modify(register::CTRL2, 0b0111_0000, (rate as u8) << 4)
    }

    /// Run the internal analog front end calibration and wait for it to finish.
    pub fn calibrate_afe(&mut self) -> Result<(), Error<I2cE>> {
        self.set_bit(register::CTRL2, bit::CALS)?;

        for _ in 0..AFE_CALIBRATION_POLLS {
            if !self.bit(register::CTRL2, bit::CALS)? {
                if self.bit(register::CTRL2, bit::CAL_ERR)? {
                    return Err(Error::AfeCalibrationFailed);
                }
                return Ok(());
            }
            self.delay.delay_ms(POLL_INTERVAL_MS);
        }
        Err(Error::AfeCalibrationTimeout)
    }

    /// Give the bus and delay back to the caller.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn register(&mut self, register: u8) -> Result<u8, Error<I2cE>> {
        let mut value = [0u8; 1];
        self.i2c
            .write_read(NAU7802_ADDR, &[register], &mut value)
            .map_err(Error::I2c)?;
        Ok(value[0])
    }

    fn set_register(&mut self, register: u8, value: u8) -> Result<(), Error<I2cE>> {
        self.i2c
            .write(NAU7802_ADDR, &[register, value])
            .map_err(Error::I2c)
    }

    fn modify(&mut self, register: u8, mask: u8, value: u8) -> Result<(), Error<I2cE>> {
        let current = self.register(register)?;
        self.set_register(register, (current & !mask) | (value & mask))
    }

    fn bit(&mut self, register: u8, bit: u8) -> Result<bool, Error<I2cE>> {
        Ok((self.register(register)? & (1 << bit)) != 0)
    }

    fn set_bit(&mut self, register: u8, bit: u8) -> Result<(), Error<I2cE>> {
        self.modify(register, 1 << bit, 1 << bit)
    }

    fn clear_bit(&mut self, register: u8, bit: u8) -> Result<(), Error<I2cE>> {
        self.modify(register, 1 << bit, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SimulatedNau7802;
    use embedded_hal_mock::eh1::delay::NoopDelay;

    fn started(sim: &SimulatedNau7802) -> Nau7802<SimulatedNau7802, NoopDelay> {
        let mut nau = Nau7802::new(sim.clone(), NoopDelay::new());
        nau.begin().unwrap();
        nau
    }

    #[test]
    fn begin_configures_the_chip() {
        let sim = SimulatedNau7802::new();
        started(&sim);

        assert!(sim.is_powered_up());
        assert_eq!(sim.register(register::CTRL1), 0b0010_0111);
        assert_eq!(sim.register(register::CTRL2) & 0b0111_0000, 0b0011_0000);
        assert_eq!(sim.register(register::ADC) & ADC_CHOPPER_CLOCK_OFF, ADC_CHOPPER_CLOCK_OFF);
        assert_ne!(sim.register(register::PGA_PWR) & (1 << bit::PGA_CAP_EN), 0);
        assert_ne!(sim.register(register::PU_CTRL) & (1 << bit::AVDDS), 0);
        assert_eq!(sim.afe_calibrations(), 1);
    }

    #[test]
    fn begin_reports_failed_afe_calibration() {
        let sim = SimulatedNau7802::new();
        sim.fail_afe_calibration();
        let mut nau = Nau7802::new(sim.clone(), NoopDelay::new());
        assert!(matches!(nau.begin(), Err(Error::AfeCalibrationFailed)));
    }

    #[test]
    fn readings_are_sign_extended() {
        let sim = SimulatedNau7802::new();
        let mut nau = started(&sim);
        sim.set_load(-1234);
        assert_eq!(nau.reading().unwrap(), -1234);
        sim.set_load(0x7F_FFFF);
        assert_eq!(nau.reading().unwrap(), 0x7F_FFFF);
    }

    #[test]
    fn average_waits_for_conversions() {
        let sim = SimulatedNau7802::new();
        let mut nau = started(&sim);
        sim.queue_samples(&[100, 200, 300, 400]);
        sim.set_busy_polls(2);
        assert_eq!(nau.average(4).unwrap(), 250.0);
    }

    #[test]
    fn weight_uses_offset_and_factor() {
        let sim = SimulatedNau7802::new();
        let mut nau = started(&sim);

        sim.set_load(5000);
        nau.calculate_zero_offset(50).unwrap();
        assert_eq!(nau.zero_offset(), 5000.0);

        sim.set_load(9000);
        nau.calculate_calibration_factor(200.0, 50).unwrap();
        assert_eq!(nau.calibration_factor(), 20.0);

        sim.set_load(7000);
        assert_eq!(nau.weight(false, 50).unwrap(), 100.0);

        sim.set_load(4000);
        assert_eq!(nau.weight(false, 50).unwrap(), 0.0);
        assert_eq!(nau.weight(true, 50).unwrap(), -50.0);
    }

    #[test]
    fn power_down_clears_power_bits() {
        let sim = SimulatedNau7802::new();
        let mut nau = started(&sim);
        nau.power_down().unwrap();
        assert!(!sim.is_powered_up());
        assert!(!nau.available().unwrap());
        nau.power_up().unwrap();
        assert!(sim.is_powered_up());
    }
}
