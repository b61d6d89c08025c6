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

//! Stand-ins for the hardware and clock used by the unit tests.

use crate::clock::Clock;
use crate::weight::factory::Platform;
use crate::weight::interface::nau7802::{bit, register, NAU7802_ADDR};
use crate::weight::interface::StrainGaugeInterface;
use crate::Error;
use chrono::{DateTime, TimeDelta, Utc};
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use embedded_hal_mock::eh1::delay::NoopDelay;
use embedded_hal_mock::eh1::digital::Mock as PinMock;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Clock that only moves when told to.
#[derive(Clone)]
pub(crate) struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub(crate) fn new() -> Self {
        let start = DateTime::from_timestamp(1_735_689_600, 0).unwrap();
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub(crate) fn advance_ms(&self, ms: i64) {
        self.now.set(self.now.get() + TimeDelta::milliseconds(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

#[derive(Default)]
struct GaugeState {
    load: i32,
    queued: VecDeque<i32>,
    powered_up: bool,
    power_ups: usize,
    power_downs: usize,
    readings: usize,
    read_fault: Option<Error>,
}

/// Strain gauge that returns queued readings first, then a constant load.
#[derive(Clone, Default)]
pub(crate) struct ScriptedGauge {
    state: Rc<RefCell<GaugeState>>,
}

impl ScriptedGauge {
    pub(crate) fn new(load: i32) -> Self {
        let gauge = Self::default();
        gauge.set_load(load);
        gauge
    }

    pub(crate) fn set_load(&self, load: i32) {
        self.state.borrow_mut().load = load;
    }

    pub(crate) fn queue(&self, readings: &[i32]) {
        self.state.borrow_mut().queued.extend(readings.iter().copied());
    }

    /// Every following reading fails with `error`.
    pub(crate) fn fail_readings(&self, error: Error) {
        self.state.borrow_mut().read_fault = Some(error);
    }

    pub(crate) fn is_powered_up(&self) -> bool {
        self.state.borrow().powered_up
    }

    pub(crate) fn power_ups(&self) -> usize {
        self.state.borrow().power_ups
    }

    pub(crate) fn power_downs(&self) -> usize {
        self.state.borrow().power_downs
    }

    pub(crate) fn readings(&self) -> usize {
        self.state.borrow().readings
    }
}

impl StrainGaugeInterface for ScriptedGauge {
    type Error = Error;

    fn initialize(&mut self) -> Result<(), Self::Error> {
        self.power_up()
    }

    fn get_next_reading(&mut self) -> Result<i32, Self::Error> {
        if !self.is_powered_up() {
            self.power_up()?;
        }
        let mut state = self.state.borrow_mut();
        if let Some(error) = state.read_fault.clone() {
            return Err(error);
        }
        state.readings += 1;
        let load = state.load;
        Ok(state.queued.pop_front().unwrap_or(load))
    }

    fn power_down(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.powered_up = false;
        state.power_downs += 1;
        Ok(())
    }

    fn power_up(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.powered_up = true;
        state.power_ups += 1;
        Ok(())
    }
}

struct NauRegisters {
    registers: [u8; 0x20],
    pointer: u8,
    load: i32,
    queued: VecDeque<i32>,
    latched: i32,
    busy_polls: usize,
    afe_calibrations: usize,
    fail_afe: bool,
}

impl NauRegisters {
    fn powered_up(&self) -> bool {
        let pu_ctrl = self.registers[register::PU_CTRL as usize];
        pu_ctrl & (1 << bit::PUD) != 0 && pu_ctrl & (1 << bit::PUA) != 0
    }

    fn read(&mut self, reg: u8) -> u8 {
        match reg {
            register::PU_CTRL => {
                let mut value = self.registers[register::PU_CTRL as usize];
                if self.powered_up() {
                    value |= 1 << bit::PUR;
                    if self.busy_polls > 0 {
                        self.busy_polls -= 1;
                    } else {
                        value |= 1 << bit::CR;
                    }
                }
                value
            }
            register::ADCO_B2 => {
                self.latched = self.queued.pop_front().unwrap_or(self.load);
                ((self.latched >> 16) & 0xFF) as u8
            }
            0x13 => ((self.latched >> 8) & 0xFF) as u8,
            0x14 => (self.latched & 0xFF) as u8,
            _ => self.registers[(reg & 0x1F) as usize],
        }
    }

    fn write(&mut self, reg: u8, value: u8) {
        match reg {
            register::PU_CTRL => {
                if value & (1 << bit::RR) != 0 {
                    self.registers = [0; 0x20];
                    self.registers[register::PU_CTRL as usize] = 1 << bit::RR;
                    return;
                }
                // PUR and CR are status bits
                self.registers[register::PU_CTRL as usize] =
                    value & !((1 << bit::PUR) | (1 << bit::CR));
            }
            register::CTRL2 => {
                let mut value = value;
                if value & (1 << bit::CALS) != 0 {
                    self.afe_calibrations += 1;
                    value &= !(1 << bit::CALS);
                    if self.fail_afe {
                        value |= 1 << bit::CAL_ERR;
                    } else {
                        value &= !(1 << bit::CAL_ERR);
                    }
                }
                self.registers[register::CTRL2 as usize] = value;
            }
            _ => self.registers[(reg & 0x1F) as usize] = value,
        }
    }
}

/// Register level model of a NAU7802 sitting on an I2C bus.
#[derive(Clone)]
pub(crate) struct SimulatedNau7802 {
    state: Rc<RefCell<NauRegisters>>,
}

impl SimulatedNau7802 {
    pub(crate) fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(NauRegisters {
                registers: [0; 0x20],
                pointer: 0,
                load: 0,
                queued: VecDeque::new(),
                latched: 0,
                busy_polls: 0,
                afe_calibrations: 0,
                fail_afe: false,
            })),
        }
    }

    pub(crate) fn set_load(&self, load: i32) {
        self.state.borrow_mut().load = load;
    }

    pub(crate) fn queue_samples(&self, samples: &[i32]) {
        self.state.borrow_mut().queued.extend(samples.iter().copied());
    }

    pub(crate) fn set_busy_polls(&self, polls: usize) {
        self.state.borrow_mut().busy_polls = polls;
    }

    pub(crate) fn fail_afe_calibration(&self) {
        self.state.borrow_mut().fail_afe = true;
    }

    pub(crate) fn register(&self, reg: u8) -> u8 {
        self.state.borrow().registers[reg as usize]
    }

    pub(crate) fn is_powered_up(&self) -> bool {
        self.state.borrow().powered_up()
    }

    pub(crate) fn afe_calibrations(&self) -> usize {
        self.state.borrow().afe_calibrations
    }
}

impl ErrorType for SimulatedNau7802 {
    type Error = ErrorKind;
}

impl I2c for SimulatedNau7802 {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != NAU7802_ADDR {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        let mut state = self.state.borrow_mut();
        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    if let Some((reg, values)) = bytes.split_first() {
                        state.pointer = *reg;
                        for value in values {
                            let reg = state.pointer;
                            state.write(reg, *value);
                            state.pointer = reg.wrapping_add(1);
                        }
                    }
                }
                Operation::Read(buffer) => {
                    for byte in buffer.iter_mut() {
                        let reg = state.pointer;
                        *byte = state.read(reg);
                        state.pointer = reg.wrapping_add(1);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Hands out mock pins and a simulated NAU7802, and records what was asked for.
#[derive(Clone)]
pub(crate) struct TestPlatform {
    requests: Rc<RefCell<Vec<String>>>,
    clock_pin: Rc<RefCell<Option<PinMock>>>,
    data_pin: Rc<RefCell<Option<PinMock>>>,
    nau: SimulatedNau7802,
}

impl TestPlatform {
    pub(crate) fn new() -> Self {
        Self {
            requests: Rc::new(RefCell::new(Vec::new())),
            clock_pin: Rc::new(RefCell::new(None)),
            data_pin: Rc::new(RefCell::new(None)),
            nau: SimulatedNau7802::new(),
        }
    }

    pub(crate) fn with_hx711_pins(clock_pin: PinMock, data_pin: PinMock) -> Self {
        let platform = Self::new();
        *platform.clock_pin.borrow_mut() = Some(clock_pin);
        *platform.data_pin.borrow_mut() = Some(data_pin);
        platform
    }

    pub(crate) fn with_nau7802(nau: SimulatedNau7802) -> Self {
        Self {
            nau,
            ..Self::new()
        }
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl Platform for TestPlatform {
    type ClockPin = PinMock;
    type DataPin = PinMock;
    type I2c = SimulatedNau7802;
    type Delay = NoopDelay;

    fn clock_pin(&mut self, pin: u32) -> Result<Self::ClockPin, Error> {
        self.requests.borrow_mut().push(format!("clock_pin {}", pin));
        self.clock_pin
            .borrow_mut()
            .take()
            .ok_or_else(|| Error::Platform(format!("GPIO {} unavailable", pin)))
    }

    fn data_pin(&mut self, pin: u32) -> Result<Self::DataPin, Error> {
        self.requests.borrow_mut().push(format!("data_pin {}", pin));
        self.data_pin
            .borrow_mut()
            .take()
            .ok_or_else(|| Error::Platform(format!("GPIO {} unavailable", pin)))
    }

    fn i2c_bus(&mut self, bus_id: u32) -> Result<Self::I2c, Error> {
        self.requests.borrow_mut().push(format!("i2c_bus {}", bus_id));
        Ok(self.nau.clone())
    }

    fn delay(&mut self) -> Self::Delay {
        NoopDelay::new()
    }
}
