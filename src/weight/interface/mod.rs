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

pub mod hx711;
pub mod nau7802;

/// Raw access to a strain gauge ADC that leaves averaging to the caller.
pub trait StrainGaugeInterface {
    type Error;

    /// Initialise the gauge and make it ready for taking readings. Will put it into an initalized,
    /// powered up state.
    fn initialize(&mut self) -> Result<(), Self::Error>;

    /// Gets next reading from the strain gauge. Blocks until the ADC has a conversion ready. If
    /// the gauge is powered down then this function is expected to power up the device first.
    fn get_next_reading(&mut self) -> Result<i32, Self::Error>;

    /// Power down the strain gauge
    fn power_down(&mut self) -> Result<(), Self::Error>;

    /// Power up the strain gauge
    fn power_up(&mut self) -> Result<(), Self::Error>;

    /// Power cycle the gauge, returning it to its power-on defaults.
    fn reset(&mut self) -> Result<(), Self::Error> {
        self.power_down()?;
        self.power_up()
    }
}
