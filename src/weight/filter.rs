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

use crate::Error;
use heapless::Vec;
use log::trace;
use micromath::statistics::{Mean, StdDev};

/// Samples further than this many standard deviations from the batch mean are discarded.
pub const OUTLIER_CUTOFF_RATIO: f32 = 1.25;

/// Keeps only the samples within `cutoff_ratio` standard deviations of the batch mean.
///
/// The sample closest to the mean always lies within one standard deviation of it, so a
/// non-empty batch never comes back empty.
pub fn remove_outliers<const N: usize>(samples: &Vec<f32, N>, cutoff_ratio: f32) -> Vec<f32, N> {
    if samples.len() < 2 {
        return samples.clone();
    }

    let mean = samples.iter().copied().mean();
    let cutoff = samples.as_slice().stddev() * cutoff_ratio;
    let lower = mean - cutoff;
    let upper = mean + cutoff;
    trace!("Batch mean = {}, keeping samples in [{}, {}]", mean, lower, upper);

    samples
        .iter()
        .copied()
        .filter(|sample| lower <= *sample && *sample <= upper)
        .collect()
}

/// Mean of the batch once outliers have been removed.
pub fn mean_without_outliers<const N: usize>(samples: &Vec<f32, N>) -> Result<f32, Error> {
    let retained = remove_outliers(samples, OUTLIER_CUTOFF_RATIO);
    if retained.is_empty() {
        return Err(Error::EmptySampleBatch);
    }
    trace!(
        "Discarded {} of {} samples as outliers",
        samples.len() - retained.len(),
        samples.len()
    );
    Ok(retained.into_iter().mean())
}
