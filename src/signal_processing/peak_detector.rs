use serde::Serialize;

use super::spectrum::bin_frequency;
use crate::config::{ScanConfig, margin_to_amplitude_ratio};

/// A local maximum found in one block's magnitude vector
///
/// Peaks have no identity across blocks; each one is a point-in-time
/// observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Peak {
    /// FFT bin index
    pub bin: usize,
    /// Bin frequency, `bin / N * sample_rate`
    pub frequency_hz: f64,
    /// Bin magnitude at detection time
    pub magnitude: f64,
}

/// Threshold peak detector for spectral magnitude vectors
///
/// The threshold is the noise floor scaled by `10^(margin_db / 20)`.
/// Detection is a single left-to-right pass over bins `1..N-1`:
///
/// 1. If the left neighbour is below threshold it is zeroed in the working
///    vector before the comparison.
/// 2. Bin `i` is a peak when it is strictly greater than the (possibly
///    zeroed) left neighbour and strictly greater than the untouched right
///    neighbour.
///
/// Only the left neighbour is ever suppressed, and bin `i` itself is not
/// gated on the threshold, so every decision depends on the previous
/// iteration's mutation. The endpoints are never reported and there is no
/// wraparound.
#[derive(Debug, Clone)]
pub struct ThresholdPeakDetector {
    margin_db: f64,
    threshold_multiplier: f64,
    sample_rate_hz: f64,
}

impl ThresholdPeakDetector {
    /// Create a new detector
    ///
    /// # Arguments
    /// * `margin_db` - Required margin above the noise floor in dB
    /// * `sample_rate_hz` - Stream sample rate used for bin-to-Hz conversion
    pub fn new(margin_db: f64, sample_rate_hz: f64) -> Self {
        Self {
            margin_db,
            threshold_multiplier: margin_to_amplitude_ratio(margin_db),
            sample_rate_hz,
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.margin_db, config.sample_rate.as_hz())
    }

    pub fn margin_db(&self) -> f64 {
        self.margin_db
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    /// Linear detection threshold for a given noise floor
    pub fn threshold(&self, noise_floor: f64) -> f64 {
        noise_floor * self.threshold_multiplier
    }

    /// Detect peaks without touching the caller's vector
    pub fn detect(&self, magnitudes: &[f64], noise_floor: f64) -> Vec<Peak> {
        let mut working = magnitudes.to_vec();
        self.detect_in_place(&mut working, noise_floor)
    }

    /// Detect peaks, suppressing sub-threshold bins in `working`
    ///
    /// `working` is consumed as scratch: on return, bins `0..N-2` that were
    /// below threshold when visited hold zero.
    pub fn detect_in_place(&self, working: &mut [f64], noise_floor: f64) -> Vec<Peak> {
        let mut peaks = Vec::new();
        self.detect_into(working, noise_floor, &mut peaks);
        peaks
    }

    /// Same as [`detect_in_place`](Self::detect_in_place), appending to `peaks`
    pub fn detect_into(&self, working: &mut [f64], noise_floor: f64, peaks: &mut Vec<Peak>) {
        let n = working.len();
        let threshold = self.threshold(noise_floor);

        for i in 1..n.saturating_sub(1) {
            if working[i - 1] < threshold {
                working[i - 1] = 0.0;
            }

            if working[i] > working[i - 1] && working[i] > working[i + 1] {
                peaks.push(Peak {
                    bin: i,
                    frequency_hz: bin_frequency(i, n, self.sample_rate_hz),
                    magnitude: working[i],
                });
            }
        }
    }
}
