#![allow(dead_code)]

use num_complex::{Complex, Complex64};
use std::f64::consts::PI;

use rfpeak::signal_processing::Peak;

/// Sum of complex tones at exact bin centres, quantized to CS16
pub fn tone_block(n: usize, bins: &[(usize, f64)]) -> Vec<Complex<i16>> {
    (0..n)
        .map(|i| {
            let v: Complex64 = bins
                .iter()
                .map(|&(bin, amplitude)| {
                    Complex64::from_polar(amplitude, 2.0 * PI * bin as f64 * i as f64 / n as f64)
                })
                .sum();
            Complex::new(v.re.round() as i16, v.im.round() as i16)
        })
        .collect()
}

/// Peaks ordered by descending magnitude
pub fn strongest(peaks: &[Peak], count: usize) -> Vec<Peak> {
    let mut sorted = peaks.to_vec();
    sorted.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));
    sorted.truncate(count);
    sorted
}

pub fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("rfpeak_it_{}_{}", std::process::id(), name))
}
