use num_complex::Complex64;

/// Magnitude of one frequency bin: sqrt(re² + im²).
///
/// Non-finite components propagate unchanged.
#[inline]
pub fn bin_magnitude(bin: Complex64) -> f64 {
    (bin.re * bin.re + bin.im * bin.im).sqrt()
}

/// Compute the magnitude vector of a spectrum
///
/// The output has exactly one element per input bin, in the same order.
pub fn magnitudes(spectrum: &[Complex64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(spectrum.len());
    magnitudes_into(spectrum, &mut out);
    out
}

/// Compute magnitudes into an existing buffer
///
/// The buffer is cleared and refilled; once it has grown to the spectrum
/// length no further allocation happens.
pub fn magnitudes_into(spectrum: &[Complex64], out: &mut Vec<f64>) {
    out.clear();
    out.extend(spectrum.iter().copied().map(bin_magnitude));
}
