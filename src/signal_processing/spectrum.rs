//! Forward FFT engine with process-lifetime buffers
//!
//! The engine plans a fixed-size forward transform once and owns the
//! working buffer and scratch space, so the acquisition loop never
//! allocates per block. Output is unnormalised, bin `i` in `0..N/2` maps
//! to `i / N * sample_rate` and bins from `N/2` upward fold to negative
//! frequencies.

use std::fmt;
use std::sync::Arc;

use num_complex::{Complex, Complex64};
use rustfft::{Fft, FftPlanner};

use crate::error::{Result, ScanError};

pub struct FftEngine {
    size: usize,
    fft: Arc<dyn Fft<f64>>,
    buffer: Vec<Complex64>,
    scratch: Vec<Complex64>,
}

impl fmt::Debug for FftEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftEngine").field("size", &self.size).finish()
    }
}

impl FftEngine {
    /// Plan a forward transform of `size` points and allocate its buffers
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(ScanError::InvalidInput("FFT size must be non-zero".into()));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let zero = Complex64::new(0.0, 0.0);
        let scratch = vec![zero; fft.get_inplace_scratch_len()];

        log::debug!("Planned {}-point forward FFT", size);

        Ok(Self {
            size,
            fft,
            buffer: vec![zero; size],
            scratch,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Copy raw CS16 samples into the input buffer
    ///
    /// A short block fills the leading bins and zeroes the rest, so stale
    /// samples from a previous block never leak into this transform.
    pub fn load_block(&mut self, block: &[Complex<i16>]) -> Result<()> {
        if block.len() > self.size {
            return Err(ScanError::BlockLength {
                expected: self.size,
                actual: block.len(),
            });
        }

        for (slot, sample) in self.buffer.iter_mut().zip(block) {
            *slot = Complex64::new(f64::from(sample.re), f64::from(sample.im));
        }
        self.buffer[block.len()..].fill(Complex64::new(0.0, 0.0));
        Ok(())
    }

    /// Copy floating-point samples into the input buffer
    pub fn load(&mut self, input: &[Complex64]) -> Result<()> {
        if input.len() != self.size {
            return Err(ScanError::BlockLength {
                expected: self.size,
                actual: input.len(),
            });
        }
        self.buffer.copy_from_slice(input);
        Ok(())
    }

    /// Run the forward transform in place over the loaded buffer
    pub fn execute(&mut self) -> &[Complex64] {
        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        &self.buffer
    }

    /// Current buffer contents (the spectrum after [`execute`](Self::execute))
    pub fn spectrum(&self) -> &[Complex64] {
        &self.buffer
    }
}

/// Frequency of bin `bin` for an `n`-point transform, without folding
pub fn bin_frequency(bin: usize, n: usize, sample_rate_hz: f64) -> f64 {
    bin as f64 / n as f64 * sample_rate_hz
}

/// Frequency of bin `bin` with the standard FFT fold to negative frequencies
pub fn signed_bin_frequency(bin: usize, n: usize, sample_rate_hz: f64) -> f64 {
    let signed = if bin < n.div_ceil(2) {
        bin as f64
    } else {
        bin as f64 - n as f64
    };
    signed / n as f64 * sample_rate_hz
}

/// Move the zero-frequency bin to the centre
pub fn fft_shift<T: Clone>(spectrum: &[T]) -> Vec<T> {
    let mid = spectrum.len().div_ceil(2);
    let mut shifted = Vec::with_capacity(spectrum.len());
    shifted.extend_from_slice(&spectrum[mid..]);
    shifted.extend_from_slice(&spectrum[..mid]);
    shifted
}
