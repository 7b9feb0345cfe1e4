use std::path::Path;
use std::time::Duration;

use num_complex::Complex;

use super::SampleSource;
use crate::capture::read_cs16;
use crate::error::Result;

/// Replays a CS16 capture one block per read
///
/// The last block may be short. Once the data is exhausted every read
/// returns `Ok(0)`, unless looping is enabled.
pub struct Cs16FileSource {
    samples: Vec<Complex<i16>>,
    position: usize,
    sample_rate: f64,
    looping: bool,
}

impl Cs16FileSource {
    pub fn open<P: AsRef<Path>>(path: P, sample_rate: f64) -> Result<Self> {
        let samples = read_cs16(path.as_ref())?;
        log::info!(
            "Loaded {} samples from {}",
            samples.len(),
            path.as_ref().display()
        );
        Ok(Self::from_samples(samples, sample_rate))
    }

    pub fn from_samples(samples: Vec<Complex<i16>>, sample_rate: f64) -> Self {
        Self {
            samples,
            position: 0,
            sample_rate,
            looping: false,
        }
    }

    /// Restart from the beginning when the data runs out
    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn remaining(&self) -> usize {
        self.samples.len() - self.position
    }
}

impl SampleSource for Cs16FileSource {
    fn read(&mut self, buf: &mut [Complex<i16>], _timeout: Duration) -> Result<usize> {
        if self.position >= self.samples.len() {
            if !self.looping || self.samples.is_empty() {
                return Ok(0);
            }
            self.position = 0;
        }

        let end = (self.position + buf.len()).min(self.samples.len());
        let count = end - self.position;
        buf[..count].copy_from_slice(&self.samples[self.position..end]);
        self.position = end;

        Ok(count)
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}
