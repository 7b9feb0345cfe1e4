use std::time::Duration;

use num_complex::Complex;
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;

use super::signal::{SimulationConfig, create_rng, fill_block, noise_distribution};
use crate::error::Result;
use crate::source::SampleSource;

/// Endless synthetic IQ stream with phase-continuous tones
pub struct SimulatedSource {
    config: SimulationConfig,
    sample_rate: f64,
    noise: Normal<f64>,
    rng: ChaCha8Rng,
    sample_index: u64,
    reads: usize,
}

impl SimulatedSource {
    pub fn new(config: SimulationConfig, sample_rate: f64) -> Result<Self> {
        let noise = noise_distribution(config.noise_std)?;
        let rng = create_rng(config.seed);
        Ok(Self {
            config,
            sample_rate,
            noise,
            rng,
            sample_index: 0,
            reads: 0,
        })
    }

    /// Number of read calls so far, including dropouts
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl SampleSource for SimulatedSource {
    fn read(&mut self, buf: &mut [Complex<i16>], _timeout: Duration) -> Result<usize> {
        self.reads += 1;
        if let Some(every) = self.config.dropout_every
            && every > 0
            && self.reads % every == 0
        {
            log::trace!("Simulated dropout on read {}", self.reads);
            return Ok(0);
        }

        fill_block(
            buf,
            self.sample_index,
            self.sample_rate,
            &self.config.tones,
            &self.noise,
            &mut self.rng,
        );
        self.sample_index += buf.len() as u64;
        Ok(buf.len())
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}
