use std::f64::consts::PI;

use num_complex::{Complex, Complex64};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{Result, ScanError};

/// One complex exponential in the synthetic stream
#[derive(Clone, Debug, serde::Deserialize)]
pub struct ToneConfig {
    /// Baseband frequency in Hz (negative values land in the upper bins)
    pub frequency_hz: f64,
    /// Peak amplitude in ADC counts
    pub amplitude: f64,
}

/// Synthetic IQ stream description
#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: Option<u64>,
    pub tones: Vec<ToneConfig>,
    /// Standard deviation of the per-component Gaussian noise, ADC counts
    pub noise_std: f64,
    /// Every n-th read returns no data
    pub dropout_every: Option<usize>,
}

impl SimulationConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_tone(mut self, frequency_hz: f64, amplitude: f64) -> Self {
        self.tones.push(ToneConfig {
            frequency_hz,
            amplitude,
        });
        self
    }

    pub fn with_noise(mut self, noise_std: f64) -> Self {
        self.noise_std = noise_std;
        self
    }

    pub fn with_dropout_every(mut self, every: usize) -> Self {
        self.dropout_every = Some(every);
        self
    }
}

pub(crate) fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => rand::make_rng(),
    }
}

pub(crate) fn noise_distribution(noise_std: f64) -> Result<Normal<f64>> {
    Normal::new(0.0, noise_std)
        .map_err(|e| ScanError::Config(format!("invalid noise_std {}: {}", noise_std, e)))
}

/// Quantize to CS16 with rounding and saturation
pub fn to_cs16(sample: Complex64) -> Complex<i16> {
    let q = |v: f64| v.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16;
    Complex::new(q(sample.re), q(sample.im))
}

/// Fill `buf` with tones plus noise, starting at absolute sample `start_index`
pub(crate) fn fill_block(
    buf: &mut [Complex<i16>],
    start_index: u64,
    sample_rate: f64,
    tones: &[ToneConfig],
    noise: &Normal<f64>,
    rng: &mut ChaCha8Rng,
) {
    for (offset, slot) in buf.iter_mut().enumerate() {
        let t = (start_index + offset as u64) as f64 / sample_rate;
        let mut value = tones
            .iter()
            .map(|tone| Complex64::from_polar(tone.amplitude, 2.0 * PI * tone.frequency_hz * t))
            .sum::<Complex64>();
        value += Complex64::new(noise.sample(rng), noise.sample(rng));
        *slot = to_cs16(value);
    }
}

/// Generate `num_samples` of the configured stream
pub fn generate_iq(
    num_samples: usize,
    sample_rate: f64,
    config: &SimulationConfig,
) -> Result<Vec<Complex<i16>>> {
    let noise = noise_distribution(config.noise_std)?;
    let mut rng = create_rng(config.seed);
    let mut samples = vec![Complex::new(0, 0); num_samples];
    fill_block(&mut samples, 0, sample_rate, &config.tones, &noise, &mut rng);
    Ok(samples)
}
