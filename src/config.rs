//! Configuration for the rfpeak scanner.
//!
//! All values have defaults (see [`crate::constants`]) and can be loaded from
//! a TOML file. Every key is optional:
//!
//! ```toml
//! block_len = 1024
//! sample_rate = "10MHz"
//! margin_db = 10.0
//! iterations = 100
//! read_timeout_ms = 100
//!
//! [capture]
//! enabled = true
//! path = "samples.cs16"
//! mode = "latest"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::constants::{
    DEFAULT_BLOCK_LEN, DEFAULT_CAPTURE_PATH, DEFAULT_ITERATIONS, DEFAULT_MARGIN_DB,
    DEFAULT_READ_TIMEOUT_MS, DEFAULT_SAMPLE_RATE_HZ, MIN_BLOCK_LEN,
};
use crate::error::{Result, ScanError};

/// Stream sample rate
///
/// # Parsing formats
/// - `10e6` or `10000000` - samples per second (no suffix)
/// - `10MHz`, `250kHz`, `48000hz` - frequency suffixes (case insensitive)
/// - `2.4msps`, `250ksps`, `1000sps` - rate suffixes (case insensitive)
///
/// # Example
/// ```
/// use rfpeak::config::SampleRate;
///
/// let rate: SampleRate = "2.4Msps".parse().unwrap();
/// assert!((rate.as_hz() - 2.4e6).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "SampleRateRepr")]
pub struct SampleRate(f64);

impl SampleRate {
    pub fn from_hz(hz: f64) -> Self {
        Self(hz)
    }

    pub fn as_hz(&self) -> f64 {
        self.0
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        Self::from_hz(DEFAULT_SAMPLE_RATE_HZ)
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= 1e6 {
            write!(f, "{}MHz", self.0 / 1e6)
        } else if self.0 >= 1e3 {
            write!(f, "{}kHz", self.0 / 1e3)
        } else {
            write!(f, "{}Hz", self.0)
        }
    }
}

impl FromStr for SampleRate {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();

        // Longest suffixes first so "mhz" is not read as "hz"
        const SUFFIXES: [(&str, f64); 6] = [
            ("msps", 1e6),
            ("ksps", 1e3),
            ("mhz", 1e6),
            ("khz", 1e3),
            ("sps", 1.0),
            ("hz", 1.0),
        ];

        let (num, scale) = SUFFIXES
            .iter()
            .find_map(|&(suffix, scale)| lower.strip_suffix(suffix).map(|n| (n, scale)))
            .unwrap_or((lower.as_str(), 1.0));

        let value: f64 = num
            .trim()
            .parse()
            .map_err(|_| format!("invalid sample rate: {}", s))?;
        let hz = value * scale;
        if !hz.is_finite() || hz <= 0.0 {
            return Err("sample rate must be positive".to_string());
        }
        Ok(Self::from_hz(hz))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SampleRateRepr {
    Hz(f64),
    Text(String),
}

impl TryFrom<SampleRateRepr> for SampleRate {
    type Error = String;

    fn try_from(repr: SampleRateRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            SampleRateRepr::Hz(hz) if hz.is_finite() && hz > 0.0 => Ok(Self::from_hz(hz)),
            SampleRateRepr::Hz(_) => Err("sample rate must be positive".to_string()),
            SampleRateRepr::Text(s) => s.parse(),
        }
    }
}

/// How raw blocks are persisted by the capture sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Truncate the file on every block so it always holds the latest block
    #[default]
    Latest,
    /// Append every block to one growing file
    Append,
}

/// Raw block capture configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Whether processed blocks are handed to the capture sink
    pub enabled: bool,
    /// Destination CS16 file
    pub path: PathBuf,
    /// Overwrite or append
    pub mode: CaptureMode,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from(DEFAULT_CAPTURE_PATH),
            mode: CaptureMode::Latest,
        }
    }
}

/// Scanner configuration
///
/// Use `ScanConfig::default()` for the stock receiver settings.
///
/// # Example
/// ```
/// use rfpeak::config::ScanConfig;
///
/// let mut config = ScanConfig::default();
/// config.margin_db = 6.0;
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Samples per block, also the FFT size
    pub block_len: usize,
    /// Stream sample rate
    pub sample_rate: SampleRate,
    /// Detection margin above the noise floor in dB
    pub margin_db: f64,
    /// Number of acquisition iterations
    pub iterations: usize,
    /// Per-read timeout in milliseconds
    pub read_timeout_ms: u64,
    /// Raw block capture
    pub capture: CaptureConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            block_len: DEFAULT_BLOCK_LEN,
            sample_rate: SampleRate::default(),
            margin_db: DEFAULT_MARGIN_DB,
            iterations: DEFAULT_ITERATIONS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            capture: CaptureConfig::default(),
        }
    }
}

impl ScanConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ScanError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScanError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_len < MIN_BLOCK_LEN {
            return Err(ScanError::Config(format!(
                "block_len must be at least {}, got {}",
                MIN_BLOCK_LEN, self.block_len
            )));
        }
        let rate = self.sample_rate.as_hz();
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ScanError::Config("sample rate must be positive".into()));
        }
        if !self.margin_db.is_finite() {
            return Err(ScanError::Config("margin_db must be finite".into()));
        }
        if self.read_timeout_ms == 0 {
            return Err(ScanError::Config("read_timeout_ms must be positive".into()));
        }
        Ok(())
    }

    /// Linear amplitude multiplier applied to the noise floor
    pub fn threshold_multiplier(&self) -> f64 {
        margin_to_amplitude_ratio(self.margin_db)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Convert a dB margin to an amplitude (not power) ratio.
pub fn margin_to_amplitude_ratio(margin_db: f64) -> f64 {
    10f64.powf(margin_db / 20.0)
}
