//! Default acquisition and detection constants
//!
//! These values match the receiver the pipeline was first built for:
//! a 10 Msps CS16 stream read in 1024-sample blocks.

/// Samples per acquisition block (and FFT size).
pub const DEFAULT_BLOCK_LEN: usize = 1024;

/// Stream sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 10e6;

/// Detection margin above the noise floor in dB (amplitude ratio).
pub const DEFAULT_MARGIN_DB: f64 = 10.0;

/// Number of acquisition iterations per run.
pub const DEFAULT_ITERATIONS: usize = 100;

/// Sample source read timeout in milliseconds (100 000 µs).
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;

/// Default capture file for raw blocks.
pub const DEFAULT_CAPTURE_PATH: &str = "samples.cs16";

/// Smallest block length with at least one interior bin.
pub const MIN_BLOCK_LEN: usize = 3;

/// Bytes per CS16 sample (I and Q as little-endian i16).
pub const CS16_BYTES_PER_SAMPLE: usize = 4;
