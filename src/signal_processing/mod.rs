pub mod magnitude;
pub mod noise_floor;
pub mod peak_detector;
pub mod spectrum;

pub use magnitude::{bin_magnitude, magnitudes, magnitudes_into};
pub use noise_floor::{noise_floor, noise_floor_with_scratch};
pub use peak_detector::{Peak, ThresholdPeakDetector};
pub use spectrum::{FftEngine, bin_frequency, fft_shift, signed_bin_frequency};
