pub mod acquisition;
pub mod capture;
pub mod config;
pub mod constants;
pub mod error;
pub mod output;
pub mod signal_processing;
pub mod source;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use acquisition::{ScanSummary, SpectrumAnalyzer, SpectrumScanner, StopToken};
pub use config::ScanConfig;
pub use error::{Result, ScanError};
