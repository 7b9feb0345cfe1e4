//! Sample sources feeding the acquisition loop
//!
//! A source fills a caller-owned block buffer and reports how many samples
//! it wrote. `Ok(0)` means the read timed out or no data was available;
//! the acquisition loop treats that and `Err` alike as an empty slot.

mod channel;
mod file;

use std::time::Duration;

use num_complex::Complex;

use crate::error::Result;

pub use channel::ChannelSource;
pub use file::Cs16FileSource;

#[cfg(feature = "simulation")]
pub use crate::simulation::SimulatedSource;

pub trait SampleSource: Send {
    /// Fill `buf` with up to `buf.len()` samples, blocking at most `timeout`
    fn read(&mut self, buf: &mut [Complex<i16>], timeout: Duration) -> Result<usize>;

    /// Stream sample rate in Hz
    fn sample_rate(&self) -> f64;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn read(&mut self, buf: &mut [Complex<i16>], timeout: Duration) -> Result<usize> {
        (**self).read(buf, timeout)
    }

    fn sample_rate(&self) -> f64 {
        (**self).sample_rate()
    }
}
