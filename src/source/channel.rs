use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use num_complex::Complex;

use super::SampleSource;
use crate::error::{Result, ScanError};

/// Receives sample chunks pushed by a driver thread
///
/// Chunks of any size are accepted; samples that do not fit the current
/// block are held back for the next read.
pub struct ChannelSource {
    rx: Receiver<Vec<Complex<i16>>>,
    pending: Vec<Complex<i16>>,
    pending_pos: usize,
    sample_rate: f64,
}

impl ChannelSource {
    pub fn new(rx: Receiver<Vec<Complex<i16>>>, sample_rate: f64) -> Self {
        Self {
            rx,
            pending: Vec::new(),
            pending_pos: 0,
            sample_rate,
        }
    }

    /// Create a bounded channel and the source reading from it
    pub fn bounded(capacity: usize, sample_rate: f64) -> (Sender<Vec<Complex<i16>>>, Self) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (tx, Self::new(rx, sample_rate))
    }

    fn drain_pending(&mut self, buf: &mut [Complex<i16>]) -> usize {
        let available = &self.pending[self.pending_pos..];
        let count = available.len().min(buf.len());
        buf[..count].copy_from_slice(&available[..count]);
        self.pending_pos += count;
        count
    }
}

impl SampleSource for ChannelSource {
    fn read(&mut self, buf: &mut [Complex<i16>], timeout: Duration) -> Result<usize> {
        if self.pending_pos < self.pending.len() {
            return Ok(self.drain_pending(buf));
        }

        match self.rx.recv_timeout(timeout) {
            Ok(chunk) => {
                self.pending = chunk;
                self.pending_pos = 0;
                Ok(self.drain_pending(buf))
            }
            Err(RecvTimeoutError::Timeout) => Ok(0),
            Err(RecvTimeoutError::Disconnected) => {
                Err(ScanError::Source("sample channel disconnected".into()))
            }
        }
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}
