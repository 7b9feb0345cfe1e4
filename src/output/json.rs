use serde::Serialize;

use super::{BlockReport, Formatter, iso8601_timestamp};
use crate::signal_processing::Peak;

pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonBlock<'a> {
    ts: String,
    iteration: usize,
    samples: usize,
    noise_floor: f64,
    threshold: f64,
    peaks: &'a [Peak],
}

impl Formatter for JsonFormatter {
    fn format(&self, report: &BlockReport) -> Option<String> {
        let block = JsonBlock {
            ts: iso8601_timestamp(&report.timestamp),
            iteration: report.iteration,
            samples: report.samples_read,
            noise_floor: report.noise_floor,
            threshold: report.threshold,
            peaks: &report.peaks,
        };
        match serde_json::to_string(&block) {
            Ok(line) => Some(line),
            Err(e) => {
                log::error!("Failed to serialize block {}: {}", report.iteration, e);
                None
            }
        }
    }
}
