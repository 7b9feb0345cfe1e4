mod csv;
mod json;
mod text;

use std::io::Write;

use chrono::{DateTime, Utc};

use crate::signal_processing::Peak;

pub use self::csv::CsvFormatter;
pub use self::json::JsonFormatter;
pub use self::text::TextFormatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// Detection result for one processed block
#[derive(Debug, Clone)]
pub struct BlockReport {
    /// Zero-based acquisition iteration
    pub iteration: usize,
    pub timestamp: DateTime<Utc>,
    /// Samples returned by the source for this block
    pub samples_read: usize,
    pub noise_floor: f64,
    pub threshold: f64,
    /// Detected peaks in ascending frequency order
    pub peaks: Vec<Peak>,
}

impl BlockReport {
    pub fn frequencies(&self) -> Vec<f64> {
        self.peaks.iter().map(|p| p.frequency_hz).collect()
    }
}

pub trait Formatter: Send {
    /// Render a block; `None` means there is nothing to emit
    fn format(&self, report: &BlockReport) -> Option<String>;

    fn header(&self) -> Option<&'static str> {
        None
    }
}

pub fn create_formatter(format: OutputFormat, verbose: bool) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(verbose)),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

/// Consumer of per-block detection results
pub trait ReportSink {
    fn report(&mut self, report: &BlockReport);
}

impl ReportSink for Vec<BlockReport> {
    fn report(&mut self, report: &BlockReport) {
        self.push(report.clone());
    }
}

/// Formats reports onto a writer (stdout, a file, ...)
///
/// Write failures are logged and otherwise ignored so reporting never
/// stops acquisition.
pub struct WriterSink<W: Write> {
    formatter: Box<dyn Formatter>,
    writer: W,
    header_written: bool,
}

impl<W: Write> WriterSink<W> {
    pub fn new(formatter: Box<dyn Formatter>, writer: W) -> Self {
        Self {
            formatter,
            writer,
            header_written: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, report: &BlockReport) -> std::io::Result<()> {
        if !self.header_written {
            if let Some(header) = self.formatter.header() {
                writeln!(self.writer, "{}", header)?;
            }
            self.header_written = true;
        }
        if let Some(line) = self.formatter.format(report) {
            writeln!(self.writer, "{}", line)?;
        }
        self.writer.flush()
    }
}

impl<W: Write> ReportSink for WriterSink<W> {
    fn report(&mut self, report: &BlockReport) {
        if let Err(e) = self.emit(report) {
            log::error!("Failed to write report for block {}: {}", report.iteration, e);
        }
    }
}

pub fn iso8601_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
pub(crate) fn sample_report(peaks: &[(usize, f64)]) -> BlockReport {
    use chrono::TimeZone;

    BlockReport {
        iteration: 4,
        timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        samples_read: 8,
        noise_floor: 1.5,
        threshold: 4.743416490252569,
        peaks: peaks
            .iter()
            .map(|&(bin, frequency_hz)| Peak {
                bin,
                frequency_hz,
                magnitude: 10.0,
            })
            .collect(),
    }
}
