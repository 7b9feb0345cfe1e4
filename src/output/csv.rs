use super::{BlockReport, Formatter, iso8601_timestamp};

pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format(&self, report: &BlockReport) -> Option<String> {
        if report.peaks.is_empty() {
            return None;
        }
        let ts = iso8601_timestamp(&report.timestamp);
        let rows: Vec<String> = report
            .peaks
            .iter()
            .map(|peak| {
                format!(
                    "{},{},{},{:.3},{:.4},{:.4},{:.4}",
                    ts,
                    report.iteration,
                    peak.bin,
                    peak.frequency_hz,
                    peak.magnitude,
                    report.noise_floor,
                    report.threshold
                )
            })
            .collect();
        Some(rows.join("\n"))
    }

    fn header(&self) -> Option<&'static str> {
        Some("ts,iteration,bin,frequency_hz,magnitude,noise_floor,threshold")
    }
}
