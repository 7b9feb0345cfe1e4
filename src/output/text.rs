use super::{BlockReport, Formatter};

pub struct TextFormatter {
    verbose: bool,
}

impl TextFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Formatter for TextFormatter {
    fn format(&self, report: &BlockReport) -> Option<String> {
        let mut lines = Vec::with_capacity(report.peaks.len() + 1);
        if self.verbose {
            lines.push(format!(
                "Block {:>4}: {} samples, noise floor {:.2}, threshold {:.2}, {} peak(s)",
                report.iteration,
                report.samples_read,
                report.noise_floor,
                report.threshold,
                report.peaks.len()
            ));
        }
        lines.extend(
            report
                .peaks
                .iter()
                .map(|peak| format!("Peak detected: {:.6}", peak.frequency_hz)),
        );

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::sample_report;

    #[test]
    fn test_one_line_per_peak() {
        let out = TextFormatter::new(false)
            .format(&sample_report(&[(3, 3.0), (100, 976562.5)]))
            .unwrap();
        assert_eq!(out, "Peak detected: 3.000000\nPeak detected: 976562.500000");
    }

    #[test]
    fn test_verbose_summary() {
        let out = TextFormatter::new(true).format(&sample_report(&[])).unwrap();
        assert_eq!(
            out,
            "Block    4: 8 samples, noise floor 1.50, threshold 4.74, 0 peak(s)"
        );
    }
}
