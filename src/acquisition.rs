//! Acquisition loop: read, transform, detect, report, capture.
//!
//! The loop is single-threaded and strictly sequential. All working buffers
//! (block, FFT buffer and scratch, magnitude and sort vectors) are allocated
//! when the scanner is built and reused for every iteration; they are
//! released when the scanner is dropped, on every exit path.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use num_complex::{Complex, Complex64};

use crate::capture::CaptureSink;
use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use crate::output::{BlockReport, ReportSink};
use crate::signal_processing::{
    FftEngine, Peak, ThresholdPeakDetector, magnitudes_into, noise_floor_with_scratch,
};
use crate::source::SampleSource;

/// Cooperative stop signal checked between iterations
///
/// Clones share the same flag, so one can be handed to another thread.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Detection outcome for one block
#[derive(Debug, Clone, PartialEq)]
pub struct BlockAnalysis {
    pub noise_floor: f64,
    pub threshold: f64,
    pub peaks: Vec<Peak>,
}

/// Transform + magnitude + noise floor + peak detection over one block
///
/// Owns every buffer it needs so repeated calls do not allocate beyond the
/// returned peak list.
pub struct SpectrumAnalyzer {
    engine: FftEngine,
    detector: ThresholdPeakDetector,
    magnitudes: Vec<f64>,
    sort_scratch: Vec<f64>,
}

impl SpectrumAnalyzer {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: FftEngine::new(config.block_len)?,
            detector: ThresholdPeakDetector::from_config(config),
            magnitudes: Vec::with_capacity(config.block_len),
            sort_scratch: Vec::with_capacity(config.block_len),
        })
    }

    pub fn block_len(&self) -> usize {
        self.engine.size()
    }

    pub fn detector(&self) -> &ThresholdPeakDetector {
        &self.detector
    }

    /// Analyze one block of raw samples
    ///
    /// Blocks shorter than the FFT size are zero-padded.
    pub fn process(&mut self, block: &[Complex<i16>]) -> Result<BlockAnalysis> {
        if block.is_empty() {
            return Err(ScanError::InvalidInput("empty sample block".into()));
        }

        self.engine.load_block(block)?;
        let spectrum = self.engine.execute();
        magnitudes_into(spectrum, &mut self.magnitudes);

        let noise_floor = noise_floor_with_scratch(&self.magnitudes, &mut self.sort_scratch)?;
        let threshold = self.detector.threshold(noise_floor);
        let peaks = self.detector.detect_in_place(&mut self.magnitudes, noise_floor);

        Ok(BlockAnalysis {
            noise_floor,
            threshold,
            peaks,
        })
    }

    /// Spectrum of the most recently processed block
    pub fn spectrum(&self) -> &[Complex64] {
        self.engine.spectrum()
    }
}

/// Counters for one acquisition run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Iterations started (fewer than configured only when stopped)
    pub iterations: usize,
    pub blocks_processed: usize,
    /// Reads that returned no samples
    pub empty_reads: usize,
    pub read_errors: usize,
    pub capture_failures: usize,
    pub peaks_reported: usize,
    pub stopped_early: bool,
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} iterations, {} blocks processed, {} empty reads, {} read errors, \
             {} capture failures, {} peaks{}",
            self.iterations,
            self.blocks_processed,
            self.empty_reads,
            self.read_errors,
            self.capture_failures,
            self.peaks_reported,
            if self.stopped_early { " (stopped early)" } else { "" }
        )
    }
}

/// Bounded acquisition loop
pub struct SpectrumScanner {
    config: ScanConfig,
    analyzer: SpectrumAnalyzer,
    block: Vec<Complex<i16>>,
}

impl SpectrumScanner {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        let analyzer = SpectrumAnalyzer::new(config)?;
        log::info!(
            "Scanner ready: {}-point FFT at {}, margin {} dB (x{:.3}), {} iterations",
            config.block_len,
            config.sample_rate,
            config.margin_db,
            config.threshold_multiplier(),
            config.iterations
        );

        Ok(Self {
            config: config.clone(),
            analyzer,
            block: vec![Complex::new(0, 0); config.block_len],
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Analyze a block outside the loop
    pub fn process_block(&mut self, block: &[Complex<i16>]) -> Result<BlockAnalysis> {
        self.analyzer.process(block)
    }

    /// Run the configured number of iterations
    ///
    /// A read that times out or fails leaves its slot empty; nothing is
    /// retried. Capture failures are counted and logged. The loop only
    /// ends early when `stop` is triggered.
    pub fn run(
        &mut self,
        source: &mut dyn SampleSource,
        reports: &mut dyn ReportSink,
        mut capture: Option<&mut dyn CaptureSink>,
        stop: &StopToken,
    ) -> ScanSummary {
        let timeout = self.config.read_timeout();
        let mut summary = ScanSummary::default();

        let expected_rate = self.analyzer.detector().sample_rate_hz();
        if (source.sample_rate() - expected_rate).abs() > f64::EPSILON * expected_rate {
            log::warn!(
                "Source rate {} Hz differs from configured {} Hz; peaks use the configured rate",
                source.sample_rate(),
                expected_rate
            );
        }

        for iteration in 0..self.config.iterations {
            if stop.is_stopped() {
                log::info!("Stop requested, ending after {} iterations", iteration);
                summary.stopped_early = true;
                break;
            }
            summary.iterations += 1;

            let count = match source.read(&mut self.block, timeout) {
                Ok(0) => {
                    log::debug!("Iteration {}: no data", iteration);
                    summary.empty_reads += 1;
                    continue;
                }
                Ok(count) => count.min(self.block.len()),
                Err(e) => {
                    log::warn!("Iteration {}: read failed: {}", iteration, e);
                    summary.read_errors += 1;
                    continue;
                }
            };
            log::debug!("Iteration {}: read {} samples", iteration, count);

            let block = &self.block[..count];
            let analysis = match self.analyzer.process(block) {
                Ok(analysis) => analysis,
                Err(e) => {
                    log::error!("Iteration {}: analysis failed: {}", iteration, e);
                    continue;
                }
            };
            summary.blocks_processed += 1;
            summary.peaks_reported += analysis.peaks.len();

            for peak in &analysis.peaks {
                log::debug!(
                    "Iteration {}: peak at bin {} ({:.1} Hz)",
                    iteration,
                    peak.bin,
                    peak.frequency_hz
                );
            }

            reports.report(&BlockReport {
                iteration,
                timestamp: Utc::now(),
                samples_read: count,
                noise_floor: analysis.noise_floor,
                threshold: analysis.threshold,
                peaks: analysis.peaks,
            });

            if let Some(sink) = capture.as_mut()
                && let Err(e) = sink.write(block)
            {
                log::error!("Iteration {}: capture failed: {}", iteration, e);
                summary.capture_failures += 1;
            }
        }

        log::info!("Scan complete: {}", summary);
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SampleRate;
    use crate::source::Cs16FileSource;
    use std::time::Duration;

    fn small_config(block_len: usize, iterations: usize) -> ScanConfig {
        ScanConfig {
            block_len,
            sample_rate: SampleRate::from_hz(block_len as f64),
            iterations,
            ..ScanConfig::default()
        }
    }

    fn tone_block(n: usize, bin: usize, amplitude: f64) -> Vec<Complex<i16>> {
        (0..n)
            .map(|i| {
                let phase = 2.0 * std::f64::consts::PI * bin as f64 * i as f64 / n as f64;
                let v = Complex64::from_polar(amplitude, phase);
                Complex::new(v.re.round() as i16, v.im.round() as i16)
            })
            .collect()
    }

    enum Step {
        Data(usize),
        Empty,
        Fail,
    }

    /// Source scripted with a fixed sequence of read results
    struct ScriptedSource {
        script: Vec<Step>,
        block: Vec<Complex<i16>>,
        calls: usize,
    }

    impl SampleSource for ScriptedSource {
        fn read(&mut self, buf: &mut [Complex<i16>], _timeout: Duration) -> Result<usize> {
            let step = self.script.get(self.calls);
            self.calls += 1;
            match step {
                Some(Step::Data(count)) => {
                    buf[..*count].copy_from_slice(&self.block[..*count]);
                    Ok(*count)
                }
                Some(Step::Fail) => Err(ScanError::Source("scripted failure".into())),
                Some(Step::Empty) | None => Ok(0),
            }
        }

        fn sample_rate(&self) -> f64 {
            64.0
        }
    }

    fn strongest(peaks: &[Peak]) -> Option<&Peak> {
        peaks
            .iter()
            .max_by(|a, b| a.magnitude.total_cmp(&b.magnitude))
    }

    struct FailingSink;

    impl CaptureSink for FailingSink {
        fn write(&mut self, _block: &[Complex<i16>]) -> Result<()> {
            Err(ScanError::Capture(std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn test_analyzer_finds_tone() {
        let config = small_config(64, 1);
        let mut analyzer = SpectrumAnalyzer::new(&config).unwrap();
        let analysis = analyzer.process(&tone_block(64, 10, 1000.0)).unwrap();

        // Residual bins below threshold can still register as local maxima;
        // the tone must be present and dominant.
        let tone = strongest(&analysis.peaks).unwrap();
        assert_eq!(tone.bin, 10);
        assert!((tone.frequency_hz - 10.0).abs() < 1e-9);
        assert!(tone.magnitude > analysis.threshold);
        assert!(analysis.threshold >= analysis.noise_floor);
        assert!(analysis.peaks.windows(2).all(|w| w[0].bin < w[1].bin));
    }

    #[test]
    fn test_analyzer_rejects_empty_block() {
        let mut analyzer = SpectrumAnalyzer::new(&small_config(8, 1)).unwrap();
        assert!(matches!(
            analyzer.process(&[]),
            Err(ScanError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_run_skips_empty_and_failed_reads() {
        let block = tone_block(64, 10, 1000.0);
        let mut source = ScriptedSource {
            script: vec![Step::Empty, Step::Empty, Step::Fail, Step::Data(64)],
            block,
            calls: 0,
        };
        let mut scanner = SpectrumScanner::new(&small_config(64, 5)).unwrap();
        let mut reports: Vec<BlockReport> = Vec::new();
        let mut captured: Vec<Vec<Complex<i16>>> = Vec::new();

        let summary = scanner.run(
            &mut source,
            &mut reports,
            Some(&mut captured),
            &StopToken::new(),
        );

        assert_eq!(summary.iterations, 5);
        assert_eq!(summary.empty_reads, 3);
        assert_eq!(summary.read_errors, 1);
        assert_eq!(summary.blocks_processed, 1);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].iteration, 3);
        assert_eq!(strongest(&reports[0].peaks).unwrap().bin, 10);
        assert_eq!(captured.len(), 1);
    }

    #[test]
    fn test_capture_failure_does_not_stop_loop() {
        let mut source = Cs16FileSource::from_samples(tone_block(32, 4, 500.0).repeat(3), 32.0);
        let mut scanner = SpectrumScanner::new(&small_config(32, 3)).unwrap();
        let mut reports: Vec<BlockReport> = Vec::new();
        let mut sink = FailingSink;

        let summary = scanner.run(&mut source, &mut reports, Some(&mut sink), &StopToken::new());

        assert_eq!(summary.blocks_processed, 3);
        assert_eq!(summary.capture_failures, 3);
        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|r| strongest(&r.peaks).unwrap().bin == 4));
    }

    #[test]
    fn test_stop_token_ends_loop() {
        let mut source = Cs16FileSource::from_samples(tone_block(16, 2, 100.0), 16.0)
            .with_looping(true);
        let mut scanner = SpectrumScanner::new(&small_config(16, 50)).unwrap();
        let mut reports: Vec<BlockReport> = Vec::new();
        let stop = StopToken::new();
        stop.stop();

        let summary = scanner.run(&mut source, &mut reports, None, &stop);
        assert!(summary.stopped_early);
        assert_eq!(summary.iterations, 0);
        assert!(reports.is_empty());
    }

    #[test]
    fn test_short_read_is_zero_padded() {
        let config = small_config(16, 1);
        let mut source = Cs16FileSource::from_samples(vec![Complex::new(100, 0); 8], 16.0);
        let mut scanner = SpectrumScanner::new(&config).unwrap();
        let mut reports: Vec<BlockReport> = Vec::new();
        let summary = scanner.run(&mut source, &mut reports, None, &StopToken::new());

        assert_eq!(summary.blocks_processed, 1);
        assert_eq!(reports[0].samples_read, 8);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(SpectrumScanner::new(&small_config(2, 1)).is_err());
    }
}
