mod test_signals;

use std::thread;

use approx::assert_relative_eq;
use num_complex::Complex;

use rfpeak::capture::{Cs16FileSink, read_cs16};
use rfpeak::config::{CaptureMode, SampleRate, ScanConfig};
use rfpeak::output::{BlockReport, OutputFormat, WriterSink, create_formatter};
use rfpeak::simulation::{SimulatedSource, SimulationConfig};
use rfpeak::source::{ChannelSource, Cs16FileSource};
use rfpeak::{SpectrumScanner, StopToken};

const N: usize = 256;
const RATE: f64 = 256_000.0;

fn scan_config(iterations: usize) -> ScanConfig {
    ScanConfig {
        block_len: N,
        sample_rate: SampleRate::from_hz(RATE),
        iterations,
        read_timeout_ms: 1000,
        ..ScanConfig::default()
    }
}

fn distinct_blocks(count: usize) -> Vec<Vec<Complex<i16>>> {
    (0..count)
        .map(|k| test_signals::tone_block(N, &[(10 + 7 * k, 1000.0)]))
        .collect()
}

#[test]
fn test_every_read_empty_completes_all_iterations() {
    let sim = SimulationConfig::default()
        .with_seed(1)
        .with_tone(40_000.0, 1000.0)
        .with_dropout_every(1);
    let mut source = SimulatedSource::new(sim, RATE).unwrap();
    let mut scanner = SpectrumScanner::new(&scan_config(25)).unwrap();
    let mut reports: Vec<BlockReport> = Vec::new();

    let summary = scanner.run(&mut source, &mut reports, None, &StopToken::new());

    assert_eq!(summary.iterations, 25);
    assert_eq!(summary.empty_reads, 25);
    assert_eq!(summary.blocks_processed, 0);
    assert!(!summary.stopped_early);
    assert!(reports.is_empty());
    assert_eq!(source.reads(), 25);
}

#[test]
fn test_dropouts_skip_only_their_slot() {
    // 40 kHz at 1 kHz per bin
    let sim = SimulationConfig::default()
        .with_seed(7)
        .with_tone(40_000.0, 1000.0)
        .with_noise(5.0)
        .with_dropout_every(2);
    let mut source = SimulatedSource::new(sim, RATE).unwrap();
    let mut scanner = SpectrumScanner::new(&scan_config(10)).unwrap();
    let mut reports: Vec<BlockReport> = Vec::new();

    let summary = scanner.run(&mut source, &mut reports, None, &StopToken::new());

    assert_eq!(summary.iterations, 10);
    assert_eq!(summary.empty_reads, 5);
    assert_eq!(summary.blocks_processed, 5);

    let iterations: Vec<usize> = reports.iter().map(|r| r.iteration).collect();
    assert_eq!(iterations, vec![0, 2, 4, 6, 8]);
    for report in &reports {
        let top = test_signals::strongest(&report.peaks, 1);
        assert_eq!(top[0].bin, 40);
        assert_relative_eq!(top[0].frequency_hz, 40_000.0);
    }
}

#[test]
fn test_latest_capture_holds_last_block() {
    let blocks = distinct_blocks(3);
    let mut source = Cs16FileSource::from_samples(blocks.concat(), RATE);
    let path = test_signals::temp_path("latest.cs16");
    let mut sink = Cs16FileSink::new(&path, CaptureMode::Latest).unwrap();
    let mut scanner = SpectrumScanner::new(&scan_config(3)).unwrap();
    let mut reports: Vec<BlockReport> = Vec::new();

    let summary = scanner.run(&mut source, &mut reports, Some(&mut sink), &StopToken::new());

    assert_eq!(summary.blocks_processed, 3);
    assert_eq!(summary.capture_failures, 0);
    assert_eq!(read_cs16(&path).unwrap(), blocks[2]);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_append_capture_holds_every_block() {
    let blocks = distinct_blocks(4);
    let mut source = Cs16FileSource::from_samples(blocks.concat(), RATE);
    let path = test_signals::temp_path("append.cs16");
    let mut scanner = SpectrumScanner::new(&scan_config(6)).unwrap();
    let mut reports: Vec<BlockReport> = Vec::new();

    {
        let mut sink = Cs16FileSink::new(&path, CaptureMode::Append).unwrap();
        let summary =
            scanner.run(&mut source, &mut reports, Some(&mut sink), &StopToken::new());
        assert_eq!(summary.blocks_processed, 4);
        assert_eq!(summary.empty_reads, 2);
    }

    assert_eq!(read_cs16(&path).unwrap(), blocks.concat());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_short_final_block_captured_unpadded() {
    let mut samples = distinct_blocks(1).concat();
    samples.extend(test_signals::tone_block(N / 4, &[(3, 500.0)]));
    let mut source = Cs16FileSource::from_samples(samples, RATE);
    let mut captured: Vec<Vec<Complex<i16>>> = Vec::new();
    let mut scanner = SpectrumScanner::new(&scan_config(2)).unwrap();
    let mut reports: Vec<BlockReport> = Vec::new();

    scanner.run(&mut source, &mut reports, Some(&mut captured), &StopToken::new());

    assert_eq!(captured.len(), 2);
    assert_eq!(captured[1].len(), N / 4);
    assert_eq!(reports[1].samples_read, N / 4);
}

#[test]
fn test_channel_source_driven_by_thread() {
    let blocks = distinct_blocks(4);
    let (tx, mut source) = ChannelSource::bounded(2, RATE);
    let driver_blocks = blocks.clone();
    let driver = thread::spawn(move || {
        for block in driver_blocks {
            tx.send(block).unwrap();
        }
    });

    let mut scanner = SpectrumScanner::new(&scan_config(6)).unwrap();
    let mut reports: Vec<BlockReport> = Vec::new();
    let summary = scanner.run(&mut source, &mut reports, None, &StopToken::new());
    driver.join().unwrap();

    // Once the driver hangs up the remaining slots fail to read
    assert_eq!(summary.blocks_processed, 4);
    assert_eq!(summary.read_errors, 2);
    for (k, report) in reports.iter().enumerate() {
        let top = test_signals::strongest(&report.peaks, 1);
        assert_eq!(top[0].bin, 10 + 7 * k);
    }
}

#[test]
fn test_stop_token_ends_run_before_first_iteration() {
    let mut source = Cs16FileSource::from_samples(distinct_blocks(2).concat(), RATE);
    let mut scanner = SpectrumScanner::new(&scan_config(10)).unwrap();
    let mut reports: Vec<BlockReport> = Vec::new();
    let stop = StopToken::new();
    stop.clone().stop();

    let summary = scanner.run(&mut source, &mut reports, None, &stop);

    assert!(summary.stopped_early);
    assert_eq!(summary.iterations, 0);
    assert!(reports.is_empty());
}

#[test]
fn test_csv_output_through_writer_sink() {
    let mut source = Cs16FileSource::from_samples(distinct_blocks(2).concat(), RATE);
    let mut scanner = SpectrumScanner::new(&scan_config(2)).unwrap();
    let mut sink = WriterSink::new(create_formatter(OutputFormat::Csv, false), Vec::new());

    scanner.run(&mut source, &mut sink, None, &StopToken::new());

    let out = String::from_utf8(sink.into_inner()).unwrap();
    let mut lines = out.lines();
    assert_eq!(
        lines.next(),
        Some("ts,iteration,bin,frequency_hz,magnitude,noise_floor,threshold")
    );
    assert!(lines.any(|l| l.contains(",0,10,10000.000,")));
}

#[test]
fn test_config_file_drives_scanner() {
    let path = test_signals::temp_path("scan.toml");
    std::fs::write(
        &path,
        r#"
block_len = 128
sample_rate = "128ksps"
margin_db = 6.0
iterations = 3

[capture]
enabled = false
"#,
    )
    .unwrap();

    let config = ScanConfig::from_toml_file(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(config.block_len, 128);
    assert_relative_eq!(config.sample_rate.as_hz(), 128_000.0);
    assert!(!config.capture.enabled);

    let block = test_signals::tone_block(128, &[(32, 2000.0)]);
    let mut source = Cs16FileSource::from_samples(block, config.sample_rate.as_hz());
    let mut scanner = SpectrumScanner::new(&config).unwrap();
    let mut reports: Vec<BlockReport> = Vec::new();
    let summary = scanner.run(&mut source, &mut reports, None, &StopToken::new());

    assert_eq!(summary.iterations, 3);
    assert_eq!(summary.blocks_processed, 1);
    assert_eq!(summary.empty_reads, 2);
    let top = test_signals::strongest(&reports[0].peaks, 1);
    assert_relative_eq!(top[0].frequency_hz, 32_000.0);
}
