use clap::Parser;
use rolling_stats::Stats;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use rfpeak::capture::read_cs16;
use rfpeak::config::{SampleRate, ScanConfig};
use rfpeak::signal_processing::{
    bin_frequency, bin_magnitude, fft_shift, signed_bin_frequency,
};
use rfpeak::SpectrumAnalyzer;

#[derive(Parser, Debug)]
#[command(name = "analyze_capture")]
#[command(about = "Run peak detection over CS16 captures and summarize the results", long_about = None)]
struct Args {
    /// CS16 files to analyze
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output format: text, csv, json
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Samples per block (FFT size)
    #[arg(short = 'n', long, default_value_t = 1024)]
    block_len: usize,

    /// Sample rate (e.g. "10e6", "10MHz")
    #[arg(short = 'r', long, default_value = "10MHz")]
    sample_rate: SampleRate,

    /// Detection margin above the noise floor in dB
    #[arg(short = 'm', long, default_value_t = 10.0, allow_hyphen_values = true)]
    margin_db: f64,

    /// Number of most frequently detected bins to list
    #[arg(long, default_value_t = 5)]
    top: usize,

    /// Dump the centred magnitude spectrum (dB) of one block instead of statistics
    #[arg(long)]
    spectrum: bool,

    /// Block index for --spectrum
    #[arg(long, default_value_t = 0)]
    block: usize,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Csv,
    Json,
}

#[derive(Debug, Clone, Serialize)]
struct StatsSummary {
    count: usize,
    mean: f64,
    std_dev: f64,
    min: f64,
    max: f64,
}

impl StatsSummary {
    fn from_stats(stats: &Stats<f64>) -> Option<Self> {
        if stats.count == 0 {
            return None;
        }
        Some(Self {
            count: stats.count,
            mean: stats.mean,
            std_dev: stats.std_dev,
            min: stats.min,
            max: stats.max,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct FrequentPeak {
    frequency_hz: f64,
    blocks: usize,
}

#[derive(Debug, Clone, Serialize)]
struct FileAnalysis {
    filename: String,
    sample_count: usize,
    blocks: usize,
    noise_floor: Option<StatsSummary>,
    peaks_per_block: Option<StatsSummary>,
    frequent_peaks: Vec<FrequentPeak>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct SpectrumPoint {
    frequency_hz: f64,
    magnitude_db: f64,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = ScanConfig {
        block_len: args.block_len,
        sample_rate: args.sample_rate,
        margin_db: args.margin_db,
        ..ScanConfig::default()
    };
    config.validate().context("Invalid configuration")?;

    if args.spectrum {
        for path in &args.files {
            let points = block_spectrum(path, &config, args.block)?;
            match args.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&points)?),
                OutputFormat::Text | OutputFormat::Csv => print_spectrum_csv(&points),
            }
        }
        return Ok(());
    }

    let results: Vec<FileAnalysis> = args
        .files
        .iter()
        .map(|path| analyze_file(path, &config, args.top))
        .collect();

    match args.format {
        OutputFormat::Text => print_text(&results, &config),
        OutputFormat::Csv => print_csv(&results),
        OutputFormat::Json => print_json(&results)?,
    }

    Ok(())
}

fn analyze_file(path: &PathBuf, config: &ScanConfig, top: usize) -> FileAnalysis {
    let filename = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    match analyze_file_impl(path, config, top) {
        Ok(mut analysis) => {
            analysis.filename = filename;
            analysis
        }
        Err(e) => FileAnalysis {
            filename,
            sample_count: 0,
            blocks: 0,
            noise_floor: None,
            peaks_per_block: None,
            frequent_peaks: Vec::new(),
            error: Some(format!("{:#}", e)),
        },
    }
}

fn analyze_file_impl(path: &PathBuf, config: &ScanConfig, top: usize) -> anyhow::Result<FileAnalysis> {
    let samples = read_cs16(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut analyzer = SpectrumAnalyzer::new(config)?;

    let mut floor_stats: Stats<f64> = Stats::new();
    let mut peak_count_stats: Stats<f64> = Stats::new();
    let mut bin_hits: BTreeMap<usize, usize> = BTreeMap::new();
    let mut blocks = 0;

    for block in samples.chunks(config.block_len) {
        let analysis = analyzer.process(block)?;
        blocks += 1;
        floor_stats.update(analysis.noise_floor);
        peak_count_stats.update(analysis.peaks.len() as f64);
        for peak in &analysis.peaks {
            *bin_hits.entry(peak.bin).or_default() += 1;
        }
        log::debug!(
            "Block {}: floor {:.2}, {} peaks",
            blocks - 1,
            analysis.noise_floor,
            analysis.peaks.len()
        );
    }

    let mut frequent: Vec<(usize, usize)> = bin_hits.into_iter().collect();
    frequent.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let rate = config.sample_rate.as_hz();
    let frequent_peaks = frequent
        .into_iter()
        .take(top)
        .map(|(bin, blocks)| FrequentPeak {
            frequency_hz: bin_frequency(bin, config.block_len, rate),
            blocks,
        })
        .collect();

    Ok(FileAnalysis {
        filename: String::new(),
        sample_count: samples.len(),
        blocks,
        noise_floor: StatsSummary::from_stats(&floor_stats),
        peaks_per_block: StatsSummary::from_stats(&peak_count_stats),
        frequent_peaks,
        error: None,
    })
}

fn block_spectrum(
    path: &PathBuf,
    config: &ScanConfig,
    block_index: usize,
) -> anyhow::Result<Vec<SpectrumPoint>> {
    let samples = read_cs16(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let block = samples
        .chunks(config.block_len)
        .nth(block_index)
        .with_context(|| format!("{} has no block {}", path.display(), block_index))?;

    let mut analyzer = SpectrumAnalyzer::new(config)?;
    analyzer.process(block)?;

    let n = config.block_len;
    let rate = config.sample_rate.as_hz();
    let points: Vec<SpectrumPoint> = analyzer
        .spectrum()
        .iter()
        .enumerate()
        .map(|(bin, &value)| {
            let magnitude = bin_magnitude(value);
            SpectrumPoint {
                frequency_hz: signed_bin_frequency(bin, n, rate),
                magnitude_db: if magnitude > 1e-10 {
                    20.0 * magnitude.log10()
                } else {
                    -200.0
                },
            }
        })
        .collect();

    Ok(fft_shift(&points))
}

fn print_spectrum_csv(points: &[SpectrumPoint]) {
    println!("frequency_hz,magnitude_db");
    for p in points {
        println!("{:.3},{:.3}", p.frequency_hz, p.magnitude_db);
    }
}

fn print_text(results: &[FileAnalysis], config: &ScanConfig) {
    eprintln!(
        "Block: {} samples at {}, margin {} dB",
        config.block_len, config.sample_rate, config.margin_db
    );
    eprintln!();

    println!(
        "{:<40} {:>10} {:>8} {:>12} {:>10} {:>10}",
        "File", "Samples", "Blocks", "Floor", "FloorStd", "Peaks/blk"
    );
    println!("{}", "-".repeat(95));

    for result in results {
        if let Some(ref err) = result.error {
            println!("{:<40} ERROR: {}", result.filename, err);
            continue;
        }

        let floor_mean = result
            .noise_floor
            .as_ref()
            .map(|s| format!("{:.3}", s.mean))
            .unwrap_or_else(|| "-".to_string());
        let floor_std = result
            .noise_floor
            .as_ref()
            .map(|s| format!("{:.3}", s.std_dev))
            .unwrap_or_else(|| "-".to_string());
        let peaks = result
            .peaks_per_block
            .as_ref()
            .map(|s| format!("{:.1}", s.mean))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<40} {:>10} {:>8} {:>12} {:>10} {:>10}",
            result.filename, result.sample_count, result.blocks, floor_mean, floor_std, peaks
        );
    }

    for result in results {
        if result.error.is_some() || result.frequent_peaks.is_empty() {
            continue;
        }
        eprintln!();
        eprintln!("Most frequent peaks in {}:", result.filename);
        for peak in &result.frequent_peaks {
            eprintln!(
                "  {:>14.1} Hz  in {}/{} blocks",
                peak.frequency_hz, peak.blocks, result.blocks
            );
        }
    }
}

fn print_csv(results: &[FileAnalysis]) {
    println!("filename,sample_count,blocks,floor_mean,floor_std,peaks_per_block,top_peak_hz,error");
    for result in results {
        let floor_mean = result
            .noise_floor
            .as_ref()
            .map_or(String::new(), |s| format!("{:.4}", s.mean));
        let floor_std = result
            .noise_floor
            .as_ref()
            .map_or(String::new(), |s| format!("{:.4}", s.std_dev));
        let peaks = result
            .peaks_per_block
            .as_ref()
            .map_or(String::new(), |s| format!("{:.2}", s.mean));
        let top = result
            .frequent_peaks
            .first()
            .map_or(String::new(), |p| format!("{:.1}", p.frequency_hz));
        println!(
            "{},{},{},{},{},{},{},{}",
            result.filename,
            result.sample_count,
            result.blocks,
            floor_mean,
            floor_std,
            peaks,
            top,
            result.error.as_deref().unwrap_or("")
        );
    }
}

fn print_json(results: &[FileAnalysis]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    println!("{}", json);
    Ok(())
}
