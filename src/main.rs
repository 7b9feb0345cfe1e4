use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use num_complex::Complex;

use rfpeak::capture::{CaptureSink, Cs16FileSink, read_cs16};
use rfpeak::config::{CaptureMode, SampleRate, ScanConfig};
use rfpeak::output::{OutputFormat, WriterSink, create_formatter};
use rfpeak::source::{ChannelSource, Cs16FileSource, SampleSource};
use rfpeak::{SpectrumScanner, StopToken};

#[derive(Parser, Debug)]
#[command(name = "rfpeak")]
#[command(about = "Detect spectral peaks in a streamed IQ signal", long_about = None)]
struct Args {
    /// CS16 file to replay as the sample source
    input: Option<PathBuf>,

    /// TOML configuration file (command line flags override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Replay the input at the stream's sample rate from a driver thread
    #[arg(long)]
    realtime: bool,

    /// Restart the input file when it runs out
    #[arg(long)]
    loop_input: bool,

    /// Synthesize the stream instead of reading a file (tone frequencies in Hz)
    #[cfg(feature = "simulation")]
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    simulate: Option<Vec<f64>>,

    /// Tone amplitude for --simulate, in ADC counts
    #[cfg(feature = "simulation")]
    #[arg(long, default_value_t = 1000.0)]
    tone_amplitude: f64,

    /// Gaussian noise standard deviation for --simulate, in ADC counts
    #[cfg(feature = "simulation")]
    #[arg(long, default_value_t = 10.0)]
    noise_std: f64,

    /// Seed for --simulate
    #[cfg(feature = "simulation")]
    #[arg(long)]
    seed: Option<u64>,

    /// Make every n-th simulated read return no data
    #[cfg(feature = "simulation")]
    #[arg(long)]
    dropout_every: Option<usize>,

    /// Samples per block (FFT size)
    #[arg(short = 'n', long)]
    block_len: Option<usize>,

    /// Sample rate (e.g. "10e6", "10MHz", "2.4msps")
    #[arg(short = 'r', long)]
    sample_rate: Option<SampleRate>,

    /// Detection margin above the noise floor in dB
    #[arg(short = 'm', long, allow_hyphen_values = true)]
    margin_db: Option<f64>,

    /// Number of acquisition iterations
    #[arg(short, long)]
    iterations: Option<usize>,

    /// Read timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Raw block capture file
    #[arg(long)]
    capture: Option<PathBuf>,

    /// Capture mode: latest, append
    #[arg(long, value_enum)]
    capture_mode: Option<CaptureMode>,

    /// Disable raw block capture
    #[arg(long)]
    no_capture: bool,

    /// Output format: text, json, csv
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = build_config(&args)?;

    let mut source = open_source(&args, &config)?;

    let mut capture_sink = if config.capture.enabled {
        Some(
            Cs16FileSink::from_config(&config.capture).with_context(|| {
                format!("Failed to open capture file {}", config.capture.path.display())
            })?,
        )
    } else {
        None
    };

    let mut reports = WriterSink::new(
        create_formatter(args.format, args.verbose > 0),
        std::io::stdout().lock(),
    );

    let mut scanner = SpectrumScanner::new(&config).context("Failed to set up scanner")?;
    let stop = StopToken::new();

    let summary = scanner.run(
        source.as_mut(),
        &mut reports,
        capture_sink.as_mut().map(|s| s as &mut dyn CaptureSink),
        &stop,
    );

    if args.verbose > 0 {
        eprintln!("{}", summary);
    }
    eprintln!("Done");

    Ok(())
}

fn build_config(args: &Args) -> Result<ScanConfig> {
    let mut config = match &args.config {
        Some(path) => ScanConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ScanConfig::default(),
    };

    if let Some(n) = args.block_len {
        config.block_len = n;
    }
    if let Some(rate) = args.sample_rate {
        config.sample_rate = rate;
    }
    if let Some(margin) = args.margin_db {
        config.margin_db = margin;
    }
    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }
    if let Some(timeout) = args.timeout_ms {
        config.read_timeout_ms = timeout;
    }
    if let Some(path) = &args.capture {
        config.capture.path = path.clone();
    }
    if let Some(mode) = args.capture_mode {
        config.capture.mode = mode;
    }
    if args.no_capture {
        config.capture.enabled = false;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn open_source(args: &Args, config: &ScanConfig) -> Result<Box<dyn SampleSource>> {
    let rate = config.sample_rate.as_hz();

    if let Some(source) = simulated_source(args, rate)? {
        return Ok(source);
    }

    let path = args
        .input
        .as_ref()
        .context("No sample source: pass a CS16 input file")?;

    if args.realtime {
        let samples =
            read_cs16(path).with_context(|| format!("Failed to read {}", path.display()))?;
        return Ok(Box::new(spawn_replay_driver(
            samples,
            config.block_len,
            rate,
            args.loop_input,
        )));
    }

    let source = Cs16FileSource::open(path, rate)
        .with_context(|| format!("Failed to read {}", path.display()))?
        .with_looping(args.loop_input);
    Ok(Box::new(source))
}

#[cfg(feature = "simulation")]
fn simulated_source(args: &Args, rate: f64) -> Result<Option<Box<dyn SampleSource>>> {
    use rfpeak::simulation::{SimulatedSource, SimulationConfig};

    let Some(tones) = &args.simulate else {
        return Ok(None);
    };
    let mut sim = tones.iter().fold(
        SimulationConfig::default().with_noise(args.noise_std),
        |sim, &hz| sim.with_tone(hz, args.tone_amplitude),
    );
    sim.seed = args.seed;
    sim.dropout_every = args.dropout_every;
    Ok(Some(Box::new(SimulatedSource::new(sim, rate)?)))
}

#[cfg(not(feature = "simulation"))]
fn simulated_source(_args: &Args, _rate: f64) -> Result<Option<Box<dyn SampleSource>>> {
    Ok(None)
}

/// Push file blocks into a channel at the stream's real-time pace
fn spawn_replay_driver(
    samples: Vec<Complex<i16>>,
    block_len: usize,
    sample_rate: f64,
    looping: bool,
) -> ChannelSource {
    let (tx, source) = ChannelSource::bounded(10, sample_rate);
    let block_period = Duration::from_secs_f64(block_len as f64 / sample_rate);

    thread::spawn(move || {
        loop {
            for chunk in samples.chunks(block_len) {
                thread::sleep(block_period);
                if tx.send(chunk.to_vec()).is_err() {
                    log::debug!("Replay receiver dropped");
                    return;
                }
            }
            if !looping || samples.is_empty() {
                log::info!("Replay finished");
                return;
            }
        }
    });

    source
}
