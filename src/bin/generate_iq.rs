use anyhow::{Context, Result};
use clap::Parser;
use rfpeak::capture::write_cs16;
use rfpeak::config::SampleRate;
use rfpeak::simulation::{SimulationConfig, generate_iq};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "generate_iq")]
#[command(about = "Generate synthetic CS16 captures with tones and noise for peak detection testing")]
struct Args {
    /// TOML simulation file (seed, tones, noise_std)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output CS16 file
    #[arg(short, long, default_value = "data/synthetic.cs16")]
    output: PathBuf,

    /// Number of samples to generate
    #[arg(short = 'n', long, default_value_t = 102_400)]
    samples: usize,

    /// Sample rate (e.g. "10e6", "10MHz")
    #[arg(short = 'r', long, default_value = "10MHz")]
    sample_rate: SampleRate,

    /// Tone frequencies in Hz, comma-separated (CLI override)
    #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
    tones: Option<Vec<f64>>,

    /// Tone amplitude in ADC counts for --tones
    #[arg(long, default_value_t = 1000.0)]
    amplitude: f64,

    /// Noise standard deviation in ADC counts (CLI override)
    #[arg(long)]
    noise_std: Option<f64>,

    /// Seed for reproducibility (CLI override)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Write <output>.json describing the generated stream
    #[arg(long)]
    manifest: bool,
}

#[derive(Debug, serde::Serialize)]
struct ToneEntry {
    frequency_hz: f64,
    amplitude: f64,
}

#[derive(Debug, serde::Serialize)]
struct Manifest {
    file: String,
    sample_rate: f64,
    samples: usize,
    seed: Option<u64>,
    noise_std: f64,
    tones: Vec<ToneEntry>,
}

fn load_toml_config(path: &PathBuf) -> Result<SimulationConfig> {
    let content = fs::read_to_string(path).context("Failed to read config file")?;
    toml::from_str(&content).context("Failed to parse config file")
}

fn build_simulation_config(args: &Args) -> Result<SimulationConfig> {
    let mut config = match args.config {
        Some(ref path) => load_toml_config(path)?,
        None => SimulationConfig::default(),
    };

    if let Some(ref tones) = args.tones {
        config.tones.clear();
        config = tones
            .iter()
            .fold(config, |c, &hz| c.with_tone(hz, args.amplitude));
    }
    if let Some(noise_std) = args.noise_std {
        config.noise_std = noise_std;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = build_simulation_config(&args)?;
    let sample_rate = args.sample_rate.as_hz();

    if let Some(parent) = args.output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }

    let samples = generate_iq(args.samples, sample_rate, &config)?;

    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    let mut writer = BufWriter::new(file);
    write_cs16(&mut writer, &samples).context("Failed to write samples")?;
    writer.flush()?;

    println!(
        "Wrote {} samples ({} tones, noise σ={}) to {}",
        samples.len(),
        config.tones.len(),
        config.noise_std,
        args.output.display()
    );

    if args.manifest {
        let manifest = Manifest {
            file: args.output.display().to_string(),
            sample_rate,
            samples: samples.len(),
            seed: config.seed,
            noise_std: config.noise_std,
            tones: config
                .tones
                .iter()
                .map(|t| ToneEntry {
                    frequency_hz: t.frequency_hz,
                    amplitude: t.amplitude,
                })
                .collect(),
        };
        let manifest_path = args.output.with_extension("json");
        let json =
            serde_json::to_string_pretty(&manifest).context("Failed to serialize manifest")?;
        fs::write(&manifest_path, json).context("Failed to write manifest")?;
        println!("Manifest: {}", manifest_path.display());
    }

    Ok(())
}
