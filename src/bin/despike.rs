//! despike - spectral spike detection and correction CLI
//!
//! Command-line interface for composable spike detection and correction.

use clap::{Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use spectral_despike::algorithm::AlgorithmRegistry;
use spectral_despike::analyze::analyze_spikes;
use spectral_despike::benchmark::{benchmark_registry, generate_synthetic, SyntheticConfig};
use spectral_despike::correct::{
    add_spike, spikes_drop, spikes_fix_interp, spikes_multi_spike_fix, spikes_only,
    FailurePolicy, InterpKind, MultiSpikeParams,
};
use spectral_despike::data::Spectrum;
use spectral_despike::error::{DespikeError, Result};
use spectral_despike::pipeline::{Pipeline, PipelineConfig};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// CLI-friendly interpolation kernel enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliInterpKind {
    Linear,
    Quadratic,
    Cubic,
}

impl From<CliInterpKind> for InterpKind {
    fn from(kind: CliInterpKind) -> Self {
        match kind {
            CliInterpKind::Linear => InterpKind::Linear,
            CliInterpKind::Quadratic => InterpKind::Quadratic,
            CliInterpKind::Cubic => InterpKind::Cubic,
        }
    }
}

/// How flagged samples are corrected
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFixMode {
    /// Remove flagged samples from axis and signal
    Drop,
    /// Interpolate over flagged samples from all clean samples
    Interp,
    /// Repair each flagged sample from a window of clean neighbours
    Multi,
    /// Keep only the spikes: signal minus its spike-free interpolation
    Only,
}

/// Synthetic benchmark presets
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliPreset {
    /// Noise-free lines with tall single-sample spikes
    Clean,
    /// Noisy lines with moderate spikes
    Noisy,
    /// Two-sample spikes
    Double,
}

impl CliPreset {
    fn config(self) -> SyntheticConfig {
        match self {
            CliPreset::Clean => SyntheticConfig::clean(),
            CliPreset::Noisy => SyntheticConfig::noisy(),
            CliPreset::Double => SyntheticConfig::double(),
        }
    }
}

/// Spike detection and correction for 1-D spectra
#[derive(Parser)]
#[command(name = "despike")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered detection algorithms
    Algorithms,

    /// Detect spikes in a spectrum
    Detect {
        /// Path to spectrum TSV (columns x, y)
        #[arg(short, long)]
        input: PathBuf,

        /// Detection algorithm
        #[arg(short, long, default_value = "gg_1spike")]
        method: String,

        /// Threshold (default: the algorithm's own)
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Detect and correct spikes in a spectrum
    Fix {
        /// Path to spectrum TSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the corrected spectrum TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Detection algorithm
        #[arg(short, long, default_value = "gg_1spike")]
        method: String,

        /// Threshold (default: the algorithm's own)
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Correction mode
        #[arg(long, value_enum, default_value = "interp")]
        mode: CliFixMode,

        /// Interpolation kernel
        #[arg(long, value_enum, default_value = "linear")]
        kind: CliInterpKind,

        /// Window half-width for the multi mode
        #[arg(long, default_value = "10")]
        window: usize,

        /// Leave unrepairable samples instead of failing (multi mode)
        #[arg(long)]
        skip_failures: bool,
    },

    /// Run a pipeline from a YAML configuration file on one or more spectra
    Run {
        /// Path to pipeline configuration YAML
        #[arg(short, long)]
        config: PathBuf,

        /// Output directory for corrected spectra and results
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Spectrum TSV files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Inject a synthetic spike into a spectrum
    Inject {
        /// Path to spectrum TSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the spiked spectrum TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Axis location of the spike centre
        #[arg(short, long)]
        location: f64,

        /// Values to add, comma separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        values: Vec<f64>,
    },

    /// Generate an example pipeline configuration
    Example {
        /// Output path for the example YAML
        #[arg(short, long, default_value = "pipeline.yaml")]
        output: PathBuf,
    },

    /// Benchmark every algorithm on synthetic spectra
    Benchmark {
        /// Synthetic data preset
        #[arg(short, long, value_enum, default_value = "noisy")]
        preset: CliPreset,

        /// Number of spectra to generate
        #[arg(short = 'n', long, default_value = "5")]
        replicates: usize,

        /// Random seed (default: 42)
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Position tolerance in samples
        #[arg(long, default_value = "1")]
        tolerance: usize,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Algorithms => cmd_algorithms(),

        Commands::Detect {
            input,
            method,
            threshold,
            format,
        } => cmd_detect(&input, &method, threshold, &format),

        Commands::Fix {
            input,
            output,
            method,
            threshold,
            mode,
            kind,
            window,
            skip_failures,
        } => cmd_fix(
            &input,
            &output,
            &method,
            threshold,
            mode,
            kind.into(),
            window,
            skip_failures,
        ),

        Commands::Run {
            config,
            output_dir,
            inputs,
        } => cmd_run(&config, &output_dir, &inputs),

        Commands::Inject {
            input,
            output,
            location,
            values,
        } => cmd_inject(&input, &output, location, &values),

        Commands::Example { output } => cmd_example(&output),

        Commands::Benchmark {
            preset,
            replicates,
            seed,
            tolerance,
            format,
        } => cmd_benchmark(preset, replicates, seed, tolerance, &format),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// List registered algorithms
fn cmd_algorithms() -> Result<()> {
    let registry = AlgorithmRegistry::builtin()?;
    println!("{:<28} {:>10}  Description", "Name", "Threshold");
    println!("{}", "-".repeat(80));
    for algorithm in registry.iter() {
        println!(
            "{:<28} {:>10}  {}",
            algorithm.name(),
            algorithm.default_threshold(),
            algorithm.description()
        );
    }
    Ok(())
}

/// Detect spikes and print a report
fn cmd_detect(input: &Path, method: &str, threshold: Option<f64>, format: &str) -> Result<()> {
    let registry = AlgorithmRegistry::builtin()?;
    eprintln!("Loading spectrum from {:?}...", input);
    let spectrum = Spectrum::from_tsv(input)?;
    eprintln!("Loaded {} samples", spectrum.len());

    let report = analyze_spikes(&registry, &spectrum, method, threshold)?;
    match format {
        "json" => println!("{}", report.to_named_results().to_json()?),
        _ => print!("{}", report),
    }
    Ok(())
}

/// Detect and correct spikes
#[allow(clippy::too_many_arguments)]
fn cmd_fix(
    input: &Path,
    output: &Path,
    method: &str,
    threshold: Option<f64>,
    mode: CliFixMode,
    kind: InterpKind,
    window: usize,
    skip_failures: bool,
) -> Result<()> {
    let registry = AlgorithmRegistry::builtin()?;
    eprintln!("Loading spectrum from {:?}...", input);
    let spectrum = Spectrum::from_tsv(input)?;

    eprintln!("Correcting with {} ({:?})...", method, mode);
    let corrected = match mode {
        CliFixMode::Drop => spikes_drop(&registry, &spectrum, method, threshold)?,
        CliFixMode::Interp => spikes_fix_interp(&registry, &spectrum, method, threshold, kind)?,
        CliFixMode::Only => spikes_only(&registry, &spectrum, method, threshold)?,
        CliFixMode::Multi => {
            let policy = if skip_failures {
                FailurePolicy::Skip
            } else {
                FailurePolicy::Abort
            };
            let params = MultiSpikeParams::default()
                .with_window(window)
                .with_kind(kind)
                .with_policy(policy);
            let fix = spikes_multi_spike_fix(&registry, &spectrum, method, threshold, &params)?;
            eprintln!(
                "  {} flagged, {} left uncorrected",
                fix.flagged.len(),
                fix.skipped.len()
            );
            fix.spectrum
        }
    };

    eprintln!("Writing corrected spectrum to {:?}...", output);
    corrected.to_tsv(output)?;
    eprintln!("Done! {} -> {} samples", spectrum.len(), corrected.len());
    Ok(())
}

/// Output file stem for each input; two inputs may not share one.
fn output_stems(inputs: &[PathBuf]) -> Result<Vec<String>> {
    let mut seen: BTreeMap<String, &Path> = BTreeMap::new();
    let mut stems = Vec::with_capacity(inputs.len());
    for input in inputs {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "spectrum".to_string());
        if let Some(previous) = seen.insert(stem.clone(), input) {
            return Err(DespikeError::InvalidInput(format!(
                "{:?} and {:?} would both write '{}' outputs",
                previous, input, stem
            )));
        }
        stems.push(stem);
    }
    Ok(stems)
}

/// Run a pipeline from configuration over every input
fn cmd_run(config_path: &Path, output_dir: &Path, inputs: &[PathBuf]) -> Result<()> {
    eprintln!("Loading pipeline configuration from {:?}...", config_path);
    let config_str = std::fs::read_to_string(config_path)?;
    let config = PipelineConfig::from_yaml(&config_str)?;

    let registry = AlgorithmRegistry::builtin()?;
    let pipeline = Pipeline::from_config(&config);
    pipeline.validate(&registry)?;
    let stems = output_stems(inputs)?;
    std::fs::create_dir_all(output_dir)?;

    eprintln!(
        "Running pipeline '{}' on {} spectra...",
        config.name,
        inputs.len()
    );
    let summaries = inputs
        .par_iter()
        .zip(stems.into_par_iter())
        .map(|(input, stem)| -> Result<(String, usize, usize)> {
            let spectrum = Spectrum::from_tsv(input)?;
            let output = pipeline.run(&registry, &spectrum)?;

            output
                .spectrum
                .to_tsv(output_dir.join(format!("{}.despiked.tsv", stem)))?;
            std::fs::write(
                output_dir.join(format!("{}.results.json", stem)),
                output.results.to_json()?,
            )?;
            Ok((stem, spectrum.len(), output.spectrum.len()))
        })
        .collect::<Result<Vec<_>>>()?;

    for (stem, before, after) in &summaries {
        eprintln!("  {}: {} -> {} samples", stem, before, after);
    }
    eprintln!("Done! Results written to {:?}", output_dir);
    Ok(())
}

/// Inject a spike
fn cmd_inject(input: &Path, output: &Path, location: f64, values: &[f64]) -> Result<()> {
    let spectrum = Spectrum::from_tsv(input)?;
    let (spiked, injection) = add_spike(&spectrum, location, values)?;
    spiked.to_tsv(output)?;
    eprintln!(
        "Injected {} values at index {} (x = {})",
        values.len(),
        injection.index,
        spectrum.x()[injection.index]
    );
    println!("{}", injection.to_named_results().to_json()?);
    Ok(())
}

/// Generate example pipeline configuration
fn cmd_example(output_path: &Path) -> Result<()> {
    let pipeline = Pipeline::new()
        .name("example-despike")
        .detect("gg_lr_n2o1_n2o2_and", None)
        .multi_spike_fix(
            "gg_lr_n2o1_n2o2_and",
            None,
            MultiSpikeParams::default()
                .with_window(10)
                .with_policy(FailurePolicy::Skip),
        )
        .fix_interp("gg_1spike", None, InterpKind::Linear);

    let config = pipeline.to_config(Some(
        "Example pipeline: windowed repair of regression-detected spikes, \
         then a single-spike sweep",
    ));
    let yaml = config.to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example pipeline to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);

    Ok(())
}

/// Benchmark every registered algorithm on synthetic spectra
fn cmd_benchmark(
    preset: CliPreset,
    replicates: usize,
    seed: u64,
    tolerance: usize,
    format: &str,
) -> Result<()> {
    let registry = AlgorithmRegistry::builtin()?;
    eprintln!("Generating {} synthetic spectra ({:?})...", replicates, preset);
    let data = (0..replicates as u64)
        .map(|r| generate_synthetic(&preset.config().with_seed(seed.wrapping_add(r))))
        .collect::<Result<Vec<_>>>()?;

    let results = benchmark_registry(&registry, &data, tolerance)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&results)?),
        _ => {
            println!(
                "{:<28} {:>6} {:>6} {:>6} {:>9} {:>9} {:>7} {:>10}",
                "Method", "TP", "FP", "FN", "Precision", "Recall", "F1", "RMSE after"
            );
            println!("{}", "-".repeat(90));
            for r in &results {
                let rmse = r
                    .rmse_after
                    .map(|v| format!("{:.3}", v))
                    .unwrap_or_else(|| "n/a".to_string());
                println!(
                    "{:<28} {:>6} {:>6} {:>6} {:>8.1}% {:>8.1}% {:>7.3} {:>10}",
                    r.method,
                    r.true_positives,
                    r.false_positives,
                    r.false_negatives,
                    r.precision * 100.0,
                    r.recall * 100.0,
                    r.f1_score,
                    rmse
                );
            }
            if let Some(best) = results
                .iter()
                .max_by(|a, b| a.f1_score.total_cmp(&b.f1_score))
            {
                println!();
                println!("Best F1: {} ({:.3})", best.method, best.f1_score);
            }
        }
    }
    Ok(())
}
