/// exg-ransac: find (and optionally repair) bad channels in an epochs file.
///
/// Input is a safetensors file as described in `exg_ransac::io`.  Writes a
/// JSON report and, with `--output`, a safetensors file holding
///   corr       [E, C]     F64  consensus correlations
///   bad_log    [E, C]     I32  1 where RANSAC-bad
///   bad_chs    bytes      U8   newline-separated names
///   data …                     repaired epochs (same layout as the input)
///
/// Set `RUST_LOG=debug` for per-stage logging.
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use exg_ransac::{io, Ransac, RansacConfig, DEFAULT_RANDOM_STATE};

#[derive(Parser, Debug)]
#[command(name = "exg-ransac", about = "RANSAC bad-channel detection for EEG/MEG epochs")]
struct Args {
    /// Input epochs.safetensors.
    #[arg(long)]
    input: PathBuf,

    /// JSON report path.
    #[arg(long)]
    report: PathBuf,

    /// Results safetensors path (correlations, bad log, repaired data).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Epoch length in samples when the input is continuous [C, T] data.
    #[arg(long)]
    epoch_samples: Option<usize>,

    /// Number of random channel subsets.
    #[arg(long, default_value_t = 50)]
    n_resample: usize,

    /// Fraction of channels in each subset.
    #[arg(long, default_value_t = 0.25)]
    min_channels: f64,

    /// Correlation below which a channel is bad in an epoch.
    #[arg(long, default_value_t = 0.75)]
    min_corr: f64,

    /// Fraction of bad epochs above which a channel is flagged.
    #[arg(long, default_value_t = 0.4)]
    unbroken_time: f64,

    /// Worker threads (-1 = all cores).
    #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
    n_jobs: i32,

    /// Sampler seed.
    #[arg(long, default_value_t = DEFAULT_RANDOM_STATE)]
    seed: u64,

    /// Seed the sampler from the OS instead of --seed.
    #[arg(long)]
    unseeded: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let epochs = io::load_epochs(&args.input, args.epoch_samples)
        .with_context(|| format!("loading {}", args.input.display()))?;
    info!(
        n_epochs = epochs.n_epochs(),
        n_channels = epochs.n_channels(),
        n_times = epochs.n_times(),
        "loaded epochs"
    );

    let cfg = RansacConfig {
        n_resample: args.n_resample,
        min_channels: args.min_channels,
        min_corr: args.min_corr,
        unbroken_time: args.unbroken_time,
        n_jobs: args.n_jobs,
        random_state: (!args.unseeded).then_some(args.seed),
    };

    let mut ransac = Ransac::new(cfg.clone());
    ransac.fit(&epochs)?;
    let fitted = ransac.fitted()?;
    println!("Bad channels: {}", if fitted.bad_chs.is_empty() {
        "none".to_string()
    } else {
        fitted.bad_chs.join(", ")
    });

    io::write_report(&args.report, &cfg, fitted, &epochs.info.ch_names())?;
    info!(path = %args.report.display(), "wrote report");

    if let Some(out) = &args.output {
        let repaired = ransac.transform(&epochs)?;
        io::write_results(out, fitted, Some(&repaired))?;
        info!(path = %out.display(), "wrote results");
    }

    Ok(())
}
