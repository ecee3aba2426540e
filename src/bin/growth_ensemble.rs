use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use surface_growth::output::{write_checkpoints_csv, write_summary_json, write_trajectory_csv};
use surface_growth::{
    create_timestamped_output_dir, DepositionModel, EnsembleAggregator, EnsembleRecord, Field,
    GrowthConfig, GrowthTrajectory,
};

/// Ensemble runs of stochastic surface growth with log-log scaling fits
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration; falls back to ./config.json, then built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    size_x: Option<usize>,

    #[arg(long)]
    size_y: Option<usize>,

    /// Number of independent runs in the ensemble
    #[arg(long)]
    systems: Option<usize>,

    /// Worker threads; 0 runs sequentially
    #[arg(long)]
    threads: Option<usize>,

    /// Particles dropped per growth step (defaults to one full layer)
    #[arg(long)]
    deposition_per_iteration: Option<usize>,

    /// Stop once this many layers have been deposited
    #[arg(long)]
    nl_total: Option<f64>,

    /// Deposition rule: random or ballistic
    #[arg(long)]
    model: Option<DepositionModel>,

    /// Root directory for timestamped run output
    #[arg(short, long, default_value = "output-surface-growth")]
    output: PathBuf,

    /// Grow one trajectory instead of an ensemble
    #[arg(long)]
    single: bool,
}

impl Args {
    fn apply(&self, config: &mut GrowthConfig) {
        if let Some(size_x) = self.size_x {
            config.size_x = size_x;
        }
        if let Some(size_y) = self.size_y {
            config.size_y = size_y;
        }
        if let Some(systems) = self.systems {
            config.systems = systems;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if self.deposition_per_iteration.is_some() {
            config.deposition_per_iteration = self.deposition_per_iteration;
        }
        if let Some(nl_total) = self.nl_total {
            config.nl_total = nl_total;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("surface_growth=info,growth_ensemble=info")),
        )
        .init();

    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    info!(
        size_x = config.size_x,
        size_y = config.size_y,
        systems = config.systems,
        threads = config.threads,
        model = config.model.name(),
        nl_total = config.nl_total,
        "configuration loaded"
    );

    let output_dir = create_timestamped_output_dir(&args.output)?;
    if args.single {
        run_single(&config, &output_dir)?;
    } else {
        run_ensemble(&config, &output_dir)?;
    }

    println!("Output directory: {}", output_dir.display());
    Ok(())
}

fn run_single(config: &GrowthConfig, output_dir: &Path) -> Result<()> {
    let strategy = config.model.strategy::<i64>();
    let mut trajectory = GrowthTrajectory::<i64, f64>::new(config.seed_surface());
    trajectory.run(config.deposition_per_iteration(), config.nl_total, &*strategy)?;

    let fit = trajectory.loglog_fit();
    println!(
        "width exponent (beta): {:.4}",
        fit.slope.value(Field::Width)
    );

    write_trajectory_csv(&output_dir.join("trajectory.csv"), &trajectory)?;
    Ok(())
}

fn run_ensemble(config: &GrowthConfig, output_dir: &Path) -> Result<()> {
    let strategy = config.model.strategy::<i64>();
    let mut ensemble =
        EnsembleAggregator::<i64, f64>::from_surface(config.seed_surface(), config.systems);

    if config.threads == 0 {
        ensemble.run(config.deposition_per_iteration(), config.nl_total, &*strategy)?;
    } else {
        ensemble.run_threaded(
            config.deposition_per_iteration(),
            config.nl_total,
            &*strategy,
            config.threads,
        )?;
    }

    let record = EnsembleRecord::from_ensemble(&ensemble);
    println!(
        "width exponent (beta): {:.4} +/- {:.4}",
        record.slope.width.average,
        record.slope.width.variance.max(0.0).sqrt()
    );

    write_summary_json(&output_dir.join("summary.json"), &record)?;
    write_checkpoints_csv(&output_dir.join("checkpoints.csv"), &record)?;
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<GrowthConfig> {
    if let Some(path) = path {
        return load_config_file(path);
    }

    let cwd_config = PathBuf::from("config.json");
    if cwd_config.exists() {
        return load_config_file(&cwd_config);
    }

    Ok(GrowthConfig::default())
}

fn load_config_file(path: &Path) -> Result<GrowthConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: GrowthConfig = serde_json::from_str(&raw)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}
