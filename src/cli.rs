use {
    crate::{
        configs::ExperienceConfig,
        engine::{
            run_synthetic,
            RunSummary,
        },
        logging::setup_logging,
    },
    anyhow::Result,
    candle_core::Device,
    clap::{
        Parser,
        ValueEnum,
    },
    std::path::PathBuf,
    tracing::{
        warn,
        Level,
    },
};


#[derive(ValueEnum, Debug, Clone)]
pub enum Loglevel {
    Error, // only problems
    Warn,  // episode boundaries
    Info,  // every training batch
    Debug, // every sample and pull
    None,  // don't log anything
}
impl Loglevel {
    pub fn level(&self) -> Option<Level> {
        match self {
            Loglevel::Error => Some(Level::ERROR),
            Loglevel::Warn => Some(Level::WARN),
            Loglevel::Info => Some(Level::INFO),
            Loglevel::Debug => Some(Level::DEBUG),
            Loglevel::None => None,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Setup logging
    #[arg(long, value_enum, default_value_t=Loglevel::None)]
    pub log: Loglevel,

    /// Also write the log to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// RON file with the memory and normalizer settings.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// The number of environment steps to simulate.
    #[arg(long, default_value_t = 1000)]
    pub steps: usize,

    /// The width of the simulated observations.
    #[arg(long, default_value_t = 4)]
    pub obs_dim: usize,

    /// Seed for the simulation.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Set up logging, load the config and run the simulation described by `args`.
pub fn run(args: Args) -> Result<RunSummary> {
    if let Some(level) = args.log.level() {
        setup_logging(args.log_file.as_deref(), Some(level), Some(level))?;
    }

    let config = match &args.config {
        Some(path) => ExperienceConfig::load(path)?,
        None => ExperienceConfig::default(),
    };
    warn!("running {} steps with {config:?}", args.steps);

    run_synthetic(&config, args.steps, args.obs_dim, args.seed, &Device::Cpu)
}
