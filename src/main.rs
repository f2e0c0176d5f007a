use anyhow::{bail, Result};
use clap::Parser;
use dla_dataset::config::DEFAULT_SEED;
use dla_dataset::storage::{DatasetLayout, DatasetWriter};
use dla_dataset::{CollectorWait, DeliveryMode, Labeling, RunConfig, SimulationConfig};
use serde_json::json;
use std::path::Path;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(
    name = "dla-dataset-generator",
    about = "Generate graph datasets from diffusion-limited aggregation"
)]
struct Cli {
    /// Dataset name, used for the directory and file prefixes
    #[clap(long, default_value = "DLA")]
    name: String,

    /// Directory the dataset directory is created in
    #[clap(long, default_value = ".")]
    output_dir: String,

    /// Number of graphs to generate (rounded up to a multiple of the rank count)
    #[clap(long)]
    graphs: usize,

    /// Particles aggregated per graph
    #[clap(long)]
    particles: usize,

    /// Radius of each particle
    #[clap(long)]
    particle_radius: f64,

    /// Standard deviation of each Brownian step component
    #[clap(long)]
    step_variance: f64,

    /// Radius of the spawn disk
    #[clap(long)]
    spawn_radius: f64,

    /// Probability that a collision sticks (unlabeled datasets)
    #[clap(long, default_value = "1.0")]
    stick_probability: f64,

    /// Produce a two-class dataset; takes the stick probability of class 0
    /// and class 1, e.g. `--labeled 1.0,0.2`
    #[clap(long, value_delimiter = ',')]
    labeled: Option<Vec<f64>>,

    /// Store particle positions as node features
    #[clap(long)]
    node_features: bool,

    /// How graphs reach the collector
    #[clap(long, value_enum, default_value = "streaming")]
    mode: DeliveryMode,

    /// Number of ranks (0 = use all available cores)
    #[clap(long, default_value = "0")]
    ranks: usize,

    /// Give up when the collector waits longer than this for a graph. In
    /// batched mode this also bounds how far the slowest rank may lag behind
    /// in building its share before the first round
    #[clap(long)]
    timeout_secs: Option<u64>,

    /// Base random seed
    #[clap(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Verbose logging
    #[clap(long, short)]
    verbose: bool,
}

impl Cli {
    fn run_config(&self) -> Result<RunConfig> {
        let num_ranks = if self.ranks > 0 {
            self.ranks
        } else {
            num_cpus::get()
        };

        let labeling = match self.labeled.as_deref() {
            None => Labeling::Off,
            Some(&[class_0, class_1]) => Labeling::Binary {
                stick_probabilities: [class_0, class_1],
            },
            Some(other) => bail!(
                "--labeled takes exactly two stick probabilities, got {}",
                other.len()
            ),
        };

        let collector_wait = match self.timeout_secs {
            Some(secs) => CollectorWait::Timeout(Duration::from_secs(secs)),
            None => CollectorWait::Block,
        };

        let simulation = SimulationConfig::new(
            self.particles,
            self.particle_radius,
            self.step_variance,
            self.spawn_radius,
        )
        .with_stick_probability(self.stick_probability)
        .with_node_features(self.node_features)
        .with_seed(self.seed);

        let config = RunConfig::new(self.graphs, num_ranks, simulation)
            .with_delivery_mode(self.mode)
            .with_collector_wait(collector_wait)
            .with_labeling(labeling);
        config.validate()?;

        Ok(config)
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Cli::parse();

    // Configure logging
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    let config = args.run_config()?;

    log::info!("Starting DLA dataset generation");
    log::info!("Output: {}/{}", args.output_dir, args.name);

    let labeled = config.is_labeled();
    let layout = DatasetLayout {
        graph_labels: labeled,
        node_labels: labeled,
        node_features: args.node_features,
    };
    let mut writer = DatasetWriter::create(Path::new(&args.output_dir), &args.name, layout)?
        .with_expected(config.effective_total());

    let report = dla_dataset::run(&config, &mut writer)?;

    let class_probabilities = match config.labeling {
        Labeling::Off => None,
        Labeling::Binary { stick_probabilities } => Some(stick_probabilities),
    };
    writer.finish(json!({
        "requested_graphs": report.requested,
        "ranks": config.num_ranks,
        "delivery_mode": format!("{:?}", config.delivery_mode),
        "num_particles": config.simulation.num_particles,
        "particle_radius": config.simulation.particle_radius,
        "step_variance": config.simulation.step_variance,
        "spawn_radius": config.simulation.spawn_radius,
        "stick_probability": config.simulation.stick_probability,
        "class_stick_probabilities": class_probabilities,
        "seed": config.simulation.seed,
    }))?;

    log::info!(
        "Generation complete: {} graphs ({} requested)",
        report.delivered,
        report.requested
    );

    Ok(())
}
