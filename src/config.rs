//! Configuration management for the DLA dataset generator

use std::time::Duration;
use thiserror::Error;

/// Seed used when the operator does not supply one
pub const DEFAULT_SEED: u64 = 577;

/// Errors raised while validating configuration values
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be a positive number, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must be at least 1")]
    Zero { field: &'static str },

    #[error("{field} must lie in {range}, got {value}")]
    OutOfRange {
        field: &'static str,
        range: &'static str,
        value: f64,
    },

    #[error("invalid step distribution: {0}")]
    StepDistribution(String),
}

fn require_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    // `!(v > 0)` also rejects NaN
    if !(value > 0.0) || !value.is_finite() {
        return Err(ConfigError::NonPositive { field, value });
    }
    Ok(())
}

fn require_nonzero(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Zero { field });
    }
    Ok(())
}

fn require_probability(
    field: &'static str,
    value: f64,
    allow_zero: bool,
) -> Result<(), ConfigError> {
    let lower_ok = if allow_zero { value >= 0.0 } else { value > 0.0 };
    if !lower_ok || !(value <= 1.0) {
        let range = if allow_zero { "[0, 1]" } else { "(0, 1]" };
        return Err(ConfigError::OutOfRange { field, range, value });
    }
    Ok(())
}

/// Parameters of a single aggregation run
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Number of particles aggregated onto the center particle
    pub num_particles: usize,

    /// Radius of every particle
    pub particle_radius: f64,

    /// Standard deviation of each Gaussian step component
    pub step_variance: f64,

    /// Radius of the disk walkers spawn on and are confined to
    pub spawn_radius: f64,

    /// Probability that a collision turns into aggregation
    pub stick_probability: f64,

    /// Scalar label attached to the produced graph
    pub graph_label: Option<i32>,

    /// Attach `[x, y]` position rows to every node
    pub node_features: bool,

    /// Attach a `[graph_label]` row to every node
    pub node_labels: bool,

    /// Seed of the random step source
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_particles: 100,
            particle_radius: 1.0,
            step_variance: 1.0,
            spawn_radius: 30.0,
            stick_probability: 1.0,
            graph_label: None,
            node_features: false,
            node_labels: false,
            seed: DEFAULT_SEED,
        }
    }
}

impl SimulationConfig {
    /// Create a configuration with the four physical parameters
    pub fn new(
        num_particles: usize,
        particle_radius: f64,
        step_variance: f64,
        spawn_radius: f64,
    ) -> Self {
        Self {
            num_particles,
            particle_radius,
            step_variance,
            spawn_radius,
            ..Default::default()
        }
    }

    pub fn with_stick_probability(mut self, probability: f64) -> Self {
        self.stick_probability = probability;
        self
    }

    pub fn with_graph_label(mut self, label: i32) -> Self {
        self.graph_label = Some(label);
        self
    }

    pub fn with_node_features(mut self, enabled: bool) -> Self {
        self.node_features = enabled;
        self
    }

    pub fn with_node_labels(mut self, enabled: bool) -> Self {
        self.node_labels = enabled;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check every physical parameter.
    ///
    /// A stick probability of zero is accepted here: it is a legal (if
    /// non-terminating) physical setting. Runs reject it in
    /// [`RunConfig::validate`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_nonzero("num_particles", self.num_particles)?;
        require_positive("particle_radius", self.particle_radius)?;
        require_positive("step_variance", self.step_variance)?;
        require_positive("spawn_radius", self.spawn_radius)?;
        require_probability("stick_probability", self.stick_probability, true)?;
        Ok(())
    }
}

/// How finished graphs travel from the ranks to the collector
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DeliveryMode {
    /// Every rank produces its whole share, then one gather per round
    Batched,

    /// Workers send each graph as soon as it is finished
    Streaming,
}

/// How the collector waits for outstanding graphs once its own share is done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorWait {
    /// Block until a message arrives or every sender has hung up
    Block,

    /// Give up with a liveness error when nothing arrives within the duration.
    ///
    /// In batched mode the limit applies to each gather round, and the first
    /// round only completes once every rank has built its whole share. With
    /// labeling the low-stickiness class builds much more slowly, so the
    /// duration has to cover that gap as well.
    Timeout(Duration),
}

/// Graph classification setup
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Labeling {
    /// Unlabeled graphs, every rank uses the base stick probability
    Off,

    /// Two classes distinguished by stickiness; rank `r` produces class `r % 2`
    Binary { stick_probabilities: [f64; 2] },
}

/// Configuration of a full dataset run
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Number of graphs requested by the operator
    pub total_graphs: usize,

    /// Number of ranks; rank 0 is the collector
    pub num_ranks: usize,

    pub delivery_mode: DeliveryMode,

    pub collector_wait: CollectorWait,

    pub labeling: Labeling,

    /// Base simulation parameters shared by every rank
    pub simulation: SimulationConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            total_graphs: 10,
            num_ranks: 1,
            delivery_mode: DeliveryMode::Streaming,
            collector_wait: CollectorWait::Block,
            labeling: Labeling::Off,
            simulation: SimulationConfig::default(),
        }
    }
}

impl RunConfig {
    /// Create a run configuration
    pub fn new(total_graphs: usize, num_ranks: usize, simulation: SimulationConfig) -> Self {
        Self {
            total_graphs,
            num_ranks,
            simulation,
            ..Default::default()
        }
    }

    pub fn with_delivery_mode(mut self, mode: DeliveryMode) -> Self {
        self.delivery_mode = mode;
        self
    }

    pub fn with_collector_wait(mut self, wait: CollectorWait) -> Self {
        self.collector_wait = wait;
        self
    }

    pub fn with_labeling(mut self, labeling: Labeling) -> Self {
        self.labeling = labeling;
        self
    }

    /// Graphs produced by each rank: `ceil(total_graphs / num_ranks)`
    pub fn share_per_rank(&self) -> usize {
        self.total_graphs.div_ceil(self.num_ranks.max(1))
    }

    /// Graphs actually produced and collected: `share * num_ranks`
    pub fn effective_total(&self) -> usize {
        self.share_per_rank() * self.num_ranks
    }

    /// Whether produced graphs carry labels
    pub fn is_labeled(&self) -> bool {
        matches!(self.labeling, Labeling::Binary { .. })
    }

    /// Simulation parameters used by `rank`.
    ///
    /// The labeling setup decides the rank's class, its stick probability and
    /// its labels. The seed is left at the base value; callers derive per-graph
    /// seeds from it.
    pub fn simulation_for_rank(&self, rank: usize) -> SimulationConfig {
        let mut simulation = self.simulation.clone();
        if let Labeling::Binary { stick_probabilities } = self.labeling {
            let class = rank % stick_probabilities.len();
            simulation.stick_probability = stick_probabilities[class];
            simulation.graph_label = Some(class as i32);
            simulation.node_labels = true;
        }
        simulation
    }

    /// Validate the run; fails fast on the first bad value
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_nonzero("total_graphs", self.total_graphs)?;
        require_nonzero("num_ranks", self.num_ranks)?;
        self.simulation.validate()?;

        match self.labeling {
            Labeling::Off => {
                require_probability("stick_probability", self.simulation.stick_probability, false)?;
            }
            Labeling::Binary { stick_probabilities } => {
                for probability in stick_probabilities {
                    require_probability("class stick_probability", probability, false)?;
                }
            }
        }

        if let CollectorWait::Timeout(timeout) = self.collector_wait {
            if timeout.is_zero() {
                return Err(ConfigError::NonPositive {
                    field: "collector timeout",
                    value: 0.0,
                });
            }
        }

        Ok(())
    }
}
