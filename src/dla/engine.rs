//! Growth of one cluster by constrained Brownian motion

use crate::config::{ConfigError, SimulationConfig};
use crate::dla::{Particle, StepSource};
use crate::graph::{Graph, GraphBuilder};

/// Owns one cluster and grows it particle by particle into a tree graph.
///
/// Node `i` of the produced graph is the `i`-th aggregated particle; node 0
/// is the fixed center. Walks have no step limit: with a tiny stick
/// probability or a spawn disk the cluster cannot reach, a walk may run for
/// an arbitrarily long time. That is a property of the parameters and is not
/// guarded here; [`try_aggregate_particle`] exists for callers that want an
/// explicit cutoff.
///
/// [`try_aggregate_particle`]: AggregationEngine::try_aggregate_particle
#[derive(Debug, Clone)]
pub struct AggregationEngine {
    num_particles: usize,
    spawn_radius: f64,
    /// `spawn_radius²`
    spawn_radius_sq: f64,
    /// `(2 * particle_radius)²`
    contact_distance_sq: f64,
    stick_probability: f64,
    graph_label: Option<i32>,
    node_features: bool,
    node_labels: bool,
    source: StepSource,
    particles: Vec<Particle>,
    builder: GraphBuilder,
    /// Accepted walk steps over the engine's lifetime
    steps: u64,
}

impl AggregationEngine {
    /// Create an engine seeded from `config.seed`
    pub fn from_config(config: &SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let source = StepSource::new(config.seed, config.step_variance)?;
        Self::new(config, source)
    }

    /// Create an engine that draws from `source`
    pub fn new(config: &SimulationConfig, source: StepSource) -> Result<Self, ConfigError> {
        config.validate()?;

        let capacity = config.num_particles + 1;
        let mut engine = Self {
            num_particles: config.num_particles,
            spawn_radius: config.spawn_radius,
            spawn_radius_sq: config.spawn_radius * config.spawn_radius,
            contact_distance_sq: 4.0 * config.particle_radius * config.particle_radius,
            stick_probability: config.stick_probability,
            graph_label: config.graph_label,
            node_features: config.node_features,
            node_labels: config.node_labels,
            source,
            particles: Vec::with_capacity(capacity),
            builder: GraphBuilder::with_capacity(capacity),
            steps: 0,
        };
        engine.builder.set_graph_label(config.graph_label);
        engine.push_node(Particle::ORIGIN);

        Ok(engine)
    }

    /// Grow the configured number of particles and return the finished graph
    pub fn run(mut self) -> Graph {
        self.aggregate_particles(self.num_particles);
        log::debug!(
            "Aggregated {} particles in {} steps",
            self.particles.len() - 1,
            self.steps
        );
        self.into_graph()
    }

    /// Aggregate `count` more particles
    pub fn aggregate_particles(&mut self, count: usize) {
        for _ in 0..count {
            self.aggregate_particle();
        }
    }

    /// Spawn one walker and walk it until it sticks; returns its node index
    pub fn aggregate_particle(&mut self) -> usize {
        let mut particle = self.spawn_particle();
        loop {
            if let Some(neighbor) = self.walk_step(&mut particle) {
                return self.add_particle(neighbor, particle);
            }
        }
    }

    /// Like [`aggregate_particle`], but gives up after `max_steps` walk steps.
    ///
    /// On `None` the walker is discarded and the cluster is left unchanged.
    ///
    /// [`aggregate_particle`]: AggregationEngine::aggregate_particle
    pub fn try_aggregate_particle(&mut self, max_steps: u64) -> Option<usize> {
        let mut particle = self.spawn_particle();
        for _ in 0..max_steps {
            if let Some(neighbor) = self.walk_step(&mut particle) {
                return Some(self.add_particle(neighbor, particle));
            }
        }
        None
    }

    /// One step of the walk followed by the stick test.
    ///
    /// A failed stick leaves the walker where it is; the next step starts from
    /// the colliding position.
    fn walk_step(&mut self, particle: &mut Particle) -> Option<usize> {
        self.constrained_step(particle);
        self.steps += 1;

        let (neighbor, square_distance) = self.nearest_particle(particle);
        if self.touches(square_distance) && self.source.uniform() <= self.stick_probability {
            return Some(neighbor);
        }
        None
    }

    /// New walker on the spawn circle, in a Gaussian-random direction
    pub fn spawn_particle(&mut self) -> Particle {
        loop {
            let x = self.source.gaussian();
            let y = self.source.gaussian();
            let square_norm = x * x + y * y;
            if square_norm > 0.0 {
                let scale = self.spawn_radius / square_norm.sqrt();
                return Particle::new(x * scale, y * scale);
            }
        }
    }

    /// Move `particle` by a Gaussian step, redrawing every candidate that
    /// leaves the spawn disk
    pub fn constrained_step(&mut self, particle: &mut Particle) {
        loop {
            let candidate = Particle::new(
                particle.x + self.source.gaussian(),
                particle.y + self.source.gaussian(),
            );
            if candidate.square_norm() <= self.spawn_radius_sq {
                *particle = candidate;
                return;
            }
        }
    }

    /// Index of and squared distance to the closest cluster particle.
    ///
    /// Ties keep the lowest index.
    pub fn nearest_particle(&self, particle: &Particle) -> (usize, f64) {
        let mut closest_id = 0;
        let mut closest_dst = f64::INFINITY;
        for (i, other) in self.particles.iter().enumerate() {
            let dst = particle.square_distance(other);
            if dst < closest_dst {
                closest_dst = dst;
                closest_id = i;
            }
        }
        (closest_id, closest_dst)
    }

    /// Whether two particles' disks overlap or touch
    pub fn is_collision(&self, a: &Particle, b: &Particle) -> bool {
        self.touches(a.square_distance(b))
    }

    fn touches(&self, square_distance: f64) -> bool {
        square_distance <= self.contact_distance_sq
    }

    /// Attach `particle` to the cluster next to `neighbor`
    fn add_particle(&mut self, neighbor: usize, particle: Particle) -> usize {
        let particle_id = self.push_node(particle);
        self.builder.add_edge(neighbor as u32, particle_id as u32);
        particle_id
    }

    fn push_node(&mut self, particle: Particle) -> usize {
        let particle_id = self.builder.add_node() as usize;
        if self.node_features {
            self.builder
                .push_features(vec![particle.x as f32, particle.y as f32]);
        }
        if self.node_labels {
            self.builder.push_labels(vec![self.graph_label.unwrap_or(0)]);
        }
        self.particles.push(particle);
        particle_id
    }

    /// Aggregated particle positions, indexed like graph nodes
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Graph built so far
    pub fn graph(&self) -> &Graph {
        self.builder.graph()
    }

    /// Total accepted walk steps
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn into_graph(self) -> Graph {
        self.builder.build()
    }
}
