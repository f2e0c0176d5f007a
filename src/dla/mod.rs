//! Diffusion-limited aggregation

pub mod engine;
pub mod random;

pub use engine::AggregationEngine;
pub use random::{derive_seed, StepSource};

/// Position of a walking or aggregated particle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
}

impl Particle {
    /// The fixed center particle every cluster grows from
    pub const ORIGIN: Particle = Particle { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to `other`
    pub fn square_distance(&self, other: &Particle) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Squared distance from the center
    pub fn square_norm(&self) -> f64 {
        self.square_distance(&Self::ORIGIN)
    }
}
