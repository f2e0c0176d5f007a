//! Synthetic graph datasets from diffusion-limited aggregation

pub mod config;
pub mod coordinator;
pub mod dla;
pub mod graph;
pub mod storage;

pub use anyhow::{Result, anyhow};
pub use config::{CollectorWait, DeliveryMode, Labeling, RunConfig, SimulationConfig};
pub use coordinator::{run, RunReport};
pub use graph::Graph;
