//! Graph representation, construction and structural checks

pub mod tree;
pub mod builder;
pub mod algorithms;

pub use builder::GraphBuilder;
pub use tree::{Edge, Graph};
