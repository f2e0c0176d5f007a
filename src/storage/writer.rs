//! Text dataset writer
//!
//! Layout, for a dataset called `NAME` under `DIR`:
//!
//! - `DIR/NAME/NAME_graph_indicator.txt`: graph id of every node
//! - `DIR/NAME/NAME_graph_A.txt`: every edge, once in each direction
//! - `DIR/NAME/NAME_graph_labels.txt`: one label per graph (optional)
//! - `DIR/NAME/NAME_node_labels.txt`: one label row per node (optional)
//! - `DIR/NAME/NAME_node_features.txt`: one feature row per node (optional)
//! - `DIR/NAME/summary.json`
//!
//! Node and graph ids are 1-based and global across the dataset.

use anyhow::{bail, Context, Result};
use crate::graph::Graph;
use crate::storage::{DatasetCursor, GraphSink};
use serde_json::{json, to_string_pretty};
use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Which optional files a dataset carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatasetLayout {
    pub graph_labels: bool,
    pub node_labels: bool,
    pub node_features: bool,
}

/// Appends graphs to the dataset files
pub struct DatasetWriter {
    name: String,
    dir: PathBuf,
    layout: DatasetLayout,
    indicator: BufWriter<File>,
    adjacency: BufWriter<File>,
    graph_labels: Option<BufWriter<File>>,
    node_labels: Option<BufWriter<File>>,
    node_features: Option<BufWriter<File>>,
    cursor: DatasetCursor,
    /// Graphs expected in total, for progress logging
    expected: Option<usize>,
}

impl DatasetWriter {
    /// Create the dataset directory and open every file the layout needs
    pub fn create(output_dir: &Path, name: &str, layout: DatasetLayout) -> Result<Self> {
        let dir = output_dir.join(name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create dataset directory {}", dir.display()))?;

        log::info!("Writing dataset {} to {}", name, dir.display());

        let open = |suffix: &str| -> Result<BufWriter<File>> {
            let path = dir.join(format!("{}_{}.txt", name, suffix));
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(BufWriter::new(file))
        };

        let indicator = open("graph_indicator")?;
        let adjacency = open("graph_A")?;
        let graph_labels = layout.graph_labels.then(|| open("graph_labels")).transpose()?;
        let node_labels = layout.node_labels.then(|| open("node_labels")).transpose()?;
        let node_features = layout.node_features.then(|| open("node_features")).transpose()?;

        Ok(Self {
            name: name.to_string(),
            dir,
            layout,
            indicator,
            adjacency,
            graph_labels,
            node_labels,
            node_features,
            cursor: DatasetCursor::default(),
            expected: None,
        })
    }

    /// Log progress against `total` graphs
    pub fn with_expected(mut self, total: usize) -> Self {
        self.expected = Some(total);
        self
    }

    pub fn cursor(&self) -> DatasetCursor {
        self.cursor
    }

    /// Directory holding the dataset files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append one graph.
    ///
    /// A graph missing a row the layout needs is rejected before anything is
    /// written, so a failed delivery leaves the files and the cursor as they
    /// were.
    pub fn write_graph(&mut self, graph: &Graph) -> Result<()> {
        let graph_id = self.cursor.next_graph_id();
        let offset = self.cursor.node_offset();

        let graph_label = if self.layout.graph_labels {
            let Some(label) = graph.graph_label else {
                bail!("graph {} has no graph label", graph_id);
            };
            Some(label)
        } else {
            None
        };
        if self.layout.node_labels {
            check_rows(&graph.labels, graph.num_nodes, "node labels", graph_id)?;
        }
        if self.layout.node_features {
            check_rows(&graph.features, graph.num_nodes, "node features", graph_id)?;
        }

        for _ in 0..graph.num_nodes {
            writeln!(self.indicator, "{}", graph_id)?;
        }

        for edge in &graph.edges {
            let a = edge.start as usize + offset;
            let b = edge.end as usize + offset;
            writeln!(self.adjacency, "{}, {}", a, b)?;
            writeln!(self.adjacency, "{}, {}", b, a)?;
        }

        if let (Some(file), Some(label)) = (self.graph_labels.as_mut(), graph_label) {
            writeln!(file, "{}", label)?;
        }

        if let Some(file) = self.node_labels.as_mut() {
            write_rows(file, &graph.labels)?;
        }

        if let Some(file) = self.node_features.as_mut() {
            write_rows(file, &graph.features)?;
        }

        self.cursor.advance(graph);
        self.log_progress();

        Ok(())
    }

    fn log_progress(&self) {
        let Some(total) = self.expected else {
            return;
        };
        let step = (total / 10).max(1);
        if self.cursor.graphs % step == 0 || self.cursor.graphs == total {
            log::info!("Wrote {}/{} graphs", self.cursor.graphs, total);
        }
    }

    /// Flush every file and write `summary.json`.
    ///
    /// `parameters` is stored verbatim in the summary.
    pub fn finish(mut self, parameters: serde_json::Value) -> Result<DatasetCursor> {
        self.indicator.flush()?;
        self.adjacency.flush()?;
        for file in [
            self.graph_labels.as_mut(),
            self.node_labels.as_mut(),
            self.node_features.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            file.flush()?;
        }

        let summary = json!({
            "name": self.name,
            "graph_count": self.cursor.graphs,
            "node_count": self.cursor.nodes,
            "edge_count": self.cursor.edges,
            "graph_labels": self.layout.graph_labels,
            "node_labels": self.layout.node_labels,
            "node_features": self.layout.node_features,
            "parameters": parameters,
        });

        let path = self.dir.join("summary.json");
        let mut file = File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        file.write_all(to_string_pretty(&summary)?.as_bytes())?;

        log::info!(
            "Dataset {} complete: {} graphs, {} nodes",
            self.name,
            self.cursor.graphs,
            self.cursor.nodes
        );

        Ok(self.cursor)
    }
}

impl GraphSink for DatasetWriter {
    fn deliver(&mut self, graph: &Graph) -> Result<()> {
        self.write_graph(graph)
    }
}

fn check_rows<T>(rows: &[Vec<T>], num_nodes: usize, kind: &str, graph_id: usize) -> Result<()> {
    if rows.len() != num_nodes {
        bail!(
            "graph {} has {} rows of {} for {} nodes",
            graph_id,
            rows.len(),
            kind,
            num_nodes
        );
    }
    Ok(())
}

fn write_rows<T: Display>(file: &mut BufWriter<File>, rows: &[Vec<T>]) -> Result<()> {
    for row in rows {
        let line = row
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(file, "{}", line)?;
    }

    Ok(())
}
