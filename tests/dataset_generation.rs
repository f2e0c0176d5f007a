//! End-to-end generation tests: engine, ranks, collector and dataset files.

use dla_dataset::coordinator::{run, Producer};
use dla_dataset::dla::AggregationEngine;
use dla_dataset::graph::algorithms::validate_tree;
use dla_dataset::graph::Edge;
use dla_dataset::storage::{DatasetLayout, DatasetWriter, MemorySink};
use dla_dataset::{CollectorWait, DeliveryMode, Labeling, RunConfig, SimulationConfig};
use std::fs;
use std::time::Duration;

fn small_simulation() -> SimulationConfig {
    SimulationConfig::new(5, 1.0, 1.0, 8.0)
}

fn serialized(graphs: &[dla_dataset::Graph]) -> Vec<Vec<u8>> {
    let mut bytes: Vec<Vec<u8>> = graphs
        .iter()
        .map(|g| bincode::serialize(g).unwrap())
        .collect();
    bytes.sort();
    bytes
}

#[test]
fn single_particle_graph_has_one_edge() {
    let config = SimulationConfig::new(1, 0.25, 0.5, 2.0);
    let graph = AggregationEngine::from_config(&config).unwrap().run();

    assert_eq!(graph.num_nodes, 2);
    assert_eq!(graph.edges, vec![Edge::new(0, 1)]);
}

#[test]
fn zero_stickiness_does_not_finish_within_cutoff() {
    let config = SimulationConfig::new(1, 1.0, 1.0, 4.0).with_stick_probability(0.0);
    let mut engine = AggregationEngine::from_config(&config).unwrap();

    assert_eq!(engine.try_aggregate_particle(200_000), None);
    assert_eq!(engine.graph().num_nodes, 1);
}

#[test]
fn streaming_collects_effective_total() {
    let config = RunConfig::new(10, 3, small_simulation())
        .with_delivery_mode(DeliveryMode::Streaming);
    let mut sink = MemorySink::new();

    let report = run(&config, &mut sink).unwrap();

    assert_eq!(report.requested, 10);
    assert_eq!(report.effective_total, 12);
    assert_eq!(report.delivered, 12);
    assert_eq!(report.per_rank, vec![4, 4, 4]);
    assert_eq!(sink.graphs.len(), 12);
    for graph in &sink.graphs {
        assert_eq!(graph.num_nodes, 6);
        assert_eq!(validate_tree(graph), Ok(()));
    }
}

#[test]
fn batched_collects_effective_total() {
    let config = RunConfig::new(10, 3, small_simulation())
        .with_delivery_mode(DeliveryMode::Batched);
    let mut sink = MemorySink::new();

    let report = run(&config, &mut sink).unwrap();

    assert_eq!(report.delivered, 12);
    assert_eq!(report.per_rank, vec![4, 4, 4]);
    assert_eq!(sink.graphs.len(), 12);
}

#[test]
fn both_modes_produce_the_same_graphs() {
    let base = RunConfig::new(7, 4, small_simulation().with_node_features(true));

    let mut streamed = MemorySink::new();
    run(&base.clone().with_delivery_mode(DeliveryMode::Streaming), &mut streamed).unwrap();

    let mut batched = MemorySink::new();
    run(&base.with_delivery_mode(DeliveryMode::Batched), &mut batched).unwrap();

    assert_eq!(serialized(&streamed.graphs), serialized(&batched.graphs));
}

#[test]
fn batched_runs_are_byte_identical() {
    let config = RunConfig::new(6, 2, small_simulation().with_node_features(true))
        .with_delivery_mode(DeliveryMode::Batched);

    let mut first = MemorySink::new();
    let mut second = MemorySink::new();
    run(&config, &mut first).unwrap();
    run(&config, &mut second).unwrap();

    let first: Vec<Vec<u8>> = first.graphs.iter().map(|g| bincode::serialize(g).unwrap()).collect();
    let second: Vec<Vec<u8>> = second.graphs.iter().map(|g| bincode::serialize(g).unwrap()).collect();
    assert_eq!(first, second);
}

#[test]
fn offsets_follow_arrival_order() {
    let config = RunConfig::new(9, 3, small_simulation())
        .with_collector_wait(CollectorWait::Timeout(Duration::from_secs(30)));
    let mut sink = MemorySink::new();
    run(&config, &mut sink).unwrap();

    let mut running = 0;
    for (graph, cursor) in sink.graphs.iter().zip(&sink.history) {
        running += graph.num_nodes;
        assert_eq!(cursor.nodes, running);
    }
    assert_eq!(sink.cursor().graphs, 9);
}

#[test]
fn single_rank_run_needs_no_peers() {
    let config = RunConfig::new(3, 1, small_simulation());
    let mut sink = MemorySink::new();

    let report = run(&config, &mut sink).unwrap();
    assert_eq!(report.delivered, 3);
    assert_eq!(report.per_rank, vec![3]);
}

#[test]
fn labeled_ranks_alternate_classes() {
    let config = RunConfig::new(4, 2, small_simulation())
        .with_delivery_mode(DeliveryMode::Batched)
        .with_labeling(Labeling::Binary {
            stick_probabilities: [1.0, 0.5],
        });
    let mut sink = MemorySink::new();
    run(&config, &mut sink).unwrap();

    // batched rounds alternate rank 0, rank 1
    let labels: Vec<Option<i32>> = sink.graphs.iter().map(|g| g.graph_label).collect();
    assert_eq!(labels, vec![Some(0), Some(1), Some(0), Some(1)]);
    for graph in &sink.graphs {
        let label = graph.graph_label.unwrap();
        assert_eq!(graph.labels.len(), graph.num_nodes);
        assert!(graph.labels.iter().all(|row| row == &vec![label]));
    }
}

#[test]
fn writer_receives_every_graph() {
    let tmp = tempfile::tempdir().unwrap();
    let config = RunConfig::new(5, 2, small_simulation().with_node_features(true))
        .with_labeling(Labeling::Binary {
            stick_probabilities: [1.0, 0.8],
        });
    let layout = DatasetLayout {
        graph_labels: true,
        node_labels: true,
        node_features: true,
    };
    let mut writer = DatasetWriter::create(tmp.path(), "DLA", layout).unwrap();

    let report = run(&config, &mut writer).unwrap();
    let cursor = writer.finish(serde_json::json!({})).unwrap();

    assert_eq!(report.delivered, 6);
    assert_eq!(cursor.graphs, 6);
    assert_eq!(cursor.nodes, 36);

    let dir = tmp.path().join("DLA");
    let indicator = fs::read_to_string(dir.join("DLA_graph_indicator.txt")).unwrap();
    assert_eq!(indicator.lines().count(), 36);
    assert_eq!(indicator.lines().last(), Some("6"));

    let adjacency = fs::read_to_string(dir.join("DLA_graph_A.txt")).unwrap();
    assert_eq!(adjacency.lines().count(), 2 * 6 * 5);

    let features = fs::read_to_string(dir.join("DLA_node_features.txt")).unwrap();
    assert_eq!(features.lines().count(), 36);

    let graph_labels = fs::read_to_string(dir.join("DLA_graph_labels.txt")).unwrap();
    assert_eq!(graph_labels.lines().count(), 6);
}

#[test]
fn producer_graph_matches_collected_graph() {
    let config = RunConfig::new(2, 2, small_simulation()).with_delivery_mode(DeliveryMode::Batched);
    let mut sink = MemorySink::new();
    run(&config, &mut sink).unwrap();

    let regenerated = Producer::new(&config, 0).next_graph().unwrap().unwrap().graph;
    assert_eq!(sink.graphs[0], regenerated);
}
