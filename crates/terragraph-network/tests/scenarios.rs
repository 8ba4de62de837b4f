//! Integration tests: the facade and pipeline driven through GeoJSON text.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use terragraph_network::{
    Coordinate, Graph, Network, NetworkError, NodeAndEdgeCount, NormalizeConfig, normalize,
};

fn parse(text: &str) -> Network {
    serde_json::from_str(text).expect("fixture should be valid GeoJSON")
}

fn collection(lines: &[&[[f64; 2]]]) -> Network {
    let features: Vec<serde_json::Value> = lines
        .iter()
        .map(|coords| {
            serde_json::json!({
                "type": "Feature",
                "geometry": { "type": "LineString", "coordinates": coords },
                "properties": {}
            })
        })
        .collect();
    serde_json::from_value(serde_json::json!({
        "type": "FeatureCollection",
        "features": features
    }))
    .unwrap()
}

/// A small street grid: a 3x3 block of squares plus a cul-de-sac, a
/// duplicated street and a street that stops 0.3 m short of a grid node.
const TOWN: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        { "type": "Feature", "properties": { "name": "Row 0" },
          "geometry": { "type": "LineString", "coordinates": [[0, 0], [0.001, 0], [0.002, 0], [0.003, 0]] } },
        { "type": "Feature", "properties": { "name": "Row 1" },
          "geometry": { "type": "LineString", "coordinates": [[0, 0.001], [0.001, 0.001], [0.002, 0.001], [0.003, 0.001]] } },
        { "type": "Feature", "properties": { "name": "Row 2" },
          "geometry": { "type": "LineString", "coordinates": [[0, 0.002], [0.001, 0.002], [0.002, 0.002], [0.003, 0.002]] } },
        { "type": "Feature", "properties": { "name": "Row 3" },
          "geometry": { "type": "LineString", "coordinates": [[0, 0.003], [0.001, 0.003], [0.002, 0.003], [0.003, 0.003]] } },
        { "type": "Feature", "properties": { "name": "Col 0" },
          "geometry": { "type": "LineString", "coordinates": [[0, 0], [0, 0.001], [0, 0.002], [0, 0.003]] } },
        { "type": "Feature", "properties": { "name": "Col 1" },
          "geometry": { "type": "LineString", "coordinates": [[0.001, 0], [0.001, 0.001], [0.001, 0.002], [0.001, 0.003]] } },
        { "type": "Feature", "properties": { "name": "Col 2" },
          "geometry": { "type": "LineString", "coordinates": [[0.002, 0], [0.002, 0.001], [0.002, 0.002], [0.002, 0.003]] } },
        { "type": "Feature", "properties": { "name": "Col 3" },
          "geometry": { "type": "LineString", "coordinates": [[0.003, 0], [0.003, 0.001], [0.003, 0.002], [0.003, 0.003]] } },
        { "type": "Feature", "properties": { "name": "Cul-de-sac" },
          "geometry": { "type": "LineString", "coordinates": [[0.003, 0.003], [0.004, 0.004], [0.005, 0.005]] } },
        { "type": "Feature", "properties": { "name": "Row 0 again" },
          "geometry": { "type": "LineString", "coordinates": [[0.002, 0], [0.001, 0]] } },
        { "type": "Feature", "properties": { "name": "Stub" },
          "geometry": { "type": "LineString", "coordinates": [[-0.000003, 0.001], [-0.001, 0.001]] } }
    ]
}"#;

#[test]
fn empty_network_never_errors() {
    let graph = Graph::new(parse(r#"{ "type": "FeatureCollection", "features": [] }"#));
    assert_eq!(graph.connected_component_count(), 0);
    assert!(graph.connected_components().is_empty());
    assert_eq!(graph.node_and_edge_count(), NodeAndEdgeCount::default());
    assert!(graph.edges().is_empty());
    assert!(graph.leaf_edges().is_empty());
    assert!(graph.pruned_edges(Some(3)).is_empty());
    assert!(graph.unified_network(10.0).unwrap().is_empty());
    assert!(graph.longest_edge().is_none());

    let result = normalize(graph.network(), &NormalizeConfig::default()).unwrap();
    assert!(result.network.is_empty());
}

#[test]
fn two_joined_edges() {
    let graph = Graph::new(collection(&[&[[0.0, 0.0], [1.0, 1.0]], &[[1.0, 1.0], [2.0, 2.0]]]));
    assert_eq!(graph.connected_component_count(), 1);
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 2);
}

#[test]
fn bounding_box_scenarios() {
    let graph = Graph::new(collection(&[&[[1.0, 1.0], [2.0, 2.0], [15.0, 15.0]]]));
    assert!(graph.network_in_bounding_box([0.0, 0.0, 10.0, 10.0]).unwrap().is_empty());

    let graph = Graph::new(collection(&[&[[0.0, 0.0], [10.0, 10.0]]]));
    assert_eq!(graph.network_in_bounding_box([0.0, 0.0, 10.0, 10.0]).unwrap().len(), 1);

    assert!(matches!(
        graph.network_in_bounding_box([10.0, 0.0, 0.0, 10.0]),
        Err(NetworkError::InvalidBoundingBox { .. })
    ));
}

#[test]
fn duplicate_scenarios() {
    let exact = Graph::new(collection(&[&[[0.0, 0.0], [1.0, 1.0]], &[[0.0, 0.0], [1.0, 1.0]]]));
    assert_eq!(exact.without_duplicates_or_subsections().len(), 1);

    let reversed = Graph::new(collection(&[&[[0.0, 0.0], [1.0, 1.0]], &[[1.0, 1.0], [0.0, 0.0]]]));
    let kept = reversed.without_duplicates_or_subsections();
    assert_eq!(kept.len(), 1);
    assert_eq!(
        kept.edges()[0].coordinates,
        vec![Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 1.0)]
    );
}

#[test]
fn collinear_leaf_scenario() {
    let graph = Graph::new(collection(&[
        &[[0.0, 0.0], [1.0, 1.0]],
        &[[1.0, 1.0], [2.0, 2.0]],
        &[[2.0, 2.0], [3.0, 3.0]],
    ]));
    let leaves = graph.leaf_edges();
    assert_eq!(leaves.len(), 2);
    assert_eq!(leaves.edges()[0].coordinates[0], Coordinate::new(0.0, 0.0));
    assert_eq!(leaves.edges()[1].coordinates[1], Coordinate::new(3.0, 3.0));

    let internal = graph.pruned_edges(None);
    assert_eq!(
        internal.edges()[0].coordinates,
        vec![Coordinate::new(1.0, 1.0), Coordinate::new(2.0, 2.0)]
    );
}

#[test]
fn town_statistics() {
    let graph = Graph::new(parse(TOWN));
    assert_eq!(graph.network().len(), 11);
    assert_eq!(graph.connected_component_count(), 2);

    let components = graph.connected_components();
    assert_eq!(components[0].len(), 1);
    assert_eq!(components[0].edges()[0].properties["name"], "Stub");
    assert_eq!(components[1].len(), 10);

    // 16 grid nodes, 2 cul-de-sac nodes, 2 stub nodes.
    assert_eq!(graph.node_count(), 20);
    // 24 grid segments, 2 cul-de-sac segments, 1 stub segment.
    assert_eq!(graph.edge_count(), 27);
    assert_eq!(graph.nodes().len(), 20);
}

#[test]
fn town_pruning_strips_cul_de_sac_and_stub() {
    let graph = Graph::new(parse(TOWN));
    assert_eq!(graph.pruned_edges(Some(1)).len(), 25);
    let core = graph.pruned_edges(Some(5));
    assert_eq!(core.len(), 24);
    assert_eq!(Graph::new(core).leaf_edges().len(), 0);
}

#[test]
fn town_unify_connects_stub() {
    let graph = Graph::new(parse(TOWN));
    let unified = graph.unified_network(1.0).unwrap();
    assert_eq!(Graph::new(unified.clone()).connected_component_count(), 1);

    let stub = &unified.edges()[10];
    assert_eq!(stub.properties["name"], "Stub");
    assert_eq!(stub.coordinates[0], Coordinate::new(0.0, 0.001));
}

#[test]
fn town_unify_is_a_no_op_on_the_grid() {
    let graph = Graph::new(parse(TOWN));
    let unified = graph.unified_network(1.0).unwrap();
    for (before, after) in graph.network().iter().zip(&unified).take(10) {
        assert_eq!(before, after);
    }
}

#[test]
fn town_normalize_end_to_end() {
    let config: NormalizeConfig = serde_json::from_str(
        r#"{ "unify_tolerance_meters": 1.0, "remove_duplicates": true, "prune_depth": 10 }"#,
    )
    .unwrap();
    let result = normalize(&parse(TOWN), &config).unwrap();
    assert_eq!(result.summary.component_count, 1);
    assert_eq!(result.summary.leaf_count, 0);
    assert_eq!(result.summary.edge_count, 24);
    assert_eq!(result.summary.node_count, 16);

    let text = serde_json::to_string(&result.network).unwrap();
    let back: Network = serde_json::from_str(&text).unwrap();
    assert_eq!(back, result.network);
}

#[test]
fn properties_survive_round_trip() {
    let network = parse(TOWN);
    let text = serde_json::to_string_pretty(&network).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["features"][8]["properties"]["name"], "Cul-de-sac");
    assert_eq!(parse(&text), network);
}

#[test]
fn longest_and_shortest_edges() {
    let graph = Graph::new(parse(TOWN));
    let longest = graph.longest_edge_length().unwrap();
    let shortest = graph.shortest_edge_length().unwrap();
    // Diagonal cul-de-sac hops are longer than grid blocks; the stub is ~111 m.
    assert!(longest > 0.15 && longest < 0.16, "got {longest}");
    assert!(shortest > 0.110 && shortest < 0.112, "got {shortest}");
}
