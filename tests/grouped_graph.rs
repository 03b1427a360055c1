use causal_panel::graph::{Dynamism, ErrorKind, GraphError, GroupedGraph, LagInterval, NodeRef};

fn lag(min: u32, max: u32) -> Option<LagInterval> {
    Some(LagInterval::new(min, max).unwrap())
}

/// A = {cat, dog, parrot}, B = {zebra, fish}, C = {horse}, all dynamic.
fn animal_graph() -> GroupedGraph {
    let mut graph = GroupedGraph::new();
    for group in ["A", "B", "C"] {
        graph.add_group(group, Dynamism::Dynamic).unwrap();
    }
    for (group, variable) in [
        ("A", "cat"),
        ("A", "dog"),
        ("A", "parrot"),
        ("B", "zebra"),
        ("B", "fish"),
        ("C", "horse"),
    ] {
        graph.add_variable(group, variable).unwrap();
    }
    graph.add_variable_edge("A", "cat", "dog", lag(1, 2)).unwrap();
    graph.add_variable_edge("B", "zebra", "fish", lag(2, 2)).unwrap();

    graph.add_edge("A", "B", lag(1, 1)).unwrap();
    graph.add_edge("C", "B", lag(2, 3)).unwrap();
    graph.add_edge("A", "C", lag(3, 4)).unwrap();
    graph
}

fn names<'a>(nodes: &[NodeRef<'a>]) -> Vec<&'a str> {
    nodes.iter().map(|node| node.name()).collect()
}

#[test]
fn group_parents_follow_group_edges() {
    let graph = animal_graph();
    let b = graph.group("B").unwrap();
    let parents = graph.parents_of(NodeRef::Group(b)).unwrap();
    assert_eq!(names(&parents), vec!["A", "C"]);

    let a = graph.group("A").unwrap();
    assert!(graph.parents_of(NodeRef::Group(a)).unwrap().is_empty());
}

#[test]
fn max_lag_tracks_largest_declared_lag() {
    assert_eq!(animal_graph().max_lag(), Some(4));
}

#[test]
fn variable_parents_include_whole_parent_groups() {
    let graph = animal_graph();
    let fish = graph.get_variable("fish").unwrap();
    let parents = graph.parents_of(NodeRef::Variable(fish)).unwrap();
    assert_eq!(
        names(&parents),
        vec!["zebra", "cat", "dog", "parrot", "horse"]
    );
}

#[test]
fn temporal_lags_resolve_within_and_across_groups() {
    let graph = animal_graph();
    let var = |name: &str| graph.get_variable(name).unwrap();

    assert_eq!(
        graph.temporal_lag_names(var("horse"), var("fish")).unwrap(),
        vec!["horse_tm2", "horse_tm3"]
    );
    assert_eq!(
        graph.temporal_lag_names(var("zebra"), var("fish")).unwrap(),
        vec!["zebra_tm2"]
    );
    assert_eq!(
        graph.temporal_lag_names(var("cat"), var("dog")).unwrap(),
        vec!["cat_tm1", "cat_tm2"]
    );
    assert_eq!(
        graph.temporal_lag_names(var("parrot"), var("fish")).unwrap(),
        vec!["parrot_tm1"]
    );
}

#[test]
fn same_group_interval_expands_in_ascending_order() {
    let mut graph = animal_graph();
    graph.add_variable_edge("A", "dog", "parrot", lag(1, 3)).unwrap();

    let dog = graph.get_variable("dog").unwrap();
    let parrot = graph.get_variable("parrot").unwrap();
    assert_eq!(
        graph.temporal_lag_names(dog, parrot).unwrap(),
        vec!["dog_tm1", "dog_tm2", "dog_tm3"]
    );
}

#[test]
fn re_adding_an_edge_is_rejected() {
    let mut graph = animal_graph();
    let err = graph.add_edge("A", "C", lag(1, 1)).unwrap_err();
    assert!(matches!(err, GraphError::DuplicateEdge { .. }));
    assert_eq!(graph.max_lag(), Some(4));

    let err = graph
        .add_variable_edge("A", "cat", "dog", lag(1, 1))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);

    let restored = GroupedGraph::from_json(&graph.to_json().unwrap()).unwrap();
    assert_eq!(restored.max_lag(), graph.max_lag());
}

#[test]
fn unresolvable_lags_are_path_errors() {
    let graph = animal_graph();
    let var = |name: &str| graph.get_variable(name).unwrap();

    // same group, no direct edge and no self-edge on A
    let err = graph
        .temporal_lag_names(var("parrot"), var("dog"))
        .unwrap_err();
    assert_eq!(
        err,
        GraphError::NoCausalPath {
            parent: "parrot".to_string(),
            effect: "dog".to_string(),
        }
    );
    assert_eq!(err.kind(), ErrorKind::PathResolution);

    // no edge from B back to C
    let err = graph
        .temporal_lag_names(var("fish"), var("horse"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PathResolution);
}

#[test]
fn self_edge_supplies_lag_for_unlagged_variable_edges() {
    let mut graph = animal_graph();
    graph.add_variable_edge("A", "parrot", "dog", None).unwrap();
    graph.add_edge("A", "A", lag(1, 5)).unwrap();
    assert_eq!(graph.max_lag(), Some(5));

    let parrot = graph.get_variable("parrot").unwrap();
    let dog = graph.get_variable("dog").unwrap();
    assert_eq!(
        graph.temporal_lag_names(parrot, dog).unwrap().len(),
        5
    );
}

#[test]
fn static_edges_and_cross_group_static_lags() {
    let mut graph = animal_graph();
    graph.add_group("Habitat", Dynamism::Static).unwrap();
    graph.add_variable("Habitat", "climate").unwrap();

    let edges_before = graph.edge_count();
    let err = graph.add_edge("A", "Habitat", lag(1, 1)).unwrap_err();
    assert!(matches!(err, GraphError::UnsupportedEdgeDirection { .. }));
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(graph.edge_count(), edges_before);

    // a lag on a static-to-dynamic edge is ignored
    graph.add_edge("Habitat", "B", lag(9, 9)).unwrap();
    assert_eq!(graph.max_lag(), Some(4));

    let climate = graph.get_variable("climate").unwrap();
    let fish = graph.get_variable("fish").unwrap();
    let err = graph.temporal_lag_names(climate, fish).unwrap_err();
    assert_eq!(
        err,
        GraphError::NotDynamicToDynamic {
            from: "Habitat".to_string(),
            to: "B".to_string(),
        }
    );

    let partition = graph.partition_by_dynamism();
    assert_eq!(partition.static_names(), vec!["climate"]);
    assert_eq!(partition.dynamic_names().len(), 6);
}

#[test]
fn unknown_names_never_mutate_the_graph() {
    let mut graph = animal_graph();
    let edges = graph.edge_count();
    assert_eq!(
        graph.add_edge("A", "Z", lag(1, 1)).unwrap_err(),
        GraphError::UnknownGroup("Z".to_string())
    );
    assert_eq!(
        graph.add_edge("Z", "A", lag(1, 1)).unwrap_err(),
        GraphError::UnknownGroup("Z".to_string())
    );
    assert_eq!(graph.edge_count(), edges);
    assert!(graph.add_variable("Z", "owl").is_err());
    assert!(graph.add_variable("B", "cat").is_err());
    assert_eq!(graph.variable_count(), 6);
}

#[test]
fn max_lag_is_independent_of_insertion_order() {
    let edges = [("A", "B", 1, 1), ("C", "B", 2, 3), ("A", "C", 3, 4), ("B", "B", 1, 2)];
    let orders = [[0, 1, 2, 3], [3, 2, 1, 0], [2, 0, 3, 1], [1, 3, 0, 2]];
    for order in orders {
        let mut graph = GroupedGraph::new();
        for group in ["A", "B", "C"] {
            graph.add_group(group, Dynamism::Dynamic).unwrap();
        }
        let mut running = 0;
        for &i in &order {
            let (from, to, min, max) = edges[i];
            graph.add_edge(from, to, lag(min, max)).unwrap();
            running = running.max(max);
            assert_eq!(graph.max_lag(), Some(running));
        }
        assert_eq!(graph.max_lag(), Some(4));
    }
}

#[test]
fn display_lists_groups_and_edges() {
    let rendered = animal_graph().to_string();
    assert!(rendered.starts_with("--- Grouped Causal Graph ---"));
    assert!(rendered.contains("cat --[1,2]--> dog"));
    assert!(rendered.contains("C --[2,3]--> B    (dynamic -> dynamic)"));
}

#[test]
fn document_round_trip_keeps_queries_intact() {
    let graph = animal_graph();
    let restored = GroupedGraph::from_json(&graph.to_json().unwrap()).unwrap();
    assert_eq!(restored.max_lag(), Some(4));

    let horse = restored.get_variable("horse").unwrap();
    let fish = restored.get_variable("fish").unwrap();
    assert_eq!(
        restored.temporal_lag_names(horse, fish).unwrap(),
        vec!["horse_tm2", "horse_tm3"]
    );
}
