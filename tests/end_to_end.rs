use causal_panel::estimation::{
    compute_causal_effect, EffectQuery, EstimationConfig, LinearRegression, ModelKind,
};
use causal_panel::graph::{Dynamism, GroupedGraph, LagInterval};
use causal_panel::panel::{markov_transform, ColumnData, DataDictBuilder, PanelDataset, RowKey};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Two subjects, ten time points; biomarker[t] = 2 * dose[t-1] + noise
fn synthetic_panel() -> PanelDataset {
    let mut index = Vec::new();
    let mut age = Vec::new();
    let mut dose = Vec::new();
    let mut biomarker = Vec::new();

    for (subject, subject_age) in [("s1", 30.0), ("s2", 50.0)] {
        let mut previous_dose = 0.0;
        for t in 0..10 {
            let current = ((t * 3 + subject_age as usize / 10) % 4) as f64;
            let noise = 0.1 * ((t as f64) * 1.7 + subject_age).sin();
            index.push(RowKey::new(subject, t as f64));
            age.push(Some(subject_age));
            dose.push(Some(current));
            biomarker.push(Some(2.0 * previous_dose + noise));
            previous_dose = current;
        }
    }

    PanelDataset::from_columns(
        index,
        vec![
            ("age".to_string(), ColumnData::Numeric(age)),
            ("dose".to_string(), ColumnData::Numeric(dose)),
            ("biomarker".to_string(), ColumnData::Numeric(biomarker)),
        ],
    )
    .unwrap()
}

fn synthetic_graph() -> GroupedGraph {
    let mut graph = GroupedGraph::new();
    graph.add_group("Demographics", Dynamism::Static).unwrap();
    graph.add_group("Treatment", Dynamism::Dynamic).unwrap();
    graph.add_group("Outcome", Dynamism::Dynamic).unwrap();
    graph.add_variable("Demographics", "age").unwrap();
    graph.add_variable("Treatment", "dose").unwrap();
    graph.add_variable("Outcome", "biomarker").unwrap();
    graph.add_edge("Demographics", "Treatment", None).unwrap();
    graph
        .add_edge("Treatment", "Outcome", Some(LagInterval::single(1)))
        .unwrap();
    graph
}

#[test]
fn higher_dose_raises_next_step_biomarker() {
    init_logging();
    let panel = synthetic_panel();
    let graph = synthetic_graph();
    let query = EffectQuery::new("dose", "biomarker", vec![1], vec![0.0, 1.0]);

    let config = EstimationConfig::default();
    let grid = compute_causal_effect(&panel, &graph, &query, config.linear_model(), &config)
        .unwrap();

    assert_eq!(grid.shape(), (2, 1));
    let low = grid.get(0, 0).unwrap();
    let high = grid.get(1, 0).unwrap();
    assert!(high > low, "expected {} > {}", high, low);
    assert!((high - low - 2.0).abs() < 0.5, "slope {}", high - low);
}

#[test]
fn grid_shape_matches_request() {
    init_logging();
    let query = EffectQuery::from_ranges("dose", "biomarker", 0.0, 3.0, 4, 1, 3).unwrap();
    let config = EstimationConfig {
        parallel: false,
        ..EstimationConfig::default()
    };
    let grid = compute_causal_effect(
        &synthetic_panel(),
        &synthetic_graph(),
        &query,
        LinearRegression::new,
        &config,
    )
    .unwrap();

    assert_eq!(grid.shape(), (4, 3));
    assert_eq!(grid.effect.len(), 4);
    assert!(grid.effect.iter().all(|row| row.len() == 3));
    assert_eq!(grid.delays, vec![1, 2, 3]);
}

#[test]
fn lag_columns_equal_previous_observation_of_same_subject() {
    let panel = synthetic_panel();
    let dynamic = panel.select(&["dose", "biomarker"]).unwrap();
    let frames = markov_transform(&dynamic, 2, 1).unwrap();

    let index = dynamic.index();
    let dose = dynamic.numeric("dose").unwrap();
    let dose_tm1 = frames.past.numeric("dose_tm1").unwrap();
    for row in 0..index.len() {
        let same_subject_before = row > 0 && index[row - 1].subject == index[row].subject;
        if same_subject_before {
            assert_eq!(dose_tm1[row], dose[row - 1]);
        } else {
            assert_eq!(dose_tm1[row], None);
        }
    }
}

#[test]
fn assembled_rows_are_complete_everywhere() {
    let panel = synthetic_panel();
    let graph = synthetic_graph();
    let dict = DataDictBuilder::new()
        .graph(&graph)
        .markov_order(1)
        .max_delta_t(2)
        .build(&panel)
        .unwrap();

    // one lag and two leads leave t = 1..=7 for both subjects
    assert_eq!(dict.len(), 14);
    let statics = dict.statics.as_ref().unwrap();
    for frame in [&dict.past, &dict.present, &dict.future, statics] {
        assert_eq!(frame.len(), dict.len());
        assert_eq!(frame.complete_rows().len(), frame.len());
    }
    assert_eq!(dict.present.index(), dict.future.index());
}

/// Four subjects with a categorical `sex`; biomarker = 2 * previous dose level,
/// plus one for male subjects. `dose_scale` only changes the recorded units.
fn categorical_panel(dose_scale: f64) -> PanelDataset {
    let mut index = Vec::new();
    let mut sex = Vec::new();
    let mut dose = Vec::new();
    let mut biomarker = Vec::new();

    for (k, (subject, label)) in [("s1", "f"), ("s2", "m"), ("s3", "f"), ("s4", "m")]
        .iter()
        .enumerate()
    {
        let offset = if *label == "m" { 1.0 } else { 0.0 };
        let mut previous_level = 0.0;
        for t in 0..30 {
            let level = ((t * 3 + k) % 5) as f64;
            let noise = 0.01 * ((t + 7 * k) as f64).sin();
            index.push(RowKey::new(*subject, t as f64));
            sex.push(Some(label.to_string()));
            dose.push(Some(dose_scale * level));
            biomarker.push(Some(2.0 * previous_level + offset + noise));
            previous_level = level;
        }
    }

    PanelDataset::from_columns(
        index,
        vec![
            ("sex".to_string(), ColumnData::Categorical(sex)),
            ("dose".to_string(), ColumnData::Numeric(dose)),
            ("biomarker".to_string(), ColumnData::Numeric(biomarker)),
        ],
    )
    .unwrap()
}

fn categorical_graph() -> GroupedGraph {
    let mut graph = GroupedGraph::new();
    graph.add_group("Demographics", Dynamism::Static).unwrap();
    graph.add_group("Treatment", Dynamism::Dynamic).unwrap();
    graph.add_group("Outcome", Dynamism::Dynamic).unwrap();
    graph.add_variable("Demographics", "sex").unwrap();
    graph.add_variable("Treatment", "dose").unwrap();
    graph.add_variable("Outcome", "biomarker").unwrap();
    graph.add_edge("Demographics", "Treatment", None).unwrap();
    graph
        .add_edge("Treatment", "Outcome", Some(LagInterval::single(1)))
        .unwrap();
    graph
}

#[test]
fn categorical_parent_fits_regardless_of_dose_units() {
    init_logging();
    let graph = categorical_graph();
    for scale in [1.0, 250.0] {
        let panel = categorical_panel(scale);
        let query = EffectQuery::new("dose", "biomarker", vec![1], vec![0.0, scale]);

        let linear = EstimationConfig {
            model: ModelKind::Linear,
            ..EstimationConfig::default()
        };
        let grid = compute_causal_effect(&panel, &graph, &query, linear.model_factory(), &linear)
            .unwrap_or_else(|err| panic!("dose scale {}: {}", scale, err));
        let slope = grid.get(1, 0).unwrap() - grid.get(0, 0).unwrap();
        assert!((slope - 2.0).abs() < 0.05, "dose scale {}: slope {}", scale, slope);

        let forest = EstimationConfig::default();
        let grid = compute_causal_effect(&panel, &graph, &query, forest.model_factory(), &forest)
            .unwrap_or_else(|err| panic!("dose scale {}: {}", scale, err));
        assert!(grid.get(1, 0).unwrap() > grid.get(0, 0).unwrap());
    }
}
