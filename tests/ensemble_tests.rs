use callpath_ensemble::ensemble::{columnar_join, stack, EnsembleComposer, ProfileDataset, ReaderOutput};
use callpath_ensemble::graph::{CallGraph, Frame, NodeId};
use callpath_ensemble::table::{Column, ColumnKind, IndexValue, JoinedColumn, Row, Table, Value};
use callpath_ensemble::utils::config::ComposeOptions;
use callpath_ensemble::utils::error::EnsembleError;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Graph made of the given root-to-leaf name paths
fn graph(paths: &[&[&str]]) -> Arc<CallGraph> {
    let mut builder = CallGraph::builder();
    for path in paths {
        let frames: Vec<Frame> = path.iter().map(|name| Frame::new(*name)).collect();
        builder.add_path(&frames).unwrap();
    }
    Arc::new(builder.finish())
}

/// main -> {a, b}, with one x called from both
fn dag_graph() -> Arc<CallGraph> {
    let mut builder = CallGraph::builder();
    let main = builder.add_root(Frame::new("main"));
    let a = builder.add_child(main, Frame::new("a")).unwrap();
    let b = builder.add_child(main, Frame::new("b")).unwrap();
    let x = builder.add_child(a, Frame::new("x")).unwrap();
    builder.link(b, x).unwrap();
    Arc::new(builder.finish())
}

/// main -> {foo (function), foo (loop)}
fn kinds_graph() -> Arc<CallGraph> {
    let mut builder = CallGraph::builder();
    let main = builder.add_root(Frame::new("main"));
    builder.add_child(main, Frame::new("foo").with("type", "function")).unwrap();
    builder.add_child(main, Frame::new("foo").with("type", "loop")).unwrap();
    Arc::new(builder.finish())
}

fn node_of_kind(graph: &CallGraph, kind: &str) -> NodeId {
    graph
        .node_ids()
        .find(|id| graph.frame(*id).and_then(|f| f.get("type")) == Some(kind))
        .unwrap()
}

/// One-profile dataset with a row per node; time = base + ordinal
fn dataset_on(graph: Arc<CallGraph>, profile: &str, base: f64, ranks: f64) -> ProfileDataset {
    let mut metadata = BTreeMap::new();
    metadata.insert("ranks".to_string(), Value::Number(ranks));
    metadata.insert("machine".to_string(), Value::text("quartz"));
    dataset_with_metadata(graph, profile, base, metadata)
}

fn dataset_with_metadata(
    graph: Arc<CallGraph>,
    profile: &str,
    base: f64,
    metadata: BTreeMap<String, Value>,
) -> ProfileDataset {
    let mut table = Table::new(
        vec!["node".to_string(), "profile".to_string()],
        vec![
            Column::new("name".to_string(), ColumnKind::Text),
            Column::new("time".to_string(), ColumnKind::Numeric),
        ],
    )
    .unwrap();
    for (ordinal, id) in graph.traverse().into_iter().enumerate() {
        let name = graph.frame(id).unwrap().name().to_string();
        table
            .push_row(
                vec![IndexValue::Node(id), IndexValue::text(profile)],
                vec![Value::Text(name), Value::Number(base + ordinal as f64)],
            )
            .unwrap();
    }

    ProfileDataset::from_reader(ReaderOutput {
        graph,
        table,
        metadata,
        exclusive_metrics: vec!["time".to_string()],
        inclusive_metrics: vec![],
        profile: IndexValue::text(profile),
        source: format!("{}.cali", profile),
    })
    .unwrap()
}

/// Root -> {Foo, Bar}
fn dataset_a(profile: &str) -> ProfileDataset {
    dataset_on(graph(&[&["Root", "Foo"], &["Root", "Bar"]]), profile, 10.0, 4.0)
}

/// Root -> {Foo, Baz}
fn dataset_b(profile: &str) -> ProfileDataset {
    dataset_on(graph(&[&["Root", "Foo"], &["Root", "Baz"]]), profile, 20.0, 8.0)
}

fn sorted_rows(rows: &[Row]) -> Vec<Row> {
    let mut rows = rows.to_vec();
    rows.sort_by(|a, b| a.index.cmp(&b.index));
    rows
}

fn key(graph: &CallGraph, path: &[&str], profile: IndexValue) -> Vec<IndexValue> {
    vec![IndexValue::Node(graph.find_path(path).unwrap()), profile]
}

mod stack_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_shared_graph_takes_fast_path() {
        let shared = graph(&[&["main", "solve"], &["main", "io"]]);
        let datasets = vec![
            dataset_on(Arc::clone(&shared), "p1", 1.0, 4.0),
            dataset_on(Arc::clone(&shared), "p2", 2.0, 8.0),
        ];

        let ensemble = stack(&datasets, true).unwrap();

        assert!(Arc::ptr_eq(ensemble.graph(), &shared));
        assert_eq!(ensemble.graph().traverse(), shared.traverse());
        assert_eq!(ensemble.table().len(), 6);
    }

    #[test]
    fn test_disjoint_leaves_unify_to_four_nodes() {
        let ensemble = stack(&[dataset_a("a"), dataset_b("b")], true).unwrap();
        let graph = ensemble.graph();

        let names: Vec<&str> = graph.traverse().into_iter().map(|id| graph.frame(id).unwrap().name()).collect();
        assert_eq!(names, vec!["Root", "Foo", "Bar", "Baz"]);

        // 4 nodes x 2 profiles, two of them filled
        assert_eq!(ensemble.table().len(), 8);
        let filled = ensemble
            .table()
            .find_row(&key(graph, &["Root", "Bar"], IndexValue::text("b")))
            .unwrap();
        assert_eq!(filled.values, vec![Value::Null, Value::Missing]);
        let filled = ensemble
            .table()
            .find_row(&key(graph, &["Root", "Baz"], IndexValue::text("a")))
            .unwrap();
        assert_eq!(filled.values, vec![Value::Null, Value::Missing]);

        let measured = ensemble
            .table()
            .find_row(&key(graph, &["Root", "Baz"], IndexValue::text("b")))
            .unwrap();
        assert_eq!(measured.values, vec![Value::text("Baz"), Value::Number(22.0)]);
    }

    #[test]
    fn test_without_fill_only_measured_rows() {
        let ensemble = stack(&[dataset_a("a"), dataset_b("b")], false).unwrap();
        let graph = ensemble.graph();

        assert_eq!(ensemble.table().len(), 6);
        assert!(ensemble
            .table()
            .find_row(&key(graph, &["Root", "Bar"], IndexValue::text("b")))
            .is_none());
    }

    #[test]
    fn test_rows_sorted_by_ordinal_then_profile() {
        let ensemble = stack(&[dataset_b("b"), dataset_a("a")], true).unwrap();
        let graph = ensemble.graph();

        let order: Vec<(usize, IndexValue)> = ensemble
            .table()
            .rows()
            .iter()
            .map(|r| (graph.ordinal(r.index[0].as_node().unwrap()).unwrap(), r.index[1].clone()))
            .collect();
        let mut expected = order.clone();
        expected.sort();
        assert_eq!(order, expected);
        assert_eq!(order[0], (0, IndexValue::text("a")));
    }

    #[test]
    fn test_ordinals_follow_traversal() {
        let ensemble = stack(&[dataset_a("a"), dataset_b("b")], true).unwrap();
        let graph = ensemble.graph();
        let order = graph.traverse();

        assert_eq!(order.len(), graph.len());
        for (position, id) in order.into_iter().enumerate() {
            assert_eq!(graph.ordinal(id), Some(position));
        }
    }

    #[test]
    fn test_every_row_points_into_the_graph() {
        let ensemble = stack(&[dataset_a("a"), dataset_b("b")], true).unwrap();
        let reachable = ensemble.graph().traverse();

        for table in [ensemble.table(), ensemble.statistics()] {
            for row in table.rows() {
                assert!(reachable.contains(&row.index[0].as_node().unwrap()));
            }
        }
        assert_eq!(ensemble.statistics().len(), 4);
    }

    #[test]
    fn test_single_dataset_round_trip() {
        let dataset = dataset_a("a");
        let ensemble = stack(std::slice::from_ref(&dataset), true).unwrap();

        assert_eq!(**ensemble.graph(), **dataset.graph());
        assert_eq!(sorted_rows(ensemble.table().rows()), sorted_rows(dataset.table().rows()));
        assert_eq!(ensemble.table().columns(), dataset.table().columns());
        assert_eq!(ensemble.metadata(), dataset.metadata());
    }

    #[test]
    fn test_duplicate_profile_ids_rejected() {
        let result = stack(&[dataset_a("p"), dataset_b("p")], true);
        assert_eq!(result.unwrap_err(), EnsembleError::DuplicateProfileId("p".to_string()));
    }

    #[test]
    fn test_structural_mismatch() {
        let mut left = CallGraph::builder();
        let root = left.add_root(Frame::new("Root"));
        left.add_child(root, Frame::new("Foo").with("type", "function")).unwrap();
        let mut right = CallGraph::builder();
        let root = right.add_root(Frame::new("Root"));
        right.add_child(root, Frame::new("Foo").with("type", "loop")).unwrap();

        let datasets = vec![
            dataset_on(Arc::new(left.finish()), "l", 0.0, 1.0),
            dataset_on(Arc::new(right.finish()), "r", 0.0, 1.0),
        ];
        assert!(matches!(
            stack(&datasets, true),
            Err(EnsembleError::StructuralMismatch { .. })
        ));
    }

    #[test]
    fn test_metadata_profiles_and_metrics() {
        let ensemble = stack(&[dataset_a("a"), dataset_b("b")], true).unwrap();

        assert_eq!(ensemble.profiles(), &[IndexValue::text("a"), IndexValue::text("b")]);
        assert_eq!(ensemble.metadata().len(), 2);
        assert_eq!(ensemble.exclusive_metrics(), &["time".to_string()]);
        assert_eq!(
            ensemble.profile_mapping()[&IndexValue::text("b")],
            vec!["b.cali".to_string()]
        );
    }

    #[test]
    fn test_inputs_untouched() {
        let datasets = vec![dataset_a("a"), dataset_b("b")];
        let before = datasets.clone();
        stack(&datasets, true).unwrap();
        assert_eq!(datasets, before);
    }

    #[test]
    fn test_in_place_rebinds_inputs() {
        let mut datasets = vec![dataset_a("a"), dataset_b("b")];
        let ensemble = EnsembleComposer::default().stack_in_place(&mut datasets).unwrap();

        for dataset in &datasets {
            assert!(Arc::ptr_eq(dataset.graph(), ensemble.graph()));
            dataset.check().unwrap();
        }
        let baz = ensemble.graph().find_path(&["Root", "Baz"]).unwrap();
        assert!(datasets[1]
            .table()
            .rows()
            .iter()
            .any(|r| r.index[0] == IndexValue::Node(baz)));
    }

    #[test]
    fn test_stacked_ensemble_stacks_again() {
        let first: ProfileDataset = stack(&[dataset_a("a1"), dataset_b("b1")], true).unwrap().into();
        let ensemble = stack(&[first, dataset_a("a2")], true).unwrap();

        assert_eq!(ensemble.graph().len(), 4);
        assert_eq!(ensemble.profiles().len(), 3);
        assert_eq!(ensemble.table().len(), 12);
    }

    #[test]
    fn test_add_column_from_metadata() {
        let mut ensemble = stack(&[dataset_a("a"), dataset_b("b")], true).unwrap();
        ensemble.add_column_from_metadata("ranks").unwrap();

        let graph = Arc::clone(ensemble.graph());
        let row = ensemble
            .table()
            .find_row(&key(&graph, &["Root"], IndexValue::text("b")))
            .unwrap();
        assert_eq!(row.values.last(), Some(&Value::Number(8.0)));

        assert_eq!(
            ensemble.add_column_from_metadata("nodes").unwrap_err(),
            EnsembleError::NotAProfileColumn("nodes".to_string())
        );
    }

    #[test]
    fn test_filter_profiles() {
        let ensemble = stack(&[dataset_a("a"), dataset_b("b")], true).unwrap();
        let filtered = ensemble
            .filter_profiles(|record| record.iter().any(|(field, value)| *field == "ranks" && value.as_f64() == Some(8.0)))
            .unwrap();

        assert_eq!(filtered.profiles(), &[IndexValue::text("b")]);
        assert_eq!(filtered.table().len(), 4);
        assert_eq!(filtered.metadata().len(), 1);
        assert!(Arc::ptr_eq(filtered.graph(), ensemble.graph()));
    }

    #[test]
    fn test_validate_after_caller_edit() {
        let mut ensemble = stack(&[dataset_a("a"), dataset_b("b")], true).unwrap();
        let foo = ensemble.graph().find_path(&["Root", "Foo"]).unwrap();
        ensemble
            .table_mut()
            .push_row(
                vec![IndexValue::Node(foo), IndexValue::text("c")],
                vec![Value::text("Bar"), Value::Number(0.0)],
            )
            .unwrap();

        assert!(matches!(
            ensemble.validate(),
            Err(EnsembleError::NameConsistency { .. })
        ));
    }

    fn time(ensemble: &callpath_ensemble::ensemble::StackedEnsemble, node: NodeId, profile: &str) -> Value {
        ensemble
            .table()
            .find_row(&[IndexValue::Node(node), IndexValue::text(profile)])
            .unwrap()
            .values[1]
            .clone()
    }

    #[test]
    fn test_tree_and_dag_keep_distinct_nodes() {
        let tree = dataset_on(graph(&[&["main", "a", "x"], &["main", "b", "x"]]), "p1", 10.0, 4.0);
        let dag = dataset_on(dag_graph(), "p2", 20.0, 8.0);
        let ensemble = stack(&[tree, dag], true).unwrap();

        let graph = ensemble.graph();
        // main, a, x, b, x
        assert_eq!(graph.len(), 5);
        let x_under_a = graph.find_path(&["main", "a", "x"]).unwrap();
        let x_under_b = graph.find_path(&["main", "b", "x"]).unwrap();
        assert_ne!(x_under_a, x_under_b);
        assert_eq!(ensemble.table().len(), 10);

        // p1 keeps one row per x with its own time
        assert_eq!(time(&ensemble, x_under_a, "p1"), Value::Number(12.0));
        assert_eq!(time(&ensemble, x_under_b, "p1"), Value::Number(14.0));

        // p2's single x lands on one of them, the other is filled
        let p2: Vec<Value> = [x_under_a, x_under_b].iter().map(|x| time(&ensemble, *x, "p2")).collect();
        assert!(p2.contains(&Value::Number(22.0)));
        assert!(p2.contains(&Value::Missing));
    }

    #[test]
    fn test_dag_then_tree_keep_distinct_nodes() {
        let dag = dataset_on(dag_graph(), "p1", 20.0, 8.0);
        let tree = dataset_on(graph(&[&["main", "a", "x"], &["main", "b", "x"]]), "p2", 10.0, 4.0);

        let ensemble = stack(&[dag, tree], false).unwrap();
        assert_eq!(ensemble.graph().len(), 5);
        // 4 measured rows for the DAG, 5 for the tree
        assert_eq!(ensemble.table().len(), 9);
        assert!(ensemble.validate().is_ok());
    }

    #[test]
    fn test_siblings_differing_by_kind() {
        let ensemble = stack(
            &[dataset_on(kinds_graph(), "p1", 10.0, 4.0), dataset_on(kinds_graph(), "p2", 20.0, 8.0)],
            true,
        )
        .unwrap();

        assert_eq!(ensemble.graph().len(), 3);
        assert_eq!(ensemble.table().len(), 6);
        let looped = node_of_kind(ensemble.graph(), "loop");
        let function = node_of_kind(ensemble.graph(), "function");
        assert_eq!(time(&ensemble, function, "p1"), Value::Number(11.0));
        assert_eq!(time(&ensemble, looped, "p1"), Value::Number(12.0));
        assert_eq!(time(&ensemble, looped, "p2"), Value::Number(22.0));
    }

    #[test]
    fn test_absent_metadata_value_defers_to_other_profiles() {
        let mut gap = BTreeMap::new();
        gap.insert("ranks".to_string(), Value::Null);
        let root_foo = || graph(&[&["Root", "Foo"]]);

        for order in [["a", "gap"], ["gap", "a"]] {
            let datasets: Vec<ProfileDataset> = order
                .iter()
                .map(|name| match *name {
                    "gap" => dataset_with_metadata(root_foo(), "gap", 1.0, gap.clone()),
                    other => dataset_on(root_foo(), other, 1.0, 4.0),
                })
                .collect();
            let ensemble = stack(&datasets, true).unwrap();

            let metadata = ensemble.metadata();
            let ranks = metadata.columns().iter().find(|c| c.label == "ranks").unwrap();
            assert_eq!(ranks.kind, ColumnKind::Numeric);
            let gap_row = metadata.find_row(&[IndexValue::text("gap")]).unwrap();
            let position = metadata.column_position(&"ranks".to_string()).unwrap();
            assert_eq!(gap_row.values[position], Value::Null);
        }
    }
}

mod join_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_header_join_mirrors_table() {
        let dataset = dataset_a("a");
        let ensemble = columnar_join(std::slice::from_ref(&dataset), &["H"], None).unwrap();

        let labels: Vec<JoinedColumn> = ensemble.table().columns().iter().map(|c| c.label.clone()).collect();
        assert_eq!(labels, vec![JoinedColumn::top("name"), JoinedColumn::under("H", "time")]);
        assert_eq!(ensemble.table().len(), dataset.table().len());

        for row in dataset.table().rows() {
            let joined = ensemble
                .table()
                .find_row(&[row.index[0].clone(), IndexValue::Int(0)])
                .unwrap();
            assert_eq!(joined.values, row.values);
        }
    }

    #[test]
    fn test_two_headers_share_one_name_column() {
        let ensemble = columnar_join(&[dataset_a("a"), dataset_b("b")], &["A", "B"], None).unwrap();
        let table = ensemble.table();

        let names = table.columns().iter().filter(|c| c.label.name == "name").count();
        assert_eq!(names, 1);
        let headers: Vec<Option<&str>> = table.columns().iter().map(|c| c.label.header.as_deref()).collect();
        assert_eq!(headers, vec![None, Some("A"), Some("B")]);

        // Root, Foo, Bar, Baz at key 0; fewer rows than the 6 input rows
        assert_eq!(table.len(), 4);
        let graph = ensemble.graph();
        let bar = table.find_row(&key(graph, &["Root", "Bar"], IndexValue::Int(0))).unwrap();
        assert_eq!(
            bar.values,
            vec![Value::text("Bar"), Value::Number(12.0), Value::Missing]
        );
        let foo = table.find_row(&key(graph, &["Root", "Foo"], IndexValue::Int(0))).unwrap();
        assert_eq!(
            foo.values,
            vec![Value::text("Foo"), Value::Number(11.0), Value::Number(21.0)]
        );
    }

    #[test]
    fn test_join_labels_and_statistics() {
        let ensemble = columnar_join(&[dataset_a("a"), dataset_b("b")], &["A", "B"], None).unwrap();

        assert_eq!(
            ensemble.exclusive_metrics(),
            &[JoinedColumn::under("A", "time"), JoinedColumn::under("B", "time")]
        );
        assert_eq!(ensemble.profiles(), &[IndexValue::Int(0)]);
        assert_eq!(
            ensemble.profile_mapping()[&IndexValue::Int(0)],
            vec!["A:a.cali".to_string(), "B:b.cali".to_string()]
        );
        assert_eq!(ensemble.statistics().columns()[0].label, JoinedColumn::top("name"));
        assert_eq!(ensemble.statistics().len(), 4);
    }

    #[test]
    fn test_positional_join_needs_equal_profile_counts() {
        let two: ProfileDataset = stack(&[dataset_a("a1"), dataset_a("a2")], true).unwrap().into();
        let err = columnar_join(&[two, dataset_b("b")], &["A", "B"], None).unwrap_err();
        assert_eq!(
            err,
            EnsembleError::LengthMismatch {
                header: "B".to_string(),
                expected: 2,
                found: 1,
            }
        );
    }

    #[test]
    fn test_keyed_join_pairs_by_metadata() {
        let left: ProfileDataset = stack(
            &[
                dataset_on(graph(&[&["Root", "Foo"]]), "l4", 100.0, 4.0),
                dataset_on(graph(&[&["Root", "Foo"]]), "l8", 200.0, 8.0),
            ],
            true,
        )
        .unwrap()
        .into();
        let right: ProfileDataset = stack(
            &[
                dataset_on(graph(&[&["Root", "Foo"]]), "r8", 800.0, 8.0),
                dataset_on(graph(&[&["Root", "Foo"]]), "r4", 400.0, 4.0),
            ],
            true,
        )
        .unwrap()
        .into();

        let ensemble = columnar_join(&[left, right], &["L", "R"], Some("ranks")).unwrap();
        assert_eq!(ensemble.profiles(), &[IndexValue::Int(4), IndexValue::Int(8)]);

        let graph = ensemble.graph();
        let row = ensemble
            .table()
            .find_row(&key(graph, &["Root"], IndexValue::Int(4)))
            .unwrap();
        assert_eq!(
            row.values,
            vec![Value::text("Root"), Value::Number(100.0), Value::Number(400.0)]
        );
        assert_eq!(
            ensemble.metadata().get(0, &JoinedColumn::under("R", "profile")),
            Some(&Value::text("r4"))
        );
    }

    #[test]
    fn test_keyed_join_rejects_duplicate_key_values() {
        let left: ProfileDataset = stack(&[dataset_a("a1"), dataset_a("a2")], true).unwrap().into();
        let right: ProfileDataset = stack(&[dataset_b("b1"), dataset_a("b2")], true).unwrap().into();

        let err = columnar_join(&[left, right], &["L", "R"], Some("ranks")).unwrap_err();
        assert_eq!(
            err,
            EnsembleError::DuplicateKeyValue {
                key: "ranks".to_string(),
                header: "L".to_string(),
                value: "4".to_string(),
            }
        );
    }

    #[test]
    fn test_keyed_join_missing_field() {
        let err = columnar_join(&[dataset_a("a"), dataset_b("b")], &["A", "B"], Some("nodes")).unwrap_err();
        assert!(matches!(err, EnsembleError::InvalidKey { ref key, .. } if key == "nodes"));
    }

    #[test]
    fn test_join_requires_node_and_profile_levels() {
        let graph = graph(&[&["Root"]]);
        let mut table = Table::new(
            vec!["node".to_string(), "profile".to_string(), "rank".to_string()],
            vec![Column::new("time".to_string(), ColumnKind::Numeric)],
        )
        .unwrap();
        table
            .push_row(
                vec![IndexValue::Node(NodeId::new(0)), IndexValue::text("x"), IndexValue::Int(0)],
                vec![Value::Number(1.0)],
            )
            .unwrap();
        let ranked = ProfileDataset::from_reader(ReaderOutput {
            graph,
            table,
            metadata: BTreeMap::new(),
            exclusive_metrics: vec![],
            inclusive_metrics: vec![],
            profile: IndexValue::text("x"),
            source: "x.cali".to_string(),
        })
        .unwrap();

        assert!(matches!(
            columnar_join(&[ranked], &["X"], None),
            Err(EnsembleError::InvalidIndexShape { .. })
        ));
    }

    #[test]
    fn test_join_in_place_keeps_profile_ids() {
        let mut datasets = vec![dataset_a("a"), dataset_b("b")];
        let composer = EnsembleComposer::new(ComposeOptions::new().with_progress(true));
        let ensemble = composer.columnar_join_in_place(&mut datasets, &["A", "B"], None).unwrap();

        assert!(Arc::ptr_eq(datasets[0].graph(), ensemble.graph()));
        assert_eq!(datasets[0].profiles(), &[IndexValue::text("a")]);
        datasets[1].check().unwrap();
    }

    #[test]
    fn test_join_tree_with_dag() {
        let tree = dataset_on(graph(&[&["main", "a", "x"], &["main", "b", "x"]]), "p1", 10.0, 4.0);
        let dag = dataset_on(dag_graph(), "p2", 20.0, 8.0);
        let ensemble = columnar_join(&[tree, dag], &["tree", "dag"], None).unwrap();

        let graph = ensemble.graph();
        assert_eq!(graph.len(), 5);
        assert_eq!(ensemble.table().len(), 5);
        let x_under_a = graph.find_path(&["main", "a", "x"]).unwrap();
        let x_under_b = graph.find_path(&["main", "b", "x"]).unwrap();
        for x in [x_under_a, x_under_b] {
            assert!(ensemble.table().find_row(&[IndexValue::Node(x), IndexValue::Int(0)]).is_some());
        }
    }

    #[test]
    fn test_join_siblings_differing_by_kind() {
        let ensemble = columnar_join(
            &[dataset_on(kinds_graph(), "p1", 10.0, 4.0), dataset_on(kinds_graph(), "p2", 20.0, 8.0)],
            &["base", "opt"],
            None,
        )
        .unwrap();

        assert_eq!(ensemble.graph().len(), 3);
        assert_eq!(ensemble.table().len(), 3);
        let looped = node_of_kind(ensemble.graph(), "loop");
        let row = ensemble.table().find_row(&[IndexValue::Node(looped), IndexValue::Int(0)]).unwrap();
        assert_eq!(
            row.values,
            vec![Value::text("foo"), Value::Number(12.0), Value::Number(22.0)]
        );
    }
}
