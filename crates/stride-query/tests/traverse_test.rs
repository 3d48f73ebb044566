// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

use std::sync::Arc;
use stride_common::config::ExecConfig;
use stride_common::core::schema::{SchemaDescriptor, SchemaManager, SpaceSchema};
use stride_common::core::value::{PropertyType, PropertyValue};
use stride_common::error::Result;
use stride_common::expr::{BinaryOp, Expr};
use stride_query::ast::{
    FromClause, OverClause, OverEdge, OverEdges, StepClause, TraverseQuery, YieldClause,
    YieldColumn,
};
use stride_query::exec::{TraverseExecutor, TraverseOutput};
use stride_query::interim::{InterimResult, VariableHolder};
use stride_query::response::{ColumnValue, ExecutionResponse, Row};
use stride_store::client::GraphStorageClient;
use stride_store::memory::MemoryGraphStore;

const SPACE: i32 = 1;

/// Space with `person(name, age)` vertices 1..4 and `follow(since)` edges
/// 1->2, 1->3, 2->4, 3->4. A second edge type `serve(years)` stays empty
/// unless a test adds to it.
fn setup() -> (Arc<SpaceSchema>, Arc<MemoryGraphStore>) {
    let mut space = SpaceSchema::new(SPACE);
    space.add_tag(
        "person",
        SchemaDescriptor::new()
            .with_default("name", PropertyType::String, PropertyValue::Str("".into()))
            .with_field("age", PropertyType::Int),
    );
    space.add_edge(
        "follow",
        SchemaDescriptor::new().with_field("since", PropertyType::Int),
    );
    space.add_edge(
        "serve",
        SchemaDescriptor::new().with_field("years", PropertyType::Int),
    );
    let schema = Arc::new(space);

    let store = MemoryGraphStore::new(SPACE, 2, schema.clone());
    for (id, name, age) in [
        (1, "alice", 20),
        (2, "bob", 25),
        (3, "carol", 30),
        (4, "dave", 35),
    ] {
        store
            .add_vertex(id, "person", vec![("name", name.into()), ("age", PropertyValue::Int(age))])
            .unwrap();
    }
    for (src, dst, since) in [(1, 2, 2019), (1, 3, 2018), (2, 4, 2020), (3, 4, 2021)] {
        store
            .add_edge(src, dst, "follow", 0, vec![("since", PropertyValue::Int(since))])
            .unwrap();
    }
    (schema, Arc::new(store))
}

fn from_ids(ids: &[i64]) -> FromClause {
    FromClause::Instant(ids.iter().map(|id| Expr::literal(*id)).collect())
}

fn over(edges: &[&str], reversely: bool) -> OverClause {
    OverClause {
        edges: OverEdges::Edges(edges.iter().map(|e| OverEdge::new(e)).collect()),
        reversely,
    }
}

fn yielding(columns: Vec<YieldColumn>) -> Option<YieldClause> {
    Some(YieldClause {
        columns,
        distinct: false,
    })
}

fn go(from: FromClause, over_clause: OverClause, yields: Option<YieldClause>) -> TraverseQuery {
    TraverseQuery {
        step: StepClause::default(),
        from,
        over: over_clause,
        filter: None,
        yield_clause: yields,
    }
}

fn executor(
    schema: &Arc<SpaceSchema>,
    store: &Arc<MemoryGraphStore>,
    query: TraverseQuery,
) -> TraverseExecutor {
    let schema: Arc<dyn SchemaManager> = schema.clone();
    let storage: Arc<dyn GraphStorageClient> = store.clone();
    TraverseExecutor::new(SPACE, schema, storage, ExecConfig::default(), query)
}

async fn run(
    schema: &Arc<SpaceSchema>,
    store: &Arc<MemoryGraphStore>,
    query: TraverseQuery,
) -> Result<ExecutionResponse> {
    match executor(schema, store, query).execute().await? {
        TraverseOutput::Response(resp) => Ok(resp),
        TraverseOutput::Interim(_) => panic!("expected a terminal response"),
    }
}

fn sorted(mut rows: Vec<Row>) -> Vec<Row> {
    rows.sort_by_key(|r| format!("{:?}", r));
    rows
}

fn id_rows(ids: &[i64]) -> Vec<Row> {
    ids.iter()
        .map(|id| Row {
            columns: vec![ColumnValue::Id(*id)],
        })
        .collect()
}

#[tokio::test]
async fn test_single_hop_literal_start() {
    let (schema, store) = setup();
    let query = go(
        from_ids(&[1]),
        over(&["follow"], false),
        yielding(vec![YieldColumn::new(Expr::edge_dst_id("follow"))]),
    );
    let resp = run(&schema, &store, query).await.unwrap();
    assert_eq!(resp.column_names, vec!["follow._dst"]);
    assert_eq!(sorted(resp.rows), id_rows(&[2, 3]));
}

#[tokio::test]
async fn test_two_hops_yields_one_row_per_path() {
    let (schema, store) = setup();
    let mut query = go(
        from_ids(&[1]),
        over(&["follow"], false),
        yielding(vec![YieldColumn::new(Expr::dst_prop("person", "name"))]),
    );
    query.step = StepClause {
        steps: 2,
        upto: false,
    };
    let resp = run(&schema, &store, query).await.unwrap();
    // 1 -> {2,3} -> 4: two paths, both ending at dave.
    assert_eq!(resp.rows.len(), 2);
    for row in &resp.rows {
        assert_eq!(row.columns, vec![ColumnValue::Str("dave".into())]);
    }
}

#[tokio::test]
async fn test_two_hops_distinct_dedups() {
    let (schema, store) = setup();
    let mut query = go(
        from_ids(&[1]),
        over(&["follow"], false),
        Some(YieldClause {
            columns: vec![YieldColumn::new(Expr::dst_prop("person", "name"))],
            distinct: true,
        }),
    );
    query.step = StepClause {
        steps: 2,
        upto: false,
    };
    let resp = run(&schema, &store, query).await.unwrap();
    assert_eq!(resp.rows.len(), 1);
    assert_eq!(resp.rows[0].columns, vec![ColumnValue::Str("dave".into())]);
}

#[tokio::test]
async fn test_reverse_fetches_edge_props() {
    let (schema, store) = setup();
    let query = go(
        from_ids(&[4]),
        over(&["follow"], true),
        yielding(vec![YieldColumn::new(Expr::alias_prop("follow", "since"))]),
    );
    let resp = run(&schema, &store, query).await.unwrap();
    let expected = vec![
        Row {
            columns: vec![ColumnValue::Integer(2020)],
        },
        Row {
            columns: vec![ColumnValue::Integer(2021)],
        },
    ];
    assert_eq!(sorted(resp.rows), expected);
    // Reverse traversal is two RPC rounds: the edge rows live on the
    // forward index.
    assert_eq!(store.edge_props_calls(), 1);
}

#[tokio::test]
async fn test_reverse_dst_props_only_skips_edge_fetch() {
    let (schema, store) = setup();
    let query = go(
        from_ids(&[4]),
        over(&["follow"], true),
        yielding(vec![YieldColumn::new(Expr::dst_prop("person", "name"))]),
    );
    let resp = run(&schema, &store, query).await.unwrap();
    let names: Vec<_> = sorted(resp.rows);
    assert_eq!(
        names,
        vec![
            Row {
                columns: vec![ColumnValue::Str("bob".into())]
            },
            Row {
                columns: vec![ColumnValue::Str("carol".into())]
            },
        ]
    );
    assert_eq!(store.edge_props_calls(), 0);
    assert_eq!(store.vertex_props_calls(), 1);
}

#[tokio::test]
async fn test_reverse_dst_id_semantics() {
    let (schema, store) = setup();
    let query = go(
        from_ids(&[4]),
        over(&["follow"], true),
        yielding(vec![YieldColumn::new(Expr::edge_dst_id("follow"))]),
    );
    let resp = run(&schema, &store, query).await.unwrap();
    // The forward edges end at 4; their `_dst` is the queried vertex.
    assert_eq!(sorted(resp.rows), id_rows(&[4, 4]));
}

#[tokio::test]
async fn test_pipeline_input_carries_root_columns() {
    let (schema, store) = setup();
    let mut input = InterimResult::with_types(
        vec!["vid".into(), "age".into()],
        vec![PropertyType::Vid, PropertyType::Int],
    );
    input.push_row(vec![PropertyValue::Int(1), PropertyValue::Int(30)]);
    input.push_row(vec![PropertyValue::Int(2), PropertyValue::Int(40)]);

    let query = go(
        FromClause::Pipe {
            column: "vid".into(),
        },
        over(&["follow"], false),
        yielding(vec![
            YieldColumn::new(Expr::edge_dst_id("follow")),
            YieldColumn::new(Expr::input_prop("age")),
        ]),
    );
    let exec = executor(&schema, &store, query).with_input(Arc::new(input));
    let TraverseOutput::Response(resp) = exec.execute().await.unwrap() else {
        panic!("expected response");
    };
    let expected = vec![
        Row {
            columns: vec![ColumnValue::Id(2), ColumnValue::Integer(30)],
        },
        Row {
            columns: vec![ColumnValue::Id(3), ColumnValue::Integer(30)],
        },
        Row {
            columns: vec![ColumnValue::Id(4), ColumnValue::Integer(40)],
        },
    ];
    assert_eq!(sorted(resp.rows), expected);
}

#[tokio::test]
async fn test_pipeline_input_resolves_across_hops() {
    let (schema, store) = setup();
    let mut input = InterimResult::with_types(
        vec!["vid".into(), "age".into()],
        vec![PropertyType::Vid, PropertyType::Int],
    );
    input.push_row(vec![PropertyValue::Int(1), PropertyValue::Int(30)]);

    let mut query = go(
        FromClause::Pipe {
            column: "vid".into(),
        },
        over(&["follow"], false),
        yielding(vec![
            YieldColumn::new(Expr::edge_dst_id("follow")),
            YieldColumn::new(Expr::input_prop("age")),
        ]),
    );
    query.step = StepClause {
        steps: 2,
        upto: false,
    };
    let exec = executor(&schema, &store, query).with_input(Arc::new(input));
    let TraverseOutput::Response(resp) = exec.execute().await.unwrap() else {
        panic!("expected response");
    };
    // Both second-hop sources (2 and 3) trace back to root 1, age 30.
    let expected = vec![
        Row {
            columns: vec![ColumnValue::Id(4), ColumnValue::Integer(30)],
        },
        Row {
            columns: vec![ColumnValue::Id(4), ColumnValue::Integer(30)],
        },
    ];
    assert_eq!(sorted(resp.rows), expected);
}

#[tokio::test]
async fn test_variable_input() {
    let (schema, store) = setup();
    let mut var = InterimResult::with_types(
        vec!["vid".into(), "age".into()],
        vec![PropertyType::Vid, PropertyType::Int],
    );
    var.push_row(vec![PropertyValue::Int(1), PropertyValue::Int(30)]);
    let holder = Arc::new(VariableHolder::new());
    holder.set("v", Arc::new(var));

    let query = go(
        FromClause::Variable {
            var: "v".into(),
            column: "vid".into(),
        },
        over(&["follow"], false),
        yielding(vec![
            YieldColumn::new(Expr::edge_dst_id("follow")),
            YieldColumn::new(Expr::VariableProp {
                var: "v".into(),
                prop: "age".into(),
            }),
        ]),
    );
    let exec = executor(&schema, &store, query).with_variables(holder);
    let TraverseOutput::Response(resp) = exec.execute().await.unwrap() else {
        panic!("expected response");
    };
    let expected = vec![
        Row {
            columns: vec![ColumnValue::Id(2), ColumnValue::Integer(30)],
        },
        Row {
            columns: vec![ColumnValue::Id(3), ColumnValue::Integer(30)],
        },
    ];
    assert_eq!(sorted(resp.rows), expected);
}

#[tokio::test]
async fn test_partial_failure_keeps_surviving_rows() {
    let (schema, store) = setup();
    // Vertex 2 lives on shard 0, vertex 1 on shard 1.
    store.fail_shard(0);
    let query = go(
        from_ids(&[1, 2]),
        over(&["follow"], false),
        yielding(vec![YieldColumn::new(Expr::edge_dst_id("follow"))]),
    );
    let resp = run(&schema, &store, query).await.unwrap();
    // 2 -> 4 is lost with its shard; 1's edges survive.
    assert_eq!(sorted(resp.rows), id_rows(&[2, 3]));
}

#[tokio::test]
async fn test_total_failure_is_fatal() {
    let (schema, store) = setup();
    store.fail_shard(0);
    store.fail_shard(1);
    let query = go(
        from_ids(&[1, 2]),
        over(&["follow"], false),
        yielding(vec![YieldColumn::new(Expr::edge_dst_id("follow"))]),
    );
    let err = run(&schema, &store, query).await.unwrap_err();
    assert!(matches!(err, stride_common::StrideError::Remote(_)));
}

#[tokio::test]
async fn test_empty_input_short_circuits() {
    let (schema, store) = setup();
    let input = InterimResult::with_types(
        vec!["vid".into(), "age".into()],
        vec![PropertyType::Vid, PropertyType::Int],
    );
    let query = go(
        FromClause::Pipe {
            column: "vid".into(),
        },
        over(&["follow"], false),
        yielding(vec![
            YieldColumn::new(Expr::edge_dst_id("follow")),
            YieldColumn::named(Expr::input_prop("age"), "age"),
        ]),
    );
    let exec = executor(&schema, &store, query).with_input(Arc::new(input));
    let TraverseOutput::Response(resp) = exec.execute().await.unwrap() else {
        panic!("expected response");
    };
    assert_eq!(resp.column_names, vec!["follow._dst", "age"]);
    assert!(resp.rows.is_empty());
    // No storage request was issued.
    assert_eq!(store.neighbors_calls(), 0);
}

#[tokio::test]
async fn test_dead_end_frontier_finishes_empty() {
    let (schema, store) = setup();
    let mut query = go(
        from_ids(&[4]),
        over(&["follow"], false),
        yielding(vec![YieldColumn::new(Expr::edge_dst_id("follow"))]),
    );
    query.step = StepClause {
        steps: 2,
        upto: false,
    };
    let resp = run(&schema, &store, query).await.unwrap();
    assert!(resp.rows.is_empty());
    assert_eq!(resp.column_names, vec!["follow._dst"]);
    assert_eq!(store.neighbors_calls(), 1);
}

#[tokio::test]
async fn test_over_all_with_empty_yield_synthesizes_dst_columns() {
    let (schema, store) = setup();
    let query = go(
        from_ids(&[1]),
        OverClause {
            edges: OverEdges::All,
            reversely: false,
        },
        None,
    );
    let resp = run(&schema, &store, query).await.unwrap();
    assert_eq!(resp.column_names, vec!["follow._dst", "serve._dst"]);
    // Only follow edges exist from 1; the serve column is zero-filled.
    let expected = vec![
        Row {
            columns: vec![ColumnValue::Id(2), ColumnValue::Id(0)],
        },
        Row {
            columns: vec![ColumnValue::Id(3), ColumnValue::Id(0)],
        },
    ];
    assert_eq!(sorted(resp.rows), expected);
}

#[tokio::test]
async fn test_over_all_empty_yield_empty_input_keeps_columns() {
    let (schema, store) = setup();
    let input = InterimResult::with_types(vec!["vid".into()], vec![PropertyType::Vid]);
    let query = go(
        FromClause::Pipe {
            column: "vid".into(),
        },
        OverClause {
            edges: OverEdges::All,
            reversely: false,
        },
        None,
    );
    let exec = executor(&schema, &store, query).with_input(Arc::new(input));
    let TraverseOutput::Response(resp) = exec.execute().await.unwrap() else {
        panic!("expected response");
    };
    // The synthesized dst-id columns survive the empty-input short-circuit.
    assert_eq!(resp.column_names, vec!["follow._dst", "serve._dst"]);
    assert!(resp.rows.is_empty());
    assert_eq!(store.neighbors_calls(), 0);
}

#[tokio::test]
async fn test_over_all_empty_yield_dead_end_keeps_columns() {
    let (schema, store) = setup();
    let mut query = go(
        from_ids(&[4]),
        OverClause {
            edges: OverEdges::All,
            reversely: false,
        },
        None,
    );
    query.step = StepClause {
        steps: 2,
        upto: false,
    };
    let resp = run(&schema, &store, query).await.unwrap();
    assert_eq!(resp.column_names, vec!["follow._dst", "serve._dst"]);
    assert!(resp.rows.is_empty());
    assert_eq!(store.neighbors_calls(), 1);
}

#[tokio::test]
async fn test_union_over_edges_defaults_other_edge_columns() {
    let (schema, store) = setup();
    store
        .add_edge(1, 4, "serve", 0, vec![("years", PropertyValue::Int(3))])
        .unwrap();
    let query = go(
        from_ids(&[1]),
        over(&["follow", "serve"], false),
        yielding(vec![
            YieldColumn::new(Expr::edge_dst_id("follow")),
            YieldColumn::new(Expr::alias_prop("serve", "years")),
        ]),
    );
    let resp = run(&schema, &store, query).await.unwrap();
    let expected = vec![
        // The serve record: follow._dst is zero for a foreign edge.
        Row {
            columns: vec![ColumnValue::Id(0), ColumnValue::Integer(3)],
        },
        // Follow records: serve.years falls back to its schema default.
        Row {
            columns: vec![ColumnValue::Id(2), ColumnValue::Integer(0)],
        },
        Row {
            columns: vec![ColumnValue::Id(3), ColumnValue::Integer(0)],
        },
    ];
    assert_eq!(sorted(resp.rows), expected);
}

#[tokio::test]
async fn test_near_expands_to_id_list() {
    let (schema, store) = setup();
    let query = go(
        FromClause::Instant(vec![Expr::FunctionCall {
            name: "near".into(),
            args: vec![Expr::literal("1, 2")],
        }]),
        over(&["follow"], false),
        yielding(vec![YieldColumn::new(Expr::edge_dst_id("follow"))]),
    );
    let resp = run(&schema, &store, query).await.unwrap();
    assert_eq!(sorted(resp.rows), id_rows(&[2, 3, 4]));
}

#[tokio::test]
async fn test_distinct_start_set() {
    let (schema, store) = setup();
    let query = go(
        from_ids(&[1, 1, 1]),
        over(&["follow"], false),
        Some(YieldClause {
            columns: vec![YieldColumn::new(Expr::edge_dst_id("follow"))],
            distinct: true,
        }),
    );
    let resp = run(&schema, &store, query).await.unwrap();
    assert_eq!(sorted(resp.rows), id_rows(&[2, 3]));
}

#[tokio::test]
async fn test_src_prop_and_filter() {
    let (schema, store) = setup();
    let mut query = go(
        from_ids(&[1]),
        over(&["follow"], false),
        yielding(vec![
            YieldColumn::new(Expr::src_prop("person", "name")),
            YieldColumn::new(Expr::alias_prop("follow", "since")),
        ]),
    );
    query.filter = Some(Expr::binary(
        Expr::alias_prop("follow", "since"),
        BinaryOp::Ge,
        Expr::literal(2019i64),
    ));
    let resp = run(&schema, &store, query).await.unwrap();
    assert_eq!(resp.rows.len(), 1);
    assert_eq!(
        resp.rows[0].columns,
        vec![
            ColumnValue::Str("alice".into()),
            ColumnValue::Integer(2019)
        ]
    );
}

#[tokio::test]
async fn test_interim_output_schema() {
    let (schema, store) = setup();
    let query = go(
        from_ids(&[1]),
        over(&["follow"], false),
        yielding(vec![
            YieldColumn::new(Expr::edge_dst_id("follow")),
            YieldColumn::new(Expr::alias_prop("follow", "since")),
        ]),
    );
    let exec = executor(&schema, &store, query).emit_interim();
    let TraverseOutput::Interim(result) = exec.execute().await.unwrap() else {
        panic!("expected interim output");
    };
    assert_eq!(result.column_names(), &["follow._dst", "follow.since"]);
    assert_eq!(
        result.column_types(),
        &[PropertyType::Vid, PropertyType::Int]
    );
    assert_eq!(result.rows().len(), 2);
}
