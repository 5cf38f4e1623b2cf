//! Dataset nodes from source selection to loaded columns, including polling

mod common;

use common::builders::write_csv;
use common::mock_helpers::{headless_app, headless_app_with, FakeSourceFactory, GatedRenderBackend};
use common::test_timeout;
use datacubes_rs::app::{AppCommand, AppMessage, DatacubesApp};
use datacubes_rs::config::AppConfig;
use datacubes_rs::data::{DataType, DefaultSourceFactory, SourceKind, SourceSpec};
use datacubes_rs::dataset::{DatasetCommand, DatasetPhase};
use datacubes_rs::graph::{
    DateFilterPatch, GraphStore, NodeId, NodeKind, NodeState, SourcePort, TargetSlot,
};
use datacubes_rs::types::GraphPoint;
use std::sync::Arc;
use std::time::Duration;

const SHEET_URL: &str = "https://docs.google.com/spreadsheets/d/1AbCdEf/edit#gid=0";

fn dataset_state(app: &DatacubesApp, node: NodeId) -> datacubes_rs::graph::DatasetState {
    app.graph()
        .node(node)
        .and_then(|n| n.state.as_dataset())
        .cloned()
        .unwrap()
}

async fn settle(app: &mut DatacubesApp, node: NodeId) {
    tokio::time::timeout(test_timeout(), async {
        app.drain_pending();
        while app.is_ingesting(node) {
            app.step().await;
        }
    })
    .await
    .expect("ingestion did not settle");
}

fn add_dataset(app: &mut DatacubesApp, bridge: &datacubes_rs::AppBridge) -> NodeId {
    bridge
        .add_node(NodeKind::Dataset, GraphPoint::new(400.0, 20.0))
        .unwrap();
    app.drain_pending();
    bridge
        .drain()
        .into_iter()
        .find_map(|m| match m {
            AppMessage::NodeAdded { node, .. } => Some(node),
            _ => None,
        })
        .unwrap()
}

#[tokio::test]
async fn test_local_csv_loads_through_default_factory() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, "cities.csv", 40);
    let config = AppConfig::default();
    let factory = Arc::new(DefaultSourceFactory::new(&config).unwrap());
    let (mut app, bridge, _engine) =
        headless_app_with(&config, factory, GatedRenderBackend::answering(vec![1]));

    let node = add_dataset(&mut app, &bridge);
    bridge.dataset(node, DatasetCommand::BindFile(path)).unwrap();
    settle(&mut app, node).await;

    assert_eq!(app.dataset_phase(node), Some(DatasetPhase::Loaded));
    let state = dataset_state(&app, node);
    assert_eq!(state.source_kind, SourceKind::Csv);
    assert!(!state.is_loading);
    assert_eq!(state.row_count(), 40);
    let names: Vec<_> = state.column_headers.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["id", "city", "day"]);
    // Header order matches column order.
    for (header, column) in state.column_headers.iter().zip(&state.columns) {
        assert_eq!(header.name, column.name());
    }
    assert_eq!(state.columns[0].data_type(), DataType::Number);
    assert_eq!(state.columns[2].data_type(), DataType::Date);
    assert_eq!(state.columns[1].distinct_values().unwrap().len(), 7);
}

#[tokio::test]
async fn test_malformed_sheet_url_leaves_node_loading() {
    let factory = FakeSourceFactory::new(5);
    let (mut app, bridge, _engine) =
        headless_app(factory.clone(), GatedRenderBackend::answering(vec![1]));
    let node = add_dataset(&mut app, &bridge);

    bridge
        .dataset(node, DatasetCommand::SelectSource(SourceKind::Spreadsheet))
        .unwrap();
    bridge
        .dataset(
            node,
            DatasetCommand::SetSpreadsheetUri("https://docs.google.com/spreadsheets/u/0/".into()),
        )
        .unwrap();
    app.drain_pending();

    let state = dataset_state(&app, node);
    assert!(state.is_loading);
    assert!(state.columns.is_empty());
    assert!(state.column_headers.is_empty());
    assert_eq!(app.dataset_phase(node), Some(DatasetPhase::Error));
    assert!(!app.is_polling(node));
    assert!(factory.created().is_empty());
    assert!(bridge.drain().iter().any(|m| matches!(
        m,
        AppMessage::DatasetPhase {
            phase: DatasetPhase::Error,
            ..
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_spreadsheet_refreshes_every_five_seconds() {
    let factory = FakeSourceFactory::new(5);
    let (mut app, bridge, _engine) =
        headless_app(factory.clone(), GatedRenderBackend::answering(vec![1]));
    let node = add_dataset(&mut app, &bridge);

    bridge
        .dataset(node, DatasetCommand::SelectSource(SourceKind::Spreadsheet))
        .unwrap();
    bridge
        .dataset(node, DatasetCommand::SetSpreadsheetUri(SHEET_URL.into()))
        .unwrap();
    settle(&mut app, node).await;

    assert_eq!(dataset_state(&app, node).row_count(), 5);
    assert!(app.is_polling(node));
    assert_eq!(
        factory.created(),
        vec![SourceSpec::Spreadsheet {
            sheet_id: "1AbCdEf".into()
        }]
    );

    // The sheet grows; the next tick picks it up without a loading flash.
    factory.set_rows(8);
    tokio::time::timeout(Duration::from_secs(6), async {
        while dataset_state(&app, node).row_count() != 8 {
            app.step().await;
            assert!(!dataset_state(&app, node).is_loading);
        }
    })
    .await
    .expect("no refresh within one period");
    assert_eq!(factory.created().len(), 2);

    // Deleting the node tears the timer down.
    bridge.remove_node(node).unwrap();
    app.drain_pending();
    assert!(!app.is_polling(node));
    tokio::time::sleep(Duration::from_secs(20)).await;
    app.drain_pending();
    assert_eq!(factory.created().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_switching_away_from_spreadsheet_stops_polling() {
    let factory = FakeSourceFactory::new(5);
    let (mut app, bridge, _engine) =
        headless_app(factory.clone(), GatedRenderBackend::answering(vec![1]));
    let node = add_dataset(&mut app, &bridge);
    bridge
        .dataset(node, DatasetCommand::SelectSource(SourceKind::Spreadsheet))
        .unwrap();
    bridge
        .dataset(node, DatasetCommand::SetSpreadsheetUri(SHEET_URL.into()))
        .unwrap();
    settle(&mut app, node).await;
    assert!(app.is_polling(node));

    bridge
        .dataset(node, DatasetCommand::SelectSource(SourceKind::Csv))
        .unwrap();
    app.drain_pending();
    assert!(!app.is_polling(node));
    assert_eq!(app.dataset_phase(node), Some(DatasetPhase::Configuring));
    assert!(dataset_state(&app, node).columns.is_empty());
}

#[tokio::test]
async fn test_failed_ingestion_keeps_node_pending() {
    let factory = FakeSourceFactory::new(5);
    factory.set_failing(true);
    let (mut app, bridge, engine) =
        headless_app(factory.clone(), GatedRenderBackend::answering(vec![1]));
    let node = add_dataset(&mut app, &bridge);
    bridge
        .dataset(node, DatasetCommand::SelectSource(SourceKind::Json))
        .unwrap();
    bridge
        .dataset(node, DatasetCommand::SetRemoteUri("https://x/data.json".into()))
        .unwrap();
    settle(&mut app, node).await;

    assert!(dataset_state(&app, node).is_loading);
    assert!(engine_pending(&engine, node));

    // Retrying after the source recovers works.
    factory.set_failing(false);
    bridge
        .dataset(node, DatasetCommand::SetRemoteUri("https://x/data.json".into()))
        .unwrap();
    settle(&mut app, node).await;
    assert!(!dataset_state(&app, node).is_loading);
    assert!(!engine_pending(&engine, node));
}

fn engine_pending(
    engine: &std::rc::Rc<std::cell::RefCell<datacubes_rs::scene::HeadlessEngine>>,
    node: NodeId,
) -> bool {
    use datacubes_rs::scene::VisualizationEngine;
    engine
        .borrow()
        .datacubes()
        .iter()
        .find(|d| d.id == node)
        .map(|d| d.is_pending)
        .unwrap()
}

#[tokio::test]
async fn test_date_filter_follows_its_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, "visits.csv", 20);
    let config = AppConfig::default();
    let factory = Arc::new(DefaultSourceFactory::new(&config).unwrap());
    let (mut app, bridge, _engine) =
        headless_app_with(&config, factory, GatedRenderBackend::answering(vec![1]));

    let dataset = add_dataset(&mut app, &bridge);
    bridge
        .add_node(NodeKind::DateFilter, GraphPoint::new(700.0, 20.0))
        .unwrap();
    let filter = NodeId(dataset.0 + 1);
    bridge
        .connect(dataset, SourcePort::Dataset, filter, TargetSlot::Dataset)
        .unwrap();
    bridge.dataset(dataset, DatasetCommand::BindFile(path)).unwrap();
    settle(&mut app, dataset).await;

    let day = |d: u32| {
        chrono::NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    };
    bridge
        .send_command(AppCommand::EditDateFilter {
            node: filter,
            patch: DateFilterPatch {
                date_column: Some("day".into()),
                from: Some(Some(day(1))),
                to: Some(Some(day(5))),
            },
        })
        .unwrap();
    app.drain_pending();

    let node = app.graph().node(filter).unwrap();
    let NodeState::DateFilter(state) = &node.state else {
        panic!("not a date filter");
    };
    assert!(!state.is_pending);
    assert!(state.error_message.is_none());
    // Days 1..=5 of a 20-row file cycling through 28 days.
    assert_eq!(node.state.row_count(), Some(5));
    assert_eq!(state.filtered_columns.len(), 3);
}
