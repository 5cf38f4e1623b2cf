//! Background ingestion tasks.
//!
//! A task opens its source, reports the headers, loads every column and
//! reports those. It never touches the graph; its results come back through
//! the event queue tagged with the generation it was started for.

use crate::data::{LoadConfig, LoadProgress, SourceFactory, SourceResult, SourceSpec};
use crate::dataset::reducer::IngestionOutcome;
use crate::events::{AppEvent, EventSender};
use crate::graph::NodeId;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct IngestionEvent {
    pub node: NodeId,
    pub generation: u64,
    pub outcome: IngestionOutcome,
}

/// Spawn an ingestion of `spec` for `node`. Must be called within a tokio
/// runtime.
pub fn spawn_ingestion(
    factory: Arc<dyn SourceFactory>,
    node: NodeId,
    generation: u64,
    spec: SourceSpec,
    events: EventSender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let report = |outcome: IngestionOutcome| {
            let event = IngestionEvent {
                node,
                generation,
                outcome,
            };
            if events.send(AppEvent::Ingestion(event)).is_err() {
                tracing::debug!("Ingestion for node {} finished after shutdown", node);
            }
        };
        if let Err(e) = ingest(factory.as_ref(), node, &spec, &report).await {
            report(IngestionOutcome::Failed(e.to_string()));
        }
    })
}

async fn ingest(
    factory: &dyn SourceFactory,
    node: NodeId,
    spec: &SourceSpec,
    report: &(dyn Fn(IngestionOutcome) + Send + Sync),
) -> SourceResult<()> {
    let mut source = factory.create(spec)?;
    let headers = source.open().await?;
    tracing::debug!(
        "Node {}: {} has {} column(s)",
        node,
        source.source_id(),
        headers.len()
    );
    let config = LoadConfig::from_headers(&headers);
    report(IngestionOutcome::Headers(headers));

    let mut progress = |p: LoadProgress| match p {
        LoadProgress::Rows { loaded, total } => {
            tracing::trace!("Node {}: {}/{} rows", node, loaded, total)
        }
        LoadProgress::Done => tracing::trace!("Node {}: load done", node),
    };
    let columns = source.load(config, &mut progress).await?;
    report(IngestionOutcome::Columns(
        columns.into_iter().map(Arc::new).collect(),
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        Column, ColumnHeader, DataType, Location, SourceError, TabularSource,
    };
    use crate::events::event_channel;
    use async_trait::async_trait;

    struct OneColumn;

    #[async_trait]
    impl TabularSource for OneColumn {
        fn source_id(&self) -> &str {
            "one"
        }

        async fn open(&mut self) -> SourceResult<Vec<ColumnHeader>> {
            Ok(vec![ColumnHeader::new("n", DataType::Number)])
        }

        async fn load(
            &mut self,
            _config: LoadConfig,
            progress: &mut (dyn FnMut(LoadProgress) + Send),
        ) -> SourceResult<Vec<Column>> {
            progress(LoadProgress::Done);
            Ok(vec![Column::number("n", vec![1.0, 2.0, 3.0])])
        }
    }

    struct Factory;

    impl SourceFactory for Factory {
        fn create(&self, spec: &SourceSpec) -> SourceResult<Box<dyn TabularSource>> {
            match spec {
                SourceSpec::Json { .. } => Ok(Box::new(OneColumn)),
                _ => Err(SourceError::MissingApiKey),
            }
        }
    }

    async fn next(rx: &mut crate::events::EventReceiver) -> IngestionEvent {
        match rx.recv().await {
            Some(AppEvent::Ingestion(e)) => e,
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reports_headers_then_columns() {
        let (tx, mut rx) = event_channel();
        let spec = SourceSpec::Json {
            location: Location::Url("https://x/a.json".into()),
        };
        spawn_ingestion(Arc::new(Factory), NodeId(2), 7, spec, tx)
            .await
            .unwrap();

        let first = next(&mut rx).await;
        assert_eq!((first.node, first.generation), (NodeId(2), 7));
        assert!(matches!(first.outcome, IngestionOutcome::Headers(ref h) if h.len() == 1));
        let second = next(&mut rx).await;
        assert!(matches!(second.outcome, IngestionOutcome::Columns(ref c) if c[0].len() == 3));
    }

    #[tokio::test]
    async fn test_reports_failure() {
        let (tx, mut rx) = event_channel();
        let spec = SourceSpec::Spreadsheet {
            sheet_id: "abc".into(),
        };
        spawn_ingestion(Arc::new(Factory), NodeId(2), 1, spec, tx)
            .await
            .unwrap();
        let event = next(&mut rx).await;
        assert!(matches!(event.outcome, IngestionOutcome::Failed(ref m) if m.contains("API key")));
    }
}
