//! Per-node ingestion state machine.
//!
//! ```text
//! Unconfigured -> Configuring -> Loading -> Loaded
//!                                   |
//!                                   +-> Error   (spreadsheet URL without an id)
//! ```
//!
//! The reducer never touches the graph itself. Commands and ingestion
//! completions go in, [`DatasetEffect`]s come out, and the runtime applies
//! them: patches to the owning node, ingestion tasks, poll timers.

use crate::data::{extract_sheet_id, Column, ColumnHeader, Location, SourceKind, SourceSpec};
use crate::graph::{DatasetPatch, DatasetState, NodeId};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetPhase {
    /// No source kind selected.
    Unconfigured,
    /// A kind is selected but there is nothing to load yet.
    Configuring,
    Loading,
    Loaded,
    /// The spreadsheet URL carries no sheet id. Left only by editing the URL
    /// or picking another source kind.
    Error,
}

/// User edits of a dataset node, plus the poll timer's tick.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetCommand {
    SelectSource(SourceKind),
    BindFile(PathBuf),
    SetRemoteUri(String),
    SetSpreadsheetUri(String),
    /// An empty delimiter means "detect".
    SetDelimiter(String),
    SetIncludesHeader(bool),
    PollTick,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DatasetEffect {
    Patch(DatasetPatch),
    StartIngestion { generation: u64, spec: SourceSpec },
    ArmPollTimer,
    CancelPollTimer,
}

/// What a running ingestion reported.
#[derive(Debug, Clone)]
pub enum IngestionOutcome {
    Headers(Vec<ColumnHeader>),
    Columns(Vec<Arc<Column>>),
    Failed(String),
}

pub struct DatasetReducer {
    node: NodeId,
    phase: DatasetPhase,
    /// Bumped for every ingestion started and every source-kind change.
    generation: u64,
    /// Spec of the newest ingestion that has not completed yet.
    in_flight: Option<SourceSpec>,
    /// Most recently edited flat-file location.
    location: Option<Location>,
    polling: bool,
    strict_ordering: bool,
}

impl DatasetReducer {
    pub fn new(node: NodeId, strict_ordering: bool) -> Self {
        Self {
            node,
            phase: DatasetPhase::Unconfigured,
            generation: 0,
            in_flight: None,
            location: None,
            polling: false,
            strict_ordering,
        }
    }

    pub fn phase(&self) -> DatasetPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn in_flight(&self) -> Option<&SourceSpec> {
        self.in_flight.as_ref()
    }

    /// Handle a command against the node's current state.
    pub fn handle(&mut self, command: DatasetCommand, state: &DatasetState) -> Vec<DatasetEffect> {
        let mut patch = DatasetPatch::default();
        let mut effects = Vec::new();
        let mut restart = false;

        match command {
            DatasetCommand::SelectSource(kind) => {
                if kind == state.source_kind {
                    return Vec::new();
                }
                tracing::debug!(
                    "Dataset {}: source kind {:?} -> {:?}",
                    self.node,
                    state.source_kind,
                    kind
                );
                self.generation += 1;
                self.in_flight = None;
                if self.polling {
                    self.polling = false;
                    effects.push(DatasetEffect::CancelPollTimer);
                }
                patch.source_kind = Some(kind);
                patch.columns = Some(Vec::new());
                patch.column_headers = Some(Vec::new());
                patch.is_loading = Some(true);
                if kind == SourceKind::Spreadsheet {
                    patch.force_refresh = Some(true);
                }
                self.phase = if kind == SourceKind::None {
                    DatasetPhase::Unconfigured
                } else {
                    DatasetPhase::Configuring
                };
            }
            DatasetCommand::BindFile(path) => {
                if state.source_kind == SourceKind::None {
                    patch.source_kind = SourceKind::from_path(&path);
                    if patch.source_kind.is_some() {
                        self.phase = DatasetPhase::Configuring;
                    }
                }
                self.location = Some(Location::File(path.clone()));
                patch.file = Some(path);
                restart = true;
            }
            DatasetCommand::SetRemoteUri(uri) => {
                let uri = uri.trim().to_string();
                self.location = (!uri.is_empty()).then(|| Location::Url(uri.clone()));
                patch.remote_uri = Some(uri);
                restart = true;
            }
            DatasetCommand::SetSpreadsheetUri(uri) => {
                patch.spreadsheet_uri = Some(uri.trim().to_string());
                patch.force_refresh = Some(true);
            }
            DatasetCommand::SetDelimiter(delimiter) => {
                patch.delimiter = Some(delimiter);
                restart = true;
            }
            DatasetCommand::SetIncludesHeader(includes_header) => {
                patch.includes_header = Some(includes_header);
                restart = true;
            }
            DatasetCommand::PollTick => {
                if state.source_kind != SourceKind::Spreadsheet || !self.polling {
                    return Vec::new();
                }
                patch.force_refresh = Some(true);
            }
        }

        let mut next = state.clone();
        patch.clone().apply(&mut next);
        self.evaluate(&next, restart, &mut patch, &mut effects);

        if !patch.is_empty() {
            effects.insert(0, DatasetEffect::Patch(patch));
        }
        effects
    }

    /// Decide whether `next` calls for an ingestion, recording the outcome
    /// in `patch` and `effects`.
    fn evaluate(
        &mut self,
        next: &DatasetState,
        restart: bool,
        patch: &mut DatasetPatch,
        effects: &mut Vec<DatasetEffect>,
    ) {
        let spec = match next.source_kind {
            SourceKind::None => {
                self.phase = DatasetPhase::Unconfigured;
                return;
            }
            SourceKind::Csv | SourceKind::Json => {
                let Some(location) = self.flat_file_location(next) else {
                    return;
                };
                if next.source_kind == SourceKind::Csv {
                    SourceSpec::Delimited {
                        location,
                        delimiter: next.delimiter.clone().filter(|d| !d.is_empty()),
                        includes_header: next.includes_header,
                    }
                } else {
                    SourceSpec::Json { location }
                }
            }
            SourceKind::Spreadsheet => {
                let Some(uri) = next.spreadsheet_uri.as_deref().filter(|u| !u.is_empty()) else {
                    return;
                };
                let Some(sheet_id) = extract_sheet_id(uri) else {
                    self.fail_configuration(uri, patch, effects);
                    return;
                };
                if !next.force_refresh {
                    return;
                }
                SourceSpec::Spreadsheet { sheet_id }
            }
        };

        if self.in_flight.as_ref() == Some(&spec) {
            tracing::trace!("Dataset {}: identical ingestion already in flight", self.node);
            return;
        }

        self.generation += 1;
        tracing::info!(
            "Dataset {}: starting ingestion #{} ({:?})",
            self.node,
            self.generation,
            spec.kind()
        );
        if spec.kind() == SourceKind::Spreadsheet {
            patch.force_refresh = Some(false);
        }
        if restart || self.phase != DatasetPhase::Loaded {
            patch.is_loading = Some(true);
        }
        self.in_flight = Some(spec.clone());
        self.phase = DatasetPhase::Loading;
        effects.push(DatasetEffect::StartIngestion {
            generation: self.generation,
            spec,
        });
    }

    fn flat_file_location(&self, state: &DatasetState) -> Option<Location> {
        if let Some(location) = &self.location {
            return Some(location.clone());
        }
        if let Some(file) = &state.file {
            return Some(Location::File(file.clone()));
        }
        state
            .remote_uri
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(|u| Location::Url(u.to_string()))
    }

    fn fail_configuration(
        &mut self,
        uri: &str,
        patch: &mut DatasetPatch,
        effects: &mut Vec<DatasetEffect>,
    ) {
        tracing::warn!(
            "Dataset {}: no spreadsheet id in {:?}, waiting for a new URL",
            self.node,
            uri
        );
        self.phase = DatasetPhase::Error;
        self.in_flight = None;
        patch.is_loading = Some(true);
        patch.columns = Some(Vec::new());
        patch.column_headers = Some(Vec::new());
        if self.polling {
            self.polling = false;
            effects.push(DatasetEffect::CancelPollTimer);
        }
    }

    /// Handle a report from an ingestion task.
    pub fn on_ingestion(
        &mut self,
        generation: u64,
        outcome: IngestionOutcome,
        state: &DatasetState,
    ) -> Vec<DatasetEffect> {
        if matches!(self.phase, DatasetPhase::Unconfigured | DatasetPhase::Error) {
            tracing::debug!("Dataset {}: dropping ingestion result in {:?}", self.node, self.phase);
            return Vec::new();
        }
        let current = generation == self.generation;
        if self.strict_ordering && !current {
            tracing::debug!(
                "Dataset {}: dropping stale ingestion #{} (current #{})",
                self.node,
                generation,
                self.generation
            );
            return Vec::new();
        }

        let mut patch = DatasetPatch::default();
        let mut effects = Vec::new();
        match outcome {
            IngestionOutcome::Headers(headers) => {
                patch.column_headers = Some(headers);
            }
            IngestionOutcome::Columns(columns) => {
                if current {
                    self.in_flight = None;
                }
                let loaded = !columns.is_empty() && !state.column_headers.is_empty();
                tracing::info!(
                    "Dataset {}: ingestion #{} delivered {} column(s)",
                    self.node,
                    generation,
                    columns.len()
                );
                patch.columns = Some(columns);
                if loaded {
                    patch.is_loading = Some(false);
                    self.phase = DatasetPhase::Loaded;
                    if state.source_kind == SourceKind::Spreadsheet && !self.polling {
                        self.polling = true;
                        effects.push(DatasetEffect::ArmPollTimer);
                    }
                }
            }
            IngestionOutcome::Failed(message) => {
                if current {
                    self.in_flight = None;
                }
                tracing::warn!("Dataset {}: ingestion #{} failed: {}", self.node, generation, message);
            }
        }

        if !patch.is_empty() {
            effects.insert(0, DatasetEffect::Patch(patch));
        }
        effects
    }

    /// The node was deleted.
    pub fn on_removed(&mut self) -> Vec<DatasetEffect> {
        self.phase = DatasetPhase::Unconfigured;
        self.in_flight = None;
        self.generation += 1;
        if std::mem::take(&mut self.polling) {
            vec![DatasetEffect::CancelPollTimer]
        } else {
            Vec::new()
        }
    }
}
