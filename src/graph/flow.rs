//! Downstream propagation.
//!
//! After a mutation the derived parts of every non-dataset blob are
//! recomputed in topological order: filters pick up their input table,
//! color mappings and encodings resolve their connected columns. Columns are
//! always passed on by reference; only a date filter with bounds allocates new
//! columns.

use crate::data::{same_columns, Column, ColumnValues};
use crate::graph::id::NodeId;
use crate::graph::state::{ColorEncoding, DateFilterState, EncodingState, NodeState};
use crate::graph::store::{Graph, GraphStore, SourcePort, TargetSlot};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Nodes in dependency order (Kahn's algorithm). Nodes on a cycle are left out.
pub fn topological_order(graph: &Graph) -> Vec<NodeId> {
    let ids: Vec<NodeId> = graph.nodes().iter().map(|n| n.id).collect();
    let mut in_degree: BTreeMap<NodeId, u32> = ids.iter().map(|id| (*id, 0)).collect();
    for edge in graph.edges() {
        if let Some(d) = in_degree.get_mut(&edge.target) {
            *d += 1;
        }
    }

    let mut queue: Vec<NodeId> = ids.iter().rev().copied().filter(|id| in_degree[id] == 0).collect();
    let mut order = Vec::with_capacity(ids.len());

    while let Some(node) = queue.pop() {
        order.push(node);
        for edge in graph.edges().iter().filter(|e| e.source == node) {
            if let Some(d) = in_degree.get_mut(&edge.target) {
                *d -= 1;
                if *d == 0 {
                    queue.push(edge.target);
                }
            }
        }
    }

    if order.len() != ids.len() {
        tracing::warn!(
            "Graph has a cycle! Only {} of {} nodes ordered.",
            order.len(),
            ids.len()
        );
    }
    order
}

/// Re-derive downstream blobs. Returns whether any blob changed.
pub fn propagate(graph: &mut Graph) -> bool {
    let mut changed = false;
    for id in topological_order(graph) {
        let Some(node) = graph.node(id) else {
            continue;
        };
        let update = match &node.state {
            NodeState::Dataset(_) => None,
            NodeState::DateFilter(state) => derive_date_filter(graph, id, state),
            NodeState::ColorMapping(state) => {
                let column = column_input(graph, id, TargetSlot::Column);
                (!same_column(&state.column, &column)).then(|| Derived::ColorMapping(column))
            }
            NodeState::PointPrimitive(state) | NodeState::LinePrimitive(state) => {
                let derived = derive_encoding(graph, id);
                (!same_encoding(state, &derived)).then(|| Derived::Encoding(derived))
            }
        };

        if let Some(update) = update {
            if let Some(node) = graph.node_mut(id) {
                update.apply(&mut node.state);
                tracing::trace!("Propagated into {} node {}", node.kind, id);
            }
            graph.touch();
            changed = true;
        }
    }
    changed
}

enum Derived {
    DateFilter {
        inputs: Vec<Arc<Column>>,
        outcome: FilterOutcome,
    },
    ColorMapping(Option<Arc<Column>>),
    Encoding(EncodingState),
}

impl Derived {
    fn apply(self, state: &mut NodeState) {
        match (self, state) {
            (Derived::DateFilter { inputs, outcome }, NodeState::DateFilter(s)) => {
                s.input_columns = inputs;
                s.filtered_columns = outcome.filtered;
                s.is_pending = outcome.is_pending;
                s.error_message = outcome.error;
            }
            (Derived::ColorMapping(column), NodeState::ColorMapping(s)) => {
                s.is_pending = column.is_none();
                s.column = column;
            }
            (Derived::Encoding(derived), NodeState::PointPrimitive(s))
            | (Derived::Encoding(derived), NodeState::LinePrimitive(s)) => *s = derived,
            _ => {}
        }
    }
}

fn same_column(a: &Option<Arc<Column>>, b: &Option<Arc<Column>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

fn same_encoding(a: &EncodingState, b: &EncodingState) -> bool {
    let same_colors = match (&a.colors, &b.colors) {
        (Some(a), Some(b)) => Arc::ptr_eq(&a.column, &b.column) && a.palette == b.palette,
        (None, None) => true,
        _ => false,
    };
    same_colors
        && a.is_pending == b.is_pending
        && same_column(&a.x_column, &b.x_column)
        && same_column(&a.y_column, &b.y_column)
        && same_column(&a.z_column, &b.z_column)
        && same_column(&a.size_column, &b.size_column)
}

/// The column connected to `slot` of `target`, looked up by name among the
/// source's output columns.
fn column_input(graph: &Graph, target: NodeId, slot: TargetSlot) -> Option<Arc<Column>> {
    let edge = graph.input(target, slot)?;
    let SourcePort::Column(name) = &edge.source_port else {
        return None;
    };
    graph
        .node(edge.source)?
        .state
        .output_columns()
        .iter()
        .find(|c| c.name() == name)
        .cloned()
}

fn derive_encoding(graph: &Graph, id: NodeId) -> EncodingState {
    let colors = graph
        .input(id, TargetSlot::Color)
        .and_then(|edge| graph.node(edge.source))
        .and_then(|source| match &source.state {
            NodeState::ColorMapping(s) => s.column.clone().map(|column| ColorEncoding {
                column,
                palette: s.palette.clone(),
            }),
            _ => None,
        });
    let x_column = column_input(graph, id, TargetSlot::X);
    EncodingState {
        is_pending: x_column.is_none(),
        x_column,
        y_column: column_input(graph, id, TargetSlot::Y),
        z_column: column_input(graph, id, TargetSlot::Z),
        size_column: column_input(graph, id, TargetSlot::Size),
        colors,
    }
}

fn derive_date_filter(graph: &Graph, id: NodeId, state: &DateFilterState) -> Option<Derived> {
    let inputs: Vec<Arc<Column>> = graph
        .input(id, TargetSlot::Dataset)
        .and_then(|edge| graph.node(edge.source))
        .map(|source| source.state.output_columns().to_vec())
        .unwrap_or_default();

    // Parameter edits clear `input_columns`, so an unchanged input means the
    // current output is still valid.
    if same_columns(&state.input_columns, &inputs) && !inputs.is_empty() {
        return None;
    }

    let outcome = filter_by_date(&inputs, state.date_column.as_deref(), state.from, state.to);
    let unchanged = same_columns(&state.filtered_columns, &outcome.filtered)
        && state.is_pending == outcome.is_pending
        && state.error_message == outcome.error
        && same_columns(&state.input_columns, &inputs);
    (!unchanged).then(|| Derived::DateFilter { inputs, outcome })
}

/// Result of applying a date filter to a table.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub filtered: Vec<Arc<Column>>,
    pub is_pending: bool,
    pub error: Option<String>,
}

/// Keep the rows whose `date_column` value lies within `[from, to]`.
///
/// Without bounds the input columns are passed through unchanged.
pub fn filter_by_date(
    inputs: &[Arc<Column>],
    date_column: Option<&str>,
    from: Option<NaiveDateTime>,
    to: Option<NaiveDateTime>,
) -> FilterOutcome {
    let pending = FilterOutcome {
        filtered: Vec::new(),
        is_pending: true,
        error: None,
    };
    let failed = |message: String| FilterOutcome {
        filtered: Vec::new(),
        is_pending: false,
        error: Some(message),
    };

    let Some(name) = date_column else {
        return pending;
    };
    if inputs.is_empty() {
        return pending;
    }
    let Some(column) = inputs.iter().find(|c| c.name() == name) else {
        return failed(format!("Column '{}' does not exist", name));
    };
    let ColumnValues::Date(dates) = column.values() else {
        return failed(format!(
            "Column '{}' is a {} column, not a date column",
            name,
            column.data_type().display_name()
        ));
    };

    if from.is_none() && to.is_none() {
        return FilterOutcome {
            filtered: inputs.to_vec(),
            is_pending: false,
            error: None,
        };
    }

    let keep: Vec<bool> = dates
        .iter()
        .map(|d| from.map_or(true, |f| *d >= f) && to.map_or(true, |t| *d <= t))
        .collect();
    FilterOutcome {
        filtered: inputs.iter().map(|c| Arc::new(c.retain_rows(&keep))).collect(),
        is_pending: false,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node_kind::NodeKind;
    use crate::graph::state::{DatasetPatch, DateFilterPatch};
    use crate::types::GraphPoint;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn table() -> Vec<Arc<Column>> {
        vec![
            Arc::new(Column::date("when", vec![day(1), day(5), day(9), day(12)])),
            Arc::new(Column::number("value", vec![1.0, 2.0, 3.0, 4.0])),
        ]
    }

    fn load(graph: &mut Graph, id: NodeId, columns: Vec<Arc<Column>>) {
        let headers = columns.iter().map(|c| c.header()).collect();
        graph
            .apply_patch(
                id,
                DatasetPatch {
                    column_headers: Some(headers),
                    columns: Some(columns),
                    is_loading: Some(false),
                    ..Default::default()
                }
                .into(),
            )
            .unwrap();
    }

    #[test]
    fn test_filter_bounds_are_inclusive() {
        let outcome = filter_by_date(&table(), Some("when"), Some(day(5)), Some(day(9)));
        assert!(!outcome.is_pending);
        assert_eq!(outcome.filtered[1].len(), 2);
    }

    #[test]
    fn test_filter_without_bounds_shares_columns() {
        let input = table();
        let outcome = filter_by_date(&input, Some("when"), None, None);
        assert!(same_columns(&input, &outcome.filtered));
    }

    #[test]
    fn test_filter_errors() {
        let outcome = filter_by_date(&table(), Some("missing"), None, None);
        assert!(outcome.error.unwrap().contains("does not exist"));
        let outcome = filter_by_date(&table(), Some("value"), None, None);
        assert!(outcome.error.unwrap().contains("not a date column"));
        assert!(filter_by_date(&[], Some("when"), None, None).is_pending);
        assert!(filter_by_date(&table(), None, None, None).is_pending);
    }

    #[test]
    fn test_topological_order_puts_sources_first() {
        let mut graph = Graph::new();
        let points = graph.add_node(NodeKind::PointPrimitive, GraphPoint::default()).unwrap();
        let filter = graph.add_node(NodeKind::DateFilter, GraphPoint::default()).unwrap();
        let dataset = graph.add_node(NodeKind::Dataset, GraphPoint::default()).unwrap();
        graph
            .connect(dataset, SourcePort::Dataset, filter, TargetSlot::Dataset)
            .unwrap();
        graph
            .connect(filter, SourcePort::Column("value".into()), points, TargetSlot::X)
            .unwrap();

        let order = topological_order(&graph);
        let pos = |id| order.iter().position(|o| *o == id).unwrap();
        assert!(pos(dataset) < pos(filter));
        assert!(pos(filter) < pos(points));
    }

    #[test]
    fn test_propagation_through_filter_into_encoding() {
        let mut graph = Graph::new();
        let dataset = graph.add_node(NodeKind::Dataset, GraphPoint::default()).unwrap();
        let filter = graph.add_node(NodeKind::DateFilter, GraphPoint::default()).unwrap();
        let colors = graph.add_node(NodeKind::ColorMapping, GraphPoint::default()).unwrap();
        let points = graph.add_node(NodeKind::PointPrimitive, GraphPoint::default()).unwrap();
        graph
            .connect(dataset, SourcePort::Dataset, filter, TargetSlot::Dataset)
            .unwrap();
        graph
            .connect(filter, SourcePort::Column("value".into()), points, TargetSlot::X)
            .unwrap();
        graph
            .connect(dataset, SourcePort::Column("value".into()), colors, TargetSlot::Column)
            .unwrap();
        graph
            .connect(colors, SourcePort::Colors, points, TargetSlot::Color)
            .unwrap();

        propagate(&mut graph);
        assert!(graph.node(points).unwrap().state.is_pending());

        load(&mut graph, dataset, table());
        graph
            .apply_patch(
                filter,
                DateFilterPatch {
                    date_column: Some("when".into()),
                    from: Some(Some(day(4))),
                    to: None,
                }
                .into(),
            )
            .unwrap();
        assert!(propagate(&mut graph));

        let filter_state = &graph.node(filter).unwrap().state;
        assert_eq!(filter_state.row_count(), Some(3));

        let encoding = graph.node(points).unwrap().state.as_encoding().unwrap().clone();
        assert!(!encoding.is_pending);
        assert_eq!(encoding.x_column.as_ref().unwrap().len(), 3);
        let dataset_columns = graph.node(dataset).unwrap().state.output_columns().to_vec();
        assert!(Arc::ptr_eq(
            &encoding.colors.unwrap().column,
            &dataset_columns[1]
        ));

        assert!(!propagate(&mut graph), "second pass is a no-op");
    }

    #[test]
    fn test_filter_parameter_edit_rederives() {
        let mut graph = Graph::new();
        let dataset = graph.add_node(NodeKind::Dataset, GraphPoint::default()).unwrap();
        let filter = graph.add_node(NodeKind::DateFilter, GraphPoint::default()).unwrap();
        graph
            .connect(dataset, SourcePort::Dataset, filter, TargetSlot::Dataset)
            .unwrap();
        load(&mut graph, dataset, table());
        graph
            .apply_patch(
                filter,
                DateFilterPatch {
                    date_column: Some("when".into()),
                    ..Default::default()
                }
                .into(),
            )
            .unwrap();
        propagate(&mut graph);
        assert_eq!(graph.node(filter).unwrap().state.row_count(), Some(4));

        graph
            .apply_patch(
                filter,
                DateFilterPatch {
                    to: Some(Some(day(1))),
                    ..Default::default()
                }
                .into(),
            )
            .unwrap();
        propagate(&mut graph);
        assert_eq!(graph.node(filter).unwrap().state.row_count(), Some(1));
    }
}
