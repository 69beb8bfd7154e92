//! Serializable view of the pipeline topology and its runtime state.

use crate::pipeline::data::DataKind;
use crate::pipeline::executive::ExecutivePhase;
use crate::pipeline::graph::Graph;
use crate::pipeline::id::{AlgorithmId, ConnectionId};
use crate::pipeline::port::PortDirection;
use crate::pipeline::stamp::Stamp;
use serde::Serialize;

/// Snapshot of a single port.
#[derive(Debug, Clone, Serialize)]
pub struct PortSnapshot {
    pub index: usize,
    pub name: &'static str,
    pub direction: PortDirection,
    pub kind: DataKind,
    /// Connections on an input; 0 for outputs.
    pub connections: usize,
    /// Whether an output currently holds data.
    pub has_data: bool,
    pub last_executed: Option<Stamp>,
    pub last_error: Option<String>,
}

/// Snapshot of a single algorithm.
#[derive(Debug, Clone, Serialize)]
pub struct AlgorithmSnapshot {
    pub id: AlgorithmId,
    pub name: String,
    pub phase: ExecutivePhase,
    pub parameter_stamp: Stamp,
    pub execute_count: u64,
    pub non_deterministic: bool,
    pub inputs: Vec<PortSnapshot>,
    pub outputs: Vec<PortSnapshot>,
}

/// Snapshot of a single connection.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSnapshot {
    pub id: ConnectionId,
    pub from_algorithm: AlgorithmId,
    pub from_port: usize,
    pub to_algorithm: AlgorithmId,
    pub to_port: usize,
}

/// Complete topology snapshot of the pipeline graph.
#[derive(Debug, Clone, Serialize)]
pub struct TopologySnapshot {
    pub algorithms: Vec<AlgorithmSnapshot>,
    pub connections: Vec<ConnectionSnapshot>,
}

impl TopologySnapshot {
    pub(crate) fn capture(graph: &Graph) -> Self {
        let algorithms = graph
            .ids()
            .filter_map(|id| graph.slot(id).ok().map(|slot| (id, slot)))
            .map(|(id, slot)| AlgorithmSnapshot {
                id,
                name: slot.name.clone(),
                phase: slot.executive.phase(),
                parameter_stamp: slot.param_stamp,
                execute_count: slot.executive.execute_count(),
                non_deterministic: slot.algorithm.traits().non_deterministic,
                inputs: slot
                    .input_specs
                    .iter()
                    .zip(&slot.inputs)
                    .enumerate()
                    .map(|(index, (spec, conns))| PortSnapshot {
                        index,
                        name: spec.name,
                        direction: PortDirection::Input,
                        kind: spec.accepts,
                        connections: conns.len(),
                        has_data: false,
                        last_executed: None,
                        last_error: None,
                    })
                    .collect(),
                outputs: slot
                    .outputs
                    .iter()
                    .enumerate()
                    .map(|(index, port)| PortSnapshot {
                        index,
                        name: port.spec().name,
                        direction: PortDirection::Output,
                        kind: port.spec().produces,
                        connections: 0,
                        has_data: port.data().is_some(),
                        last_executed: port.last_executed(),
                        last_error: port.last_error().map(|e| e.to_string()),
                    })
                    .collect(),
            })
            .collect();

        let connections = graph
            .connections()
            .map(|c| ConnectionSnapshot {
                id: c.id(),
                from_algorithm: c.source().algorithm(),
                from_port: c.source().index(),
                to_algorithm: c.sink().algorithm(),
                to_port: c.sink().index(),
            })
            .collect();

        Self {
            algorithms,
            connections,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
