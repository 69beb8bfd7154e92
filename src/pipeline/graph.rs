//! Registry of algorithms and the connections between them.
//!
//! Algorithms live in a dense `Vec` indexed by [`AlgorithmId`]; connections
//! in a `Vec<Option<_>>` indexed by [`ConnectionId`] so removal leaves ids
//! stable. Every mutation is validated before anything changes.

use crate::pipeline::algorithm::Algorithm;
use crate::pipeline::connection::Connection;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::executive::Executive;
use crate::pipeline::id::{AlgorithmId, ConnectionId, InputPortId, PortId};
use crate::pipeline::plan::PlanCompiler;
use crate::pipeline::port::{InputPortSpec, OutputPort};
use crate::pipeline::stamp::Stamp;

/// An algorithm plus everything the engine keeps about it.
pub(crate) struct AlgorithmSlot {
    pub(crate) algorithm: Box<dyn Algorithm>,
    pub(crate) name: String,
    /// Bumped on every parameter or connection change.
    pub(crate) param_stamp: Stamp,
    pub(crate) input_specs: Vec<InputPortSpec>,
    /// Connections per input port, in the order they were added.
    pub(crate) inputs: Vec<Vec<ConnectionId>>,
    pub(crate) outputs: Vec<OutputPort>,
    pub(crate) executive: Executive,
}

impl AlgorithmSlot {
    fn new(algorithm: Box<dyn Algorithm>) -> Self {
        let input_specs = algorithm.input_ports().to_vec();
        let outputs = algorithm
            .output_ports()
            .iter()
            .map(|spec| OutputPort::new(*spec))
            .collect();
        Self {
            name: algorithm.name().to_string(),
            param_stamp: Stamp::next(),
            inputs: vec![Vec::new(); input_specs.len()],
            input_specs,
            outputs,
            executive: Executive::default(),
            algorithm,
        }
    }
}

/// How a new connection treats existing connections on the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectMode {
    /// Add after existing connections; non-repeatable inputs must be free.
    Append,
    /// Drop every existing connection on the input first.
    Replace,
}

#[derive(Default)]
pub(crate) struct Graph {
    slots: Vec<AlgorithmSlot>,
    connections: Vec<Option<Connection>>,
}

impl Graph {
    pub(crate) fn add(&mut self, algorithm: Box<dyn Algorithm>) -> AlgorithmId {
        let id = AlgorithmId(self.slots.len() as u32);
        self.slots.push(AlgorithmSlot::new(algorithm));
        id
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn ids(&self) -> impl Iterator<Item = AlgorithmId> {
        (0..self.slots.len() as u32).map(AlgorithmId)
    }

    pub(crate) fn slot(&self, id: AlgorithmId) -> PipelineResult<&AlgorithmSlot> {
        self.slots
            .get(id.index())
            .ok_or(PipelineError::NoSuchAlgorithm(id))
    }

    pub(crate) fn slot_mut(&mut self, id: AlgorithmId) -> PipelineResult<&mut AlgorithmSlot> {
        self.slots
            .get_mut(id.index())
            .ok_or(PipelineError::NoSuchAlgorithm(id))
    }

    pub(crate) fn slots_mut(&mut self) -> impl Iterator<Item = &mut AlgorithmSlot> {
        self.slots.iter_mut()
    }

    pub(crate) fn output(&self, port: PortId) -> PipelineResult<&OutputPort> {
        self.slot(port.algorithm())?
            .outputs
            .get(port.index())
            .ok_or_else(|| PipelineError::NoSuchPort(format!("{:?}", port)))
    }

    pub(crate) fn output_mut(&mut self, port: PortId) -> PipelineResult<&mut OutputPort> {
        self.slot_mut(port.algorithm())?
            .outputs
            .get_mut(port.index())
            .ok_or_else(|| PipelineError::NoSuchPort(format!("{:?}", port)))
    }

    pub(crate) fn input_spec(&self, port: InputPortId) -> PipelineResult<&InputPortSpec> {
        self.slot(port.algorithm())?
            .input_specs
            .get(port.index())
            .ok_or_else(|| PipelineError::NoSuchPort(format!("{:?}", port)))
    }

    pub(crate) fn connection(&self, id: ConnectionId) -> PipelineResult<&Connection> {
        self.connections
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(PipelineError::NoSuchConnection(id))
    }

    pub(crate) fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter().flatten()
    }

    /// Producers feeding `port`, in connection order.
    pub(crate) fn input_sources(&self, port: InputPortId) -> PipelineResult<Vec<PortId>> {
        self.input_spec(port)?;
        let slot = self.slot(port.algorithm())?;
        slot.inputs[port.index()]
            .iter()
            .map(|id| self.connection(*id).map(Connection::source))
            .collect()
    }

    /// Producers feeding each input port of `id`, in connection order.
    pub(crate) fn upstream_ports(&self, id: AlgorithmId) -> PipelineResult<Vec<Vec<PortId>>> {
        let slot = self.slot(id)?;
        slot.inputs
            .iter()
            .map(|conns| {
                conns
                    .iter()
                    .map(|c| self.connection(*c).map(Connection::source))
                    .collect()
            })
            .collect()
    }

    /// Distinct upstream algorithms of `id`, in first-connection order.
    pub(crate) fn upstream_algorithms(&self, id: AlgorithmId) -> PipelineResult<Vec<AlgorithmId>> {
        let mut out = Vec::new();
        for port in self.upstream_ports(id)?.into_iter().flatten() {
            if !out.contains(&port.algorithm()) {
                out.push(port.algorithm());
            }
        }
        Ok(out)
    }

    /// Forward and backward adjacency by algorithm index.
    pub(crate) fn adjacency(&self) -> (Vec<Vec<usize>>, Vec<Vec<usize>>) {
        let n = self.slots.len();
        let mut fwd = vec![Vec::new(); n];
        let mut bwd = vec![Vec::new(); n];
        for conn in self.connections() {
            let from = conn.source().algorithm().index();
            let to = conn.sink().algorithm().index();
            if from >= n || to >= n {
                continue;
            }
            fwd[from].push(to);
            bwd[to].push(from);
        }
        (fwd, bwd)
    }

    /// Whether `to` is reachable from `from` along connections.
    pub(crate) fn reaches(&self, from: AlgorithmId, to: AlgorithmId) -> bool {
        let (fwd, _) = self.adjacency();
        let reachable = PlanCompiler::forward_reachability(&[from.index()], &fwd, self.slots.len());
        reachable.get(to.index()).copied().unwrap_or(false)
    }

    pub(crate) fn connect(
        &mut self,
        source: PortId,
        sink: InputPortId,
        mode: ConnectMode,
    ) -> PipelineResult<ConnectionId> {
        let produces = self.output(source)?.spec().produces;
        let spec = *self.input_spec(sink)?;

        if !spec.accepts.accepts(produces) {
            return Err(PipelineError::TypeIncompatible {
                from: source,
                to: sink,
                accepts: spec.accepts,
                produces,
            });
        }

        let (from, to) = (source.algorithm(), sink.algorithm());
        if from == to || self.reaches(to, from) {
            return Err(PipelineError::WouldCreateCycle { from: source, to: sink });
        }

        let existing = self.slot(to)?.inputs[sink.index()].clone();
        match mode {
            ConnectMode::Append => {
                if !spec.repeatable && !existing.is_empty() {
                    return Err(PipelineError::PortFull(sink));
                }
            }
            ConnectMode::Replace => {
                if let [only] = existing.as_slice() {
                    if self.connection(*only)?.source() == source {
                        return Ok(*only);
                    }
                }
                for id in existing {
                    self.remove_connection(id)?;
                }
            }
        }

        let id = ConnectionId(self.connections.len() as u32);
        self.connections.push(Some(Connection::new(id, source, sink)));
        let slot = self.slot_mut(to)?;
        slot.inputs[sink.index()].push(id);
        slot.param_stamp = Stamp::next();
        tracing::debug!("Connected {:?} -> {:?} as {:?}", source, sink, id);
        Ok(id)
    }

    pub(crate) fn remove_connection(&mut self, id: ConnectionId) -> PipelineResult<()> {
        let conn = *self.connection(id)?;
        self.connections[id.index()] = None;
        let slot = self.slot_mut(conn.sink().algorithm())?;
        slot.inputs[conn.sink().index()].retain(|c| *c != id);
        slot.param_stamp = Stamp::next();
        tracing::debug!("Removed connection {:?}", id);
        Ok(())
    }

    /// Remove the connection from `source` into `sink`.
    pub(crate) fn disconnect_ports(&mut self, sink: InputPortId, source: PortId) -> PipelineResult<()> {
        self.input_spec(sink)?;
        let found = self.slot(sink.algorithm())?.inputs[sink.index()]
            .iter()
            .copied()
            .find(|id| {
                self.connection(*id)
                    .map(|c| c.source() == source)
                    .unwrap_or(false)
            });
        match found {
            Some(id) => self.remove_connection(id),
            None => Err(PipelineError::NotConnected { from: source, to: sink }),
        }
    }
}
