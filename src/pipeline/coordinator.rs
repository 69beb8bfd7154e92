//! The pipeline coordinator: registry, connections and update entry points.
//!
//! # Example
//!
//! ```ignore
//! let mut pipeline = Coordinator::new();
//! let source = pipeline.add_algorithm(RampSource::new(Extent::new(0, 9, 0, 0, 0, 0)));
//! let scale = pipeline.add_algorithm(Scale::new(2.0));
//! pipeline.connect(pipeline.output_port(source, 0)?, pipeline.input_port(scale, 0)?)?;
//!
//! let out = pipeline.output_port(scale, 0)?;
//! let report = pipeline.update(out);
//! assert!(report.is_success());
//! ```

use crate::config::PipelineConfig;
use crate::pipeline::algorithm::Algorithm;
use crate::pipeline::cancel::CancellationToken;
use crate::pipeline::connection::Connection;
use crate::pipeline::data::DataObject;
use crate::pipeline::error::{ErrorKind, ErrorRecord, Pass, PipelineError, PipelineResult};
use crate::pipeline::events::{EventBus, PipelineEvent};
use crate::pipeline::executive::{self, Executive, ExecutivePhase, Outcome, Request, UpdateSession};
use crate::pipeline::graph::{ConnectMode, Graph};
use crate::pipeline::id::{AlgorithmId, ConnectionId, InputPortId, PortId};
use crate::pipeline::info::{keys, InfoRecord, Propagation};
use crate::pipeline::plan::{PlanCompiler, UpdatePlan};
use crate::pipeline::port::OutputPort;
use crate::pipeline::report::{StreamedUpdate, UpdateReport};
use crate::pipeline::snapshot::TopologySnapshot;
use crate::pipeline::stamp::Stamp;
use crate::types::Extent;
use crossbeam_channel::Receiver;
use std::any::type_name;
use std::time::Instant;

/// Owns every algorithm and connection of one pipeline and drives updates.
pub struct Coordinator {
    graph: Graph,
    config: PipelineConfig,
    default_release: bool,
    cancel: CancellationToken,
    events: EventBus,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            graph: Graph::default(),
            default_release: config.execution.default_release_data,
            cancel: CancellationToken::new(),
            events: EventBus::new(config.events.channel_capacity),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    // ==================== Registry ====================

    pub fn add_algorithm<A: Algorithm>(&mut self, algorithm: A) -> AlgorithmId {
        self.add_boxed(Box::new(algorithm))
    }

    pub fn add_boxed(&mut self, algorithm: Box<dyn Algorithm>) -> AlgorithmId {
        let name = algorithm.name().to_string();
        let id = self.graph.add(algorithm);
        tracing::debug!("Added algorithm {} as {}", name, id);
        id
    }

    pub fn algorithm_count(&self) -> usize {
        self.graph.len()
    }

    pub fn algorithm_name(&self, id: AlgorithmId) -> PipelineResult<&str> {
        Ok(&self.graph.slot(id)?.name)
    }

    /// Typed read access to an algorithm's parameters.
    pub fn algorithm<A: Algorithm>(&self, id: AlgorithmId) -> PipelineResult<&A> {
        self.graph
            .slot(id)?
            .algorithm
            .as_ref()
            .as_any()
            .downcast_ref::<A>()
            .ok_or(PipelineError::WrongAlgorithmType(id, type_name::<A>()))
    }

    /// Mutate an algorithm's parameters. The parameter stamp is bumped
    /// whether or not `f` changed anything.
    pub fn configure<A: Algorithm, R>(
        &mut self,
        id: AlgorithmId,
        f: impl FnOnce(&mut A) -> R,
    ) -> PipelineResult<R> {
        let slot = self.graph.slot_mut(id)?;
        let algorithm = slot
            .algorithm
            .as_mut()
            .as_any_mut()
            .downcast_mut::<A>()
            .ok_or(PipelineError::WrongAlgorithmType(id, type_name::<A>()))?;
        let result = f(algorithm);
        slot.param_stamp = Stamp::next();
        Ok(result)
    }

    /// Mark an algorithm's parameters as changed.
    pub fn modified(&mut self, id: AlgorithmId) -> PipelineResult<()> {
        self.graph.slot_mut(id)?.param_stamp = Stamp::next();
        Ok(())
    }

    pub fn parameter_stamp(&self, id: AlgorithmId) -> PipelineResult<Stamp> {
        Ok(self.graph.slot(id)?.param_stamp)
    }

    pub fn output_port(&self, id: AlgorithmId, index: usize) -> PipelineResult<PortId> {
        let slot = self.graph.slot(id)?;
        if index >= slot.outputs.len() {
            return Err(PipelineError::NoSuchPort(format!(
                "{} ({}) has no output {}",
                slot.name, id, index
            )));
        }
        Ok(PortId::new(id, index as u16))
    }

    pub fn input_port(&self, id: AlgorithmId, index: usize) -> PipelineResult<InputPortId> {
        let slot = self.graph.slot(id)?;
        if index >= slot.input_specs.len() {
            return Err(PipelineError::NoSuchPort(format!(
                "{} ({}) has no input {}",
                slot.name, id, index
            )));
        }
        Ok(InputPortId::new(id, index as u16))
    }

    // ==================== Connections ====================

    /// Add a connection from `source` to `sink`.
    pub fn connect(&mut self, source: PortId, sink: InputPortId) -> PipelineResult<ConnectionId> {
        self.graph.connect(source, sink, ConnectMode::Append)
    }

    /// Make `source` the only connection of `sink`.
    pub fn set_input_connection(&mut self, sink: InputPortId, source: PortId) -> PipelineResult<ConnectionId> {
        self.graph.connect(source, sink, ConnectMode::Replace)
    }

    /// Append `source` to a (repeatable) input. Connection order is call order.
    pub fn add_input_connection(&mut self, sink: InputPortId, source: PortId) -> PipelineResult<ConnectionId> {
        self.graph.connect(source, sink, ConnectMode::Append)
    }

    pub fn remove_input_connection(&mut self, sink: InputPortId, source: PortId) -> PipelineResult<()> {
        self.graph.disconnect_ports(sink, source)
    }

    pub fn disconnect(&mut self, id: ConnectionId) -> PipelineResult<()> {
        self.graph.remove_connection(id)
    }

    pub fn connections(&self) -> Vec<Connection> {
        self.graph.connections().copied().collect()
    }

    /// Producers feeding `sink`, in connection order.
    pub fn input_connections(&self, sink: InputPortId) -> PipelineResult<Vec<PortId>> {
        self.graph.input_sources(sink)
    }

    // ==================== Ports ====================

    pub fn port(&self, port: PortId) -> PipelineResult<&OutputPort> {
        self.graph.output(port)
    }

    pub fn output_data(&self, port: PortId) -> Option<&DataObject> {
        self.graph.output(port).ok().and_then(OutputPort::data)
    }

    pub fn information(&self, port: PortId) -> PipelineResult<&InfoRecord> {
        Ok(self.graph.output(port)?.information())
    }

    pub fn last_error(&self, port: PortId) -> Option<&ErrorRecord> {
        self.graph.output(port).ok().and_then(OutputPort::last_error)
    }

    pub fn set_release_data_flag(&mut self, port: PortId, release: bool) -> PipelineResult<()> {
        self.graph.output_mut(port)?.set_release_data_flag(release);
        Ok(())
    }

    /// Release-data behaviour for ports without their own flag.
    pub fn set_default_release_data_flag(&mut self, release: bool) {
        self.default_release = release;
    }

    pub fn default_release_data_flag(&self) -> bool {
        self.default_release
    }

    fn request_mut(&mut self, port: PortId) -> PipelineResult<&mut InfoRecord> {
        Ok(self.graph.output_mut(port)?.information_mut())
    }

    pub fn set_update_extent(&mut self, port: PortId, extent: Extent) -> PipelineResult<()> {
        self.request_mut(port)?.set(&keys::UPDATE_EXTENT, extent);
        Ok(())
    }

    pub fn set_update_time_step(&mut self, port: PortId, time: f64) -> PipelineResult<()> {
        self.request_mut(port)?.set(&keys::UPDATE_TIME_STEP, time);
        Ok(())
    }

    pub fn set_update_piece(&mut self, port: PortId, piece: i64, pieces: i64, ghost_level: i64) -> PipelineResult<()> {
        let request = self.request_mut(port)?;
        request.set(&keys::UPDATE_PIECE, piece);
        request.set(&keys::UPDATE_NUMBER_OF_PIECES, pieces);
        request.set(&keys::UPDATE_GHOST_LEVEL, ghost_level);
        Ok(())
    }

    /// Ask for output cropped to exactly the requested extent.
    pub fn set_exact_extent(&mut self, port: PortId, exact: bool) -> PipelineResult<()> {
        self.request_mut(port)?.set(&keys::EXACT_EXTENT, exact);
        Ok(())
    }

    /// Drop every request entry so the next update falls back to defaults.
    pub fn clear_update_request(&mut self, port: PortId) -> PipelineResult<()> {
        self.request_mut(port)?.remove_class(Propagation::Upstream);
        Ok(())
    }

    // ==================== Control ====================

    /// Replace the token polled by updates.
    ///
    /// A cancelled token stays cancelled: every following update returns
    /// `UpdateStatus::Cancelled` without executing anything until
    /// [`CancellationToken::reset`] is called.
    pub fn set_cancellation_token(&mut self, token: CancellationToken) {
        self.cancel = token;
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Receive [`PipelineEvent`]s from every following update.
    pub fn subscribe(&mut self) -> Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    // ==================== Updates ====================

    /// Bring `port` up to date.
    ///
    /// A failed update leaves `port` with the data it had before the call.
    /// A cancelled one, including a cancel signalled while the last
    /// algorithm executes, also restores every port it touched. The
    /// cancellation token is not reset here.
    pub fn update(&mut self, port: PortId) -> UpdateReport {
        self.run(port, |graph, session| {
            executive::process(graph, session, port, Request::Information)?;
            executive::process(graph, session, port, Request::Update)
        })
    }

    /// Run only the information pass.
    pub fn update_information(&mut self, port: PortId) -> UpdateReport {
        self.run(port, |graph, session| {
            executive::process(graph, session, port, Request::Information)
        })
    }

    /// Update the first output of `id`.
    pub fn update_algorithm(&mut self, id: AlgorithmId) -> PipelineResult<UpdateReport> {
        let port = self.output_port(id, 0)?;
        Ok(self.update(port))
    }

    /// Update `port` with its request extent reset to the whole extent.
    pub fn update_whole_extent(&mut self, port: PortId) -> UpdateReport {
        self.run(port, |graph, session| {
            executive::process(graph, session, port, Request::Information)?;
            if let Ok(out) = graph.output_mut(port) {
                let info = out.information_mut();
                if let Ok(Some(whole)) = info.lookup(&keys::WHOLE_EXTENT) {
                    info.set(&keys::UPDATE_EXTENT, whole);
                }
            }
            executive::process(graph, session, port, Request::Update)
        })
    }

    /// Update `port` as `pieces` pieces, one after another, and combine them.
    ///
    /// Each piece sets the piece keys and, when a whole extent is known, the
    /// piece's share of the port's update extent (the whole extent when none
    /// was set) split along the longest axis. The port's own request is
    /// restored afterwards. Stops at the first failed piece, in which case
    /// the port keeps the data it had before the call.
    pub fn update_streamed(&mut self, port: PortId, pieces: usize) -> StreamedUpdate {
        let pieces = pieces.max(1);
        let mut collected = Vec::with_capacity(pieces);
        let report = self.run(port, |graph, session| {
            executive::process(graph, session, port, Request::Information)?;
            let (saved, whole) = match graph.output(port) {
                Ok(out) => (
                    out.information().class_snapshot(Propagation::Upstream),
                    out.information().lookup(&keys::WHOLE_EXTENT).ok().flatten(),
                ),
                Err(_) => (InfoRecord::new(), None),
            };
            let streamed = whole.map(|whole| match saved.lookup(&keys::UPDATE_EXTENT) {
                Ok(Some(requested)) => requested.intersect(&whole),
                _ => whole,
            });

            let mut outcome = Ok(Outcome::Executed);
            for piece in 0..pieces {
                if session.cancel.is_cancelled() {
                    outcome = Err(executive::cancelled(graph, session, port.algorithm(), Some(port), Pass::Control));
                    break;
                }
                if let Ok(out) = graph.output_mut(port) {
                    let info = out.information_mut();
                    info.set(&keys::UPDATE_PIECE, piece as i64);
                    info.set(&keys::UPDATE_NUMBER_OF_PIECES, pieces as i64);
                    if let Some(extent) = streamed {
                        info.set(&keys::UPDATE_EXTENT, extent.split(piece, pieces));
                    }
                }
                tracing::trace!("Streaming piece {}/{} of {:?}", piece, pieces, port);
                match executive::process(graph, session, port, Request::Update) {
                    Ok(_) => {
                        if let Some(data) = graph.output(port).ok().and_then(OutputPort::data) {
                            collected.push(data.clone());
                        }
                    }
                    Err(record) => {
                        outcome = Err(record);
                        break;
                    }
                }
            }

            if let Ok(out) = graph.output_mut(port) {
                let info = out.information_mut();
                info.remove_class(Propagation::Upstream);
                info.append(&saved);
            }
            outcome
        });

        let combined = if report.is_success() {
            match DataObject::concatenate(&collected) {
                Ok(combined) => Some(combined),
                Err(e) => {
                    tracing::warn!("Could not combine {} streamed pieces: {}", collected.len(), e);
                    None
                }
            }
        } else {
            None
        };

        StreamedUpdate {
            report,
            pieces: collected,
            combined,
        }
    }

    /// [`update_streamed`](Self::update_streamed) with the configured piece count.
    pub fn update_streamed_default(&mut self, port: PortId) -> StreamedUpdate {
        self.update_streamed(port, self.config.streaming.default_pieces)
    }

    /// Shared driver: validates the port, runs `body` inside one update
    /// session, rolls back on cancellation, restores the requested port on
    /// failure and finishes the report.
    fn run(
        &mut self,
        port: PortId,
        body: impl FnOnce(&mut Graph, &mut UpdateSession<'_>) -> Result<Outcome, ErrorRecord>,
    ) -> UpdateReport {
        let start = Instant::now();
        let mut report = UpdateReport::new(port);

        if let Err(e) = self.graph.output(port) {
            let name = self
                .graph
                .slot(port.algorithm())
                .map(|s| s.name.clone())
                .unwrap_or_else(|_| "<unknown>".to_string());
            let record = ErrorRecord::new(port.algorithm(), name, Pass::Control, ErrorKind::BadRequest, e.to_string());
            tracing::warn!("{}", record);
            self.events.publish(PipelineEvent::Error(record.clone()));
            report.errors.push(record);
            report.finish(start.elapsed());
            return report;
        }

        let Self {
            graph,
            config,
            default_release,
            cancel,
            events,
        } = self;
        let mut session = UpdateSession::new(
            cancel,
            events,
            &mut report,
            *default_release,
            config.execution.max_continue_iterations,
        );

        let mut result = body(graph, &mut session);
        // Cancelled while the last algorithm executed.
        if result.is_ok() && session.cancel.is_cancelled() {
            result = Err(executive::cancelled(graph, &mut session, port.algorithm(), Some(port), Pass::Control));
        }
        if let Err(record) = result {
            if !session.report.errors.contains(&record) {
                session.report.errors.push(record);
            }
        }
        let cancelled = session.report.errors.iter().any(|e| e.kind == ErrorKind::Cancelled);
        if cancelled {
            session.rollback(graph);
            events.publish(PipelineEvent::Cancelled { port });
        } else if !session.report.errors.is_empty() {
            session.restore_port(graph, port);
        }

        report.finish(start.elapsed());
        tracing::info!(
            "Update of {:?} {:?} in {:?}: {} executed, {} reused, {} released, {} error(s)",
            port,
            report.status,
            report.elapsed,
            report.executed.len(),
            report.reused.len(),
            report.released.len(),
            report.errors.len()
        );
        report
    }

    // ==================== Introspection ====================

    /// Upstream closure of `port` in execute order.
    pub fn plan(&self, port: PortId) -> UpdatePlan {
        PlanCompiler::compile(&self.graph, port.algorithm())
    }

    pub fn snapshot(&self) -> TopologySnapshot {
        TopologySnapshot::capture(&self.graph)
    }

    /// True when no algorithm in the upstream closure of `port` declares
    /// itself non-deterministic.
    pub fn is_deterministic(&self, port: PortId) -> bool {
        self.plan(port).order.iter().all(|id| {
            self.graph
                .slot(*id)
                .map(|s| !s.algorithm.traits().non_deterministic)
                .unwrap_or(true)
        })
    }

    /// Total `execute` calls of `id` since it was added or last torn down.
    pub fn execute_count(&self, id: AlgorithmId) -> PipelineResult<u64> {
        Ok(self.graph.slot(id)?.executive.execute_count())
    }

    pub fn executive(&self, id: AlgorithmId) -> PipelineResult<&Executive> {
        Ok(&self.graph.slot(id)?.executive)
    }

    pub fn executive_phase(&self, id: AlgorithmId) -> PipelineResult<ExecutivePhase> {
        Ok(self.graph.slot(id)?.executive.phase())
    }

    /// Release every data object and forget all executive state. Algorithms
    /// and connections stay.
    pub fn teardown(&mut self) {
        for slot in self.graph.slots_mut() {
            for out in &mut slot.outputs {
                out.reset();
            }
            slot.executive.reset();
        }
        tracing::debug!("Tore down {} algorithm(s)", self.graph.len());
    }
}
