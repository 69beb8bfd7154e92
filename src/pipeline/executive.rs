//! Per-algorithm executive and the demand-driven update protocol.
//!
//! An update of an output port runs three passes over the port's upstream
//! closure:
//!
//! 1. **Information**: recurse upstream, then let each algorithm publish
//!    meta-information. Cached by stamp, so unchanged branches are skipped.
//! 2. **Request**: finalize and validate the request on the port, then
//!    derive the requests its inputs must satisfy.
//! 3. **Execute**: unless cached data already answers the request, write
//!    the input requests upstream, recurse, and call `execute`.
//!
//! Failures never unwind. Each one becomes an [`ErrorRecord`] stored on the
//! requested port, appended to the update report and published as an event;
//! the caller decides what to do with partial results.

use crate::pipeline::algorithm::{
    AlgorithmTraits, ExecuteContext, ExtentPolicy, InformationContext, InputData, OutputSlot, RequestContext,
};
use crate::pipeline::cancel::CancellationToken;
use crate::pipeline::data::{DataObject, Payload};
use crate::pipeline::error::{AlgorithmError, AlgorithmResult, ErrorKind, ErrorRecord, Pass, PipelineError};
use crate::pipeline::events::{EventBus, PipelineEvent};
use crate::pipeline::graph::Graph;
use crate::pipeline::id::{AlgorithmId, PortId};
use crate::pipeline::info::{keys, InfoKey, InfoRecord, Propagation};
use crate::pipeline::port::{OutputPort, PortCheckpoint};
use crate::pipeline::report::UpdateReport;
use crate::pipeline::stamp::Stamp;
use crate::pipeline::time;
use crate::types::Extent;
use serde::Serialize;
use std::collections::HashMap;

/// Where an executive is in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ExecutivePhase {
    #[default]
    Idle,
    Information,
    Ready,
    RequestUpdateExtent,
    Executing,
    Failed,
}

/// Entry points of [`process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Information,
    Update,
}

/// What servicing a request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Informed,
    Executed,
    Reused,
    /// The request covered no points; an empty object was published.
    Empty,
}

/// Private per-algorithm state.
#[derive(Debug, Default)]
pub struct Executive {
    phase: ExecutivePhase,
    info_stamp: Option<Stamp>,
    pipeline_stamp: Stamp,
    input_requests: Vec<Vec<InfoRecord>>,
    continue_executing: bool,
    execute_count: u64,
}

impl Executive {
    pub fn phase(&self) -> ExecutivePhase {
        self.phase
    }

    /// When the algorithm last published information, if ever.
    pub fn information_stamp(&self) -> Option<Stamp> {
        self.info_stamp
    }

    /// Newest parameter stamp in the algorithm's upstream closure.
    pub fn pipeline_stamp(&self) -> Stamp {
        self.pipeline_stamp
    }

    /// Requests last sent upstream, per input port and connection.
    pub fn input_requests(&self) -> &[Vec<InfoRecord>] {
        &self.input_requests
    }

    pub fn execute_count(&self) -> u64 {
        self.execute_count
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Bookkeeping shared by every executive one update reaches.
pub(crate) struct UpdateSession<'a> {
    pub(crate) cancel: &'a CancellationToken,
    pub(crate) events: &'a mut EventBus,
    pub(crate) report: &'a mut UpdateReport,
    pub(crate) default_release: bool,
    pub(crate) max_continue_iterations: u32,
    informed: HashMap<AlgorithmId, Option<ErrorRecord>>,
    checkpoints: HashMap<PortId, PortCheckpoint>,
}

impl<'a> UpdateSession<'a> {
    pub(crate) fn new(
        cancel: &'a CancellationToken,
        events: &'a mut EventBus,
        report: &'a mut UpdateReport,
        default_release: bool,
        max_continue_iterations: u32,
    ) -> Self {
        Self {
            cancel,
            events,
            report,
            default_release,
            max_continue_iterations: max_continue_iterations.max(1),
            informed: HashMap::new(),
            checkpoints: HashMap::new(),
        }
    }

    /// Remember a port's state the first time this update touches it.
    fn checkpoint(&mut self, port: PortId, state: &OutputPort) {
        self.checkpoints.entry(port).or_insert_with(|| state.checkpoint());
    }

    /// Put only `port` back the way the update found it.
    pub(crate) fn restore_port(&mut self, graph: &mut Graph, port: PortId) {
        if let Some(checkpoint) = self.checkpoints.remove(&port) {
            if let Ok(state) = graph.output_mut(port) {
                state.restore(checkpoint);
            }
        }
    }

    /// Put every touched port back the way the update found it.
    pub(crate) fn rollback(self, graph: &mut Graph) {
        for (port, checkpoint) in self.checkpoints {
            if let Ok(state) = graph.output_mut(port) {
                state.restore(checkpoint);
            }
        }
    }
}

/// Service `request` for `port`.
pub(crate) fn process(
    graph: &mut Graph,
    session: &mut UpdateSession<'_>,
    port: PortId,
    request: Request,
) -> Result<Outcome, ErrorRecord> {
    match request {
        Request::Information => process_information(graph, session, port.algorithm()).map(|()| Outcome::Informed),
        Request::Update => process_update(graph, session, port),
    }
}

/// Record a failure: phase, port error, report and event.
fn fail(
    graph: &mut Graph,
    session: &mut UpdateSession<'_>,
    alg: AlgorithmId,
    port: Option<PortId>,
    pass: Pass,
    kind: ErrorKind,
    message: impl Into<String>,
) -> ErrorRecord {
    let name = graph
        .slot(alg)
        .map(|s| s.name.clone())
        .unwrap_or_else(|_| "<unknown>".to_string());
    let record = ErrorRecord::new(alg, name, pass, kind, message);

    if let Ok(slot) = graph.slot_mut(alg) {
        slot.executive.phase = ExecutivePhase::Failed;
        slot.executive.continue_executing = false;
        match port {
            Some(p) => {
                if let Some(out) = slot.outputs.get_mut(p.index()) {
                    out.set_last_error(record.clone());
                }
            }
            None => {
                for out in &mut slot.outputs {
                    out.set_last_error(record.clone());
                }
            }
        }
    }

    if kind == ErrorKind::Cancelled {
        tracing::debug!("{}", record);
    } else {
        tracing::warn!("{}", record);
    }
    session.report.errors.push(record.clone());
    session.events.publish(PipelineEvent::Error(record.clone()));
    record
}

pub(crate) fn cancelled(
    graph: &mut Graph,
    session: &mut UpdateSession<'_>,
    alg: AlgorithmId,
    port: Option<PortId>,
    pass: Pass,
) -> ErrorRecord {
    fail(graph, session, alg, port, pass, ErrorKind::Cancelled, "update was cancelled")
}

/// Failure of a consumer whose producers failed.
fn upstream_failure(
    graph: &mut Graph,
    session: &mut UpdateSession<'_>,
    alg: AlgorithmId,
    port: Option<PortId>,
    pass: Pass,
    failures: &[ErrorRecord],
) -> ErrorRecord {
    if failures.iter().any(|f| f.kind == ErrorKind::Cancelled) {
        return cancelled(graph, session, alg, port, pass);
    }
    let mut names: Vec<&str> = Vec::new();
    for f in failures {
        if !names.contains(&f.algorithm_name.as_str()) {
            names.push(&f.algorithm_name);
        }
    }
    let message = format!("upstream {} failed", names.join(", "));
    fail(graph, session, alg, port, pass, ErrorKind::InputMissing, message)
}

/// Record for a registry lookup that cannot fail once an algorithm was
/// validated; kept out of the report until the coordinator adds it.
fn lookup_failure(alg: AlgorithmId, pass: Pass, err: PipelineError) -> ErrorRecord {
    ErrorRecord::new(alg, "<unknown>", pass, ErrorKind::Internal, err.to_string())
}

fn upstream_information(graph: &Graph, upstream: &[Vec<PortId>]) -> Result<Vec<Vec<InfoRecord>>, PipelineError> {
    upstream
        .iter()
        .map(|ports| {
            ports
                .iter()
                .map(|p| graph.output(*p).map(|o| o.information().clone()))
                .collect()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Pass 1: information
// ---------------------------------------------------------------------------

fn process_information(
    graph: &mut Graph,
    session: &mut UpdateSession<'_>,
    alg: AlgorithmId,
) -> Result<(), ErrorRecord> {
    if let Some(done) = session.informed.get(&alg) {
        return match done {
            None => Ok(()),
            Some(record) => Err(record.clone()),
        };
    }
    let result = inform(graph, session, alg);
    session.informed.insert(alg, result.as_ref().err().cloned());
    result
}

fn inform(graph: &mut Graph, session: &mut UpdateSession<'_>, alg: AlgorithmId) -> Result<(), ErrorRecord> {
    let pass = Pass::Information;
    if session.cancel.is_cancelled() {
        return Err(cancelled(graph, session, alg, None, pass));
    }

    let upstream_algs = graph
        .upstream_algorithms(alg)
        .map_err(|e| lookup_failure(alg, pass, e))?;
    graph
        .slot_mut(alg)
        .map_err(|e| lookup_failure(alg, pass, e))?
        .executive
        .phase = ExecutivePhase::Information;

    let mut failures = Vec::new();
    for up in &upstream_algs {
        if let Err(record) = process_information(graph, session, *up) {
            failures.push(record);
        }
    }
    if !failures.is_empty() {
        return Err(upstream_failure(graph, session, alg, None, pass, &failures));
    }

    let missing_input = {
        let slot = graph.slot(alg).map_err(|e| lookup_failure(alg, pass, e))?;
        slot.input_specs
            .iter()
            .zip(&slot.inputs)
            .find(|(spec, conns)| spec.required && conns.is_empty())
            .map(|(spec, _)| spec.name)
    };
    if let Some(name) = missing_input {
        let message = format!("required input '{}' has no connection", name);
        return Err(fail(graph, session, alg, None, pass, ErrorKind::InputMissing, message));
    }

    let (up_pipeline, up_info) = upstream_algs
        .iter()
        .filter_map(|u| graph.slot(*u).ok())
        .fold((Stamp::ZERO, Stamp::ZERO), |(p, i), s| {
            (
                p.max(s.executive.pipeline_stamp),
                i.max(s.executive.info_stamp.unwrap_or(Stamp::ZERO)),
            )
        });
    let upstream = graph.upstream_ports(alg).map_err(|e| lookup_failure(alg, pass, e))?;
    let in_infos = upstream_information(graph, &upstream).map_err(|e| lookup_failure(alg, pass, e))?;

    let slot = graph.slot_mut(alg).map_err(|e| lookup_failure(alg, pass, e))?;
    slot.executive.pipeline_stamp = slot.param_stamp.max(up_pipeline);
    let stale = match slot.executive.info_stamp {
        None => true,
        Some(s) => slot.param_stamp > s || up_info > s,
    };
    if !stale {
        slot.executive.phase = ExecutivePhase::Ready;
        return Ok(());
    }

    let mut outputs: Vec<InfoRecord> = slot
        .outputs
        .iter()
        .map(|port| {
            let mut info = port.information().clone();
            info.remove_class(Propagation::Downstream);
            if let Some(first) = in_infos.first().and_then(|c| c.first()) {
                info.copy_class(first, Propagation::Downstream);
            }
            info
        })
        .collect();

    let result = {
        let mut ctx = InformationContext {
            inputs: &in_infos,
            outputs: &mut outputs,
        };
        slot.algorithm.report_information(&mut ctx)
    }
    .and_then(|()| outputs.iter_mut().try_for_each(derive_time_range));

    if let Err(e) = result {
        return Err(fail(graph, session, alg, None, pass, e.kind, e.message));
    }

    let slot = graph.slot_mut(alg).map_err(|e| lookup_failure(alg, pass, e))?;
    for (port, info) in slot.outputs.iter_mut().zip(outputs) {
        *port.information_mut() = info;
    }
    slot.executive.info_stamp = Some(Stamp::next());
    slot.executive.phase = ExecutivePhase::Ready;
    tracing::trace!("Refreshed information of {} ({})", slot.name, alg);
    Ok(())
}

/// Check `TIME_STEPS` ordering and keep `TIME_RANGE` in step with it.
fn derive_time_range(info: &mut InfoRecord) -> AlgorithmResult {
    if let Some(steps) = info.lookup(&keys::TIME_STEPS)? {
        if !time::is_ascending(&steps) {
            return Err(AlgorithmError::internal("TIME_STEPS must be strictly ascending"));
        }
        match time::time_range(&steps) {
            Some(range) => info.set(&keys::TIME_RANGE, range),
            None => {
                info.remove(&keys::TIME_RANGE);
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Passes 2 and 3: request and execute
// ---------------------------------------------------------------------------

fn process_update(
    graph: &mut Graph,
    session: &mut UpdateSession<'_>,
    port: PortId,
) -> Result<Outcome, ErrorRecord> {
    let alg = port.algorithm();
    let mut iteration = 0u32;
    loop {
        let outcome = update_once(graph, session, port, iteration)?;
        let continuing = outcome == Outcome::Executed
            && graph
                .slot(alg)
                .map(|s| s.executive.continue_executing)
                .unwrap_or(false);
        if !continuing {
            return Ok(outcome);
        }

        iteration += 1;
        if iteration >= session.max_continue_iterations {
            let message = format!(
                "still asked to continue executing after {} iterations",
                session.max_continue_iterations
            );
            return Err(fail(graph, session, alg, Some(port), Pass::Execute, ErrorKind::Internal, message));
        }
        if session.cancel.is_cancelled() {
            return Err(cancelled(graph, session, alg, Some(port), Pass::Execute));
        }
        tracing::trace!("Continuing execution of {} (iteration {})", alg, iteration);
    }
}

fn update_once(
    graph: &mut Graph,
    session: &mut UpdateSession<'_>,
    port: PortId,
    iteration: u32,
) -> Result<Outcome, ErrorRecord> {
    let alg = port.algorithm();
    let pass = Pass::RequestUpdateExtent;
    if session.cancel.is_cancelled() {
        return Err(cancelled(graph, session, alg, Some(port), pass));
    }

    // Finalize and validate the request on the port.
    let (traits, is_source, finalized) = {
        let slot = graph.slot_mut(alg).map_err(|e| lookup_failure(alg, pass, e))?;
        slot.executive.phase = ExecutivePhase::RequestUpdateExtent;
        let traits = slot.algorithm.traits();
        let is_source = slot.inputs.iter().all(Vec::is_empty);
        let name = slot.name.clone();
        let finalized = match slot.outputs.get_mut(port.index()) {
            Some(out) => finalize_request(out.information_mut(), &traits, is_source, &name).map(|()| {
                if out.note_request(traits.time_snapping.map(|p| p.tolerance)) {
                    tracing::trace!("Request on {:?} changed: {:?}", port, out.information().class_snapshot(Propagation::Upstream));
                }
            }),
            None => Err(AlgorithmError::internal(format!("{:?} does not exist", port))),
        };
        (traits, is_source, finalized)
    };
    if let Err(e) = finalized {
        return Err(fail(graph, session, alg, Some(port), pass, e.kind, e.message));
    }
    let tolerance = traits.time_snapping.map(|p| p.tolerance);

    let requested_extent = graph
        .output(port)
        .ok()
        .and_then(|o| o.information().lookup(&keys::UPDATE_EXTENT).ok().flatten());
    if requested_extent.is_some_and(|e| e.is_empty()) {
        publish_empty(graph, session, port);
        return Ok(Outcome::Empty);
    }

    // Unstructured sources that cannot split their output produce it all
    // for piece 0.
    if is_source && !traits.handles_pieces && requested_piece(graph, port) > 0 {
        publish_empty(graph, session, port);
        return Ok(Outcome::Empty);
    }

    // Derive input requests.
    let upstream = graph.upstream_ports(alg).map_err(|e| lookup_failure(alg, pass, e))?;
    let in_infos = upstream_information(graph, &upstream).map_err(|e| lookup_failure(alg, pass, e))?;
    let request_result = {
        let slot = graph.slot_mut(alg).map_err(|e| lookup_failure(alg, pass, e))?;
        let out_infos: Vec<InfoRecord> = slot.outputs.iter().map(|o| o.information().clone()).collect();
        let mut input_requests = default_input_requests(&out_infos[port.index()], &in_infos, traits.extent_policy);
        let result = {
            let mut ctx = RequestContext {
                requested_port: port.index(),
                outputs: &out_infos,
                inputs: &in_infos,
                input_requests: &mut input_requests,
                iteration,
            };
            slot.algorithm.request_update_extent(&mut ctx)
        };
        slot.executive.input_requests = input_requests;
        result
    };
    if let Err(e) = request_result {
        return Err(fail(graph, session, alg, Some(port), pass, e.kind, e.message));
    }

    // Serve from cache when the data already answers this request. No
    // upstream recursion happens in that case.
    let reuse = {
        let slot = graph.slot(alg).map_err(|e| lookup_failure(alg, pass, e))?;
        let out = &slot.outputs[port.index()];
        let effective = slot.executive.pipeline_stamp.max(out.request_stamp());
        let request = out.information().class_snapshot(Propagation::Upstream);
        !slot.executive.continue_executing
            && !out.needs_execute(effective)
            && out
                .serviced_request()
                .is_some_and(|serviced| serviced.request_eq(&request, tolerance))
    };
    if reuse {
        let slot = graph.slot_mut(alg).map_err(|e| lookup_failure(alg, pass, e))?;
        slot.executive.phase = ExecutivePhase::Ready;
        tracing::debug!("Reusing cached output of {} on {:?}", slot.name, port);
        session.report.reused.push(alg);
        session.events.publish(PipelineEvent::Reused { algorithm: alg, port });
        return Ok(Outcome::Reused);
    }

    execute(graph, session, port, iteration, &upstream)
}

fn execute(
    graph: &mut Graph,
    session: &mut UpdateSession<'_>,
    port: PortId,
    iteration: u32,
    upstream: &[Vec<PortId>],
) -> Result<Outcome, ErrorRecord> {
    let alg = port.algorithm();
    let pass = Pass::Execute;

    let input_requests = {
        let slot = graph.slot_mut(alg).map_err(|e| lookup_failure(alg, pass, e))?;
        slot.executive.phase = ExecutivePhase::Executing;
        slot.executive.input_requests.clone()
    };

    // Bring every producer up to date, siblings in connection order. All of
    // them are attempted even after one fails.
    let mut failures = Vec::new();
    for (i, ports) in upstream.iter().enumerate() {
        for (j, up) in ports.iter().enumerate() {
            if let Ok(up_port) = graph.output_mut(*up) {
                let info = up_port.information_mut();
                info.remove_class(Propagation::Upstream);
                if let Some(request) = input_requests.get(i).and_then(|r| r.get(j)) {
                    info.append(request);
                }
            }
            if let Err(record) = process(graph, session, *up, Request::Update) {
                failures.push(record);
            }
            if session.cancel.is_cancelled() {
                return Err(cancelled(graph, session, alg, Some(port), pass));
            }
        }
    }
    if !failures.is_empty() {
        return Err(upstream_failure(graph, session, alg, Some(port), pass, &failures));
    }

    let inputs = match gather_inputs(graph, alg, upstream) {
        Ok(inputs) => inputs,
        Err(e) => return Err(fail(graph, session, alg, Some(port), pass, e.kind, e.message)),
    };
    if session.cancel.is_cancelled() {
        return Err(cancelled(graph, session, alg, Some(port), pass));
    }

    let (result, continue_requested, produced) = {
        let slot = graph.slot_mut(alg).map_err(|e| lookup_failure(alg, pass, e))?;
        let mut outputs: Vec<OutputSlot> = slot
            .outputs
            .iter()
            .map(|o| OutputSlot::new(o.information().clone()))
            .collect();
        let mut ctx = ExecuteContext {
            inputs: &inputs,
            outputs: &mut outputs,
            cancel: session.cancel,
            iteration,
            continue_requested: false,
        };
        let result = slot.algorithm.execute(&mut ctx);
        let continue_requested = ctx.continue_requested;
        (result, continue_requested, outputs)
    };
    if let Err(e) = result {
        return Err(fail(graph, session, alg, Some(port), pass, e.kind, e.message));
    }
    if let Some((k, slot)) = produced.iter().enumerate().find(|(_, s)| s.writes != 1) {
        let message = format!(
            "output {} was written {} times during execute, expected exactly once",
            k, slot.writes
        );
        return Err(fail(graph, session, alg, Some(port), pass, ErrorKind::Internal, message));
    }

    // Publish.
    for k in 0..produced.len() {
        let out_id = PortId::new(alg, k as u16);
        if let Ok(state) = graph.output(out_id) {
            session.checkpoint(out_id, state);
        }
    }
    let input_time = inputs
        .first()
        .and_then(|conns| conns.first())
        .and_then(|input| input.data.information().lookup(&keys::DATA_TIME_STEP).ok().flatten());

    let slot = graph.slot_mut(alg).map_err(|e| lookup_failure(alg, pass, e))?;
    for (state, out) in slot.outputs.iter_mut().zip(produced) {
        let Some(data) = out.data else { continue };
        let mut data = finalize_response(data, state.information(), input_time);
        let stamp = Stamp::next();
        data.set_modification_stamp(stamp);
        let request = state.information().class_snapshot(Propagation::Upstream);
        state.set_data(data);
        state.mark_executed(stamp, request);
        state.clear_last_error();
    }
    slot.executive.continue_executing = continue_requested;
    slot.executive.execute_count += 1;
    slot.executive.phase = ExecutivePhase::Ready;

    let info = slot.outputs[port.index()].information();
    let piece = info.lookup(&keys::UPDATE_PIECE).ok().flatten().unwrap_or(0);
    let pieces = info.lookup(&keys::UPDATE_NUMBER_OF_PIECES).ok().flatten().unwrap_or(1);
    tracing::debug!(
        "Executed {} ({}) for {:?}, piece {}/{}",
        slot.name,
        alg,
        port,
        piece,
        pieces
    );
    session.report.executed.push(alg);
    session.events.publish(PipelineEvent::Executed {
        algorithm: alg,
        port,
        piece,
        pieces,
    });

    release_upstream(graph, session, upstream);
    Ok(Outcome::Executed)
}

/// Data and information of every input connection, type-checked against the
/// input port specs.
fn gather_inputs(graph: &Graph, alg: AlgorithmId, upstream: &[Vec<PortId>]) -> AlgorithmResult<Vec<Vec<InputData>>> {
    let slot = graph
        .slot(alg)
        .map_err(|e| AlgorithmError::internal(e.to_string()))?;
    let mut inputs = Vec::with_capacity(upstream.len());
    for (i, ports) in upstream.iter().enumerate() {
        let spec = slot
            .input_specs
            .get(i)
            .ok_or_else(|| AlgorithmError::internal(format!("input {} has no descriptor", i)))?;
        let mut conns = Vec::with_capacity(ports.len());
        for (j, up) in ports.iter().enumerate() {
            let producer = graph
                .output(*up)
                .map_err(|e| AlgorithmError::internal(e.to_string()))?;
            let data = producer.data().cloned().ok_or_else(|| {
                AlgorithmError::input_missing(format!("input '{}' connection {} has no data", spec.name, j))
            })?;
            if let Some(kind) = data.kind() {
                if !spec.accepts.accepts(kind) {
                    return Err(AlgorithmError::input_type_mismatch(format!(
                        "input '{}' accepts {:?}, received {:?}",
                        spec.name, spec.accepts, kind
                    )));
                }
            }
            conns.push(InputData {
                data,
                information: producer.information().clone(),
            });
        }
        inputs.push(conns);
    }
    Ok(inputs)
}

fn release_upstream(graph: &mut Graph, session: &mut UpdateSession<'_>, upstream: &[Vec<PortId>]) {
    for up in upstream.iter().flatten() {
        let Ok(state) = graph.output(*up) else { continue };
        let release = state.release_data_flag().unwrap_or(session.default_release);
        if !release || state.data().is_none() {
            continue;
        }
        session.checkpoint(*up, state);
        if let Ok(state) = graph.output_mut(*up) {
            state.release_data();
        }
        tracing::debug!("Released data of {:?}", up);
        session.report.released.push(*up);
        session.events.publish(PipelineEvent::Released { port: *up });
    }
}

/// Piece asked of `port`, or 0 when the request is extent-based.
fn requested_piece(graph: &Graph, port: PortId) -> i64 {
    let Ok(out) = graph.output(port) else {
        return 0;
    };
    let info = out.information();
    if info.has(&keys::WHOLE_EXTENT) {
        return 0;
    }
    info.lookup(&keys::UPDATE_PIECE).ok().flatten().unwrap_or(0)
}

fn publish_empty(graph: &mut Graph, session: &mut UpdateSession<'_>, port: PortId) {
    if let Ok(state) = graph.output(port) {
        session.checkpoint(port, state);
    }
    let Ok(slot) = graph.slot_mut(port.algorithm()) else {
        return;
    };
    slot.executive.phase = ExecutivePhase::Ready;
    let Some(state) = slot.outputs.get_mut(port.index()) else {
        return;
    };
    let mut data = DataObject::empty();
    data.information_mut().set(&keys::DATA_EXTENT, Extent::EMPTY);
    let mut data = finalize_response(data, state.information(), None);
    let stamp = Stamp::next();
    data.set_modification_stamp(stamp);
    let request = state.information().class_snapshot(Propagation::Upstream);
    state.set_data(data);
    state.mark_executed(stamp, request);
    state.clear_last_error();
    tracing::trace!("Empty extent requested on {:?}; published empty data", port);
}

/// Fill request defaults and reject requests that cannot be valid.
fn finalize_request(
    info: &mut InfoRecord,
    traits: &AlgorithmTraits,
    is_source: bool,
    name: &str,
) -> AlgorithmResult {
    if !info.has(&keys::UPDATE_PIECE) {
        info.set(&keys::UPDATE_PIECE, 0);
    }
    if !info.has(&keys::UPDATE_NUMBER_OF_PIECES) {
        info.set(&keys::UPDATE_NUMBER_OF_PIECES, 1);
    }
    if !info.has(&keys::UPDATE_GHOST_LEVEL) {
        info.set(&keys::UPDATE_GHOST_LEVEL, 0);
    }
    let whole = info.lookup(&keys::WHOLE_EXTENT)?;
    if !info.has(&keys::UPDATE_EXTENT) {
        if let Some(whole) = whole {
            info.set(&keys::UPDATE_EXTENT, whole);
        }
    }

    let piece = info.get(&keys::UPDATE_PIECE)?;
    let pieces = info.get(&keys::UPDATE_NUMBER_OF_PIECES)?;
    let ghost = info.get(&keys::UPDATE_GHOST_LEVEL)?;
    if pieces < 1 {
        return Err(AlgorithmError::bad_request(format!(
            "number of pieces must be at least 1, got {}",
            pieces
        )));
    }
    if piece < 0 || piece >= pieces {
        return Err(AlgorithmError::bad_request(format!(
            "piece {} is outside 0..{}",
            piece, pieces
        )));
    }
    if ghost < 0 {
        return Err(AlgorithmError::bad_request(format!("negative ghost level {}", ghost)));
    }
    if let (Some(extent), Some(whole)) = (info.lookup(&keys::UPDATE_EXTENT)?, whole) {
        if !extent.is_empty() && !whole.contains(&extent) {
            return Err(AlgorithmError::bad_request(format!(
                "update extent {} lies outside whole extent {}",
                extent, whole
            )));
        }
    }

    let Some(t) = info.lookup(&keys::UPDATE_TIME_STEP)? else {
        return Ok(());
    };
    if !t.is_finite() {
        return Err(AlgorithmError::bad_request(format!("time {} is not finite", t)));
    }
    let steps = info.lookup(&keys::TIME_STEPS)?.unwrap_or_default();
    if steps.is_empty() {
        return Ok(());
    }
    match traits.time_snapping {
        Some(policy) => {
            if let Some(snapped) = time::nearest_step(&steps, t) {
                if !time::times_match(t, snapped, policy.tolerance) {
                    tracing::debug!(
                        "{}: requested time {} is not within tolerance {} of any step, using {}",
                        name,
                        t,
                        policy.tolerance,
                        snapped
                    );
                }
                info.set(&keys::UPDATE_TIME_STEP, snapped);
            }
        }
        None if is_source => {
            if let Some([first, last]) = time::time_range(&steps) {
                if t < first || t > last {
                    return Err(AlgorithmError::cannot_satisfy(format!(
                        "time {} is outside the advertised range [{}, {}]",
                        t, first, last
                    )));
                }
            }
        }
        None => {}
    }
    Ok(())
}

/// Identity copies of the output request for every input connection, with
/// extents grown by the ghost margin when the algorithm declares one.
fn default_input_requests(
    output: &InfoRecord,
    inputs: &[Vec<InfoRecord>],
    policy: ExtentPolicy,
) -> Vec<Vec<InfoRecord>> {
    let request = output.class_snapshot(Propagation::Upstream);
    inputs
        .iter()
        .map(|conns| {
            conns
                .iter()
                .map(|producer| {
                    let mut req = request.clone();
                    if let ExtentPolicy::Ghost(margin) = policy {
                        if let Ok(Some(extent)) = req.lookup(&keys::UPDATE_EXTENT) {
                            let mut grown = extent.grow(margin);
                            if let Ok(Some(whole)) = producer.lookup(&keys::WHOLE_EXTENT) {
                                grown = grown.intersect(&whole);
                            }
                            req.set(&keys::UPDATE_EXTENT, grown);
                        }
                    }
                    req
                })
                .collect()
        })
        .collect()
}

/// Write the response keys the algorithm left unset and apply exact-extent
/// cropping.
fn finalize_response(data: DataObject, port_info: &InfoRecord, input_time: Option<f64>) -> DataObject {
    let request_extent = port_info.lookup(&keys::UPDATE_EXTENT).ok().flatten();
    let exact = port_info.lookup(&keys::EXACT_EXTENT).ok().flatten().unwrap_or(false);
    let mut data = match request_extent {
        Some(extent) if exact => data.crop(&extent),
        _ => data,
    };

    let image_extent = match data.payload() {
        Payload::Image(img) => Some(img.extent()),
        _ => None,
    };
    let info = data.information_mut();
    if !info.has(&keys::DATA_EXTENT) {
        if let Some(extent) = image_extent.or(request_extent) {
            info.set(&keys::DATA_EXTENT, extent);
        }
    }

    let time_varying = port_info.has(&keys::TIME_STEPS) || port_info.has(&keys::TIME_RANGE);
    if time_varying && !info.has(&keys::DATA_TIME_STEP) {
        let requested = port_info.lookup(&keys::UPDATE_TIME_STEP).ok().flatten();
        if let Some(t) = input_time.or(requested) {
            info.set(&keys::DATA_TIME_STEP, t);
        }
    }

    let piece_keys: [(InfoKey<i64>, InfoKey<i64>); 3] = [
        (keys::UPDATE_PIECE, keys::DATA_PIECE),
        (keys::UPDATE_NUMBER_OF_PIECES, keys::DATA_NUMBER_OF_PIECES),
        (keys::UPDATE_GHOST_LEVEL, keys::DATA_GHOST_LEVEL),
    ];
    for (request_key, data_key) in piece_keys {
        if !info.has(&data_key) {
            if let Ok(Some(v)) = port_info.lookup(&request_key) {
                info.set(&data_key, v);
            }
        }
    }
    data
}
