//! Instrumented algorithms for observing what the executive does

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use vispipe_rs::pipeline::{
    Algorithm, AlgorithmError, AlgorithmResult, AlgorithmTraits, CancellationToken, DataKind, DataObject,
    ErrorKind, ExecuteContext, InformationContext, InfoRecord, InputPortSpec, OutputPortSpec, Propagation,
    RequestContext,
};

/// Order in which labelled algorithms executed, shared across a pipeline.
pub type ExecutionLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> ExecutionLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn log_entries(log: &ExecutionLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Callback counters of one wrapped algorithm.
#[derive(Clone, Default)]
pub struct Calls {
    information: Arc<AtomicUsize>,
    request: Arc<AtomicUsize>,
    execute: Arc<AtomicUsize>,
    /// Request entries seen by each execute call.
    requests: Arc<Mutex<Vec<InfoRecord>>>,
}

impl Calls {
    pub fn information(&self) -> usize {
        self.information.load(Ordering::SeqCst)
    }

    pub fn request(&self) -> usize {
        self.request.load(Ordering::SeqCst)
    }

    pub fn execute(&self) -> usize {
        self.execute.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<InfoRecord> {
        self.requests.lock().unwrap().clone()
    }
}

/// Delegates to `inner`, counting callbacks and logging executes under
/// `label`.
pub struct Counting<A> {
    inner: A,
    label: String,
    calls: Calls,
    log: ExecutionLog,
}

pub fn counting<A: Algorithm>(inner: A, label: &str, log: &ExecutionLog) -> (Counting<A>, Calls) {
    let calls = Calls::default();
    let wrapper = Counting {
        inner,
        label: label.to_string(),
        calls: calls.clone(),
        log: log.clone(),
    };
    (wrapper, calls)
}

impl<A> Counting<A> {
    pub fn inner(&self) -> &A {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut A {
        &mut self.inner
    }
}

impl<A: Algorithm> Algorithm for Counting<A> {
    fn name(&self) -> &str {
        &self.label
    }

    fn input_ports(&self) -> &[InputPortSpec] {
        self.inner.input_ports()
    }

    fn output_ports(&self) -> &[OutputPortSpec] {
        self.inner.output_ports()
    }

    fn traits(&self) -> AlgorithmTraits {
        self.inner.traits()
    }

    fn report_information(&mut self, ctx: &mut InformationContext<'_>) -> AlgorithmResult {
        self.calls.information.fetch_add(1, Ordering::SeqCst);
        self.inner.report_information(ctx)
    }

    fn request_update_extent(&mut self, ctx: &mut RequestContext<'_>) -> AlgorithmResult {
        self.calls.request.fetch_add(1, Ordering::SeqCst);
        self.inner.request_update_extent(ctx)
    }

    fn execute(&mut self, ctx: &mut ExecuteContext<'_>) -> AlgorithmResult {
        self.calls.execute.fetch_add(1, Ordering::SeqCst);
        if let Some(info) = ctx.output_info(0) {
            self.calls
                .requests
                .lock()
                .unwrap()
                .push(info.class_snapshot(Propagation::Upstream));
        }
        self.log.lock().unwrap().push(self.label.clone());
        self.inner.execute(ctx)
    }
}

static ANY_IN: &[InputPortSpec] = &[InputPortSpec::new("in", DataKind::Any)];
static ANY_OUT: &[OutputPortSpec] = &[OutputPortSpec::new("out", DataKind::Any)];

/// Fails every execute with a fixed error kind.
pub struct Failing {
    kind: ErrorKind,
    with_input: bool,
}

impl Failing {
    pub fn source(kind: ErrorKind) -> Self {
        Self {
            kind,
            with_input: false,
        }
    }

    pub fn filter(kind: ErrorKind) -> Self {
        Self {
            kind,
            with_input: true,
        }
    }
}

impl Algorithm for Failing {
    fn name(&self) -> &str {
        "Failing"
    }

    fn input_ports(&self) -> &[InputPortSpec] {
        if self.with_input {
            ANY_IN
        } else {
            &[]
        }
    }

    fn output_ports(&self) -> &[OutputPortSpec] {
        ANY_OUT
    }

    fn execute(&mut self, _ctx: &mut ExecuteContext<'_>) -> AlgorithmResult {
        Err(AlgorithmError::new(self.kind, "failing on purpose"))
    }
}

/// Passes its input through, cancelling `token` while armed.
pub struct CancelOnExecute {
    token: CancellationToken,
    pub armed: bool,
}

impl CancelOnExecute {
    pub fn new(token: CancellationToken) -> Self {
        Self { token, armed: false }
    }
}

impl Algorithm for CancelOnExecute {
    fn name(&self) -> &str {
        "CancelOnExecute"
    }

    fn input_ports(&self) -> &[InputPortSpec] {
        ANY_IN
    }

    fn output_ports(&self) -> &[OutputPortSpec] {
        ANY_OUT
    }

    fn execute(&mut self, ctx: &mut ExecuteContext<'_>) -> AlgorithmResult {
        let data = ctx.input(0, 0)?.clone();
        if self.armed {
            self.token.cancel();
        }
        ctx.set_output(0, data)
    }
}

/// Writes nothing, which the executive must reject.
pub struct SilentSource;

impl Algorithm for SilentSource {
    fn name(&self) -> &str {
        "SilentSource"
    }

    fn output_ports(&self) -> &[OutputPortSpec] {
        ANY_OUT
    }

    fn execute(&mut self, _ctx: &mut ExecuteContext<'_>) -> AlgorithmResult {
        Ok(())
    }
}

/// Asks to continue forever.
pub struct Restless;

impl Algorithm for Restless {
    fn name(&self) -> &str {
        "Restless"
    }

    fn output_ports(&self) -> &[OutputPortSpec] {
        ANY_OUT
    }

    fn execute(&mut self, ctx: &mut ExecuteContext<'_>) -> AlgorithmResult {
        ctx.request_continue();
        ctx.set_output(0, DataObject::scalar(ctx.iteration() as f64))
    }
}
