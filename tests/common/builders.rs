//! Pipeline builders for tests

use super::counting::{counting, Calls, ExecutionLog};
use vispipe_rs::pipeline::{Algorithm, AlgorithmId, ConnectionId, Coordinator, PortId};

/// Connect output 0 of `from` to input 0 of `to`.
pub fn link(pipeline: &mut Coordinator, from: AlgorithmId, to: AlgorithmId) -> ConnectionId {
    let source = pipeline.output_port(from, 0).unwrap();
    let sink = pipeline.input_port(to, 0).unwrap();
    pipeline.connect(source, sink).unwrap()
}

/// Output 0 of `id`.
pub fn out(pipeline: &Coordinator, id: AlgorithmId) -> PortId {
    pipeline.output_port(id, 0).unwrap()
}

/// Builder for a counted pipeline where each stage feeds the next.
pub struct ChainBuilder {
    pipeline: Coordinator,
    log: ExecutionLog,
    ids: Vec<AlgorithmId>,
    calls: Vec<Calls>,
}

impl ChainBuilder {
    pub fn new(log: &ExecutionLog) -> Self {
        Self {
            pipeline: Coordinator::new(),
            log: log.clone(),
            ids: Vec::new(),
            calls: Vec::new(),
        }
    }

    pub fn with_pipeline(mut self, pipeline: Coordinator) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Append a stage, connected to the previous one if there is one.
    pub fn stage<A: Algorithm>(mut self, label: &str, algorithm: A) -> Self {
        let (wrapped, calls) = counting(algorithm, label, &self.log);
        let id = self.pipeline.add_algorithm(wrapped);
        if let Some(&prev) = self.ids.last() {
            link(&mut self.pipeline, prev, id);
        }
        self.ids.push(id);
        self.calls.push(calls);
        self
    }

    pub fn build(self) -> Chain {
        Chain {
            pipeline: self.pipeline,
            ids: self.ids,
            calls: self.calls,
        }
    }
}

pub struct Chain {
    pub pipeline: Coordinator,
    pub ids: Vec<AlgorithmId>,
    pub calls: Vec<Calls>,
}

impl Chain {
    /// Output port of the last stage.
    pub fn tail(&self) -> PortId {
        out(&self.pipeline, *self.ids.last().unwrap())
    }

    pub fn port(&self, stage: usize) -> PortId {
        out(&self.pipeline, self.ids[stage])
    }
}
