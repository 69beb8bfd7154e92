//! vispipe - demo driver
//!
//! Loads a config (path from the first argument, or the default location),
//! then runs two small pipelines: a streamed image pipeline and a temporal
//! accumulation over a time-varying source.

use anyhow::{bail, Context};
use vispipe_rs::{
    config::{default_config_path, PipelineConfig},
    logging,
    pipeline::{
        keys,
        nodes::{PassThrough, RampSource, Scale, TemporalSum, TimeSnap, TimeSource},
        Coordinator, PipelineEvent,
    },
    types::Extent,
};

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::load(&path).with_context(|| format!("Failed to load config {}", path))?,
        None => default_config_path()
            .filter(|p| p.exists())
            .map(PipelineConfig::load_or_default)
            .unwrap_or_default(),
    };

    logging::init_tracing(&config.logging.filter);
    tracing::info!("Starting vispipe demo");

    let mut pipeline = Coordinator::with_config(config.clone());
    let events = pipeline.subscribe();

    // ramp -> pass-through (ghost 1) -> scale, streamed
    let ramp = pipeline.add_algorithm(RampSource::new(Extent::new(0, 15, 0, 15, 0, 0)));
    let crop = pipeline.add_algorithm(PassThrough::new().with_ghost_margin(1));
    let scale = pipeline.add_algorithm(Scale::new(0.5));
    pipeline.connect(pipeline.output_port(ramp, 0)?, pipeline.input_port(crop, 0)?)?;
    pipeline.connect(pipeline.output_port(crop, 0)?, pipeline.input_port(scale, 0)?)?;

    let out = pipeline.output_port(scale, 0)?;
    let pieces = config.streaming.default_pieces.max(4);
    let streamed = pipeline.update_streamed(out, pieces);
    if !streamed.report.is_success() {
        bail!("Streamed update failed: {:?}", streamed.report.errors);
    }
    if let Some(combined) = &streamed.combined {
        tracing::info!(
            "Streamed {} pieces into extent {:?}",
            streamed.pieces.len(),
            combined.information().lookup(&keys::DATA_EXTENT)?
        );
    }

    // time source -> snap -> temporal sum
    let source = pipeline.add_algorithm(TimeSource::new(vec![0.0, 0.5, 1.0, 1.5]).with_amplitude(2.0));
    let snap = pipeline.add_algorithm(TimeSnap::new(config.time.snap_tolerance));
    let sum = pipeline.add_algorithm(TemporalSum::new());
    pipeline.connect(pipeline.output_port(source, 0)?, pipeline.input_port(snap, 0)?)?;
    pipeline.connect(pipeline.output_port(snap, 0)?, pipeline.input_port(sum, 0)?)?;

    let report = pipeline.update_algorithm(sum)?.into_result()?;
    tracing::info!(
        "Temporal sum: {:?} after {} executes",
        pipeline
            .output_data(pipeline.output_port(sum, 0)?)
            .and_then(|d| d.payload().as_values().map(<[f64]>::to_vec)),
        report.executed.len()
    );

    let executed = events
        .try_iter()
        .filter(|e| matches!(e, PipelineEvent::Executed { .. }))
        .count();
    tracing::info!("Observed {} execute events", executed);
    tracing::debug!("Topology:\n{}", pipeline.snapshot().to_json()?);

    Ok(())
}
