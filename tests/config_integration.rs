//! Config files and their effect on a coordinator

mod common;

use common::builders::{link, out};
use common::counting::Restless;
use std::fs;
use tempfile::TempDir;
use vispipe_rs::config::PipelineConfig;
use vispipe_rs::pipeline::nodes::{ConstantSource, RampSource, Scale, TemporalSum, TimeSource};
use vispipe_rs::pipeline::{Coordinator, ErrorKind, Pass, UpdateStatus};
use vispipe_rs::types::Extent;
use vispipe_rs::VisPipeError;

fn custom_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.execution.default_release_data = true;
    config.execution.max_continue_iterations = 7;
    config.streaming.default_pieces = 3;
    config.time.snap_tolerance = 0.25;
    config.events.channel_capacity = 16;
    config.logging.filter = "vispipe_rs=trace".to_string();
    config
}

#[test]
fn test_toml_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("pipeline.toml");
    let config = custom_config();

    config.save(&path).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("[streaming]"));

    assert_eq!(PipelineConfig::load(&path).unwrap(), config);
}

#[test]
fn test_json_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pipeline.json");
    let config = custom_config();

    config.save(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["streaming"]["default_pieces"], 3);

    assert_eq!(PipelineConfig::load(&path).unwrap(), config);
}

#[test]
fn test_partial_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pipeline.toml");
    fs::write(&path, "[streaming]\ndefault_pieces = 6\n").unwrap();

    let config = PipelineConfig::load(&path).unwrap();
    assert_eq!(config.streaming.default_pieces, 6);
    assert_eq!(config.execution, PipelineConfig::default().execution);
}

#[test]
fn test_invalid_config_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pipeline.toml");
    fs::write(&path, "[execution]\nmax_continue_iterations = 0\n").unwrap();
    assert!(matches!(PipelineConfig::load(&path), Err(VisPipeError::Config(_))));

    fs::write(&path, "not = [valid").unwrap();
    assert!(matches!(PipelineConfig::load(&path), Err(VisPipeError::Config(_))));

    // Falls back to defaults instead of failing.
    assert_eq!(PipelineConfig::load_or_default(&path), PipelineConfig::default());
    assert_eq!(
        PipelineConfig::load_or_default(dir.path().join("missing.toml")),
        PipelineConfig::default()
    );
}

#[test]
fn test_iteration_limit_stops_temporal_sum() {
    let mut config = PipelineConfig::default();
    config.execution.max_continue_iterations = 2;
    let mut pipeline = Coordinator::with_config(config);

    let source = pipeline.add_algorithm(TimeSource::new(vec![0.0, 1.0, 2.0, 3.0]));
    let sum = pipeline.add_algorithm(TemporalSum::new());
    link(&mut pipeline, source, sum);

    let report = pipeline.update(out(&pipeline, sum));
    assert_eq!(report.status, UpdateStatus::Failed);
    let record = &report.errors[0];
    assert_eq!(record.kind, ErrorKind::Internal);
    assert_eq!(record.pass, Pass::Execute);
    assert_eq!(record.algorithm, sum);
    assert_eq!(pipeline.execute_count(sum).unwrap(), 2);
}

#[test]
fn test_iteration_limit_stops_restless_source() {
    let mut config = PipelineConfig::default();
    config.execution.max_continue_iterations = 5;
    let mut pipeline = Coordinator::with_config(config);
    let id = pipeline.add_algorithm(Restless);

    let report = pipeline.update(out(&pipeline, id));
    assert_eq!(report.errors[0].kind, ErrorKind::Internal);
    assert_eq!(report.execute_count(id), 5);
}

#[test]
fn test_config_release_default() {
    let mut config = PipelineConfig::default();
    config.execution.default_release_data = true;
    let mut pipeline = Coordinator::with_config(config);
    assert!(pipeline.default_release_data_flag());

    let source = pipeline.add_algorithm(ConstantSource::new(vec![1.0]));
    let scale = pipeline.add_algorithm(Scale::default());
    link(&mut pipeline, source, scale);

    let report = pipeline.update(out(&pipeline, scale));
    assert!(report.is_success());
    assert!(pipeline.output_data(out(&pipeline, source)).is_none());
    assert!(pipeline.output_data(out(&pipeline, scale)).is_some());
}

#[test]
fn test_config_default_pieces() {
    let mut config = PipelineConfig::default();
    config.streaming.default_pieces = 3;
    let mut pipeline = Coordinator::with_config(config);
    let ramp = pipeline.add_algorithm(RampSource::new(Extent::new(0, 8, 0, 2, 0, 0)));

    let streamed = pipeline.update_streamed_default(out(&pipeline, ramp));
    assert!(streamed.report.is_success());
    assert_eq!(streamed.pieces.len(), 3);
    assert_eq!(pipeline.execute_count(ramp).unwrap(), 3);
}
