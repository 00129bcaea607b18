//! Tests for engine configuration loading and validation.

use std::io::Write;

use super::*;
use crate::error::EngineError;

#[test]
fn test_default_config_validates() {
    let config = EngineConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.routing.lambda_val, 0.5);
    assert_eq!(config.segmenter.ppl_margin_threshold, 0.5);
    assert_eq!(config.cache.similarity_threshold, 0.95);
    assert_eq!(config.batch.max_batch_size, 32);
}

#[test]
fn test_partial_toml_uses_defaults() {
    let toml = r#"
[routing]
lambda_val = 0.8

[batch]
max_wait_ms = 7
"#;
    let config = EngineConfig::from_toml_str(toml).unwrap();
    assert_eq!(config.routing.lambda_val, 0.8);
    assert_eq!(config.routing.penalty_top_k, 3);
    assert_eq!(config.batch.max_wait_ms, 7);
    assert_eq!(config.batch.max_batch_size, 32);
    assert_eq!(config.segmenter, SegmenterConfig::default());
}

#[test]
fn test_toml_roundtrip_preserves_values() {
    let mut config = EngineConfig::default();
    config.cache.ttl_seconds = Some(600);
    config.request.output_separator = "\n".to_string();

    let text = config.to_toml_string().unwrap();
    let parsed = EngineConfig::from_toml_str(&text).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_from_file_reads_toml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[segmenter]\nppl_margin_threshold = 1.25").unwrap();

    let config = EngineConfig::from_file(file.path()).unwrap();
    assert_eq!(config.segmenter.ppl_margin_threshold, 1.25);
}

#[test]
fn test_from_file_missing_is_config_error() {
    let result = EngineConfig::from_file("/definitely/not/here/fusion.toml");
    assert!(matches!(result, Err(EngineError::ConfigError { .. })));
}

#[test]
fn test_invalid_toml_is_config_error() {
    let result = EngineConfig::from_toml_str("[routing\nlambda_val = ");
    assert!(matches!(result, Err(EngineError::ConfigError { .. })));
}

#[test]
fn test_validate_reports_section() {
    let mut config = EngineConfig::default();
    config.batch.max_batch_size = 0;

    match config.validate() {
        Err(EngineError::ConfigError { message }) => {
            assert!(message.starts_with("[batch]"), "got: {}", message);
            assert!(message.contains("max_batch_size"));
        }
        other => panic!("expected ConfigError, got {:?}", other),
    }
}

#[test]
fn test_cache_threshold_out_of_range_rejected() {
    let mut config = EngineConfig::default();
    config.cache.similarity_threshold = 1.5;
    assert!(config.validate().is_err());
}

#[test]
fn test_negative_margin_rejected() {
    let mut config = EngineConfig::default();
    config.segmenter.ppl_margin_threshold = -0.1;
    assert!(config.validate().is_err());
}

#[test]
fn test_lambda_nan_rejected_but_large_lambda_accepted() {
    let mut config = EngineConfig::default();
    config.routing.lambda_val = 3.0;
    assert!(config.validate().is_ok());

    config.routing.lambda_val = f64::NAN;
    assert!(config.validate().is_err());
}

#[test]
fn test_clamp_lambda_bounds() {
    assert_eq!(clamp_lambda(-1.0), 0.0);
    assert_eq!(clamp_lambda(0.3), 0.3);
    assert_eq!(clamp_lambda(1.0), LAMBDA_MAX);
    assert_eq!(clamp_lambda(42.0), LAMBDA_MAX);
    assert_eq!(clamp_lambda(f64::NAN), 0.0);
}

#[test]
fn test_request_defaults_follow_engine_config() {
    let mut config = EngineConfig::default();
    config.routing.lambda_val = 5.0;
    config.batch.max_wait_ms = 3;

    let request = config.request_defaults();
    assert_eq!(request.lambda_val, LAMBDA_MAX);
    assert_eq!(request.batch_max_wait_ms, 3);
    assert_eq!(request.timeout_ms, config.request.timeout_ms);
}

#[test]
fn test_request_normalized_clamps_lambda() {
    let request = FusionRequestConfig::default().with_lambda(1.7).normalized().unwrap();
    assert_eq!(request.lambda_val, LAMBDA_MAX);

    let request = FusionRequestConfig::default().with_lambda(-2.0).normalized().unwrap();
    assert_eq!(request.lambda_val, 0.0);
}

#[test]
fn test_request_normalized_rejects_invalid() {
    assert!(FusionRequestConfig::default()
        .with_lambda(f64::NAN)
        .normalized()
        .is_err());
    assert!(FusionRequestConfig::default()
        .with_batch_max_size(0)
        .normalized()
        .is_err());
    assert!(FusionRequestConfig::default()
        .with_cache_similarity_threshold(-0.1)
        .normalized()
        .is_err());
    assert!(FusionRequestConfig::default()
        .with_timeout_ms(0)
        .normalized()
        .is_err());
}

#[test]
fn test_output_digest_ignores_batching_knobs() {
    let base = FusionRequestConfig::default();
    let batched = base.clone().with_batch_max_size(2).with_batch_max_wait_ms(1);
    let sparser = base.clone().with_lambda(0.9);

    assert_eq!(base.output_digest(), batched.output_digest());
    assert_ne!(base.output_digest(), sparser.output_digest());
}
