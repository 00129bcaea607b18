//! CLI exit code handling.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Runtime failure (timeouts, backend or oracle errors)
//! - 2: Invalid input (bad configuration, unknown experts, malformed matrices)

use std::process::ExitCode;

use lora_fusion_core::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CliExitCode {
    Success = 0,
    Failure = 1,
    InvalidInput = 2,
}

impl From<CliExitCode> for ExitCode {
    fn from(code: CliExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<CliExitCode> for i32 {
    fn from(code: CliExitCode) -> Self {
        code as i32
    }
}

impl From<&EngineError> for CliExitCode {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::ConfigError { .. }
            | EngineError::InvalidPerformanceMatrix { .. }
            | EngineError::ExpertNotFound { .. }
            | EngineError::ExpertAlreadyRegistered { .. } => CliExitCode::InvalidInput,
            EngineError::SegmentationError {
                unit_index: None, ..
            } => CliExitCode::InvalidInput,
            _ => CliExitCode::Failure,
        }
    }
}

/// Exit code for any command error.
///
/// Engine errors anywhere in the chain are classified by variant; anything
/// else (argument parsing, stdin) counts as invalid input.
pub fn exit_code_for_error(e: &anyhow::Error) -> CliExitCode {
    match e.chain().find_map(|cause| cause.downcast_ref::<EngineError>()) {
        Some(engine_err) => CliExitCode::from(engine_err),
        None => CliExitCode::InvalidInput,
    }
}
