//! Error types for the graspflow pipeline.
//!
//! Every failure a state can report maps onto one [`GraspflowError`] variant.
//! The engine never recovers from these; it routes them to the `Failed`
//! terminal outcome and records the message in the context.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Convenience result alias used across the crate.
pub type Result<T, E = GraspflowError> = std::result::Result<T, E>;

/// The main error type for pipeline operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraspflowError {
    /// The service never became reachable within the configured timeout.
    #[error("Service '{service}' not available after {timeout_seconds:.1}s")]
    ServiceUnavailable {
        /// Service name.
        service: String,
        /// The availability timeout that elapsed.
        timeout_seconds: f64,
    },

    /// The call was issued but the transport or serialization layer failed.
    #[error("Service call to '{service}' failed: {cause}")]
    ServiceCallError {
        /// Service name.
        service: String,
        /// Rendered cause chain from the transport.
        cause: String,
    },

    /// A response payload could not be decoded.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A state input the caller must seed is absent.
    #[error("Missing input '{0}'")]
    MissingInput(String),

    /// A decoded payload lacks a required field.
    #[error("Missing field '{0}' in response")]
    MissingField(String),

    /// An instance grid was not a rectangular integer grid.
    #[error("Invalid instance grid: {0}")]
    InvalidGrid(String),

    /// The segmentation service reported failure.
    #[error("Segmentation failed: {0}")]
    SegmentationFailure(String),

    /// The grasp-sampling service reported failure or returned nothing.
    #[error("Grasp sampling failed: {0}")]
    GraspSamplingFailure(String),

    /// The motion service reported a fatal failure or candidates ran out.
    #[error("Motion failed: {0}")]
    MotionFailure(String),

    /// Selection found no instances to choose from.
    #[error("No candidate instances to select from")]
    NoCandidateInstances,

    /// The selection strategy returned an id outside the instance list.
    #[error("Selected instance {selected} is not one of {available:?}")]
    InvalidSelection {
        /// The id returned by the selector.
        selected: i32,
        /// The ids that were available.
        available: Vec<i32>,
    },

    /// A state reads a context field that no earlier state produces.
    #[error("Contract violation: state '{state}' reads '{field}' before any state writes it")]
    ContractViolation {
        /// The consuming state.
        state: String,
        /// The unproduced field.
        field: String,
    },
}

impl GraspflowError {
    /// Creates a service unavailable error.
    #[must_use]
    pub fn unavailable(service: impl Into<String>, timeout_seconds: f64) -> Self {
        Self::ServiceUnavailable {
            service: service.into(),
            timeout_seconds,
        }
    }

    /// Creates a service call error from any displayable cause.
    #[must_use]
    pub fn call_failed(service: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::ServiceCallError {
            service: service.into(),
            cause: cause.to_string(),
        }
    }

    /// Returns a stable machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ServiceUnavailable { .. } => "SERVICE-UNAVAILABLE",
            Self::ServiceCallError { .. } => "SERVICE-CALL-ERROR",
            Self::ParseError(_) => "PARSE-ERROR",
            Self::MissingInput(_) => "MISSING-INPUT",
            Self::MissingField(_) => "MISSING-FIELD",
            Self::InvalidGrid(_) => "INVALID-GRID",
            Self::SegmentationFailure(_) => "SEGMENTATION-FAILURE",
            Self::GraspSamplingFailure(_) => "GRASP-SAMPLING-FAILURE",
            Self::MotionFailure(_) => "MOTION-FAILURE",
            Self::NoCandidateInstances => "NO-CANDIDATE-INSTANCES",
            Self::InvalidSelection { .. } => "INVALID-SELECTION",
            Self::ContractViolation { .. } => "CONTRACT-VIOLATION",
        }
    }

    /// Returns true if the error came from reaching or calling a service.
    #[must_use]
    pub fn is_service_error(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable { .. } | Self::ServiceCallError { .. }
        )
    }

    /// The text recorded as the run's diagnostic message.
    ///
    /// Failures reported by a service carry the service's own text, so that is
    /// returned unprefixed. Everything else uses the full display form.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        match self {
            Self::SegmentationFailure(message)
            | Self::GraspSamplingFailure(message)
            | Self::MotionFailure(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));

        match self {
            Self::ServiceUnavailable {
                service,
                timeout_seconds,
            } => {
                map.insert("service".to_string(), serde_json::json!(service));
                map.insert(
                    "timeout_seconds".to_string(),
                    serde_json::json!(timeout_seconds),
                );
            }
            Self::ServiceCallError { service, cause } => {
                map.insert("service".to_string(), serde_json::json!(service));
                map.insert("cause".to_string(), serde_json::json!(cause));
            }
            Self::MissingField(field) | Self::MissingInput(field) => {
                map.insert("field".to_string(), serde_json::json!(field));
            }
            Self::InvalidSelection {
                selected,
                available,
            } => {
                map.insert("selected".to_string(), serde_json::json!(selected));
                map.insert("available".to_string(), serde_json::json!(available));
            }
            Self::ContractViolation { state, field } => {
                map.insert("state".to_string(), serde_json::json!(state));
                map.insert("field".to_string(), serde_json::json!(field));
            }
            _ => {}
        }

        map
    }
}

/// Errors raised while loading or validating a [`crate::config::PipelineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration document could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A configuration value is out of range or malformed.
    #[error("Invalid configuration field '{field}': {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid-field error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while assembling a [`crate::pipeline::Pipeline`].
#[derive(Debug, Error)]
pub enum BuildError {
    /// The configuration did not validate.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No client was supplied for a required service.
    #[error("No client configured for the {0} service")]
    MissingClient(&'static str),

    /// The state sequence reads a field before it is written.
    #[error(transparent)]
    Contract(#[from] GraspflowError),
}

/// A serializable record of a terminal failure, kept in run reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureInfo {
    /// Stable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Name of the state that reported the failure.
    pub state: String,
}

impl FailureInfo {
    /// Captures an error reported by a state.
    #[must_use]
    pub fn new(state: impl Into<String>, error: &GraspflowError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
            state: state.into(),
        }
    }
}
