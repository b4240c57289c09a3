//! Errors that escape the report pipeline.
//!
//! Recoverable failures (narrative service outages, individual check
//! violations) are handled inside the pipeline and never show up here.
//! Only bad input, an exhausted validation budget and genuinely
//! unexpected failures reach the caller.

use reqwest::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

use crate::validation::ValidationReport;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or out-of-range request fields.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The validation loop spent its budget without a full pass.
    #[error("Validation exhausted after {} iterations: {}", .report.iterations, .failures.join("; "))]
    ValidationExhausted {
        failures: Vec<String>,
        report: Box<ValidationReport>,
    },

    #[error("Unexpected error: {0:#}")]
    Unexpected(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ServiceError::InvalidInput(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::ValidationExhausted { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body a transport layer can return verbatim.
    pub fn to_body(&self) -> Value {
        match self {
            ServiceError::InvalidInput(message) => json!({
                "error": "invalid_input",
                "message": message,
            }),
            ServiceError::ValidationExhausted { failures, report } => json!({
                "error": "validation_exhausted",
                "message": "Report could not be brought into a consistent state",
                "failures": failures,
                "iterations": report.iterations,
                "adjustments": report.adjustments,
            }),
            // Internal detail stays in the logs.
            ServiceError::Unexpected(_) => json!({
                "error": "internal_error",
                "message": "Unexpected failure while generating the report",
            }),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
