//! Application-level error: a message plus the process exit code.
//!
//! Module errors (`DataError`, `ReferenceError`, `EstimateError`) convert into
//! this type at the boundary; `main` prints the message and exits with the code.

use std::fmt::Display;

use thiserror::Error;

/// Process exit codes.
pub mod exit {
    /// One or more comparison cases failed.
    pub const CASES_FAILED: u8 = 1;
    /// Input, configuration, IO or parse problems.
    pub const INPUT: u8 = 2;
    /// Dataset contents are invalid.
    pub const DATA: u8 = 3;
    pub const ESTIMATION: u8 = 4;
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Prefix the message with where the error happened, keeping the code.
    pub fn context(self, location: impl Display) -> Self {
        Self {
            exit_code: self.exit_code,
            message: format!("{location}: {}", self.message),
        }
    }
}
