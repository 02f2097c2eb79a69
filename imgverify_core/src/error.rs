//! Error types for imgverify.

use std::path::PathBuf;
use std::time::Duration;

/// Main error type for image verification.
///
/// A policy rejection is never an error: it surfaces as a
/// [`Judgement`](crate::Judgement) with `ok == false`. Everything here means
/// the verification machinery itself could not produce a verdict.
#[derive(thiserror::Error, Debug)]
pub enum VerifyError {
    /// The verifier directory exists but could not be listed.
    #[error("failed to list verifier directory {path:?}: {source}")]
    ListDirectory {
        /// Directory that was being listed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A single verifier failed for reasons other than a policy decision.
    #[error("failed to call image verifier {verifier}: {cause}")]
    Verifier {
        /// Name of the failing verifier
        verifier: String,
        /// What went wrong
        #[source]
        cause: InfraFailure,
    },

    /// The caller cancelled the verification before a verdict was reached.
    #[error("image verification cancelled")]
    Cancelled,

    /// A verifier task panicked or was aborted unexpectedly.
    #[error("verifier task failed: {0}")]
    Task(String),

    /// The descriptor could not be encoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Infrastructure failure of one verifier invocation.
#[derive(thiserror::Error, Debug)]
pub enum InfraFailure {
    /// The executable could not be started.
    #[error("failed to start: {0}")]
    Launch(#[source] std::io::Error),

    /// The verifier exceeded its time budget and was killed.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Waiting for the verifier process failed.
    #[error("failed to wait for process: {0}")]
    Wait(#[source] std::io::Error),

    /// The invocation was cancelled by a sibling failure or by the caller.
    #[error("cancelled")]
    Cancelled,
}

/// Configuration loading and validation errors.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A field holds a value that cannot be used.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Type alias for Result with VerifyError.
pub type Result<T> = std::result::Result<T, VerifyError>;
