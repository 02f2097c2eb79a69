//! Verdict types and the rules for combining per-verifier reasons.

use serde::{Deserialize, Serialize};

use crate::error::InfraFailure;

/// Aggregated verdict on an image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgement {
    /// True if the image may be used
    pub ok: bool,
    /// Human-readable rationale
    pub reason: String,
}

impl Judgement {
    /// An accepting judgement.
    pub fn accept(reason: impl Into<String>) -> Self {
        Self {
            ok: true,
            reason: reason.into(),
        }
    }

    /// The judgement for a verifier that rejected the image.
    pub fn rejected_by(verifier: &str, exit_code: i32, reason: &str) -> Self {
        Self {
            ok: false,
            reason: format!(
                "verifier {} rejected image (exit code {}): {}",
                verifier, exit_code, reason
            ),
        }
    }

    /// Joins accept reasons, given in resolution order, into one judgement.
    pub fn from_accepts<'a, I>(accepts: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let reason = accepts
            .into_iter()
            .map(|(verifier, reason)| format!("{} => {}", verifier, reason))
            .collect::<Vec<_>>()
            .join(", ");
        Self::accept(reason)
    }
}

/// Classified result of one verifier.
#[derive(Debug)]
pub enum UnitOutcome {
    /// Exit code zero.
    Accepted {
        /// Trimmed stdout
        reason: String,
    },
    /// Non-zero exit code.
    Rejected {
        /// Exit code, -1 when killed by a signal
        exit_code: i32,
        /// Trimmed stdout
        reason: String,
    },
    /// The verifier could not deliver a decision.
    InfraFailure(InfraFailure),
}

impl UnitOutcome {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            UnitOutcome::Accepted { .. } => "accepted",
            UnitOutcome::Rejected { .. } => "rejected",
            UnitOutcome::InfraFailure(_) => "infra_failure",
        }
    }
}
