//! Verification of an image against every resolved verifier.
//!
//! The orchestrator starts verifiers in resolution order under a concurrency
//! limit and processes their outcomes as they complete:
//!
//! - the first rejection cancels every other verifier and becomes the verdict;
//! - the first infrastructure failure cancels every other verifier and is
//!   returned as an error;
//! - when all verifiers accept, their reasons are joined in resolution order,
//!   whatever order they finished in.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::Instrument;

use crate::cancellation::{CancellationToken, ChildToken};
use crate::config::Config;
use crate::encoder::Invocation;
use crate::error::{InfraFailure, Result, VerifyError};
use crate::invoker::{ProcessVerifier, Verifier};
use crate::judgement::{Judgement, UnitOutcome};
use crate::pool::{UnitPermit, UnitPool};
use crate::resolver::{resolve_units, Resolution};
use crate::types::Descriptor;

/// Whole-image verification capability.
#[async_trait]
pub trait ImageVerifier: Send + Sync {
    /// Decides whether the image `name` described by `descriptor` may be used.
    ///
    /// # Errors
    ///
    /// Returns an error, and no judgement, when a verifier could not be
    /// launched, timed out, or when `cancel` fired before a verdict.
    async fn verify_image(
        &self,
        cancel: &CancellationToken,
        name: &str,
        descriptor: &Descriptor,
    ) -> Result<Judgement>;
}

/// Verifies images with the executables found in a directory.
///
/// # Example
///
/// ```no_run
/// use imgverify_core::{BinDirVerifier, CancellationToken, Config, Descriptor, ImageVerifier};
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let verifier = BinDirVerifier::new(Config::new("/opt/imgverify/bin"));
/// let descriptor = Descriptor::new(
///     "application/vnd.oci.image.index.v1+json",
///     "sha256:98ea6e4f216f2fb4b69fff9b3a44842c38686ca685f3f55dc48c5d3fb1107be4",
///     2048,
/// );
///
/// let judgement = verifier
///     .verify_image(&CancellationToken::new(), "registry.example.com/image:abc", &descriptor)
///     .await?;
/// println!("ok={} reason={}", judgement.ok, judgement.reason);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct BinDirVerifier {
    config: Config,
}

impl BinDirVerifier {
    /// Creates a verifier from `config`.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn verify(
        &self,
        cancel: &CancellationToken,
        name: &str,
        descriptor: &Descriptor,
    ) -> Result<Judgement> {
        let resolution = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::warn!("image verification cancelled by caller");
                return Err(VerifyError::Cancelled);
            }
            resolution = resolve_units(&self.config.bin_dir, self.config.max_verifiers) => resolution?,
        };

        let units = match resolution {
            Resolution::Units(units) => units,
            idle => {
                let reason = idle.idle_reason().unwrap_or_default();
                tracing::info!(reason = %reason, "no image verifiers run");
                return Ok(Judgement::accept(reason));
            }
        };

        let invocation = Invocation::new(name, descriptor)?;
        let pool = UnitPool::for_units(self.config.max_verifiers, units.len());
        let verifiers = units
            .into_iter()
            .map(|unit| {
                Arc::new(ProcessVerifier::new(unit, self.config.per_verifier_timeout))
                    as Arc<dyn Verifier>
            })
            .collect();

        run_verifiers(verifiers, invocation, pool, cancel).await
    }
}

#[async_trait]
impl ImageVerifier for BinDirVerifier {
    async fn verify_image(
        &self,
        cancel: &CancellationToken,
        name: &str,
        descriptor: &Descriptor,
    ) -> Result<Judgement> {
        let span = tracing::info_span!("verify_image", name = %name, digest = %descriptor.digest);
        self.verify(cancel, name, descriptor).instrument(span).await
    }
}

type UnitReport = (usize, UnitOutcome, Duration);

/// Runs `verifiers`, given in resolution order, and aggregates their outcomes.
///
/// Verifiers are started in order whenever `pool` has a free slot. The
/// first rejection or infrastructure failure stops every outstanding
/// verifier before this function returns.
pub async fn run_verifiers(
    verifiers: Vec<Arc<dyn Verifier>>,
    invocation: Invocation,
    pool: UnitPool,
    cancel: &CancellationToken,
) -> Result<Judgement> {
    let names: Vec<String> = verifiers.iter().map(|v| v.name().to_string()).collect();
    let mut slots: Vec<Option<String>> = vec![None; verifiers.len()];
    let mut pending = verifiers.into_iter().enumerate();
    let mut next = pending.next();

    // Slots stay held until the outcome is processed, so a freed slot never
    // lets the next unit start ahead of a pending rejection.
    let mut held: Vec<Option<UnitPermit>> = (0..names.len()).map(|_| None).collect();

    let calls = cancel.child_token();
    let mut tasks: JoinSet<UnitReport> = JoinSet::new();

    while next.is_some() || !tasks.is_empty() {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                halt(&calls, &pool, &mut tasks).await;
                tracing::warn!("image verification cancelled by caller");
                return Err(VerifyError::Cancelled);
            }

            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                let (index, outcome, runtime) = match joined {
                    Ok(report) => report,
                    Err(e) => {
                        halt(&calls, &pool, &mut tasks).await;
                        return Err(VerifyError::Task(e.to_string()));
                    }
                };
                held[index] = None;
                let verifier = &names[index];
                tracing::debug!(verifier = %verifier, outcome = outcome.kind(), "image verifier finished");

                match outcome {
                    UnitOutcome::Accepted { reason } => {
                        tracing::info!(verifier = %verifier, ?runtime, "image verifier allowed pull");
                        slots[index] = Some(reason);
                    }
                    UnitOutcome::Rejected { exit_code, reason } => {
                        halt(&calls, &pool, &mut tasks).await;
                        tracing::warn!(
                            verifier = %verifier,
                            ?runtime,
                            exit_code,
                            reason = %reason,
                            "image verifier blocked pull"
                        );
                        return Ok(Judgement::rejected_by(verifier, exit_code, &reason));
                    }
                    UnitOutcome::InfraFailure(cause) => {
                        halt(&calls, &pool, &mut tasks).await;
                        tracing::error!(
                            verifier = %verifier,
                            ?runtime,
                            error = %cause,
                            "failed to call image verifier"
                        );
                        return Err(VerifyError::Verifier {
                            verifier: verifier.clone(),
                            cause,
                        });
                    }
                }
            }

            permit = pool.acquire(), if next.is_some() => {
                let (Some(permit), Some((index, verifier))) = (permit, next.take()) else {
                    return Err(VerifyError::Task("verifier pool closed".to_string()));
                };
                next = pending.next();
                held[index] = Some(permit);

                let invocation = invocation.clone();
                let calls = calls.clone();
                tasks.spawn(async move {
                    let start = Instant::now();
                    let outcome = tokio::select! {
                        _ = calls.cancelled() => UnitOutcome::InfraFailure(InfraFailure::Cancelled),
                        outcome = verifier.verify(&invocation) => outcome,
                    };
                    (index, outcome, start.elapsed())
                });
            }
        }
    }

    Ok(Judgement::from_accepts(
        names
            .iter()
            .zip(&slots)
            .map(|(name, reason)| (name.as_str(), reason.as_deref().unwrap_or_default())),
    ))
}

/// Broadcasts cancellation and waits until every task is gone.
///
/// Aborted tasks drop their child processes, which kills them.
async fn halt(calls: &ChildToken, pool: &UnitPool, tasks: &mut JoinSet<UnitReport>) {
    calls.cancel();
    pool.close();
    tasks.shutdown().await;
}
