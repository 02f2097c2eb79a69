//! imgverify runtime layer - Metrics around image verification.
//!
//! This crate wraps any [`ImageVerifier`] so that every call is counted and
//! timed:
//!
//! - [`MeteredVerifier`] records one [`MetricKind`] per call
//! - [`VerifierMetrics`] holds the shared counters and produces a
//!   serializable [`MetricsSummary`]

pub mod metrics;

use std::time::Instant;

use async_trait::async_trait;
use imgverify_core::{
    CancellationToken, Descriptor, ImageVerifier, Judgement, Result, VerifyError,
};

pub use metrics::{MetricKind, MetricsSummary, VerifierMetrics};

/// Image verifier that records metrics for an inner verifier.
///
/// # Examples
///
/// ```rust,no_run
/// use imgverify_core::{BinDirVerifier, CancellationToken, Config, Descriptor, ImageVerifier};
/// use imgverify_runtime::MeteredVerifier;
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let verifier = MeteredVerifier::new(BinDirVerifier::new(Config::default()));
///
/// verifier
///     .verify_image(&CancellationToken::new(), "registry.example.com/image:abc", &Descriptor::default())
///     .await?;
///
/// println!("{:?}", verifier.metrics().summary());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct MeteredVerifier<V> {
    inner: V,
    metrics: VerifierMetrics,
}

impl<V: ImageVerifier> MeteredVerifier<V> {
    /// Wraps `inner` with a fresh metrics collector.
    pub fn new(inner: V) -> Self {
        Self::with_metrics(inner, VerifierMetrics::new())
    }

    /// Wraps `inner`, recording into an existing collector.
    pub fn with_metrics(inner: V, metrics: VerifierMetrics) -> Self {
        Self { inner, metrics }
    }

    /// Returns the metrics collector.
    pub fn metrics(&self) -> &VerifierMetrics {
        &self.metrics
    }

    /// Returns the wrapped verifier.
    pub fn inner(&self) -> &V {
        &self.inner
    }
}

fn classify(result: &Result<Judgement>) -> MetricKind {
    match result {
        Ok(judgement) if judgement.ok => MetricKind::Accepted,
        Ok(_) => MetricKind::Rejected,
        Err(VerifyError::Cancelled) => MetricKind::Cancelled,
        Err(_) => MetricKind::Failed,
    }
}

#[async_trait]
impl<V: ImageVerifier> ImageVerifier for MeteredVerifier<V> {
    async fn verify_image(
        &self,
        cancel: &CancellationToken,
        name: &str,
        descriptor: &Descriptor,
    ) -> Result<Judgement> {
        let start = Instant::now();
        let result = self.inner.verify_image(cancel, name, descriptor).await;
        let elapsed = start.elapsed();

        let kind = classify(&result);
        self.metrics.record_timing(kind, elapsed);
        tracing::debug!(name = %name, outcome = ?kind, ?elapsed, "image verification recorded");

        result
    }
}
