//! Verifier capability and its subprocess adapter.
//!
//! [`Verifier`] is the single capability the orchestrator depends on: given
//! the shared [`Invocation`], produce a [`UnitOutcome`]. [`ProcessVerifier`]
//! implements it for an executable in the verifier directory and is the only
//! place that knows about processes, pipes, exit codes and deadlines.
//!
//! # Process contract
//!
//! - arguments: `-name <ref> -digest <digest> -stdin-media-type <type>`
//! - stdin: the descriptor JSON; the verifier may ignore it
//! - exit 0 accepts, anything else rejects
//! - stdout (trimmed, at most [`OUTPUT_LIMIT_BYTES`]) is the reason
//! - stderr is logged at debug level and never reaches the verdict
//!
//! Children are spawned with kill-on-drop, so dropping a running
//! [`Verifier::verify`] future terminates the process.

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::encoder::Invocation;
use crate::error::InfraFailure;
use crate::judgement::UnitOutcome;
use crate::types::VerifierUnit;

/// Ceiling on captured stdout and stderr, per stream.
pub const OUTPUT_LIMIT_BYTES: usize = 1 << 15;

/// Spawn attempts made while the executable is busy being written.
const SPAWN_BUSY_RETRIES: u32 = 5;

/// A single verification policy.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Name used to label this verifier's output.
    fn name(&self) -> &str;

    /// Decides on the image described by `invocation`.
    async fn verify(&self, invocation: &Invocation) -> UnitOutcome;
}

/// Verifier backed by an executable file.
#[derive(Clone, Debug)]
pub struct ProcessVerifier {
    unit: VerifierUnit,
    timeout: Duration,
}

impl ProcessVerifier {
    /// Creates a verifier for `unit` with a time budget of `timeout`.
    pub fn new(unit: VerifierUnit, timeout: Duration) -> Self {
        Self { unit, timeout }
    }
}

#[async_trait]
impl Verifier for ProcessVerifier {
    fn name(&self) -> &str {
        &self.unit.name
    }

    async fn verify(&self, invocation: &Invocation) -> UnitOutcome {
        let deadline = Instant::now() + self.timeout;

        let mut child = match tokio::time::timeout_at(
            deadline,
            spawn(&self.unit.path, invocation.args()),
        )
        .await
        {
            Ok(Ok(child)) => child,
            Ok(Err(e)) => return UnitOutcome::InfraFailure(InfraFailure::Launch(e)),
            Err(_) => return UnitOutcome::InfraFailure(InfraFailure::Timeout(self.timeout)),
        };

        let _writer = child.stdin.take().map(|stdin| {
            PayloadWriter::start(self.unit.name.clone(), stdin, invocation.shared_payload())
        });
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let run = async {
            let (stdout, stderr, status) = tokio::join!(
                read_bounded(stdout),
                read_bounded(stderr),
                child.wait()
            );
            (stdout, stderr, status)
        };

        let (stdout, stderr, status) = match tokio::time::timeout_at(deadline, run).await {
            Ok(result) => result,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(verifier = %self.unit.name, error = %e, "failed to kill timed out verifier");
                }
                return UnitOutcome::InfraFailure(InfraFailure::Timeout(self.timeout));
            }
        };

        for line in String::from_utf8_lossy(&stderr).lines() {
            tracing::debug!(verifier = %self.unit.name, "{}", line);
        }

        let status = match status {
            Ok(status) => status,
            Err(e) => return UnitOutcome::InfraFailure(InfraFailure::Wait(e)),
        };

        let reason = bounded_text(&stdout);
        match status.code() {
            Some(0) => UnitOutcome::Accepted { reason },
            Some(exit_code) => UnitOutcome::Rejected { exit_code, reason },
            // Terminated by a signal.
            None => UnitOutcome::Rejected {
                exit_code: -1,
                reason,
            },
        }
    }
}

async fn spawn(path: &Path, args: &[String]) -> io::Result<Child> {
    let mut attempt = 0;
    loop {
        let mut cmd = Command::new(path);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match cmd.spawn() {
            // Another thread may still hold the freshly written executable
            // open across its own fork.
            Err(e) if e.kind() == io::ErrorKind::ExecutableFileBusy && attempt < SPAWN_BUSY_RETRIES => {
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(10 * u64::from(attempt))).await;
            }
            result => return result,
        }
    }
}

/// Best-effort stdin writer running in its own task.
///
/// Write failures are logged, never propagated: a verifier may decide
/// from its arguments alone and exit without reading stdin. The task is
/// aborted when the guard is dropped.
struct PayloadWriter(JoinHandle<()>);

impl PayloadWriter {
    fn start(verifier: String, mut stdin: ChildStdin, payload: Arc<[u8]>) -> Self {
        Self(tokio::spawn(async move {
            if let Err(e) = stdin.write_all(&payload).await {
                tracing::warn!(
                    verifier = %verifier,
                    error = %e,
                    "failed to completely write descriptor to stdin"
                );
            }
            // Dropping stdin closes the pipe.
        }))
    }
}

impl Drop for PayloadWriter {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Reads up to [`OUTPUT_LIMIT_BYTES`], then drains and discards the rest so
/// the child never blocks on a full pipe.
async fn read_bounded<R>(reader: Option<R>) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Vec::new();
    };

    let mut buf = Vec::new();
    if let Err(e) = (&mut reader)
        .take(OUTPUT_LIMIT_BYTES as u64)
        .read_to_end(&mut buf)
        .await
    {
        tracing::debug!(error = %e, "failed to read verifier output");
        return buf;
    }
    if let Err(e) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
        tracing::debug!(error = %e, "failed to drain verifier output");
    }
    buf
}

/// Decodes captured output, bounds it to [`OUTPUT_LIMIT_BYTES`] and trims
/// trailing whitespace.
fn bounded_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let mut end = text.len().min(OUTPUT_LIMIT_BYTES);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].trim_end().to_string()
}
