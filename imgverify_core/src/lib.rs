//! imgverify - Image admission through executable verification policies
//!
//! This crate decides whether a container image may be pulled or run by
//! consulting a directory of independent verifier executables.
//!
//! # Overview
//!
//! Every call to [`ImageVerifier::verify_image`]:
//!
//! - lists the verifier directory and orders its entries by name
//!   ([`resolver`]);
//! - encodes the image descriptor once ([`encoder`]);
//! - runs each verifier as a subprocess with its own deadline, feeding the
//!   descriptor on stdin ([`invoker`]);
//! - stops at the first rejection or failure, or joins every accept reason
//!   in name order ([`orchestrator`], [`judgement`]).
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use imgverify_core::{BinDirVerifier, CancellationToken, Config, Descriptor, ImageVerifier};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new("/opt/imgverify/bin")
//!         .with_max_verifiers(-1)
//!         .with_per_verifier_timeout(Duration::from_secs(5));
//!     let verifier = BinDirVerifier::new(config);
//!
//!     let judgement = verifier
//!         .verify_image(
//!             &CancellationToken::new(),
//!             "registry.example.com/image:abc",
//!             &Descriptor::new("application/vnd.oci.image.index.v1+json", "sha256:...", 2048),
//!         )
//!         .await?;
//!
//!     if !judgement.ok {
//!         eprintln!("pull blocked: {}", judgement.reason);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`types`]: Descriptor and verifier unit
//! - [`error`]: Error types for all operations
//! - [`config`]: Verifier configuration
//! - [`cancellation`]: Cancellation tokens
//! - [`pool`]: Concurrency limit
//! - [`resolver`]: Verifier discovery
//! - [`encoder`]: Arguments and stdin payload
//! - [`invoker`]: Verifier capability and process adapter
//! - [`judgement`]: Verdict types
//! - [`orchestrator`]: Fail-fast aggregation

pub mod error;
pub mod types;
pub mod config;

pub mod cancellation;
pub mod pool;

pub mod resolver;
pub mod encoder;
pub mod invoker;
pub mod judgement;
pub mod orchestrator;

// Re-export commonly used types
pub use cancellation::{CancellationToken, CancellationTokenSource, ChildToken};
pub use config::Config;
pub use encoder::{Invocation, STDIN_MEDIA_TYPE};
pub use error::{ConfigError, InfraFailure, Result, VerifyError};
pub use invoker::{ProcessVerifier, Verifier, OUTPUT_LIMIT_BYTES};
pub use judgement::{Judgement, UnitOutcome};
pub use orchestrator::{run_verifiers, BinDirVerifier, ImageVerifier};
pub use types::{Descriptor, VerifierUnit};
