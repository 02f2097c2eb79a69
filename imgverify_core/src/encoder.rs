//! Encoding of the descriptor handed to every verifier.

use std::sync::Arc;

use crate::error::Result;
use crate::types::Descriptor;

/// Media type announcing the stdin payload format to verifiers.
///
/// Describes the wire format of stdin, not the image content type.
pub const STDIN_MEDIA_TYPE: &str = "application/vnd.oci.descriptor.v1+json";

/// Arguments and stdin payload shared by all verifiers of one call.
///
/// Built once per verification; cloning shares the underlying buffers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    args: Arc<[String]>,
    payload: Arc<[u8]>,
}

impl Invocation {
    /// Encodes `descriptor` for the image reference `name`.
    ///
    /// The payload is the descriptor's JSON encoding terminated by a newline.
    pub fn new(name: &str, descriptor: &Descriptor) -> Result<Self> {
        let mut payload = serde_json::to_vec(descriptor)?;
        payload.push(b'\n');

        let args = vec![
            "-name".to_string(),
            name.to_string(),
            "-digest".to_string(),
            descriptor.digest.clone(),
            "-stdin-media-type".to_string(),
            STDIN_MEDIA_TYPE.to_string(),
        ];

        Ok(Self {
            args: args.into(),
            payload: payload.into(),
        })
    }

    /// Command-line arguments passed to every verifier.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Bytes written to every verifier's stdin.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Shared handle to the payload, for writer tasks.
    pub fn shared_payload(&self) -> Arc<[u8]> {
        self.payload.clone()
    }
}
