//! Core types for imgverify.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Content descriptor of the image being verified.
///
/// Mirrors the OCI descriptor schema for the fields verifiers receive.
/// Field order matches the canonical encoding: `mediaType`, `digest`,
/// `size`, `annotations`. Annotations are kept in a sorted map so the
/// encoding is stable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Media type of the referenced content
    #[serde(rename = "mediaType")]
    pub media_type: String,
    /// Content digest, e.g. `sha256:...`
    pub digest: String,
    /// Size of the referenced content in bytes
    pub size: i64,
    /// Arbitrary metadata
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Descriptor {
    /// Creates a descriptor without annotations.
    pub fn new(media_type: impl Into<String>, digest: impl Into<String>, size: i64) -> Self {
        Self {
            media_type: media_type.into(),
            digest: digest.into(),
            size,
            annotations: BTreeMap::new(),
        }
    }

    /// Adds an annotation.
    pub fn annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }
}

/// One executable found in the verifier directory.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct VerifierUnit {
    /// File name, used for ordering and for labelling output
    pub name: String,
    /// Full path to the executable
    pub path: PathBuf,
}

impl VerifierUnit {
    /// Creates a unit for `name` inside `dir`.
    pub fn new(dir: &Path, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: dir.join(&name),
            name,
        }
    }
}

impl std::fmt::Display for VerifierUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
