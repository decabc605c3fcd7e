//! Manifest and config-blob data model.
//!
//! The registry serves several document shapes from the same manifests
//! endpoint: OCI and Docker v2 single-platform manifests, multi-platform
//! indices/lists, and legacy schema-1 manifests with embedded compatibility
//! blobs. One permissive type covers all of them, so date resolution can read
//! whichever signal is present without committing to a schema up front.

use crate::error::{Result, SweepError};
use serde::Deserialize;


/// OCI image manifest media type.
pub const MEDIA_TYPE_OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";

/// Docker schema 2 image manifest media type.
pub const MEDIA_TYPE_DOCKER_MANIFEST_V2: &str =
    "application/vnd.docker.distribution.manifest.v2+json";

/// Docker schema 1 (legacy) image manifest media type.
pub const MEDIA_TYPE_DOCKER_MANIFEST_V1: &str =
    "application/vnd.docker.distribution.manifest.v1+json";

/// OCI image index media type.
pub const MEDIA_TYPE_OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";

/// Docker manifest list (multi-platform) media type.
pub const MEDIA_TYPE_DOCKER_MANIFEST_LIST: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";

/// Accept values tried when negotiating a manifest, in order.
///
/// The order is fixed: OCI first, then Docker v2, then the legacy schema 1
/// type as a last resort. Negotiation stops at the first 200 response.
pub const MANIFEST_ACCEPT_TYPES: [&str; 3] = [
    MEDIA_TYPE_OCI_MANIFEST,
    MEDIA_TYPE_DOCKER_MANIFEST_V2,
    MEDIA_TYPE_DOCKER_MANIFEST_V1,
];

/// A reference to a blob or manifest by digest, as embedded in a manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    pub digest: String,
    #[serde(default)]
    pub platform: Option<Platform>,
}

/// Platform fields carried by index entries.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
}

/// A legacy schema-1 history entry with its embedded compatibility document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatHistoryEntry {
    #[serde(default)]
    pub v1_compatibility: Option<String>,
}

/// A manifest as returned by `GET /v2/{repo}/manifests/{ref}`.
///
/// Exactly one of the two shapes is populated in practice: `config`/`layers`
/// for a single-platform manifest, `manifests` for an index. Legacy schema-1
/// documents populate `history` instead of `config`. All fields are optional
/// so a partial or unusual document still deserializes.
///
/// # Examples
///
/// ```
/// use libsweep::manifest::Manifest;
///
/// let body = br#"{"schemaVersion": 2, "mediaType": "application/vnd.oci.image.manifest.v1+json"}"#;
/// let manifest = Manifest::from_bytes(body).unwrap();
/// assert!(!manifest.is_index());
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub config: Option<Descriptor>,
    #[serde(default)]
    pub layers: Option<Vec<Descriptor>>,
    #[serde(default)]
    pub manifests: Option<Vec<Descriptor>>,
    #[serde(default)]
    pub history: Option<Vec<CompatHistoryEntry>>,
}

impl Manifest {
    /// Parse manifest bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| SweepError::validation_with_source("Failed to parse manifest JSON", e))
    }

    /// Returns true if this manifest is a multi-platform index or list.
    ///
    /// Discrimination is by media type alone: a document without a
    /// `mediaType` field is treated as a single-platform manifest.
    pub fn is_index(&self) -> bool {
        matches!(
            self.media_type.as_deref(),
            Some(MEDIA_TYPE_OCI_INDEX) | Some(MEDIA_TYPE_DOCKER_MANIFEST_LIST)
        )
    }

    /// Returns the first index entry, in the order given by the registry.
    pub fn first_entry(&self) -> Option<&Descriptor> {
        self.manifests.as_ref().and_then(|m| m.first())
    }

    /// Returns the digest of the config blob, if the manifest carries one.
    pub fn config_digest(&self) -> Option<&str> {
        self.config.as_ref().map(|c| c.digest.as_str())
    }
}

/// A config-blob history entry.
#[derive(Debug, Clone, Deserialize)]
pub struct BlobHistoryEntry {
    #[serde(default)]
    pub created: Option<String>,
}

/// An image config blob, reachable through a manifest's `config` digest.
///
/// Only the timestamp-bearing fields are modeled. Everything else in the
/// blob (architecture, rootfs, build args) is irrelevant here and ignored,
/// so a blob missing those fields still yields a date.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigBlob {
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub history: Option<Vec<BlobHistoryEntry>>,
}

impl ConfigBlob {
    /// Parse config-blob bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| SweepError::validation_with_source("Failed to parse config blob JSON", e))
    }
}
