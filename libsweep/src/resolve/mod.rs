//! Tag resolution: content negotiation, index flattening, and the
//! creation-date fallback chain.
//!
//! Resolving a tag answers two questions: which digest does this tag point
//! at right now, and when was that image created. The digest comes from the
//! manifest response headers. The creation date has no single authoritative
//! source across manifest generations, so it is recovered through an ordered
//! chain of fallbacks spanning the config blob, the HTTP response headers,
//! and legacy v1 compatibility data.

use crate::client::{Client, ManifestResponse};
use crate::digest::Digest;
use crate::error::{Result, SweepError};
use crate::manifest::{ConfigBlob, MANIFEST_ACCEPT_TYPES, MEDIA_TYPE_OCI_MANIFEST, Manifest};
use chrono::NaiveDateTime;
use std::fmt;

#[cfg(test)]
mod tests;

/// The normalized outcome of resolving a tag.
///
/// Either field may be absent: registries can answer without a
/// `Docker-Content-Digest` header, and the date chain can come up empty.
/// Absence is represented as `None`, never as a sentinel value. A tag with
/// no digest or no date is skipped by the classifier, not deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    /// Digest of record from the tag-level manifest response
    pub digest: Option<Digest>,
    /// Best-effort creation timestamp, naive UTC
    pub created_at: Option<NaiveDateTime>,
}

/// Why a single step of the date chain produced no timestamp.
#[derive(Debug)]
enum StepMiss {
    /// The signal source does not exist in this manifest shape
    Absent,
    /// A fetch the step depends on failed
    Fetch(SweepError),
    /// The source was present but could not be decoded or parsed
    Malformed(String),
}

impl fmt::Display for StepMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepMiss::Absent => write!(f, "not present"),
            StepMiss::Fetch(err) => write!(f, "fetch failed: {}", err),
            StepMiss::Malformed(detail) => write!(f, "malformed: {}", detail),
        }
    }
}

type StepResult = std::result::Result<NaiveDateTime, StepMiss>;

/// Resolves tags to a digest and a best-effort creation date.
#[derive(Debug, Clone)]
pub struct Resolver {
    client: Client,
}

impl Resolver {
    /// Creates a resolver that issues its fetches through `client`.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Resolves a tag to its digest of record and creation date.
    ///
    /// Returns `Ok(None)` when the tag does not exist (any manifest fetch
    /// answered 404). Returns an error only for transport failures, which
    /// say nothing about whether the tag exists; every other obstacle
    /// degrades to `None` fields inside the returned image.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use libsweep::client::Client;
    /// use libsweep::resolve::Resolver;
    ///
    /// # fn example() -> libsweep::error::Result<()> {
    /// let client = Client::new("http://localhost:5000", None)?;
    /// let resolver = Resolver::new(client);
    ///
    /// if let Some(image) = resolver.resolve_tag("myapp", "v1.2.3")? {
    ///     println!("{:?} created {:?}", image.digest, image.created_at);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn resolve_tag(&self, repository: &str, tag: &str) -> Result<Option<ResolvedImage>> {
        let Some(response) = self.negotiate(repository, tag)? else {
            return Ok(None);
        };

        // The digest of record and the Last-Modified signal both come from
        // this tag-level response, even when an index is followed below.
        let mut manifest = match Manifest::from_bytes(&response.body) {
            Ok(manifest) => Some(manifest),
            Err(err) => {
                tracing::debug!(repository, tag, %err, "manifest body undecodable");
                None
            }
        };

        if let Some(index) = &manifest
            && index.is_index()
            && let Some(platform) = self.follow_index(repository, tag, index)
        {
            manifest = Some(platform);
        }

        let created_at = self.resolve_date(repository, tag, manifest.as_ref(), &response);

        Ok(Some(ResolvedImage {
            digest: response.digest,
            created_at,
        }))
    }

    /// Negotiates a manifest media type for a tag.
    ///
    /// Tries each accepted media type in order until one succeeds. A 404 on
    /// any attempt means the tag is absent, so no further types are tried.
    /// Transport failures abort immediately; any other refusal moves on to
    /// the next media type.
    fn negotiate(&self, repository: &str, tag: &str) -> Result<Option<ManifestResponse>> {
        for media_type in MANIFEST_ACCEPT_TYPES {
            match self.client.fetch_manifest(repository, tag, media_type) {
                Ok(response) => {
                    tracing::debug!(repository, tag, media_type, "manifest negotiated");
                    return Ok(Some(response));
                }
                Err(SweepError::NotFound { .. }) => return Ok(None),
                Err(err @ SweepError::Network { .. }) => return Err(err),
                Err(err) => {
                    tracing::debug!(repository, tag, media_type, %err, "manifest fetch refused");
                }
            }
        }

        Ok(None)
    }

    /// Follows a multi-platform index to its first listed entry.
    ///
    /// The first entry is taken in the order the registry gave, with no
    /// platform preference. Returns the concrete per-platform manifest when
    /// the re-fetch succeeds; on any failure the caller proceeds with the
    /// index's own metadata instead.
    fn follow_index(&self, repository: &str, tag: &str, index: &Manifest) -> Option<Manifest> {
        let entry = index.first_entry()?;

        match self
            .client
            .fetch_manifest(repository, &entry.digest, MEDIA_TYPE_OCI_MANIFEST)
        {
            Ok(response) => match Manifest::from_bytes(&response.body) {
                Ok(platform) => Some(platform),
                Err(err) => {
                    tracing::debug!(repository, tag, %err, "platform manifest undecodable");
                    None
                }
            },
            Err(err) => {
                tracing::debug!(
                    repository,
                    tag,
                    digest = %entry.digest,
                    %err,
                    "platform manifest fetch failed"
                );
                None
            }
        }
    }

    /// Runs the creation-date fallback chain.
    ///
    /// Steps, first hit wins: the config blob's `created` field, the config
    /// blob's history, the response's `Last-Modified` header, and legacy
    /// `v1Compatibility` history. Every miss is logged and swallowed; an
    /// empty chain yields `None`, never an error.
    fn resolve_date(
        &self,
        repository: &str,
        tag: &str,
        manifest: Option<&Manifest>,
        response: &ManifestResponse,
    ) -> Option<NaiveDateTime> {
        // The first two steps read the same config blob, fetched at most
        // once. A missing or malformed config digest costs only these two
        // steps; the rest of the chain still runs.
        let config_blob = manifest.and_then(|m| match self.fetch_config_blob(repository, m) {
            Ok(blob) => Some(blob),
            Err(miss) => {
                tracing::debug!(repository, tag, %miss, "config blob unavailable");
                None
            }
        });

        if let Some(blob) = &config_blob {
            match Self::created_from_config(blob) {
                Ok(created) => return Some(created),
                Err(miss) => {
                    tracing::debug!(repository, tag, %miss, "config created field unusable");
                }
            }

            match Self::created_from_config_history(blob) {
                Ok(created) => return Some(created),
                Err(miss) => {
                    tracing::debug!(repository, tag, %miss, "config history unusable");
                }
            }
        }

        match Self::created_from_last_modified(response) {
            Ok(created) => return Some(created),
            Err(miss) => {
                tracing::debug!(repository, tag, %miss, "Last-Modified unusable");
            }
        }

        if let Some(manifest) = manifest {
            match Self::created_from_v1_history(manifest) {
                Ok(created) => return Some(created),
                Err(miss) => {
                    tracing::debug!(repository, tag, %miss, "v1 compatibility history unusable");
                }
            }
        }

        None
    }

    /// Fetches and decodes the config blob referenced by a manifest.
    fn fetch_config_blob(
        &self,
        repository: &str,
        manifest: &Manifest,
    ) -> std::result::Result<ConfigBlob, StepMiss> {
        let digest = manifest.config_digest().ok_or(StepMiss::Absent)?;

        let bytes = self
            .client
            .fetch_blob(repository, digest)
            .map_err(StepMiss::Fetch)?;

        ConfigBlob::from_bytes(&bytes).map_err(|err| StepMiss::Malformed(err.to_string()))
    }

    /// Step 1: the config blob's top-level `created` field.
    fn created_from_config(blob: &ConfigBlob) -> StepResult {
        let value = blob.created.as_deref().ok_or(StepMiss::Absent)?;
        parse_created(value)
    }

    /// Step 2: the first config-history entry that exposes a `created`
    /// field.
    fn created_from_config_history(blob: &ConfigBlob) -> StepResult {
        let history = blob.history.as_deref().ok_or(StepMiss::Absent)?;

        let value = history
            .iter()
            .find_map(|entry| entry.created.as_deref())
            .ok_or(StepMiss::Absent)?;

        parse_created(value)
    }

    /// Step 3: the `Last-Modified` header of the tag-level response.
    fn created_from_last_modified(response: &ManifestResponse) -> StepResult {
        response.last_modified.ok_or(StepMiss::Absent)
    }

    /// Step 4: legacy v1 manifests carry a JSON-encoded compatibility blob
    /// per history entry. The first entry whose decoded payload has a
    /// `created` field wins; entries that fail to decode are passed over.
    fn created_from_v1_history(manifest: &Manifest) -> StepResult {
        let history = manifest.history.as_deref().ok_or(StepMiss::Absent)?;

        let value = history
            .iter()
            .filter_map(|entry| entry.v1_compatibility.as_deref())
            .filter_map(|compat| serde_json::from_str::<serde_json::Value>(compat).ok())
            .find_map(|payload| {
                payload
                    .get("created")
                    .and_then(|v| v.as_str())
                    .map(String::from)
            })
            .ok_or(StepMiss::Absent)?;

        parse_created(&value)
    }
}

/// Parses a `created` timestamp into naive UTC.
///
/// Accepts RFC 3339 with any offset (a trailing `Z` included), converting
/// to UTC before dropping the offset, and bare datetimes with no offset at
/// all, which some builders emit.
fn parse_created(value: &str) -> StepResult {
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.naive_utc());
    }

    value
        .parse::<NaiveDateTime>()
        .map_err(|_| StepMiss::Malformed(format!("unparseable timestamp: {}", value)))
}
