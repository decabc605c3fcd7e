//! Content digest validation and manipulation.
//!
//! Wraps the `oci_spec::image::Digest` type to integrate with sweep's error
//! handling. Deletions are keyed by [`Digest`] values, never by tag, so every
//! digest string coming off the wire passes through this validation first.

use crate::error::{Result, SweepError};
use oci_spec::image::Digest as OciDigest;
use std::fmt;
use std::str::FromStr;

#[cfg(test)]
mod tests;

/// Represents a validated `algorithm:hex` content digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest(OciDigest);

impl Digest {
    /// Returns the algorithm part of the digest (e.g. `sha256`).
    pub fn algorithm(&self) -> String {
        self.0.algorithm().to_string()
    }

    /// Returns the hex-encoded value part of the digest.
    pub fn hex(&self) -> &str {
        self.0.digest()
    }
}

impl FromStr for Digest {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self> {
        let oci_digest = OciDigest::from_str(s).map_err(|e| SweepError::Validation {
            message: format!("Invalid digest format: {}", e),
            source: Some(Box::new(e)),
        })?;
        Ok(Digest(oci_digest))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
