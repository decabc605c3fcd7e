//! Sweep - Registry Retention Library
//!
//! libsweep implements the decision core of a container-registry retention
//! enforcer: resolving what a tag points at and when it was created, and
//! classifying each tag as keep, delete, or skip under an age policy.
//!
//! # Quick Start
//!
//! ```no_run
//! use chrono::Utc;
//! use libsweep::{Client, Resolver, RetentionPolicy};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new("http://localhost:5000", None)?;
//!     let resolver = Resolver::new(client.clone());
//!     let policy = RetentionPolicy::new(30);
//!
//!     for repository in client.fetch_catalog()? {
//!         for tag in client.fetch_tags(&repository)? {
//!             let image = resolver.resolve_tag(&repository, &tag)?;
//!             let decision = policy.classify(&tag, image.as_ref(), Utc::now().naive_utc());
//!             println!("{}:{} -> {:?}", repository, tag, decision);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Main Types
//!
//! - [`Client`] - Blocking registry client (catalog, tags, manifests, blobs,
//!   deletion)
//! - [`Resolver`] - Resolves a tag to a digest and a best-effort creation
//!   date through the manifest fallback chain
//! - [`RetentionPolicy`] - Classifies tags into [`Decision`] values
//! - [`Credentials`] - Authentication credentials
//! - [`Digest`] - Content digest validation and handling
//!
//! # Architecture
//!
//! The library is a pipeline of three stages: the client speaks the registry
//! HTTP API, the resolver normalizes manifest shapes into one comparable
//! signal, and the policy turns that signal into an auditable decision.
//! Orchestration (walking the catalog, issuing deletions, garbage
//! collection, reporting) belongs to the consuming binary; the library
//! returns data and never prints.

#![warn(clippy::all)]

/// Returns the libsweep crate version.
///
/// This is useful for version reporting in CLI tools and debugging.
///
/// # Examples
///
/// ```
/// let version = libsweep::version();
/// assert!(!version.is_empty());
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// Re-export commonly used types for convenience
pub use auth::Credentials;
pub use client::{Client, ClientConfig, ManifestResponse, RegistryVersion};
pub use digest::Digest;
pub use error::{Result, SweepError};
pub use manifest::{ConfigBlob, Manifest};
pub use policy::{Decision, RetentionPolicy, SPECIAL_TAGS, UnresolvableCause};
pub use resolve::{ResolvedImage, Resolver};

// Low-level implementation modules (hidden from docs but still public)
// These are available for advanced users who need fine-grained control
#[doc(hidden)]
pub mod auth;
#[doc(hidden)]
pub mod client;
#[doc(hidden)]
pub mod digest;
#[doc(hidden)]
pub mod error;
#[doc(hidden)]
pub mod manifest;
#[doc(hidden)]
pub mod policy;
#[doc(hidden)]
pub mod resolve;
