//! HTTP client for registry communication.
//!
//! A thin blocking client built on reqwest, implementing the subset of the
//! OCI Distribution Specification v2 API the cleanup run needs: catalog and
//! tag listing (with Link-header pagination), manifest and blob retrieval,
//! and manifest deletion by digest. A single optional credential is applied
//! uniformly to every request.

use crate::auth::Credentials;
use crate::digest::Digest;
use crate::error::{Result, SweepError};
use chrono::NaiveDateTime;
use reqwest::StatusCode;
use reqwest::blocking::{Client as ReqwestClient, RequestBuilder, Response};
use serde::Deserialize;
use sha2::{Digest as Sha2Digest, Sha256};
use std::str::FromStr;
use std::time::Duration;


/// Response from the catalog API endpoint.
#[derive(Debug, Deserialize)]
struct CatalogResponse {
    /// List of repository names
    repositories: Vec<String>,
}

/// Response from the tags list API endpoint.
///
/// `tags` is null (or absent) once every tag in a repository has been
/// deleted, so it cannot be required.
#[derive(Debug, Deserialize)]
struct TagsResponse {
    /// Repository name
    name: String,
    /// List of tag names
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Version information returned by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryVersion {
    /// The Docker-Distribution-API-Version header value, if present.
    /// Typically "registry/2.0" for OCI Distribution Spec v2.
    pub api_version: Option<String>,
}

/// A manifest response with the headers that matter for resolution.
///
/// The digest comes from the `Docker-Content-Digest` header. A missing or
/// malformed header leaves it `None` rather than failing the fetch.
/// `last_modified` is the parsed `Last-Modified` header, normalized to
/// naive UTC.
#[derive(Debug, Clone)]
pub struct ManifestResponse {
    /// Raw manifest bytes
    pub body: Vec<u8>,
    /// Digest of record for the manifest, when the registry supplied one
    pub digest: Option<Digest>,
    /// Last-Modified header, when present and parseable
    pub last_modified: Option<NaiveDateTime>,
}

/// Configuration for the HTTP client.
///
/// # Examples
///
/// ```
/// use libsweep::client::ClientConfig;
///
/// let config = ClientConfig::new()
///     .with_timeout(60)
///     .with_max_idle_per_host(20);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
    /// Maximum idle connections per host (default: 10)
    pub max_idle_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_idle_per_host: 10,
        }
    }
}

impl ClientConfig {
    /// Creates a new configuration with default values.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsweep::client::ClientConfig;
    ///
    /// let config = ClientConfig::new();
    /// assert_eq!(config.timeout_seconds, 30);
    /// assert_eq!(config.max_idle_per_host, 10);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request timeout in seconds.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the maximum idle connections per host.
    pub fn with_max_idle_per_host(mut self, max: usize) -> Self {
        self.max_idle_per_host = max;
        self
    }
}

/// Blocking HTTP client for registry operations.
#[derive(Debug, Clone)]
pub struct Client {
    /// The underlying HTTP client
    http_client: ReqwestClient,
    /// Base registry URL (e.g., "https://registry.example.com")
    registry_url: String,
    /// Credential applied to every request
    credentials: Option<Credentials>,
}

impl Client {
    /// Creates a new client for the specified registry URL with default
    /// configuration.
    ///
    /// # Arguments
    ///
    /// * `registry_url` - The base URL of the registry (e.g., "http://localhost:5000")
    /// * `credentials` - Optional credential applied to every request
    ///
    /// # Examples
    ///
    /// ```
    /// use libsweep::client::Client;
    ///
    /// let client = Client::new("http://localhost:5000", None).unwrap();
    /// ```
    pub fn new(registry_url: &str, credentials: Option<Credentials>) -> Result<Self> {
        Self::with_config(registry_url, ClientConfig::default(), credentials)
    }

    /// Creates a new client with custom configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsweep::client::{Client, ClientConfig};
    ///
    /// let config = ClientConfig::new().with_timeout(60);
    /// let client = Client::with_config("http://localhost:5000", config, None).unwrap();
    /// ```
    pub fn with_config(
        registry_url: &str,
        config: ClientConfig,
        credentials: Option<Credentials>,
    ) -> Result<Self> {
        let normalized_url = Self::normalize_url(registry_url)?;

        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build()
            .map_err(|e| SweepError::network_with_source("Failed to create HTTP client", e))?;

        Ok(Self {
            http_client,
            registry_url: normalized_url,
            credentials,
        })
    }

    /// Normalizes a registry URL by ensuring it has a scheme and removing
    /// trailing slashes.
    fn normalize_url(url: &str) -> Result<String> {
        let url = url.trim();

        if url.is_empty() {
            return Err(SweepError::validation("Registry URL cannot be empty"));
        }

        let url = if !url.starts_with("http://") && !url.starts_with("https://") {
            format!("http://{}", url)
        } else {
            url.to_string()
        };

        let url = url.trim_end_matches('/');

        Ok(url.to_string())
    }

    /// Returns the base registry URL.
    pub fn registry_url(&self) -> &str {
        &self.registry_url
    }

    /// Adds the Authorization header when a credential is configured.
    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(creds) = &self.credentials
            && let Some(auth_header) = creds.to_header_value()
        {
            request.header("Authorization", auth_header)
        } else {
            request
        }
    }

    /// Checks that the registry supports the v2 API.
    ///
    /// Performs a GET request to the `/v2/` endpoint, verifying reachability
    /// and (when a credential is configured) that it is accepted. Returns the
    /// version information from the registry's response headers.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use libsweep::client::Client;
    ///
    /// # fn example() -> libsweep::error::Result<()> {
    /// let client = Client::new("http://localhost:5000", None)?;
    /// let version = client.check_version()?;
    /// if let Some(api_version) = version.api_version {
    ///     println!("Registry API version: {}", api_version);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn check_version(&self) -> Result<RegistryVersion> {
        let url = format!("{}/v2/", self.registry_url);

        let response = self
            .apply_auth(self.http_client.get(&url))
            .send()
            .map_err(|e| Self::translate_reqwest_error(e, &self.registry_url))?;

        // Extract version information from headers before consuming the body
        let api_version = response
            .headers()
            .get("Docker-Distribution-API-Version")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        Self::check_response_status(response)?;

        Ok(RegistryVersion { api_version })
    }

    /// Fetches the catalog of repositories from the registry.
    ///
    /// Performs GET requests against the `/v2/_catalog` endpoint, following
    /// pagination links until all repository names have been collected.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use libsweep::client::Client;
    ///
    /// # fn example() -> libsweep::error::Result<()> {
    /// let client = Client::new("http://localhost:5000", None)?;
    /// for repo in client.fetch_catalog()? {
    ///     println!("{}", repo);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn fetch_catalog(&self) -> Result<Vec<String>> {
        self.fetch_catalog_paginated(None)
    }

    /// Fetches the catalog with an optional per-page limit.
    ///
    /// If `limit` is `None`, all repositories are fetched by following
    /// pagination links; otherwise up to `n` repositories are requested per
    /// page.
    pub fn fetch_catalog_paginated(&self, limit: Option<usize>) -> Result<Vec<String>> {
        let mut all_repositories = Vec::new();
        let mut url = format!("{}/v2/_catalog", self.registry_url);

        if let Some(n) = limit {
            url.push_str(&format!("?n={}", n));
        }

        loop {
            let response = self
                .apply_auth(self.http_client.get(&url))
                .send()
                .map_err(|e| Self::translate_reqwest_error(e, &self.registry_url))?;

            // Extract Link header for pagination before consuming the response
            let next_path = Self::extract_next_link(response.headers());

            let response = Self::check_response_status(response)?;

            let catalog: CatalogResponse = response.json().map_err(|e| {
                SweepError::validation_with_source("Failed to parse catalog response", e)
            })?;

            all_repositories.extend(catalog.repositories);

            if let Some(path) = next_path {
                url = format!("{}{}", self.registry_url, path);
            } else {
                break;
            }
        }

        Ok(all_repositories)
    }

    /// Fetches the list of tags for a repository.
    ///
    /// Performs GET requests against the `/v2/<name>/tags/list` endpoint,
    /// following pagination links. A repository with no tags yields an empty
    /// list (registries report `"tags": null` for repositories whose tags
    /// were all deleted).
    pub fn fetch_tags(&self, repository: &str) -> Result<Vec<String>> {
        self.fetch_tags_paginated(repository, None)
    }

    /// Fetches the list of tags with an optional per-page limit.
    pub fn fetch_tags_paginated(
        &self,
        repository: &str,
        limit: Option<usize>,
    ) -> Result<Vec<String>> {
        let mut all_tags = Vec::new();
        let mut url = format!("{}/v2/{}/tags/list", self.registry_url, repository);

        if let Some(n) = limit {
            url.push_str(&format!("?n={}", n));
        }

        loop {
            let response = self
                .apply_auth(self.http_client.get(&url))
                .send()
                .map_err(|e| Self::translate_reqwest_error(e, &self.registry_url))?;

            // Extract Link header for pagination before consuming the response
            let next_path = Self::extract_next_link(response.headers());

            let response = Self::check_response_status(response)?;

            let tags_response: TagsResponse = response.json().map_err(|e| {
                SweepError::validation_with_source("Failed to parse tags response", e)
            })?;

            // Validate that the response is for the correct repository
            if tags_response.name != repository {
                return Err(SweepError::validation(format!(
                    "Registry returned tags for '{}' but expected '{}'",
                    tags_response.name, repository
                )));
            }

            all_tags.extend(tags_response.tags.unwrap_or_default());

            if let Some(path) = next_path {
                url = format!("{}{}", self.registry_url, path);
            } else {
                break;
            }
        }

        Ok(all_tags)
    }

    /// Fetches a manifest for a reference, requesting one media type.
    ///
    /// Performs a single GET against `/v2/<name>/manifests/<reference>` with
    /// the given Accept value. The reference can be a tag or a digest.
    /// Content negotiation across several media types belongs to the caller,
    /// which invokes this once per type.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use libsweep::client::Client;
    /// use libsweep::manifest::MEDIA_TYPE_OCI_MANIFEST;
    ///
    /// # fn example() -> libsweep::error::Result<()> {
    /// let client = Client::new("http://localhost:5000", None)?;
    /// let response = client.fetch_manifest("myapp", "v1.2.3", MEDIA_TYPE_OCI_MANIFEST)?;
    /// if let Some(digest) = &response.digest {
    ///     println!("{}", digest);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn fetch_manifest(
        &self,
        repository: &str,
        reference: &str,
        accept: &str,
    ) -> Result<ManifestResponse> {
        let url = format!(
            "{}/v2/{}/manifests/{}",
            self.registry_url, repository, reference
        );

        let response = self
            .apply_auth(self.http_client.get(&url).header("Accept", accept))
            .send()
            .map_err(|e| Self::translate_reqwest_error(e, &self.registry_url))?;

        // Both headers must be read before the response body is consumed. An
        // absent or malformed digest header degrades to None rather than
        // failing: a manifest without a digest of record can still supply a
        // creation date, it just can never be deleted.
        let digest = response
            .headers()
            .get("Docker-Content-Digest")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Digest::from_str(s).ok());

        let last_modified = response
            .headers()
            .get(reqwest::header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| httpdate::parse_http_date(s).ok())
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).naive_utc());

        let response = Self::check_response_status(response)?;

        let body = response
            .bytes()
            .map_err(|e| SweepError::network_with_source("Failed to read manifest response", e))?;

        Ok(ManifestResponse {
            body: body.to_vec(),
            digest,
            last_modified,
        })
    }

    /// Fetches a blob (config or layer) from the registry.
    ///
    /// Performs a GET against `/v2/<name>/blobs/<digest>` and verifies the
    /// downloaded content against the digest before returning it.
    ///
    /// # Errors
    ///
    /// Returns an error if the digest is malformed, uses an algorithm other
    /// than sha256, or does not match the downloaded content.
    pub fn fetch_blob(&self, repository: &str, digest: &str) -> Result<Vec<u8>> {
        // Parse and validate the digest format
        let expected_digest = Digest::from_str(digest)?;

        let url = format!("{}/v2/{}/blobs/{}", self.registry_url, repository, digest);

        let response = self
            .apply_auth(self.http_client.get(&url))
            .send()
            .map_err(|e| Self::translate_reqwest_error(e, &self.registry_url))?;

        let response = Self::check_response_status(response)?;

        let blob_bytes = response
            .bytes()
            .map_err(|e| SweepError::network_with_source("Failed to read blob response", e))?;

        // Only sha256 digests can be verified
        if expected_digest.algorithm() != "sha256" {
            return Err(SweepError::validation(format!(
                "Unsupported digest algorithm: {}. Only sha256 is currently supported",
                expected_digest.algorithm()
            )));
        }

        let mut hasher = Sha256::new();
        hasher.update(&blob_bytes);
        let computed_hash = format!("{:x}", hasher.finalize());

        if computed_hash != expected_digest.hex() {
            return Err(SweepError::validation(format!(
                "Blob digest mismatch: expected {}, computed sha256:{}",
                digest, computed_hash
            )));
        }

        Ok(blob_bytes.to_vec())
    }

    /// Deletes a manifest by digest.
    ///
    /// Performs a DELETE against `/v2/<name>/manifests/<digest>`. Deletion is
    /// keyed by digest, never by tag: a tag repointed between resolution and
    /// deletion results in deleting exactly the version that was evaluated.
    /// The registry acknowledges a deletion with 202 Accepted; any other
    /// status is an error.
    pub fn delete_manifest(&self, repository: &str, digest: &Digest) -> Result<()> {
        let url = format!(
            "{}/v2/{}/manifests/{}",
            self.registry_url, repository, digest
        );

        let response = self
            .apply_auth(self.http_client.delete(&url))
            .send()
            .map_err(|e| Self::translate_reqwest_error(e, &self.registry_url))?;

        let status = response.status();
        if status == StatusCode::ACCEPTED {
            return Ok(());
        }

        if status.is_success() {
            return Err(SweepError::server(
                format!(
                    "Unexpected status {} deleting manifest at {}",
                    status.as_u16(),
                    url
                ),
                status.as_u16(),
            ));
        }

        Self::check_response_status(response).map(|_| ())
    }

    /// Extracts the next page path from the Link header.
    ///
    /// The OCI Distribution Specification uses the Link header for pagination:
    /// `Link: </v2/_catalog?n=100&last=repo99>; rel="next"`
    fn extract_next_link(headers: &reqwest::header::HeaderMap) -> Option<String> {
        let link_header = headers.get(reqwest::header::LINK)?;
        let link_str = link_header.to_str().ok()?;

        for link_part in link_str.split(',') {
            let link_part = link_part.trim();

            if link_part.contains("rel=\"next\"") || link_part.contains("rel='next'") {
                // Extract the path between < and >; it is relative and
                // already starts with /v2/
                if let Some(start) = link_part.find('<')
                    && let Some(end) = link_part.find('>')
                {
                    let path = &link_part[start + 1..end];
                    return Some(path.to_string());
                }
            }
        }

        None
    }

    /// Parses a Retry-After header, either delta-seconds or an HTTP-date.
    fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
        let value = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?;
        let value = value.trim();

        if let Ok(seconds) = value.parse::<u64>() {
            return Some(seconds);
        }

        // HTTP-date form: seconds remaining until that instant. A date in
        // the past yields None.
        let when = httpdate::parse_http_date(value).ok()?;
        when.duration_since(std::time::SystemTime::now())
            .ok()
            .map(|d| d.as_secs())
    }

    /// Translates a reqwest error into a SweepError.
    ///
    /// Every error produced here is `SweepError::Network`: a transport-level
    /// failure, as opposed to an HTTP status the registry actually returned.
    fn translate_reqwest_error(error: reqwest::Error, registry_url: &str) -> SweepError {
        if error.is_timeout() {
            SweepError::network(format!("Request to {} timed out", registry_url))
        } else if error.is_connect() {
            SweepError::network_with_source(
                format!("Failed to connect to registry at {}", registry_url),
                error,
            )
        } else if error.is_request() {
            SweepError::network_with_source(
                format!("Failed to send request to {}", registry_url),
                error,
            )
        } else {
            SweepError::network_with_source(
                format!("Network error communicating with {}", registry_url),
                error,
            )
        }
    }

    /// Checks the HTTP response status and translates failures to SweepError.
    ///
    /// Statuses the registry returned never map to `SweepError::Network`;
    /// that variant is reserved for transport failures, so callers can tell
    /// "the registry answered badly" apart from "the registry never answered".
    fn check_response_status(response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let retry_after = Self::parse_retry_after(response.headers());
        let error_body = response
            .text()
            .unwrap_or_else(|_| String::from("(unable to read response body)"));

        match status {
            StatusCode::UNAUTHORIZED => Err(SweepError::authentication(
                format!("Authentication required for {}: {}", url, error_body),
                Some(401),
            )),
            StatusCode::FORBIDDEN => Err(SweepError::authentication(
                format!("Access forbidden for {}: {}", url, error_body),
                Some(403),
            )),
            StatusCode::NOT_FOUND => Err(SweepError::not_found("endpoint", &url)),
            StatusCode::TOO_MANY_REQUESTS => Err(SweepError::rate_limit(
                format!("Rate limit exceeded for {}", url),
                retry_after,
            )),
            _ => Err(SweepError::server(
                format!(
                    "Server error from {}: HTTP {}: {}",
                    url,
                    status.as_u16(),
                    error_body
                ),
                status.as_u16(),
            )),
        }
    }
}
