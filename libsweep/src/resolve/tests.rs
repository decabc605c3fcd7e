use super::*;
use crate::manifest::MEDIA_TYPE_DOCKER_MANIFEST_V2;
use chrono::NaiveDate;

const TAG_DIGEST: &str = "sha256:7d865e959b2466918c9863afca942d0fb89d7c9ac0c99bafc3749504ded97730";
const INDEX_DIGEST: &str =
    "sha256:aec070645fe53ee3b3763059376134f058cc337247c978add178b6ccdfb0019f";
const PLATFORM_DIGEST: &str =
    "sha256:b5bb9d8014a0f9b1d61e21e796d78dccdf1352f23cd32812f4850b878ae4944c";

fn blob_digest(content: &[u8]) -> String {
    use sha2::{Digest as _, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("sha256:{:x}", hasher.finalize())
}

fn resolver_for(server: &mockito::Server) -> Resolver {
    Resolver::new(Client::new(&server.url(), None).unwrap())
}

fn naive(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, mi, s)
        .unwrap()
}

fn manifest_with_config(config_body: &str) -> (String, String) {
    let config_digest = blob_digest(config_body.as_bytes());
    let manifest = format!(
        r#"{{"schemaVersion":2,"mediaType":"application/vnd.oci.image.manifest.v1+json","config":{{"mediaType":"application/vnd.oci.image.config.v1+json","size":{},"digest":"{}"}},"layers":[]}}"#,
        config_body.len(),
        config_digest
    );
    (manifest, config_digest)
}

#[test]
fn test_resolves_digest_and_config_created() {
    let mut server = mockito::Server::new();
    let config_body = r#"{"architecture":"amd64","created":"2020-01-01T00:00:00Z"}"#;
    let (manifest_body, config_digest) = manifest_with_config(config_body);

    let manifest_mock = server
        .mock("GET", "/v2/myapp/manifests/v1.2.3")
        .match_header("Accept", MEDIA_TYPE_OCI_MANIFEST)
        .with_status(200)
        .with_header("Docker-Content-Digest", TAG_DIGEST)
        .with_body(&manifest_body)
        .create();

    let blob_mock = server
        .mock("GET", format!("/v2/myapp/blobs/{}", config_digest).as_str())
        .with_status(200)
        .with_body(config_body)
        .create();

    let resolver = resolver_for(&server);
    let image = resolver.resolve_tag("myapp", "v1.2.3").unwrap().unwrap();

    manifest_mock.assert();
    blob_mock.assert();
    assert_eq!(image.digest.unwrap().to_string(), TAG_DIGEST);
    assert_eq!(image.created_at, Some(naive(2020, 1, 1, 0, 0, 0)));
}

#[test]
fn test_config_created_wins_over_last_modified() {
    let mut server = mockito::Server::new();
    let config_body = r#"{"created":"2020-01-01T00:00:00Z"}"#;
    let (manifest_body, config_digest) = manifest_with_config(config_body);

    server
        .mock("GET", "/v2/myapp/manifests/v1")
        .with_status(200)
        .with_header("Docker-Content-Digest", TAG_DIGEST)
        .with_header("Last-Modified", "Wed, 21 Oct 2015 07:28:00 GMT")
        .with_body(&manifest_body)
        .create();

    server
        .mock("GET", format!("/v2/myapp/blobs/{}", config_digest).as_str())
        .with_status(200)
        .with_body(config_body)
        .create();

    let resolver = resolver_for(&server);
    let image = resolver.resolve_tag("myapp", "v1").unwrap().unwrap();

    // The config blob outranks the Last-Modified header
    assert_eq!(image.created_at, Some(naive(2020, 1, 1, 0, 0, 0)));
}

#[test]
fn test_config_history_scan_skips_entries_without_created() {
    let mut server = mockito::Server::new();
    let config_body = r#"{"history":[{"created_by":"RUN apk add curl"},{"created":"2021-06-15T10:30:00Z"}]}"#;
    let (manifest_body, config_digest) = manifest_with_config(config_body);

    server
        .mock("GET", "/v2/myapp/manifests/v1")
        .with_status(200)
        .with_header("Docker-Content-Digest", TAG_DIGEST)
        .with_body(&manifest_body)
        .create();

    server
        .mock("GET", format!("/v2/myapp/blobs/{}", config_digest).as_str())
        .with_status(200)
        .with_body(config_body)
        .create();

    let resolver = resolver_for(&server);
    let image = resolver.resolve_tag("myapp", "v1").unwrap().unwrap();

    assert_eq!(image.created_at, Some(naive(2021, 6, 15, 10, 30, 0)));
}

#[test]
fn test_last_modified_when_config_has_no_dates() {
    let mut server = mockito::Server::new();
    let config_body = r#"{"architecture":"amd64"}"#;
    let (manifest_body, config_digest) = manifest_with_config(config_body);

    server
        .mock("GET", "/v2/myapp/manifests/v1")
        .with_status(200)
        .with_header("Docker-Content-Digest", TAG_DIGEST)
        .with_header("Last-Modified", "Wed, 21 Oct 2015 07:28:00 GMT")
        .with_body(&manifest_body)
        .create();

    server
        .mock("GET", format!("/v2/myapp/blobs/{}", config_digest).as_str())
        .with_status(200)
        .with_body(config_body)
        .create();

    let resolver = resolver_for(&server);
    let image = resolver.resolve_tag("myapp", "v1").unwrap().unwrap();

    assert_eq!(image.created_at, Some(naive(2015, 10, 21, 7, 28, 0)));
}

#[test]
fn test_last_modified_when_config_blob_fetch_fails() {
    let mut server = mockito::Server::new();
    let config_body = r#"{"created":"2020-01-01T00:00:00Z"}"#;
    let (manifest_body, config_digest) = manifest_with_config(config_body);

    server
        .mock("GET", "/v2/myapp/manifests/v1")
        .with_status(200)
        .with_header("Docker-Content-Digest", TAG_DIGEST)
        .with_header("Last-Modified", "Wed, 21 Oct 2015 07:28:00 GMT")
        .with_body(&manifest_body)
        .create();

    server
        .mock("GET", format!("/v2/myapp/blobs/{}", config_digest).as_str())
        .with_status(404)
        .with_body("blob unknown")
        .create();

    let resolver = resolver_for(&server);
    let image = resolver.resolve_tag("myapp", "v1").unwrap().unwrap();

    // Losing the config blob costs the first two steps only
    assert_eq!(image.digest.unwrap().to_string(), TAG_DIGEST);
    assert_eq!(image.created_at, Some(naive(2015, 10, 21, 7, 28, 0)));
}

#[test]
fn test_v1_compatibility_history_is_final_fallback() {
    let mut server = mockito::Server::new();
    let manifest_body = r#"{"schemaVersion":1,"history":[{"v1Compatibility":"{\"id\":\"top-layer\"}"},{"v1Compatibility":"{\"created\":\"2019-03-01T12:00:00Z\"}"}]}"#;

    server
        .mock("GET", "/v2/myapp/manifests/v1")
        .with_status(200)
        .with_header("Docker-Content-Digest", TAG_DIGEST)
        .with_body(manifest_body)
        .create();

    let resolver = resolver_for(&server);
    let image = resolver.resolve_tag("myapp", "v1").unwrap().unwrap();

    assert_eq!(image.created_at, Some(naive(2019, 3, 1, 12, 0, 0)));
}

#[test]
fn test_unparseable_config_created_falls_through() {
    let mut server = mockito::Server::new();
    let config_body = r#"{"created":"three weeks ago"}"#;
    let (manifest_body, config_digest) = manifest_with_config(config_body);

    server
        .mock("GET", "/v2/myapp/manifests/v1")
        .with_status(200)
        .with_header("Docker-Content-Digest", TAG_DIGEST)
        .with_header("Last-Modified", "Wed, 21 Oct 2015 07:28:00 GMT")
        .with_body(&manifest_body)
        .create();

    server
        .mock("GET", format!("/v2/myapp/blobs/{}", config_digest).as_str())
        .with_status(200)
        .with_body(config_body)
        .create();

    let resolver = resolver_for(&server);
    let image = resolver.resolve_tag("myapp", "v1").unwrap().unwrap();

    assert_eq!(image.created_at, Some(naive(2015, 10, 21, 7, 28, 0)));
}

#[test]
fn test_no_date_sources_leaves_created_unknown() {
    let mut server = mockito::Server::new();

    server
        .mock("GET", "/v2/myapp/manifests/v1")
        .with_status(200)
        .with_header("Docker-Content-Digest", TAG_DIGEST)
        .with_body(r#"{"schemaVersion":2,"mediaType":"application/vnd.docker.distribution.manifest.v2+json"}"#)
        .create();

    let resolver = resolver_for(&server);
    let image = resolver.resolve_tag("myapp", "v1").unwrap().unwrap();

    assert_eq!(image.digest.unwrap().to_string(), TAG_DIGEST);
    assert!(image.created_at.is_none());
}

#[test]
fn test_missing_tag_short_circuits_on_404() {
    let mut server = mockito::Server::new();

    // Exactly one request: the first 404 settles the question
    let mock = server
        .mock("GET", "/v2/myapp/manifests/gone")
        .with_status(404)
        .with_body("manifest unknown")
        .expect(1)
        .create();

    let resolver = resolver_for(&server);
    let result = resolver.resolve_tag("myapp", "gone").unwrap();

    mock.assert();
    assert!(result.is_none());
}

#[test]
fn test_negotiation_tries_next_type_after_refusal() {
    let mut server = mockito::Server::new();

    let refused = server
        .mock("GET", "/v2/myapp/manifests/v1")
        .match_header("Accept", MEDIA_TYPE_OCI_MANIFEST)
        .with_status(500)
        .with_body("boom")
        .create();

    let accepted = server
        .mock("GET", "/v2/myapp/manifests/v1")
        .match_header("Accept", MEDIA_TYPE_DOCKER_MANIFEST_V2)
        .with_status(200)
        .with_header("Docker-Content-Digest", TAG_DIGEST)
        .with_body(r#"{"schemaVersion":2}"#)
        .create();

    let resolver = resolver_for(&server);
    let image = resolver.resolve_tag("myapp", "v1").unwrap().unwrap();

    refused.assert();
    accepted.assert();
    assert_eq!(image.digest.unwrap().to_string(), TAG_DIGEST);
}

#[test]
fn test_negotiation_exhausted_treated_as_absent() {
    let mut server = mockito::Server::new();

    let mock = server
        .mock("GET", "/v2/myapp/manifests/v1")
        .with_status(500)
        .with_body("boom")
        .expect(3)
        .create();

    let resolver = resolver_for(&server);
    let result = resolver.resolve_tag("myapp", "v1").unwrap();

    mock.assert();
    assert!(result.is_none());
}

#[test]
fn test_index_resolves_first_listed_entry() {
    let mut server = mockito::Server::new();
    let config_body = r#"{"created":"2022-02-02T08:00:00Z"}"#;
    let (platform_body, config_digest) = manifest_with_config(config_body);

    let index_body = format!(
        r#"{{"schemaVersion":2,"mediaType":"application/vnd.oci.image.index.v1+json","manifests":[{{"mediaType":"application/vnd.oci.image.manifest.v1+json","digest":"{}","platform":{{"architecture":"amd64","os":"linux"}}}},{{"mediaType":"application/vnd.oci.image.manifest.v1+json","digest":"{}","platform":{{"architecture":"arm64","os":"linux"}}}}]}}"#,
        PLATFORM_DIGEST, TAG_DIGEST
    );

    server
        .mock("GET", "/v2/myapp/manifests/multi")
        .match_header("Accept", MEDIA_TYPE_OCI_MANIFEST)
        .with_status(200)
        .with_header("Docker-Content-Digest", INDEX_DIGEST)
        .with_body(&index_body)
        .create();

    let platform_mock = server
        .mock(
            "GET",
            format!("/v2/myapp/manifests/{}", PLATFORM_DIGEST).as_str(),
        )
        .match_header("Accept", MEDIA_TYPE_OCI_MANIFEST)
        .with_status(200)
        .with_body(&platform_body)
        .expect(1)
        .create();

    server
        .mock("GET", format!("/v2/myapp/blobs/{}", config_digest).as_str())
        .with_status(200)
        .with_body(config_body)
        .create();

    let resolver = resolver_for(&server);
    let image = resolver.resolve_tag("myapp", "multi").unwrap().unwrap();

    platform_mock.assert();
    // Date comes from the followed platform entry, identity from the index
    assert_eq!(image.digest.unwrap().to_string(), INDEX_DIGEST);
    assert_eq!(image.created_at, Some(naive(2022, 2, 2, 8, 0, 0)));
}

#[test]
fn test_index_refetch_failure_keeps_index_metadata() {
    let mut server = mockito::Server::new();
    let index_body = format!(
        r#"{{"schemaVersion":2,"mediaType":"application/vnd.docker.distribution.manifest.list.v2+json","manifests":[{{"digest":"{}"}}]}}"#,
        PLATFORM_DIGEST
    );

    server
        .mock("GET", "/v2/myapp/manifests/multi")
        .with_status(200)
        .with_header("Docker-Content-Digest", INDEX_DIGEST)
        .with_header("Last-Modified", "Wed, 21 Oct 2015 07:28:00 GMT")
        .with_body(&index_body)
        .create();

    server
        .mock(
            "GET",
            format!("/v2/myapp/manifests/{}", PLATFORM_DIGEST).as_str(),
        )
        .with_status(500)
        .with_body("boom")
        .create();

    let resolver = resolver_for(&server);
    let image = resolver.resolve_tag("myapp", "multi").unwrap().unwrap();

    assert_eq!(image.digest.unwrap().to_string(), INDEX_DIGEST);
    assert_eq!(image.created_at, Some(naive(2015, 10, 21, 7, 28, 0)));
}

#[test]
fn test_empty_index_keeps_index_metadata() {
    let mut server = mockito::Server::new();
    let index_body = r#"{"schemaVersion":2,"mediaType":"application/vnd.oci.image.index.v1+json","manifests":[]}"#;

    server
        .mock("GET", "/v2/myapp/manifests/multi")
        .with_status(200)
        .with_header("Docker-Content-Digest", INDEX_DIGEST)
        .with_header("Last-Modified", "Wed, 21 Oct 2015 07:28:00 GMT")
        .with_body(index_body)
        .create();

    let resolver = resolver_for(&server);
    let image = resolver.resolve_tag("myapp", "multi").unwrap().unwrap();

    assert_eq!(image.created_at, Some(naive(2015, 10, 21, 7, 28, 0)));
}

#[test]
fn test_undecodable_body_keeps_digest() {
    let mut server = mockito::Server::new();

    server
        .mock("GET", "/v2/myapp/manifests/v1")
        .with_status(200)
        .with_header("Docker-Content-Digest", TAG_DIGEST)
        .with_header("Last-Modified", "Wed, 21 Oct 2015 07:28:00 GMT")
        .with_body("this is not json")
        .create();

    let resolver = resolver_for(&server);
    let image = resolver.resolve_tag("myapp", "v1").unwrap().unwrap();

    assert_eq!(image.digest.unwrap().to_string(), TAG_DIGEST);
    assert_eq!(image.created_at, Some(naive(2015, 10, 21, 7, 28, 0)));
}

#[test]
fn test_transport_failure_is_an_error() {
    // Nothing listens on port 1
    let client = Client::new("http://127.0.0.1:1", None).unwrap();
    let resolver = Resolver::new(client);

    let err = resolver.resolve_tag("myapp", "v1").unwrap_err();
    assert!(matches!(err, SweepError::Network { .. }));
}

// Timestamp parsing

#[test]
fn test_parse_created_with_zulu_offset() {
    let parsed = parse_created("2020-01-01T00:00:00Z").unwrap();
    assert_eq!(parsed, naive(2020, 1, 1, 0, 0, 0));
}

#[test]
fn test_parse_created_converts_offsets_to_utc() {
    let parsed = parse_created("2024-01-01T05:00:00+05:00").unwrap();
    assert_eq!(parsed, naive(2024, 1, 1, 0, 0, 0));
}

#[test]
fn test_parse_created_keeps_fractional_seconds() {
    let parsed = parse_created("2023-05-01T12:00:00.500Z").unwrap();
    let expected = NaiveDate::from_ymd_opt(2023, 5, 1)
        .unwrap()
        .and_hms_milli_opt(12, 0, 0, 500)
        .unwrap();
    assert_eq!(parsed, expected);
}

#[test]
fn test_parse_created_accepts_bare_datetime() {
    let parsed = parse_created("2015-09-18T23:56:04").unwrap();
    assert_eq!(parsed, naive(2015, 9, 18, 23, 56, 4));
}

#[test]
fn test_parse_created_rejects_garbage() {
    let result = parse_created("three weeks ago");
    assert!(matches!(result, Err(StepMiss::Malformed(_))));
}
