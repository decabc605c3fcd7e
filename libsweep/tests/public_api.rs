use libsweep::{Client, Credentials, Digest, RetentionPolicy};

#[test]
fn test_client_construction() {
    let client = Client::new("http://localhost:5000", None).unwrap();
    assert_eq!(client.registry_url(), "http://localhost:5000");

    // A bare host picks up a scheme during normalization.
    let authed = Client::new("localhost:5000", Some(Credentials::basic("admin", "secret")));
    assert!(authed.is_ok());
}

#[test]
fn test_policy_builder_chain() {
    let policy = RetentionPolicy::new(14)
        .with_protected_tags(vec!["stable".to_string()])
        .with_protected_patterns(vec!["release".to_string()]);

    assert_eq!(policy.days_to_keep, 14);
    assert_eq!(policy.protected_tags, vec!["stable"]);
    assert_eq!(policy.protected_patterns, vec!["release"]);
}

#[test]
fn test_digest_parses_from_str() {
    let digest: Digest = "sha256:7173b809ca12ec5dee4506cd86be934c4596dd234ee82c0662eac04a8c2c71dc"
        .parse()
        .unwrap();

    assert_eq!(digest.algorithm(), "sha256");
    assert!(digest.hex().starts_with("7173b809"));
}
