//! Basic usage example for the sweep library.
//!
//! Walks a registry and prints the retention decision for every tag
//! without deleting anything.
//!
//! Run with: cargo run --example basic_usage

use chrono::Utc;
use libsweep::{Client, Decision, Resolver, RetentionPolicy};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Sweep Library - Basic Usage Example\n");

    // Connect to a local registry
    let client = Client::new("http://localhost:5000", None)?;
    println!("✓ Using registry: {}\n", client.registry_url());

    // Check if registry is accessible
    match client.check_version() {
        Ok(_) => println!("✓ Registry is accessible\n"),
        Err(e) => {
            eprintln!("✗ Failed to connect: {}", e);
            eprintln!("  Make sure a registry is running at http://localhost:5000");
            eprintln!("  You can start one with: docker run -d -p 5000:5000 registry:2");
            return Ok(());
        }
    }

    let resolver = Resolver::new(client.clone());
    let policy = RetentionPolicy::new(30).with_protected_tags(vec!["stable".to_string()]);

    // Classify every tag in the first few repositories
    println!("Fetching repositories...");
    let repositories = client.fetch_catalog()?;
    println!("✓ Found {} repositories\n", repositories.len());

    for repository in repositories.iter().take(3) {
        println!("{}:", repository);
        for tag in client.fetch_tags(repository)?.iter().take(5) {
            let resolved = resolver.resolve_tag(repository, tag)?;
            let decision = policy.classify(tag, resolved.as_ref(), Utc::now().naive_utc());
            match decision {
                Decision::Delete { age_days, .. } => {
                    println!("  {} -> delete ({} days old)", tag, age_days);
                }
                Decision::KeepRecent { age_days, .. } => {
                    println!("  {} -> keep ({} days old)", tag, age_days);
                }
                other => println!("  {} -> {:?}", tag, other),
            }
        }
        println!();
    }

    println!("Example completed!");
    Ok(())
}
