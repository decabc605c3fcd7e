//! The cleanup run.
//!
//! Walks every repository and tag in the registry, classifies each tag
//! against the retention policy, deletes what the policy says to delete,
//! and reports every step as it happens. Deleting a manifest only unlinks
//! it, so the run finishes by driving the registry's garbage collector and
//! measuring how much space actually came back.

use chrono::Utc;
use libsweep::error::Result;
use libsweep::{Client, Decision, Resolver, RetentionPolicy, UnresolvableCause};

use crate::config::AgeReference;
use crate::format::{Reporter, format_size};
use crate::storage::{GarbageCollector, StorageProbe};

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;

/// Counters accumulated over a cleanup run.
///
/// Owned by the caller so partial totals survive an aborted sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Tags whose manifest the registry deleted (202 Accepted)
    pub deleted: u64,
    /// Tags passed over: special, unresolvable, or unreachable
    pub skipped: u64,
    /// Delete requests the registry refused
    pub delete_failures: u64,
}

/// A fully wired cleanup run against one registry.
pub struct CleanupRun {
    pub client: Client,
    pub resolver: Resolver,
    pub policy: RetentionPolicy,
    pub reporter: Box<dyn Reporter>,
    pub probe: Option<Box<dyn StorageProbe>>,
    pub collector: Option<Box<dyn GarbageCollector>>,
    pub registry_url: String,
    pub age_reference: AgeReference,
    pub dry_run: bool,
}

impl CleanupRun {
    /// Executes the run end to end.
    ///
    /// The sweep aborts on a catalog or tag-list failure, but the summary
    /// totals and the post-cleanup storage report are printed regardless,
    /// and the sweep error is returned after them.
    pub fn run(&self, summary: &mut RunSummary) -> Result<()> {
        self.print_header();

        let mut before = None;
        let outcome = match self.preflight() {
            Ok(()) => {
                before = self.measure_before();
                self.sweep(summary)
            }
            Err(err) => Err(err),
        };

        if let Err(err) = &outcome {
            tracing::error!(error = %err, "cleanup run aborted");
            self.reporter.error(&format!("Error: {}", err));
        }

        self.print_totals(summary);

        if outcome.is_ok() {
            self.run_garbage_collection(summary);
        }

        self.print_storage_report(before, summary);

        outcome
    }

    fn print_header(&self) {
        self.reporter.info("Starting Docker Registry cleanup...");
        self.reporter.info(&format!("Registry: {}", self.registry_url));
        self.reporter.info(&format!(
            "Protected tags: {}",
            self.policy.protected_tags.join(", ")
        ));
        self.reporter.info(&format!(
            "Deleting tags older than {} days",
            self.policy.days_to_keep
        ));
        if self.dry_run {
            self.reporter.info("Dry run: no tags will be deleted\n");
        } else {
            self.reporter.info("");
        }
    }

    /// Confirms the registry answers the version endpoint before sweeping.
    fn preflight(&self) -> Result<()> {
        let version = self.client.check_version()?;
        tracing::debug!(api_version = ?version.api_version, "registry reachable");
        Ok(())
    }

    fn measure_before(&self) -> Option<u64> {
        let before = self.measure_storage();
        match before {
            Some(bytes) => self.reporter.info(&format!(
                "Registry storage size before cleanup: {} ({} bytes)",
                format_size(bytes),
                bytes
            )),
            None => self
                .reporter
                .info("Registry storage size before cleanup: unavailable"),
        }
        before
    }

    fn sweep(&self, summary: &mut RunSummary) -> Result<()> {
        let run_started = Utc::now().naive_utc();

        let repositories = self.client.fetch_catalog()?;
        self.reporter
            .info(&format!("Found {} repositories\n", repositories.len()));

        for repository in &repositories {
            self.reporter
                .info(&format!("\nProcessing repository: {}", repository));

            let tags = self.client.fetch_tags(repository)?;
            if tags.is_empty() {
                self.reporter.info("  No tags found");
                continue;
            }
            self.reporter.info(&format!("  Found {} tags", tags.len()));

            for tag in &tags {
                let now = match self.age_reference {
                    AgeReference::PerTag => Utc::now().naive_utc(),
                    AgeReference::RunStart => run_started,
                };

                // Protected and special tags classify without touching the
                // registry.
                let mut decision = self.policy.classify(tag, None, now);
                if matches!(decision, Decision::SkipUnresolvable { .. }) {
                    match self.resolver.resolve_tag(repository, tag) {
                        Ok(resolved) => {
                            decision = self.policy.classify(tag, resolved.as_ref(), now);
                        }
                        Err(err) => {
                            tracing::warn!(
                                repository = %repository,
                                tag = %tag,
                                error = %err,
                                "tag unreachable"
                            );
                            self.reporter
                                .note(2, &format!("Skipping tag (unreachable): {}", tag));
                            summary.skipped += 1;
                            continue;
                        }
                    }
                }

                self.apply(repository, decision, summary);
            }
        }

        Ok(())
    }

    /// Reports one decision and carries out its side effects.
    fn apply(&self, repository: &str, decision: Decision, summary: &mut RunSummary) {
        match decision {
            Decision::KeepProtected { tag, pattern } => match pattern {
                Some(_) => self
                    .reporter
                    .keep(2, &format!("Keeping protected tag: {} - pattern match", tag)),
                None => self
                    .reporter
                    .keep(2, &format!("Keeping protected tag: {}", tag)),
            },
            Decision::SkipSpecial { tag } => {
                self.reporter
                    .skip(2, &format!("Skipping special tag: {}", tag));
                summary.skipped += 1;
            }
            Decision::SkipUnresolvable { tag, cause } => {
                let reason = match cause {
                    UnresolvableCause::Missing => "not found",
                    UnresolvableCause::NoDate => "no date info",
                };
                self.reporter
                    .note(2, &format!("Skipping tag ({}): {}", reason, tag));
                summary.skipped += 1;
            }
            Decision::Delete {
                tag,
                digest,
                created_at,
                age_days,
            } => {
                self.reporter.delete(
                    2,
                    &format!(
                        "Deleting tag: {} (created: {}, age: {} days)",
                        tag,
                        created_at.format("%Y-%m-%d %H:%M"),
                        age_days
                    ),
                );

                if self.dry_run {
                    self.reporter.skip(4, "Skipped (dry run)");
                    return;
                }

                match self.client.delete_manifest(repository, &digest) {
                    Ok(()) => {
                        summary.deleted += 1;
                        self.reporter.keep(4, "Successfully deleted");
                    }
                    Err(err) => {
                        tracing::warn!(
                            repository = %repository,
                            tag = %tag,
                            digest = %digest,
                            error = %err,
                            "manifest delete refused"
                        );
                        summary.delete_failures += 1;
                        self.reporter.delete(4, "Failed to delete");
                    }
                }
            }
            Decision::KeepRecent {
                tag,
                created_at,
                age_days,
            } => {
                self.reporter.keep(
                    2,
                    &format!(
                        "Keeping recent tag: {} (created: {}, age: {} days)",
                        tag,
                        created_at.format("%Y-%m-%d %H:%M"),
                        age_days
                    ),
                );
            }
        }
    }

    fn print_totals(&self, summary: &RunSummary) {
        let rule = "=".repeat(50);
        self.reporter.info(&format!("\n{}", rule));
        self.reporter
            .info(&format!("Total tags deleted: {}", summary.deleted));
        self.reporter
            .info(&format!("Total tags skipped: {}", summary.skipped));
        if summary.delete_failures > 0 {
            self.reporter.info(&format!(
                "Total delete failures: {}",
                summary.delete_failures
            ));
        }
        self.reporter.info(&format!("{}\n", rule));
    }

    fn run_garbage_collection(&self, summary: &RunSummary) {
        if summary.deleted == 0 {
            self.reporter
                .info("No tags deleted, skipping garbage collection");
            return;
        }

        let Some(collector) = &self.collector else {
            tracing::debug!("no garbage collector configured");
            return;
        };

        self.reporter.info("Running garbage collection...");
        match collector.collect(self.dry_run) {
            Ok(()) => self
                .reporter
                .keep(0, "Garbage collection completed successfully"),
            Err(err) => {
                tracing::warn!(error = %err, "garbage collection failed");
                self.reporter.delete(0, "Garbage collection failed");
            }
        }
    }

    fn print_storage_report(&self, before: Option<u64>, summary: &RunSummary) {
        let rule = "=".repeat(50);
        self.reporter.info(&format!("\n{}", rule));
        self.reporter.info("POST-CLEANUP STORAGE MEASUREMENT");
        self.reporter.info(&rule);

        if summary.deleted > 0
            && let Some(probe) = &self.probe
        {
            self.reporter.info("Waiting for filesystem sync...");
            probe.settle();
        }

        match self.measure_storage() {
            Some(after) => {
                self.reporter.info(&format!(
                    "Registry storage size after cleanup: {} ({} bytes)",
                    format_size(after),
                    after
                ));
                match before {
                    Some(before) if before > after => {
                        let freed = before - after;
                        let percent = freed as f64 / before as f64 * 100.0;
                        self.reporter.keep(
                            0,
                            &format!(
                                "Freed space: {} ({} bytes, {:.2}%)",
                                format_size(freed),
                                freed,
                                percent
                            ),
                        );
                    }
                    Some(before) if before < after => {
                        let grew = after - before;
                        self.reporter.warn(
                            0,
                            &format!("Storage increased: {} ({} bytes)", format_size(grew), grew),
                        );
                    }
                    Some(_) => self.reporter.info("No space freed (0 bytes)"),
                    None => self
                        .reporter
                        .info("Cannot calculate freed space (initial size unavailable)"),
                }
            }
            None => self
                .reporter
                .info("Registry storage size after cleanup: unavailable"),
        }

        self.reporter.info(&format!("{}\n", rule));
    }

    fn measure_storage(&self) -> Option<u64> {
        let probe = self.probe.as_ref()?;
        match probe.measure() {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                tracing::warn!(error = %err, "storage measurement failed");
                None
            }
        }
    }
}
