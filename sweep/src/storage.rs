//! Storage measurement and garbage collection for the registry backend.
//!
//! Deleting a manifest only unlinks it; the bytes come back when the
//! registry's own garbage collector runs. This module measures the backing
//! store before and after a run and drives that collector, either through a
//! host-visible path or through `docker exec` in the registry container.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

use crate::config::Settings;

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;

/// Measures how large the registry's backing store currently is.
pub trait StorageProbe: Send + Sync {
    /// Returns the total size of the store in bytes.
    fn measure(&self) -> Result<u64, String>;

    /// Gives the backend a chance to flush pending writes before a
    /// measurement. Failures are ignored.
    fn settle(&self) {}
}

/// Sums file sizes under a storage directory visible on this host.
pub struct PathProbe {
    root: PathBuf,
}

impl PathProbe {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl StorageProbe for PathProbe {
    fn measure(&self) -> Result<u64, String> {
        let mut total = 0u64;
        for entry in WalkDir::new(&self.root) {
            let entry =
                entry.map_err(|e| format!("Failed to walk {}: {}", self.root.display(), e))?;
            if entry.file_type().is_file() {
                let metadata = entry
                    .metadata()
                    .map_err(|e| format!("Failed to stat {}: {}", entry.path().display(), e))?;
                total += metadata.len();
            }
        }
        Ok(total)
    }
}

/// Measures the store through `docker exec` in the registry container.
pub struct ContainerProbe {
    container: String,
    storage_path: String,
}

impl ContainerProbe {
    pub fn new(container: impl Into<String>, storage_path: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            storage_path: storage_path.into(),
        }
    }

    fn ensure_running(&self) -> Result<(), String> {
        let mut command = Command::new("docker");
        command.args(["inspect", "-f", "{{.State.Running}}", &self.container]);

        let output = run_with_timeout(command, Duration::from_secs(10))?;
        if !output.status.success() {
            return Err(format!("Container {} not found", self.container));
        }

        let state = String::from_utf8_lossy(&output.stdout);
        if state.trim() != "true" {
            return Err(format!("Container {} is not running", self.container));
        }

        Ok(())
    }
}

impl StorageProbe for ContainerProbe {
    fn measure(&self) -> Result<u64, String> {
        self.ensure_running()?;

        let mut command = Command::new("docker");
        command.args(["exec", &self.container, "du", "-sb", &self.storage_path]);

        let output = run_with_timeout(command, Duration::from_secs(60))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "du failed in container {}: {}",
                self.container,
                stderr.trim()
            ));
        }

        parse_du_size(&String::from_utf8_lossy(&output.stdout))
    }

    fn settle(&self) {
        let mut command = Command::new("docker");
        command.args(["exec", &self.container, "sync"]);
        let _ = run_with_timeout(command, Duration::from_secs(10));
    }
}

/// Reclaims blob space after manifests have been deleted.
pub trait GarbageCollector: Send + Sync {
    fn collect(&self, dry_run: bool) -> Result<(), String>;
}

/// Runs the registry's bundled garbage collector through `docker exec`.
pub struct DockerCollector {
    container: String,
    config_path: String,
}

impl DockerCollector {
    pub fn new(container: impl Into<String>, config_path: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            config_path: config_path.into(),
        }
    }
}

impl GarbageCollector for DockerCollector {
    fn collect(&self, dry_run: bool) -> Result<(), String> {
        let mut command = Command::new("docker");
        command.args([
            "exec",
            &self.container,
            "registry",
            "garbage-collect",
            &self.config_path,
            "--delete-untagged",
        ]);
        if dry_run {
            command.arg("--dry-run");
        }

        // The collector walks the whole store, so no timeout is applied.
        tracing::debug!(container = %self.container, "running garbage collection");
        let output = command
            .output()
            .map_err(|e| format!("Failed to run garbage collection: {}", e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            tracing::debug!("garbage collector stdout:\n{}", stdout.trim());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::warn!("garbage collector stderr: {}", stderr.trim());
        }

        if output.status.success() {
            Ok(())
        } else {
            Err(format!("Garbage collection exited with {}", output.status))
        }
    }
}

/// Picks the storage probe for the configured paths.
///
/// A host-visible storage path wins when it exists; otherwise measurement
/// goes through the container. With no container configured there is
/// nothing to measure.
pub fn select_probe(settings: &Settings) -> Option<Box<dyn StorageProbe>> {
    if let Some(host) = &settings.paths.host_storage {
        if Path::new(host).exists() {
            return Some(Box::new(PathProbe::new(host)));
        }
        tracing::debug!(
            path = %host,
            "host storage path not present, measuring through container"
        );
    }

    if settings.registry.container.is_empty() {
        return None;
    }

    Some(Box::new(ContainerProbe::new(
        &settings.registry.container,
        &settings.paths.storage,
    )))
}

/// Parses the byte count out of `du -sb` output.
fn parse_du_size(output: &str) -> Result<u64, String> {
    let first = output
        .split_whitespace()
        .next()
        .ok_or_else(|| "du returned empty output".to_string())?;

    first
        .parse::<u64>()
        .map_err(|e| format!("Failed to parse du output {:?}: {}", first, e))
}

/// Runs a command, killing it when it exceeds the timeout.
fn run_with_timeout(mut command: Command, timeout: Duration) -> Result<Output, String> {
    command.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = command
        .spawn()
        .map_err(|e| format!("Failed to spawn {:?}: {}", command.get_program(), e))?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => {
                return child
                    .wait_with_output()
                    .map_err(|e| format!("Failed to collect command output: {}", e));
            }
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(format!("Command timed out after {}s", timeout.as_secs()));
            }
            Ok(None) => std::thread::sleep(Duration::from_millis(50)),
            Err(e) => return Err(format!("Failed to poll command: {}", e)),
        }
    }
}
