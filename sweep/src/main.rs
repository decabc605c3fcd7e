use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use libsweep::{Client, Resolver};

mod cleanup;
mod config;
mod format;
mod storage;

use cleanup::{CleanupRun, RunSummary};
use config::Settings;
use storage::{DockerCollector, GarbageCollector};

/// Sweep - Docker Registry retention cleanup
///
/// Deletes tags older than the configured retention window from a private
/// registry, runs garbage collection, and reports the space freed.
#[derive(Parser, Debug)]
#[command(name = "sweep")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "SWEEP_CONFIG")]
    config: Option<PathBuf>,

    /// Classify and report without deleting anything
    #[arg(long)]
    dry_run: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Control colored output: auto, always, never
    #[arg(long, default_value = "auto")]
    color: String,
}

/// Installs the diagnostic subscriber. The report owns stdout, so
/// diagnostics go to stderr; `SWEEP_LOG` or `RUST_LOG` override the
/// verbosity flag.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_env("SWEEP_LOG")
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let reporter = format::create_reporter(format::ColorChoice::from(cli.color.as_str()));

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            reporter.error(&format!("Error: {}", e));
            std::process::exit(1);
        }
    };

    let client = match Client::new(&settings.registry.url, settings.credentials()) {
        Ok(client) => client,
        Err(e) => {
            reporter.error(&format!("Error: {}", e));
            std::process::exit(1);
        }
    };

    let probe = storage::select_probe(&settings);
    let collector = (!settings.registry.container.is_empty()).then(|| {
        Box::new(DockerCollector::new(
            &settings.registry.container,
            &settings.paths.config,
        )) as Box<dyn GarbageCollector>
    });

    let run = CleanupRun {
        resolver: Resolver::new(client.clone()),
        registry_url: client.registry_url().to_string(),
        client,
        policy: settings.policy(),
        reporter,
        probe,
        collector,
        age_reference: settings.cleanup.age_reference,
        dry_run: cli.dry_run,
    };

    let mut summary = RunSummary::default();
    if run.run(&mut summary).is_err() {
        std::process::exit(1);
    }
}
