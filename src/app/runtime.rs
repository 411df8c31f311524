use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use harvester_core::{
    BytesArtifactProducer, CheckpointStore, DownloadVerifier, HarvestOrchestrator, ManifestSource,
};
use tracing::{debug, info, warn};

use crate::app::{config_runtime, exit_handler, terminal};
use crate::cli::Args;
use crate::{ProcessExit, app_config, output};

pub(crate) async fn run_harvester() -> Result<ProcessExit> {
    let args = Args::parse();

    let loaded = app_config::load_config(args.config.as_deref())?;
    let file_config = loaded.config.as_ref();

    let default_level = config_runtime::resolve_default_log_level(&args, file_config);
    let force_cli_log_level = args.quiet || args.verbose > 0;
    let no_color = terminal::is_no_color_requested(&args);
    terminal::init_tracing(default_level, force_cli_log_level, no_color);

    debug!(config = ?loaded.path, "CLI arguments parsed");
    info!("Harvester starting");

    let config = config_runtime::resolve_config(&args, file_config);

    let source = Arc::new(
        ManifestSource::load(&args.source)
            .with_context(|| format!("Failed to load source '{}'", args.source.display()))?,
    );
    let producer = BytesArtifactProducer::new(source.clone());
    let verifier = DownloadVerifier::new(Arc::new(producer))
        .with_timeout(Duration::from_secs(config.verify_timeout_secs))
        .with_min_bytes(config.min_artifact_bytes);
    let checkpoint = CheckpointStore::open_in(&config.log_dir);
    debug!(checkpoint = %checkpoint.path().display(), "Checkpoint loaded");

    let options = config.harvest_options(args.collection.clone());
    let mut orchestrator = HarvestOrchestrator::new(source, verifier, checkpoint, options);

    if args.dry_run {
        let plan = orchestrator.plan().await;
        output::print_plan(&plan);
        return Ok(if plan.listing_error.is_some() {
            ProcessExit::Failure
        } else {
            ProcessExit::Success
        });
    }

    let interrupted = orchestrator.interrupt_handle();
    spawn_interrupt_listener(Arc::clone(&interrupted));

    let report = orchestrator
        .run()
        .await
        .context("Harvest aborted before any collection was processed")?;

    output::print_run_summary(&report);

    if report.interrupted || interrupted.load(Ordering::SeqCst) {
        warn!(
            downloaded = report.downloaded(),
            "Interrupted. Run again to resume."
        );
        return Ok(ProcessExit::Failure);
    }

    Ok(exit_handler::determine_exit_outcome(&report))
}

/// What a Ctrl-C does given how many were already received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterruptAction {
    /// Finish the current item, then stop.
    FinishCurrentItem,
    /// Leave immediately.
    Abort,
}

fn on_interrupt_signal(flag: &AtomicBool) -> InterruptAction {
    if flag.swap(true, Ordering::SeqCst) {
        InterruptAction::Abort
    } else {
        InterruptAction::FinishCurrentItem
    }
}

fn spawn_interrupt_listener(flag: Arc<AtomicBool>) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match on_interrupt_signal(&flag) {
                InterruptAction::FinishCurrentItem => {
                    warn!("Interrupt received, finishing current item. Press Ctrl-C again to abort.");
                }
                InterruptAction::Abort => {
                    warn!("Second interrupt received, aborting");
                    std::process::exit(i32::from(ProcessExit::Failure.code()));
                }
            }
        }
    });
}
