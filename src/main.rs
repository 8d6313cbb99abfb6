//! Reclaim - find, check, repair and copy recoverable files.

mod cli;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use humansize::{format_size, BINARY};
use reclaim::{
    CancelToken, CatalogSource, CheckBatch, EngineConfig, Handle, OutcomeStatus, RecoveryEngine,
    ScanOutcome, ScanProgress, SourceSet,
};
use reclaim_io::{JsonCatalog, LocalStorage, LocalTree};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands, ProgressReporter, SourceArgs};

const PROGRESS_CHANNEL_CAPACITY: usize = 256;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "reclaim=debug,reclaim_core=debug,reclaim_io=debug"
    } else {
        "reclaim=warn,reclaim_core=warn,reclaim_io=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_toml_file(path)?,
        None => EngineConfig::default(),
    };

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("Failed to set Ctrl+C handler")?;

    let engine = RecoveryEngine::with_config(Arc::new(LocalStorage::new()), config);

    match &cli.command {
        Commands::Scan { sources } => {
            let outcome = scan(&engine, sources, &cancel, cli.json)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome.items)?);
            } else {
                print_items(&outcome);
            }
        }
        Commands::Check {
            sources,
            damaged_only,
        } => {
            let outcome = scan(&engine, sources, &cancel, cli.json)?;
            let batch = check(&engine, &outcome, &cancel, cli.json);
            if cli.json {
                let shown: Vec<_> = batch
                    .outcomes
                    .iter()
                    .filter(|o| !damaged_only || o.report.is_some())
                    .collect();
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                print_check(&batch, *damaged_only);
            }
        }
        Commands::Recover {
            sources,
            output,
            mode,
            damaged_only,
            report,
        } => {
            let outcome = scan(&engine, sources, &cancel, cli.json)?;
            let items = if *damaged_only {
                check(&engine, &outcome, &cancel, cli.json)
                    .outcomes
                    .into_iter()
                    .filter(|o| o.report.is_some())
                    .map(|o| o.item)
                    .collect()
            } else {
                outcome.items
            };

            std::fs::create_dir_all(output)
                .with_context(|| format!("Failed to create {}", output.display()))?;
            let dest = LocalStorage::handle_for(output.canonicalize()?);

            let reporter = if cli.json {
                ProgressReporter::hidden()
            } else {
                ProgressReporter::for_recovery(items.len() as u64)
            };
            let result = engine.recover_all(
                &items,
                &dest,
                (*mode).into(),
                |done, _| reporter.set_position(done as u64),
                cancel.predicate(),
            )?;
            reporter.finish(&result.summary());

            if let Some(path) = report {
                std::fs::write(path, result.to_json()?)
                    .with_context(|| format!("Failed to write report to {}", path.display()))?;
            }
            if cli.json {
                println!("{}", result.to_json()?);
            } else {
                for outcome in &result.outcomes {
                    if let OutcomeStatus::Failed { reason } = &outcome.status {
                        println!("{:<9} {:<30} {}", outcome.kind.name(), outcome.name, reason);
                    }
                }
                println!("\n{}", result.summary());
            }
        }
        Commands::Untrash { catalog, paths } => {
            let source = JsonCatalog::open(catalog)
                .with_context(|| format!("Failed to open catalog {}", catalog.display()))?;
            let base = catalog.parent().unwrap_or(Path::new(""));
            let handles: Vec<Handle> = paths
                .iter()
                .map(|p| {
                    if p.is_absolute() {
                        LocalStorage::handle_for(p)
                    } else {
                        LocalStorage::handle_for(base.join(p))
                    }
                })
                .collect();
            let restored = source.untrash(&handles)?;
            println!("Restored {} of {} records", restored, handles.len());
        }
    }

    Ok(())
}

struct OpenedSources {
    catalogs: Vec<JsonCatalog>,
    trees: Vec<LocalTree>,
}

impl OpenedSources {
    fn open(args: &SourceArgs) -> Result<Self> {
        let catalogs = args
            .catalogs
            .iter()
            .map(|p| {
                JsonCatalog::open(p).with_context(|| format!("Failed to open catalog {}", p.display()))
            })
            .collect::<Result<Vec<_>>>()?;
        let trees = args
            .trees
            .iter()
            .map(|p| LocalTree::new(p).with_context(|| format!("Failed to open tree {}", p.display())))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { catalogs, trees })
    }

    fn source_set(&self) -> SourceSet<'_> {
        let mut set = SourceSet::new();
        for catalog in &self.catalogs {
            set = set.catalog(catalog);
        }
        for tree in &self.trees {
            set = set.tree(tree);
        }
        set
    }
}

/// Runs the scan on a worker thread while this thread drives the progress bar.
fn scan(engine: &RecoveryEngine, args: &SourceArgs, cancel: &CancelToken, quiet: bool) -> Result<ScanOutcome> {
    let opened = OpenedSources::open(args)?;
    let sources = opened.source_set();
    if sources.is_empty() {
        bail!("No sources given; pass --catalog or --tree");
    }
    let options = args.scan_options();
    let reporter = if quiet {
        ProgressReporter::hidden()
    } else {
        ProgressReporter::for_scan()
    };

    let (tx, rx) = crossbeam_channel::bounded::<ScanProgress>(PROGRESS_CHANNEL_CAPACITY);
    let is_cancelled = cancel.predicate();
    let outcome = thread::scope(|s| {
        let worker = s.spawn(move || {
            engine.scan(
                &sources,
                &options,
                |progress| {
                    let _ = tx.send(progress);
                },
                is_cancelled,
            )
        });
        for progress in rx.iter() {
            reporter.update_scan(&progress);
        }
        worker.join()
    })
    .map_err(|_| anyhow!("Scan worker panicked"))?;

    reporter.finish(&format!(
        "Found {} items ({} duplicates merged){}",
        outcome.items.len(),
        outcome.merged,
        if outcome.cancelled { ", cancelled" } else { "" }
    ));
    for failure in &outcome.failures {
        eprintln!("Warning: source '{}' failed: {}", failure.source, failure.reason);
    }
    Ok(outcome)
}

fn check(engine: &RecoveryEngine, outcome: &ScanOutcome, cancel: &CancelToken, quiet: bool) -> CheckBatch {
    let reporter = if quiet {
        ProgressReporter::hidden()
    } else {
        ProgressReporter::for_check(outcome.items.len() as u64)
    };
    let batch = engine.check_all(
        &outcome.items,
        |done, _| reporter.set_position(done),
        cancel.predicate(),
    );
    reporter.finish(&format!("{} damaged", batch.damaged().count()));
    batch
}

fn print_items(outcome: &ScanOutcome) {
    println!("{:<9} {:>10} {:<5} NAME", "KIND", "SIZE", "TRASH");
    println!("{}", "-".repeat(50));
    for item in &outcome.items {
        println!(
            "{:<9} {:>10} {:<5} {}",
            item.kind().name(),
            format_size(item.size(), BINARY),
            if item.is_trashed() { "yes" } else { "" },
            item.name()
        );
    }
}

fn print_check(batch: &CheckBatch, damaged_only: bool) {
    println!("{:<9} {:<8} {:<30} REASON", "KIND", "FIXABLE", "NAME");
    println!("{}", "-".repeat(70));
    for outcome in &batch.outcomes {
        match &outcome.report {
            Some(report) => println!(
                "{:<9} {:<8} {:<30} {}",
                outcome.item.kind().name(),
                if report.fixable { "yes" } else { "no" },
                outcome.item.name(),
                report.reason
            ),
            None if !damaged_only => println!(
                "{:<9} {:<8} {:<30} ok",
                outcome.item.kind().name(),
                "",
                outcome.item.name()
            ),
            None => {}
        }
    }
}
