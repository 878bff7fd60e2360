//! CLI `migrate` command: file legacy flat contexts into the hierarchy.
//!
//! Ctrl-C stops the run between contexts; re-running picks up the rest.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;

use tessera::config::TesseraConfig;
use tessera::knowledge::classify::{Classifier, MappingClassifier, TagClassifier};
use tessera::knowledge::migrate::{migrate_contexts, MigrationOptions, MigrationResult, RunState};

pub enum Strategy {
    Mapping(PathBuf),
    Tags {
        project_prefix: String,
        sprint_prefix: String,
    },
}

pub struct MigrateArgs {
    pub strategy: Strategy,
    pub dry_run: bool,
    pub relink: bool,
    pub json: bool,
}

pub async fn migrate(config: &TesseraConfig, args: MigrateArgs) -> Result<()> {
    let classifier: Box<dyn Classifier> = match args.strategy {
        Strategy::Mapping(path) => {
            let mapping = MappingClassifier::load(&path)?;
            println!("Loaded {} mapping entries from {}", mapping.len(), path.display());
            Box::new(mapping)
        }
        Strategy::Tags {
            project_prefix,
            sprint_prefix,
        } => Box::new(TagClassifier::with_prefixes(project_prefix, sprint_prefix)),
    };

    let store = super::open_store(config)?;
    let cancel = Arc::new(AtomicBool::new(false));
    let options = MigrationOptions {
        dry_run: args.dry_run,
        relink: args.relink,
        link_config: config.linking.link_config()?,
        cancel: Some(Arc::clone(&cancel)),
    };

    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current context");
            cancel.store(true, Ordering::Relaxed);
        }
    });

    let result = tokio::task::spawn_blocking(move || -> Result<MigrationResult> {
        Ok(migrate_contexts(&store, classifier.as_ref(), &options)?)
    })
    .await??;
    watcher.abort();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_report(&result);
    }
    Ok(())
}

fn print_report(result: &MigrationResult) {
    let header = if result.dry_run { "Migration plan (dry run, nothing written)" } else { "Migration report" };
    println!("{header}");
    println!("{}", "=".repeat(header.len()));
    println!("  Considered:        {}", result.total());
    println!("  Migrated:          {}", result.migrated);
    println!("  Skipped:           {}", result.skipped);
    println!("  Failed:            {}", result.failed.len());
    if result.pending > 0 {
        println!("  Pending:           {}", result.pending);
    }
    println!("  Projects created:  {}", result.projects_created);
    println!("  Sprints created:   {}", result.sprints_created);
    if result.relinked > 0 {
        println!("  Relinked:          {}", result.relinked);
    }

    if !result.failed.is_empty() {
        println!();
        println!("Failures:");
        for failure in &result.failed {
            println!("  {}  {}", failure.context_id, failure.reason);
        }
    }

    if result.state == RunState::Cancelled {
        println!();
        println!("Cancelled. Re-run the same command to migrate the remaining contexts.");
    }
}
