//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use tessera::config::TesseraConfig;
use tessera::db::{self, migrations::CURRENT_SCHEMA_VERSION};

/// Run database diagnostics and print a health report.
pub fn doctor(config: &TesseraConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `tessera add` or `tessera serve` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("Tessera Health Report");
    println!("=====================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {} (expected {CURRENT_SCHEMA_VERSION})", report.schema_version);
    println!();
    println!("Embedding model:");
    println!("  Provider:        {}", config.embedding.provider);
    println!("  Stored:          {}", report.embedding_model.as_deref().unwrap_or("(not set)"));
    println!("  Configured:      {}", config.embedding.model);
    if let Some(ref stored) = report.embedding_model {
        if stored != &config.embedding.model {
            println!("  WARNING: model mismatch! New vectors will not be comparable to stored ones.");
        } else {
            println!("  Status:          OK (match)");
        }
    }
    let cache_dir = tessera::config::expand_tilde(&config.embedding.cache_dir);
    let model_present = cache_dir.join("model.onnx").exists() && cache_dir.join("tokenizer.json").exists();
    println!(
        "  Model files:     {}",
        if model_present { "present" } else { "missing (run `tessera model download`)" }
    );
    println!();
    println!("Row counts:");
    println!("  Contexts:        {}", report.context_count);
    println!("  Unassigned:      {}", report.unassigned_count);
    println!("  Projects:        {}", report.project_count);
    println!("  Sprints:         {}", report.sprint_count);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db {}", db_path.display());
        println!("  2. Or run `sqlite3 {} .recover` into a fresh file", db_path.display());
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
