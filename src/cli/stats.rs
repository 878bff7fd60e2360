use anyhow::Result;

use tessera::config::TesseraConfig;
use tessera::knowledge::stats::knowledge_stats;

/// Display knowledge base statistics in the terminal.
pub fn stats(config: &TesseraConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let store = super::open_store(config)?;
    let response = knowledge_stats(&store)?;

    println!("Knowledge Base Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total contexts:      {}", response.total_contexts);
    println!("  Unassigned:          {}", response.unassigned_contexts);
    println!("  With embedding:      {}", response.embedded_contexts);
    println!();

    println!("By Project:");
    if response.projects.is_empty() {
        println!("  (none)");
    }
    for project in &response.projects {
        println!(
            "  {:<24} {:>6} contexts  {:>3} sprints",
            project.name, project.contexts, project.sprints
        );
    }
    println!();

    let db_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);
    println!("Database size:         {db_size} bytes");

    Ok(())
}
