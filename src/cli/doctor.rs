//! CLI `doctor` command: database diagnostics and provider configuration.

use anyhow::{Context, Result};

use dotspark::config::{api_key_from_env, DotsparkConfig};
use dotspark::db;

/// Print a health report for the database and configured providers.
pub fn doctor(config: &DotsparkConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    println!("dotspark Health Report");
    println!("======================");
    println!();

    println!("Completion:        {} ({})", config.completion.provider, config.completion.model);
    println!("  API key:         {}", key_status(&config.completion.provider, &config.completion.api_key_env));
    println!("Embedding:         {} ({})", config.embedding.provider, config.embedding.model);
    println!("  API key:         {}", key_status(&config.embedding.provider, &config.embedding.api_key_env));
    println!();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `dotspark serve` or `dotspark add` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path, config.embedding.dimensions)
        .context("failed to open database (may be corrupt)")?;
    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!("sqlite-vec:        {}", report.sqlite_vec_version);
    println!();
    println!("Vector dimensions:");
    match report.vector_dimensions {
        Some(stored) => println!("  Stored:          {stored}"),
        None => println!("  Stored:          (not set)"),
    }
    println!("  Configured:      {}", config.embedding.dimensions);
    if let Some(stored) = report.vector_dimensions {
        if stored != config.embedding.dimensions {
            println!("  WARNING: dimension mismatch! Similarity search will fail until the database is rebuilt.");
        } else {
            println!("  Status:          OK (match)");
        }
    }
    println!();
    println!("Row counts:");
    println!("  Structures:      {}", report.structure_count);
    println!("  Vector records:  {}", report.vector_count);
    println!("  Conversations:   {}", report.conversation_count);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
    }

    Ok(())
}

fn key_status(provider: &str, env: &str) -> String {
    if provider == "none" {
        "not needed".to_string()
    } else if api_key_from_env(env).is_some() {
        format!("set (${env})")
    } else {
        format!("MISSING (${env}), running on fallbacks")
    }
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
