use anyhow::Result;

use dotspark::config::DotsparkConfig;
use dotspark::App;

/// Classify and store a thought from the terminal.
pub async fn add(config: &DotsparkConfig, text: &str, user_id: &str) -> Result<()> {
    let app = App::from_config(config)?;
    let stored = app.store_thought(user_id, text).await?;

    println!(
        "Stored {} {} (confidence: {})",
        stored.structure.kind, stored.structure.id, stored.classification.confidence
    );
    println!("  {}", stored.structure.heading);
    if !stored.indexed {
        println!("  (not indexed for similarity search)");
    }

    Ok(())
}
