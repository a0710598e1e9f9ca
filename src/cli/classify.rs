use anyhow::Result;

use dotspark::cognition::Classifier;
use dotspark::config::DotsparkConfig;

/// Classify `text` and print the result. Does not open the database.
pub async fn classify(config: &DotsparkConfig, text: &str) -> Result<()> {
    let provider = dotspark::provider::create_provider(&config.completion)?;
    if provider.is_none() {
        println!("(no completion provider configured, using fallback classification)\n");
    }
    let classifier = Classifier::new(provider);

    let structure = classifier.classify(text).await?;

    println!("Type:        {}", structure.kind);
    println!("Confidence:  {}", structure.confidence);
    println!("Reasoning:   {}", structure.reasoning);
    if !structure.key_indicators.is_empty() {
        println!("Indicators:  {}", structure.key_indicators.join(", "));
    }
    println!();
    println!("Heading:     {}", structure.suggested_structure.heading);
    if let Some(goals) = &structure.suggested_structure.goals {
        println!("Goals:       {goals}");
    }
    if let Some(timeline) = &structure.suggested_structure.timeline {
        println!("Timeline:    {timeline}");
    }
    if let Some(purpose) = &structure.suggested_structure.purpose {
        println!("Purpose:     {purpose}");
    }

    Ok(())
}
