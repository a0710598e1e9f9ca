use anyhow::Result;

use dotspark::config::DotsparkConfig;
use dotspark::retrieval::RetrievalOptions;
use dotspark::App;

use super::preview;

/// Run a retrieval from the terminal and print what each source found.
pub async fn search(config: &DotsparkConfig, query: &str, user_id: &str) -> Result<()> {
    let app = App::from_config(config)?;

    let options = RetrievalOptions {
        limit: config.retrieval.default_limit,
        ..RetrievalOptions::default()
    };
    let result = app.retriever.retrieve(query, user_id, &options).await?;

    println!(
        "Query classified as {} (confidence: {})\n",
        result.cognitive_structure.kind, result.cognitive_structure.confidence
    );

    if result.related_content.is_empty() && result.similar_structures.is_empty() {
        println!("No results found.");
    }

    if !result.related_content.is_empty() {
        println!("Related content ({}):", result.related_content.len());
        for (i, hit) in result.related_content.iter().enumerate() {
            println!("  {}. [{}] {} (score: {:.4})", i + 1, hit.content_type, hit.id, hit.score);
            println!("     {}", preview(&hit.content, 120));
        }
        println!();
    }

    if !result.similar_structures.is_empty() {
        println!("Similar structures ({}):", result.similar_structures.len());
        for (i, scored) in result.similar_structures.iter().enumerate() {
            let s = &scored.structure;
            println!(
                "  {}. [{}] {} (similarity: {:.4})",
                i + 1,
                s.kind,
                s.heading,
                scored.similarity
            );
            println!("     {}", preview(&s.body, 120));
        }
        println!();
    }

    let insights = &result.contextual_insights;
    for (label, items) in [
        ("Insights", &insights.insights),
        ("Connections", &insights.connections),
        ("Next steps", &insights.next_steps),
    ] {
        if !items.is_empty() {
            println!("{label}:");
            for item in items {
                println!("  - {item}");
            }
        }
    }

    Ok(())
}
