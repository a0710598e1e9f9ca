mod helpers;

use std::sync::Arc;

use dotspark::cognition::{Classifier, StructureKind};
use dotspark::config::RetrievalConfig;
use dotspark::retrieval::{RankFilters, RetrievalOptions, RetrievedItem, Retriever};
use dotspark::store::{
    NewStructure, SimilaritySearch, SqliteStructureStore, SqliteVectorStore, StructureStore,
};
use dotspark::EngineError;
use helpers::{FailingProvider, FailingSearch, WordBucketEmbedding};

fn structure(kind: StructureKind, heading: &str, body: &str) -> NewStructure {
    NewStructure {
        kind,
        heading: heading.into(),
        body: body.into(),
        goals: None,
        purpose: None,
        timeline: None,
    }
}

#[tokio::test]
async fn everything_failing_still_returns_a_result() {
    let db = helpers::shared_db();
    let retriever = Retriever::new(
        Classifier::new(Some(Arc::new(FailingProvider))),
        Some(Arc::new(FailingSearch)),
        Some(Arc::new(SqliteStructureStore::new(db))),
        RetrievalConfig::default(),
    );

    let result = retriever
        .retrieve("how do I focus better", "alice", &RetrievalOptions::default())
        .await
        .unwrap();

    assert!(result.related_content.is_empty());
    assert!(result.similar_structures.is_empty());
    assert!(!result.contextual_insights.is_empty());
    assert!(result.contextual_insights.insights[0].starts_with("This "));
    assert_eq!(result.cognitive_structure.confidence, 60);
}

#[tokio::test]
async fn own_note_is_found_among_many_nearer_foreign_records() {
    let db = helpers::shared_db();
    let vectors = SqliteVectorStore::new(Arc::clone(&db), Arc::new(WordBucketEmbedding));

    let text = "silence helps me think better";
    vectors.store(helpers::record("alice", "dot", text)).await.unwrap();
    for _ in 0..50 {
        vectors.store(helpers::record("alice", "conversation", text)).await.unwrap();
        vectors.store(helpers::record("bob", "dot", text)).await.unwrap();
    }

    let retriever = Retriever::new(
        Classifier::offline(),
        Some(Arc::new(vectors)),
        None,
        RetrievalConfig::default(),
    );
    let options = RetrievalOptions {
        include_database: false,
        ..RetrievalOptions::default()
    };
    let result = retriever.retrieve(text, "alice", &options).await.unwrap();

    assert_eq!(result.related_content.len(), 1);
    assert_eq!(result.related_content[0].user_id, "alice");
    assert_eq!(result.related_content[0].content_type, "dot");
}

#[tokio::test]
async fn results_never_cross_users() {
    let db = helpers::shared_db();
    let vectors = SqliteVectorStore::new(Arc::clone(&db), Arc::new(WordBucketEmbedding));
    let structures = SqliteStructureStore::new(Arc::clone(&db));

    let text = "silence helps me think better";
    for user in ["alice", "bob"] {
        vectors.store(helpers::record(user, "dot", text)).await.unwrap();
        structures
            .insert(user, structure(StructureKind::Dot, "Silence", text))
            .await
            .unwrap();
    }

    let retriever = Retriever::new(
        Classifier::offline(),
        Some(Arc::new(vectors)),
        Some(Arc::new(structures)),
        RetrievalConfig::default(),
    );
    let result = retriever
        .retrieve(text, "alice", &RetrievalOptions::default())
        .await
        .unwrap();

    assert_eq!(result.related_content.len(), 1);
    assert!(result.related_content.iter().all(|hit| hit.user_id == "alice"));
    assert!(result.related_content[0].score > 0.99);
    assert_eq!(result.similar_structures.len(), 1);
    assert!(result.similar_structures.iter().all(|s| s.structure.user_id == "alice"));
}

#[tokio::test]
async fn keyword_search_runs_when_similarity_finds_nothing() {
    let db = helpers::shared_db();
    let structures = SqliteStructureStore::new(Arc::clone(&db));
    structures
        .insert("alice", structure(StructureKind::Dot, "Silence", "silence helps me think"))
        .await
        .unwrap();

    let retriever = Retriever::new(
        Classifier::offline(),
        Some(Arc::new(FailingSearch)),
        Some(Arc::new(structures)),
        RetrievalConfig::default(),
    );
    let options = RetrievalOptions {
        include_database: false,
        ..RetrievalOptions::default()
    };
    let result = retriever.retrieve("silence", "alice", &options).await.unwrap();

    assert!(result.related_content.is_empty());
    assert_eq!(result.similar_structures.len(), 1);
    assert!(result.similar_structures[0].similarity > 0.0);
}

#[tokio::test]
async fn keyword_hits_are_sorted_and_limited() {
    let db = helpers::shared_db();
    let structures = SqliteStructureStore::new(Arc::clone(&db));
    for (heading, body) in [
        ("Morning", "walk every morning"),
        ("Morning walk", "walk every morning before work"),
        ("Evening walk", "walk after dinner"),
    ] {
        structures
            .insert("alice", structure(StructureKind::Dot, heading, body))
            .await
            .unwrap();
    }

    let retriever = Retriever::new(
        Classifier::offline(),
        None,
        Some(Arc::new(structures)),
        RetrievalConfig::default(),
    );
    let options = RetrievalOptions {
        limit: 2,
        ..RetrievalOptions::default()
    };
    let result = retriever
        .retrieve("walk every morning", "alice", &options)
        .await
        .unwrap();

    assert_eq!(result.similar_structures.len(), 2);
    assert!(result.similar_structures[0].similarity >= result.similar_structures[1].similarity);
}

#[tokio::test]
async fn enhanced_search_ranks_preferred_types_first() {
    let db = helpers::shared_db();
    let structures = SqliteStructureStore::new(Arc::clone(&db));
    structures
        .insert(
            "alice",
            structure(StructureKind::Wheel, "Marathon training plan", "run a marathon by june"),
        )
        .await
        .unwrap();
    structures
        .insert(
            "alice",
            structure(StructureKind::Dot, "Silence thoughts", "silence helps me think"),
        )
        .await
        .unwrap();

    let retriever = Retriever::new(
        Classifier::offline(),
        None,
        Some(Arc::new(structures)),
        RetrievalConfig::default(),
    );
    let filters = RankFilters {
        types: vec!["wheel".into()],
    };
    let result = retriever
        .enhanced_search("marathon training silence", "alice", &filters)
        .await
        .unwrap();

    let ranked = &result.ranked_content;
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].item.item_type(), "wheel");
    assert!(matches!(ranked[0].item, RetrievedItem::Structure(_)));
    assert!(ranked[0].match_reasons.contains(&"Recent content".to_string()));
    assert!(ranked
        .windows(2)
        .all(|w| w[0].relevance_score >= w[1].relevance_score));
    assert!(ranked
        .iter()
        .all(|r| (0.0..=1.0).contains(&r.relevance_score)));
}

#[tokio::test]
async fn history_feeds_insight_generation() {
    let db = helpers::shared_db();
    let structures = SqliteStructureStore::new(Arc::clone(&db));
    structures
        .insert("alice", structure(StructureKind::Dot, "Silence", "silence helps me think"))
        .await
        .unwrap();
    let recent = structures.recent("alice", 5).await.unwrap();
    assert_eq!(recent.len(), 1);

    let provider = helpers::ScriptedProvider::new(serde_json::json!({
        "insights": ["You keep returning to quiet"],
        "nextSteps": ["Block an hour of silence"]
    }));
    let retriever = Retriever::new(
        Classifier::new(Some(provider.clone())),
        None,
        Some(Arc::new(structures)),
        RetrievalConfig::default(),
    );
    let result = retriever
        .retrieve("quiet time", "alice", &RetrievalOptions::default())
        .await
        .unwrap();

    assert_eq!(result.contextual_insights.insights, vec!["You keep returning to quiet"]);
    let prompts = provider.prompts.lock().unwrap();
    assert!(prompts.iter().any(|p| p.contains("Silence: silence helps me think")));
}

#[tokio::test]
async fn input_is_validated_owner_first() {
    let retriever = Retriever::new(Classifier::offline(), None, None, RetrievalConfig::default());
    let options = RetrievalOptions::default();

    assert!(matches!(
        retriever.retrieve("", "", &options).await,
        Err(EngineError::Unauthorized(_))
    ));
    assert!(matches!(
        retriever.retrieve("  ", "alice", &options).await,
        Err(EngineError::InvalidInput(_))
    ));
}
