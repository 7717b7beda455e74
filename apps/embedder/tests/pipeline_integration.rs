mod common;

use common::{CountingClient, MODEL, MemoryStore};
use embedder::{
    cache::MissReason,
    content::{TourRecord, TourStatus},
    pipeline::{
        EmbeddingPipeline, GateSkip, LocaleOutcome, Operation, PipelineSettings, SaveEvent,
        StalePolicy,
    },
};
use serde_json::{Value, json};
use std::sync::{Arc, atomic::Ordering};

fn settings() -> PipelineSettings {
    PipelineSettings {
        locales: vec!["sv".into(), "en".into(), "de".into()],
        fallback_locale: "sv".into(),
        credentials_present: true,
        parallel_locales: true,
        stale_policy: StalePolicy::Keep,
    }
}

fn pipeline_with(
    client: &Arc<CountingClient>,
    store: &Arc<MemoryStore>,
    settings: PipelineSettings,
) -> EmbeddingPipeline {
    EmbeddingPipeline::new(client.clone(), store.clone(), settings)
}

fn tour(value: Value) -> TourRecord {
    serde_json::from_value(value).unwrap()
}

fn old_town_walk(title_en: &str) -> TourRecord {
    tour(json!({
        "id": 1,
        "status": "published",
        "title": { "en": title_en, "sv": "", "de": "" },
        "shortDescription": { "en": "desc", "sv": "", "de": "" },
        "description": { "en": "long", "sv": "", "de": "" }
    }))
}

fn trilingual_tour() -> TourRecord {
    tour(json!({
        "id": 7,
        "title": { "sv": "Skärgårdstur", "en": "Archipelago Tour", "de": "Schärentour" },
        "shortDescription": { "sv": "Båt", "en": "Boat", "de": "Boot" },
        "description": {
            "root": {
                "type": "root",
                "children": [
                    { "type": "paragraph", "children": [ { "type": "text", "text": "Islands and seals." } ] }
                ]
            }
        },
        "highlights": [ { "name": { "sv": "Sälar", "en": "Seals" } } ],
        "categories": [ 3, { "title": "Nature" } ],
        "audience": [ "families", " " ]
    }))
}

#[tokio::test]
async fn old_town_walk_scenario() {
    let client = Arc::new(CountingClient::default());
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline_with(&client, &store, settings());

    let report = pipeline
        .run(&old_town_walk("Old Town Walk"), Operation::Create)
        .await;
    assert_eq!(client.total(), 1);
    assert_eq!(client.calls_for("en"), 1);
    assert_eq!(store.upserts(), 1);
    assert_eq!(store.row_count(), 1);
    assert!(store.hash_of(1, "en").is_some());
    assert_eq!(report.empty(), 2);
    assert_eq!(
        report.outcome("en"),
        Some(&LocaleOutcome::Stored {
            reason: MissReason::Missing
        })
    );

    let report = pipeline
        .run(&old_town_walk("Old Town Walk"), Operation::Update)
        .await;
    assert_eq!(client.total(), 1);
    assert_eq!(store.upserts(), 1);
    assert_eq!(report.outcome("en"), Some(&LocaleOutcome::Unchanged));

    let first_hash = store.hash_of(1, "en");
    let report = pipeline
        .run(&old_town_walk("Old Town Night Walk"), Operation::Update)
        .await;
    assert_eq!(client.total(), 2);
    assert_eq!(client.calls_for("en"), 2);
    assert_eq!(store.upserts(), 2);
    assert_eq!(store.row_count(), 1);
    assert_ne!(store.hash_of(1, "en"), first_hash);
    assert_eq!(
        report.outcome("en"),
        Some(&LocaleOutcome::Stored {
            reason: MissReason::Changed
        })
    );
    assert_eq!(report.outcome("sv"), Some(&LocaleOutcome::EmptyContent));
    assert_eq!(report.outcome("de"), Some(&LocaleOutcome::EmptyContent));
}

#[tokio::test]
async fn unchanged_content_is_embedded_once() {
    let client = Arc::new(CountingClient::default());
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline_with(&client, &store, settings());
    let record = trilingual_tour();

    pipeline.run(&record, Operation::Create).await;
    let report = pipeline.run(&record, Operation::Update).await;

    assert_eq!(client.total(), 3);
    assert_eq!(store.upserts(), 3);
    assert_eq!(report.unchanged(), 3);
    assert_eq!(report.stored(), 0);
}

#[tokio::test]
async fn change_in_one_locale_regenerates_only_that_locale() {
    let client = Arc::new(CountingClient::default());
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline_with(&client, &store, settings());
    let mut record = trilingual_tour();

    pipeline.run(&record, Operation::Create).await;
    let sv_before = store.hash_of(7, "sv");
    let de_before = store.hash_of(7, "de");
    let en_before = store.hash_of(7, "en");

    record.title = serde_json::from_value(json!({
        "sv": "Skärgårdstur",
        "en": "Archipelago Boat Tour",
        "de": "Schärentour"
    }))
    .unwrap();
    let report = pipeline.run(&record, Operation::Update).await;

    assert_eq!(client.calls_for("en"), 2);
    assert_eq!(client.calls_for("sv"), 1);
    assert_eq!(client.calls_for("de"), 1);
    assert_eq!(report.stored(), 1);
    assert_eq!(report.unchanged(), 2);
    assert_eq!(store.hash_of(7, "sv"), sv_before);
    assert_eq!(store.hash_of(7, "de"), de_before);
    assert_ne!(store.hash_of(7, "en"), en_before);
}

#[tokio::test]
async fn failure_in_one_locale_does_not_block_others() {
    let client = Arc::new(CountingClient::failing_on("en"));
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline_with(&client, &store, settings());

    let report = pipeline.run(&trilingual_tour(), Operation::Create).await;

    assert_eq!(report.failed(), 1);
    assert_eq!(report.stored(), 2);
    assert!(matches!(
        report.outcome("en"),
        Some(LocaleOutcome::Failed { .. })
    ));
    assert!(store.hash_of(7, "sv").is_some());
    assert!(store.hash_of(7, "de").is_some());
    assert!(store.hash_of(7, "en").is_none());
}

#[tokio::test]
async fn panic_in_one_locale_is_contained() {
    let client = Arc::new(CountingClient::panicking_on("de"));
    let store = Arc::new(MemoryStore::default());
    let mut settings = settings();
    settings.parallel_locales = false;
    let pipeline = pipeline_with(&client, &store, settings);

    let report = pipeline.run(&trilingual_tour(), Operation::Create).await;

    assert_eq!(
        report.outcome("de"),
        Some(&LocaleOutcome::Failed {
            error: "tokenizer blew up".to_string()
        })
    );
    assert_eq!(report.stored(), 2);
    assert_eq!(store.row_count(), 2);
}

#[tokio::test]
async fn empty_tour_makes_no_calls() {
    let client = Arc::new(CountingClient::default());
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline_with(&client, &store, settings());

    let record = tour(json!({
        "id": 9,
        "title": { "sv": "", "en": "", "de": "" },
        "shortDescription": { "sv": "", "en": "", "de": "" },
        "description": { "sv": "", "en": "", "de": "" },
        "audience": ["seniors"]
    }));
    let report = pipeline.run(&record, Operation::Create).await;

    assert_eq!(client.total(), 0);
    assert_eq!(store.upserts(), 0);
    assert_eq!(report.empty(), 3);
}

#[tokio::test]
async fn gates_short_circuit_before_any_call() {
    let client = Arc::new(CountingClient::default());
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline_with(&client, &store, settings());

    let report = pipeline.run(&trilingual_tour(), Operation::Delete).await;
    assert_eq!(report.skipped, Some(GateSkip::Deleted));

    let mut draft = trilingual_tour();
    draft.status = TourStatus::Draft;
    let report = pipeline.run(&draft, Operation::Update).await;
    assert_eq!(report.skipped, Some(GateSkip::Draft));

    let mut no_key = settings();
    no_key.credentials_present = false;
    let keyless = pipeline_with(&client, &store, no_key);
    let report = keyless.run(&trilingual_tour(), Operation::Create).await;
    assert_eq!(report.skipped, Some(GateSkip::MissingCredentials));
    assert!(report.locales.is_empty());

    assert_eq!(client.total(), 0);
    assert_eq!(store.upserts(), 0);
}

#[tokio::test]
async fn draft_status_alias_is_honored() {
    let client = Arc::new(CountingClient::default());
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline_with(&client, &store, settings());

    let record = tour(json!({ "id": 2, "_status": "draft", "title": "Harbour" }));
    let report = pipeline.run(&record, Operation::Create).await;

    assert_eq!(report.skipped, Some(GateSkip::Draft));
    assert_eq!(client.total(), 0);
}

#[tokio::test]
async fn failed_lookup_regenerates() {
    let client = Arc::new(CountingClient::default());
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline_with(&client, &store, settings());
    let record = trilingual_tour();

    pipeline.run(&record, Operation::Create).await;
    store.fail_lookups.store(true, Ordering::SeqCst);
    let report = pipeline.run(&record, Operation::Update).await;

    assert_eq!(client.total(), 6);
    assert_eq!(
        report.outcome("sv"),
        Some(&LocaleOutcome::Stored {
            reason: MissReason::LookupFailed
        })
    );
}

#[tokio::test]
async fn purge_policy_removes_rows_on_delete() {
    let client = Arc::new(CountingClient::default());
    let store = Arc::new(MemoryStore::default());
    let mut purge = settings();
    purge.stale_policy = StalePolicy::Purge;
    let pipeline = pipeline_with(&client, &store, purge);
    let record = trilingual_tour();

    pipeline.run(&record, Operation::Create).await;
    pipeline.run(&old_town_walk("Old Town Walk"), Operation::Create).await;
    assert_eq!(store.row_count(), 4);

    let report = pipeline.run(&record, Operation::Delete).await;
    assert_eq!(report.skipped, Some(GateSkip::Deleted));
    assert_eq!(report.purged, Some(3));
    assert_eq!(store.row_count(), 1);
    assert!(store.hash_of(1, "en").is_some());
}

#[tokio::test]
async fn keep_policy_leaves_rows_on_delete_and_draft() {
    let client = Arc::new(CountingClient::default());
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline_with(&client, &store, settings());
    let mut record = trilingual_tour();

    pipeline.run(&record, Operation::Create).await;
    let report = pipeline.run(&record, Operation::Delete).await;
    assert_eq!(report.purged, None);

    record.status = TourStatus::Draft;
    pipeline.run(&record, Operation::Update).await;

    assert_eq!(store.row_count(), 3);
}

#[tokio::test]
async fn after_save_returns_the_record_untouched() {
    let client = Arc::new(CountingClient::failing_on("sv"));
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline_with(&client, &store, settings());

    let event: SaveEvent = serde_json::from_value(json!({
        "doc": {
            "id": 11,
            "title": { "sv": "Slottet", "en": "The Palace" },
            "description": "A royal residence."
        },
        "operation": "create"
    }))
    .unwrap();
    let expected = event.document.clone();

    let returned = pipeline.after_save(event).await;

    assert_eq!(returned.id, expected.id);
    assert_eq!(returned.title, expected.title);
    assert_eq!(returned.description, expected.description);
    assert_eq!(client.total(), 3);
}

#[tokio::test]
async fn sequential_and_parallel_modes_agree() {
    let record = trilingual_tour();

    let mut hashes = Vec::new();
    for parallel in [true, false] {
        let client = Arc::new(CountingClient::default());
        let store = Arc::new(MemoryStore::default());
        let mut settings = settings();
        settings.parallel_locales = parallel;
        let pipeline = pipeline_with(&client, &store, settings);

        let report = pipeline.run(&record, Operation::Create).await;
        let locales: Vec<&str> = report.locales.iter().map(|r| r.locale.as_str()).collect();
        assert_eq!(locales, vec!["sv", "en", "de"]);

        hashes.push(
            ["sv", "en", "de"]
                .iter()
                .map(|locale| store.hash_of(7, locale))
                .collect::<Vec<_>>(),
        );
    }

    assert_eq!(hashes[0], hashes[1]);
}

#[tokio::test]
async fn stored_rows_record_the_model() {
    let client = Arc::new(CountingClient::default());
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline_with(&client, &store, settings());

    pipeline.run(&trilingual_tour(), Operation::Create).await;

    let rows = store.rows.lock().unwrap();
    assert!(rows.values().all(|row| row.model == MODEL));
}

#[tokio::test]
async fn report_serializes_per_locale_outcomes() {
    let client = Arc::new(CountingClient::default());
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline_with(&client, &store, settings());

    let report = pipeline
        .run(&old_town_walk("Old Town Walk"), Operation::Create)
        .await;
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["tour_id"], 1);
    assert_eq!(value["locales"][0]["locale"], "sv");
    assert_eq!(value["locales"][0]["outcome"], "empty_content");
    assert_eq!(value["locales"][1]["outcome"], "stored");
    assert_eq!(value["locales"][1]["reason"], "missing");
    assert!(value.get("skipped").is_none());
}
