mod common;

use serde_json::json;
use stat_ingest::{bulk::upload_bulk, store::InMemoryStore};

use common::today;

#[tokio::test]
async fn valid_elements_are_stored_and_invalid_ones_reported() {
    let store = InMemoryStore::new();
    let document = r#"[
        {"platform": "TikTok", "followers": 15300, "engagement_rate": 4.2, "views": 88000},
        {"platform": "Instagram", "followers": 2100},
        {"platform": "YouTube", "followers": "980", "engagement_rate": "2.5%", "date": "2025-10-19"}
    ]"#;

    let outcomes = upload_bulk(&store, document, today(), None).await;
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].success);
    assert_eq!(outcomes[0].platform, "TikTok");
    assert!(!outcomes[1].success);
    assert_eq!(outcomes[1].platform, "Instagram");
    assert!(
        outcomes[1]
            .error
            .as_deref()
            .unwrap()
            .contains("engagement_rate")
    );
    assert!(outcomes[2].success);

    let rows = store.rows("social_stats");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["platform"], json!("TikTok"));
    assert_eq!(rows[0]["snapshot_date"], json!(today().to_string()));
    assert_eq!(rows[0]["views"], json!(88000));
    assert_eq!(rows[0]["reach"], json!(0));
    assert_eq!(rows[1]["snapshot_date"], json!("2025-10-19"));
    assert_eq!(rows[1]["engagement_rate"], json!(2.5));
}

#[tokio::test]
async fn single_object_document_is_accepted() {
    let store = InMemoryStore::new();
    let outcomes = upload_bulk(
        &store,
        r#"{"platform": "TikTok", "followers": 1, "engagement_rate": 0.5}"#,
        today(),
        Some("demo_"),
    )
    .await;
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].success);
    assert_eq!(store.row_count("demo_social_stats"), 1);
}

#[tokio::test]
async fn same_platform_and_day_is_upserted_not_duplicated() {
    let store = InMemoryStore::new();
    let document = r#"[
        {"platform": "TikTok", "followers": 100, "engagement_rate": 1.0},
        {"platform": "TikTok", "followers": 120, "engagement_rate": 1.1}
    ]"#;
    let outcomes = upload_bulk(&store, document, today(), None).await;
    assert!(outcomes.iter().all(|o| o.success));

    let rows = store.rows("social_stats");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["followers"], json!(120));
}

#[tokio::test]
async fn malformed_document_yields_single_failure() {
    let store = InMemoryStore::new();
    let outcomes = upload_bulk(&store, "\"just a string\"", today(), None).await;
    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].success);
    assert_eq!(store.upsert_calls(), 0);

    let outcomes = upload_bulk(&store, "[1, {\"platform\": \"X\"}]", today(), None).await;
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| !o.success));
    assert_eq!(outcomes[0].platform, "unknown");
    assert_eq!(store.upsert_calls(), 0);
}

#[tokio::test]
async fn store_rejection_fails_each_element() {
    let store = InMemoryStore::new();
    store.reject_all("connection reset by peer");
    let outcomes = upload_bulk(
        &store,
        r#"[{"platform": "TikTok", "followers": 1, "engagement_rate": 0.5}]"#,
        today(),
        None,
    )
    .await;
    assert!(!outcomes[0].success);
    assert!(
        outcomes[0]
            .error
            .as_deref()
            .unwrap()
            .contains("connection reset by peer")
    );
}

#[tokio::test]
async fn float_follower_counts_are_accepted() {
    let store = InMemoryStore::new();
    let outcomes = upload_bulk(
        &store,
        r#"{"platform":"TikTok","followers":15300.0,"engagement_rate":4.2}"#,
        today(),
        None,
    )
    .await;
    assert!(outcomes[0].success, "{:?}", outcomes[0].error);
    assert_eq!(store.rows("social_stats")[0]["followers"], json!(15300));
}
