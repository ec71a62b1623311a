//! Relational/document consistency: document failures never fail a save, and
//! reads fall back to a projection of the relational store.

use std::sync::Arc;

use agency_portal_lib::models::{ApplicationIdentity, ChildCollection};
use agency_portal_lib::services::LoggingNotifier;
use serde_json::json;

use super::test_helpers::*;

/// (1) A failing document store does not fail the step
#[actix_rt::test]
async fn test_document_failure_is_swallowed() {
    let harness = create_harness_with(
        Arc::new(LoggingNotifier),
        Some(Arc::new(FailingDocumentStore)),
    )
    .await;

    let document = harness.save("contact", contact_body()).await.unwrap();
    let uuid = document.application_id().expect("patch carries applicationId");

    let record = harness.record(uuid).await;
    assert_eq!(record.last_step, 2);
    assert!(record.business_id.is_some());
    assert_eq!(document.get("businessName"), Some(&json!("Acme LLC")));

    // Later steps keep working against the relational store.
    harness
        .save_for(uuid, "claims", json!({"claims": [{"policy_type": "GL", "date": "2025-01-04"}]}))
        .await
        .unwrap();
    assert_eq!(harness.record(uuid).await.last_step, 7);
    assert_eq!(harness.backend.child_row_count(ChildCollection::Claims).await, 1);
}

/// (2) Side-channel writes survive a failing document store
#[actix_rt::test]
async fn test_side_channel_mirror_failure_is_swallowed() {
    let harness = create_harness_with(
        Arc::new(LoggingNotifier),
        Some(Arc::new(FailingDocumentStore)),
    )
    .await;
    let uuid = create_application(&harness).await;

    let record = harness
        .sync
        .update_progress(ApplicationIdentity::Uuid(uuid), "quoting")
        .await
        .unwrap();

    assert_eq!(record.progress, "quoting");
    assert_eq!(harness.record(uuid).await.progress, "quoting");
}

/// (3) Reads project the document from relational rows when it is unreadable
#[actix_rt::test]
async fn test_get_application_projects_on_failure() {
    let harness = create_harness_with(
        Arc::new(LoggingNotifier),
        Some(Arc::new(FailingDocumentStore)),
    )
    .await;
    let uuid = create_application(&harness).await;
    harness
        .save_for(
            uuid,
            "coverage",
            json!({"policy_types": [{"policy_type": "BOP", "effective_date": "2026-12-01"}]}),
        )
        .await
        .unwrap();

    let document = harness.sync.get_application(uuid).await.unwrap();

    assert_eq!(document.application_id(), Some(uuid));
    assert_eq!(document.last_step(), Some(3));
    assert_eq!(document.get("businessName"), Some(&json!("Acme LLC")));
    assert_eq!(document.array("contacts").len(), 1);
    assert_eq!(
        document.array("contacts")[0].get("email"),
        Some(&json!("ada@example.com"))
    );
    assert_eq!(document.array("policies").len(), 1);
    assert_eq!(
        document.array("policies")[0].get("effectiveDate"),
        Some(&json!("2026-12-01"))
    );
    assert!(document.is_active());
}

/// (4) A missing document is projected the same way
#[actix_rt::test]
async fn test_get_application_projects_missing_document() {
    let harness = create_harness_with(
        Arc::new(LoggingNotifier),
        Some(Arc::new(DiscardingDocumentStore)),
    )
    .await;
    let uuid = create_application(&harness).await;
    harness
        .save_for(uuid, "locations", json!({"locations": [location("9 Ninth St", "89509")]}))
        .await
        .unwrap();

    let document = harness.sync.get_application(uuid).await.unwrap();

    assert_eq!(document.mysql_id(), Some(harness.record(uuid).await.id));
    assert_eq!(document.array("locations").len(), 1);
    assert_eq!(
        document.array("locations")[0].get("zipcode"),
        Some(&json!("89509"))
    );
}

/// (5) Step merges keep earlier document fields and replace arrays wholesale
#[actix_rt::test]
async fn test_document_merge_semantics() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;

    harness
        .save_for(
            uuid,
            "locations",
            json!({"locations": [location("1 First St", "89501"), location("2 Second St", "89502")]}),
        )
        .await
        .unwrap();
    harness
        .save_for(uuid, "locations", json!({"locations": [location("3 Third St", "89503")]}))
        .await
        .unwrap();

    let stored = harness.stored_document(uuid).await;
    assert_eq!(stored.array("locations").len(), 1);
    assert_eq!(stored.array("contacts").len(), 1);
    assert!(stored.get("businessName").is_some());
    assert_eq!(stored.last_step(), Some(4));
    assert_eq!(harness.backend.child_row_count(ChildCollection::Locations).await, 1);
}

/// (6) Reading an application that does not exist anywhere is not found
#[actix_rt::test]
async fn test_get_unknown_application() {
    let harness = create_harness().await;

    let err = harness
        .sync
        .get_application(uuid::Uuid::new_v4())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "NOT_FOUND");
}
