//! Direct status, progress and state writes, and soft delete.

use agency_portal_lib::models::{ApplicationIdentity, ApplicationState};
use serde_json::json;
use uuid::Uuid;

use super::test_helpers::*;

/// (1) Status is set directly, even backwards, and mirrored to the document
#[actix_rt::test]
async fn test_update_status() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;
    harness
        .save_for(uuid, "bindRequest", json!({"quote_id": "Q-3"}))
        .await
        .unwrap();

    let record = harness
        .sync
        .update_status(ApplicationIdentity::Uuid(uuid), "quoted", 50)
        .await
        .unwrap();

    assert_eq!(record.status, "quoted");
    assert_eq!(record.app_status_id, 50);
    assert_eq!(harness.record(uuid).await.app_status_id, 50);

    let stored = harness.stored_document(uuid).await;
    assert_eq!(stored.get("status"), Some(&json!("quoted")));
    assert_eq!(stored.get("appStatusId"), Some(&json!(50)));
    assert!(stored.get("updatedAt").is_some());
}

/// (2) Progress text is written through by surrogate id
#[actix_rt::test]
async fn test_update_progress() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;
    let id = harness.record(uuid).await.id;

    harness
        .sync
        .update_progress(ApplicationIdentity::Id(id), "complete")
        .await
        .unwrap();

    assert_eq!(harness.record(uuid).await.progress, "complete");
    assert_eq!(
        harness.stored_document(uuid).await.get("progress"),
        Some(&json!("complete"))
    );
}

/// (3) State changes are allowed on any record, including old ones
#[actix_rt::test]
async fn test_update_state_ignores_edit_window() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;
    harness.backdate(uuid, 7 * 24 * 60).await;

    let record = harness
        .sync
        .update_state(ApplicationIdentity::Uuid(uuid), ApplicationState::Finalized)
        .await
        .unwrap();

    assert_eq!(record.state(), Some(ApplicationState::Finalized));
    let stored = harness.stored_document(uuid).await;
    assert_eq!(stored.get("state"), Some(&json!(2)));
    assert!(stored.is_active());
}

/// (4) Delete is soft: the row stays, the document goes inactive
#[actix_rt::test]
async fn test_delete_application() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;

    harness
        .sync
        .delete_application(ApplicationIdentity::Uuid(uuid))
        .await
        .unwrap();

    let record = harness.record(uuid).await;
    assert_eq!(record.state(), Some(ApplicationState::Deleted));
    assert!(record.business_id.is_some());

    let document = harness.sync.get_application(uuid).await.unwrap();
    assert!(!document.is_active());
    assert_eq!(document.get("businessName"), Some(&json!("Acme LLC")));

    // Restoring the state reactivates the document.
    harness
        .sync
        .update_state(ApplicationIdentity::Uuid(uuid), ApplicationState::Active)
        .await
        .unwrap();
    assert!(harness.stored_document(uuid).await.is_active());
}

/// (5) Side channels on unknown applications are not found
#[actix_rt::test]
async fn test_side_channels_unknown_application() {
    let harness = create_harness().await;
    let missing = ApplicationIdentity::Uuid(Uuid::new_v4());

    let err = harness
        .sync
        .update_status(missing, "quoted", 50)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");

    let err = harness.sync.delete_application(missing).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    assert_eq!(harness.backend.document_count().await, 0);
}
