//! Rebuilding relational rows from a stored document.

use std::sync::Arc;

use agency_portal_lib::config::WorkflowConfig;
use agency_portal_lib::models::{ChildCollection, ChildItem, ParentKey};
use agency_portal_lib::services::{DualStoreSynchronizer, LoggingNotifier, NotificationQueue};
use agency_portal_lib::store::{BusinessStore, ChildStore, DocumentStore, PersistenceContext};
use chrono::NaiveDate;
use serde_json::{Map, json};

use super::test_helpers::*;

/// Harness over a fresh backend that shares the codec keys of `source`.
async fn empty_replica() -> TestHarness {
    let backend = seeded_backend().await;
    let codec = test_codec();
    let ctx = PersistenceContext::in_memory(backend.clone(), codec.clone());
    let notifications = NotificationQueue::start(Arc::new(LoggingNotifier), 1);
    TestHarness {
        backend,
        codec,
        sync: DualStoreSynchronizer::new(ctx, &WorkflowConfig::default(), notifications),
    }
}

/// (1) A document alone is enough to rebuild the application
#[actix_rt::test]
async fn test_replay_into_empty_store() {
    let source = create_harness().await;
    let uuid = create_application(&source).await;
    source
        .save_for(
            uuid,
            "coverage",
            json!({"policy_types": [
                {"policy_type": "GL", "effective_date": "2026-11-01", "limits": "1000000/2000000"}
            ]}),
        )
        .await
        .unwrap();
    source
        .save_for(uuid, "locations", json!({"locations": [location("1 First St", "89501")]}))
        .await
        .unwrap();
    source
        .save_for(
            uuid,
            "owners",
            json!({"owners": [{"fname": "Grace", "lname": "Hopper", "ownership": 100}]}),
        )
        .await
        .unwrap();
    source
        .save_for(
            uuid,
            "claims",
            json!({"claims": [{"policy_type": "GL", "date": "2024-02-01", "amount_paid": 800}]}),
        )
        .await
        .unwrap();
    let document = source.stored_document(uuid).await;

    let replica = empty_replica().await;
    DocumentStore::put(replica.backend.as_ref(), uuid, &document)
        .await
        .unwrap();

    let record = replica.sync.replay_document(uuid).await.unwrap();

    assert!(record.id > 0);
    assert_eq!(record.uuid, uuid);
    assert_eq!(record.last_step, 7);
    assert_eq!(record.agency_location_id, TEST_LOCATION_ID);
    assert_eq!(record.gl_effective_date, NaiveDate::from_ymd_opt(2026, 11, 1));
    assert_eq!(record.limits.as_deref(), Some("1000000/2000000"));

    let business_id = record.business_id.expect("business restored");
    let business = BusinessStore::find_by_id(replica.backend.as_ref(), business_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(replica.codec.decrypt_field(&business.name).unwrap(), "Acme LLC");
    assert_eq!(business.name_hash, replica.codec.hash_field("Acme LLC"));
    assert!(business.owners.is_some());

    let app = ParentKey::Application(record.id);
    let claims = ChildStore::list(replica.backend.as_ref(), app, ChildCollection::Claims)
        .await
        .unwrap();
    assert_eq!(claims.len(), 1);
    let ChildItem::Claim(ref claim) = claims[0].item else {
        panic!("expected a claim row");
    };
    assert_eq!(claim.amount_paid, 800.0);

    let business_parent = ParentKey::Business(business_id);
    for (collection, expected) in [(ChildCollection::Locations, 1), (ChildCollection::Contacts, 1)] {
        let rows = ChildStore::list(replica.backend.as_ref(), business_parent, collection)
            .await
            .unwrap();
        assert_eq!(rows.len(), expected, "{}", collection);
    }

    // The new surrogate ids are mirrored back onto the document.
    let replayed = replica.stored_document(uuid).await;
    assert_eq!(replayed.mysql_id(), Some(record.id));
    assert_eq!(replayed.get("businessId"), Some(&json!(business_id)));
}

/// (2) Replaying an older document never lowers `last_step`
#[actix_rt::test]
async fn test_replay_keeps_last_step() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;
    harness.save_for(uuid, "quotes", json!({})).await.unwrap();

    let mut stale = Map::new();
    stale.insert("lastStep".to_string(), json!(4));
    DocumentStore::merge(harness.backend.as_ref(), uuid, &stale)
        .await
        .unwrap();

    let record = harness.sync.replay_document(uuid).await.unwrap();

    assert_eq!(record.last_step, 9);
    assert_eq!(record.id, harness.record(uuid).await.id);
    assert_eq!(harness.backend.child_row_count(ChildCollection::Contacts).await, 1);
}

/// (3) Replay fails cleanly when there is no document
#[actix_rt::test]
async fn test_replay_without_document() {
    let harness = create_harness().await;

    let err = harness
        .sync
        .replay_document(uuid::Uuid::new_v4())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "NOT_FOUND");
}
