//! Workflow gating: step names, identity, edit window, locks and `last_step`.

use agency_portal_lib::error::AppError;
use agency_portal_lib::models::ApplicationState;
use agency_portal_lib::services::SaveOptions;
use serde_json::json;
use uuid::Uuid;

use super::test_helpers::*;

/// (1) Unknown step names are rejected before any store is touched
#[actix_rt::test]
async fn test_unknown_step() {
    let harness = create_harness().await;

    let err = harness.save("payment", contact_body()).await.unwrap_err();

    assert!(matches!(err, AppError::UnknownStep(ref step) if step == "payment"));
    assert_eq!(harness.backend.document_count().await, 0);
}

/// (2) Only `contact` may create an application
#[actix_rt::test]
async fn test_missing_identity() {
    let harness = create_harness().await;

    let err = harness
        .save("locations", json!({"locations": [location("1 First St", "89501")]}))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::MissingIdentity(_)));
    assert_eq!(harness.backend.document_count().await, 0);
}

/// (3) An id that matches nothing is not found, not created
#[actix_rt::test]
async fn test_unknown_application() {
    let harness = create_harness().await;

    let err = harness
        .save_for(Uuid::new_v4(), "details", json!({"years_of_exp": 3}))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = harness
        .save("details", json!({"id": 4242, "years_of_exp": 3}))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

/// (4) Saving an earlier step never lowers `last_step`
#[actix_rt::test]
async fn test_last_step_is_monotonic() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;

    harness
        .save_for(uuid, "claims", json!({"claims": []}))
        .await
        .unwrap();
    let document = harness
        .save_for(uuid, "coverage", json!({"policy_types": [{"policy_type": "BOP"}]}))
        .await
        .unwrap();

    assert_eq!(harness.record(uuid).await.last_step, 7);
    assert_eq!(document.last_step(), Some(7));
}

/// (5) Repeating `quotes` at the quote lock neither fails nor moves `last_step`
#[actix_rt::test]
async fn test_quotes_is_idempotent() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;

    harness.save_for(uuid, "quotes", json!({})).await.unwrap();
    assert_eq!(harness.record(uuid).await.last_step, 9);

    harness.save_for(uuid, "quotes", json!({})).await.unwrap();
    let record = harness.record(uuid).await;
    assert_eq!(record.last_step, 9);
    assert_eq!(record.status, "quoting");
}

/// (6) Steps before the quote lock are refused once quoting started
#[actix_rt::test]
async fn test_quote_lock() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;
    harness.save_for(uuid, "quotes", json!({})).await.unwrap();

    let err = harness
        .save_for(uuid, "coverage", json!({"policy_types": [{"policy_type": "GL"}]}))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ImmutableRecord(_)));

    let err = harness
        .save_for(uuid, "contact", json!({"business": {"name": "Renamed LLC"}}))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ImmutableRecord(_)));

    // Later steps are still open.
    harness
        .save_for(uuid, "bindRequest", json!({"quote_id": "Q-9"}))
        .await
        .unwrap();
    assert_eq!(harness.record(uuid).await.last_step, 10);
}

/// (7) Records older than the edit window are immutable unless bypassed
#[actix_rt::test]
async fn test_edit_window() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;
    harness.backdate(uuid, 61).await;

    let err = harness
        .save_for(uuid, "details", json!({"years_of_exp": 4}))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ImmutableRecord(_)));
    assert_eq!(harness.record(uuid).await.years_of_exp, None);

    harness
        .sync
        .save_application_step(
            "details",
            payload(json!({"applicationId": uuid.to_string(), "years_of_exp": 4})),
            SaveOptions {
                bypass_edit_window: true,
                client_ip: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(harness.record(uuid).await.years_of_exp, Some(4));
}

/// (8) A bypass flag inside the payload is ignored
#[actix_rt::test]
async fn test_payload_cannot_bypass_edit_window() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;
    harness.backdate(uuid, 120).await;

    let err = harness
        .save_for(
            uuid,
            "details",
            json!({"years_of_exp": 4, "bypass_edit_window": true}),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ImmutableRecord(_)));
}

/// (9) Deleted and finalized applications accept no step saves
#[actix_rt::test]
async fn test_locked_states() {
    let harness = create_harness().await;

    for state in [ApplicationState::Deleted, ApplicationState::Finalized] {
        let uuid = create_application(&harness).await;
        harness
            .sync
            .update_state(
                agency_portal_lib::models::ApplicationIdentity::Uuid(uuid),
                state,
            )
            .await
            .unwrap();

        let err = harness
            .save_for(uuid, "details", json!({"years_of_exp": 4}))
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::ImmutableRecord(_)),
            "state {:?} should be locked",
            state
        );
    }
}

/// (10) Step requirements are validated without writing anything
#[actix_rt::test]
async fn test_step_requirements() {
    let harness = create_harness().await;

    let err = harness
        .save("contact", json!({"business": {"name": "   "}}))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(harness.backend.document_count().await, 0);

    let uuid = create_application(&harness).await;
    for (step, body) in [
        ("coverage", json!({})),
        ("locations", json!({})),
        ("owners", json!({"owners": "nobody"})),
        ("claims", json!({})),
        ("questions", json!({})),
        ("bindRequest", json!({})),
    ] {
        let err = harness.save_for(uuid, step, body).await.unwrap_err();
        assert!(
            matches!(err, AppError::Validation(_)),
            "{} should fail validation, got {}",
            step,
            err
        );
    }
    assert_eq!(harness.record(uuid).await.last_step, 2);
}

/// (11) The surrogate id identifies an application as well as the uuid
#[actix_rt::test]
async fn test_identity_by_surrogate_id() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;
    let id = harness.record(uuid).await.id;

    let document = harness
        .save("details", json!({"id": id.to_string(), "years_of_exp": 9}))
        .await
        .unwrap();

    assert_eq!(document.application_id(), Some(uuid));
    assert_eq!(harness.record(uuid).await.years_of_exp, Some(9));
}
