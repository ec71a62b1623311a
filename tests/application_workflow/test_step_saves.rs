//! Step saves through the whole workflow.

use std::sync::Arc;

use agency_portal_lib::error::AppResult;
use agency_portal_lib::models::{
    ActivityPayrollRow, ApplicationState, ChildCollection, ChildItem, EnrichmentResult, ParentKey,
    QuestionAnswerRow,
};
use agency_portal_lib::services::enrichment::EnrichmentQuery;
use agency_portal_lib::services::question_catalog::{QuestionContext, QuestionDefinition};
use agency_portal_lib::services::{
    EnrichmentLookup, NotificationKind, QuestionCatalog, SaveOptions,
};
use agency_portal_lib::store::{BusinessStore, ChildStore};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;

use super::test_helpers::*;

/// (1) `contact` without an id creates the record, the business and the document
#[actix_rt::test]
async fn test_contact_creates_application() {
    let harness = create_harness().await;

    let document = harness.save("contact", contact_body()).await.unwrap();

    let uuid = document.application_id().expect("applicationId");
    let record = harness.record(uuid).await;
    assert_eq!(record.last_step, 2);
    assert_eq!(record.agency_id, TEST_AGENCY_ID);
    assert_eq!(record.agency_network_id, TEST_AGENCY_NETWORK_ID);
    assert_eq!(record.agency_location_id, TEST_LOCATION_ID);
    assert_eq!(record.state(), Some(ApplicationState::Active));
    assert_eq!(record.industry_code, Some(2380));

    let business_id = record.business_id.expect("business should be referenced");
    let business = BusinessStore::find_by_id(harness.backend.as_ref(), business_id)
        .await
        .unwrap()
        .expect("business row");
    assert_eq!(harness.codec.decrypt_field(&business.name).unwrap(), "Acme LLC");

    assert_eq!(document.mysql_id(), Some(record.id));
    assert_eq!(document.last_step(), Some(2));
    assert_eq!(document.get("businessName"), Some(&json!("Acme LLC")));
    assert_eq!(document.get("businessId"), Some(&json!(business_id)));
    assert!(document.is_active());
    assert_eq!(document.array("contacts").len(), 1);
    assert_eq!(harness.backend.document_count().await, 1);
}

/// (2) A second `contact` save updates the same business instead of adding one
#[actix_rt::test]
async fn test_contact_resave_updates_business() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;
    let business_id = harness.record(uuid).await.business_id;

    let document = harness
        .save_for(
            uuid,
            "contact",
            json!({"business": {"name": "Acme Holdings LLC"}}),
        )
        .await
        .unwrap();

    assert_eq!(harness.record(uuid).await.business_id, business_id);
    assert_eq!(document.get("businessName"), Some(&json!("Acme Holdings LLC")));
    // Contacts were not part of this save and are left alone.
    assert_eq!(harness.backend.child_row_count(ChildCollection::Contacts).await, 1);
}

/// (3) `locations` fans out address rows and returns them in document naming
#[actix_rt::test]
async fn test_locations_fan_out() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;

    let document = harness
        .save_for(
            uuid,
            "locations",
            json!({"locations": [location("1 First St", "89501"), location("2 Second St", "89502")]}),
        )
        .await
        .unwrap();

    let locations = document.array("locations");
    assert_eq!(locations.len(), 2);
    assert_eq!(locations[0].get("fullTimeEmployees"), Some(&json!(4)));
    assert_eq!(locations[1].get("zipcode"), Some(&json!("89502")));
    assert!(!locations[0].contains_key("full_time_employees"));
    assert_eq!(harness.backend.child_row_count(ChildCollection::Locations).await, 2);
    assert_eq!(harness.record(uuid).await.last_step, 4);
}

/// (4) Activity codes nested under locations are summed per code
#[actix_rt::test]
async fn test_locations_aggregate_activity_codes() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;

    let mut first = location("1 First St", "89501");
    first["activity_codes"] = json!([{"activity_code_id": 8810, "payroll": 1000}]);
    let mut second = location("2 Second St", "89502");
    second["activity_codes"] = json!([
        {"activity_code_id": 8810, "payroll": "250"},
        {"activity_code_id": 5183, "payroll": 4000}
    ]);

    let document = harness
        .save_for(uuid, "locations", json!({"locations": [first, second]}))
        .await
        .unwrap();

    let codes = document.array("activityCodes");
    assert_eq!(codes.len(), 2);
    assert_eq!(codes[0].get("activityCodeId"), Some(&json!(8810)));
    assert_eq!(codes[0].get("payroll"), Some(&json!(1250)));
    assert_eq!(codes[1].get("payroll"), Some(&json!(4000)));
}

/// (5) Covered owner payroll is added to the existing activity-code row
#[actix_rt::test]
async fn test_owner_payroll_accumulates() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;

    let mut site = location("1 First St", "89501");
    site["activity_codes"] = json!([{"activity_code_id": 8810, "payroll": 1000}]);
    harness
        .save_for(uuid, "locations", json!({"locations": [site]}))
        .await
        .unwrap();

    let document = harness
        .save_for(
            uuid,
            "owners",
            json!({"owners": [
                {"fname": "Grace", "lname": "Hopper", "ownership": 60, "include": true,
                 "activity_code_id": 8810, "payroll": 500},
                {"fname": "Alan", "lname": "Turing", "ownership": 40, "include": false,
                 "activity_code_id": 8810, "payroll": 900}
            ]}),
        )
        .await
        .unwrap();

    let record = harness.record(uuid).await;
    let rows = ChildStore::list(
        harness.backend.as_ref(),
        ParentKey::Application(record.id),
        ChildCollection::ActivityCodes,
    )
    .await
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].item,
        ChildItem::ActivityCode(ActivityPayrollRow {
            activity_code_id: 8810,
            payroll: 1500,
        })
    );

    assert_eq!(record.owners_covered, Some(1));
    assert_eq!(document.array("owners").len(), 2);
    assert_eq!(document.array("owners")[0].get("firstName"), Some(&json!("Grace")));
    assert_eq!(document.array("activityCodes")[0].get("payroll"), Some(&json!(1500)));
}

/// (6) `coverage` replaces policy selections and flattens them onto the record
#[actix_rt::test]
async fn test_coverage_flattens_policies() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;

    let document = harness
        .save_for(
            uuid,
            "coverage",
            json!({"policy_types": [
                {"policy_type": "GL", "effective_date": "2026-11-01", "expiration_date": "2027-11-01",
                 "limits": "1000000/2000000", "deductible": "500"},
                {"policy_type": "WC", "effective_date": "11/01/2026", "limits": "100/500/100"}
            ]}),
        )
        .await
        .unwrap();

    let record = harness.record(uuid).await;
    assert_eq!(record.gl_effective_date, NaiveDate::from_ymd_opt(2026, 11, 1));
    assert_eq!(record.wc_effective_date, NaiveDate::from_ymd_opt(2026, 11, 1));
    assert_eq!(record.limits.as_deref(), Some("1000000/2000000"));
    assert_eq!(record.deductible, Some(500));
    assert_eq!(record.wc_limits.as_deref(), Some("100/500/100"));
    assert_eq!(record.bop_effective_date, None);

    assert_eq!(document.array("policies").len(), 2);
    assert!(document.get("glEffectiveDate").is_none());

    // Dropping WC clears its columns.
    harness
        .save_for(uuid, "coverage", json!({"policy_types": [{"policy_type": "GL"}]}))
        .await
        .unwrap();
    let record = harness.record(uuid).await;
    assert_eq!(record.wc_limits, None);
    assert_eq!(harness.backend.child_row_count(ChildCollection::PolicyTypes).await, 1);
}

/// (7) `details` coerces scalar fields and keeps unknown ones in the document only
#[actix_rt::test]
async fn test_details_coerces_scalars() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;

    let document = harness
        .save_for(
            uuid,
            "details",
            json!({
                "founded": "03/15/2012",
                "gross_sales_amt": "1250000.50",
                "years_of_exp": "12",
                "coverage_lapse": "false",
                "referral_source": "trade show"
            }),
        )
        .await
        .unwrap();

    let record = harness.record(uuid).await;
    assert_eq!(record.founded, NaiveDate::from_ymd_opt(2012, 3, 15));
    assert_eq!(record.gross_sales_amt, Some(1_250_000.5));
    assert_eq!(record.years_of_exp, Some(12));
    assert!(!record.coverage_lapse);

    assert_eq!(document.get("yearsOfExperience"), Some(&json!(12)));
    assert_eq!(document.get("grossSalesAmount"), Some(&json!(1_250_000.5)));
    assert_eq!(document.get("referralSource"), Some(&json!("trade show")));
}

/// (8) A claim without a date is rejected before anything is written
#[actix_rt::test]
async fn test_claims_validation_keeps_existing_rows() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;

    harness
        .save_for(
            uuid,
            "claims",
            json!({"claims": [{"policy_type": "GL", "date": "2024-02-01", "amount_paid": "1200.00"}]}),
        )
        .await
        .unwrap();

    let err = harness
        .save_for(
            uuid,
            "claims",
            json!({"claims": [
                {"policy_type": "GL", "date": "2024-02-01"},
                {"policy_type": "WC"}
            ]}),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "MAPPING_ERROR");
    assert_eq!(harness.backend.child_row_count(ChildCollection::Claims).await, 1);
}

/// (9) An empty array clears the collection
#[actix_rt::test]
async fn test_empty_collection_clears_rows() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;

    harness
        .save_for(
            uuid,
            "claims",
            json!({"claims": [{"policy_type": "GL", "date": "2024-02-01"}]}),
        )
        .await
        .unwrap();
    let document = harness
        .save_for(uuid, "claims", json!({"claims": []}))
        .await
        .unwrap();

    assert_eq!(harness.backend.child_row_count(ChildCollection::Claims).await, 0);
    assert!(document.array("claims").is_empty());
}

/// (10) `questions` stores answers, records consent and moves status forward
#[actix_rt::test]
async fn test_questions_record_legal_acceptance() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;

    let document = harness
        .sync
        .save_application_step(
            "questions",
            payload(json!({
                "applicationId": uuid.to_string(),
                "questions": [
                    {"question_id": 10, "answer_id": 1},
                    {"questionId": 11, "answerValue": "Since 2012"}
                ]
            })),
            SaveOptions {
                bypass_edit_window: false,
                client_ip: Some("203.0.113.9".to_string()),
            },
        )
        .await
        .unwrap();

    let record = harness.record(uuid).await;
    assert_eq!(record.status, "questions_done");
    assert_eq!(record.app_status_id, 10);

    let acceptances = harness.backend.legal_acceptances().await;
    assert_eq!(acceptances.len(), 1);
    assert_eq!(acceptances[0].application_id, record.id);
    assert_eq!(acceptances[0].ip, "203.0.113.9");
    assert_eq!(acceptances[0].version, 1);

    let questions = document.array("questions");
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[1].get("answerValue"), Some(&json!("Since 2012")));
    assert_eq!(document.get("legalAcceptance").unwrap()["ip"], "203.0.113.9");
}

/// (11) Status never moves backwards on a later step
#[actix_rt::test]
async fn test_status_only_moves_forward() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;

    harness
        .save_for(uuid, "bindRequest", json!({"quote_id": "Q-77"}))
        .await
        .unwrap();
    harness.save_for(uuid, "quotes", json!({})).await.unwrap();

    let record = harness.record(uuid).await;
    assert_eq!(record.status, "request_to_bind");
    assert_eq!(record.app_status_id, 60);
    assert_eq!(record.bind_quote_id.as_deref(), Some("Q-77"));
    assert_eq!(record.progress, "quoting");
}

/// (12) Notifications go out only after the step was stored
#[actix_rt::test]
async fn test_notifications_dispatched() {
    let notifier = Arc::new(RecordingNotifier::default());
    let harness = create_harness_with(notifier.clone(), None).await;
    let uuid = create_application(&harness).await;
    let id = harness.record(uuid).await.id;

    harness
        .save_for(
            uuid,
            "questions",
            json!({"questions": [], "wholesale": true}),
        )
        .await
        .unwrap();
    harness
        .save_for(uuid, "cart", json!({"quote_id": "Q-1"}))
        .await
        .unwrap();

    let delivered = eventually(|| {
        let notifier = notifier.clone();
        async move { notifier.delivered.lock().await.len() == 2 }
    })
    .await;
    assert!(delivered, "both notifications should be delivered");

    let notifications = notifier.delivered.lock().await.clone();
    assert!(notifications.iter().all(|n| n.application_id == id));
    assert!(notifications.iter().any(|n| n.kind == NotificationKind::WholesaleSubmission));
    assert!(notifications.iter().any(|n| n.kind
        == NotificationKind::BindRequest {
            quote_id: "Q-1".to_string()
        }));
}

/// (13) A rejected step dispatches nothing
#[actix_rt::test]
async fn test_rejected_step_sends_no_notification() {
    let notifier = Arc::new(RecordingNotifier::default());
    let harness = create_harness_with(notifier.clone(), None).await;
    let uuid = create_application(&harness).await;
    harness.backdate(uuid, 24 * 60).await;

    let err = harness
        .save_for(uuid, "cart", json!({"quote_id": "Q-1"}))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "IMMUTABLE_RECORD");

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(notifier.delivered.lock().await.is_empty());
}

struct StaticCatalog {
    definitions: Option<Vec<QuestionDefinition>>,
}

#[async_trait]
impl QuestionCatalog for StaticCatalog {
    async fn get_questions_for_context(
        &self,
        _context: &QuestionContext,
    ) -> AppResult<Vec<QuestionDefinition>> {
        self.definitions.clone().ok_or_else(|| {
            agency_portal_lib::error::AppError::Storage("catalog offline".to_string())
        })
    }
}

/// (14) Answers outside the question catalog are dropped; catalog outages keep them
#[actix_rt::test]
async fn test_question_catalog_filters_answers() {
    let catalog = StaticCatalog {
        definitions: Some(vec![QuestionDefinition {
            id: 10,
            text: "Do you perform roofing work?".to_string(),
            question_type: Some("yes_no".to_string()),
        }]),
    };
    let mut harness = create_harness().await;
    harness.sync = harness.sync.clone().with_question_catalog(Arc::new(catalog));
    let uuid = create_application(&harness).await;

    harness
        .save_for(
            uuid,
            "questions",
            json!({"questions": [{"question_id": 10, "answer_id": 2}, {"question_id": 99}]}),
        )
        .await
        .unwrap();

    let record = harness.record(uuid).await;
    let rows = ChildStore::list(
        harness.backend.as_ref(),
        ParentKey::Application(record.id),
        ChildCollection::Questions,
    )
    .await
    .unwrap();
    assert_eq!(rows.len(), 1);
    match &rows[0].item {
        ChildItem::Question(QuestionAnswerRow {
            question_id,
            question_text,
            ..
        }) => {
            assert_eq!(*question_id, 10);
            assert_eq!(question_text.as_deref(), Some("Do you perform roofing work?"));
        }
        other => panic!("unexpected row {:?}", other),
    }

    harness.sync = harness
        .sync
        .clone()
        .with_question_catalog(Arc::new(StaticCatalog { definitions: None }));
    harness
        .save_for(
            uuid,
            "questions",
            json!({"questions": [{"question_id": 10}, {"question_id": 99}]}),
        )
        .await
        .unwrap();
    assert_eq!(harness.backend.child_row_count(ChildCollection::Questions).await, 2);
}

struct StaticEnrichment;

#[async_trait]
impl EnrichmentLookup for StaticEnrichment {
    async fn lookup_business_data(&self, query: &EnrichmentQuery) -> AppResult<EnrichmentResult> {
        assert_eq!(query.name, "Acme LLC");
        Ok(EnrichmentResult {
            registered_address: Some("1 Registered Way, Carson City NV".to_string()),
            employee_count: Some(14),
        })
    }
}

/// (15) Enrichment backfills the business after the contact step returns
#[actix_rt::test]
async fn test_enrichment_backfills_business() {
    let mut harness = create_harness().await;
    harness.sync = harness.sync.clone().with_enrichment(Arc::new(StaticEnrichment));

    let uuid = create_application(&harness).await;
    let business_id = harness.record(uuid).await.business_id.unwrap();

    let backend = harness.backend.clone();
    let enriched = eventually(|| {
        let backend = backend.clone();
        async move {
            BusinessStore::find_by_id(backend.as_ref(), business_id)
                .await
                .unwrap()
                .is_some_and(|b| b.num_employees == Some(14))
        }
    })
    .await;
    assert!(enriched, "business should be enriched in the background");

    let mirrored = eventually(|| {
        let backend = backend.clone();
        async move {
            agency_portal_lib::store::DocumentStore::find(backend.as_ref(), uuid)
                .await
                .unwrap()
                .is_some_and(|d| d.get("employeeCount") == Some(&json!(14)))
        }
    })
    .await;
    assert!(mirrored, "enrichment should be mirrored to the document");
}

/// (16) Payroll totals that overflow are rejected before any row changes
#[actix_rt::test]
async fn test_payroll_overflow_rejected() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;
    harness
        .save_for(uuid, "locations", json!({"locations": [location("1 First St", "89501")]}))
        .await
        .unwrap();

    let mut site = location("2 Second St", "89502");
    site["activity_codes"] = json!([
        {"activity_code_id": 8810, "payroll": i64::MAX},
        {"activity_code_id": 8810, "payroll": 1}
    ]);
    let err = harness
        .save_for(uuid, "locations", json!({"locations": [site]}))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert_eq!(harness.record(uuid).await.last_step, 4);
    let stored = harness.stored_document(uuid).await;
    assert_eq!(stored.array("locations")[0].get("zipcode"), Some(&json!("89501")));
    assert_eq!(harness.backend.child_row_count(ChildCollection::ActivityCodes).await, 0);
}
