//! Application routes over HTTP.

use actix_web::{http::StatusCode, test};
use serde_json::{Value, json};

use super::test_helpers::*;

/// (1) Create, read, update and delete an application through the routes
#[actix_rt::test]
async fn test_application_lifecycle() {
    let harness = create_harness().await;
    let app = create_test_app(&harness.sync).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/applications/contact")
        .set_json(contact_body())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let uuid = body["applicationId"].as_str().unwrap().to_string();
    assert_eq!(body["businessName"], "Acme LLC");
    assert_eq!(body["lastStep"], 2);

    let req = test::TestRequest::post()
        .uri("/api/v1/applications/claims")
        .set_json(json!({
            "applicationId": uuid,
            "claims": [{"policy_type": "WC", "date": "2023-06-30", "open": "1"}]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/applications/{}", uuid))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["lastStep"], 7);
    assert_eq!(body["claims"][0]["eventDate"], "2023-06-30");
    assert_eq!(body["claims"][0]["open"], true);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/applications/{}/status", uuid))
        .set_json(json!({"status": "referred", "app_status_id": 40}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "referred");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/applications/{}", uuid))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/applications/{}", uuid))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["active"], false);
}

/// (2) Workflow errors map to their status codes and error bodies
#[actix_rt::test]
async fn test_error_responses() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;
    harness.save_for(uuid, "quotes", json!({})).await.unwrap();
    let app = create_test_app(&harness.sync).await;

    let cases = [
        ("payment", json!({}), StatusCode::BAD_REQUEST, "UNKNOWN_STEP"),
        (
            "coverage",
            json!({"policy_types": []}),
            StatusCode::BAD_REQUEST,
            "MISSING_IDENTITY",
        ),
        (
            "coverage",
            json!({"applicationId": uuid.to_string(), "policy_types": []}),
            StatusCode::CONFLICT,
            "IMMUTABLE_RECORD",
        ),
        (
            "details",
            json!({"applicationId": uuid::Uuid::new_v4().to_string()}),
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
        ),
    ];

    for (step, body, status, code) in cases {
        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/applications/{}", step))
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), status, "step {}", step);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], code, "step {}", step);
    }
}

/// (3) The bypass query flag reopens an aged application
#[actix_rt::test]
async fn test_bypass_edit_window_query() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;
    harness.backdate(uuid, 90).await;
    let app = create_test_app(&harness.sync).await;

    let body = json!({"applicationId": uuid.to_string(), "years_of_exp": 6});

    let req = test::TestRequest::post()
        .uri("/api/v1/applications/details")
        .set_json(body.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/api/v1/applications/details?bypass_edit_window=true")
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(harness.record(uuid).await.years_of_exp, Some(6));
}

/// (4) Progress, state and replay routes
#[actix_rt::test]
async fn test_side_channel_routes() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;
    let app = create_test_app(&harness.sync).await;

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/applications/{}/progress", uuid))
        .set_json(json!({"progress": "complete"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["progress"], "complete");

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/applications/{}/state", uuid))
        .set_json(json!({"state": "finalized"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["state"], 2);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/applications/{}/replay", uuid))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["uuid"], uuid.to_string());
    assert_eq!(body["progress"], "complete");
}
