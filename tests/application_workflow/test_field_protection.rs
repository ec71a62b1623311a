//! PII never reaches either store in clear text.

use agency_portal_lib::models::{ChildCollection, ChildItem, ParentKey};
use agency_portal_lib::store::{BusinessStore, ChildStore};
use serde_json::{Value, json};

use super::test_helpers::*;

/// (1) Business PII columns hold ciphertext; the name hash is deterministic
#[actix_rt::test]
async fn test_business_columns_encrypted() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;
    let business_id = harness.record(uuid).await.business_id.unwrap();

    let business = BusinessStore::find_by_id(harness.backend.as_ref(), business_id)
        .await
        .unwrap()
        .unwrap();

    assert_ne!(business.name, "Acme LLC");
    assert_ne!(business.dba.as_deref(), Some("Acme Plumbing"));
    assert_ne!(business.mailing_address.as_deref(), Some("100 Main St"));
    assert_eq!(business.name_hash, harness.codec.hash_field("Acme LLC"));
    assert_eq!(business.ein_hash, Some(harness.codec.hash_field("123456789")));
    assert_eq!(
        harness.codec.decrypt_field(business.ein.as_deref().unwrap()).unwrap(),
        "12-3456789"
    );
    // Non-sensitive columns stay readable.
    assert_eq!(business.mailing_city.as_deref(), Some("Reno"));
}

/// (2) Contact email and phone are encrypted in the child rows
#[actix_rt::test]
async fn test_contact_rows_encrypted() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;
    let business_id = harness.record(uuid).await.business_id.unwrap();

    let rows = ChildStore::list(
        harness.backend.as_ref(),
        ParentKey::Business(business_id),
        ChildCollection::Contacts,
    )
    .await
    .unwrap();
    assert_eq!(rows.len(), 1);

    let ChildItem::Contact(ref contact) = rows[0].item else {
        panic!("expected a contact row");
    };
    assert_ne!(contact.email, "ada@example.com");
    assert_eq!(contact.email_hash, harness.codec.hash_field("ada@example.com"));
    assert_eq!(
        harness.codec.decrypt_field(&contact.email).unwrap(),
        "ada@example.com"
    );
    assert_ne!(contact.phone.as_deref(), Some("775-555-0100"));
    assert_eq!(contact.fname, "Ada");
}

/// (3) The stored document holds ciphertext; the returned one is decrypted
#[actix_rt::test]
async fn test_document_encrypted_at_rest() {
    let harness = create_harness().await;
    let document = harness.save("contact", contact_body()).await.unwrap();
    let uuid = document.application_id().unwrap();

    let stored = harness.stored_document(uuid).await;
    let stored_name = stored.get("businessName").and_then(Value::as_str).unwrap();
    assert_ne!(stored_name, "Acme LLC");
    assert_eq!(harness.codec.decrypt_field(stored_name).unwrap(), "Acme LLC");
    assert_ne!(stored.get("dba"), Some(&json!("Acme Plumbing")));

    let stored_contact = stored.array("contacts")[0];
    assert_ne!(stored_contact.get("email"), Some(&json!("ada@example.com")));
    assert_eq!(stored_contact.get("firstName"), Some(&json!("Ada")));

    assert_eq!(document.get("dba"), Some(&json!("Acme Plumbing")));
    assert_eq!(
        document.array("contacts")[0].get("email"),
        Some(&json!("ada@example.com"))
    );
    assert_eq!(
        document.array("contacts")[0].get("phone"),
        Some(&json!("775-555-0100"))
    );
}

/// (4) Owner names are encrypted in the business row and the document
#[actix_rt::test]
async fn test_owner_names_encrypted() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;

    harness
        .save_for(
            uuid,
            "owners",
            json!({"owners": [{"fname": "Grace", "lname": "Hopper", "ownership": 100}]}),
        )
        .await
        .unwrap();

    let business_id = harness.record(uuid).await.business_id.unwrap();
    let business = BusinessStore::find_by_id(harness.backend.as_ref(), business_id)
        .await
        .unwrap()
        .unwrap();
    let owners = business.owners.expect("owners column");
    assert!(!owners.contains("Grace"));

    let stored = harness.stored_document(uuid).await;
    let owner = stored.array("owners")[0];
    assert_ne!(owner.get("firstName"), Some(&json!("Grace")));
    assert_eq!(owner.get("ownership"), Some(&json!(100.0)));
}

/// (5) Repeated encryption of one value differs; the hash does not
#[actix_rt::test]
async fn test_codec_nonce_and_hash() {
    let codec = test_codec();

    let first = codec.encrypt_field("ada@example.com").unwrap();
    let second = codec.encrypt_field("ada@example.com").unwrap();

    assert_ne!(first, second);
    assert_eq!(codec.decrypt_field(&first).unwrap(), "ada@example.com");
    assert_eq!(
        codec.hash_field("ada@example.com"),
        codec.hash_field("ada@example.com")
    );
    assert!(codec.decrypt_field("not-ciphertext").is_err());
}

/// (6) Business fields sent on a later step never reach the document in clear text
#[actix_rt::test]
async fn test_business_fields_on_later_step_stay_encrypted() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;

    harness
        .save_for(
            uuid,
            "details",
            json!({
                "ein": "98-7654321",
                "dba": "Shadow Co",
                "mailing_address2": "Suite 9",
                "businessName": "Spoof LLC",
                "years_of_exp": 4
            }),
        )
        .await
        .unwrap();

    let stored = harness.stored_document(uuid).await;
    for field in ["ein", "dba", "businessName"] {
        let value = stored.get(field).and_then(Value::as_str).unwrap();
        assert!(harness.codec.decrypt_field(value).is_ok(), "{} holds ciphertext", field);
    }
    assert_ne!(stored.get("mailingAddress2"), Some(&json!("Suite 9")));

    let document = harness.sync.get_application(uuid).await.unwrap();
    assert_eq!(document.get("ein"), Some(&json!("12-3456789")));
    assert_eq!(document.get("businessName"), Some(&json!("Acme LLC")));
    assert_eq!(document.get("yearsOfExperience"), Some(&json!(4)));
}

/// (7) Payload scalars cannot overwrite business identity or search fields
#[actix_rt::test]
async fn test_business_identity_fields_not_overwritten() {
    let harness = create_harness().await;
    let uuid = create_application(&harness).await;
    let business_id = harness.record(uuid).await.business_id.unwrap();
    let before = harness.stored_document(uuid).await;

    harness
        .save_for(
            uuid,
            "details",
            json!({
                "businessId": 999999,
                "einHash": "forged",
                "businessNameHash": "forged",
                "employeeCount": 3,
                "registeredAddress": "nowhere"
            }),
        )
        .await
        .unwrap();

    let stored = harness.stored_document(uuid).await;
    assert_eq!(stored.get("businessId"), Some(&json!(business_id)));
    for field in ["einHash", "businessNameHash", "employeeCount", "registeredAddress"] {
        assert_eq!(stored.get(field), before.get(field), "{}", field);
    }
}
