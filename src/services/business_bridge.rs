//! Business persistence on behalf of the application workflow.
//!
//! Keeps the business row (and its addresses and contacts) consistent with
//! the business-facing part of an application. PII is encrypted before it
//! reaches the store and the search hashes are rebuilt on every write.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::info;

use super::child_fanout::{ChildFanoutManager, FanoutResult};
use super::field_codec::{FieldCodec, coerce_fields};
use super::name_mapper::NameMapper;
use crate::error::{AppError, AppResult};
use crate::models::document::ENCRYPTED_NESTED_FIELDS;
use crate::models::payload::object_array;
use crate::models::{
    BusinessInput, BusinessRecord, ChildCollection, EnrichmentResult, OwnerInput, ParentKey,
};
use crate::store::BusinessStore;

/// Result of [`BusinessRecordBridge::upsert_business`].
#[derive(Debug, Clone)]
pub struct BusinessUpsert {
    pub business: BusinessRecord,
    /// Clear-text input, kept for the enrichment lookup
    pub input: BusinessInput,
    pub created: bool,
    pub contacts: Option<FanoutResult>,
    pub locations: Option<FanoutResult>,
}

#[derive(Clone)]
pub struct BusinessRecordBridge {
    businesses: Arc<dyn BusinessStore>,
    fanout: ChildFanoutManager,
    codec: Arc<FieldCodec>,
}

impl BusinessRecordBridge {
    pub fn new(
        businesses: Arc<dyn BusinessStore>,
        fanout: ChildFanoutManager,
        codec: Arc<FieldCodec>,
    ) -> Self {
        Self {
            businesses,
            fanout,
            codec,
        }
    }

    pub async fn find(&self, business_id: i64) -> AppResult<BusinessRecord> {
        self.businesses
            .find_by_id(business_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Business {}", business_id)))
    }

    /// Create or update the business from a `business` payload object, then
    /// replace its contacts and addresses when the payload carries them.
    pub async fn upsert_business(
        &self,
        existing_id: Option<i64>,
        fields: &Map<String, Value>,
        now: DateTime<Utc>,
    ) -> AppResult<BusinessUpsert> {
        let input = parse_business_input(fields)?;
        let protected = self.protect(&input, now)?;

        let (business, created) = match existing_id {
            Some(id) => {
                let existing = self.find(id).await?;
                let updated = BusinessRecord {
                    id: existing.id,
                    owners: existing.owners,
                    registered_address: existing.registered_address,
                    num_employees: existing.num_employees,
                    created_at: existing.created_at,
                    ..protected
                };
                self.businesses.update(&updated).await?;
                (updated, false)
            }
            None => {
                let inserted = self.businesses.insert(&protected).await?;
                info!("Created business {}", inserted.id);
                (inserted, true)
            }
        };

        let parent = ParentKey::Business(business.id);
        let contacts = match object_array(fields, "contacts")? {
            Some(items) => Some(
                self.fanout
                    .replace_children(parent, ChildCollection::Contacts, &items)
                    .await?,
            ),
            None => None,
        };
        let locations = match object_array(fields, "locations")? {
            Some(items) => Some(self.replace_addresses(business.id, &items).await?),
            None => None,
        };

        Ok(BusinessUpsert {
            business,
            input,
            created,
            contacts,
            locations,
        })
    }

    pub async fn replace_addresses(
        &self,
        business_id: i64,
        items: &[&Map<String, Value>],
    ) -> AppResult<FanoutResult> {
        self.fanout
            .replace_children(ParentKey::Business(business_id), ChildCollection::Locations, items)
            .await
    }

    pub async fn delete_addresses(&self, business_id: i64) -> AppResult<u64> {
        Ok(self
            .fanout
            .replace_items(ParentKey::Business(business_id), ChildCollection::Locations, vec![])
            .await?
            .deleted)
    }

    pub async fn delete_contacts(&self, business_id: i64) -> AppResult<u64> {
        Ok(self
            .fanout
            .replace_items(ParentKey::Business(business_id), ChildCollection::Contacts, vec![])
            .await?
            .deleted)
    }

    /// Replace the stored owners. The owner list is kept as one encrypted
    /// JSON value on the business row.
    pub async fn set_owners(
        &self,
        business_id: i64,
        owners: &[OwnerInput],
        now: DateTime<Utc>,
    ) -> AppResult<BusinessRecord> {
        let business = self.find(business_id).await?;
        let plaintext = serde_json::to_string(owners)?;
        let updated = BusinessRecord {
            owners: Some(self.codec.encrypt_field(&plaintext)?),
            updated_at: now,
            ..business
        };
        self.businesses.update(&updated).await?;
        Ok(updated)
    }

    /// Decrypted owners of a business.
    pub fn owners(&self, business: &BusinessRecord) -> AppResult<Vec<OwnerInput>> {
        match business.owners.as_deref() {
            None => Ok(Vec::new()),
            Some(ciphertext) => {
                let plaintext = self.codec.decrypt_field(ciphertext)?;
                serde_json::from_str(&plaintext).map_err(|e| {
                    AppError::Crypto(format!("Stored owners are not valid JSON: {}", e))
                })
            }
        }
    }

    /// Backfill externally sourced fields. Fields the lookup did not return
    /// are left as they are.
    pub async fn apply_enrichment(
        &self,
        business_id: i64,
        result: &EnrichmentResult,
        now: DateTime<Utc>,
    ) -> AppResult<BusinessRecord> {
        let business = self.find(business_id).await?;
        let updated = BusinessRecord {
            registered_address: result
                .registered_address
                .clone()
                .or(business.registered_address.clone()),
            num_employees: result.employee_count.or(business.num_employees),
            updated_at: now,
            ..business
        };
        self.businesses.update(&updated).await?;
        Ok(updated)
    }

    /// Root document fields of a business. Encrypted columns are copied as
    /// ciphertext.
    pub fn document_fields(&self, business: &BusinessRecord) -> AppResult<Map<String, Value>> {
        let mut relational = match serde_json::to_value(business)? {
            Value::Object(map) => map,
            _ => {
                return Err(AppError::Mapping(
                    "business record did not serialize to an object".to_string(),
                ));
            }
        };
        for column in ["id", "owners", "created_at", "updated_at"] {
            relational.remove(column);
        }

        let mut fields = NameMapper::BUSINESS.to_document_naming(&relational);
        fields.insert("businessId".to_string(), Value::from(business.id));
        Ok(fields)
    }

    /// Document `owners` array, with owner names encrypted.
    pub fn owner_document_items(&self, owners: &[OwnerInput]) -> AppResult<Value> {
        let encrypted = owner_encrypted_fields();
        owners
            .iter()
            .map(|owner| {
                let relational = match serde_json::to_value(owner)? {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                let mut fields = NameMapper::OWNER.to_document_naming(&relational);
                for key in encrypted {
                    if let Some(Value::String(plaintext)) = fields.get(*key) {
                        let ciphertext = self.codec.encrypt_field(plaintext)?;
                        fields.insert(key.to_string(), Value::String(ciphertext));
                    }
                }
                Ok(Value::Object(fields))
            })
            .collect::<AppResult<Vec<_>>>()
            .map(Value::Array)
    }

    /// Owners from a stored document `owners` array.
    pub fn owners_from_document(&self, items: &[&Map<String, Value>]) -> AppResult<Vec<OwnerInput>> {
        let encrypted = owner_encrypted_fields();
        items
            .iter()
            .map(|item| {
                let mut fields = (*item).clone();
                for key in encrypted {
                    if let Some(Value::String(ciphertext)) = fields.get(*key) {
                        let plaintext = self.codec.decrypt_field(ciphertext)?;
                        fields.insert(key.to_string(), Value::String(plaintext));
                    }
                }
                let relational = NameMapper::OWNER.to_relational_naming(&fields);
                serde_json::from_value(Value::Object(relational))
                    .map_err(|e| AppError::Mapping(format!("owners item: {}", e)))
            })
            .collect()
    }

    fn protect(&self, input: &BusinessInput, now: DateTime<Utc>) -> AppResult<BusinessRecord> {
        let codec = &self.codec;
        Ok(BusinessRecord {
            id: 0,
            name: codec.encrypt_field(&input.name)?,
            name_hash: codec.hash_field(&input.name),
            dba: codec.encrypt_optional(input.dba.as_deref())?,
            ein: codec.encrypt_optional(input.ein.as_deref())?,
            ein_hash: input.normalized_ein().map(|ein| codec.hash_field(&ein)),
            entity_type: input.entity_type.clone(),
            website: codec.encrypt_optional(input.website.as_deref())?,
            mailing_address: codec.encrypt_optional(input.mailing_address.as_deref())?,
            mailing_address2: codec.encrypt_optional(input.mailing_address2.as_deref())?,
            mailing_city: input.mailing_city.clone(),
            mailing_state: input.mailing_state.clone(),
            mailing_zip: input.mailing_zip.clone(),
            industry_code: input.industry_code,
            owners: None,
            registered_address: None,
            num_employees: None,
            created_at: now,
            updated_at: now,
        })
    }
}

fn owner_encrypted_fields() -> &'static [&'static str] {
    ENCRYPTED_NESTED_FIELDS
        .iter()
        .find(|(key, _)| *key == "owners")
        .map(|(_, fields)| *fields)
        .unwrap_or(&[])
}

/// Typed, coerced business input from a `business` payload object.
pub fn parse_business_input(fields: &Map<String, Value>) -> AppResult<BusinessInput> {
    let declared: Map<String, Value> = fields
        .iter()
        .filter(|(key, _)| BusinessInput::FIELD_TYPES.iter().any(|(name, _)| name == key))
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    let coerced = coerce_fields(&declared, BusinessInput::FIELD_TYPES)?;

    let input: BusinessInput = serde_json::from_value(Value::Object(coerced))
        .map_err(|e| AppError::Validation(format!("invalid business information: {}", e)))?;
    if input.name.trim().is_empty() {
        return Err(AppError::Validation("business name is required".to_string()));
    }
    Ok(input)
}

/// Typed, coerced owners from an `owners` payload array.
pub fn parse_owners(items: &[&Map<String, Value>]) -> AppResult<Vec<OwnerInput>> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let relational = NameMapper::OWNER.to_relational_naming(item);
            let declared: Map<String, Value> = relational
                .into_iter()
                .filter(|(key, _)| OwnerInput::FIELD_TYPES.iter().any(|(name, _)| name == key))
                .collect();
            let coerced: Map<String, Value> = coerce_fields(&declared, OwnerInput::FIELD_TYPES)?
                .into_iter()
                .filter(|(_, value)| !value.is_null())
                .collect();
            serde_json::from_value(Value::Object(coerced))
                .map_err(|e| AppError::Validation(format!("owners[{}]: {}", index, e)))
        })
        .collect()
}
