//! Child collection synchronization.
//!
//! Every save of a step presents the full set of a collection, so the stored
//! rows for the parent are deleted and the incoming items inserted one at a
//! time, in payload order. Owner payroll is the one path that adds onto an
//! existing activity-code row instead of replacing it.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use super::field_codec::{FieldCodec, coerce_fields};
use super::name_mapper::NameMapper;
use crate::error::{AppError, AppResult};
use crate::models::{
    ActivityPayrollRow, ChildCollection, ChildItem, ParentKey, StoredChild,
};
use crate::store::ChildStore;

/// Outcome of one collection replacement.
#[derive(Debug, Clone, PartialEq)]
pub struct FanoutResult {
    pub collection: ChildCollection,
    /// Rows removed before reinsertion
    pub deleted: u64,
    /// Generated ids, in payload order
    pub ids: Vec<i64>,
    /// Inserted rows, in payload order
    pub items: Vec<ChildItem>,
}

impl FanoutResult {
    pub fn count(&self) -> usize {
        self.ids.len()
    }

    /// The inserted rows in document naming.
    pub fn document_items(&self) -> AppResult<Value> {
        self.items
            .iter()
            .map(|item| item_to_document(item).map(Value::Object))
            .collect::<AppResult<Vec<_>>>()
            .map(Value::Array)
    }
}

#[derive(Clone)]
pub struct ChildFanoutManager {
    children: Arc<dyn ChildStore>,
    codec: Arc<FieldCodec>,
}

impl ChildFanoutManager {
    pub fn new(children: Arc<dyn ChildStore>, codec: Arc<FieldCodec>) -> Self {
        Self { children, codec }
    }

    /// Replace the collection under `parent` with `incoming` payload items.
    ///
    /// Items are validated and mapped before anything is deleted, so a bad
    /// item leaves the stored collection untouched.
    pub async fn replace_children(
        &self,
        parent: ParentKey,
        collection: ChildCollection,
        incoming: &[&Map<String, Value>],
    ) -> AppResult<FanoutResult> {
        let items = self.prepare_items(collection, incoming)?;
        self.replace_items(parent, collection, items).await
    }

    /// Validate and map payload items without touching the store.
    pub fn prepare_items(
        &self,
        collection: ChildCollection,
        incoming: &[&Map<String, Value>],
    ) -> AppResult<Vec<ChildItem>> {
        incoming
            .iter()
            .enumerate()
            .map(|(index, fields)| self.prepare_item(collection, index, fields))
            .collect()
    }

    /// Replace the collection under `parent` with already-typed rows.
    pub async fn replace_items(
        &self,
        parent: ParentKey,
        collection: ChildCollection,
        items: Vec<ChildItem>,
    ) -> AppResult<FanoutResult> {
        if parent.kind() != collection.parent_kind() {
            return Err(AppError::Mapping(format!(
                "{} cannot be stored under {}",
                collection, parent
            )));
        }
        if let Some(stray) = items.iter().find(|item| item.collection() != collection) {
            return Err(AppError::Mapping(format!(
                "{} item passed to the {} collection",
                stray.collection(),
                collection
            )));
        }

        let deleted = self.children.delete_all(parent, collection).await?;

        let mut ids = Vec::with_capacity(items.len());
        for item in &items {
            ids.push(self.children.insert(parent, item).await?);
        }

        debug!(
            "Replaced {} for {}: deleted {}, inserted {}",
            collection,
            parent,
            deleted,
            ids.len()
        );

        Ok(FanoutResult {
            collection,
            deleted,
            ids,
            items,
        })
    }

    /// Add owner payroll onto the activity-code row for `activity_code_id`,
    /// inserting the row when the application has none for that code.
    pub async fn accumulate_payroll(
        &self,
        application_id: i64,
        activity_code_id: i64,
        payroll: i64,
    ) -> AppResult<ActivityPayrollRow> {
        let parent = ParentKey::Application(application_id);
        let existing = self
            .children
            .list(parent, ChildCollection::ActivityCodes)
            .await?
            .into_iter()
            .find_map(|StoredChild { id, item }| match item {
                ChildItem::ActivityCode(row) if row.activity_code_id == activity_code_id => {
                    Some((id, row))
                }
                _ => None,
            });

        match existing {
            Some((id, row)) => {
                let total = row.payroll.checked_add(payroll).ok_or_else(|| {
                    AppError::Validation(format!(
                        "payroll for activity code {} is out of range",
                        activity_code_id
                    ))
                })?;
                let updated = ActivityPayrollRow {
                    payroll: total,
                    ..row
                };
                self.children
                    .update(id, &ChildItem::ActivityCode(updated.clone()))
                    .await?;
                Ok(updated)
            }
            None => {
                let row = ActivityPayrollRow {
                    activity_code_id,
                    payroll,
                };
                self.children
                    .insert(parent, &ChildItem::ActivityCode(row.clone()))
                    .await?;
                Ok(row)
            }
        }
    }

    pub async fn list(
        &self,
        parent: ParentKey,
        collection: ChildCollection,
    ) -> AppResult<Vec<ChildItem>> {
        Ok(self
            .children
            .list(parent, collection)
            .await?
            .into_iter()
            .map(|stored| stored.item)
            .collect())
    }

    /// Turn one payload item into a typed row: normalize names, coerce,
    /// check required fields, protect contact PII.
    fn prepare_item(
        &self,
        collection: ChildCollection,
        index: usize,
        fields: &Map<String, Value>,
    ) -> AppResult<ChildItem> {
        let relational = NameMapper::for_collection(collection).to_relational_naming(fields);
        let declared: Map<String, Value> = relational
            .into_iter()
            .filter(|(key, _)| collection.field_types().iter().any(|(name, _)| name == key))
            .collect();
        let mut coerced = coerce_fields(&declared, collection.field_types())?;

        for required in collection.required_fields() {
            let present = match coerced.get(*required) {
                None | Some(Value::Null) => false,
                Some(Value::String(s)) => !s.is_empty(),
                Some(_) => true,
            };
            if !present {
                return Err(AppError::Mapping(format!(
                    "{}[{}] is missing required field '{}'",
                    collection, index, required
                )));
            }
        }

        if collection == ChildCollection::Contacts {
            self.protect_contact(&mut coerced)?;
        }

        ChildItem::from_relational(collection, &coerced)
    }

    fn protect_contact(&self, fields: &mut Map<String, Value>) -> AppResult<()> {
        if let Some(Value::String(email)) = fields.get("email").cloned() {
            fields.insert(
                "email_hash".to_string(),
                Value::String(self.codec.hash_field(&email)),
            );
            fields.insert(
                "email".to_string(),
                Value::String(self.codec.encrypt_field(&email)?),
            );
        }
        if let Some(Value::String(phone)) = fields.get("phone").cloned() {
            if phone.is_empty() {
                fields.remove("phone");
            } else {
                fields.insert(
                    "phone".to_string(),
                    Value::String(self.codec.encrypt_field(&phone)?),
                );
            }
        }
        Ok(())
    }
}

/// Document form of a stored row. Contact PII stays ciphertext.
pub fn item_to_document(item: &ChildItem) -> AppResult<Map<String, Value>> {
    let fields = item.relational_fields()?;
    Ok(NameMapper::for_collection(item.collection()).to_document_naming(&fields))
}

/// Rebuild a row from its document form, as written by [`item_to_document`].
pub fn item_from_document(
    collection: ChildCollection,
    fields: &Map<String, Value>,
) -> AppResult<ChildItem> {
    let relational = NameMapper::for_collection(collection).to_relational_naming(fields);
    ChildItem::from_relational(collection, &relational)
}
