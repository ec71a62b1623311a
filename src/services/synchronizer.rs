//! Application step persistence across the relational and document stores.
//!
//! A step save loads the canonical record, asks the workflow whether the step
//! may be saved, applies the step's transform (business upsert, child
//! fan-out, status moves), writes the relational record and then merges the
//! document. The relational write is authoritative: any failure up to and
//! including it rejects the save. Document writes, notifications and
//! enrichment are best-effort and only logged when they fail.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::business_bridge::{BusinessRecordBridge, parse_owners};
use super::child_fanout::{ChildFanoutManager, item_from_document, item_to_document};
use super::enrichment::{EnrichmentLookup, EnrichmentQuery};
use super::field_codec::coerce_fields;
use super::name_mapper::NameMapper;
use super::notifications::{Notification, NotificationQueue};
use super::question_catalog::{QuestionCatalog, QuestionContext, annotate_answers};
use super::workflow::{SaveOptions, StepPlan, StepTransform, WorkflowStateMachine};
use crate::config::WorkflowConfig;
use crate::error::{AppError, AppResult};
use crate::models::document::{EMBEDDED_ARRAYS, ENCRYPTED_ROOT_FIELDS};
use crate::models::payload::object_array;
use crate::models::{
    AgencyAssignment, AppStatus, BUSINESS_COLUMNS, ApplicationDocument, ApplicationIdentity, ApplicationRecord,
    ApplicationState, BusinessRecord, ChildCollection, ChildItem, EDITABLE_APPLICATION_FIELDS,
    LegalAcceptance, POLICY_FLATTENED_FIELDS, ParentKey, ParentKind, PolicyTypeRow,
    QuestionAnswerRow, StepPayload, WorkflowStep,
};
use crate::store::PersistenceContext;

/// Relational columns a document replay may restore besides the editable ones.
const REPLAYED_COLUMNS: &[&str] = &[
    "last_step",
    "progress",
    "state",
    "status",
    "app_status_id",
    "bind_quote_id",
    "agency_network_id",
    "agency_id",
    "agency_location_id",
];

/// Step output that only affects the document.
type DocumentPatch = Map<String, Value>;

#[derive(Clone)]
pub struct DualStoreSynchronizer {
    ctx: PersistenceContext,
    workflow: WorkflowStateMachine,
    fanout: ChildFanoutManager,
    bridge: BusinessRecordBridge,
    notifications: NotificationQueue,
    enrichment: Option<Arc<dyn EnrichmentLookup>>,
    questions: Option<Arc<dyn QuestionCatalog>>,
    default_agency_id: i64,
}

impl DualStoreSynchronizer {
    pub fn new(
        ctx: PersistenceContext,
        config: &WorkflowConfig,
        notifications: NotificationQueue,
    ) -> Self {
        let fanout = ChildFanoutManager::new(ctx.children.clone(), ctx.codec.clone());
        let bridge =
            BusinessRecordBridge::new(ctx.businesses.clone(), fanout.clone(), ctx.codec.clone());

        Self {
            workflow: WorkflowStateMachine::new(config),
            fanout,
            bridge,
            notifications,
            enrichment: None,
            questions: None,
            default_agency_id: config.default_agency_id,
            ctx,
        }
    }

    pub fn with_enrichment(self, lookup: Arc<dyn EnrichmentLookup>) -> Self {
        Self {
            enrichment: Some(lookup),
            ..self
        }
    }

    pub fn with_question_catalog(self, catalog: Arc<dyn QuestionCatalog>) -> Self {
        Self {
            questions: Some(catalog),
            ..self
        }
    }

    pub fn context(&self) -> &PersistenceContext {
        &self.ctx
    }

    pub fn fanout(&self) -> &ChildFanoutManager {
        &self.fanout
    }

    /// Save one workflow step and return the decrypted canonical document.
    pub async fn save_application_step(
        &self,
        step_name: &str,
        payload: StepPayload,
        options: SaveOptions,
    ) -> AppResult<ApplicationDocument> {
        if WorkflowStep::parse(step_name).is_none() {
            return Err(AppError::UnknownStep(step_name.to_string()));
        }

        let now = Utc::now();
        let current = match payload.identity()? {
            Some(identity) => Some(self.find_record(identity).await?),
            None => None,
        };

        let plan = self
            .workflow
            .advance(current.as_ref(), step_name, &payload, &options, now)?;

        let record = match current {
            Some(record) => record,
            None => {
                let agency = self.resolve_agency(&payload).await?;
                ApplicationRecord::new(Uuid::new_v4(), agency, now)
            }
        };

        let scalars = payload.scalars();
        let coerced = coerce_fields(&scalars, EDITABLE_APPLICATION_FIELDS)?;
        let record = record
            .with_fields(&coerced)?
            .with_last_step(plan.last_step)
            .touched(now);

        let (record, mut patch) = self.apply_transform(&plan, record, &payload, now).await?;

        let record = if plan.creating {
            let inserted = self.ctx.applications.insert(&record).await?;
            info!(
                "Created application {} (id {}) at step {}",
                inserted.uuid, inserted.id, plan.step
            );
            inserted
        } else {
            self.ctx.applications.update(&record).await?;
            info!(
                "Saved step {} for application {} (last_step {})",
                plan.step, record.uuid, record.last_step
            );
            record
        };

        for kind in &plan.notifications {
            self.notifications
                .dispatch(Notification::new(record.id, kind.clone()));
        }

        for (key, value) in free_document_scalars(&coerced) {
            patch.entry(key).or_insert(value);
        }
        for (key, value) in record_document_fields(&record)? {
            patch.insert(key, value);
        }
        if plan.creating {
            patch.insert("active".to_string(), Value::Bool(true));
        }

        let document = self.write_document(record.uuid, &patch).await;

        if plan.step == WorkflowStep::Contact {
            self.spawn_enrichment(&record, &payload);
        }

        self.ctx.codec.decrypt_document(&document)
    }

    /// Set status text and code directly, bypassing the forward-only rule.
    pub async fn update_status(
        &self,
        identity: ApplicationIdentity,
        status: &str,
        app_status_id: i32,
    ) -> AppResult<ApplicationRecord> {
        let record = self
            .find_record(identity)
            .await?
            .with_status(status, app_status_id)
            .touched(Utc::now());
        self.ctx.applications.update(&record).await?;

        let mut patch = Map::new();
        patch.insert("status".to_string(), Value::from(record.status.clone()));
        patch.insert("appStatusId".to_string(), Value::from(record.app_status_id));
        self.mirror(&record, patch).await;
        Ok(record)
    }

    pub async fn update_progress(
        &self,
        identity: ApplicationIdentity,
        progress: &str,
    ) -> AppResult<ApplicationRecord> {
        let record = self
            .find_record(identity)
            .await?
            .with_progress(progress)
            .touched(Utc::now());
        self.ctx.applications.update(&record).await?;

        let mut patch = Map::new();
        patch.insert("progress".to_string(), Value::from(record.progress.clone()));
        self.mirror(&record, patch).await;
        Ok(record)
    }

    pub async fn update_state(
        &self,
        identity: ApplicationIdentity,
        state: ApplicationState,
    ) -> AppResult<ApplicationRecord> {
        let record = self
            .find_record(identity)
            .await?
            .with_state(state)
            .touched(Utc::now());
        self.ctx.applications.update(&record).await?;

        let mut patch = Map::new();
        patch.insert("state".to_string(), Value::from(record.state));
        patch.insert(
            "active".to_string(),
            Value::Bool(state != ApplicationState::Deleted),
        );
        self.mirror(&record, patch).await;
        Ok(record)
    }

    /// Soft delete: relational state `deleted`, document `active = false`.
    pub async fn delete_application(
        &self,
        identity: ApplicationIdentity,
    ) -> AppResult<ApplicationRecord> {
        let record = self.update_state(identity, ApplicationState::Deleted).await?;
        info!("Deleted application {}", record.uuid);
        Ok(record)
    }

    /// Decrypted document of an application. When the document is missing or
    /// unreadable it is rebuilt from the relational store.
    pub async fn get_application(&self, uuid: Uuid) -> AppResult<ApplicationDocument> {
        match self.ctx.documents.find(uuid).await {
            Ok(Some(document)) => return self.ctx.codec.decrypt_document(&document),
            Ok(None) => debug!("No document for application {}; projecting", uuid),
            Err(e) => warn!(
                "Failed to read document for application {}: {}; projecting",
                uuid, e
            ),
        }

        let record = self.find_record(ApplicationIdentity::Uuid(uuid)).await?;
        let projection = self.project_document(&record).await?;
        self.ctx.codec.decrypt_document(&projection)
    }

    /// Rebuild the relational side of an application from its document.
    ///
    /// Restores the business, the record's scalar columns and every child
    /// collection present in the document. `last_step` never moves backwards.
    pub async fn replay_document(&self, uuid: Uuid) -> AppResult<ApplicationRecord> {
        let document = self
            .ctx
            .documents
            .find(uuid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Document for application {}", uuid)))?;
        let now = Utc::now();

        let existing = self.ctx.applications.find_by_uuid(uuid).await?;
        let relational = NameMapper::APPLICATION.to_relational_naming(&document.scalar_fields());

        let record = match existing.clone() {
            Some(record) => record,
            None => {
                let agency = self.replayed_agency(&relational).await?;
                ApplicationRecord::new(uuid, agency, now)
            }
        };

        let business_id = self
            .replay_business(&document, record.business_id, now)
            .await?;

        let mut columns = record.relational_fields()?;
        for (column, _) in EDITABLE_APPLICATION_FIELDS {
            if let Some(value) = relational.get(*column) {
                columns.insert(column.to_string(), value.clone());
            }
        }
        for column in REPLAYED_COLUMNS {
            if let Some(value) = relational.get(*column).filter(|v| !v.is_null()) {
                columns.insert(column.to_string(), value.clone());
            }
        }
        let replayed: ApplicationRecord = serde_json::from_value(Value::Object(columns))
            .map_err(|e| AppError::Mapping(format!("document {} does not map: {}", uuid, e)))?;

        let policies = document_items(&document, ChildCollection::PolicyTypes)?;
        let policy_rows: Vec<PolicyTypeRow> = policies
            .iter()
            .filter_map(|item| match item {
                ChildItem::PolicyType(row) => Some(row.clone()),
                _ => None,
            })
            .collect();

        let last_step = record.last_step.max(replayed.last_step);
        let mut replayed = replayed.with_last_step(last_step).touched(now);
        if document.get(ChildCollection::PolicyTypes.document_key()).is_some() {
            replayed = replayed.with_policy_selection(&policy_rows);
        }
        if let Some(id) = business_id {
            replayed = replayed.with_business(id);
        }

        let record = match existing {
            Some(_) => {
                self.ctx.applications.update(&replayed).await?;
                replayed
            }
            None => self.ctx.applications.insert(&replayed).await?,
        };

        for collection in ChildCollection::ALL {
            if document.get(collection.document_key()).is_none() {
                continue;
            }
            let parent = match collection.parent_kind() {
                ParentKind::Application => ParentKey::Application(record.id),
                ParentKind::Business => match record.business_id {
                    Some(id) => ParentKey::Business(id),
                    None => {
                        warn!(
                            "Skipping {} replay for application {}: no business",
                            collection, uuid
                        );
                        continue;
                    }
                },
            };
            let items = document_items(&document, collection)?;
            self.fanout.replace_items(parent, collection, items).await?;
        }

        if let (Some(id), Some(owners)) = (record.business_id, object_array(document.fields(), "owners")?) {
            let owners = self.bridge.owners_from_document(&owners)?;
            self.bridge.set_owners(id, &owners, now).await?;
        }

        let mut patch = Map::new();
        patch.insert("mysqlId".to_string(), Value::from(record.id));
        if let Some(id) = record.business_id {
            patch.insert("businessId".to_string(), Value::from(id));
        }
        self.mirror(&record, patch).await;

        info!(
            "Replayed document for application {} into record {}",
            uuid, record.id
        );
        Ok(record)
    }

    async fn find_record(&self, identity: ApplicationIdentity) -> AppResult<ApplicationRecord> {
        let found = match identity {
            ApplicationIdentity::Id(id) => self.ctx.applications.find_by_id(id).await?,
            ApplicationIdentity::Uuid(uuid) => self.ctx.applications.find_by_uuid(uuid).await?,
        };
        found.ok_or_else(|| AppError::NotFound(identity.to_string()))
    }

    /// Agency assignment of a new application: the supplied agency or the
    /// system default, at the supplied location or the agency's primary one.
    async fn resolve_agency(&self, payload: &StepPayload) -> AppResult<AgencyAssignment> {
        let agency_id = payload
            .integer("agency_id")
            .unwrap_or(self.default_agency_id);
        self.assignment(agency_id, payload.integer("agency_location_id"))
            .await
    }

    async fn replayed_agency(&self, relational: &Map<String, Value>) -> AppResult<AgencyAssignment> {
        let agency_id = relational
            .get("agency_id")
            .and_then(Value::as_i64)
            .unwrap_or(self.default_agency_id);
        let location_id = relational.get("agency_location_id").and_then(Value::as_i64);
        self.assignment(agency_id, location_id).await
    }

    async fn assignment(
        &self,
        agency_id: i64,
        location_id: Option<i64>,
    ) -> AppResult<AgencyAssignment> {
        let agency = self
            .ctx
            .agencies
            .get_agency_by_id(agency_id)
            .await?
            .ok_or_else(|| AppError::Validation(format!("unknown agency {}", agency_id)))?;

        let agency_location_id = match location_id {
            Some(id) => id,
            None => self
                .ctx
                .agencies
                .get_primary_location(agency.id)
                .await?
                .map(|location| location.id)
                .ok_or_else(|| {
                    AppError::Validation(format!("agency {} has no primary location", agency.id))
                })?,
        };

        Ok(AgencyAssignment {
            agency_network_id: agency.agency_network_id,
            agency_id: agency.id,
            agency_location_id,
        })
    }

    async fn apply_transform(
        &self,
        plan: &StepPlan,
        record: ApplicationRecord,
        payload: &StepPayload,
        now: DateTime<Utc>,
    ) -> AppResult<(ApplicationRecord, DocumentPatch)> {
        let mut patch = DocumentPatch::new();

        let record = match &plan.transform {
            StepTransform::SaveBusiness => {
                let mut fields = payload
                    .object("business")?
                    .cloned()
                    .ok_or_else(|| AppError::Validation("business information is required".to_string()))?;
                for key in ["contacts", "locations"] {
                    if let (false, Some(value)) = (fields.contains_key(key), payload.get(key)) {
                        fields.insert(key.to_string(), value.clone());
                    }
                }

                let upsert = self
                    .bridge
                    .upsert_business(record.business_id, &fields, now)
                    .await?;
                patch.extend(self.bridge.document_fields(&upsert.business)?);
                if let Some(ref contacts) = upsert.contacts {
                    patch.insert("contacts".to_string(), contacts.document_items()?);
                }
                if let Some(ref locations) = upsert.locations {
                    patch.insert("locations".to_string(), locations.document_items()?);
                }
                record.with_business(upsert.business.id)
            }
            StepTransform::ReplacePolicies => {
                let items = payload.array("policy_types")?.unwrap_or_default();
                let result = self
                    .fanout
                    .replace_children(
                        ParentKey::Application(record.id),
                        ChildCollection::PolicyTypes,
                        &items,
                    )
                    .await?;
                let policies: Vec<PolicyTypeRow> = result
                    .items
                    .iter()
                    .filter_map(|item| match item {
                        ChildItem::PolicyType(row) => Some(row.clone()),
                        _ => None,
                    })
                    .collect();
                patch.insert("policies".to_string(), result.document_items()?);
                record.with_policy_selection(&policies)
            }
            StepTransform::ReplaceLocations => {
                let business_id = require_business(&record)?;
                let items = payload.array("locations")?.unwrap_or_default();
                let codes = aggregate_activity_codes(payload, &items)?;
                let locations = self.bridge.replace_addresses(business_id, &items).await?;
                patch.insert("locations".to_string(), locations.document_items()?);

                if let Some(codes) = codes {
                    let refs: Vec<&Map<String, Value>> = codes.iter().collect();
                    let result = self
                        .fanout
                        .replace_children(
                            ParentKey::Application(record.id),
                            ChildCollection::ActivityCodes,
                            &refs,
                        )
                        .await?;
                    patch.insert("activityCodes".to_string(), result.document_items()?);
                }
                record
            }
            StepTransform::SaveOwners => {
                let business_id = require_business(&record)?;
                let items = payload.array("owners")?.unwrap_or_default();
                let owners = parse_owners(&items)?;
                self.bridge.set_owners(business_id, &owners, now).await?;
                patch.insert(
                    "owners".to_string(),
                    self.bridge.owner_document_items(&owners)?,
                );

                let covered: Vec<(i64, i64)> =
                    owners.iter().filter_map(|o| o.covered_payroll()).collect();
                for (activity_code_id, payroll) in &covered {
                    self.fanout
                        .accumulate_payroll(record.id, *activity_code_id, *payroll)
                        .await?;
                }
                if !covered.is_empty() {
                    patch.insert(
                        "activityCodes".to_string(),
                        self.collection_document(
                            ParentKey::Application(record.id),
                            ChildCollection::ActivityCodes,
                        )
                        .await?,
                    );
                }

                let included = owners.iter().filter(|o| o.include).count();
                let mut fields = Map::new();
                if !payload.fields().contains_key("owners_covered") {
                    fields.insert("owners_covered".to_string(), Value::from(included as i64));
                }
                record.with_fields(&fields)?
            }
            StepTransform::UpdateDetails => record,
            StepTransform::ReplaceClaims => {
                let items = payload.array("claims")?.unwrap_or_default();
                let result = self
                    .fanout
                    .replace_children(
                        ParentKey::Application(record.id),
                        ChildCollection::Claims,
                        &items,
                    )
                    .await?;
                patch.insert("claims".to_string(), result.document_items()?);
                record
            }
            StepTransform::RecordQuestions(legal) => {
                let items = payload.array("questions")?.unwrap_or_default();
                let answers: Vec<QuestionAnswerRow> = self
                    .fanout
                    .prepare_items(ChildCollection::Questions, &items)?
                    .into_iter()
                    .filter_map(|item| match item {
                        ChildItem::Question(row) => Some(row),
                        _ => None,
                    })
                    .collect();
                let answers = self.filter_answers(&record, payload, answers).await?;

                let result = self
                    .fanout
                    .replace_items(
                        ParentKey::Application(record.id),
                        ChildCollection::Questions,
                        answers.into_iter().map(ChildItem::Question).collect(),
                    )
                    .await?;
                patch.insert("questions".to_string(), result.document_items()?);

                let acceptance = LegalAcceptance {
                    application_id: record.id,
                    ip: legal.ip.clone(),
                    version: legal.version,
                    created_at: now,
                };
                self.ctx
                    .applications
                    .insert_legal_acceptance(&acceptance)
                    .await?;
                patch.insert(
                    "legalAcceptance".to_string(),
                    serde_json::json!({
                        "ip": acceptance.ip,
                        "version": acceptance.version,
                        "acceptedAt": acceptance.created_at.to_rfc3339(),
                    }),
                );
                record.with_status_forward(AppStatus::QuestionsDone)
            }
            StepTransform::MarkQuoting => record
                .with_status_forward(AppStatus::Quoting)
                .with_progress("quoting"),
            StepTransform::RequestBind { quote_id } => record
                .with_status_forward(AppStatus::RequestToBind)
                .with_bind_quote(quote_id),
        };

        Ok((record, patch))
    }

    /// Drop answers to questions outside the catalog for this application.
    /// A catalog failure keeps every answer.
    async fn filter_answers(
        &self,
        record: &ApplicationRecord,
        payload: &StepPayload,
        answers: Vec<QuestionAnswerRow>,
    ) -> AppResult<Vec<QuestionAnswerRow>> {
        let Some(ref catalog) = self.questions else {
            return Ok(answers);
        };

        let context = self.question_context(record, payload).await?;
        match catalog.get_questions_for_context(&context).await {
            Ok(definitions) => {
                let kept = annotate_answers(answers, &definitions);
                debug!(
                    "Question catalog kept {} answers for application {}",
                    kept.len(),
                    record.uuid
                );
                Ok(kept)
            }
            Err(e) => {
                warn!(
                    "Question catalog lookup failed for application {}: {}",
                    record.uuid, e
                );
                Ok(answers)
            }
        }
    }

    async fn question_context(
        &self,
        record: &ApplicationRecord,
        payload: &StepPayload,
    ) -> AppResult<QuestionContext> {
        let app = ParentKey::Application(record.id);
        let activity_codes = self
            .fanout
            .list(app, ChildCollection::ActivityCodes)
            .await?
            .into_iter()
            .filter_map(|item| match item {
                ChildItem::ActivityCode(row) => Some(row.activity_code_id),
                _ => None,
            })
            .collect();
        let policy_types = self
            .fanout
            .list(app, ChildCollection::PolicyTypes)
            .await?
            .into_iter()
            .filter_map(|item| match item {
                ChildItem::PolicyType(row) => Some(row.policy_type),
                _ => None,
            })
            .collect();
        let zip_codes = match record.business_id {
            Some(id) => self
                .fanout
                .list(ParentKey::Business(id), ChildCollection::Locations)
                .await?
                .into_iter()
                .filter_map(|item| match item {
                    ChildItem::Location(row) => Some(row.zip),
                    _ => None,
                })
                .collect(),
            None => Vec::new(),
        };
        let insurer_ids = payload
            .get("insurer_ids")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default();

        Ok(QuestionContext {
            activity_codes,
            industry_code: record.industry_code,
            zip_codes,
            policy_types,
            insurer_ids,
        })
    }

    async fn collection_document(
        &self,
        parent: ParentKey,
        collection: ChildCollection,
    ) -> AppResult<Value> {
        self.fanout
            .list(parent, collection)
            .await?
            .iter()
            .map(|item| item_to_document(item).map(Value::Object))
            .collect::<AppResult<Vec<_>>>()
            .map(Value::Array)
    }

    /// Document rebuilt from the relational store alone.
    async fn project_document(&self, record: &ApplicationRecord) -> AppResult<ApplicationDocument> {
        let mut fields = record_document_fields(record)?;
        fields.insert(
            "active".to_string(),
            Value::Bool(record.state() != Some(ApplicationState::Deleted)),
        );

        let app = ParentKey::Application(record.id);
        for collection in [
            ChildCollection::Claims,
            ChildCollection::PolicyTypes,
            ChildCollection::ActivityCodes,
            ChildCollection::Questions,
        ] {
            fields.insert(
                collection.document_key().to_string(),
                self.collection_document(app, collection).await?,
            );
        }

        if let Some(business_id) = record.business_id {
            let business: BusinessRecord = self.bridge.find(business_id).await?;
            fields.extend(self.bridge.document_fields(&business)?);
            let owners = self.bridge.owners(&business)?;
            fields.insert("owners".to_string(), self.bridge.owner_document_items(&owners)?);

            let parent = ParentKey::Business(business_id);
            for collection in [ChildCollection::Locations, ChildCollection::Contacts] {
                fields.insert(
                    collection.document_key().to_string(),
                    self.collection_document(parent, collection).await?,
                );
            }
        }

        Ok(ApplicationDocument::new(fields))
    }

    /// Restore the business row from the document's root business fields.
    async fn replay_business(
        &self,
        document: &ApplicationDocument,
        business_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<i64>> {
        if document.get("businessName").is_none() {
            return Ok(business_id);
        }

        let mut fields = document.scalar_fields();
        for key in ENCRYPTED_ROOT_FIELDS {
            if let Some(Value::String(ciphertext)) = fields.get(*key) {
                let plaintext = self.ctx.codec.decrypt_field(ciphertext)?;
                fields.insert(key.to_string(), Value::String(plaintext));
            }
        }
        let relational = NameMapper::BUSINESS.to_relational_naming(&fields);
        let upsert = self
            .bridge
            .upsert_business(business_id, &relational, now)
            .await?;
        Ok(Some(upsert.business.id))
    }

    /// Merge into the document store. Failures are logged and the patch
    /// itself is returned as the best known document.
    async fn write_document(&self, uuid: Uuid, patch: &DocumentPatch) -> ApplicationDocument {
        match self.ctx.documents.merge(uuid, patch).await {
            Ok(document) => document,
            Err(e) => {
                warn!(
                    "Document write failed for application {} (relational store is ahead): {}",
                    uuid, e
                );
                ApplicationDocument::new(patch.clone())
            }
        }
    }

    /// Best-effort mirror of a side-channel write onto the document.
    async fn mirror(&self, record: &ApplicationRecord, mut patch: DocumentPatch) {
        patch.insert(
            "updatedAt".to_string(),
            Value::from(record.updated_at.to_rfc3339()),
        );
        if let Err(e) = self.ctx.documents.merge(record.uuid, &patch).await {
            warn!(
                "Document mirror failed for application {} (id {}): {}",
                record.uuid, record.id, e
            );
        }
    }

    fn spawn_enrichment(&self, record: &ApplicationRecord, payload: &StepPayload) {
        let (Some(lookup), Some(business_id)) = (self.enrichment.clone(), record.business_id)
        else {
            return;
        };
        let input = match payload
            .object("business")
            .ok()
            .flatten()
            .map(super::business_bridge::parse_business_input)
        {
            Some(Ok(input)) => input,
            _ => return,
        };

        let query = EnrichmentQuery::from(&input);
        let bridge = self.bridge.clone();
        let documents = self.ctx.documents.clone();
        let uuid = record.uuid;

        tokio::spawn(async move {
            let result = match lookup.lookup_business_data(&query).await {
                Ok(result) if result.is_empty() => {
                    debug!("Enrichment returned nothing for application {}", uuid);
                    return;
                }
                Ok(result) => result,
                Err(e) => {
                    warn!("Enrichment lookup failed for application {}: {}", uuid, e);
                    return;
                }
            };

            if let Err(e) = bridge
                .apply_enrichment(business_id, &result, Utc::now())
                .await
            {
                warn!(
                    "Failed to store enrichment for business {} (application {}): {}",
                    business_id, uuid, e
                );
                return;
            }
            if let Err(e) = documents.merge(uuid, &result.document_fields()).await {
                warn!(
                    "Failed to mirror enrichment to document for application {}: {}",
                    uuid, e
                );
            }
        });
    }
}

fn require_business(record: &ApplicationRecord) -> AppResult<i64> {
    record.business_id.ok_or_else(|| {
        AppError::Validation(format!(
            "application {} has no business; save the contact step first",
            record.uuid
        ))
    })
}

/// Record-derived document fields. Per-policy columns live in `policies`.
fn record_document_fields(record: &ApplicationRecord) -> AppResult<Map<String, Value>> {
    let mut relational = record.relational_fields()?;
    for column in POLICY_FLATTENED_FIELDS {
        relational.remove(*column);
    }
    let mut fields = NameMapper::APPLICATION.to_document_naming(&relational);
    fields.insert(
        "active".to_string(),
        Value::Bool(record.state() != Some(ApplicationState::Deleted)),
    );
    Ok(fields)
}

/// Document keys written only by the record, the business bridge or the
/// child collections.
static OWNED_DOCUMENT_KEYS: LazyLock<BTreeSet<String>> = LazyLock::new(|| {
    let mut keys: BTreeSet<String> = BUSINESS_COLUMNS
        .iter()
        .map(|column| NameMapper::BUSINESS.document_name(column))
        .collect();
    keys.extend(
        ENCRYPTED_ROOT_FIELDS
            .iter()
            .chain(EMBEDDED_ARRAYS)
            .chain(&["businessId", "mysqlId", "applicationId", "active"])
            .map(|key| key.to_string()),
    );
    keys
});

/// Whether a payload key would land on a document field it does not own.
fn is_owned_document_key(key: &str) -> bool {
    BUSINESS_COLUMNS.contains(&key)
        || BUSINESS_COLUMNS.contains(&NameMapper::BUSINESS.relational_name(key).as_str())
        || OWNED_DOCUMENT_KEYS.contains(key)
        || OWNED_DOCUMENT_KEYS.contains(&NameMapper::APPLICATION.document_name(key))
}

/// Payload scalars that have no relational column, in document naming.
/// Keys owned by the business or the record are dropped.
fn free_document_scalars(scalars: &Map<String, Value>) -> Map<String, Value> {
    let free: Map<String, Value> = scalars
        .iter()
        .filter(|(key, _)| !EDITABLE_APPLICATION_FIELDS.iter().any(|(name, _)| name == key))
        .filter(|(key, _)| !is_owned_document_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    NameMapper::APPLICATION.to_document_naming(&free)
}

/// Sum payroll per activity code over `locations[].activity_codes` and a
/// top-level `activity_codes` array, in first-seen order. `None` when the
/// payload carries no activity codes at all.
fn aggregate_activity_codes(
    payload: &StepPayload,
    locations: &[&Map<String, Value>],
) -> AppResult<Option<Vec<Map<String, Value>>>> {
    let mut sources = Vec::new();
    for location in locations {
        for key in ["activity_codes", "activityCodes"] {
            if let Some(items) = object_array(location, key)? {
                sources.extend(items);
            }
        }
    }
    if let Some(items) = payload.array("activity_codes")? {
        sources.extend(items);
    }
    if sources.is_empty() {
        return Ok(None);
    }

    let mapper = NameMapper::for_collection(ChildCollection::ActivityCodes);
    let mut order = Vec::new();
    let mut totals: BTreeMap<i64, i64> = BTreeMap::new();
    for (index, item) in sources.iter().enumerate() {
        let relational = mapper.to_relational_naming(item);
        let coerced = coerce_fields(&relational, ChildCollection::ActivityCodes.field_types())?;
        let code = coerced
            .get("activity_code_id")
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                AppError::Mapping(format!(
                    "activity_codes[{}] is missing required field 'activity_code_id'",
                    index
                ))
            })?;
        let payroll = coerced.get("payroll").and_then(Value::as_i64).unwrap_or(0);
        if !totals.contains_key(&code) {
            order.push(code);
        }
        let total = totals.entry(code).or_insert(0);
        *total = total.checked_add(payroll).ok_or_else(|| {
            AppError::Validation(format!("payroll for activity code {} is out of range", code))
        })?;
    }

    Ok(Some(
        order
            .into_iter()
            .map(|code| {
                let mut fields = Map::new();
                fields.insert("activity_code_id".to_string(), Value::from(code));
                fields.insert("payroll".to_string(), Value::from(totals[&code]));
                fields
            })
            .collect(),
    ))
}

/// Typed rows of a document array.
fn document_items(
    document: &ApplicationDocument,
    collection: ChildCollection,
) -> AppResult<Vec<ChildItem>> {
    document
        .array(collection.document_key())
        .into_iter()
        .map(|fields| item_from_document(collection, fields))
        .collect()
}
