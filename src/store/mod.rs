//! Repository interfaces for the two application stores and the persistence
//! context handed to every workflow component.
//!
//! The relational side (applications, businesses, child rows, agencies) is
//! implemented with SeaORM in [`crate::db`]; the document side is S3. Both have
//! an in-memory implementation in [`memory`].

pub mod memory;
pub mod s3_documents;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::{
    Agency, AgencyLocation, ApplicationDocument, ApplicationRecord, BusinessRecord, ChildCollection,
    ChildItem, LegalAcceptance, ParentKey, StoredChild,
};
use crate::services::field_codec::FieldCodec;

pub use memory::MemoryBackend;
pub use s3_documents::S3DocumentStore;

/// Canonical relational application rows.
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<ApplicationRecord>>;

    async fn find_by_uuid(&self, uuid: Uuid) -> AppResult<Option<ApplicationRecord>>;

    /// Insert a new row and return the record with its generated id.
    async fn insert(&self, record: &ApplicationRecord) -> AppResult<ApplicationRecord>;

    async fn update(&self, record: &ApplicationRecord) -> AppResult<()>;

    async fn insert_legal_acceptance(&self, acceptance: &LegalAcceptance) -> AppResult<i64>;
}

#[async_trait]
pub trait BusinessStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<BusinessRecord>>;

    /// Insert a new row and return the record with its generated id.
    async fn insert(&self, business: &BusinessRecord) -> AppResult<BusinessRecord>;

    async fn update(&self, business: &BusinessRecord) -> AppResult<()>;
}

/// Child rows of every collection, keyed by their parent.
#[async_trait]
pub trait ChildStore: Send + Sync {
    /// Delete every row of `collection` under `parent`. Returns the count.
    async fn delete_all(&self, parent: ParentKey, collection: ChildCollection) -> AppResult<u64>;

    /// Insert one row and return its generated id.
    async fn insert(&self, parent: ParentKey, item: &ChildItem) -> AppResult<i64>;

    /// Rows of `collection` under `parent`, in insertion order.
    async fn list(
        &self,
        parent: ParentKey,
        collection: ChildCollection,
    ) -> AppResult<Vec<StoredChild>>;

    async fn update(&self, id: i64, item: &ChildItem) -> AppResult<()>;
}

/// Application documents keyed by the application uuid.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, uuid: Uuid) -> AppResult<Option<ApplicationDocument>>;

    /// Write the whole document, replacing any existing one.
    async fn put(&self, uuid: Uuid, document: &ApplicationDocument) -> AppResult<()>;

    /// Shallow merge of `patch` into the stored document, creating it when
    /// absent. Returns the stored result.
    async fn merge(
        &self,
        uuid: Uuid,
        patch: &Map<String, Value>,
    ) -> AppResult<ApplicationDocument> {
        let merged = match self.find(uuid).await? {
            Some(existing) => existing.merged(patch),
            None => ApplicationDocument::new(patch.clone()),
        };
        self.put(uuid, &merged).await?;
        Ok(merged)
    }
}

/// Agency lookups used to default a new application's assignment.
#[async_trait]
pub trait AgencyDirectory: Send + Sync {
    async fn get_agency_by_id(&self, id: i64) -> AppResult<Option<Agency>>;

    async fn get_primary_location(&self, agency_id: i64) -> AppResult<Option<AgencyLocation>>;
}

/// Store handles and the field codec, passed explicitly into every component.
#[derive(Clone)]
pub struct PersistenceContext {
    pub applications: Arc<dyn ApplicationStore>,
    pub businesses: Arc<dyn BusinessStore>,
    pub children: Arc<dyn ChildStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub agencies: Arc<dyn AgencyDirectory>,
    pub codec: Arc<FieldCodec>,
}

impl PersistenceContext {
    /// Production context: PostgreSQL for every relational store plus the
    /// given document store.
    pub fn relational(
        pool: DbPool,
        documents: Arc<dyn DocumentStore>,
        codec: Arc<FieldCodec>,
    ) -> Self {
        let pool = Arc::new(pool);
        Self {
            applications: pool.clone(),
            businesses: pool.clone(),
            children: pool.clone(),
            documents,
            agencies: pool,
            codec,
        }
    }

    /// Context backed entirely by one in-memory backend.
    pub fn in_memory(backend: Arc<MemoryBackend>, codec: Arc<FieldCodec>) -> Self {
        Self {
            applications: backend.clone(),
            businesses: backend.clone(),
            children: backend.clone(),
            documents: backend.clone(),
            agencies: backend,
            codec,
        }
    }

    /// Replace the document store, keeping every other handle.
    pub fn with_documents(self, documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents, ..self }
    }
}
