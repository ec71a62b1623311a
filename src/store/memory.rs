//! In-memory implementation of every store trait.
//!
//! Used by the test suites and for running the workflow without PostgreSQL or
//! S3. Ids are generated from one shared sequence.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{AgencyDirectory, ApplicationStore, BusinessStore, ChildStore, DocumentStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    Agency, AgencyLocation, ApplicationDocument, ApplicationRecord, BusinessRecord, ChildCollection,
    ChildItem, LegalAcceptance, ParentKey, StoredChild,
};

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    applications: BTreeMap<i64, ApplicationRecord>,
    businesses: BTreeMap<i64, BusinessRecord>,
    children: Vec<(i64, ParentKey, ChildItem)>,
    documents: HashMap<Uuid, ApplicationDocument>,
    acceptances: Vec<LegalAcceptance>,
    agencies: Vec<Agency>,
    locations: Vec<AgencyLocation>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agency and its primary location.
    pub async fn add_agency(&self, agency: Agency, location: AgencyLocation) {
        let mut state = self.state.lock().await;
        state.agencies.push(agency);
        state.locations.push(location);
    }

    pub async fn legal_acceptances(&self) -> Vec<LegalAcceptance> {
        self.state.lock().await.acceptances.clone()
    }

    pub async fn document_count(&self) -> usize {
        self.state.lock().await.documents.len()
    }

    /// Total rows of `collection` under any parent.
    pub async fn child_row_count(&self, collection: ChildCollection) -> usize {
        self.state
            .lock()
            .await
            .children
            .iter()
            .filter(|(_, _, item)| item.collection() == collection)
            .count()
    }
}

#[async_trait]
impl ApplicationStore for MemoryBackend {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<ApplicationRecord>> {
        Ok(self.state.lock().await.applications.get(&id).cloned())
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> AppResult<Option<ApplicationRecord>> {
        Ok(self
            .state
            .lock()
            .await
            .applications
            .values()
            .find(|record| record.uuid == uuid)
            .cloned())
    }

    async fn insert(&self, record: &ApplicationRecord) -> AppResult<ApplicationRecord> {
        let mut state = self.state.lock().await;
        if state.applications.values().any(|r| r.uuid == record.uuid) {
            return Err(AppError::Persistence(format!(
                "duplicate application uuid {}",
                record.uuid
            )));
        }
        let id = state.next_id();
        let stored = ApplicationRecord {
            id,
            ..record.clone()
        };
        state.applications.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, record: &ApplicationRecord) -> AppResult<()> {
        let mut state = self.state.lock().await;
        match state.applications.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(AppError::Persistence(format!(
                "application {} does not exist",
                record.id
            ))),
        }
    }

    async fn insert_legal_acceptance(&self, acceptance: &LegalAcceptance) -> AppResult<i64> {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.acceptances.push(acceptance.clone());
        Ok(id)
    }
}

#[async_trait]
impl BusinessStore for MemoryBackend {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<BusinessRecord>> {
        Ok(self.state.lock().await.businesses.get(&id).cloned())
    }

    async fn insert(&self, business: &BusinessRecord) -> AppResult<BusinessRecord> {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let stored = BusinessRecord {
            id,
            ..business.clone()
        };
        state.businesses.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, business: &BusinessRecord) -> AppResult<()> {
        let mut state = self.state.lock().await;
        match state.businesses.get_mut(&business.id) {
            Some(existing) => {
                *existing = business.clone();
                Ok(())
            }
            None => Err(AppError::Persistence(format!(
                "business {} does not exist",
                business.id
            ))),
        }
    }
}

#[async_trait]
impl ChildStore for MemoryBackend {
    async fn delete_all(&self, parent: ParentKey, collection: ChildCollection) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.children.len();
        state
            .children
            .retain(|(_, p, item)| !(*p == parent && item.collection() == collection));
        Ok((before - state.children.len()) as u64)
    }

    async fn insert(&self, parent: ParentKey, item: &ChildItem) -> AppResult<i64> {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.children.push((id, parent, item.clone()));
        Ok(id)
    }

    async fn list(
        &self,
        parent: ParentKey,
        collection: ChildCollection,
    ) -> AppResult<Vec<StoredChild>> {
        Ok(self
            .state
            .lock()
            .await
            .children
            .iter()
            .filter(|(_, p, item)| *p == parent && item.collection() == collection)
            .map(|(id, _, item)| StoredChild {
                id: *id,
                item: item.clone(),
            })
            .collect())
    }

    async fn update(&self, id: i64, item: &ChildItem) -> AppResult<()> {
        let mut state = self.state.lock().await;
        match state.children.iter_mut().find(|(row_id, _, _)| *row_id == id) {
            Some((_, _, existing)) => {
                *existing = item.clone();
                Ok(())
            }
            None => Err(AppError::Persistence(format!("child row {} does not exist", id))),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryBackend {
    async fn find(&self, uuid: Uuid) -> AppResult<Option<ApplicationDocument>> {
        Ok(self.state.lock().await.documents.get(&uuid).cloned())
    }

    async fn put(&self, uuid: Uuid, document: &ApplicationDocument) -> AppResult<()> {
        self.state
            .lock()
            .await
            .documents
            .insert(uuid, document.clone());
        Ok(())
    }
}

#[async_trait]
impl AgencyDirectory for MemoryBackend {
    async fn get_agency_by_id(&self, id: i64) -> AppResult<Option<Agency>> {
        Ok(self
            .state
            .lock()
            .await
            .agencies
            .iter()
            .find(|agency| agency.id == id)
            .cloned())
    }

    async fn get_primary_location(&self, agency_id: i64) -> AppResult<Option<AgencyLocation>> {
        Ok(self
            .state
            .lock()
            .await
            .locations
            .iter()
            .find(|location| location.agency_id == agency_id && location.primary)
            .cloned())
    }
}
