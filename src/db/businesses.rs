//! Database queries for businesses.
//!
//! Rows arrive already protected; this layer never sees clear-text PII.

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, EntityTrait, NotSet, Set};

use crate::entity::business::{self as business, ActiveModel, Entity as Business};
use crate::error::{AppError, AppResult};
use crate::models::BusinessRecord;
use crate::store::BusinessStore;

use super::DbPool;

impl DbPool {
    pub async fn get_business_by_id(&self, id: i64) -> AppResult<Option<BusinessRecord>> {
        let result = Business::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to get business: {}", e)))?;

        Ok(result.map(model_to_business))
    }

    pub async fn insert_business(&self, record: &BusinessRecord) -> AppResult<BusinessRecord> {
        let result = business_to_active(record)
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to insert business: {}", e)))?;

        Ok(model_to_business(result))
    }

    pub async fn update_business(&self, record: &BusinessRecord) -> AppResult<()> {
        let model = ActiveModel {
            id: Set(record.id),
            ..business_to_active(record)
        };
        model
            .update(self.connection())
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to update business: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl BusinessStore for DbPool {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<BusinessRecord>> {
        self.get_business_by_id(id).await
    }

    async fn insert(&self, business: &BusinessRecord) -> AppResult<BusinessRecord> {
        self.insert_business(business).await
    }

    async fn update(&self, business: &BusinessRecord) -> AppResult<()> {
        self.update_business(business).await
    }
}

fn business_to_active(record: &BusinessRecord) -> ActiveModel {
    ActiveModel {
        id: NotSet,
        name: Set(record.name.clone()),
        name_hash: Set(record.name_hash.clone()),
        dba: Set(record.dba.clone()),
        ein: Set(record.ein.clone()),
        ein_hash: Set(record.ein_hash.clone()),
        entity_type: Set(record.entity_type.clone()),
        website: Set(record.website.clone()),
        mailing_address: Set(record.mailing_address.clone()),
        mailing_address2: Set(record.mailing_address2.clone()),
        mailing_city: Set(record.mailing_city.clone()),
        mailing_state: Set(record.mailing_state.clone()),
        mailing_zip: Set(record.mailing_zip.clone()),
        industry_code: Set(record.industry_code),
        owners: Set(record.owners.clone()),
        registered_address: Set(record.registered_address.clone()),
        num_employees: Set(record.num_employees),
        created_at: Set(record.created_at),
        updated_at: Set(record.updated_at),
    }
}

fn model_to_business(m: business::Model) -> BusinessRecord {
    BusinessRecord {
        id: m.id,
        name: m.name,
        name_hash: m.name_hash,
        dba: m.dba,
        ein: m.ein,
        ein_hash: m.ein_hash,
        entity_type: m.entity_type,
        website: m.website,
        mailing_address: m.mailing_address,
        mailing_address2: m.mailing_address2,
        mailing_city: m.mailing_city,
        mailing_state: m.mailing_state,
        mailing_zip: m.mailing_zip,
        industry_code: m.industry_code,
        owners: m.owners,
        registered_address: m.registered_address,
        num_employees: m.num_employees,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}
