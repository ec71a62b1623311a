//! Database queries for applications and legal acceptances.

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, NotSet, QueryFilter, Set};
use uuid::Uuid;

use crate::entity::application::{self as application, ActiveModel, Entity as Application};
use crate::entity::legal_acceptance;
use crate::error::{AppError, AppResult};
use crate::models::{ApplicationRecord, LegalAcceptance};
use crate::store::ApplicationStore;

use super::DbPool;

impl DbPool {
    pub async fn get_application_by_id(&self, id: i64) -> AppResult<Option<ApplicationRecord>> {
        let result = Application::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to get application: {}", e)))?;

        Ok(result.map(model_to_record))
    }

    pub async fn get_application_by_uuid(&self, uuid: Uuid) -> AppResult<Option<ApplicationRecord>> {
        let result = Application::find()
            .filter(application::Column::Uuid.eq(uuid))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to get application: {}", e)))?;

        Ok(result.map(model_to_record))
    }

    /// Insert a new application row. The surrogate id is generated.
    pub async fn insert_application(&self, record: &ApplicationRecord) -> AppResult<ApplicationRecord> {
        let model = ActiveModel {
            id: NotSet,
            ..record_to_active(record)
        };

        let result = model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to insert application: {}", e)))?;

        Ok(model_to_record(result))
    }

    pub async fn update_application(&self, record: &ApplicationRecord) -> AppResult<()> {
        if !record.is_persisted() {
            return Err(AppError::Persistence(format!(
                "application {} has not been inserted",
                record.uuid
            )));
        }

        let model = ActiveModel {
            id: Set(record.id),
            ..record_to_active(record)
        };
        model
            .update(self.connection())
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to update application: {}", e)))?;

        Ok(())
    }

    pub async fn insert_legal_acceptance_row(&self, acceptance: &LegalAcceptance) -> AppResult<i64> {
        let model = legal_acceptance::ActiveModel {
            id: NotSet,
            application_id: Set(acceptance.application_id),
            ip: Set(acceptance.ip.clone()),
            version: Set(acceptance.version),
            created_at: Set(acceptance.created_at),
        };

        let result = model.insert(self.connection()).await.map_err(|e| {
            AppError::Persistence(format!("Failed to insert legal acceptance: {}", e))
        })?;

        Ok(result.id)
    }
}

#[async_trait]
impl ApplicationStore for DbPool {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<ApplicationRecord>> {
        self.get_application_by_id(id).await
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> AppResult<Option<ApplicationRecord>> {
        self.get_application_by_uuid(uuid).await
    }

    async fn insert(&self, record: &ApplicationRecord) -> AppResult<ApplicationRecord> {
        self.insert_application(record).await
    }

    async fn update(&self, record: &ApplicationRecord) -> AppResult<()> {
        self.update_application(record).await
    }

    async fn insert_legal_acceptance(&self, acceptance: &LegalAcceptance) -> AppResult<i64> {
        self.insert_legal_acceptance_row(acceptance).await
    }
}

fn record_to_active(record: &ApplicationRecord) -> ActiveModel {
    ActiveModel {
        id: NotSet,
        uuid: Set(record.uuid),
        business_id: Set(record.business_id),
        agency_network_id: Set(record.agency_network_id),
        agency_id: Set(record.agency_id),
        agency_location_id: Set(record.agency_location_id),
        last_step: Set(record.last_step),
        progress: Set(record.progress.clone()),
        state: Set(record.state),
        status: Set(record.status.clone()),
        app_status_id: Set(record.app_status_id),
        wholesale: Set(record.wholesale),
        solepro: Set(record.solepro),
        industry_code: Set(record.industry_code),
        coverage_lapse: Set(record.coverage_lapse),
        founded: Set(record.founded),
        gross_sales_amt: Set(record.gross_sales_amt),
        years_of_exp: Set(record.years_of_exp),
        owners_covered: Set(record.owners_covered),
        bop_effective_date: Set(record.bop_effective_date),
        bop_expiration_date: Set(record.bop_expiration_date),
        gl_effective_date: Set(record.gl_effective_date),
        gl_expiration_date: Set(record.gl_expiration_date),
        wc_effective_date: Set(record.wc_effective_date),
        wc_expiration_date: Set(record.wc_expiration_date),
        limits: Set(record.limits.clone()),
        deductible: Set(record.deductible),
        wc_limits: Set(record.wc_limits.clone()),
        bind_quote_id: Set(record.bind_quote_id.clone()),
        created_at: Set(record.created_at),
        updated_at: Set(record.updated_at),
    }
}

fn model_to_record(m: application::Model) -> ApplicationRecord {
    ApplicationRecord {
        id: m.id,
        uuid: m.uuid,
        business_id: m.business_id,
        agency_network_id: m.agency_network_id,
        agency_id: m.agency_id,
        agency_location_id: m.agency_location_id,
        last_step: m.last_step,
        progress: m.progress,
        state: m.state,
        status: m.status,
        app_status_id: m.app_status_id,
        wholesale: m.wholesale,
        solepro: m.solepro,
        industry_code: m.industry_code,
        coverage_lapse: m.coverage_lapse,
        founded: m.founded,
        gross_sales_amt: m.gross_sales_amt,
        years_of_exp: m.years_of_exp,
        owners_covered: m.owners_covered,
        bop_effective_date: m.bop_effective_date,
        bop_expiration_date: m.bop_expiration_date,
        gl_effective_date: m.gl_effective_date,
        gl_expiration_date: m.gl_expiration_date,
        wc_effective_date: m.wc_effective_date,
        wc_expiration_date: m.wc_expiration_date,
        limits: m.limits,
        deductible: m.deductible,
        wc_limits: m.wc_limits,
        bind_quote_id: m.bind_quote_id,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}
