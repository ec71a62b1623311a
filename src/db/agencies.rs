//! Database queries for agencies and their locations.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::entity::agency::Entity as AgencyEntity;
use crate::entity::agency_location::{self as location, Entity as LocationEntity};
use crate::error::{AppError, AppResult};
use crate::models::{Agency, AgencyLocation};
use crate::store::AgencyDirectory;

use super::DbPool;

impl DbPool {
    pub async fn get_agency(&self, id: i64) -> AppResult<Option<Agency>> {
        let result = AgencyEntity::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to get agency: {}", e)))?;

        Ok(result.map(|m| Agency {
            id: m.id,
            agency_network_id: m.agency_network_id,
            name: m.name,
        }))
    }

    /// The agency's primary location.
    pub async fn get_agency_primary_location(
        &self,
        agency_id: i64,
    ) -> AppResult<Option<AgencyLocation>> {
        let result = LocationEntity::find()
            .filter(location::Column::AgencyId.eq(agency_id))
            .filter(location::Column::IsPrimary.eq(true))
            .order_by_asc(location::Column::Id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to get agency location: {}", e)))?;

        Ok(result.map(|m| AgencyLocation {
            id: m.id,
            agency_id: m.agency_id,
            primary: m.is_primary,
        }))
    }
}

#[async_trait]
impl AgencyDirectory for DbPool {
    async fn get_agency_by_id(&self, id: i64) -> AppResult<Option<Agency>> {
        self.get_agency(id).await
    }

    async fn get_primary_location(&self, agency_id: i64) -> AppResult<Option<AgencyLocation>> {
        self.get_agency_primary_location(agency_id).await
    }
}
