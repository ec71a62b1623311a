//! Application entity for SeaORM.
//!
//! The canonical workflow record. `uuid` is the external identity shared with
//! the application document.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "applications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub uuid: Uuid,
    pub business_id: Option<i64>,
    pub agency_network_id: i64,
    pub agency_id: i64,
    pub agency_location_id: i64,
    pub last_step: i32,
    pub progress: String,
    /// 0 deleted, 1 active, 2 finalized
    pub state: i32,
    pub status: String,
    pub app_status_id: i32,
    pub wholesale: bool,
    pub solepro: bool,
    pub industry_code: Option<i64>,
    pub coverage_lapse: bool,
    pub founded: Option<Date>,
    pub gross_sales_amt: Option<f64>,
    pub years_of_exp: Option<i32>,
    pub owners_covered: Option<i32>,
    pub bop_effective_date: Option<Date>,
    pub bop_expiration_date: Option<Date>,
    pub gl_effective_date: Option<Date>,
    pub gl_expiration_date: Option<Date>,
    pub wc_effective_date: Option<Date>,
    pub wc_expiration_date: Option<Date>,
    pub limits: Option<String>,
    pub deductible: Option<i32>,
    pub wc_limits: Option<String>,
    pub bind_quote_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::business::Entity",
        from = "Column::BusinessId",
        to = "super::business::Column::Id"
    )]
    Business,
    #[sea_orm(has_many = "super::application_claim::Entity")]
    Claims,
    #[sea_orm(has_many = "super::application_policy_type::Entity")]
    PolicyTypes,
    #[sea_orm(has_many = "super::application_activity_code::Entity")]
    ActivityCodes,
    #[sea_orm(has_many = "super::application_question::Entity")]
    Questions,
    #[sea_orm(has_many = "super::legal_acceptance::Entity")]
    LegalAcceptances,
}

impl Related<super::business::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Business.def()
    }
}

impl Related<super::application_claim::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Claims.def()
    }
}

impl Related<super::application_policy_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PolicyTypes.def()
    }
}

impl Related<super::application_activity_code::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ActivityCodes.def()
    }
}

impl Related<super::application_question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Questions.def()
    }
}

impl Related<super::legal_acceptance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LegalAcceptances.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
