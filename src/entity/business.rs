//! Business entity for SeaORM.
//!
//! Name, DBA, EIN, website, mailing address lines and the owners blob are
//! stored as ciphertext; `name_hash` and `ein_hash` support equality search.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "businesses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub name_hash: String,
    pub dba: Option<String>,
    pub ein: Option<String>,
    pub ein_hash: Option<String>,
    pub entity_type: Option<String>,
    pub website: Option<String>,
    pub mailing_address: Option<String>,
    pub mailing_address2: Option<String>,
    pub mailing_city: Option<String>,
    pub mailing_state: Option<String>,
    pub mailing_zip: Option<String>,
    pub industry_code: Option<i64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub owners: Option<String>,
    pub registered_address: Option<String>,
    pub num_employees: Option<i32>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::address::Entity")]
    Addresses,
    #[sea_orm(has_many = "super::contact::Entity")]
    Contacts,
}

impl Related<super::address::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Addresses.def()
    }
}

impl Related<super::contact::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contacts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
