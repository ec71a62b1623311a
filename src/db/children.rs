//! Database queries for child collections.
//!
//! Locations and contacts hang off a business; claims, policy types, activity
//! codes and question answers hang off an application. Each collection maps to
//! its own table.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, NotSet, QueryFilter, QueryOrder, Set, Unchanged,
};

use crate::entity::{
    address, application_activity_code, application_claim, application_policy_type,
    application_question, contact,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    ActivityPayrollRow, ChildCollection, ChildItem, ClaimRow, ContactRow, LocationRow,
    ParentKey, PolicyTypeRow, QuestionAnswerRow, StoredChild,
};
use crate::store::ChildStore;

use super::DbPool;

fn db_error(action: &str, collection: ChildCollection, e: sea_orm::DbErr) -> AppError {
    AppError::Persistence(format!("Failed to {} {}: {}", action, collection, e))
}

impl DbPool {
    /// Delete every row of `collection` under `parent`.
    pub async fn delete_children(
        &self,
        parent: ParentKey,
        collection: ChildCollection,
    ) -> AppResult<u64> {
        let db = self.connection();
        let id = parent.id();
        let result = match collection {
            ChildCollection::Locations => {
                address::Entity::delete_many()
                    .filter(address::Column::BusinessId.eq(id))
                    .exec(db)
                    .await
            }
            ChildCollection::Contacts => {
                contact::Entity::delete_many()
                    .filter(contact::Column::BusinessId.eq(id))
                    .exec(db)
                    .await
            }
            ChildCollection::Claims => {
                application_claim::Entity::delete_many()
                    .filter(application_claim::Column::ApplicationId.eq(id))
                    .exec(db)
                    .await
            }
            ChildCollection::PolicyTypes => {
                application_policy_type::Entity::delete_many()
                    .filter(application_policy_type::Column::ApplicationId.eq(id))
                    .exec(db)
                    .await
            }
            ChildCollection::ActivityCodes => {
                application_activity_code::Entity::delete_many()
                    .filter(application_activity_code::Column::ApplicationId.eq(id))
                    .exec(db)
                    .await
            }
            ChildCollection::Questions => {
                application_question::Entity::delete_many()
                    .filter(application_question::Column::ApplicationId.eq(id))
                    .exec(db)
                    .await
            }
        }
        .map_err(|e| db_error("delete", collection, e))?;

        Ok(result.rows_affected)
    }

    /// Insert one child row under `parent` and return its id.
    pub async fn insert_child(&self, parent: ParentKey, item: &ChildItem) -> AppResult<i64> {
        let db = self.connection();
        let parent_id = parent.id();
        let collection = item.collection();

        let id = match item {
            ChildItem::Location(row) => {
                let model = address::ActiveModel {
                    id: NotSet,
                    business_id: Set(parent_id),
                    ..location_active(row)
                };
                model.insert(db).await.map(|m| m.id)
            }
            ChildItem::Contact(row) => {
                let model = contact::ActiveModel {
                    id: NotSet,
                    business_id: Set(parent_id),
                    ..contact_active(row)
                };
                model.insert(db).await.map(|m| m.id)
            }
            ChildItem::Claim(row) => {
                let model = application_claim::ActiveModel {
                    id: NotSet,
                    application_id: Set(parent_id),
                    ..claim_active(row)
                };
                model.insert(db).await.map(|m| m.id)
            }
            ChildItem::PolicyType(row) => {
                let model = application_policy_type::ActiveModel {
                    id: NotSet,
                    application_id: Set(parent_id),
                    ..policy_type_active(row)
                };
                model.insert(db).await.map(|m| m.id)
            }
            ChildItem::ActivityCode(row) => {
                let model = application_activity_code::ActiveModel {
                    id: NotSet,
                    application_id: Set(parent_id),
                    ..activity_code_active(row)
                };
                model.insert(db).await.map(|m| m.id)
            }
            ChildItem::Question(row) => {
                let model = application_question::ActiveModel {
                    id: NotSet,
                    application_id: Set(parent_id),
                    ..question_active(row)
                };
                model.insert(db).await.map(|m| m.id)
            }
        }
        .map_err(|e| db_error("insert", collection, e))?;

        Ok(id)
    }

    /// Rows of `collection` under `parent`, oldest first.
    pub async fn list_children(
        &self,
        parent: ParentKey,
        collection: ChildCollection,
    ) -> AppResult<Vec<StoredChild>> {
        let db = self.connection();
        let id = parent.id();
        let map_err = |e| db_error("list", collection, e);

        let rows = match collection {
            ChildCollection::Locations => address::Entity::find()
                .filter(address::Column::BusinessId.eq(id))
                .order_by_asc(address::Column::Id)
                .all(db)
                .await
                .map_err(map_err)?
                .into_iter()
                .map(|m| StoredChild {
                    id: m.id,
                    item: ChildItem::Location(LocationRow {
                        address: m.address,
                        address2: m.address2,
                        city: m.city,
                        state: m.state,
                        zip: m.zip,
                        full_time_employees: m.full_time_employees,
                        part_time_employees: m.part_time_employees,
                        square_footage: m.square_footage,
                        unemployment_num: m.unemployment_num,
                        billing: m.billing,
                    }),
                })
                .collect(),
            ChildCollection::Contacts => contact::Entity::find()
                .filter(contact::Column::BusinessId.eq(id))
                .order_by_asc(contact::Column::Id)
                .all(db)
                .await
                .map_err(map_err)?
                .into_iter()
                .map(|m| StoredChild {
                    id: m.id,
                    item: ChildItem::Contact(ContactRow {
                        fname: m.fname,
                        lname: m.lname,
                        email: m.email,
                        email_hash: m.email_hash,
                        phone: m.phone,
                        primary: m.is_primary,
                    }),
                })
                .collect(),
            ChildCollection::Claims => application_claim::Entity::find()
                .filter(application_claim::Column::ApplicationId.eq(id))
                .order_by_asc(application_claim::Column::Id)
                .all(db)
                .await
                .map_err(map_err)?
                .into_iter()
                .map(|m| StoredChild {
                    id: m.id,
                    item: ChildItem::Claim(ClaimRow {
                        policy_type: m.policy_type,
                        date: m.date,
                        amount_paid: m.amount_paid,
                        amount_reserved: m.amount_reserved,
                        open: m.open,
                        missed_work: m.missed_work,
                        description: m.description,
                    }),
                })
                .collect(),
            ChildCollection::PolicyTypes => application_policy_type::Entity::find()
                .filter(application_policy_type::Column::ApplicationId.eq(id))
                .order_by_asc(application_policy_type::Column::Id)
                .all(db)
                .await
                .map_err(map_err)?
                .into_iter()
                .map(|m| StoredChild {
                    id: m.id,
                    item: ChildItem::PolicyType(PolicyTypeRow {
                        policy_type: m.policy_type,
                        effective_date: m.effective_date,
                        expiration_date: m.expiration_date,
                        limits: m.limits,
                        deductible: m.deductible,
                    }),
                })
                .collect(),
            ChildCollection::ActivityCodes => application_activity_code::Entity::find()
                .filter(application_activity_code::Column::ApplicationId.eq(id))
                .order_by_asc(application_activity_code::Column::Id)
                .all(db)
                .await
                .map_err(map_err)?
                .into_iter()
                .map(|m| StoredChild {
                    id: m.id,
                    item: ChildItem::ActivityCode(ActivityPayrollRow {
                        activity_code_id: m.activity_code_id,
                        payroll: m.payroll,
                    }),
                })
                .collect(),
            ChildCollection::Questions => application_question::Entity::find()
                .filter(application_question::Column::ApplicationId.eq(id))
                .order_by_asc(application_question::Column::Id)
                .all(db)
                .await
                .map_err(map_err)?
                .into_iter()
                .map(|m| StoredChild {
                    id: m.id,
                    item: ChildItem::Question(QuestionAnswerRow {
                        question_id: m.question_id,
                        question_type: m.question_type,
                        question_text: m.question_text,
                        answer_id: m.answer_id,
                        text_answer: m.text_answer,
                    }),
                })
                .collect(),
        };

        Ok(rows)
    }

    /// Overwrite the columns of one child row. The parent is left as is.
    pub async fn update_child(&self, id: i64, item: &ChildItem) -> AppResult<()> {
        let db = self.connection();
        let collection = item.collection();

        let result = match item {
            ChildItem::Location(row) => address::ActiveModel {
                id: Unchanged(id),
                ..location_active(row)
            }
            .update(db)
            .await
            .map(|_| ()),
            ChildItem::Contact(row) => contact::ActiveModel {
                id: Unchanged(id),
                ..contact_active(row)
            }
            .update(db)
            .await
            .map(|_| ()),
            ChildItem::Claim(row) => application_claim::ActiveModel {
                id: Unchanged(id),
                ..claim_active(row)
            }
            .update(db)
            .await
            .map(|_| ()),
            ChildItem::PolicyType(row) => application_policy_type::ActiveModel {
                id: Unchanged(id),
                ..policy_type_active(row)
            }
            .update(db)
            .await
            .map(|_| ()),
            ChildItem::ActivityCode(row) => application_activity_code::ActiveModel {
                id: Unchanged(id),
                ..activity_code_active(row)
            }
            .update(db)
            .await
            .map(|_| ()),
            ChildItem::Question(row) => application_question::ActiveModel {
                id: Unchanged(id),
                ..question_active(row)
            }
            .update(db)
            .await
            .map(|_| ()),
        };

        result.map_err(|e| db_error("update", collection, e))
    }
}

#[async_trait]
impl ChildStore for DbPool {
    async fn delete_all(&self, parent: ParentKey, collection: ChildCollection) -> AppResult<u64> {
        self.delete_children(parent, collection).await
    }

    async fn insert(&self, parent: ParentKey, item: &ChildItem) -> AppResult<i64> {
        self.insert_child(parent, item).await
    }

    async fn list(
        &self,
        parent: ParentKey,
        collection: ChildCollection,
    ) -> AppResult<Vec<StoredChild>> {
        self.list_children(parent, collection).await
    }

    async fn update(&self, id: i64, item: &ChildItem) -> AppResult<()> {
        self.update_child(id, item).await
    }
}

// Column values only; id and parent id are filled in by the caller.

fn location_active(row: &LocationRow) -> address::ActiveModel {
    address::ActiveModel {
        id: NotSet,
        business_id: NotSet,
        address: Set(row.address.clone()),
        address2: Set(row.address2.clone()),
        city: Set(row.city.clone()),
        state: Set(row.state.clone()),
        zip: Set(row.zip.clone()),
        full_time_employees: Set(row.full_time_employees),
        part_time_employees: Set(row.part_time_employees),
        square_footage: Set(row.square_footage),
        unemployment_num: Set(row.unemployment_num.clone()),
        billing: Set(row.billing),
    }
}

fn contact_active(row: &ContactRow) -> contact::ActiveModel {
    contact::ActiveModel {
        id: NotSet,
        business_id: NotSet,
        fname: Set(row.fname.clone()),
        lname: Set(row.lname.clone()),
        email: Set(row.email.clone()),
        email_hash: Set(row.email_hash.clone()),
        phone: Set(row.phone.clone()),
        is_primary: Set(row.primary),
    }
}

fn claim_active(row: &ClaimRow) -> application_claim::ActiveModel {
    application_claim::ActiveModel {
        id: NotSet,
        application_id: NotSet,
        policy_type: Set(row.policy_type.clone()),
        date: Set(row.date),
        amount_paid: Set(row.amount_paid),
        amount_reserved: Set(row.amount_reserved),
        open: Set(row.open),
        missed_work: Set(row.missed_work),
        description: Set(row.description.clone()),
    }
}

fn policy_type_active(row: &PolicyTypeRow) -> application_policy_type::ActiveModel {
    application_policy_type::ActiveModel {
        id: NotSet,
        application_id: NotSet,
        policy_type: Set(row.policy_type.clone()),
        effective_date: Set(row.effective_date),
        expiration_date: Set(row.expiration_date),
        limits: Set(row.limits.clone()),
        deductible: Set(row.deductible),
    }
}

fn activity_code_active(row: &ActivityPayrollRow) -> application_activity_code::ActiveModel {
    application_activity_code::ActiveModel {
        id: NotSet,
        application_id: NotSet,
        activity_code_id: Set(row.activity_code_id),
        payroll: Set(row.payroll),
    }
}

fn question_active(row: &QuestionAnswerRow) -> application_question::ActiveModel {
    application_question::ActiveModel {
        id: NotSet,
        application_id: NotSet,
        question_id: Set(row.question_id),
        question_type: Set(row.question_type.clone()),
        question_text: Set(row.question_text.clone()),
        answer_id: Set(row.answer_id),
        text_answer: Set(row.text_answer.clone()),
    }
}
