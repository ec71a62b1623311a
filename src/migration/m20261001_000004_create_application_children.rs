//! Migration: Create the application child tables.
//!
//! Rows are replaced wholesale on every save, so none of these tables carry
//! timestamps or soft-delete columns.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE application_claims (
                    id BIGSERIAL PRIMARY KEY,
                    application_id BIGINT NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
                    policy_type VARCHAR(10) NOT NULL,
                    date DATE NOT NULL,
                    amount_paid DOUBLE PRECISION NOT NULL DEFAULT 0,
                    amount_reserved DOUBLE PRECISION NOT NULL DEFAULT 0,
                    open BOOLEAN NOT NULL DEFAULT FALSE,
                    missed_work BOOLEAN NOT NULL DEFAULT FALSE,
                    description TEXT
                );

                CREATE INDEX idx_application_claims_application_id
                    ON application_claims(application_id);

                CREATE TABLE application_policy_types (
                    id BIGSERIAL PRIMARY KEY,
                    application_id BIGINT NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
                    policy_type VARCHAR(10) NOT NULL,
                    effective_date DATE,
                    expiration_date DATE,
                    limits VARCHAR(50),
                    deductible INTEGER
                );

                CREATE INDEX idx_application_policy_types_application_id
                    ON application_policy_types(application_id);

                CREATE TABLE application_activity_codes (
                    id BIGSERIAL PRIMARY KEY,
                    application_id BIGINT NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
                    activity_code_id BIGINT NOT NULL,
                    payroll BIGINT NOT NULL DEFAULT 0
                );

                CREATE INDEX idx_application_activity_codes_application_id
                    ON application_activity_codes(application_id);

                CREATE TABLE application_questions (
                    id BIGSERIAL PRIMARY KEY,
                    application_id BIGINT NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
                    question_id BIGINT NOT NULL,
                    question_type VARCHAR(30),
                    question_text TEXT,
                    answer_id BIGINT,
                    text_answer TEXT
                );

                CREATE INDEX idx_application_questions_application_id
                    ON application_questions(application_id);
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DROP TABLE IF EXISTS application_questions CASCADE;
                DROP TABLE IF EXISTS application_activity_codes CASCADE;
                DROP TABLE IF EXISTS application_policy_types CASCADE;
                DROP TABLE IF EXISTS application_claims CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
