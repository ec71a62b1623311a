//! Migration: Create applications and legal_acceptances tables.

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
                CREATE TABLE applications (
                    id BIGSERIAL PRIMARY KEY,
                    uuid UUID NOT NULL,
                    business_id BIGINT REFERENCES businesses(id),
                    agency_network_id BIGINT NOT NULL,
                    agency_id BIGINT NOT NULL REFERENCES agencies(id),
                    agency_location_id BIGINT NOT NULL REFERENCES agency_locations(id),

                    -- Workflow gating
                    last_step INTEGER NOT NULL DEFAULT 0,
                    progress VARCHAR(20) NOT NULL DEFAULT 'incomplete',
                    state INTEGER NOT NULL DEFAULT 1
                        CHECK (state IN (0, 1, 2)),
                    status VARCHAR(30) NOT NULL DEFAULT 'incomplete',
                    app_status_id INTEGER NOT NULL DEFAULT 0,

                    -- Editable application fields
                    wholesale BOOLEAN NOT NULL DEFAULT FALSE,
                    solepro BOOLEAN NOT NULL DEFAULT FALSE,
                    industry_code BIGINT,
                    coverage_lapse BOOLEAN NOT NULL DEFAULT FALSE,
                    founded DATE,
                    gross_sales_amt DOUBLE PRECISION,
                    years_of_exp INTEGER,
                    owners_covered INTEGER,

                    -- Flattened policy selection
                    bop_effective_date DATE,
                    bop_expiration_date DATE,
                    gl_effective_date DATE,
                    gl_expiration_date DATE,
                    wc_effective_date DATE,
                    wc_expiration_date DATE,
                    limits VARCHAR(50),
                    deductible INTEGER,
                    wc_limits VARCHAR(50),

                    bind_quote_id VARCHAR(100),

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE UNIQUE INDEX idx_applications_uuid ON applications(uuid);
                CREATE INDEX idx_applications_business_id ON applications(business_id)
                    WHERE business_id IS NOT NULL;
                CREATE INDEX idx_applications_agency_id ON applications(agency_id);

                CREATE TABLE legal_acceptances (
                    id BIGSERIAL PRIMARY KEY,
                    application_id BIGINT NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
                    ip VARCHAR(45) NOT NULL,
                    version INTEGER NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX idx_legal_acceptances_application_id
                    ON legal_acceptances(application_id);
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
                DROP TABLE IF EXISTS legal_acceptances CASCADE;
                DROP TABLE IF EXISTS applications CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
