//! Migration: Create agencies and agency_locations tables and the shared
//! updated_at trigger function.

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
                -- Shared trigger function for updated_at
                CREATE OR REPLACE FUNCTION update_updated_at_column()
                RETURNS TRIGGER AS $$
                BEGIN
                    NEW.updated_at = NOW();
                    RETURN NEW;
                END;
                $$ LANGUAGE plpgsql;

                CREATE TABLE agencies (
                    id BIGSERIAL PRIMARY KEY,
                    agency_network_id BIGINT NOT NULL,
                    name VARCHAR(200) NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE TABLE agency_locations (
                    id BIGSERIAL PRIMARY KEY,
                    agency_id BIGINT NOT NULL REFERENCES agencies(id) ON DELETE CASCADE,
                    is_primary BOOLEAN NOT NULL DEFAULT FALSE,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX idx_agency_locations_agency_id ON agency_locations(agency_id);

                -- One primary location per agency
                CREATE UNIQUE INDEX idx_agency_locations_primary
                    ON agency_locations(agency_id)
                    WHERE is_primary;
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
                DROP TABLE IF EXISTS agency_locations CASCADE;
                DROP TABLE IF EXISTS agencies CASCADE;
                DROP FUNCTION IF EXISTS update_updated_at_column();
                "#,
            )
            .await?;

        Ok(())
    }
}
