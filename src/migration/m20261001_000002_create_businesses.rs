//! Migration: Create businesses, addresses and contacts tables.
//!
//! PII columns hold base64 AES-GCM ciphertext; `*_hash` columns hold salted
//! SHA-256 digests for equality search.

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
                CREATE TABLE businesses (
                    id BIGSERIAL PRIMARY KEY,
                    name TEXT NOT NULL,
                    name_hash VARCHAR(64) NOT NULL,
                    dba TEXT,
                    ein TEXT,
                    ein_hash VARCHAR(64),
                    entity_type VARCHAR(50),
                    website TEXT,
                    mailing_address TEXT,
                    mailing_address2 TEXT,
                    mailing_city VARCHAR(100),
                    mailing_state VARCHAR(2),
                    mailing_zip VARCHAR(10),
                    industry_code BIGINT,

                    -- Encrypted JSON array of owners
                    owners TEXT,

                    -- Backfilled by the enrichment lookup
                    registered_address TEXT,
                    num_employees INTEGER,

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX idx_businesses_name_hash ON businesses(name_hash);
                CREATE INDEX idx_businesses_ein_hash ON businesses(ein_hash)
                    WHERE ein_hash IS NOT NULL;

                CREATE TABLE addresses (
                    id BIGSERIAL PRIMARY KEY,
                    business_id BIGINT NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
                    address VARCHAR(200) NOT NULL,
                    address2 VARCHAR(200),
                    city VARCHAR(100) NOT NULL,
                    state VARCHAR(2) NOT NULL,
                    zip VARCHAR(10) NOT NULL,
                    full_time_employees INTEGER NOT NULL DEFAULT 0,
                    part_time_employees INTEGER NOT NULL DEFAULT 0,
                    square_footage INTEGER,
                    unemployment_num VARCHAR(50),
                    billing BOOLEAN NOT NULL DEFAULT FALSE
                );

                CREATE INDEX idx_addresses_business_id ON addresses(business_id);

                CREATE TABLE contacts (
                    id BIGSERIAL PRIMARY KEY,
                    business_id BIGINT NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
                    fname VARCHAR(100) NOT NULL,
                    lname VARCHAR(100) NOT NULL,
                    email TEXT NOT NULL,
                    email_hash VARCHAR(64) NOT NULL,
                    phone TEXT,
                    is_primary BOOLEAN NOT NULL DEFAULT FALSE
                );

                CREATE INDEX idx_contacts_business_id ON contacts(business_id);
                CREATE INDEX idx_contacts_email_hash ON contacts(email_hash);

                CREATE TRIGGER update_businesses_updated_at
                    BEFORE UPDATE ON businesses
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();
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
                DROP TABLE IF EXISTS contacts CASCADE;
                DROP TABLE IF EXISTS addresses CASCADE;
                DROP TRIGGER IF EXISTS update_businesses_updated_at ON businesses;
                DROP TABLE IF EXISTS businesses CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
