//! SeaORM entity definitions for PostgreSQL database.

pub mod address;
pub mod agency;
pub mod agency_location;
pub mod application;
pub mod application_activity_code;
pub mod application_claim;
pub mod application_policy_type;
pub mod application_question;
pub mod business;
pub mod contact;
pub mod legal_acceptance;
