//! Application workflow tests.
//!
//! Every suite runs against the in-memory store backend, so no PostgreSQL or
//! S3 is needed.
//!
//! Run with: cargo test --test application_workflow


mod test_document_sync;
mod test_field_protection;
mod test_gating;
mod test_http_api;
mod test_replay;
mod test_side_channels;
mod test_step_saves;
