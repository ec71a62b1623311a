//! Agency portal server library.
//!
//! Insurance application workflow over a relational store (authoritative
//! workflow state) and a document store (nested read projection), including
//! field protection, child collection fan-out and the HTTP surface.

pub mod api;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
pub mod store;
