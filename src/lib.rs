//! CRM Lead Capture API Library
//!
//! Accepts lead-capture submissions from the marketing site's forms and
//! records them in Airtable, linking each lead to the asset that produced
//! it. The write path is idempotent: leads are upserted keyed on email and
//! asset records are resolved by name and created at most once.
//!
//! # Modules
//!
//! - `airtable`: Asset resolution and the lead upsert against the store.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers and router assembly.
//! - `models`: Core data models.
//! - `transport`: Retrying HTTP transport with exponential backoff.
//! - `validation`: Inbound payload validation and normalization helpers.

pub mod airtable;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod transport;
pub mod validation;
