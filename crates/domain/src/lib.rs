//! Domain layer for the de-registration backend.
//!
//! This crate contains:
//! - Domain models (requests, devices, identifiers, statuses, documents)
//! - Identifier curation and the status machine
//! - Service traits implemented by the persistence layer
//! - The request orchestrators
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;

pub use error::{DeRegError, FieldErrors};
