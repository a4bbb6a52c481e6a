//! Persistence layer for the de-registration service.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations of the domain store traits
//! - Read-through caches for reference data

pub mod cache;
pub mod db;
pub mod entities;
pub mod metrics;
pub mod reference;
pub mod repositories;
