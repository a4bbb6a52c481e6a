//! Shared utilities and common types for the de-registration backend.
//!
//! This crate provides functionality used across all other crates:
//! - Device identifier validation (IMEI, TAC)
//! - Identifier normalization
//! - Request id and file name helpers

pub mod validation;
