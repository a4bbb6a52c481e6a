//! HTTP route handlers.

pub mod deregistration;
pub mod documents;
pub mod health;
pub mod reference_data;
