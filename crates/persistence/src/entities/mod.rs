//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod deregistration;
pub mod document;
pub mod reference;

pub use deregistration::{
    group_live_devices, DeRegDetailsEntity, DeRegDeviceEntity, LiveDeviceRow,
};
pub use document::{DeRegDocumentEntity, DocumentEntity};
pub use reference::{DeviceTypeEntity, StatusEntity};
