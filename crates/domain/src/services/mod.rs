//! Domain services for the de-registration workflow.
//!
//! Services hold the business rules; persistence is reached through the
//! store and lookup traits declared alongside them.

pub mod curation;
pub mod deregistration;
pub mod documents;
pub mod status_machine;

pub use curation::{IdentifierTacMap, SubmissionLimits};
pub use deregistration::{
    DeRegDependencies, DeRegDeviceService, DeRegRequestStore, DeRegSettings, DeviceStore,
    DeviceTypeLookup, RegistryLookup, StatusLookup,
};
pub use documents::{DeRegDocumentService, DocumentSettings, DocumentStore};
