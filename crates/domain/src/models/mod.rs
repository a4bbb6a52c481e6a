//! Domain models for the de-registration workflow.

pub mod deregistration;
pub mod document;
pub mod status;

pub use deregistration::{
    CuratedDevice, CuratedSubmission, DeRegDevice, DeRegDeviceInput, DeRegDevicesPayload,
    DeRegRequest, DeviceType, DevicesOutcome, Identifier,
};
pub use document::{
    document_link, AttachedDocument, DeRegDocumentView, DeRegDocumentsPayload, Document,
};
pub use status::Status;
