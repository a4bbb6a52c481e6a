//! Repository implementations for database operations.
//!
//! Each repository also implements the matching domain store trait.

pub mod dereg_details;
pub mod dereg_device;
pub mod document;
pub mod reference;
pub mod registry;

pub use dereg_details::DeRegDetailsRepository;
pub use dereg_device::DeRegDeviceRepository;
pub use document::DocumentRepository;
pub use reference::{DeviceTypeRepository, StatusRepository};
pub use registry::RegistryRepository;
