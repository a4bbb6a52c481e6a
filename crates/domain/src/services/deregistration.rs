//! De-registration device orchestrator.
//!
//! Composes curation, the registry check, the device store and the status
//! machine into the three request-level operations: fetch, create and update
//! devices. Persistence is reached through the traits below.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::DeRegError;
use crate::models::{
    CuratedSubmission, DeRegDevice, DeRegDevicesPayload, DeRegRequest, DevicesOutcome, Status,
};
use crate::services::curation::{self, IdentifierTacMap, SubmissionLimits};
use crate::services::status_machine;

/// Read access to de-registration requests.
#[async_trait::async_trait]
pub trait DeRegRequestStore: Send + Sync {
    async fn exists(&self, dereg_id: i64) -> Result<bool, DeRegError>;

    async fn find_by_id(&self, dereg_id: i64) -> Result<Option<DeRegRequest>, DeRegError>;
}

/// The master registry of known devices.
#[async_trait::async_trait]
pub trait RegistryLookup: Send + Sync {
    /// Returns the identifiers absent from the registry, in input order.
    async fn find_unregistered(&self, identifiers: &[String]) -> Result<Vec<String>, DeRegError>;
}

/// Status name ↔ id resolution.
#[async_trait::async_trait]
pub trait StatusLookup: Send + Sync {
    async fn status_id(&self, status: Status) -> Result<i32, DeRegError>;

    async fn status_by_id(&self, id: i32) -> Result<Option<Status>, DeRegError>;
}

/// Device type description → id resolution.
#[async_trait::async_trait]
pub trait DeviceTypeLookup: Send + Sync {
    async fn device_type_id(&self, description: &str) -> Result<Option<i32>, DeRegError>;
}

/// Device and identifier persistence.
#[async_trait::async_trait]
pub trait DeviceStore: Send + Sync {
    /// Live devices of a request with their identifiers.
    async fn devices_for_request(&self, dereg_id: i64) -> Result<Vec<DeRegDevice>, DeRegError>;

    /// Atomically creates a new device generation for the request.
    ///
    /// Inserts the submitted devices and their identifiers, optionally sets
    /// the processing status, and supersedes the previous generation. Either
    /// all of it becomes visible or none of it does.
    async fn replace_devices(
        &self,
        request: &DeRegRequest,
        submission: &CuratedSubmission,
        identifiers: &IdentifierTacMap,
        processing_status: Option<i32>,
    ) -> Result<Vec<DeRegDevice>, DeRegError>;
}

/// Settings read by the orchestrator.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeRegSettings {
    pub automate_imei_check: bool,
    pub limits: SubmissionLimits,
}

/// Collaborators of the orchestrator.
#[derive(Clone)]
pub struct DeRegDependencies {
    pub requests: Arc<dyn DeRegRequestStore>,
    pub registry: Arc<dyn RegistryLookup>,
    pub devices: Arc<dyn DeviceStore>,
    pub statuses: Arc<dyn StatusLookup>,
    pub device_types: Arc<dyn DeviceTypeLookup>,
}

struct PreparedSubmission {
    request: DeRegRequest,
    curated: CuratedSubmission,
    identifiers: IdentifierTacMap,
}

/// Orchestrates the device operations of a de-registration request.
pub struct DeRegDeviceService {
    deps: DeRegDependencies,
    settings: DeRegSettings,
}

impl DeRegDeviceService {
    pub fn new(deps: DeRegDependencies, settings: DeRegSettings) -> Self {
        Self { deps, settings }
    }

    /// Returns the live devices of a request.
    pub async fn fetch_devices(&self, raw_dereg_id: &str) -> Result<Vec<DeRegDevice>, DeRegError> {
        let dereg_id =
            shared::validation::parse_numeric_id(raw_dereg_id).ok_or(DeRegError::NotFound)?;
        if !self.deps.requests.exists(dereg_id).await? {
            return Err(DeRegError::NotFound);
        }
        self.deps.devices.devices_for_request(dereg_id).await
    }

    /// Creates the first device batch of a request and sets its initial status.
    pub async fn create_devices(
        &self,
        payload: DeRegDevicesPayload,
    ) -> Result<DevicesOutcome, DeRegError> {
        let prepared = self.prepare(payload).await?;

        let status = status_machine::initial_processing_status(self.settings.automate_imei_check);
        let status_id = self.deps.statuses.status_id(status).await?;

        let devices = self
            .deps
            .devices
            .replace_devices(
                &prepared.request,
                &prepared.curated,
                &prepared.identifiers,
                Some(status_id),
            )
            .await?;

        info!(
            dereg_id = prepared.request.id,
            devices = devices.len(),
            identifiers = prepared.identifiers.len(),
            processing_status = %status,
            "De-registration devices created"
        );

        Ok(DevicesOutcome {
            devices,
            dereg_id: prepared.request.id,
        })
    }

    /// Replaces a request's devices when its statuses allow reprocessing.
    ///
    /// Outside the reprocessable window this succeeds with an empty device
    /// list and touches nothing.
    pub async fn update_devices(
        &self,
        payload: DeRegDevicesPayload,
    ) -> Result<DevicesOutcome, DeRegError> {
        let prepared = self.prepare(payload).await?;
        let request = &prepared.request;

        let processing = self.resolve_status(request.processing_status).await?;
        let report = self.resolve_status(request.report_status).await?;

        if !status_machine::requires_reprocessing(processing, report) {
            info!(
                dereg_id = request.id,
                processing_status = ?processing,
                report_status = ?report,
                "Update skipped, request is not reprocessable"
            );
            return Ok(DevicesOutcome {
                devices: Vec::new(),
                dereg_id: request.id,
            });
        }

        let devices = self
            .deps
            .devices
            .replace_devices(request, &prepared.curated, &prepared.identifiers, None)
            .await?;

        info!(
            dereg_id = request.id,
            devices = devices.len(),
            identifiers = prepared.identifiers.len(),
            "De-registration devices reprocessed"
        );

        Ok(DevicesOutcome {
            devices,
            dereg_id: request.id,
        })
    }

    /// Steps shared by create and update: request lookup, ownership, body
    /// read errors, curation, schema validation and the registry gate.
    async fn prepare(&self, payload: DeRegDevicesPayload) -> Result<PreparedSubmission, DeRegError> {
        let dereg_id =
            shared::validation::parse_numeric_id(&payload.dereg_id).ok_or(DeRegError::NotFound)?;
        let request = self
            .deps
            .requests
            .find_by_id(dereg_id)
            .await?
            .ok_or(DeRegError::NotFound)?;

        let submitted_user = payload.user_id.trim();
        if !submitted_user.is_empty() && submitted_user != request.user_id {
            warn!(dereg_id, "Submission user does not own the request");
            return Err(DeRegError::PermissionDenied);
        }

        if !payload.parse_errors.is_empty() {
            return Err(DeRegError::Validation(payload.parse_errors));
        }

        let curated = curation::curate(payload, &request);

        let mut errors = curation::validate_submission(&curated, &self.settings.limits);
        for (idx, device) in curated.devices.iter().enumerate() {
            if device.device_type.is_empty() {
                continue;
            }
            if self
                .deps
                .device_types
                .device_type_id(&device.device_type)
                .await?
                .is_none()
            {
                errors.add(
                    format!("devices[{}].device_type", idx),
                    format!("Device type {} is not supported", device.device_type),
                );
            }
        }
        errors.into_result()?;

        let identifiers = curation::extract_identifier_tac_map(&curated);
        let identifier_list = curation::extract_identifiers(&identifiers);
        let not_registered = self
            .deps
            .registry
            .find_unregistered(&identifier_list)
            .await?;
        if !not_registered.is_empty() {
            warn!(
                dereg_id,
                rejected = not_registered.len(),
                submitted = identifier_list.len(),
                "Submission contains unregistered identifiers"
            );
            return Err(DeRegError::NotRegistered(not_registered));
        }

        Ok(PreparedSubmission {
            request,
            curated,
            identifiers,
        })
    }

    async fn resolve_status(&self, id: Option<i32>) -> Result<Option<Status>, DeRegError> {
        match id {
            Some(id) => self.deps.statuses.status_by_id(id).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory collaborators for orchestrator tests.

    use super::*;
    use crate::models::{AttachedDocument, Document, Identifier};
    use crate::services::documents::DocumentStore;
    use chrono::Utc;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct State {
        pub requests: HashMap<i64, DeRegRequest>,
        pub registry: HashSet<String>,
        pub device_types: HashMap<String, i32>,
        pub devices: Vec<(DeRegDevice, bool)>,
        pub next_device_id: i64,
        pub fail_writes: bool,
        pub documents: Vec<Document>,
        pub attached: Vec<AttachedDocument>,
    }

    #[derive(Default)]
    pub struct InMemory {
        pub state: Mutex<State>,
    }

    pub fn status_id_of(status: Status) -> i32 {
        Status::ALL.iter().position(|s| *s == status).unwrap() as i32 + 1
    }

    impl InMemory {
        pub fn new() -> Arc<Self> {
            let store = Self::default();
            {
                let mut state = store.state.lock().unwrap();
                state.device_types.insert("Smartphone".to_string(), 1);
                state.device_types.insert("Tablet".to_string(), 2);
                state.next_device_id = 1;
            }
            Arc::new(store)
        }

        pub fn add_request(&self, id: i64, user_id: &str, processing: Option<Status>, report: Option<Status>) {
            let request = DeRegRequest {
                id,
                user_id: user_id.to_string(),
                tracking_id: format!("TRK-{}", id),
                processing_status: processing.map(status_id_of),
                report_status: report.map(status_id_of),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            self.state.lock().unwrap().requests.insert(id, request);
        }

        pub fn set_statuses(&self, id: i64, processing: Option<Status>, report: Option<Status>) {
            let mut state = self.state.lock().unwrap();
            let request = state.requests.get_mut(&id).unwrap();
            request.processing_status = processing.map(status_id_of);
            request.report_status = report.map(status_id_of);
        }

        pub fn register(&self, imeis: &[&str]) {
            let mut state = self.state.lock().unwrap();
            for imei in imeis {
                state
                    .registry
                    .insert(shared::validation::normalize_imei(imei));
            }
        }

        pub fn request(&self, id: i64) -> DeRegRequest {
            self.state.lock().unwrap().requests[&id].clone()
        }

        pub fn device_rows(&self) -> usize {
            self.state.lock().unwrap().devices.len()
        }

        pub fn deps(self: &Arc<Self>) -> DeRegDependencies {
            DeRegDependencies {
                requests: self.clone(),
                registry: self.clone(),
                devices: self.clone(),
                statuses: self.clone(),
                device_types: self.clone(),
            }
        }
    }

    #[async_trait::async_trait]
    impl DeRegRequestStore for InMemory {
        async fn exists(&self, dereg_id: i64) -> Result<bool, DeRegError> {
            Ok(self.state.lock().unwrap().requests.contains_key(&dereg_id))
        }

        async fn find_by_id(&self, dereg_id: i64) -> Result<Option<DeRegRequest>, DeRegError> {
            Ok(self.state.lock().unwrap().requests.get(&dereg_id).cloned())
        }
    }

    #[async_trait::async_trait]
    impl RegistryLookup for InMemory {
        async fn find_unregistered(&self, identifiers: &[String]) -> Result<Vec<String>, DeRegError> {
            let state = self.state.lock().unwrap();
            Ok(identifiers
                .iter()
                .filter(|imei| !state.registry.contains(&shared::validation::normalize_imei(imei)))
                .cloned()
                .collect())
        }
    }

    #[async_trait::async_trait]
    impl StatusLookup for InMemory {
        async fn status_id(&self, status: Status) -> Result<i32, DeRegError> {
            Ok(status_id_of(status))
        }

        async fn status_by_id(&self, id: i32) -> Result<Option<Status>, DeRegError> {
            Ok(usize::try_from(id - 1)
                .ok()
                .and_then(|idx| Status::ALL.get(idx).copied()))
        }
    }

    #[async_trait::async_trait]
    impl DeviceTypeLookup for InMemory {
        async fn device_type_id(&self, description: &str) -> Result<Option<i32>, DeRegError> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .device_types
                .get(description)
                .copied())
        }
    }

    #[async_trait::async_trait]
    impl DeviceStore for InMemory {
        async fn devices_for_request(&self, dereg_id: i64) -> Result<Vec<DeRegDevice>, DeRegError> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .devices
                .iter()
                .filter(|(d, live)| *live && d.dereg_id == dereg_id)
                .map(|(d, _)| d.clone())
                .collect())
        }

        async fn replace_devices(
            &self,
            request: &DeRegRequest,
            submission: &CuratedSubmission,
            identifiers: &IdentifierTacMap,
            processing_status: Option<i32>,
        ) -> Result<Vec<DeRegDevice>, DeRegError> {
            let mut state = self.state.lock().unwrap();
            if state.fail_writes {
                return Err(DeRegError::Persistence("connection reset".to_string()));
            }

            let mut created = Vec::new();
            for device in &submission.devices {
                let id = state.next_device_id;
                state.next_device_id += 1;
                let imeis = identifiers
                    .iter()
                    .filter(|(_, tac)| **tac == device.tac)
                    .map(|(imei, tac)| Identifier {
                        imei: imei.clone(),
                        norm_imei: shared::validation::normalize_imei(imei),
                        tac: tac.clone(),
                    })
                    .collect();
                created.push(DeRegDevice {
                    id,
                    dereg_id: request.id,
                    tac: device.tac.clone(),
                    brand_name: device.brand_name.clone(),
                    model_name: device.model_name.clone(),
                    model_num: device.model_num.clone(),
                    operating_system: device.operating_system.clone(),
                    device_type: device.device_type.clone(),
                    technology: device.technology.clone(),
                    count: device.count as i32,
                    imeis,
                    created_at: Utc::now(),
                });
            }

            for (device, live) in state.devices.iter_mut() {
                if device.dereg_id == request.id {
                    *live = false;
                    device.imeis.clear();
                }
            }
            state
                .devices
                .extend(created.iter().cloned().map(|d| (d, true)));
            if let Some(status) = processing_status {
                if let Some(r) = state.requests.get_mut(&request.id) {
                    r.processing_status = Some(status);
                }
            }
            Ok(created)
        }
    }

    #[async_trait::async_trait]
    impl DocumentStore for InMemory {
        async fn dereg_documents(&self) -> Result<Vec<Document>, DeRegError> {
            Ok(self.state.lock().unwrap().documents.clone())
        }

        async fn attached_documents(&self, dereg_id: i64) -> Result<Vec<AttachedDocument>, DeRegError> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .attached
                .iter()
                .filter(|d| d.dereg_id == dereg_id)
                .cloned()
                .collect())
        }

        async fn replace_documents(
            &self,
            dereg_id: i64,
            files: &[(Document, String)],
        ) -> Result<Vec<AttachedDocument>, DeRegError> {
            let mut state = self.state.lock().unwrap();
            if state.fail_writes {
                return Err(DeRegError::Persistence("disk full".to_string()));
            }
            for (document, filename) in files {
                state
                    .attached
                    .retain(|a| !(a.dereg_id == dereg_id && a.document_id == document.id));
                let id = state.attached.len() as i64 + 1;
                state.attached.push(AttachedDocument {
                    id,
                    dereg_id,
                    document_id: document.id,
                    filename: filename.clone(),
                    label: document.label.clone(),
                    required: document.required,
                });
            }
            Ok(state
                .attached
                .iter()
                .filter(|d| d.dereg_id == dereg_id)
                .cloned()
                .collect())
        }
    }
}
