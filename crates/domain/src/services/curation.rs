//! Identifier curation.
//!
//! Turns a submission into a canonical, deduplicated list of devices bound to
//! its request, checks the schema rules, and flattens it into the ordered
//! identifier → TAC map the registry check and device store work from.
//! Everything here is pure.

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use serde_json::{Map, Value};
use validator::Validate;

use crate::error::FieldErrors;
use crate::models::{CuratedDevice, CuratedSubmission, DeRegDevicesPayload, DeRegRequest};

/// Identifier → TAC, in submission order.
pub type IdentifierTacMap = IndexMap<String, String>;

/// Default maximum number of devices in one submission.
pub const DEFAULT_MAX_DEVICES_PER_REQUEST: usize = 100;

/// Default maximum number of identifiers per device entry.
pub const DEFAULT_MAX_IMEIS_PER_DEVICE: usize = 10_000;

/// Size limits applied during schema validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionLimits {
    pub max_devices: usize,
    pub max_imeis_per_device: usize,
}

impl Default for SubmissionLimits {
    fn default() -> Self {
        Self {
            max_devices: DEFAULT_MAX_DEVICES_PER_REQUEST,
            max_imeis_per_device: DEFAULT_MAX_IMEIS_PER_DEVICE,
        }
    }
}

lazy_static::lazy_static! {
    static ref INDEXED_DEVICE_FIELD: regex::Regex =
        regex::Regex::new(r"^devices\[(\d+)\]\[([A-Za-z_]+)\](?:\[(\d*)\])?$").unwrap();
}

/// Values of one list-style key, such as `devices[0][imeis][2]` or
/// `devices[0][imeis][]`.
#[derive(Default)]
struct ListField {
    positioned: BTreeMap<usize, String>,
    appended: Vec<String>,
}

impl ListField {
    /// Explicit positions in index order, then appended values in arrival order.
    fn into_values(self) -> impl Iterator<Item = Value> {
        self.positioned
            .into_values()
            .chain(self.appended)
            .map(Value::String)
    }
}

/// Builds a typed payload from form-encoded fields.
///
/// `devices` may arrive as one JSON-encoded field or as indexed keys such as
/// `devices[0][tac]`, `devices[0][imeis][]` and `devices[0][imeis][2]`.
/// Fields that cannot be read are recorded in `parse_errors`; the request id
/// and user id are kept whenever they are present.
pub fn payload_from_fields(fields: &[(String, String)]) -> DeRegDevicesPayload {
    let mut errors = FieldErrors::new();
    let mut top = Map::new();
    let mut indexed: BTreeMap<usize, Map<String, Value>> = BTreeMap::new();
    let mut lists: BTreeMap<(usize, String), ListField> = BTreeMap::new();

    for (key, value) in fields {
        if key == "devices" {
            match serde_json::from_str::<Value>(value) {
                Ok(parsed) => {
                    top.insert("devices".to_string(), parsed);
                }
                Err(_) => errors.add("devices", "devices must be valid JSON"),
            }
            continue;
        }

        let Some(caps) = INDEXED_DEVICE_FIELD.captures(key) else {
            top.insert(key.clone(), Value::String(value.clone()));
            continue;
        };

        let Ok(index) = caps[1].parse::<usize>() else {
            errors.add("devices", format!("invalid device index in {}", key));
            continue;
        };
        let field = caps[2].to_string();

        match caps.get(3).map(|m| m.as_str()) {
            None => {
                indexed
                    .entry(index)
                    .or_default()
                    .insert(field, Value::String(value.clone()));
            }
            Some("") => lists
                .entry((index, field))
                .or_default()
                .appended
                .push(value.clone()),
            Some(position) => {
                let Ok(position) = position.parse::<usize>() else {
                    errors.add("devices", format!("invalid list index in {}", key));
                    continue;
                };
                let list = lists.entry((index, field.clone())).or_default();
                if list.positioned.insert(position, value.clone()).is_some() {
                    errors.add(
                        format!("devices[{}].{}", index, field),
                        format!("{} is repeated", key),
                    );
                }
            }
        }
    }

    for ((index, field), list) in lists {
        let device = indexed.entry(index).or_default();
        let mut values = match device.remove(&field) {
            Some(existing) => vec![existing],
            None => Vec::new(),
        };
        values.extend(list.into_values());
        device.insert(field, Value::Array(values));
    }

    if !indexed.is_empty() {
        if top.contains_key("devices") {
            errors.add(
                "devices",
                "devices must be sent either as JSON or as indexed fields, not both",
            );
        } else {
            let devices = indexed.into_values().map(Value::Object).collect();
            top.insert("devices".to_string(), Value::Array(devices));
        }
    }

    let body = Value::Object(top);
    if !errors.is_empty() {
        return DeRegDevicesPayload::unreadable(Some(&body), errors);
    }

    match serde_json::from_value::<DeRegDevicesPayload>(body.clone()) {
        Ok(payload) => payload,
        Err(e) => {
            let mut errors = FieldErrors::new();
            errors.add("devices", e.to_string());
            DeRegDevicesPayload::unreadable(Some(&body), errors)
        }
    }
}

/// Normalizes a submission and binds it to its request.
///
/// Fields are trimmed and identifiers upper-cased. An identifier repeated
/// anywhere in the submission is kept only at its first position.
pub fn curate(payload: DeRegDevicesPayload, request: &DeRegRequest) -> CuratedSubmission {
    let mut seen: HashSet<String> = HashSet::new();

    let devices = payload
        .devices
        .into_iter()
        .map(|device| {
            let imeis: Vec<String> = device
                .imeis
                .iter()
                .map(|imei| imei.trim().to_ascii_uppercase())
                .filter(|imei| !imei.is_empty())
                .filter(|imei| seen.insert(imei.clone()))
                .collect();

            CuratedDevice {
                tac: device.tac.trim().to_string(),
                brand_name: device.brand_name.trim().to_string(),
                model_name: device.model_name.trim().to_string(),
                model_num: device.model_num.trim().to_string(),
                operating_system: device.operating_system.trim().to_string(),
                device_type: device.device_type.trim().to_string(),
                technology: device.technology.trim().to_string(),
                count: device.count.unwrap_or(imeis.len() as i64),
                imeis,
            }
        })
        .collect();

    CuratedSubmission {
        dereg_id: request.id,
        tracking_id: request.tracking_id.clone(),
        user_id: payload.user_id.trim().to_string(),
        devices,
    }
}

/// Checks the schema rules of a curated submission.
///
/// Device type existence is not checked here since it needs the reference
/// table.
pub fn validate_submission(submission: &CuratedSubmission, limits: &SubmissionLimits) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if submission.user_id.is_empty() {
        errors.add("user_id", "User Id is required");
    }

    if submission.devices.is_empty() {
        errors.add("devices", "at least one device is required");
    } else if submission.devices.len() > limits.max_devices {
        errors.add(
            "devices",
            format!("at most {} devices are allowed", limits.max_devices),
        );
    }

    let mut tacs: HashSet<&str> = HashSet::new();
    for (idx, device) in submission.devices.iter().enumerate() {
        let prefix = format!("devices[{}]", idx);

        if let Err(e) = device.validate() {
            errors.extend_validator(&prefix, &e);
        }

        if !device.tac.is_empty() && !tacs.insert(device.tac.as_str()) {
            errors.add(
                format!("{}.tac", prefix),
                format!("TAC {} is repeated in this request", device.tac),
            );
        }

        if device.imeis.is_empty() {
            errors.add(format!("{}.imeis", prefix), "at least one IMEI is required");
        } else if device.imeis.len() > limits.max_imeis_per_device {
            errors.add(
                format!("{}.imeis", prefix),
                format!(
                    "at most {} IMEIs are allowed per device",
                    limits.max_imeis_per_device
                ),
            );
        }

        for imei in &device.imeis {
            if let Err(e) = shared::validation::validate_imei(imei) {
                let message = e
                    .message
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("IMEI {} is invalid", imei));
                errors.add(format!("{}.imeis", prefix), message);
            } else if shared::validation::tac_of(imei) != Some(device.tac.as_str()) {
                errors.add(
                    format!("{}.imeis", prefix),
                    format!("IMEI {} does not belong to TAC {}", imei, device.tac),
                );
            }
        }

        if device.count >= 1 && device.count != device.imeis.len() as i64 {
            errors.add(
                format!("{}.count", prefix),
                format!(
                    "count {} does not match the {} IMEIs provided",
                    device.count,
                    device.imeis.len()
                ),
            );
        }
    }

    errors
}

/// Flattens a curated submission into identifier → TAC pairs.
pub fn extract_identifier_tac_map(submission: &CuratedSubmission) -> IdentifierTacMap {
    let mut map = IdentifierTacMap::new();
    for device in &submission.devices {
        for imei in &device.imeis {
            map.entry(imei.clone()).or_insert_with(|| device.tac.clone());
        }
    }
    map
}

/// Identifiers of the map, in submission order.
pub fn extract_identifiers(map: &IdentifierTacMap) -> Vec<String> {
    map.keys().cloned().collect()
}
