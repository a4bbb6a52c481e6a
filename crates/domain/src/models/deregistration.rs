//! De-registration request, device and identifier models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::error::FieldErrors;

/// A de-registration case. Devices are attached to it in generations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeRegRequest {
    pub id: i64,
    pub user_id: String,
    pub tracking_id: String,
    pub processing_status: Option<i32>,
    pub report_status: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One IMEI linked to a de-registration device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Identifier {
    pub imei: String,
    pub norm_imei: String,
    pub tac: String,
}

/// A device entered for de-registration, with its live identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeRegDevice {
    pub id: i64,
    pub dereg_id: i64,
    pub tac: String,
    pub brand_name: String,
    pub model_name: String,
    pub model_num: String,
    pub operating_system: String,
    pub device_type: String,
    pub technology: String,
    pub count: i32,
    pub imeis: Vec<Identifier>,
    pub created_at: DateTime<Utc>,
}

/// Static device type reference entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeviceType {
    pub id: i32,
    pub description: String,
}

/// Typed shape of a device submission, however the fields arrived.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeRegDevicesPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub dereg_id: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub user_id: String,

    #[serde(default)]
    pub devices: Vec<DeRegDeviceInput>,

    /// Problems met while reading the body. Reported only once the request
    /// itself has been resolved.
    #[serde(skip)]
    pub parse_errors: FieldErrors,
}

impl DeRegDevicesPayload {
    /// Payload for a body that could not be read in full. Whatever request id
    /// and user id were readable are kept.
    pub fn unreadable(body: Option<&serde_json::Value>, parse_errors: FieldErrors) -> Self {
        Self {
            dereg_id: body
                .and_then(|b| scalar_field(b, &["dereg_id"]))
                .unwrap_or_default(),
            user_id: body
                .and_then(|b| scalar_field(b, &["user_id"]))
                .unwrap_or_default(),
            devices: Vec::new(),
            parse_errors,
        }
    }
}

/// First of `keys` holding a string or number, as a string.
pub(crate) fn scalar_field(body: &serde_json::Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match body.get(*key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// One device entry as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeRegDeviceInput {
    #[serde(default, deserialize_with = "lenient_string")]
    pub tac: String,

    #[serde(default, alias = "brand")]
    pub brand_name: String,

    #[serde(default)]
    pub model_name: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub model_num: String,

    #[serde(default)]
    pub operating_system: String,

    #[serde(default)]
    pub device_type: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub technology: String,

    #[serde(default, deserialize_with = "lenient_count")]
    pub count: Option<i64>,

    #[serde(default, deserialize_with = "identifier_list")]
    pub imeis: Vec<String>,
}

/// Submission after curation: trimmed, deduplicated and bound to its request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuratedSubmission {
    pub dereg_id: i64,
    pub tracking_id: String,
    pub user_id: String,
    pub devices: Vec<CuratedDevice>,
}

/// Curated device entry; schema rules are declared on the fields.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct CuratedDevice {
    #[validate(custom(function = "shared::validation::validate_tac"))]
    pub tac: String,

    #[validate(length(min = 1, max = 1000, message = "brand_name must be 1-1000 characters"))]
    pub brand_name: String,

    #[validate(length(min = 1, max = 1000, message = "model_name must be 1-1000 characters"))]
    pub model_name: String,

    #[validate(length(min = 1, max = 1000, message = "model_num must be 1-1000 characters"))]
    pub model_num: String,

    #[validate(length(
        min = 1,
        max = 1000,
        message = "operating_system must be 1-1000 characters"
    ))]
    pub operating_system: String,

    #[validate(length(min = 1, max = 1000, message = "device_type is required"))]
    pub device_type: String,

    #[validate(length(min = 1, max = 1000, message = "technology must be 1-1000 characters"))]
    pub technology: String,

    #[validate(range(min = 1, message = "count must be at least 1"))]
    pub count: i64,

    pub imeis: Vec<String>,
}

/// Result of a create or update call.
#[derive(Debug, Clone, Serialize)]
pub struct DevicesOutcome {
    pub devices: Vec<DeRegDevice>,
    #[serde(rename = "dreg_id")]
    pub dereg_id: i64,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(String::new()),
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string, found {}",
            other
        ))),
    }
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("count must be an integer")),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(None),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom("count must be an integer")),
        _ => Err(serde::de::Error::custom("count must be an integer")),
    }
}

/// Accepts a list, a list of lists, or a comma separated string.
fn identifier_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    fn collect(value: serde_json::Value, out: &mut Vec<String>) -> Result<(), String> {
        match value {
            serde_json::Value::Null => Ok(()),
            serde_json::Value::String(s) => {
                out.extend(
                    s.split(',')
                        .map(str::trim)
                        .filter(|part| !part.is_empty())
                        .map(str::to_string),
                );
                Ok(())
            }
            serde_json::Value::Number(n) => {
                out.push(n.to_string());
                Ok(())
            }
            serde_json::Value::Array(items) => {
                for item in items {
                    collect(item, out)?;
                }
                Ok(())
            }
            other => Err(format!("imeis must be a list of strings, found {}", other)),
        }
    }

    let mut out = Vec::new();
    collect(serde_json::Value::deserialize(deserializer)?, &mut out)
        .map_err(serde::de::Error::custom)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unreadable_payload_keeps_ids() {
        let mut errors = FieldErrors::new();
        errors.add("body", "devices must be a list");
        let body = json!({"dereg_id": 41, "user_id": "user-41", "devices": "three"});

        let payload = DeRegDevicesPayload::unreadable(Some(&body), errors);
        assert_eq!(payload.dereg_id, "41");
        assert_eq!(payload.user_id, "user-41");
        assert!(payload.devices.is_empty());
        assert!(payload.parse_errors.get("body").is_some());

        let empty = DeRegDevicesPayload::unreadable(None, FieldErrors::new());
        assert!(empty.dereg_id.is_empty());
    }

    #[test]
    fn test_payload_accepts_numeric_ids() {
        let payload: DeRegDevicesPayload = serde_json::from_value(json!({
            "dereg_id": 12,
            "user_id": "user-1",
            "devices": []
        }))
        .unwrap();
        assert_eq!(payload.dereg_id, "12");
        assert_eq!(payload.user_id, "user-1");
    }

    #[test]
    fn test_device_input_imei_shapes() {
        let nested: DeRegDeviceInput = serde_json::from_value(json!({
            "tac": "12345678",
            "imeis": [["123456789012345", "123456789012346"]]
        }))
        .unwrap();
        assert_eq!(nested.imeis.len(), 2);

        let csv: DeRegDeviceInput = serde_json::from_value(json!({
            "tac": 12345678,
            "imeis": "123456789012345, 123456789012346,"
        }))
        .unwrap();
        assert_eq!(csv.tac, "12345678");
        assert_eq!(csv.imeis, vec!["123456789012345", "123456789012346"]);
    }

    #[test]
    fn test_device_input_count_shapes() {
        let from_str: DeRegDeviceInput = serde_json::from_value(json!({"count": "3"})).unwrap();
        assert_eq!(from_str.count, Some(3));

        let missing: DeRegDeviceInput = serde_json::from_value(json!({})).unwrap();
        assert_eq!(missing.count, None);

        let bad = serde_json::from_value::<DeRegDeviceInput>(json!({"count": "three"}));
        assert!(bad.is_err());
    }

    #[test]
    fn test_devices_outcome_serializes_dreg_id() {
        let outcome = DevicesOutcome {
            devices: vec![],
            dereg_id: 5,
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["dreg_id"], 5);
        assert!(value["devices"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_curated_device_validation() {
        let device = CuratedDevice {
            tac: "1234".to_string(),
            brand_name: String::new(),
            model_name: "Model".to_string(),
            model_num: "M1".to_string(),
            operating_system: "Android".to_string(),
            device_type: "Smartphone".to_string(),
            technology: "4G".to_string(),
            count: 0,
            imeis: vec![],
        };
        let errors = device.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("tac"));
        assert!(fields.contains_key("brand_name"));
        assert!(fields.contains_key("count"));
        assert!(!fields.contains_key("model_name"));
    }
}
