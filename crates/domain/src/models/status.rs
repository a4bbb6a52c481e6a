//! Request status reference values.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Named status of a de-registration request.
///
/// The database stores statuses as integer ids in the `status` reference
/// table; the description column holds the names returned by [`Status::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "New Request")]
    NewRequest,
    #[serde(rename = "Awaiting Documents")]
    AwaitingDocuments,
    #[serde(rename = "Pending Review")]
    PendingReview,
    #[serde(rename = "In Review")]
    InReview,
    #[serde(rename = "Information Requested")]
    InformationRequested,
    #[serde(rename = "Approved")]
    Approved,
    #[serde(rename = "Rejected")]
    Rejected,
    #[serde(rename = "Closed")]
    Closed,
    #[serde(rename = "Pending")]
    Pending,
    #[serde(rename = "Processing")]
    Processing,
    #[serde(rename = "Failed")]
    Failed,
    #[serde(rename = "Completed")]
    Completed,
}

impl Status {
    pub const ALL: [Status; 12] = [
        Status::NewRequest,
        Status::AwaitingDocuments,
        Status::PendingReview,
        Status::InReview,
        Status::InformationRequested,
        Status::Approved,
        Status::Rejected,
        Status::Closed,
        Status::Pending,
        Status::Processing,
        Status::Failed,
        Status::Completed,
    ];

    /// Name as stored in the reference table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewRequest => "New Request",
            Self::AwaitingDocuments => "Awaiting Documents",
            Self::PendingReview => "Pending Review",
            Self::InReview => "In Review",
            Self::InformationRequested => "Information Requested",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Closed => "Closed",
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Failed => "Failed",
            Self::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Status::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown status: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names_round_trip() {
        for status in Status::ALL {
            assert_eq!(Status::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_status_from_str_is_lenient() {
        assert_eq!(
            Status::from_str("  pending review ").unwrap(),
            Status::PendingReview
        );
        assert!(Status::from_str("Archived").is_err());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&Status::AwaitingDocuments).unwrap(),
            "\"Awaiting Documents\""
        );
        let status: Status = serde_json::from_str("\"Failed\"").unwrap();
        assert_eq!(status, Status::Failed);
    }
}
