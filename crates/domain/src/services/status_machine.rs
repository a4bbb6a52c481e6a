//! Status machine for de-registration requests.
//!
//! A request carries two independent tracks: `processing_status` and
//! `report_status`. Only two decisions live here: the status set when a
//! device batch is first created, and whether a resubmission is reprocessed.

use crate::models::Status;

/// Processing statuses from which a resubmission is always reprocessed.
pub const REPROCESSABLE_PROCESSING_STATUSES: [Status; 3] =
    [Status::Failed, Status::NewRequest, Status::PendingReview];

/// Processing status applied when devices are created for a request.
pub fn initial_processing_status(automate_imei_check: bool) -> Status {
    if automate_imei_check {
        Status::PendingReview
    } else {
        Status::AwaitingDocuments
    }
}

/// Whether an update must replace the request's devices.
///
/// True after any failure on either track, or while the request has not
/// moved past review.
pub fn requires_reprocessing(processing: Option<Status>, report: Option<Status>) -> bool {
    let processing_reprocessable = processing
        .map(|s| REPROCESSABLE_PROCESSING_STATUSES.contains(&s))
        .unwrap_or(false);
    let report_failed = report == Some(Status::Failed);
    processing_reprocessable || report_failed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_status_follows_toggle() {
        assert_eq!(initial_processing_status(true), Status::PendingReview);
        assert_eq!(initial_processing_status(false), Status::AwaitingDocuments);
    }

    #[test]
    fn test_reprocessing_for_reprocessable_processing_statuses() {
        for status in REPROCESSABLE_PROCESSING_STATUSES {
            assert!(requires_reprocessing(Some(status), None));
            assert!(requires_reprocessing(Some(status), Some(Status::Completed)));
        }
    }

    #[test]
    fn test_reprocessing_for_failed_report() {
        assert!(requires_reprocessing(Some(Status::Completed), Some(Status::Failed)));
        assert!(requires_reprocessing(None, Some(Status::Failed)));
    }

    #[test]
    fn test_no_reprocessing_otherwise() {
        assert!(!requires_reprocessing(
            Some(Status::Completed),
            Some(Status::Completed)
        ));
        assert!(!requires_reprocessing(
            Some(Status::AwaitingDocuments),
            Some(Status::Processing)
        ));
        assert!(!requires_reprocessing(Some(Status::Processing), None));
        assert!(!requires_reprocessing(None, None));
    }

    #[test]
    fn test_gate_over_all_combinations() {
        for processing in Status::ALL {
            for report in Status::ALL {
                let expected = matches!(
                    processing,
                    Status::Failed | Status::NewRequest | Status::PendingReview
                ) || report == Status::Failed;
                assert_eq!(
                    requires_reprocessing(Some(processing), Some(report)),
                    expected,
                    "processing={}, report={}",
                    processing,
                    report
                );
            }
        }
    }
}
