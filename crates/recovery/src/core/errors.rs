use common_enums::RecoveryStatus;

/// Errors surfaced by the recovery operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RecoveryApiError {
    #[error("Decline record not found")]
    DeclineNotFound,
    /// The record is in a terminal state the requested operation cannot act on.
    #[error("Record status {status} does not allow this operation")]
    InvalidRecordState { status: RecoveryStatus },
    #[error("Payment processor is temporarily unavailable, please retry")]
    PaymentProcessorUnavailable,
    #[error("Internal server error")]
    InternalServerError,
}
