use common_enums::{Currency, DeclineCode, RecoveryStatus};
use common_utils::types::MinorUnit;
use keepsake_domain_models::{
    orders::CustomerContact,
    recovery::{DeclineRecord, PaymentReference},
};
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

/// Request to record a failed charge into the recovery pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordDeclineRequest {
    pub payment_ref: PaymentReference,
    pub amount: MinorUnit,
    pub currency: Currency,
    pub decline_code: DeclineCode,
    pub customer: CustomerContact,
}

/// Decline record projection returned to the admin surface.
#[derive(Clone, Debug, Serialize)]
pub struct DeclineRecordResponse {
    pub decline_id: String,
    pub payment_ref: PaymentReference,
    pub status: RecoveryStatus,
    pub retry_attempts: i32,
    pub next_retry_at: Option<PrimitiveDateTime>,
    pub converted_order_id: Option<String>,
}

impl From<&DeclineRecord> for DeclineRecordResponse {
    fn from(record: &DeclineRecord) -> Self {
        Self {
            decline_id: record.decline_id.clone(),
            payment_ref: record.payment_ref.clone(),
            status: record.status,
            retry_attempts: record.retry_attempts,
            next_retry_at: record.next_retry_at,
            converted_order_id: record.converted_order_id.clone(),
        }
    }
}

/// What a single retry attempt did to its record.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryOutcome {
    /// The charge settled; the record is resolved.
    Recovered,
    /// The processor declined again; the schedule advanced.
    Declined,
    /// The processor could not be reached; the record is untouched.
    TransientError,
}

/// Aggregate counters of one retry sweep, for caller reporting.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct SweepSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub notifications_sent: usize,
}

/// Result of an administrator-triggered out-of-band retry.
#[derive(Clone, Debug, Serialize)]
pub struct ManualRetryResponse {
    pub decline_id: String,
    pub outcome: RetryOutcome,
    pub notification_sent: bool,
    pub record: DeclineRecordResponse,
}

/// Result of an administrator-triggered recovery email dispatch.
#[derive(Clone, Debug, Serialize)]
pub struct SendRecoveryEmailResponse {
    pub decline_id: String,
    pub attempt: i32,
    pub sent: bool,
}
