//! Request and response types crossing the adapter boundary.

use common_enums::{Currency, DeclineCode, RecoveryEmailTemplate};
use common_utils::types::MinorUnit;
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

/// A one-time charge against a stored payment method.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChargeRequest {
    /// Customer handle at the payment processor.
    pub customer_ref: String,
    /// Stored payment method handle at the payment processor.
    pub payment_method_ref: String,
    /// Amount to charge, in minor units.
    pub amount: MinorUnit,
    /// Currency of the charge.
    pub currency: Currency,
    /// Deterministic key the processor uses to de-duplicate repeated
    /// submissions of the same logical charge.
    pub idempotency_key: String,
}

/// Outcome of a charge request.
///
/// Both variants are successful round-trips to the processor; a decline is
/// business data, not a transport failure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ChargeOutcome {
    /// The charge settled.
    Charged {
        /// Transaction reference assigned by the processor.
        provider_txn_id: String,
    },
    /// The processor refused the charge.
    Declined {
        /// Normalized decline reason.
        code: DeclineCode,
        /// Raw provider message, kept for the admin/audit surfaces only.
        message: Option<String>,
    },
}

/// Create or update a recurring billing schedule.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecurringScheduleRequest {
    /// Customer handle at the payment processor.
    pub customer_ref: String,
    /// Stored payment method handle at the payment processor.
    pub payment_method_ref: String,
    /// Existing schedule to update; `None` creates a new schedule.
    pub schedule_ref: Option<String>,
    /// Price per unit per billing period, in minor units.
    pub price_each: MinorUnit,
    /// Number of units on the schedule.
    pub quantity: u32,
    /// Currency of the schedule.
    pub currency: Currency,
    /// Amount charged immediately on acceptance. Funnel add-ons always pass
    /// zero here; the first real charge happens on the anchor date.
    pub first_charge_amount: MinorUnit,
    /// Date of the first (or next) scheduled billing.
    pub next_billing_at: PrimitiveDateTime,
    /// Deterministic de-duplication key for the schedule mutation.
    pub idempotency_key: String,
}

/// Outcome of a schedule create/update.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleOutcome {
    /// Schedule reference assigned by the processor.
    pub schedule_ref: String,
}

/// A transactional email to hand to the delivery provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmailRequest {
    /// Template to render.
    pub template: RecoveryEmailTemplate,
    /// Recipient address.
    pub recipient: String,
    /// Template substitution data.
    pub data: serde_json::Value,
}

/// Outcome of a successful email hand-off.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SendOutcome {
    /// Message reference assigned by the provider.
    pub message_id: String,
}
