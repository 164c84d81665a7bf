use std::fmt::Display;

use common_enums::{Currency, DeclineCode, RecoveryStatus};
use common_utils::{errors::ValidationError, types::MinorUnit};
use serde::{Deserialize, Serialize};
use time::{Duration, PrimitiveDateTime};

use crate::orders::CustomerContact;

/// Reference to the payment a decline record is recovering.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum PaymentReference {
    /// A funnel order charge.
    Order(String),
    /// A recurring subscription charge.
    Subscription(String),
}

impl PaymentReference {
    /// Stable string form used in storage keys and processor idempotency keys.
    pub fn key_string(&self) -> String {
        match self {
            Self::Order(id) => format!("order_{id}"),
            Self::Subscription(id) => format!("subscription_{id}"),
        }
    }

    /// The bare order id, when this references an order.
    pub fn order_id(&self) -> Option<&str> {
        match self {
            Self::Order(id) => Some(id),
            Self::Subscription(_) => None,
        }
    }
}

impl Display for PaymentReference {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.write_str(&self.key_string())
    }
}

/// Fixed backoff schedule for automatic retries.
///
/// Offsets are applied from the record's `first_failure_at`, not from the
/// most recent failure, so a late sweep never pushes the whole schedule out.
#[derive(Clone, Debug)]
pub struct RetrySchedule {
    offsets: Vec<Duration>,
}

impl RetrySchedule {
    pub fn from_hours(hours: &[i64]) -> Self {
        Self {
            offsets: hours.iter().map(|hour| Duration::hours(*hour)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Offset for the given completed-attempt count; `None` once the
    /// schedule is exhausted.
    pub fn offset_for(&self, retry_attempts: i32) -> Option<Duration> {
        usize::try_from(retry_attempts)
            .ok()
            .and_then(|index| self.offsets.get(index).copied())
    }
}

/// One recovery email sent for a specific retry attempt.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct EmailRecord {
    pub attempt: i32,
    pub sent_at: PrimitiveDateTime,
    pub message_id: Option<String>,
}

/// A failed charge being recovered.
///
/// At most one Active record exists per payment reference. `retry_attempts`
/// only ever grows, `next_retry_at` is `Some` exactly while the record is
/// Active, and Resolved/Stopped are terminal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeclineRecord {
    pub decline_id: String,
    pub payment_ref: PaymentReference,
    pub amount: MinorUnit,
    pub currency: Currency,
    /// Most recent normalized decline reason.
    pub decline_code: DeclineCode,
    pub customer: CustomerContact,
    /// Number of scheduled retries consumed so far, capped at the schedule
    /// length.
    pub retry_attempts: i32,
    pub first_failure_at: PrimitiveDateTime,
    pub last_failure_at: PrimitiveDateTime,
    pub next_retry_at: Option<PrimitiveDateTime>,
    pub status: RecoveryStatus,
    pub emails_sent: Vec<EmailRecord>,
    /// Order the recovered charge was applied to, once resolved.
    pub converted_order_id: Option<String>,
    pub resolved_at: Option<PrimitiveDateTime>,
}

impl DeclineRecord {
    /// Open a new record for the first failure of a payment reference.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        decline_id: String,
        payment_ref: PaymentReference,
        amount: MinorUnit,
        currency: Currency,
        decline_code: DeclineCode,
        customer: CustomerContact,
        schedule: &RetrySchedule,
        now: PrimitiveDateTime,
    ) -> Self {
        let mut record = Self {
            decline_id,
            payment_ref,
            amount,
            currency,
            decline_code,
            customer,
            retry_attempts: 0,
            first_failure_at: now,
            last_failure_at: now,
            next_retry_at: None,
            status: RecoveryStatus::Active,
            emails_sent: Vec::new(),
            converted_order_id: None,
            resolved_at: None,
        };
        record.reschedule(schedule);
        record
    }

    fn reschedule(&mut self, schedule: &RetrySchedule) {
        match schedule.offset_for(self.retry_attempts) {
            Some(offset) => self.next_retry_at = Some(self.first_failure_at + offset),
            None => {
                self.next_retry_at = None;
                self.status = RecoveryStatus::Exhausted;
            }
        }
    }

    /// Register another failed charge: consume a retry slot and compute the
    /// next retry time, or exhaust the record when the schedule runs out.
    pub fn register_failure(
        &mut self,
        code: DeclineCode,
        schedule: &RetrySchedule,
        now: PrimitiveDateTime,
    ) -> Result<(), ValidationError> {
        match self.status {
            RecoveryStatus::Active | RecoveryStatus::Exhausted => {
                let cap = i32::try_from(schedule.len()).unwrap_or(i32::MAX);
                if self.retry_attempts < cap {
                    self.retry_attempts += 1;
                }
                self.decline_code = code;
                self.last_failure_at = now;
                self.reschedule(schedule);
                Ok(())
            }
            RecoveryStatus::Resolved | RecoveryStatus::Stopped => {
                Err(ValidationError::InvalidValue {
                    message: format!("cannot register a failure on a {} record", self.status),
                })
            }
        }
    }

    /// A retry charge settled: the record leaves the pipeline for good.
    /// `retry_attempts` is left untouched.
    pub fn mark_resolved(
        &mut self,
        converted_order_id: Option<String>,
        now: PrimitiveDateTime,
    ) -> Result<(), ValidationError> {
        match self.status {
            RecoveryStatus::Active | RecoveryStatus::Exhausted => {
                self.status = RecoveryStatus::Resolved;
                self.next_retry_at = None;
                self.resolved_at = Some(now);
                self.converted_order_id = converted_order_id;
                Ok(())
            }
            RecoveryStatus::Resolved | RecoveryStatus::Stopped => {
                Err(ValidationError::InvalidValue {
                    message: format!("cannot resolve a {} record", self.status),
                })
            }
        }
    }

    /// One-way administrator stop: no further automatic retries or emails.
    pub fn stop(&mut self) -> Result<(), ValidationError> {
        match self.status {
            RecoveryStatus::Active | RecoveryStatus::Exhausted => {
                self.status = RecoveryStatus::Stopped;
                self.next_retry_at = None;
                Ok(())
            }
            RecoveryStatus::Resolved | RecoveryStatus::Stopped => {
                Err(ValidationError::InvalidValue {
                    message: format!("cannot stop a {} record", self.status),
                })
            }
        }
    }

    /// Whether the record is eligible for the retry sweep right now.
    pub fn is_due(&self, now: PrimitiveDateTime) -> bool {
        self.status == RecoveryStatus::Active
            && self
                .next_retry_at
                .map(|next_retry_at| next_retry_at <= now)
                .unwrap_or(false)
    }

    pub fn has_email_for(&self, attempt: i32) -> bool {
        self.emails_sent.iter().any(|email| email.attempt == attempt)
    }

    /// Record a sent recovery email; at most one per attempt number.
    pub fn record_email(
        &mut self,
        attempt: i32,
        message_id: Option<String>,
        now: PrimitiveDateTime,
    ) -> Result<(), ValidationError> {
        if self.has_email_for(attempt) {
            return Err(ValidationError::InvalidValue {
                message: format!("recovery email for attempt {attempt} was already sent"),
            });
        }
        self.emails_sent.push(EmailRecord {
            attempt,
            sent_at: now,
            message_id,
        });
        Ok(())
    }

    /// Deterministic processor idempotency key for the next retry charge.
    pub fn charge_idempotency_key(&self) -> String {
        format!("{}_retry_{}", self.payment_ref.key_string(), self.retry_attempts)
    }
}
