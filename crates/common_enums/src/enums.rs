use serde::{Deserialize, Serialize};

/// The three-letter ISO currency the storefront charges in.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    PartialEq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Aud,
    Cad,
    Eur,
    Gbp,
}

/// Normalized decline reason reported by the payment processor.
///
/// Raw provider codes are mapped into this set at the adapter boundary;
/// customers only ever see a normalized message, administrators see the
/// variant name.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeclineCode {
    CardDeclined,
    InsufficientFunds,
    ExpiredCard,
    IncorrectCvc,
    DoNotHonor,
    FraudSuspected,
    ProcessingError,
    Unknown,
}

/// Lifecycle status of a decline record in the recovery pipeline.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecoveryStatus {
    /// Scheduled for further automatic retries.
    Active,
    /// A retry charge succeeded.
    Resolved,
    /// The retry schedule ran out without a successful charge.
    Exhausted,
    /// An administrator halted recovery.
    Stopped,
}

/// Lifecycle status of a negotiation session.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

/// What the funnel does next after an offer is declined.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NegotiationStep {
    /// The same offer will be re-presented at the reduced price.
    Downsell,
    /// The next eligible offer will be presented at full price.
    NextOffer,
    /// No offers remain; the session is complete.
    Complete,
}

/// Action recorded in the per-order/per-decline activity trail.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityAction {
    SessionOpened,
    SessionCompleted,
    SessionExpired,
    OfferAccepted,
    OfferDeclined,
    OfferExpired,
    ChargeDeclined,
    ScheduleCreated,
    DeclineRecorded,
    RetryScheduled,
    RetrySucceeded,
    RetryFailed,
    RetriesExhausted,
    RecoveryEmailSent,
    RecoveryStopped,
    RecoveryResolved,
}

/// Template of a recovery email, escalating with the retry attempt.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecoveryEmailTemplate {
    /// First notice, sent after the initial failed charge retry.
    PaymentFailed,
    /// Reminder sent for intermediate retry attempts.
    PaymentRetryReminder,
    /// Last notice before the schedule is exhausted.
    FinalNotice,
}
