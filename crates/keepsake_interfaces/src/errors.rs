//! Transport-level errors of the adapter interfaces.
//!
//! A confirmed decline is not an error: it comes back as data in
//! [`ChargeOutcome::Declined`](crate::types::ChargeOutcome). The variants
//! here all describe transient conditions that are safe to retry without
//! consuming a scheduled attempt.

/// Errors while executing a request against the payment processor.
#[derive(Debug, thiserror::Error)]
pub enum PaymentExecutorError {
    /// The request to the processor timed out.
    #[error("Request to the payment processor timed out")]
    RequestTimeout,
    /// A connection to the processor could not be established.
    #[error("Failed to establish a connection to the payment processor")]
    ConnectionFailure,
    /// The processor reported itself temporarily unavailable.
    #[error("Payment processor is temporarily unavailable")]
    ProviderUnavailable,
    /// The processor returned a response that could not be interpreted.
    #[error("Payment processor returned a malformed response")]
    InvalidResponse,
}

/// Errors while handing an email to the delivery provider.
#[derive(Debug, thiserror::Error)]
pub enum EmailDispatcherError {
    /// The provider rejected or failed to accept the message.
    #[error("Email provider failed to accept the message")]
    DeliveryFailure,
    /// The provider could not be reached.
    #[error("Email provider is unreachable")]
    ProviderUnavailable,
}
