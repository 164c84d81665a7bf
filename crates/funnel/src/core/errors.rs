use common_enums::DeclineCode;

/// Errors surfaced at the negotiation boundary.
///
/// Display strings are safe to show customers; the raw decline code rides
/// along for the admin and audit surfaces.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FunnelApiError {
    /// 402-style result of a hard decline during `accept_offer`. The session
    /// has already advanced its decline edge; the caller should fetch the
    /// next offer.
    #[error("Your payment was declined, please check your card details")]
    PaymentDeclined { code: DeclineCode },
    #[error("This offer is not currently presented for the session")]
    OfferNotCurrent,
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    #[error("Session not found")]
    SessionNotFound,
    #[error("Order not found")]
    OrderNotFound,
    #[error("Offer not found")]
    OfferNotFound,
    #[error("Offer could not be added to the catalog")]
    InvalidOffer,
    /// Transient processor failure; the session position is unchanged and
    /// the same call can safely be retried.
    #[error("Payment processor is temporarily unavailable, please retry")]
    PaymentProcessorUnavailable,
    #[error("Internal server error")]
    InternalServerError,
}
