use common_enums::{Currency, NegotiationStep};
use common_utils::types::MinorUnit;
use keepsake_domain_models::{negotiation::Attempt, offers::OfferSnapshot};
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

/// One offer as presented to the customer.
#[derive(Clone, Debug, Serialize)]
pub struct PresentedOffer {
    pub offer_id: String,
    pub display_name: String,
    /// Price of this presentation (list or downsell).
    pub price: MinorUnit,
    pub currency: Currency,
    /// 1 = full price, 2 = downsell.
    pub attempt: u8,
    pub recurring: bool,
}

impl PresentedOffer {
    pub fn from_snapshot(snapshot: &OfferSnapshot, attempt: Attempt) -> Self {
        Self {
            offer_id: snapshot.offer_id.clone(),
            display_name: snapshot.display_name.clone(),
            price: snapshot.price_for_attempt(attempt),
            currency: snapshot.currency,
            attempt: attempt.as_number(),
            recurring: snapshot.recurring,
        }
    }
}

/// Response of `get_next_offer`: the next presentation, or the "no more
/// offers" sentinel when `complete` is set.
#[derive(Clone, Debug, Serialize)]
pub struct NextOfferResponse {
    pub complete: bool,
    pub offer: Option<PresentedOffer>,
    /// Seconds the customer has to act before the presentation expires.
    pub countdown_secs: Option<u64>,
}

impl NextOfferResponse {
    pub fn completed() -> Self {
        Self {
            complete: true,
            offer: None,
            countdown_secs: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AcceptOfferRequest {
    pub offer_id: String,
    pub quantity: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct AcceptOfferResponse {
    pub order_ref: String,
    /// Order total after this acceptance.
    pub order_total: MinorUnit,
    /// Amount charged right now (zero for recurring add-ons).
    pub charged_amount: MinorUnit,
    pub provider_txn_id: Option<String>,
    pub schedule_ref: Option<String>,
    pub next_billing_at: Option<PrimitiveDateTime>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DeclineOfferResponse {
    pub step: NegotiationStep,
}

/// Counters of one session expiry sweep.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct ExpireSessionsSummary {
    pub expired: usize,
}
