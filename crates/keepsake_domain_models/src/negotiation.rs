use common_enums::{NegotiationStep, SessionStatus};
use common_utils::types::MinorUnit;
use serde::{Deserialize, Serialize};
use time::{Duration, PrimitiveDateTime};

use crate::offers::OfferSnapshot;

/// Which presentation of the current offer the customer is seeing.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attempt {
    /// First presentation, at the frozen list price.
    FullPrice,
    /// Second presentation of the same offer, at the frozen downsell price.
    Downsell,
}

impl Attempt {
    /// 1-based attempt number used in idempotency keys and audit details.
    pub fn as_number(self) -> u8 {
        match self {
            Self::FullPrice => 1,
            Self::Downsell => 2,
        }
    }
}

/// Server-authoritative state of one customer's walk through the
/// post-checkout offer sequence.
///
/// The session is keyed by the opaque order token and never reused across
/// orders. Offer prices are frozen into `offers` when the session opens.
/// The client only proposes actions; position and terminality live here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NegotiationSession {
    pub session_token: String,
    pub order_ref: String,
    pub offers: Vec<OfferSnapshot>,
    pub offer_index: usize,
    pub attempt: Attempt,
    pub status: SessionStatus,
    pub created_at: PrimitiveDateTime,
    /// When the current `(offer_index, attempt)` position was first served.
    /// `None` until `get_next_offer` serves it; reset on every advance, which
    /// is what makes duplicate accept/decline calls detectable.
    pub presented_at: Option<PrimitiveDateTime>,
}

impl NegotiationSession {
    pub fn open(
        session_token: impl Into<String>,
        order_ref: impl Into<String>,
        offers: Vec<OfferSnapshot>,
        now: PrimitiveDateTime,
    ) -> Self {
        let status = if offers.is_empty() {
            SessionStatus::Completed
        } else {
            SessionStatus::InProgress
        };
        Self {
            session_token: session_token.into(),
            order_ref: order_ref.into(),
            offers,
            offer_index: 0,
            attempt: Attempt::FullPrice,
            status,
            created_at: now,
            presented_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// The offer snapshot at the current position, if the session is live.
    pub fn current_offer(&self) -> Option<&OfferSnapshot> {
        if self.is_terminal() {
            return None;
        }
        self.offers.get(self.offer_index)
    }

    /// Price of the current presentation.
    pub fn current_price(&self) -> Option<MinorUnit> {
        self.current_offer()
            .map(|snapshot| snapshot.price_for_attempt(self.attempt))
    }

    /// Record that the current position has been served to the customer.
    /// The presentation countdown runs from this instant.
    pub fn mark_presented(&mut self, now: PrimitiveDateTime) {
        if self.presented_at.is_none() {
            self.presented_at = Some(now);
        }
    }

    /// Whether the presentation countdown for the current position has
    /// elapsed. An expired countdown is treated as an implicit decline.
    pub fn countdown_expired(&self, now: PrimitiveDateTime, countdown: Duration) -> bool {
        self.presented_at
            .map(|presented_at| now > presented_at + countdown)
            .unwrap_or(false)
    }

    /// Whether the whole-session safety timeout has elapsed.
    pub fn safety_expired(&self, now: PrimitiveDateTime, timeout: Duration) -> bool {
        now > self.created_at + timeout
    }

    /// Move past the current offer after a successful acceptance.
    pub fn advance_on_accept(&mut self) {
        self.offer_index += 1;
        self.attempt = Attempt::FullPrice;
        self.presented_at = None;
        if self.offer_index >= self.offers.len() {
            self.status = SessionStatus::Completed;
        }
    }

    /// Apply the decline edge for the current position: a declined first
    /// attempt re-presents the same offer at the downsell price, a declined
    /// downsell moves on to the next offer or completes the session.
    pub fn advance_on_decline(&mut self) -> NegotiationStep {
        self.presented_at = None;
        match self.attempt {
            Attempt::FullPrice => {
                self.attempt = Attempt::Downsell;
                NegotiationStep::Downsell
            }
            Attempt::Downsell => {
                self.offer_index += 1;
                self.attempt = Attempt::FullPrice;
                if self.offer_index >= self.offers.len() {
                    self.status = SessionStatus::Completed;
                    NegotiationStep::Complete
                } else {
                    NegotiationStep::NextOffer
                }
            }
        }
    }

    /// Force the session terminal regardless of position (safety timeout).
    pub fn force_complete(&mut self) {
        self.status = SessionStatus::Completed;
        self.presented_at = None;
    }

    /// Whether the given offer was already presented and passed over.
    pub fn offer_already_passed(&self, offer_id: &str) -> bool {
        let passed = self
            .offers
            .iter()
            .take(self.offer_index)
            .any(|snapshot| snapshot.offer_id == offer_id);
        passed
            || (self.is_terminal()
                && self
                    .offers
                    .iter()
                    .any(|snapshot| snapshot.offer_id == offer_id))
    }
}
