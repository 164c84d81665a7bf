use common_enums::Currency;
use common_utils::{
    errors::{CustomResult, ValidationError},
    types::{MinorUnit, Percentage},
};
use error_stack::{report, ResultExt};
use serde::{Deserialize, Serialize};

use crate::negotiation::Attempt;

const DEFAULT_DOWNSELL_PERCENT: f32 = 20.0;

/// A purchasable post-checkout add-on.
///
/// The variant determines the billing behavior on acceptance: one-time offers
/// charge immediately, recurring offers create a schedule anchored to the
/// common billing date.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Offer {
    OneTime(OneTimeOffer),
    Recurring(RecurringOffer),
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct OneTimeOffer {
    pub offer_id: String,
    pub display_name: String,
    pub price: MinorUnit,
    pub currency: Currency,
    pub active: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RecurringOffer {
    pub offer_id: String,
    pub display_name: String,
    pub price_per_period: MinorUnit,
    pub currency: Currency,
    pub active: bool,
}

impl Offer {
    pub fn offer_id(&self) -> &str {
        match self {
            Self::OneTime(offer) => &offer.offer_id,
            Self::Recurring(offer) => &offer.offer_id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::OneTime(offer) => &offer.display_name,
            Self::Recurring(offer) => &offer.display_name,
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Self::OneTime(offer) => offer.active,
            Self::Recurring(offer) => offer.active,
        }
    }

    /// Full (attempt 1) price of the offer.
    pub fn list_price(&self) -> MinorUnit {
        match self {
            Self::OneTime(offer) => offer.price,
            Self::Recurring(offer) => offer.price_per_period,
        }
    }

    pub fn currency(&self) -> Currency {
        match self {
            Self::OneTime(offer) => offer.currency,
            Self::Recurring(offer) => offer.currency,
        }
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self, Self::Recurring(_))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.list_price().is_positive() {
            return Err(ValidationError::InvalidValue {
                message: "offer price must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// How the reduced second-presentation price is derived from the list price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DownsellRule {
    PercentOff { percent: Percentage<2> },
    AmountOff { amount: MinorUnit },
}

impl Default for DownsellRule {
    fn default() -> Self {
        Self::PercentOff {
            percent: Percentage::from_float(DEFAULT_DOWNSELL_PERCENT).unwrap_or_default(),
        }
    }
}

impl DownsellRule {
    /// Price for the second presentation of a declined offer. Must come out
    /// strictly below the list price and still positive.
    pub fn reduced_price(&self, list_price: MinorUnit) -> CustomResult<MinorUnit, ValidationError> {
        let discount = match self {
            Self::PercentOff { percent } => percent
                .apply_and_ceil_result(list_price)
                .change_context(ValidationError::InvalidValue {
                    message: "downsell percentage could not be applied".to_string(),
                })?,
            Self::AmountOff { amount } => *amount,
        };
        let reduced = list_price.checked_sub(discount).ok_or_else(|| {
            report!(ValidationError::InvalidValue {
                message: "downsell discount overflows the list price".to_string(),
            })
        })?;
        if !reduced.is_positive() || reduced >= list_price {
            return Err(report!(ValidationError::InvalidValue {
                message: format!(
                    "downsell price {reduced} must stay positive and strictly below the list price {list_price}"
                ),
            }));
        }
        Ok(reduced)
    }
}

/// Both presentation prices of an offer, frozen when the session opens.
///
/// Catalog edits after this point can never change what the customer is
/// quoted; the downsell price is derived from the frozen list price, never
/// read back from the catalog.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct OfferSnapshot {
    pub offer_id: String,
    pub display_name: String,
    pub list_price: MinorUnit,
    pub downsell_price: MinorUnit,
    pub currency: Currency,
    pub recurring: bool,
}

impl OfferSnapshot {
    pub fn from_offer(offer: &Offer, downsell: &DownsellRule) -> CustomResult<Self, ValidationError> {
        offer.validate()?;
        let list_price = offer.list_price();
        let downsell_price = downsell.reduced_price(list_price)?;
        Ok(Self {
            offer_id: offer.offer_id().to_string(),
            display_name: offer.display_name().to_string(),
            list_price,
            downsell_price,
            currency: offer.currency(),
            recurring: offer.is_recurring(),
        })
    }

    pub fn price_for_attempt(&self, attempt: Attempt) -> MinorUnit {
        match attempt {
            Attempt::FullPrice => self.list_price,
            Attempt::Downsell => self.downsell_price,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn gift_wrap_offer(price: i64) -> Offer {
        Offer::OneTime(OneTimeOffer {
            offer_id: "ofr_gift_wrap".to_string(),
            display_name: "Premium gift wrap".to_string(),
            price: MinorUnit::new(price),
            currency: Currency::Usd,
            active: true,
        })
    }

    #[test]
    fn percent_downsell_is_strictly_lower() {
        let rule = DownsellRule::default();
        let snapshot = OfferSnapshot::from_offer(&gift_wrap_offer(999), &rule).unwrap();
        assert_eq!(snapshot.list_price, MinorUnit::new(999));
        assert_eq!(snapshot.downsell_price, MinorUnit::new(799));
        assert!(snapshot.downsell_price < snapshot.list_price);
    }

    #[test]
    fn amount_downsell_applies_fixed_discount() {
        let rule = DownsellRule::AmountOff {
            amount: MinorUnit::new(300),
        };
        let snapshot = OfferSnapshot::from_offer(&gift_wrap_offer(999), &rule).unwrap();
        assert_eq!(snapshot.downsell_price, MinorUnit::new(699));
    }

    #[test]
    fn downsell_must_not_consume_the_whole_price() {
        let rule = DownsellRule::AmountOff {
            amount: MinorUnit::new(999),
        };
        assert!(OfferSnapshot::from_offer(&gift_wrap_offer(999), &rule).is_err());
    }

    #[test]
    fn zero_percent_downsell_is_rejected() {
        let rule = DownsellRule::PercentOff {
            percent: Percentage::from_float(0.0).unwrap(),
        };
        assert!(OfferSnapshot::from_offer(&gift_wrap_offer(999), &rule).is_err());
    }

    #[test]
    fn inactive_or_free_offers_fail_validation() {
        assert!(gift_wrap_offer(0).validate().is_err());
        assert!(gift_wrap_offer(999).validate().is_ok());
    }

    #[test]
    fn snapshot_prices_follow_the_attempt() {
        let snapshot = OfferSnapshot::from_offer(&gift_wrap_offer(999), &DownsellRule::default())
            .unwrap();
        assert_eq!(
            snapshot.price_for_attempt(Attempt::FullPrice),
            MinorUnit::new(999)
        );
        assert_eq!(
            snapshot.price_for_attempt(Attempt::Downsell),
            MinorUnit::new(799)
        );
    }
}
