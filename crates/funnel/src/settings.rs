use common_utils::errors::ValidationError;
use keepsake_domain_models::offers::DownsellRule;
use serde::Deserialize;
use time::{Date, Duration, Month, PrimitiveDateTime, Time};

/// Configuration of the offer negotiation funnel. Timer values are config,
/// not constants, so tests and storefront variants can shorten them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FunnelSettings {
    /// Seconds the customer has to act on one presentation before it counts
    /// as an implicit decline.
    pub presentation_countdown_secs: u64,
    /// Seconds after which the whole session is forced complete regardless
    /// of position.
    pub session_safety_timeout_secs: u64,
    /// How the downsell price is derived from the frozen list price.
    pub downsell: DownsellRule,
    /// Day of month (1..=28) all recurring add-ons bill on.
    pub billing_anchor_day: u8,
}

impl Default for FunnelSettings {
    fn default() -> Self {
        Self {
            presentation_countdown_secs: 120,
            session_safety_timeout_secs: 180,
            downsell: DownsellRule::default(),
            billing_anchor_day: 1,
        }
    }
}

impl FunnelSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.presentation_countdown_secs == 0 {
            return Err(ValidationError::InvalidValue {
                message: "presentation countdown must be positive".to_string(),
            });
        }
        if self.session_safety_timeout_secs < self.presentation_countdown_secs {
            return Err(ValidationError::InvalidValue {
                message: "session safety timeout must be at least the presentation countdown"
                    .to_string(),
            });
        }
        if !(1..=28).contains(&self.billing_anchor_day) {
            return Err(ValidationError::IncorrectValueProvided {
                field_name: "billing_anchor_day",
            });
        }
        Ok(())
    }

    pub fn presentation_countdown(&self) -> Duration {
        Duration::seconds(i64::try_from(self.presentation_countdown_secs).unwrap_or(i64::MAX))
    }

    pub fn session_safety_timeout(&self) -> Duration {
        Duration::seconds(i64::try_from(self.session_safety_timeout_secs).unwrap_or(i64::MAX))
    }

    /// The common calendar date recurring funnel add-ons bill on: the next
    /// occurrence of the configured anchor day at midnight UTC, strictly
    /// after `now`. Deliberately not `now + interval`, so every add-on of a
    /// billing period lands on the same date.
    pub fn next_billing_anchor(
        &self,
        now: PrimitiveDateTime,
    ) -> Result<PrimitiveDateTime, ValidationError> {
        let day = self.billing_anchor_day;
        let date = now.date();
        let this_month = Date::from_calendar_date(date.year(), date.month(), day).map_err(|_| {
            ValidationError::InvalidValue {
                message: format!("invalid billing anchor day: {day}"),
            }
        })?;
        let anchor = if this_month > date {
            this_month
        } else {
            let (next_year, next_month) = match date.month() {
                Month::December => (date.year() + 1, Month::January),
                month => (date.year(), month.next()),
            };
            Date::from_calendar_date(next_year, next_month, day).map_err(|_| {
                ValidationError::InvalidValue {
                    message: format!("invalid billing anchor day: {day}"),
                }
            })?
        };
        Ok(PrimitiveDateTime::new(anchor, Time::MIDNIGHT))
    }
}
