use common_enums::Currency;
use common_utils::types::MinorUnit;
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

/// Contact and payment handles of the customer behind an order.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CustomerContact {
    /// Customer handle at the payment processor.
    pub customer_ref: String,
    /// Stored payment method handle at the payment processor.
    pub payment_method_ref: String,
    /// Address recovery emails are sent to.
    pub email: String,
    pub name: Option<String>,
}

/// An accepted upsell on an order.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub offer_id: String,
    pub display_name: String,
    /// Unit price the customer accepted (list or downsell).
    pub unit_price: MinorUnit,
    pub quantity: u32,
    pub recurring: bool,
    /// Transaction reference for one-time charges.
    pub provider_txn_id: Option<String>,
    /// Schedule reference for recurring add-ons.
    pub schedule_ref: Option<String>,
}

/// The slice of an order the funnel reads and extends.
///
/// The storefront writes this record when checkout completes; the engine
/// only appends accepted upsells and keeps the running total.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_ref: String,
    pub customer: CustomerContact,
    pub currency: Currency,
    /// Total charged so far, including the base checkout amount.
    pub total: MinorUnit,
    pub upsell_items: Vec<OrderLineItem>,
    /// Recurring schedule shared by all recurring add-ons on this order.
    pub recurring_schedule_ref: Option<String>,
    pub placed_at: PrimitiveDateTime,
}

impl Order {
    /// Append an accepted upsell. `charged_amount` is what was actually
    /// charged now: the full line amount for one-time offers, zero for
    /// recurring add-ons that bill on the anchor date.
    pub fn add_line_item(&mut self, item: OrderLineItem, charged_amount: MinorUnit) {
        self.total = self.total + charged_amount;
        self.upsell_items.push(item);
    }
}
