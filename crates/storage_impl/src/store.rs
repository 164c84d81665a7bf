use common_enums::RecoveryStatus;
use common_utils::{
    errors::CustomResult,
    ext_traits::{Encode, StringExt},
};
use error_stack::{report, ResultExt};
use keepsake_domain_models::{
    activity::ActivityLogEntry,
    negotiation::NegotiationSession,
    offers::Offer,
    orders::Order,
    recovery::{DeclineRecord, PaymentReference},
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{errors::StorageError, kv::KeyValueStore, memory::InMemoryStore};

/// Typed storage facade over the key-value document store.
pub struct Store {
    kv: Box<dyn KeyValueStore>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    pub fn new(kv: Box<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// A store over the in-memory backend.
    pub fn in_memory() -> Self {
        Self::new(Box::new(InMemoryStore::new()))
    }

    fn offer_key(offer_id: &str) -> String {
        format!("offer_{offer_id}")
    }

    fn order_key(order_ref: &str) -> String {
        format!("order_{order_ref}")
    }

    fn session_key(session_token: &str) -> String {
        format!("session_{session_token}")
    }

    fn decline_key(decline_id: &str) -> String {
        format!("decline_{decline_id}")
    }

    fn activity_key(parent_ref: &str, entry_id: &str) -> String {
        format!("activity_{parent_ref}_{entry_id}")
    }

    async fn find_json<T>(
        &self,
        key: &str,
        type_name: &'static str,
    ) -> CustomResult<Option<T>, StorageError>
    where
        T: DeserializeOwned,
    {
        match self.kv.get_key(key).await? {
            Some(raw) => raw
                .parse_struct(type_name)
                .change_context(StorageError::DeserializationFailed)
                .map(Some),
            None => Ok(None),
        }
    }

    async fn put_json<T>(&self, key: &str, value: &T) -> CustomResult<(), StorageError>
    where
        T: Serialize,
    {
        let raw = value
            .encode_to_string_of_json()
            .change_context(StorageError::SerializationFailed)?;
        self.kv.set_key(key, raw).await
    }

    async fn insert_json<T>(&self, key: &str, value: &T) -> CustomResult<(), StorageError>
    where
        T: Serialize,
    {
        if self.kv.get_key(key).await?.is_some() {
            return Err(report!(StorageError::DuplicateValue(key.to_string())));
        }
        self.put_json(key, value).await
    }

    async fn list_json<T>(
        &self,
        prefix: &str,
        type_name: &'static str,
    ) -> CustomResult<Vec<T>, StorageError>
    where
        T: DeserializeOwned,
    {
        self.kv
            .list_values_with_prefix(prefix)
            .await?
            .iter()
            .map(|raw| {
                raw.parse_struct(type_name)
                    .change_context(StorageError::DeserializationFailed)
            })
            .collect()
    }
}

/// Admin-mutable offer catalog.
#[async_trait::async_trait]
pub trait OfferCatalogInterface {
    async fn upsert_offer(&self, offer: Offer) -> CustomResult<(), StorageError>;

    async fn find_offer(&self, offer_id: &str) -> CustomResult<Offer, StorageError>;

    async fn list_offers(&self) -> CustomResult<Vec<Offer>, StorageError>;
}

#[async_trait::async_trait]
impl OfferCatalogInterface for Store {
    async fn upsert_offer(&self, offer: Offer) -> CustomResult<(), StorageError> {
        self.put_json(&Self::offer_key(offer.offer_id()), &offer)
            .await
    }

    async fn find_offer(&self, offer_id: &str) -> CustomResult<Offer, StorageError> {
        self.find_json(&Self::offer_key(offer_id), "Offer")
            .await?
            .ok_or_else(|| report!(StorageError::ValueNotFound(Self::offer_key(offer_id))))
    }

    async fn list_offers(&self) -> CustomResult<Vec<Offer>, StorageError> {
        self.list_json("offer_", "Offer").await
    }
}

/// Orders written at checkout and extended by the funnel.
#[async_trait::async_trait]
pub trait OrderInterface {
    async fn insert_order(&self, order: Order) -> CustomResult<(), StorageError>;

    async fn find_order(&self, order_ref: &str) -> CustomResult<Order, StorageError>;

    async fn update_order(&self, order: Order) -> CustomResult<(), StorageError>;
}

#[async_trait::async_trait]
impl OrderInterface for Store {
    async fn insert_order(&self, order: Order) -> CustomResult<(), StorageError> {
        self.insert_json(&Self::order_key(&order.order_ref), &order)
            .await
    }

    async fn find_order(&self, order_ref: &str) -> CustomResult<Order, StorageError> {
        self.find_json(&Self::order_key(order_ref), "Order")
            .await?
            .ok_or_else(|| report!(StorageError::ValueNotFound(Self::order_key(order_ref))))
    }

    async fn update_order(&self, order: Order) -> CustomResult<(), StorageError> {
        self.put_json(&Self::order_key(&order.order_ref), &order)
            .await
    }
}

/// Negotiation sessions, one per order token.
#[async_trait::async_trait]
pub trait NegotiationSessionInterface {
    async fn insert_session(&self, session: NegotiationSession) -> CustomResult<(), StorageError>;

    async fn find_session(
        &self,
        session_token: &str,
    ) -> CustomResult<Option<NegotiationSession>, StorageError>;

    async fn update_session(&self, session: NegotiationSession) -> CustomResult<(), StorageError>;

    async fn list_sessions(&self) -> CustomResult<Vec<NegotiationSession>, StorageError>;
}

#[async_trait::async_trait]
impl NegotiationSessionInterface for Store {
    async fn insert_session(&self, session: NegotiationSession) -> CustomResult<(), StorageError> {
        self.insert_json(&Self::session_key(&session.session_token), &session)
            .await
    }

    async fn find_session(
        &self,
        session_token: &str,
    ) -> CustomResult<Option<NegotiationSession>, StorageError> {
        self.find_json(&Self::session_key(session_token), "NegotiationSession")
            .await
    }

    async fn update_session(&self, session: NegotiationSession) -> CustomResult<(), StorageError> {
        self.put_json(&Self::session_key(&session.session_token), &session)
            .await
    }

    async fn list_sessions(&self) -> CustomResult<Vec<NegotiationSession>, StorageError> {
        self.list_json("session_", "NegotiationSession").await
    }
}

/// Decline records of the recovery pipeline.
#[async_trait::async_trait]
pub trait DeclineRecordInterface {
    async fn insert_decline_record(&self, record: DeclineRecord)
        -> CustomResult<(), StorageError>;

    async fn find_decline_record(
        &self,
        decline_id: &str,
    ) -> CustomResult<DeclineRecord, StorageError>;

    async fn update_decline_record(&self, record: DeclineRecord)
        -> CustomResult<(), StorageError>;

    /// The single Active record for a payment reference, if any.
    async fn find_active_decline_by_payment_ref(
        &self,
        payment_ref: &PaymentReference,
    ) -> CustomResult<Option<DeclineRecord>, StorageError>;

    async fn list_decline_records(&self) -> CustomResult<Vec<DeclineRecord>, StorageError>;
}

#[async_trait::async_trait]
impl DeclineRecordInterface for Store {
    async fn insert_decline_record(
        &self,
        record: DeclineRecord,
    ) -> CustomResult<(), StorageError> {
        self.insert_json(&Self::decline_key(&record.decline_id), &record)
            .await
    }

    async fn find_decline_record(
        &self,
        decline_id: &str,
    ) -> CustomResult<DeclineRecord, StorageError> {
        self.find_json(&Self::decline_key(decline_id), "DeclineRecord")
            .await?
            .ok_or_else(|| report!(StorageError::ValueNotFound(Self::decline_key(decline_id))))
    }

    async fn update_decline_record(
        &self,
        record: DeclineRecord,
    ) -> CustomResult<(), StorageError> {
        self.put_json(&Self::decline_key(&record.decline_id), &record)
            .await
    }

    async fn find_active_decline_by_payment_ref(
        &self,
        payment_ref: &PaymentReference,
    ) -> CustomResult<Option<DeclineRecord>, StorageError> {
        let records = self.list_decline_records().await?;
        Ok(records.into_iter().find(|record| {
            record.status == RecoveryStatus::Active && record.payment_ref == *payment_ref
        }))
    }

    async fn list_decline_records(&self) -> CustomResult<Vec<DeclineRecord>, StorageError> {
        self.list_json("decline_", "DeclineRecord").await
    }
}

/// Append-only activity trail.
#[async_trait::async_trait]
pub trait ActivityLogInterface {
    async fn append_activity(&self, entry: ActivityLogEntry) -> CustomResult<(), StorageError>;

    /// All entries for the given order/decline, oldest first.
    async fn list_activity(
        &self,
        parent_ref: &str,
    ) -> CustomResult<Vec<ActivityLogEntry>, StorageError>;
}

#[async_trait::async_trait]
impl ActivityLogInterface for Store {
    async fn append_activity(&self, entry: ActivityLogEntry) -> CustomResult<(), StorageError> {
        self.insert_json(
            &Self::activity_key(&entry.parent_ref, &entry.entry_id),
            &entry,
        )
        .await
    }

    async fn list_activity(
        &self,
        parent_ref: &str,
    ) -> CustomResult<Vec<ActivityLogEntry>, StorageError> {
        let mut entries: Vec<ActivityLogEntry> = self
            .list_json(&format!("activity_{parent_ref}_"), "ActivityLogEntry")
            .await?;
        entries.sort_by(|a, b| a.at.cmp(&b.at).then_with(|| a.entry_id.cmp(&b.entry_id)));
        Ok(entries)
    }
}

/// Everything the engine needs from storage, as one object-safe bound.
pub trait StorageInterface:
    OfferCatalogInterface
    + OrderInterface
    + NegotiationSessionInterface
    + DeclineRecordInterface
    + ActivityLogInterface
    + Send
    + Sync
{
}

impl StorageInterface for Store {}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use common_enums::{ActivityAction, Currency, DeclineCode};
    use common_utils::types::MinorUnit;
    use keepsake_domain_models::{
        offers::{DownsellRule, OfferSnapshot, OneTimeOffer},
        orders::CustomerContact,
        recovery::RetrySchedule,
    };
    use time::macros::datetime;

    use super::*;

    fn sample_offer(offer_id: &str) -> Offer {
        Offer::OneTime(OneTimeOffer {
            offer_id: offer_id.to_string(),
            display_name: "Premium gift wrap".to_string(),
            price: MinorUnit::new(999),
            currency: Currency::Usd,
            active: true,
        })
    }

    #[tokio::test]
    async fn offers_roundtrip_and_list() {
        let store = Store::in_memory();
        store.upsert_offer(sample_offer("ofr_a")).await.unwrap();
        store.upsert_offer(sample_offer("ofr_b")).await.unwrap();

        let found = store.find_offer("ofr_a").await.unwrap();
        assert_eq!(found.offer_id(), "ofr_a");
        assert_eq!(store.list_offers().await.unwrap().len(), 2);
        assert!(store.find_offer("ofr_missing").await.is_err());
    }

    #[tokio::test]
    async fn sessions_roundtrip() {
        let store = Store::in_memory();
        let snapshot =
            OfferSnapshot::from_offer(&sample_offer("ofr_a"), &DownsellRule::default()).unwrap();
        let session = NegotiationSession::open(
            "tok_1",
            "ord_1",
            vec![snapshot],
            datetime!(2025-03-01 12:00:00),
        );

        store.insert_session(session.clone()).await.unwrap();
        assert!(store.insert_session(session.clone()).await.is_err());

        let mut loaded = store.find_session("tok_1").await.unwrap().unwrap();
        loaded.advance_on_decline();
        store.update_session(loaded.clone()).await.unwrap();

        let reloaded = store.find_session("tok_1").await.unwrap().unwrap();
        assert_eq!(reloaded.attempt, loaded.attempt);
        assert_eq!(store.list_sessions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn active_decline_lookup_is_scoped_to_payment_ref() {
        let store = Store::in_memory();
        let now = datetime!(2025-03-01 12:00:00);
        let schedule = RetrySchedule::from_hours(&[24]);
        let customer = CustomerContact {
            customer_ref: "cus_1".to_string(),
            payment_method_ref: "pm_1".to_string(),
            email: "customer@example.com".to_string(),
            name: None,
        };
        let record = DeclineRecord::open(
            "dec_1".to_string(),
            PaymentReference::Order("ord_1".to_string()),
            MinorUnit::new(999),
            Currency::Usd,
            DeclineCode::CardDeclined,
            customer,
            &schedule,
            now,
        );
        store.insert_decline_record(record).await.unwrap();

        let hit = store
            .find_active_decline_by_payment_ref(&PaymentReference::Order("ord_1".to_string()))
            .await
            .unwrap();
        assert!(hit.is_some());

        let miss = store
            .find_active_decline_by_payment_ref(&PaymentReference::Order("ord_2".to_string()))
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn activity_lists_oldest_first() {
        let store = Store::in_memory();
        let later = ActivityLogEntry::new(
            "ord_1",
            ActivityAction::OfferDeclined,
            "declined",
            datetime!(2025-03-01 12:05:00),
        );
        let earlier = ActivityLogEntry::new(
            "ord_1",
            ActivityAction::SessionOpened,
            "opened",
            datetime!(2025-03-01 12:00:00),
        );
        store.append_activity(later).await.unwrap();
        store.append_activity(earlier).await.unwrap();

        let entries = store.list_activity("ord_1").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, ActivityAction::SessionOpened);
        assert_eq!(entries[1].action, ActivityAction::OfferDeclined);

        assert!(store.list_activity("ord_other").await.unwrap().is_empty());
    }
}
