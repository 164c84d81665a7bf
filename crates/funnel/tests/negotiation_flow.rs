#![allow(clippy::unwrap_used)]

use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use common_enums::{Currency, DeclineCode, NegotiationStep, RecoveryStatus};
use common_utils::{date_time, errors::CustomResult, types::MinorUnit};
use error_stack::report;
use funnel::{
    core::errors::FunnelApiError,
    types::{AcceptOfferRequest, NextOfferResponse},
    FunnelSettings, SessionState,
};
use keepsake_domain_models::{
    offers::{Offer, OneTimeOffer, RecurringOffer},
    orders::{CustomerContact, Order},
    recovery::PaymentReference,
};
use keepsake_interfaces::{
    api::PaymentExecutor,
    errors::{EmailDispatcherError, PaymentExecutorError},
    notifications::EmailDispatcher,
    types::{
        ChargeOutcome, ChargeRequest, EmailRequest, RecurringScheduleRequest, ScheduleOutcome,
        SendOutcome,
    },
};
use recovery::RecoverySettings;
use storage_impl::{
    DeclineRecordInterface, NegotiationSessionInterface, OfferCatalogInterface, OrderInterface,
    Store,
};
use time::Duration;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct MockPaymentExecutor {
    outcomes: Arc<Mutex<VecDeque<Result<ChargeOutcome, PaymentExecutorError>>>>,
    charges: Arc<Mutex<Vec<ChargeRequest>>>,
    schedules: Arc<Mutex<Vec<RecurringScheduleRequest>>>,
}

impl MockPaymentExecutor {
    async fn queue_declined(&self, code: DeclineCode) {
        self.outcomes
            .lock()
            .await
            .push_back(Ok(ChargeOutcome::Declined {
                code,
                message: Some("do not honor".to_string()),
            }));
    }

    async fn queue_transient(&self) {
        self.outcomes
            .lock()
            .await
            .push_back(Err(PaymentExecutorError::RequestTimeout));
    }

    async fn charge_count(&self) -> usize {
        self.charges.lock().await.len()
    }

    async fn last_charge(&self) -> Option<ChargeRequest> {
        self.charges.lock().await.last().cloned()
    }

    async fn last_schedule(&self) -> Option<RecurringScheduleRequest> {
        self.schedules.lock().await.last().cloned()
    }
}

#[async_trait]
impl PaymentExecutor for MockPaymentExecutor {
    async fn charge(
        &self,
        request: ChargeRequest,
    ) -> CustomResult<ChargeOutcome, PaymentExecutorError> {
        self.charges.lock().await.push(request);
        match self.outcomes.lock().await.pop_front() {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(err)) => Err(report!(err)),
            None => Ok(ChargeOutcome::Charged {
                provider_txn_id: "txn_default".to_string(),
            }),
        }
    }

    async fn create_or_update_schedule(
        &self,
        request: RecurringScheduleRequest,
    ) -> CustomResult<ScheduleOutcome, PaymentExecutorError> {
        self.schedules.lock().await.push(request);
        Ok(ScheduleOutcome {
            schedule_ref: "sch_1".to_string(),
        })
    }
}

#[derive(Clone, Default)]
struct NullEmailDispatcher;

#[async_trait]
impl EmailDispatcher for NullEmailDispatcher {
    async fn send(
        &self,
        _request: EmailRequest,
    ) -> CustomResult<SendOutcome, EmailDispatcherError> {
        Ok(SendOutcome {
            message_id: "msg_1".to_string(),
        })
    }
}

const ORDER_REF: &str = "ord_1001";

struct Harness {
    state: SessionState,
    store: Arc<Store>,
    executor: MockPaymentExecutor,
}

fn gift_wrap() -> Offer {
    Offer::OneTime(OneTimeOffer {
        offer_id: "ofr_wrap".to_string(),
        display_name: "Premium gift wrap".to_string(),
        price: MinorUnit::new(999),
        currency: Currency::Usd,
        active: true,
    })
}

fn gift_club() -> Offer {
    Offer::Recurring(RecurringOffer {
        offer_id: "ofr_club".to_string(),
        display_name: "Gift of the month club".to_string(),
        price_per_period: MinorUnit::new(1999),
        currency: Currency::Usd,
        active: true,
    })
}

async fn harness_with_offers(offers: Vec<Offer>) -> Harness {
    let settings = FunnelSettings::default();
    settings.validate().unwrap();

    let store = Arc::new(Store::in_memory());
    for offer in offers {
        store.upsert_offer(offer).await.unwrap();
    }
    store
        .insert_order(Order {
            order_ref: ORDER_REF.to_string(),
            customer: CustomerContact {
                customer_ref: "cus_1".to_string(),
                payment_method_ref: "pm_1".to_string(),
                email: "customer@example.com".to_string(),
                name: Some("Jordan".to_string()),
            },
            currency: Currency::Usd,
            total: MinorUnit::new(4999),
            upsell_items: Vec::new(),
            recurring_schedule_ref: None,
            placed_at: date_time::now(),
        })
        .await
        .unwrap();

    let executor = MockPaymentExecutor::default();
    let state = SessionState::new(
        store.clone(),
        Arc::new(executor.clone()),
        Arc::new(NullEmailDispatcher),
        settings,
        RecoverySettings::default(),
    );
    Harness {
        state,
        store,
        executor,
    }
}

async fn harness() -> Harness {
    harness_with_offers(vec![gift_wrap(), gift_club()]).await
}

fn presented(response: &NextOfferResponse) -> (&str, i64, u8) {
    let offer = response.offer.as_ref().unwrap();
    (
        offer.offer_id.as_str(),
        offer.price.get_amount_as_i64(),
        offer.attempt,
    )
}

#[tokio::test]
async fn declines_walk_through_downsells_and_complete() {
    let harness = harness().await;

    let first = funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();
    assert!(!first.complete);
    assert_eq!(presented(&first), ("ofr_wrap", 999, 1));
    assert_eq!(first.countdown_secs, Some(120));

    let step = funnel::decline_offer(&harness.state, ORDER_REF, "ofr_wrap")
        .await
        .unwrap();
    assert_eq!(step.step, NegotiationStep::Downsell);

    // same offer again, at the strictly lower frozen downsell price
    let downsell = funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();
    assert_eq!(presented(&downsell), ("ofr_wrap", 799, 2));

    let step = funnel::decline_offer(&harness.state, ORDER_REF, "ofr_wrap")
        .await
        .unwrap();
    assert_eq!(step.step, NegotiationStep::NextOffer);

    let club = funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();
    assert_eq!(presented(&club), ("ofr_club", 1999, 1));

    funnel::decline_offer(&harness.state, ORDER_REF, "ofr_club")
        .await
        .unwrap();
    funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();
    let last = funnel::decline_offer(&harness.state, ORDER_REF, "ofr_club")
        .await
        .unwrap();
    assert_eq!(last.step, NegotiationStep::Complete);

    let done = funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();
    assert!(done.complete);
    assert!(done.offer.is_none());
}

#[tokio::test]
async fn unknown_token_is_rejected() {
    let harness = harness().await;
    let result = funnel::get_next_offer(&harness.state, "ord_unknown").await;
    assert!(matches!(
        result.unwrap_err().current_context(),
        FunnelApiError::OrderNotFound
    ));
}

#[tokio::test]
async fn accepting_a_not_current_offer_mutates_nothing() {
    let harness = harness().await;
    funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();

    let result = funnel::accept_offer(
        &harness.state,
        ORDER_REF,
        AcceptOfferRequest {
            offer_id: "ofr_club".to_string(),
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(
        result.unwrap_err().current_context(),
        FunnelApiError::OfferNotCurrent
    ));
    assert_eq!(harness.executor.charge_count().await, 0);

    // position unchanged
    let current = funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();
    assert_eq!(presented(&current), ("ofr_wrap", 999, 1));
}

#[tokio::test]
async fn zero_quantity_is_rejected() {
    let harness = harness().await;
    funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();

    let result = funnel::accept_offer(
        &harness.state,
        ORDER_REF,
        AcceptOfferRequest {
            offer_id: "ofr_wrap".to_string(),
            quantity: 0,
        },
    )
    .await;
    assert!(matches!(
        result.unwrap_err().current_context(),
        FunnelApiError::InvalidQuantity
    ));
}

#[tokio::test]
async fn accepting_a_one_time_offer_charges_and_extends_the_order() {
    let harness = harness().await;
    funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();

    let response = funnel::accept_offer(
        &harness.state,
        ORDER_REF,
        AcceptOfferRequest {
            offer_id: "ofr_wrap".to_string(),
            quantity: 2,
        },
    )
    .await
    .unwrap();

    assert_eq!(response.charged_amount, MinorUnit::new(1998));
    assert_eq!(response.order_total, MinorUnit::new(6997));
    assert!(response.provider_txn_id.is_some());
    assert_eq!(response.schedule_ref, None);

    let charge = harness.executor.last_charge().await.unwrap();
    assert_eq!(charge.amount, MinorUnit::new(1998));
    assert_eq!(charge.idempotency_key, "ord_1001_ofr_wrap_attempt_1");

    let order = harness.store.find_order(ORDER_REF).await.unwrap();
    assert_eq!(order.total, MinorUnit::new(6997));
    assert_eq!(order.upsell_items.len(), 1);

    // the session moved on to the next offer at full price
    let next = funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();
    assert_eq!(presented(&next), ("ofr_club", 1999, 1));
}

#[tokio::test]
async fn accepting_a_recurring_offer_charges_zero_and_anchors_billing() {
    let harness = harness_with_offers(vec![gift_club()]).await;
    funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();

    let before = date_time::now();
    let response = funnel::accept_offer(
        &harness.state,
        ORDER_REF,
        AcceptOfferRequest {
            offer_id: "ofr_club".to_string(),
            quantity: 1,
        },
    )
    .await
    .unwrap();

    assert_eq!(response.charged_amount, MinorUnit::zero());
    assert_eq!(response.provider_txn_id, None);
    assert_eq!(response.schedule_ref.as_deref(), Some("sch_1"));
    // the order total is untouched until the anchor date
    assert_eq!(response.order_total, MinorUnit::new(4999));

    let schedule = harness.executor.last_schedule().await.unwrap();
    assert_eq!(schedule.first_charge_amount, MinorUnit::zero());
    assert_eq!(schedule.price_each, MinorUnit::new(1999));
    assert_eq!(schedule.quantity, 1);

    // fixed calendar anchor: day one at midnight, strictly in the future,
    // never "now + interval"
    let anchor = response.next_billing_at.unwrap();
    assert_eq!(schedule.next_billing_at, anchor);
    assert_eq!(anchor.day(), 1);
    assert_eq!(anchor.time(), time::Time::MIDNIGHT);
    assert!(anchor > before);

    let order = harness.store.find_order(ORDER_REF).await.unwrap();
    assert_eq!(order.recurring_schedule_ref.as_deref(), Some("sch_1"));
}

#[tokio::test]
async fn hard_decline_downsells_and_feeds_the_retry_pipeline() {
    let harness = harness().await;
    funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();
    harness
        .executor
        .queue_declined(DeclineCode::InsufficientFunds)
        .await;

    let result = funnel::accept_offer(
        &harness.state,
        ORDER_REF,
        AcceptOfferRequest {
            offer_id: "ofr_wrap".to_string(),
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(
        result.unwrap_err().current_context(),
        FunnelApiError::PaymentDeclined {
            code: DeclineCode::InsufficientFunds
        }
    ));

    // the decline entered the retry pipeline
    let record = harness
        .store
        .find_active_decline_by_payment_ref(&PaymentReference::Order(ORDER_REF.to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.amount, MinorUnit::new(999));
    assert_eq!(record.decline_code, DeclineCode::InsufficientFunds);

    // the funnel keeps going: same offer at the downsell price
    let downsell = funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();
    assert_eq!(presented(&downsell), ("ofr_wrap", 799, 2));

    // accepting the downsell resolves the superseded decline record
    let response = funnel::accept_offer(
        &harness.state,
        ORDER_REF,
        AcceptOfferRequest {
            offer_id: "ofr_wrap".to_string(),
            quantity: 1,
        },
    )
    .await
    .unwrap();
    assert_eq!(response.charged_amount, MinorUnit::new(799));
    let charge = harness.executor.last_charge().await.unwrap();
    assert_eq!(charge.idempotency_key, "ord_1001_ofr_wrap_attempt_2");

    let resolved = harness
        .store
        .find_decline_record(&record.decline_id)
        .await
        .unwrap();
    assert_eq!(resolved.status, RecoveryStatus::Resolved);
    assert_eq!(resolved.converted_order_id.as_deref(), Some(ORDER_REF));
}

#[tokio::test]
async fn transient_processor_failure_leaves_the_position_unchanged() {
    let harness = harness().await;
    funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();
    harness.executor.queue_transient().await;

    let result = funnel::accept_offer(
        &harness.state,
        ORDER_REF,
        AcceptOfferRequest {
            offer_id: "ofr_wrap".to_string(),
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(
        result.unwrap_err().current_context(),
        FunnelApiError::PaymentProcessorUnavailable
    ));

    // the same call is safely retryable: still offer A, attempt 1
    let current = funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();
    assert_eq!(presented(&current), ("ofr_wrap", 999, 1));

    let response = funnel::accept_offer(
        &harness.state,
        ORDER_REF,
        AcceptOfferRequest {
            offer_id: "ofr_wrap".to_string(),
            quantity: 1,
        },
    )
    .await
    .unwrap();
    assert_eq!(response.charged_amount, MinorUnit::new(999));
}

#[tokio::test]
async fn elapsed_countdown_counts_as_an_implicit_decline() {
    let harness = harness().await;
    funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();

    // age the presentation past the 120s countdown
    let mut session = harness.store.find_session(ORDER_REF).await.unwrap().unwrap();
    session.presented_at = Some(date_time::now() - Duration::minutes(10));
    harness.store.update_session(session).await.unwrap();

    let response = funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();
    assert_eq!(presented(&response), ("ofr_wrap", 799, 2));
}

#[tokio::test]
async fn elapsed_safety_timeout_forces_completion() {
    let harness = harness().await;
    funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();

    let mut session = harness.store.find_session(ORDER_REF).await.unwrap().unwrap();
    session.created_at = date_time::now() - Duration::hours(1);
    harness.store.update_session(session).await.unwrap();

    let response = funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();
    assert!(response.complete);

    let result = funnel::accept_offer(
        &harness.state,
        ORDER_REF,
        AcceptOfferRequest {
            offer_id: "ofr_wrap".to_string(),
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(
        result.unwrap_err().current_context(),
        FunnelApiError::OfferNotCurrent
    ));
}

#[tokio::test]
async fn expiry_sweep_completes_orphaned_sessions() {
    let harness = harness().await;
    funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();

    let mut session = harness.store.find_session(ORDER_REF).await.unwrap().unwrap();
    session.created_at = date_time::now() - Duration::hours(1);
    harness.store.update_session(session).await.unwrap();

    let summary = funnel::expire_stale_sessions(&harness.state).await.unwrap();
    assert_eq!(summary.expired, 1);

    let session = harness.store.find_session(ORDER_REF).await.unwrap().unwrap();
    assert!(session.is_terminal());

    // already-expired sessions are not expired twice
    let rerun = funnel::expire_stale_sessions(&harness.state).await.unwrap();
    assert_eq!(rerun.expired, 0);
}

#[tokio::test]
async fn duplicate_decline_calls_do_not_double_advance() {
    let harness = harness().await;
    funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();

    let first = funnel::decline_offer(&harness.state, ORDER_REF, "ofr_wrap")
        .await
        .unwrap();
    assert_eq!(first.step, NegotiationStep::Downsell);

    // replayed decline before the downsell was served: same answer, no move
    let replay = funnel::decline_offer(&harness.state, ORDER_REF, "ofr_wrap")
        .await
        .unwrap();
    assert_eq!(replay.step, NegotiationStep::Downsell);

    let current = funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();
    assert_eq!(presented(&current), ("ofr_wrap", 799, 2));

    // declining an offer that is not in the session at all is a validation
    // error, not a transition
    let unknown = funnel::decline_offer(&harness.state, ORDER_REF, "ofr_missing").await;
    assert!(matches!(
        unknown.unwrap_err().current_context(),
        FunnelApiError::OfferNotCurrent
    ));
}

#[tokio::test]
async fn catalog_edits_never_change_a_running_session() {
    let harness = harness().await;
    funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();

    // admin doubles the price mid-session
    let repriced = Offer::OneTime(OneTimeOffer {
        offer_id: "ofr_wrap".to_string(),
        display_name: "Premium gift wrap".to_string(),
        price: MinorUnit::new(1999),
        currency: Currency::Usd,
        active: true,
    });
    funnel::upsert_offer(&harness.state, repriced).await.unwrap();

    let current = funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();
    assert_eq!(presented(&current), ("ofr_wrap", 999, 1));

    funnel::decline_offer(&harness.state, ORDER_REF, "ofr_wrap")
        .await
        .unwrap();
    let downsell = funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();
    // downsell derives from the frozen list price, not the live catalog
    assert_eq!(presented(&downsell), ("ofr_wrap", 799, 2));
}

#[tokio::test]
async fn inactive_offers_are_not_presented() {
    let mut wrap = gift_wrap();
    if let Offer::OneTime(ref mut offer) = wrap {
        offer.active = false;
    }
    let harness = harness_with_offers(vec![wrap, gift_club()]).await;

    let response = funnel::get_next_offer(&harness.state, ORDER_REF).await.unwrap();
    assert_eq!(presented(&response), ("ofr_club", 1999, 1));
}
