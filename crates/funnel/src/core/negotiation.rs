//! The offer negotiation state machine.
//!
//! All position and terminality decisions are made here against the stored
//! session; the client only proposes actions. Expiry is modeled as explicit
//! edges: an elapsed presentation countdown is an implicit decline, an
//! elapsed safety timeout forces the session complete.

use common_enums::{ActivityAction, DeclineCode, NegotiationStep};
use common_utils::{date_time, types::MinorUnit};
use error_stack::{report, Report, ResultExt};
use funnel_env::logger;
use keepsake_domain_models::{
    activity::ActivityLogEntry,
    negotiation::{Attempt, NegotiationSession},
    offers::OfferSnapshot,
    orders::{Order, OrderLineItem},
    recovery::PaymentReference,
};
use keepsake_interfaces::types::{ChargeOutcome, ChargeRequest, RecurringScheduleRequest};
use recovery::types::RecordDeclineRequest;
use storage_impl::StorageError;
use time::PrimitiveDateTime;

use crate::{
    core::{errors, FunnelResult},
    state::SessionState,
    types::{
        AcceptOfferRequest, AcceptOfferResponse, DeclineOfferResponse, ExpireSessionsSummary,
        NextOfferResponse, PresentedOffer,
    },
};

/// Serve the presentation at the session's current position, or the
/// "no more offers" sentinel.
///
/// The session is created from the stored order record on first call; an
/// unknown token is rejected. Expiry edges are applied before serving, but
/// position otherwise only advances on accept/decline.
pub async fn get_next_offer(
    state: &SessionState,
    session_token: &str,
) -> FunnelResult<NextOfferResponse> {
    let now = date_time::now();
    let mut session = match state
        .store
        .find_session(session_token)
        .await
        .change_context(errors::FunnelApiError::InternalServerError)?
    {
        Some(session) => session,
        None => open_session(state, session_token, now).await?,
    };

    if session.is_terminal() {
        return Ok(NextOfferResponse::completed());
    }

    if session.safety_expired(now, state.settings.session_safety_timeout()) {
        force_complete_session(state, &mut session, now, "session safety timeout elapsed").await?;
        return Ok(NextOfferResponse::completed());
    }

    if session.countdown_expired(now, state.settings.presentation_countdown()) {
        let step = session.advance_on_decline();
        append_activity_quiet(
            state,
            ActivityLogEntry::new(
                session.order_ref.clone(),
                ActivityAction::OfferExpired,
                format!("presentation countdown elapsed, next step: {step}"),
                now,
            ),
        )
        .await;
        state
            .store
            .update_session(session.clone())
            .await
            .change_context(errors::FunnelApiError::InternalServerError)?;
        if session.is_terminal() {
            return Ok(NextOfferResponse::completed());
        }
    }

    let Some(snapshot) = session.current_offer().cloned() else {
        session.force_complete();
        state
            .store
            .update_session(session)
            .await
            .change_context(errors::FunnelApiError::InternalServerError)?;
        return Ok(NextOfferResponse::completed());
    };

    if session.presented_at.is_none() {
        session.mark_presented(now);
        state
            .store
            .update_session(session.clone())
            .await
            .change_context(errors::FunnelApiError::InternalServerError)?;
    }

    Ok(NextOfferResponse {
        complete: false,
        offer: Some(PresentedOffer::from_snapshot(&snapshot, session.attempt)),
        countdown_secs: Some(state.settings.presentation_countdown_secs),
    })
}

/// Accept the currently presented offer.
///
/// One-time offers charge `price(attempt) x quantity` immediately. Recurring
/// offers charge nothing now: they create (or extend) the order's billing
/// schedule with a zero first charge and the common anchor billing date.
pub async fn accept_offer(
    state: &SessionState,
    session_token: &str,
    request: AcceptOfferRequest,
) -> FunnelResult<AcceptOfferResponse> {
    if request.quantity == 0 {
        return Err(report!(errors::FunnelApiError::InvalidQuantity));
    }
    let now = date_time::now();
    let mut session = require_session(state, session_token).await?;

    if session.is_terminal() {
        return Err(report!(errors::FunnelApiError::OfferNotCurrent));
    }
    if session.safety_expired(now, state.settings.session_safety_timeout()) {
        force_complete_session(state, &mut session, now, "session safety timeout elapsed").await?;
        return Err(report!(errors::FunnelApiError::OfferNotCurrent));
    }

    let Some(snapshot) = session.current_offer().cloned() else {
        return Err(report!(errors::FunnelApiError::OfferNotCurrent));
    };
    if snapshot.offer_id != request.offer_id || session.presented_at.is_none() {
        // not the presentation currently served: reject without mutating
        return Err(report!(errors::FunnelApiError::OfferNotCurrent));
    }

    let mut order = find_order(state, &session.order_ref).await?;
    let unit_price = snapshot.price_for_attempt(session.attempt);
    let attempt_number = session.attempt.as_number();
    let idempotency_key = format!(
        "{}_{}_attempt_{attempt_number}",
        order.order_ref, snapshot.offer_id
    );

    if snapshot.recurring {
        let anchor = state
            .settings
            .next_billing_anchor(now)
            .map_err(Report::new)
            .change_context(errors::FunnelApiError::InternalServerError)?;
        let schedule_request = RecurringScheduleRequest {
            customer_ref: order.customer.customer_ref.clone(),
            payment_method_ref: order.customer.payment_method_ref.clone(),
            schedule_ref: order.recurring_schedule_ref.clone(),
            price_each: unit_price,
            quantity: request.quantity,
            currency: snapshot.currency,
            first_charge_amount: MinorUnit::zero(),
            next_billing_at: anchor,
            idempotency_key,
        };

        match state
            .payment_executor
            .create_or_update_schedule(schedule_request)
            .await
        {
            Ok(outcome) => {
                order.recurring_schedule_ref = Some(outcome.schedule_ref.clone());
                order.add_line_item(
                    OrderLineItem {
                        offer_id: snapshot.offer_id.clone(),
                        display_name: snapshot.display_name.clone(),
                        unit_price,
                        quantity: request.quantity,
                        recurring: true,
                        provider_txn_id: None,
                        schedule_ref: Some(outcome.schedule_ref.clone()),
                    },
                    MinorUnit::zero(),
                );
                state
                    .store
                    .update_order(order.clone())
                    .await
                    .change_context(errors::FunnelApiError::InternalServerError)?;
                append_activity_quiet(
                    state,
                    ActivityLogEntry::new(
                        order.order_ref.clone(),
                        ActivityAction::ScheduleCreated,
                        format!(
                            "recurring add-on {} x{} at {} per period, first billing at {anchor}",
                            snapshot.offer_id, request.quantity, unit_price
                        ),
                        now,
                    ),
                )
                .await;
                resolve_converted_decline(state, &order, now).await;
                advance_after_accept(state, &mut session, now).await?;
                logger::info!(
                    order_ref = %order.order_ref,
                    offer_id = %snapshot.offer_id,
                    schedule_ref = %outcome.schedule_ref,
                    "recurring offer accepted"
                );

                Ok(AcceptOfferResponse {
                    order_ref: order.order_ref,
                    order_total: order.total,
                    charged_amount: MinorUnit::zero(),
                    provider_txn_id: None,
                    schedule_ref: Some(outcome.schedule_ref),
                    next_billing_at: Some(anchor),
                })
            }
            Err(err) => {
                logger::error!(
                    ?err,
                    order_ref = %order.order_ref,
                    "transient processor failure creating schedule, session position unchanged"
                );
                Err(err.change_context(errors::FunnelApiError::PaymentProcessorUnavailable))
            }
        }
    } else {
        let total_amount = unit_price
            .checked_mul(i64::from(request.quantity))
            .ok_or_else(|| report!(errors::FunnelApiError::InvalidQuantity))?;
        let charge_request = ChargeRequest {
            customer_ref: order.customer.customer_ref.clone(),
            payment_method_ref: order.customer.payment_method_ref.clone(),
            amount: total_amount,
            currency: snapshot.currency,
            idempotency_key,
        };

        match state.payment_executor.charge(charge_request).await {
            Ok(ChargeOutcome::Charged { provider_txn_id }) => {
                order.add_line_item(
                    OrderLineItem {
                        offer_id: snapshot.offer_id.clone(),
                        display_name: snapshot.display_name.clone(),
                        unit_price,
                        quantity: request.quantity,
                        recurring: false,
                        provider_txn_id: Some(provider_txn_id.clone()),
                        schedule_ref: None,
                    },
                    total_amount,
                );
                state
                    .store
                    .update_order(order.clone())
                    .await
                    .change_context(errors::FunnelApiError::InternalServerError)?;
                append_activity_quiet(
                    state,
                    ActivityLogEntry::new(
                        order.order_ref.clone(),
                        ActivityAction::OfferAccepted,
                        format!(
                            "accepted {} x{} at {} (attempt {attempt_number}), charge {provider_txn_id}",
                            snapshot.offer_id, request.quantity, unit_price
                        ),
                        now,
                    ),
                )
                .await;
                resolve_converted_decline(state, &order, now).await;
                advance_after_accept(state, &mut session, now).await?;
                logger::info!(
                    order_ref = %order.order_ref,
                    offer_id = %snapshot.offer_id,
                    amount = %total_amount,
                    "offer accepted and charged"
                );

                Ok(AcceptOfferResponse {
                    order_ref: order.order_ref,
                    order_total: order.total,
                    charged_amount: total_amount,
                    provider_txn_id: Some(provider_txn_id),
                    schedule_ref: None,
                    next_billing_at: None,
                })
            }
            Ok(ChargeOutcome::Declined { code, message }) => {
                handle_accept_decline(
                    state,
                    session,
                    &order,
                    &snapshot,
                    total_amount,
                    code,
                    message,
                    now,
                )
                .await
            }
            Err(err) => {
                logger::error!(
                    ?err,
                    order_ref = %order.order_ref,
                    "transient processor failure during accept, session position unchanged"
                );
                Err(err.change_context(errors::FunnelApiError::PaymentProcessorUnavailable))
            }
        }
    }
}

/// Decline the currently presented offer.
///
/// A declined first attempt re-presents the same offer at the downsell
/// price; a declined downsell advances to the next offer or completes the
/// session. Duplicate decline calls are no-ops keyed off server-side state.
pub async fn decline_offer(
    state: &SessionState,
    session_token: &str,
    offer_id: &str,
) -> FunnelResult<DeclineOfferResponse> {
    let now = date_time::now();
    let mut session = require_session(state, session_token).await?;

    if session.is_terminal() {
        return Ok(DeclineOfferResponse {
            step: NegotiationStep::Complete,
        });
    }
    if session.safety_expired(now, state.settings.session_safety_timeout()) {
        force_complete_session(state, &mut session, now, "session safety timeout elapsed").await?;
        return Ok(DeclineOfferResponse {
            step: NegotiationStep::Complete,
        });
    }

    let Some(snapshot) = session.current_offer().cloned() else {
        session.force_complete();
        state
            .store
            .update_session(session)
            .await
            .change_context(errors::FunnelApiError::InternalServerError)?;
        return Ok(DeclineOfferResponse {
            step: NegotiationStep::Complete,
        });
    };

    if snapshot.offer_id != offer_id {
        if session.offer_already_passed(offer_id) {
            // duplicate decline for an offer the session already moved past
            return Ok(DeclineOfferResponse {
                step: NegotiationStep::NextOffer,
            });
        }
        return Err(report!(errors::FunnelApiError::OfferNotCurrent));
    }

    if session.presented_at.is_none() {
        // the current position has not been served yet; for a downsell this
        // is the replay of the decline that produced it
        return match session.attempt {
            Attempt::Downsell => Ok(DeclineOfferResponse {
                step: NegotiationStep::Downsell,
            }),
            Attempt::FullPrice => Err(report!(errors::FunnelApiError::OfferNotCurrent)),
        };
    }

    let attempt_number = session.attempt.as_number();
    let step = session.advance_on_decline();
    append_activity_quiet(
        state,
        ActivityLogEntry::new(
            session.order_ref.clone(),
            ActivityAction::OfferDeclined,
            format!(
                "declined {} at attempt {attempt_number}, next step: {step}",
                snapshot.offer_id
            ),
            now,
        ),
    )
    .await;
    if step == NegotiationStep::Complete {
        append_activity_quiet(
            state,
            ActivityLogEntry::new(
                session.order_ref.clone(),
                ActivityAction::SessionCompleted,
                "all offers exhausted",
                now,
            ),
        )
        .await;
    }
    state
        .store
        .update_session(session)
        .await
        .change_context(errors::FunnelApiError::InternalServerError)?;

    Ok(DeclineOfferResponse { step })
}

/// Server-side sweep forcing Completed on sessions older than the safety
/// timeout, so abandoned funnels never hold presentation state forever.
pub async fn expire_stale_sessions(state: &SessionState) -> FunnelResult<ExpireSessionsSummary> {
    let now = date_time::now();
    let sessions = state
        .store
        .list_sessions()
        .await
        .change_context(errors::FunnelApiError::InternalServerError)?;

    let mut summary = ExpireSessionsSummary::default();
    for mut session in sessions {
        if session.is_terminal()
            || !session.safety_expired(now, state.settings.session_safety_timeout())
        {
            continue;
        }
        session.force_complete();
        match state.store.update_session(session.clone()).await {
            Ok(()) => {
                append_activity_quiet(
                    state,
                    ActivityLogEntry::new(
                        session.order_ref.clone(),
                        ActivityAction::SessionExpired,
                        "session safety timeout elapsed, forced complete",
                        now,
                    ),
                )
                .await;
                summary.expired += 1;
            }
            Err(err) => {
                logger::error!(
                    ?err,
                    session_token = %session.session_token,
                    "failed to expire session, leaving it for the next sweep"
                );
            }
        }
    }
    logger::info!(expired = summary.expired, "session expiry sweep finished");
    Ok(summary)
}

async fn open_session(
    state: &SessionState,
    session_token: &str,
    now: PrimitiveDateTime,
) -> FunnelResult<NegotiationSession> {
    // the session token is the order token handed over at checkout
    let order = find_order(state, session_token).await?;

    let offers = state
        .store
        .list_offers()
        .await
        .change_context(errors::FunnelApiError::InternalServerError)?;
    let mut snapshots = Vec::new();
    for offer in offers.iter().filter(|offer| offer.is_active()) {
        match OfferSnapshot::from_offer(offer, &state.settings.downsell) {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(err) => {
                logger::warn!(
                    ?err,
                    offer_id = offer.offer_id(),
                    "skipping offer without a valid downsell price"
                );
            }
        }
    }

    let session = NegotiationSession::open(session_token, order.order_ref.clone(), snapshots, now);
    state
        .store
        .insert_session(session.clone())
        .await
        .change_context(errors::FunnelApiError::InternalServerError)?;
    append_activity_quiet(
        state,
        ActivityLogEntry::new(
            order.order_ref,
            ActivityAction::SessionOpened,
            format!(
                "negotiation session opened with {} eligible offers",
                session.offers.len()
            ),
            now,
        ),
    )
    .await;
    logger::info!(
        order_ref = %session.order_ref,
        offers = session.offers.len(),
        "negotiation session opened"
    );
    Ok(session)
}

#[allow(clippy::too_many_arguments)]
async fn handle_accept_decline(
    state: &SessionState,
    mut session: NegotiationSession,
    order: &Order,
    snapshot: &OfferSnapshot,
    amount: MinorUnit,
    code: DeclineCode,
    message: Option<String>,
    now: PrimitiveDateTime,
) -> FunnelResult<AcceptOfferResponse> {
    // route the failed charge into the retry pipeline; the funnel itself
    // must keep moving for the customer even if that fails
    let record_request = RecordDeclineRequest {
        payment_ref: PaymentReference::Order(order.order_ref.clone()),
        amount,
        currency: snapshot.currency,
        decline_code: code,
        customer: order.customer.clone(),
    };
    if let Err(err) = recovery::record_decline(&state.recovery, record_request).await {
        logger::warn!(
            ?err,
            order_ref = %order.order_ref,
            "failed to record funnel decline for recovery"
        );
    }

    append_activity_quiet(
        state,
        ActivityLogEntry::new(
            order.order_ref.clone(),
            ActivityAction::ChargeDeclined,
            format!(
                "charge of {amount} for {} declined ({code}), provider said: {}",
                snapshot.offer_id,
                message.unwrap_or_default()
            ),
            now,
        ),
    )
    .await;

    // the decline consumes this presentation, same edge as an explicit one
    let step = session.advance_on_decline();
    state
        .store
        .update_session(session)
        .await
        .change_context(errors::FunnelApiError::InternalServerError)?;
    logger::info!(
        order_ref = %order.order_ref,
        code = %code,
        step = %step,
        "offer charge declined, funnel advanced"
    );

    Err(report!(errors::FunnelApiError::PaymentDeclined { code }))
}

async fn advance_after_accept(
    state: &SessionState,
    session: &mut NegotiationSession,
    now: PrimitiveDateTime,
) -> FunnelResult<()> {
    session.advance_on_accept();
    if session.is_terminal() {
        append_activity_quiet(
            state,
            ActivityLogEntry::new(
                session.order_ref.clone(),
                ActivityAction::SessionCompleted,
                "all offers exhausted",
                now,
            ),
        )
        .await;
    }
    state
        .store
        .update_session(session.clone())
        .await
        .change_context(errors::FunnelApiError::InternalServerError)
}

async fn require_session(
    state: &SessionState,
    session_token: &str,
) -> FunnelResult<NegotiationSession> {
    state
        .store
        .find_session(session_token)
        .await
        .change_context(errors::FunnelApiError::InternalServerError)?
        .ok_or_else(|| report!(errors::FunnelApiError::SessionNotFound))
}

async fn find_order(state: &SessionState, order_ref: &str) -> FunnelResult<Order> {
    state
        .store
        .find_order(order_ref)
        .await
        .map_err(|err| match err.current_context() {
            StorageError::ValueNotFound(_) => {
                err.change_context(errors::FunnelApiError::OrderNotFound)
            }
            _ => err.change_context(errors::FunnelApiError::InternalServerError),
        })
}

async fn force_complete_session(
    state: &SessionState,
    session: &mut NegotiationSession,
    now: PrimitiveDateTime,
    details: &str,
) -> FunnelResult<()> {
    session.force_complete();
    state
        .store
        .update_session(session.clone())
        .await
        .change_context(errors::FunnelApiError::InternalServerError)?;
    append_activity_quiet(
        state,
        ActivityLogEntry::new(
            session.order_ref.clone(),
            ActivityAction::SessionExpired,
            details,
            now,
        ),
    )
    .await;
    Ok(())
}

/// A completed purchase on this order supersedes any pending recovery for
/// it; leaving the record Active would risk a double charge on a later
/// sweep.
async fn resolve_converted_decline(state: &SessionState, order: &Order, now: PrimitiveDateTime) {
    match state
        .store
        .find_active_decline_by_payment_ref(&PaymentReference::Order(order.order_ref.clone()))
        .await
    {
        Ok(Some(mut record)) => {
            if record
                .mark_resolved(Some(order.order_ref.clone()), now)
                .is_ok()
            {
                if let Err(err) = state.store.update_decline_record(record.clone()).await {
                    logger::warn!(
                        ?err,
                        decline_id = %record.decline_id,
                        "failed to resolve superseded decline record"
                    );
                    return;
                }
                append_activity_quiet(
                    state,
                    ActivityLogEntry::new(
                        record.decline_id.clone(),
                        ActivityAction::RecoveryResolved,
                        format!(
                            "superseded by a successful charge on order {}",
                            order.order_ref
                        ),
                        now,
                    ),
                )
                .await;
            }
        }
        Ok(None) => {}
        Err(err) => {
            logger::warn!(
                ?err,
                order_ref = %order.order_ref,
                "failed to look up active decline record"
            );
        }
    }
}

async fn append_activity_quiet(state: &SessionState, entry: ActivityLogEntry) {
    if let Err(err) = state.store.append_activity(entry).await {
        logger::warn!(?err, "failed to append activity entry");
    }
}
