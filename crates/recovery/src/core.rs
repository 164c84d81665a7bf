//! Core operations of the payment-recovery pipeline.

pub mod errors;

use common_enums::{ActivityAction, RecoveryStatus};
use common_utils::{date_time, errors::CustomResult, generate_id_with_default_len};
use error_stack::{report, ResultExt};
use funnel_env::logger;
use keepsake_domain_models::{activity::ActivityLogEntry, recovery::DeclineRecord};
use keepsake_interfaces::types::{ChargeOutcome, ChargeRequest};
use storage_impl::StorageError;
use time::PrimitiveDateTime;

use crate::{
    notifications,
    state::RecoveryState,
    types::{
        DeclineRecordResponse, ManualRetryResponse, RecordDeclineRequest, RetryOutcome,
        SendRecoveryEmailResponse, SweepSummary,
    },
};

pub type RecoveryResult<T> = CustomResult<T, errors::RecoveryApiError>;

/// Record a failed charge: opens a record on the first failure of a payment
/// reference, or consumes a retry slot on the existing Active record.
pub async fn record_decline(
    state: &RecoveryState,
    request: RecordDeclineRequest,
) -> RecoveryResult<DeclineRecordResponse> {
    let now = date_time::now();
    let schedule = state.settings.retry_schedule();

    let existing = state
        .store
        .find_active_decline_by_payment_ref(&request.payment_ref)
        .await
        .change_context(errors::RecoveryApiError::InternalServerError)?;

    let record = match existing {
        Some(mut record) => {
            record
                .register_failure(request.decline_code, &schedule, now)
                .change_context(errors::RecoveryApiError::InternalServerError)?;
            state
                .store
                .update_decline_record(record.clone())
                .await
                .change_context(errors::RecoveryApiError::InternalServerError)?;
            record
        }
        None => {
            let record = DeclineRecord::open(
                generate_id_with_default_len("dec"),
                request.payment_ref,
                request.amount,
                request.currency,
                request.decline_code,
                request.customer,
                &schedule,
                now,
            );
            state
                .store
                .insert_decline_record(record.clone())
                .await
                .change_context(errors::RecoveryApiError::InternalServerError)?;
            record
        }
    };

    append_activity_quiet(
        state,
        ActivityLogEntry::new(
            record.decline_id.clone(),
            ActivityAction::DeclineRecorded,
            format!(
                "charge declined ({}) for {}, attempt {}",
                record.decline_code, record.payment_ref, record.retry_attempts
            ),
            now,
        ),
    )
    .await;
    append_schedule_trail(state, &record, now).await;

    logger::info!(
        decline_id = %record.decline_id,
        retry_attempts = record.retry_attempts,
        status = %record.status,
        "recorded payment decline"
    );

    Ok(DeclineRecordResponse::from(&record))
}

/// Idempotent batch sweep over all Active records whose retry is due.
///
/// Safe under at-least-once invocation: each record is re-fetched before
/// charging, the charge carries a deterministic idempotency key, and a
/// record that another pass already settled is skipped. One failing record
/// never aborts the batch.
pub async fn process_due_retries(state: &RecoveryState) -> RecoveryResult<SweepSummary> {
    let now = date_time::now();
    let mut summary = SweepSummary::default();

    let records = state
        .store
        .list_decline_records()
        .await
        .change_context(errors::RecoveryApiError::InternalServerError)?;
    let mut due: Vec<DeclineRecord> = records
        .into_iter()
        .filter(|record| record.is_due(now))
        .collect();
    due.sort_by_key(|record| record.next_retry_at);
    if due.len() > state.settings.max_batch_size {
        logger::info!(
            due = due.len(),
            cap = state.settings.max_batch_size,
            "retry sweep truncated to the batch cap"
        );
        due.truncate(state.settings.max_batch_size);
    }

    for stale in due {
        let record = match state.store.find_decline_record(&stale.decline_id).await {
            Ok(record) => record,
            Err(err) => {
                logger::error!(
                    ?err,
                    decline_id = %stale.decline_id,
                    "failed to re-fetch decline record, skipping"
                );
                summary.failed += 1;
                continue;
            }
        };
        if !record.is_due(now) {
            // settled or rescheduled by a concurrent pass
            continue;
        }

        summary.attempted += 1;
        match execute_retry(state, record, now).await {
            Ok((_, RetryOutcome::Recovered, _)) => summary.succeeded += 1,
            Ok((_, RetryOutcome::Declined, notified)) => {
                summary.failed += 1;
                if notified {
                    summary.notifications_sent += 1;
                }
            }
            Ok((_, RetryOutcome::TransientError, _)) => summary.failed += 1,
            Err(err) => {
                logger::error!(?err, "retry attempt failed, continuing with the batch");
                summary.failed += 1;
            }
        }
    }

    logger::info!(
        attempted = summary.attempted,
        succeeded = summary.succeeded,
        failed = summary.failed,
        notifications_sent = summary.notifications_sent,
        "retry sweep finished"
    );
    Ok(summary)
}

/// Administrator stop: one-way transition to Stopped, no further automatic
/// retries or emails.
pub async fn stop_recovery(
    state: &RecoveryState,
    decline_id: &str,
) -> RecoveryResult<DeclineRecordResponse> {
    let now = date_time::now();
    let mut record = find_record(state, decline_id).await?;
    record.stop().map_err(|_| {
        report!(errors::RecoveryApiError::InvalidRecordState {
            status: record.status,
        })
    })?;
    state
        .store
        .update_decline_record(record.clone())
        .await
        .change_context(errors::RecoveryApiError::InternalServerError)?;

    append_activity_quiet(
        state,
        ActivityLogEntry::new(
            record.decline_id.clone(),
            ActivityAction::RecoveryStopped,
            "recovery stopped by administrator",
            now,
        ),
    )
    .await;
    logger::info!(decline_id = %record.decline_id, "recovery stopped");

    Ok(DeclineRecordResponse::from(&record))
}

/// Administrator out-of-band retry, bypassing the schedule but going through
/// the same idempotency guard and transitions as the sweep.
pub async fn manual_retry(
    state: &RecoveryState,
    decline_id: &str,
) -> RecoveryResult<ManualRetryResponse> {
    let now = date_time::now();
    let record = find_record(state, decline_id).await?;
    match record.status {
        RecoveryStatus::Resolved | RecoveryStatus::Stopped => {
            return Err(report!(errors::RecoveryApiError::InvalidRecordState {
                status: record.status,
            }));
        }
        RecoveryStatus::Active | RecoveryStatus::Exhausted => {}
    }

    let (record, outcome, notification_sent) = execute_retry(state, record, now).await?;
    if outcome == RetryOutcome::TransientError {
        return Err(report!(errors::RecoveryApiError::PaymentProcessorUnavailable));
    }

    Ok(ManualRetryResponse {
        decline_id: record.decline_id.clone(),
        outcome,
        notification_sent,
        record: DeclineRecordResponse::from(&record),
    })
}

/// Administrator-triggered dispatch of the recovery email for the record's
/// current attempt, going through the same at-most-once guard as the sweep.
pub async fn send_recovery_email(
    state: &RecoveryState,
    decline_id: &str,
) -> RecoveryResult<SendRecoveryEmailResponse> {
    let mut record = find_record(state, decline_id).await?;
    match record.status {
        RecoveryStatus::Resolved | RecoveryStatus::Stopped => {
            return Err(report!(errors::RecoveryApiError::InvalidRecordState {
                status: record.status,
            }));
        }
        RecoveryStatus::Active | RecoveryStatus::Exhausted => {}
    }

    let sent = notifications::send_if_due(state, &mut record).await;
    if sent {
        state
            .store
            .update_decline_record(record.clone())
            .await
            .change_context(errors::RecoveryApiError::InternalServerError)?;
    }

    Ok(SendRecoveryEmailResponse {
        decline_id: record.decline_id,
        attempt: record.retry_attempts,
        sent,
    })
}

/// One charge attempt against a record, with the shared success/failure
/// transitions. Returns the updated record, what happened, and whether a
/// recovery email went out.
async fn execute_retry(
    state: &RecoveryState,
    mut record: DeclineRecord,
    now: PrimitiveDateTime,
) -> RecoveryResult<(DeclineRecord, RetryOutcome, bool)> {
    let charge = ChargeRequest {
        customer_ref: record.customer.customer_ref.clone(),
        payment_method_ref: record.customer.payment_method_ref.clone(),
        amount: record.amount,
        currency: record.currency,
        idempotency_key: record.charge_idempotency_key(),
    };

    match state.payment_executor.charge(charge).await {
        Ok(ChargeOutcome::Charged { provider_txn_id }) => {
            let converted_order_id = record.payment_ref.order_id().map(ToOwned::to_owned);
            record
                .mark_resolved(converted_order_id, now)
                .change_context(errors::RecoveryApiError::InternalServerError)?;
            state
                .store
                .update_decline_record(record.clone())
                .await
                .change_context(errors::RecoveryApiError::InternalServerError)?;

            append_activity_quiet(
                state,
                ActivityLogEntry::new(
                    record.decline_id.clone(),
                    ActivityAction::RetrySucceeded,
                    format!("retry charge settled ({provider_txn_id}), record resolved"),
                    now,
                ),
            )
            .await;
            logger::info!(decline_id = %record.decline_id, "retry charge succeeded, record resolved");
            Ok((record, RetryOutcome::Recovered, false))
        }
        Ok(ChargeOutcome::Declined { code, .. }) => {
            record
                .register_failure(code, &state.settings.retry_schedule(), now)
                .change_context(errors::RecoveryApiError::InternalServerError)?;
            state
                .store
                .update_decline_record(record.clone())
                .await
                .change_context(errors::RecoveryApiError::InternalServerError)?;

            append_activity_quiet(
                state,
                ActivityLogEntry::new(
                    record.decline_id.clone(),
                    ActivityAction::RetryFailed,
                    format!("retry charge declined ({code}), attempt {}", record.retry_attempts),
                    now,
                ),
            )
            .await;
            append_schedule_trail(state, &record, now).await;

            // email only after the charge outcome has been committed
            let notified = notifications::send_if_due(state, &mut record).await;
            if notified {
                state
                    .store
                    .update_decline_record(record.clone())
                    .await
                    .change_context(errors::RecoveryApiError::InternalServerError)?;
            }
            Ok((record, RetryOutcome::Declined, notified))
        }
        Err(err) => {
            // Transient processor failure: no retry slot consumed, no email,
            // next_retry_at untouched so the next sweep picks it up again.
            logger::warn!(
                ?err,
                decline_id = %record.decline_id,
                "transient payment processor error during retry, record left unchanged"
            );
            Ok((record, RetryOutcome::TransientError, false))
        }
    }
}

async fn find_record(state: &RecoveryState, decline_id: &str) -> RecoveryResult<DeclineRecord> {
    state
        .store
        .find_decline_record(decline_id)
        .await
        .map_err(|err| match err.current_context() {
            StorageError::ValueNotFound(_) => {
                err.change_context(errors::RecoveryApiError::DeclineNotFound)
            }
            _ => err.change_context(errors::RecoveryApiError::InternalServerError),
        })
}

async fn append_schedule_trail(
    state: &RecoveryState,
    record: &DeclineRecord,
    now: PrimitiveDateTime,
) {
    match record.next_retry_at {
        Some(next_retry_at) => {
            append_activity_quiet(
                state,
                ActivityLogEntry::new(
                    record.decline_id.clone(),
                    ActivityAction::RetryScheduled,
                    format!("next automatic retry at {next_retry_at}"),
                    now,
                ),
            )
            .await;
        }
        None if record.status == RecoveryStatus::Exhausted => {
            append_activity_quiet(
                state,
                ActivityLogEntry::new(
                    record.decline_id.clone(),
                    ActivityAction::RetriesExhausted,
                    "retry schedule exhausted, no further automatic retries",
                    now,
                ),
            )
            .await;
        }
        None => {}
    }
}

async fn append_activity_quiet(state: &RecoveryState, entry: ActivityLogEntry) {
    if let Err(err) = state.store.append_activity(entry).await {
        logger::warn!(?err, "failed to append activity entry");
    }
}
