//! Recovery notification dispatch.
//!
//! At most one email is recorded per `(decline record, attempt number)`. A
//! provider failure never rolls back charge-outcome state: it is logged, the
//! attempt stays un-notified and remains eligible for a later best-effort
//! resend.

use common_enums::{ActivityAction, RecoveryEmailTemplate};
use common_utils::date_time;
use funnel_env::logger;
use keepsake_domain_models::{activity::ActivityLogEntry, recovery::DeclineRecord};
use keepsake_interfaces::types::EmailRequest;

use crate::state::RecoveryState;

/// Escalating template selection: first notice, reminders in between, final
/// notice once the schedule has run out.
pub fn template_for_attempt(record: &DeclineRecord, schedule_len: usize) -> RecoveryEmailTemplate {
    let last = i32::try_from(schedule_len).unwrap_or(i32::MAX);
    if record.retry_attempts >= last {
        RecoveryEmailTemplate::FinalNotice
    } else if record.retry_attempts <= 1 {
        RecoveryEmailTemplate::PaymentFailed
    } else {
        RecoveryEmailTemplate::PaymentRetryReminder
    }
}

/// Send the recovery email for the record's current attempt unless one has
/// already been recorded for it. Returns whether an email was sent and
/// recorded; the caller persists the updated record.
pub async fn send_if_due(state: &RecoveryState, record: &mut DeclineRecord) -> bool {
    let attempt = record.retry_attempts;
    if record.has_email_for(attempt) {
        return false;
    }

    let template = template_for_attempt(record, state.settings.retry_schedule().len());
    let data = serde_json::json!({
        "amount": record.amount,
        "currency": record.currency,
        "decline_code": record.decline_code,
        "attempt": attempt,
        "next_retry_at": record.next_retry_at,
        "customer_name": record.customer.name,
    });
    let request = EmailRequest {
        template,
        recipient: record.customer.email.clone(),
        data,
    };

    match state.email_dispatcher.send(request).await {
        Ok(outcome) => {
            let now = date_time::now();
            if let Err(err) = record.record_email(attempt, Some(outcome.message_id), now) {
                logger::warn!(
                    ?err,
                    decline_id = %record.decline_id,
                    "recovery email already recorded for this attempt"
                );
                return false;
            }
            let entry = ActivityLogEntry::new(
                record.decline_id.clone(),
                ActivityAction::RecoveryEmailSent,
                format!("recovery email sent for attempt {attempt}"),
                now,
            )
            .with_email(template, record.customer.email.clone());
            if let Err(err) = state.store.append_activity(entry).await {
                logger::warn!(
                    ?err,
                    decline_id = %record.decline_id,
                    "failed to append email audit entry"
                );
            }
            logger::info!(
                decline_id = %record.decline_id,
                attempt,
                template = %template,
                "recovery email sent"
            );
            true
        }
        Err(err) => {
            logger::warn!(
                ?err,
                decline_id = %record.decline_id,
                attempt,
                "recovery email dispatch failed, eligible for a later resend"
            );
            false
        }
    }
}
