//! Payment executor interface.

use common_utils::errors::CustomResult;

use crate::{
    errors::PaymentExecutorError,
    types::{ChargeOutcome, ChargeRequest, RecurringScheduleRequest, ScheduleOutcome},
};

/// Executes payments against the external processor.
///
/// Implementations must honor the request's `idempotency_key`: submitting the
/// same key twice must not charge the customer twice. The engine relies on
/// this for its at-least-once retry semantics.
#[async_trait::async_trait]
pub trait PaymentExecutor: dyn_clone::DynClone + Send + Sync {
    /// Charge a stored payment method.
    async fn charge(
        &self,
        request: ChargeRequest,
    ) -> CustomResult<ChargeOutcome, PaymentExecutorError>;

    /// Create a recurring billing schedule, or update the referenced one.
    async fn create_or_update_schedule(
        &self,
        request: RecurringScheduleRequest,
    ) -> CustomResult<ScheduleOutcome, PaymentExecutorError>;
}

dyn_clone::clone_trait_object!(PaymentExecutor);
