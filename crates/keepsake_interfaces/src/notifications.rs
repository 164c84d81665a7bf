//! Email dispatcher interface.

use common_utils::errors::CustomResult;

use crate::{
    errors::EmailDispatcherError,
    types::{EmailRequest, SendOutcome},
};

/// Hands transactional emails to the delivery provider.
#[async_trait::async_trait]
pub trait EmailDispatcher: dyn_clone::DynClone + Send + Sync {
    /// Send one email. A returned error means the message may not have been
    /// accepted; callers decide whether and when to retry.
    async fn send(&self, request: EmailRequest)
        -> CustomResult<SendOutcome, EmailDispatcherError>;
}

dyn_clone::clone_trait_object!(EmailDispatcher);
