use std::sync::Arc;

use keepsake_interfaces::{api::PaymentExecutor, notifications::EmailDispatcher};
use storage_impl::StorageInterface;

use crate::settings::RecoverySettings;

/// Shared handles the recovery operations run against.
#[derive(Clone)]
pub struct RecoveryState {
    pub store: Arc<dyn StorageInterface>,
    pub payment_executor: Arc<dyn PaymentExecutor>,
    pub email_dispatcher: Arc<dyn EmailDispatcher>,
    pub settings: RecoverySettings,
}

impl std::fmt::Debug for RecoveryState {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("RecoveryState")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
