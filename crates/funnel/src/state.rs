use std::sync::Arc;

use keepsake_interfaces::{api::PaymentExecutor, notifications::EmailDispatcher};
use recovery::{RecoverySettings, RecoveryState};
use storage_impl::StorageInterface;

use crate::settings::FunnelSettings;

/// Shared handles the negotiation operations run against.
#[derive(Clone)]
pub struct SessionState {
    pub store: Arc<dyn StorageInterface>,
    pub payment_executor: Arc<dyn PaymentExecutor>,
    pub settings: FunnelSettings,
    /// Declines raised in the funnel are routed into this pipeline.
    pub recovery: RecoveryState,
}

impl SessionState {
    pub fn new(
        store: Arc<dyn StorageInterface>,
        payment_executor: Arc<dyn PaymentExecutor>,
        email_dispatcher: Arc<dyn EmailDispatcher>,
        settings: FunnelSettings,
        recovery_settings: RecoverySettings,
    ) -> Self {
        Self {
            store: store.clone(),
            payment_executor: payment_executor.clone(),
            settings,
            recovery: RecoveryState {
                store,
                payment_executor,
                email_dispatcher,
                settings: recovery_settings,
            },
        }
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("SessionState")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
