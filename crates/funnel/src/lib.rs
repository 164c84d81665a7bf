//! Post-checkout offer negotiation for the Keepsake storefront.
//!
//! Drives one customer through the ordered post-purchase offer sequence:
//! presentation, accept (charge or recurring schedule), decline with a
//! downsell re-presentation, and the countdown/safety-timeout expiry edges.
//! Hard declines raised here are routed into the `recovery` pipeline.

pub mod core;
pub mod settings;
pub mod state;
pub mod types;

pub use self::{core::*, settings::FunnelSettings, state::SessionState};
