//! Core operations of the post-checkout funnel.

pub mod errors;
pub mod negotiation;
pub mod offers;

use common_utils::errors::CustomResult;

pub use self::{negotiation::*, offers::*};

pub type FunnelResult<T> = CustomResult<T, errors::FunnelApiError>;
