//! Offer catalog administration.

use error_stack::{Report, ResultExt};
use funnel_env::logger;
use keepsake_domain_models::offers::Offer;
use storage_impl::StorageError;

use crate::{
    core::{errors, FunnelResult},
    state::SessionState,
};

/// Create or update a catalog entry. Sessions opened before the change keep
/// their frozen snapshots.
pub async fn upsert_offer(state: &SessionState, offer: Offer) -> FunnelResult<Offer> {
    offer
        .validate()
        .map_err(Report::new)
        .change_context(errors::FunnelApiError::InvalidOffer)?;
    state
        .store
        .upsert_offer(offer.clone())
        .await
        .change_context(errors::FunnelApiError::InternalServerError)?;
    logger::info!(offer_id = offer.offer_id(), "offer catalog entry upserted");
    Ok(offer)
}

pub async fn retrieve_offer(state: &SessionState, offer_id: &str) -> FunnelResult<Offer> {
    state
        .store
        .find_offer(offer_id)
        .await
        .map_err(|err| match err.current_context() {
            StorageError::ValueNotFound(_) => {
                err.change_context(errors::FunnelApiError::OfferNotFound)
            }
            _ => err.change_context(errors::FunnelApiError::InternalServerError),
        })
}

/// Offers currently eligible for presentation.
pub async fn list_active_offers(state: &SessionState) -> FunnelResult<Vec<Offer>> {
    Ok(state
        .store
        .list_offers()
        .await
        .change_context(errors::FunnelApiError::InternalServerError)?
        .into_iter()
        .filter(|offer| offer.is_active())
        .collect())
}
