//! Storage interfaces of the Keepsake engine.
//!
//! The hosted document store only offers get/set/delete by string key and
//! listing by key prefix; no transactions. Every interface here is therefore
//! built for idempotent read-modify-write: correctness comes from monotonic
//! record fields and deterministic keys, not from atomic multi-key commits.

pub mod errors;
pub mod kv;
pub mod memory;
pub mod store;

pub use self::{
    errors::StorageError,
    kv::KeyValueStore,
    memory::InMemoryStore,
    store::{
        ActivityLogInterface, DeclineRecordInterface, NegotiationSessionInterface,
        OfferCatalogInterface, OrderInterface, StorageInterface, Store,
    },
};
