//! Cache entry and key types.

mod entry;
mod fingerprint;

pub use entry::CacheEntry;
pub use fingerprint::{Fingerprint, VersionMarker};
