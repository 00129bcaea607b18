//! Expert (adapter) registry.
//!
//! Holds metadata for every registered adapter. Experts are soft-deleted:
//! deactivation hides them from routing while cached results that mention
//! them stay decodable. Every mutation bumps a generation counter that the
//! semantic cache folds into its version markers.

mod core;


pub use self::core::ExpertRegistry;
