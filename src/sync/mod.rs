//! Client-side data synchronization.
//!
//! [`loader`] pulls the catalog, [`filter`] narrows it by hashtags, [`reconciler`] keeps the
//! latest status per store, and [`SyncSession`] ties them to one query backend and one change
//! feed subscription.

pub mod filter;
pub mod loader;
pub mod reconciler;
mod session;

pub use session::*;
