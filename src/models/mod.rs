//! Data models for the congestion sync application.
//!
//! Each entity comes in two shapes: the snake_case source row as the backend returns it,
//! and the camelCase application model that the sync layer caches and serves.

mod congestion;
mod store;
mod tag;
mod user;

pub use congestion::*;
pub use store::*;
pub use tag::*;
pub use user::*;
