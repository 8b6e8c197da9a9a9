//! Collaborators behind the HTTP layer.
//!
//! Each seam is a trait held as `Arc<dyn ...>` in
//! [`AppState`](crate::state::AppState) and chosen once at start-up from
//! `BACKEND_MODE`.

pub mod identity;
pub mod object_storage;
pub mod offer_store;
pub mod submission;
