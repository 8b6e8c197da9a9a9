//! Request extractors.
//!
//! - [`auth::CurrentIdentity`] -- Requires a signed-in couple.
//! - [`auth::MaybeIdentity`] -- Resolves the caller if a credential is present.
//! - [`auth::MaybeCredential`] -- The raw `Authorization` header, unresolved.

pub mod auth;
