//! Primitives for the self-hosted identity provider.
//!
//! - [`jwt`] -- access-token generation/validation and opaque-token hashing.
//! - [`mailer`] -- delivery of sign-in links (SMTP or a logged outbox).

pub mod jwt;
pub mod mailer;
