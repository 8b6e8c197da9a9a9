//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod magic_link_repo;
pub mod offer_repo;
pub mod session_repo;
pub mod user_repo;

pub use magic_link_repo::MagicLinkRepo;
pub use offer_repo::OfferRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
