//! Row models and DTOs.
//!
//! Each submodule contains a `FromRow` entity struct matching the database
//! row and, where rows are inserted from Rust, a create DTO.

pub mod magic_link;
pub mod offer;
pub mod session;
pub mod user;
