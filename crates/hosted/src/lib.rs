//! HTTP client for the hosted backend-as-a-service that WedFlex runs on:
//! passwordless auth, row-level-secured table access and object storage.
//!
//! Every call that acts on behalf of a couple takes the caller's
//! `Authorization` header value verbatim; the store enforces ownership.

pub mod auth;
pub mod client;
pub mod rest;
pub mod storage;

pub use client::{HostedClient, HostedError};
