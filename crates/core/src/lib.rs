pub mod catalog;
pub mod error;
pub mod identity;
pub mod magic_link;
pub mod normalize;
pub mod offer;
pub mod pagination;
pub mod service_request;
pub mod types;
pub mod wizard;
