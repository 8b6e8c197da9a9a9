pub mod auth;
pub mod catalog;
pub mod drafts;
pub mod health;
pub mod requests;
pub mod uploads;
