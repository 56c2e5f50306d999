//! CLI command handlers.

pub mod auth;
pub mod config;
pub mod customers;
pub mod products;
pub mod sessions;
pub mod upload;
