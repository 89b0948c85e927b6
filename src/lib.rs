//! TaskHub, a small team task dashboard.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod projects;
pub mod store;
pub mod tasks;
