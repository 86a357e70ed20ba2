//! Fetch, cache, select and bulk-manage the GitHub repositories of an account.

pub mod actions;
pub mod bulk;
pub mod cache;
pub mod config;
pub mod github;
pub mod model;
pub mod selection;
pub mod types;
