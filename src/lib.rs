//! Fieldhand - tool-calling sales assistant for agricultural machinery dealers
//!
//! This library provides the turn loop that drives a function-calling model,
//! the sales tools it can call, and the collaborators those tools talk to.

pub mod adapters;
pub mod agent;
pub mod config;
pub mod error;
pub mod services;
pub mod templates;
pub mod tools;
pub mod ui;

pub use error::{Error, Result};
