//! Adapters module — channels that deliver customer messages to the agent.
//!
//! Each adapter implements the [`Channel`] trait for uniform handling.
//!
//! # Supported Channels
//!
//! - **CLI** — Interactive command line interface
//!
//! # Adding a New Channel
//!
//! 1. Create a new file (e.g., `whatsapp.rs`)
//! 2. Implement the [`Channel`] trait
//! 3. Wrap each run in the request timeout and record turns in the store

pub mod cli;

/// Channel trait for chat adapters.
///
/// All channel implementations must be [`Send`] + [`Sync`] for async compatibility.
pub trait Channel: Send + Sync {
    /// Channel name (e.g., "cli").
    fn name(&self) -> &str;

    /// Start listening for messages.
    fn start(&self) -> impl std::future::Future<Output = crate::Result<()>> + Send;

    /// Stop the channel.
    fn stop(&self) -> impl std::future::Future<Output = crate::Result<()>> + Send;
}
