//! OpenAI chat-completions backend.

pub mod client;
pub mod types;

pub use client::OpenAiProvider;
