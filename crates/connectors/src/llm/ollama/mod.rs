//! Ollama backend for locally served models.

pub mod client;
pub mod types;

pub use client::OllamaProvider;
