pub mod connectors;
pub mod error;
pub mod metrics;
pub mod progress;
pub mod rate_limit;
pub mod retry;
