pub mod error;
pub mod jobs;
pub mod retry;
pub mod scheduler;
pub mod sink;
