pub mod core;
pub mod events;
pub mod jobs;
pub mod records;
