use std::fmt::Debug;

pub mod batch;

pub use batch::BatchEvent;

/// A trait for events emitted while a batch runs.
pub trait Event: Send + Sync + Debug + 'static {
    /// Returns a unique identifier for this event type.
    fn event_type(&self) -> &'static str;
}
