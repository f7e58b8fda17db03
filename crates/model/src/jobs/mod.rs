pub mod cell_job;
pub mod outcome;
pub mod request;

pub use cell_job::{CellJob, ContextEntry, JobStatus, TransitionError};
pub use outcome::{BatchOutcome, BatchState};
pub use request::{BatchRequest, PromptTemplate, RowRange};
