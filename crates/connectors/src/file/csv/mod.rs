pub mod error;
pub mod store;

pub use store::CsvStore;
