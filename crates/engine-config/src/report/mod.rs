pub mod columns;
pub mod summary;
