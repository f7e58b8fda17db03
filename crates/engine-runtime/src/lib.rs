pub mod error;
pub mod executor;
pub mod factory;
pub mod workflow;

#[cfg(test)]
mod tests;
