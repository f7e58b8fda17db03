use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_MAX_TOKENS: u32 = 150;

/// Inclusive row range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    pub fn new(start: usize, end: usize) -> Self {
        RowRange { start, end }
    }

    pub fn single(row: usize) -> Self {
        RowRange::new(row, row)
    }

    pub fn is_valid(&self) -> bool {
        self.end >= self.start
    }

    pub fn len(&self) -> usize {
        if self.is_valid() {
            self.end - self.start + 1
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rows(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// System and user prompt pair. The user prompt may reference `{cell}` and
/// `{context}`; when it doesn't, both are appended after the instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub system_prompt: String,
    pub user_prompt: String,
}

impl PromptTemplate {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        PromptTemplate {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub row_range: RowRange,
    pub target_columns: Vec<String>,
    pub context_columns: Vec<String>,
    pub prompt: PromptTemplate,
    pub auto_save: bool,
    pub max_retries: u32,
    pub batch_size: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl BatchRequest {
    pub fn new(row_range: RowRange, target_columns: Vec<String>, prompt: PromptTemplate) -> Self {
        BatchRequest {
            row_range,
            target_columns,
            context_columns: Vec::new(),
            prompt,
            auto_save: true,
            max_retries: DEFAULT_MAX_RETRIES,
            batch_size: DEFAULT_BATCH_SIZE,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_context(mut self, columns: Vec<String>) -> Self {
        self.context_columns = columns;
        self
    }

    pub fn with_auto_save(mut self, enabled: bool) -> Self {
        self.auto_save = enabled;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Number of cells the request addresses (rows x target columns).
    pub fn cell_count(&self) -> usize {
        self.row_range.len() * self.target_columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_range_is_inclusive() {
        let range = RowRange::new(0, 4);
        assert_eq!(range.len(), 5);
        assert_eq!(range.rows().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert_eq!(RowRange::single(7).len(), 1);
    }

    #[test]
    fn inverted_range_is_empty() {
        let range = RowRange::new(5, 2);
        assert!(!range.is_valid());
        assert!(range.is_empty());
    }

    #[test]
    fn builder_overrides_defaults() {
        let request = BatchRequest::new(
            RowRange::new(0, 1),
            vec!["a".into(), "b".into()],
            PromptTemplate::new("sys", "do it"),
        )
        .with_batch_size(2)
        .with_max_retries(0)
        .with_auto_save(false);

        assert_eq!(request.batch_size, 2);
        assert_eq!(request.max_retries, 0);
        assert!(!request.auto_save);
        assert_eq!(request.cell_count(), 4);
        assert_eq!(request.max_tokens, DEFAULT_MAX_TOKENS);
    }
}
