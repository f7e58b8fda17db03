use crate::error::StoreError;
use model::records::table::Table;

/// Backing file of an in-memory table.
///
/// `save` must leave the previous file untouched when it fails, which in
/// practice means writing a sibling temp file and renaming it into place.
pub trait TableStore: Send + Sync {
    /// Human-readable location, used in logs and error messages.
    fn location(&self) -> String;

    fn load(&self) -> Result<Table, StoreError>;

    fn save(&self, table: &Table) -> Result<(), StoreError>;
}
