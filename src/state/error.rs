use thiserror::Error;

use super::ItemId;

/// Why a persisted timeline or item could not be restored.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The document could not be read from disk.
    #[error("failed to read timeline document: {0}")]
    Io(#[from] std::io::Error),
    /// The document does not have the expected shape.
    #[error("malformed timeline document: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The identifier names an item type the factory does not know.
    #[error("unknown item type {type_code} for item {id}")]
    UnknownItemType { id: ItemId, type_code: u8 },
    /// An item's data is missing fields or has fields of the wrong type.
    #[error("malformed {type_name} item data: {source}")]
    MalformedItem {
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },
    /// The row count is zero or larger than an id can encode.
    #[error("invalid row count {0}")]
    InvalidRowCount(usize),
    /// An item sits in a row outside the document's row count.
    #[error("item {id} is in row {row} but the timeline has {row_count} rows")]
    RowOutOfRange { id: ItemId, row: usize, row_count: usize },
    /// The same identifier appears twice.
    #[error("item {0} appears more than once")]
    DuplicateItem(ItemId),
    /// The row tables disagree with each other or with the item list.
    #[error("row index is inconsistent at item {0}")]
    InconsistentIndex(ItemId),
    /// A connection references an item that does not exist or lives in another row.
    #[error("connection {from} -> {to} is dangling")]
    DanglingConnection { from: ItemId, to: ItemId },
}
