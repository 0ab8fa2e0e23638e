//! Item identifiers.
//!
//! An [`ItemId`] packs the item kind, its row and a sequence index into one
//! 64-bit value, so the kind and row of any item can be read without a lookup:
//!
//! ```text
//!  63  62..56     55..48    47..0
//! [ 0 | type:7 | row:8 | sequence:48 ]
//! ```
//!
//! The layout is persisted, so it must never change.

use serde::{Deserialize, Serialize};
use std::fmt;

const TYPE_SHIFT: u32 = 56;
const ROW_SHIFT: u32 = 48;
const TYPE_MASK: u64 = 0x7F;
const ROW_MASK: u64 = 0xFF;
const SEQUENCE_MASK: u64 = (1 << ROW_SHIFT) - 1;

/// Opaque identifier of a timeline item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl ItemId {
    /// Reserved value meaning "no item".
    pub const INVALID: ItemId = ItemId(u64::MAX);

    /// Pack a type code, row and sequence index into an identifier.
    pub const fn new(type_code: u8, row: usize, sequence: u64) -> Self {
        Self(
            ((type_code as u64 & TYPE_MASK) << TYPE_SHIFT)
                | ((row as u64 & ROW_MASK) << ROW_SHIFT)
                | (sequence & SEQUENCE_MASK),
        )
    }

    /// The 7-bit item type code.
    pub const fn type_code(self) -> u8 {
        ((self.0 >> TYPE_SHIFT) & TYPE_MASK) as u8
    }

    /// The row the item was created in.
    pub const fn row(self) -> usize {
        ((self.0 >> ROW_SHIFT) & ROW_MASK) as usize
    }

    /// The sequence index the item was allocated with.
    pub const fn sequence(self) -> u64 {
        self.0 & SEQUENCE_MASK
    }

    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}:{}:{}", self.type_code(), self.row(), self.sequence())
        } else {
            f.write_str("invalid")
        }
    }
}

/// A directed "runs into" link between two items of the same row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[ItemId; 2]", into = "[ItemId; 2]")]
pub struct ItemConnId {
    pub from: ItemId,
    pub to: ItemId,
}

impl ItemConnId {
    pub const fn new(from: ItemId, to: ItemId) -> Self {
        Self { from, to }
    }

    /// Both ends reference an item.
    pub const fn is_valid(&self) -> bool {
        self.from.is_valid() && self.to.is_valid()
    }

    /// Whether `id` is either end of this connection.
    pub fn touches(&self, id: ItemId) -> bool {
        self.from == id || self.to == id
    }
}

impl Default for ItemConnId {
    fn default() -> Self {
        Self::new(ItemId::INVALID, ItemId::INVALID)
    }
}

impl From<[ItemId; 2]> for ItemConnId {
    fn from(pair: [ItemId; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

impl From<ItemConnId> for [ItemId; 2] {
    fn from(conn: ItemConnId) -> Self {
        [conn.from, conn.to]
    }
}
