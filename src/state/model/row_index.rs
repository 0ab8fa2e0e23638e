use std::collections::{BTreeMap, HashMap};
use std::ops::Bound::{Excluded, Unbounded};

use crate::state::ItemId;

/// Start-ordered index of one row.
///
/// `by_start` orders the row; `by_item` answers "where does this item start"
/// without a scan. The two maps always hold the same set of items.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RowIndex {
    by_start: BTreeMap<i64, ItemId>,
    by_item: HashMap<ItemId, i64>,
}

impl RowIndex {
    pub fn len(&self) -> usize {
        self.by_start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_start.is_empty()
    }

    /// Add an item. Returns false if `start` already has an item.
    pub fn insert(&mut self, start: i64, id: ItemId) -> bool {
        if self.by_start.contains_key(&start) {
            return false;
        }
        self.by_start.insert(start, id);
        self.by_item.insert(id, start);
        true
    }

    pub fn remove(&mut self, id: ItemId) -> Option<i64> {
        let start = self.by_item.remove(&id)?;
        self.by_start.remove(&start);
        Some(start)
    }

    pub fn start_of(&self, id: ItemId) -> Option<i64> {
        self.by_item.get(&id).copied()
    }

    pub fn head(&self) -> Option<ItemId> {
        self.by_start.values().next().copied()
    }

    pub fn tail(&self) -> Option<ItemId> {
        self.by_start.values().next_back().copied()
    }

    pub fn previous(&self, id: ItemId) -> Option<ItemId> {
        let start = self.start_of(id)?;
        self.by_start.range(..start).next_back().map(|(_, id)| *id)
    }

    pub fn next(&self, id: ItemId) -> Option<ItemId> {
        let start = self.start_of(id)?;
        self.by_start
            .range((Excluded(start), Unbounded))
            .next()
            .map(|(_, id)| *id)
    }

    /// Number of items starting strictly before `start`.
    pub fn count_before(&self, start: i64) -> usize {
        self.by_start.range(..start).count()
    }

    /// Items starting strictly after `start`, in order.
    pub fn after(&self, start: i64) -> impl Iterator<Item = ItemId> + '_ {
        self.by_start
            .range((Excluded(start), Unbounded))
            .map(|(_, id)| *id)
    }

    /// Items starting at or before `last`, latest first.
    pub fn up_to_rev(&self, last: i64) -> impl Iterator<Item = (i64, ItemId)> + '_ {
        self.by_start.range(..=last).rev().map(|(start, id)| (*start, *id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, ItemId)> + '_ {
        self.by_start.iter().map(|(start, id)| (*start, *id))
    }

    pub fn by_start(&self) -> &BTreeMap<i64, ItemId> {
        &self.by_start
    }

    pub fn by_item(&self) -> &HashMap<ItemId, i64> {
        &self.by_item
    }
}
