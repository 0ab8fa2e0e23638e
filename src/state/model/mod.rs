//! The timeline item store.
//!
//! [`TimelineModel`] owns every item, the per-row start index and the
//! connection graph, and keeps them consistent under create, remove and move:
//!
//! - items in a row never share a start frame, and items placed by create or
//!   move never overlap an existing `[start, start + duration)` range
//! - an item's sequence number is its 1-based position in its row
//! - an item has at most one incoming and one outgoing connection, and both
//!   ends of a connection are in the same row
//!
//! Every mutation is reported to subscribers as a [`TimelineEvent`] before the
//! call returns.

mod connections;
mod layout;
mod media;
mod persistence;
mod row_index;

pub use persistence::ItemSnapshot;

use std::collections::{BTreeMap, BTreeSet};

use self::connections::ConnectionGraph;
use self::row_index::RowIndex;
use super::events::Observers;
use super::{
    create_item, Item, ItemConnId, ItemId, ItemKind, ItemOperation, ItemRole, PropertyValue,
    SubscriptionId, TimelineEvent, TimelineSettings,
};
use crate::constants::FIRST_ID_INDEX;

/// In-memory database of one timeline document.
#[derive(Debug)]
pub struct TimelineModel {
    id_index: u64,
    row_count: usize,
    items: BTreeMap<ItemId, Item>,
    rows: BTreeMap<usize, RowIndex>,
    connections: ConnectionGraph,
    hidden_rows: BTreeSet<usize>,
    locked_rows: BTreeSet<usize>,
    disabled_kinds: BTreeSet<ItemKind>,
    frame_range: [i64; 2],
    view_frame_range: [i64; 2],
    fps: f64,
    item_height: f64,
    dirty: bool,
    observers: Observers,
}

impl Default for TimelineModel {
    fn default() -> Self {
        Self::with_settings(TimelineSettings::default())
    }
}

impl TimelineModel {
    /// Create an empty model with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty model from explicit settings.
    pub fn with_settings(settings: TimelineSettings) -> Self {
        let settings = settings.sanitized();
        let frame_range = [settings.frame_minimum, settings.frame_maximum];
        Self {
            id_index: FIRST_ID_INDEX,
            row_count: settings.row_count,
            items: BTreeMap::new(),
            rows: BTreeMap::new(),
            connections: ConnectionGraph::default(),
            hidden_rows: BTreeSet::new(),
            locked_rows: BTreeSet::new(),
            disabled_kinds: BTreeSet::new(),
            frame_range,
            view_frame_range: frame_range,
            fps: settings.fps,
            item_height: settings.item_height,
            dirty: false,
            observers: Observers::default(),
        }
    }

    /// Current settings of the model.
    pub fn settings(&self) -> TimelineSettings {
        TimelineSettings {
            fps: self.fps,
            row_count: self.row_count,
            item_height: self.item_height,
            frame_minimum: self.frame_range[0],
            frame_maximum: self.frame_range[1],
        }
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Register a handler called synchronously for every event.
    pub fn subscribe(&mut self, handler: impl FnMut(&TimelineEvent) + 'static) -> SubscriptionId {
        self.observers.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn emit(&mut self, event: TimelineEvent) {
        self.observers.emit(event);
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn exists(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All item ids in ascending id order.
    pub fn item_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.items.keys().copied()
    }

    /// Item ids of a row in start order.
    pub fn items_in_row(&self, row: usize) -> Vec<ItemId> {
        self.rows
            .get(&row)
            .map(|index| index.iter().map(|(_, id)| id).collect())
            .unwrap_or_default()
    }

    /// Item ids of a row whose range intersects `[start, end)`, in start order.
    pub fn items_in_frame_range(&self, row: usize, start: i64, end: i64) -> Vec<ItemId> {
        self.items_in_row(row)
            .into_iter()
            .filter(|id| {
                self.items
                    .get(id)
                    .is_some_and(|item| item.start() < end && last_frame(item) >= start)
            })
            .collect()
    }

    pub fn head_item(&self, row: usize) -> Option<ItemId> {
        self.rows.get(&row)?.head()
    }

    pub fn tail_item(&self, row: usize) -> Option<ItemId> {
        self.rows.get(&row)?.tail()
    }

    pub fn previous_item(&self, id: ItemId) -> Option<ItemId> {
        self.rows.get(&id.row())?.previous(id)
    }

    pub fn next_item(&self, id: ItemId) -> Option<ItemId> {
        self.rows.get(&id.row())?.next(id)
    }

    /// Whether `[start, start + duration)` in `row` overlaps an item other
    /// than `except`. A zero-duration item occupies its start frame.
    pub fn is_frame_range_occupied(
        &self,
        row: usize,
        start: i64,
        duration: i64,
        except: Option<ItemId>,
    ) -> bool {
        let Some(index) = self.rows.get(&row) else {
            return false;
        };
        let last = start.saturating_add(duration.max(1) - 1);
        // Restored snapshots may overlap, so every earlier item is a candidate.
        index
            .up_to_rev(last)
            .filter(|&(_, other)| Some(other) != except)
            .filter_map(|(_, other)| self.items.get(&other))
            .any(|item| last_frame(item) >= start)
    }

    // =========================================================================
    // Create / remove / move
    // =========================================================================

    /// Place a new item. Returns `None` when the row is out of range or
    /// locked, the kind is disabled, the placement is negative or the range
    /// is occupied.
    pub fn create_item(
        &mut self,
        kind: ItemKind,
        row: usize,
        start: i64,
        duration: i64,
        with_connection: bool,
    ) -> Option<ItemId> {
        if row >= self.row_count {
            tracing::warn!(row, row_count = self.row_count, "row out of range");
            return None;
        }
        if self.locked_rows.contains(&row) {
            tracing::warn!(row, "row is locked");
            return None;
        }
        if self.disabled_kinds.contains(&kind) {
            tracing::warn!(kind = kind.type_name(), "item kind is disabled");
            return None;
        }
        if start < 0 || duration < 0 {
            tracing::warn!(start, duration, "negative placement");
            return None;
        }
        if self.is_frame_range_occupied(row, start, duration, None) {
            tracing::warn!(row, start, duration, "frame range already occupied");
            return None;
        }

        let id = ItemId::new(kind.type_code(), row, self.id_index);
        let mut item = create_item(id)?;
        item.set_start(start);
        item.set_duration(duration);
        self.id_index += 1;
        self.place_item(item, with_connection);
        tracing::debug!(item = %id, row, start, duration, "item created");
        Some(id)
    }

    /// Insert an already built item into the store and its row.
    fn place_item(&mut self, item: Item, with_connection: bool) {
        let id = item.id();
        let row = item.row();
        let start = item.start();
        let (old_head, old_tail) = self.boundaries(row);

        self.items.insert(id, item);
        let index = self.rows.entry(row).or_default();
        let position = index.count_before(start);
        let later: Vec<ItemId> = index.after(start).collect();
        index.insert(start, id);
        for later_id in later {
            self.operate_item(later_id, ItemOperation::IncreaseNumber, 1);
        }
        if let Some(item) = self.items.get_mut(&id) {
            item.set_number(position as i64 + 1);
        }
        self.dirty = true;

        self.emit(TimelineEvent::ItemCreated(id));
        self.notify_boundaries(row, old_head, old_tail, false);
        if with_connection {
            self.splice_connections(id);
        }
    }

    /// Delete an item. Unknown ids are ignored; returns whether it was removed.
    pub fn remove_item(&mut self, id: ItemId) -> bool {
        let Some(item) = self.items.get(&id) else {
            tracing::debug!(item = %id, "remove of unknown item ignored");
            return false;
        };
        let row = item.row();
        if self.locked_rows.contains(&row) {
            tracing::warn!(item = %id, row, "row is locked");
            return false;
        }

        self.emit(TimelineEvent::ItemAboutToBeRemoved(id));
        let (old_head, old_tail) = self.boundaries(row);
        self.unlink_connections(id);

        if let Some(index) = self.rows.get_mut(&row) {
            let later: Vec<ItemId> = index
                .start_of(id)
                .map(|start| index.after(start).collect())
                .unwrap_or_default();
            index.remove(id);
            if index.is_empty() {
                self.rows.remove(&row);
            }
            for later_id in later {
                self.operate_item(later_id, ItemOperation::DecreaseNumber, 1);
            }
        }
        self.items.remove(&id);
        self.dirty = true;

        self.emit(TimelineEvent::ItemRemoved(id));
        self.notify_boundaries(row, old_head, old_tail, false);
        tracing::debug!(item = %id, row, "item removed");
        true
    }

    /// Move an item to a new start frame without changing its identity.
    ///
    /// With `clamp_to_range` the start is first clamped so the item fits in
    /// the model's frame bounds. If the move changes the item's neighbours,
    /// the row is renumbered and a connected item is re-spliced between its
    /// new neighbours.
    pub fn modify_item_start(&mut self, id: ItemId, start: i64, clamp_to_range: bool) -> bool {
        let Some(item) = self.items.get(&id) else {
            tracing::warn!(item = %id, "move of unknown item");
            return false;
        };
        let row = item.row();
        let old_start = item.start();
        let duration = item.duration();
        if self.locked_rows.contains(&row) {
            tracing::warn!(item = %id, row, "row is locked");
            return false;
        }

        let start = if clamp_to_range {
            let [minimum, maximum] = self.frame_range;
            start.clamp(minimum, maximum.saturating_sub(duration).max(minimum))
        } else {
            start
        };
        if start < 0 {
            tracing::warn!(item = %id, start, "negative start");
            return false;
        }
        if start == old_start {
            return true;
        }
        if self.is_frame_range_occupied(row, start, duration, Some(id)) {
            tracing::warn!(item = %id, start, duration, "frame range already occupied");
            return false;
        }

        let (old_head, old_tail) = self.boundaries(row);
        let old_neighbours = (self.previous_item(id), self.next_item(id));
        if let Some(index) = self.rows.get_mut(&row) {
            index.remove(id);
            index.insert(start, id);
        }
        if let Some(item) = self.items.get_mut(&id) {
            let roles = item.set_start(start);
            self.dirty = true;
            self.emit(TimelineEvent::ItemChanged { id, roles });
        }

        let new_neighbours = (self.previous_item(id), self.next_item(id));
        if new_neighbours != old_neighbours {
            self.renumber_row(row);
            if self.connections.touches(id) {
                self.remove_connections(id);
                if let (Some(prev), Some(next)) = old_neighbours {
                    self.link(prev, next);
                }
                self.splice_connections(id);
            }
            self.notify_boundaries(row, old_head, old_tail, true);
        }
        true
    }

    /// Give every item of `row` its 1-based position as number.
    fn renumber_row(&mut self, row: usize) {
        for (position, id) in self.items_in_row(row).into_iter().enumerate() {
            let roles = match self.items.get_mut(&id) {
                Some(item) => item.set_number(position as i64 + 1),
                None => continue,
            };
            if !roles.is_empty() {
                self.emit(TimelineEvent::ItemChanged { id, roles });
            }
        }
    }

    fn boundaries(&self, row: usize) -> (Option<ItemId>, Option<ItemId>) {
        (self.head_item(row), self.tail_item(row))
    }

    /// Tell items they gained or lost the head/tail role of `row`.
    ///
    /// For a single insert or removal only one role can change hands; the
    /// head is checked first. A move may change both.
    fn notify_boundaries(
        &mut self,
        row: usize,
        old_head: Option<ItemId>,
        old_tail: Option<ItemId>,
        both: bool,
    ) {
        let (new_head, new_tail) = self.boundaries(row);
        let head_changed = new_head != old_head;
        if head_changed {
            self.hand_over(ItemOperation::UpdateAsHead, new_head, old_head);
        }
        if (both || !head_changed) && new_tail != old_tail {
            self.hand_over(ItemOperation::UpdateAsTail, new_tail, old_tail);
        }
    }

    fn hand_over(&mut self, op: ItemOperation, gained: Option<ItemId>, lost: Option<ItemId>) {
        if let Some(id) = gained {
            self.operate_item(id, op, 1);
        }
        if let Some(id) = lost.filter(|id| self.items.contains_key(id)) {
            self.operate_item(id, op, 0);
        }
    }

    // =========================================================================
    // Properties and operations
    // =========================================================================

    /// Write an item role. Start and duration edits are checked against the
    /// row's placement first.
    pub fn set_item_property(&mut self, id: ItemId, role: ItemRole, value: &PropertyValue) -> bool {
        let Some(item) = self.items.get(&id) else {
            tracing::warn!(item = %id, ?role, "property write on unknown item");
            return false;
        };
        if self.locked_rows.contains(&item.row()) {
            tracing::warn!(item = %id, row = item.row(), "row is locked");
            return false;
        }
        match role {
            ItemRole::Start => {
                return match value.as_i64() {
                    Some(start) => self.modify_item_start(id, start, false),
                    None => false,
                };
            }
            ItemRole::Duration => {
                if let Some(duration) = value.as_i64() {
                    if self.is_frame_range_occupied(item.row(), item.start(), duration, Some(id)) {
                        tracing::warn!(
                            item = %id,
                            start = item.start(),
                            duration,
                            "frame range already occupied"
                        );
                        return false;
                    }
                }
            }
            _ => {}
        }

        let Some(item) = self.items.get_mut(&id) else {
            return false;
        };
        match item.set_property(role, value) {
            Some(roles) => {
                if !roles.is_empty() {
                    self.dirty = true;
                    self.emit(TimelineEvent::ItemChanged { id, roles });
                }
                true
            }
            None => {
                tracing::warn!(item = %id, ?role, ?value, "property value rejected");
                false
            }
        }
    }

    pub fn item_property(&self, id: ItemId, role: ItemRole) -> Option<PropertyValue> {
        self.items.get(&id)?.property(role)
    }

    /// Run a structural operation on an item.
    pub fn request_item_operate(&mut self, id: ItemId, op: ItemOperation, param: i64) -> bool {
        self.operate_item(id, op, param)
    }

    fn operate_item(&mut self, id: ItemId, op: ItemOperation, param: i64) -> bool {
        let Some(item) = self.items.get_mut(&id) else {
            tracing::warn!(item = %id, ?op, "operation on unknown item");
            return false;
        };
        let roles = item.operate(op, param);
        if !roles.is_empty() {
            self.dirty = true;
            self.emit(TimelineEvent::ItemChanged { id, roles });
        }
        if op.is_boundary() {
            self.emit(TimelineEvent::ItemOperateFinished { id, op, param });
        }
        true
    }

    // =========================================================================
    // Connections
    // =========================================================================

    pub fn previous_connection(&self, id: ItemId) -> Option<ItemConnId> {
        self.connections.incoming(id)
    }

    pub fn next_connection(&self, id: ItemId) -> Option<ItemConnId> {
        self.connections.outgoing(id)
    }

    /// All connections ordered by source id.
    pub fn connections(&self) -> Vec<ItemConnId> {
        self.connections.iter().collect()
    }

    /// Link `from -> to`. Both must exist, differ and share a row; links they
    /// already had in that direction are replaced.
    pub fn create_connection(&mut self, from: ItemId, to: ItemId) -> Option<ItemConnId> {
        if from == to || !self.exists(from) || !self.exists(to) || from.row() != to.row() {
            tracing::warn!(%from, %to, "invalid connection");
            return None;
        }
        Some(self.link(from, to))
    }

    fn link(&mut self, from: ItemId, to: ItemId) -> ItemConnId {
        let conn = ItemConnId::new(from, to);
        for displaced in self.connections.insert(conn) {
            self.emit(TimelineEvent::ConnectionRemoved(displaced));
        }
        self.dirty = true;
        self.emit(TimelineEvent::ConnectionCreated(conn));
        conn
    }

    pub fn remove_next_connection(&mut self, id: ItemId) -> Option<ItemConnId> {
        let conn = self.connections.remove_outgoing(id)?;
        self.dirty = true;
        self.emit(TimelineEvent::ConnectionRemoved(conn));
        Some(conn)
    }

    pub fn remove_previous_connection(&mut self, id: ItemId) -> Option<ItemConnId> {
        let conn = self.connections.remove_incoming(id)?;
        self.dirty = true;
        self.emit(TimelineEvent::ConnectionRemoved(conn));
        Some(conn)
    }

    /// Drop both connections of an item.
    pub fn remove_connections(&mut self, id: ItemId) {
        self.remove_previous_connection(id);
        self.remove_next_connection(id);
    }

    /// Chain a freshly placed item between its neighbours.
    fn splice_connections(&mut self, id: ItemId) {
        let prev = self.previous_item(id);
        let next = self.next_item(id);
        if let Some(prev) = prev {
            self.remove_next_connection(prev);
        }
        if let Some(next) = next {
            self.remove_previous_connection(next);
        }
        if let Some(prev) = prev {
            self.link(prev, id);
        }
        if let Some(next) = next {
            self.link(id, next);
        }
    }

    /// Detach an item that is about to leave its position, bridging its
    /// neighbours if it was part of a chain.
    fn unlink_connections(&mut self, id: ItemId) {
        if !self.connections.touches(id) {
            return;
        }
        let prev = self.previous_item(id);
        let next = self.next_item(id);
        self.remove_connections(id);
        if let (Some(prev), Some(next)) = (prev, next) {
            self.link(prev, next);
        }
    }

    // =========================================================================
    // Dirty state
    // =========================================================================

    /// Unsaved changes in the model or any item.
    pub fn is_dirty(&self) -> bool {
        self.dirty || self.items.values().any(Item::is_dirty)
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn reset_dirty(&mut self) {
        self.dirty = false;
        for item in self.items.values_mut() {
            item.reset_dirty();
        }
    }

    /// Remove every item and connection, notifying observers, and restart id
    /// allocation. Row count, bounds and fps are kept.
    pub fn clear(&mut self) {
        let conns: Vec<ItemConnId> = self.connections.iter().collect();
        for conn in conns {
            self.emit(TimelineEvent::ConnectionRemoved(conn));
        }
        self.connections.clear();

        let ids: Vec<ItemId> = self.items.keys().copied().collect();
        for id in &ids {
            self.emit(TimelineEvent::ItemAboutToBeRemoved(*id));
        }
        self.items.clear();
        self.rows.clear();
        for id in ids {
            self.emit(TimelineEvent::ItemRemoved(id));
        }

        self.hidden_rows.clear();
        self.locked_rows.clear();
        self.disabled_kinds.clear();
        self.id_index = FIRST_ID_INDEX;
        self.dirty = false;
    }
}

/// Last frame an item blocks; keyframes block their start frame.
fn last_frame(item: &Item) -> i64 {
    item.start().saturating_add(item.duration().max(1) - 1)
}
