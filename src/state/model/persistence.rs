use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::connections::ConnectionGraph;
use super::row_index::RowIndex;
use super::TimelineModel;
use crate::constants::{FIRST_ID_INDEX, MAX_ROW_COUNT};
use crate::state::{
    create_item, Item, ItemConnId, ItemId, ItemKind, ItemPayload, LoadError, TimelineEvent,
    TimelineSettings,
};

/// On-disk shape of a timeline.
#[derive(Debug, Serialize, Deserialize)]
struct TimelineDocument {
    id_index: u64,
    row_count: usize,
    /// row -> start -> item
    item_table: BTreeMap<usize, BTreeMap<i64, ItemId>>,
    /// row -> item -> start
    item_table_helper: BTreeMap<usize, BTreeMap<ItemId, i64>>,
    #[serde(default)]
    hidden_rows: Vec<usize>,
    #[serde(default)]
    locked_rows: Vec<usize>,
    #[serde(default)]
    disabled_types: Vec<ItemKind>,
    frame_range: [i64; 2],
    view_frame_range: [i64; 2],
    #[serde(default = "default_fps")]
    fps: f64,
    items: Vec<ItemRecord>,
    #[serde(default)]
    prev_conns: Vec<ConnectionRecord>,
    #[serde(default)]
    next_conns: Vec<ConnectionRecord>,
}

fn default_fps() -> f64 {
    TimelineSettings::default().fps
}

#[derive(Debug, Serialize, Deserialize)]
struct ItemRecord {
    id: ItemId,
    data: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConnectionRecord {
    item_id: ItemId,
    connection: ItemConnId,
}

/// A single item saved on its own, as kept by undo commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub id: ItemId,
    pub data: Value,
    /// The item was chained to a neighbour when saved
    #[serde(default)]
    pub connected: bool,
}

/// A fully validated document, ready to replace the model's contents.
struct Staged {
    document: TimelineDocument,
    order: Vec<ItemId>,
    items: BTreeMap<ItemId, Item>,
    rows: BTreeMap<usize, RowIndex>,
    connections: ConnectionGraph,
}

/// Clipboard form of an item: everything but its placement.
#[derive(Debug, Serialize, Deserialize)]
struct ClipboardItem {
    kind: ItemKind,
    row: usize,
    duration: i64,
    #[serde(default)]
    connected: bool,
    data: Value,
}

impl TimelineModel {
    // =========================================================================
    // Save/Load
    // =========================================================================

    /// Serialize the whole timeline.
    pub fn save(&self) -> Value {
        let document = TimelineDocument {
            id_index: self.id_index,
            row_count: self.row_count,
            item_table: self
                .rows
                .iter()
                .map(|(&row, index)| (row, index.by_start().clone()))
                .collect(),
            item_table_helper: self
                .rows
                .iter()
                .map(|(&row, index)| {
                    let helper = index.by_item().iter().map(|(&id, &start)| (id, start));
                    (row, helper.collect())
                })
                .collect(),
            hidden_rows: self.hidden_rows.iter().copied().collect(),
            locked_rows: self.locked_rows.iter().copied().collect(),
            disabled_types: self.disabled_kinds.iter().copied().collect(),
            frame_range: self.frame_range,
            view_frame_range: self.view_frame_range,
            fps: self.fps,
            items: self
                .items
                .values()
                .map(|item| ItemRecord {
                    id: item.id(),
                    data: item.save(),
                })
                .collect(),
            prev_conns: self
                .connections
                .iter_incoming()
                .map(|connection| ConnectionRecord {
                    item_id: connection.to,
                    connection,
                })
                .collect(),
            next_conns: self
                .connections
                .iter()
                .map(|connection| ConnectionRecord {
                    item_id: connection.from,
                    connection,
                })
                .collect(),
        };
        serde_json::to_value(&document).unwrap_or_else(|err| {
            tracing::error!(%err, "failed to serialize timeline");
            Value::Null
        })
    }

    /// Replace the timeline with a saved document.
    ///
    /// The model is cleared first. The document is validated as a whole
    /// before anything is applied, so on error the model stays empty.
    pub fn load(&mut self, document: &Value) -> Result<(), LoadError> {
        self.clear();
        let staged = stage(document).inspect_err(|err| {
            tracing::error!(%err, "failed to load timeline");
        })?;
        self.commit(staged);
        Ok(())
    }

    /// Write the timeline as pretty JSON.
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(&self.save())?;
        fs::write(path, json)?;
        tracing::info!(path = %path.display(), items = self.items.len(), "timeline saved");
        Ok(())
    }

    /// Read and load a timeline written by [`TimelineModel::save_to`].
    pub fn load_from(&mut self, path: &Path) -> Result<(), LoadError> {
        let json = fs::read_to_string(path)?;
        let document: Value = serde_json::from_str(&json)?;
        self.load(&document)?;
        tracing::info!(path = %path.display(), items = self.items.len(), "timeline loaded");
        Ok(())
    }

    fn commit(&mut self, staged: Staged) {
        let Staged {
            document,
            order,
            items,
            rows,
            connections,
        } = staged;
        let max_sequence = items.keys().map(|id| id.sequence() + 1).max().unwrap_or(FIRST_ID_INDEX);

        self.id_index = document.id_index.max(max_sequence).max(FIRST_ID_INDEX);
        self.items = items;
        self.rows = rows;
        self.connections = connections;
        let row_count = document.row_count;
        self.hidden_rows = document
            .hidden_rows
            .into_iter()
            .filter(|&row| row < row_count)
            .collect();
        self.locked_rows = document
            .locked_rows
            .into_iter()
            .filter(|&row| row < row_count)
            .collect();
        self.disabled_kinds = document.disabled_types.into_iter().collect();

        if self.row_count != document.row_count {
            self.row_count = document.row_count;
            self.emit(TimelineEvent::RowCountChanged(document.row_count));
        }
        let [minimum, maximum] = document.frame_range;
        if self.frame_range != document.frame_range {
            self.frame_range = document.frame_range;
            self.emit(TimelineEvent::FrameMinimumChanged(minimum));
            self.emit(TimelineEvent::FrameMaximumChanged(maximum));
        }
        let [view_minimum, view_maximum] = document.view_frame_range;
        if self.view_frame_range != document.view_frame_range {
            self.view_frame_range = document.view_frame_range;
            self.emit(TimelineEvent::ViewFrameMinimumChanged(view_minimum));
            self.emit(TimelineEvent::ViewFrameMaximumChanged(view_maximum));
        }
        if document.fps.is_finite() && document.fps > 0.0 && self.fps != document.fps {
            self.fps = document.fps;
            self.emit(TimelineEvent::FpsChanged(document.fps));
        }

        for id in order {
            self.emit(TimelineEvent::ItemCreated(id));
        }
        let conns: Vec<ItemConnId> = self.connections.iter().collect();
        for conn in conns {
            self.emit(TimelineEvent::ConnectionCreated(conn));
        }
        self.reset_dirty();
    }

    // =========================================================================
    // Single items
    // =========================================================================

    /// Save one item together with whether it is chained to a neighbour.
    pub fn save_item(&self, id: ItemId) -> Option<ItemSnapshot> {
        let item = self.items.get(&id)?;
        Some(ItemSnapshot {
            id,
            data: item.save(),
            connected: self.connections.touches(id),
        })
    }

    /// Recreate an item under its saved id.
    ///
    /// Placement is restored as saved without re-running the occupancy check;
    /// fails if the id is taken, the row is unusable or another item already
    /// starts on the same frame.
    pub fn load_item(&mut self, snapshot: &ItemSnapshot) -> Option<ItemId> {
        let id = snapshot.id;
        if self.items.contains_key(&id) {
            tracing::warn!(item = %id, "item already exists");
            return None;
        }
        let row = id.row();
        if row >= self.row_count || self.locked_rows.contains(&row) {
            tracing::warn!(item = %id, row, "row unavailable for item");
            return None;
        }
        let mut item = create_item(id)?;
        item.load(&snapshot.data).ok()?;
        let start_taken = self
            .rows
            .get(&row)
            .is_some_and(|index| index.by_start().contains_key(&item.start()));
        if start_taken {
            tracing::warn!(item = %id, start = item.start(), "start frame already taken");
            return None;
        }

        self.id_index = self.id_index.max(id.sequence() + 1);
        self.place_item(item, snapshot.connected);
        Some(id)
    }

    // =========================================================================
    // Clipboard
    // =========================================================================

    /// Serialize an item for pasting elsewhere on the timeline.
    pub fn copy_item(&self, id: ItemId) -> Option<String> {
        let item = self.items.get(&id)?;
        let clip = ClipboardItem {
            kind: item.kind(),
            row: item.row(),
            duration: item.duration(),
            connected: self.connections.touches(id),
            data: item.save(),
        };
        serde_json::to_string(&clip)
            .inspect_err(|err| tracing::error!(item = %id, %err, "failed to copy item"))
            .ok()
    }

    /// Create a new item from [`TimelineModel::copy_item`] output, starting at
    /// `start` in the row it was copied from.
    pub fn paste_item(&mut self, text: &str, start: i64) -> Option<ItemId> {
        let clip: ClipboardItem = serde_json::from_str(text)
            .inspect_err(|err| tracing::warn!(%err, "clipboard does not hold an item"))
            .ok()?;
        if let Err(err) = ItemPayload::from_json(clip.kind, &clip.data) {
            tracing::warn!(kind = clip.kind.type_name(), %err, "clipboard item data is malformed");
            return None;
        }
        let id = self.create_item(clip.kind, clip.row, start, clip.duration, clip.connected)?;
        let loaded = self.items.get_mut(&id).map(|item| item.load_payload(&clip.data));
        let roles = match loaded {
            Some(Ok(roles)) => roles,
            Some(Err(err)) => {
                tracing::warn!(item = %id, %err, "pasted item data rejected");
                self.remove_item(id);
                return None;
            }
            None => return None,
        };
        if !roles.is_empty() {
            self.emit(TimelineEvent::ItemChanged { id, roles });
        }
        Some(id)
    }
}

/// Parse and cross-check a document without touching the model.
fn stage(value: &Value) -> Result<Staged, LoadError> {
    let document = TimelineDocument::deserialize(value)?;
    if !(1..=MAX_ROW_COUNT).contains(&document.row_count) {
        return Err(LoadError::InvalidRowCount(document.row_count));
    }

    let mut order = Vec::with_capacity(document.items.len());
    let mut items = BTreeMap::new();
    for record in &document.items {
        let id = record.id;
        if ItemKind::from_type_code(id.type_code()).is_none() {
            return Err(LoadError::UnknownItemType {
                id,
                type_code: id.type_code(),
            });
        }
        if id.row() >= document.row_count {
            return Err(LoadError::RowOutOfRange {
                id,
                row: id.row(),
                row_count: document.row_count,
            });
        }
        if items.contains_key(&id) {
            return Err(LoadError::DuplicateItem(id));
        }
        let Some(mut item) = create_item(id) else {
            return Err(LoadError::UnknownItemType {
                id,
                type_code: id.type_code(),
            });
        };
        item.load(&record.data)?;
        items.insert(id, item);
        order.push(id);
    }

    let mut rows: BTreeMap<usize, RowIndex> = BTreeMap::new();
    let mut indexed = BTreeSet::new();
    for (&row, table) in &document.item_table {
        for (&start, &id) in table {
            let placed = items
                .get(&id)
                .is_some_and(|item| item.row() == row && item.start() == start);
            if !placed || !rows.entry(row).or_default().insert(start, id) {
                return Err(LoadError::InconsistentIndex(id));
            }
            indexed.insert(id);
        }
    }
    for (row, helper) in &document.item_table_helper {
        for (&id, &start) in helper {
            let agrees = rows.get(row).and_then(|index| index.start_of(id)) == Some(start);
            if !agrees {
                return Err(LoadError::InconsistentIndex(id));
            }
        }
        let indexed_in_row = rows.get(row).map_or(0, RowIndex::len);
        if helper.len() != indexed_in_row {
            let missing = rows.get(row).and_then(|index| {
                index
                    .iter()
                    .map(|(_, id)| id)
                    .find(|id| !helper.contains_key(id))
            });
            return Err(LoadError::InconsistentIndex(missing.unwrap_or(ItemId::INVALID)));
        }
    }
    if let Some(&missing) = order.iter().find(|id| !indexed.contains(*id)) {
        return Err(LoadError::InconsistentIndex(missing));
    }
    rows.retain(|_, index| !index.is_empty());

    let mut connections = ConnectionGraph::default();
    for record in &document.next_conns {
        let conn = record.connection;
        let dangling = conn.from != record.item_id
            || conn.from == conn.to
            || !items.contains_key(&conn.from)
            || !items.contains_key(&conn.to)
            || conn.from.row() != conn.to.row();
        if dangling || !connections.insert(conn).is_empty() {
            return Err(LoadError::DanglingConnection {
                from: conn.from,
                to: conn.to,
            });
        }
    }
    for record in &document.prev_conns {
        let conn = record.connection;
        if conn.to != record.item_id || connections.incoming(record.item_id) != Some(conn) {
            return Err(LoadError::DanglingConnection {
                from: conn.from,
                to: conn.to,
            });
        }
    }
    if document.prev_conns.len() != connections.len() {
        let unmatched = connections
            .iter_incoming()
            .find(|conn| !document.prev_conns.iter().any(|record| record.connection == *conn));
        if let Some(conn) = unmatched {
            return Err(LoadError::DanglingConnection {
                from: conn.from,
                to: conn.to,
            });
        }
    }

    Ok(Staged {
        document,
        order,
        items,
        rows,
        connections,
    })
}
