//! Reversible edits.
//!
//! Commands are recorded after their edit has already been applied to the
//! model. They keep only snapshots and ids; the model is handed in on every
//! undo or redo, so a command never holds a reference into it.

use chrono::{DateTime, Utc};

use super::{ItemId, ItemKind, ItemSnapshot, TimelineModel};

/// An edit that can be reverted and re-applied.
pub trait UndoCommand {
    fn undo(&mut self, model: &mut TimelineModel);
    fn redo(&mut self, model: &mut TimelineModel);
    /// Short description shown in menus
    fn text(&self) -> String;
}

fn type_name(id: ItemId) -> &'static str {
    ItemKind::from_type_code(id.type_code()).map_or("Item", |kind| kind.type_name())
}

/// Undo for an item that was just created.
#[derive(Debug, Clone)]
pub struct CreateItemCommand {
    snapshot: ItemSnapshot,
}

impl CreateItemCommand {
    pub fn new(model: &TimelineModel, id: ItemId) -> Option<Self> {
        Some(Self {
            snapshot: model.save_item(id)?,
        })
    }
}

impl UndoCommand for CreateItemCommand {
    fn undo(&mut self, model: &mut TimelineModel) {
        model.remove_item(self.snapshot.id);
    }

    fn redo(&mut self, model: &mut TimelineModel) {
        model.load_item(&self.snapshot);
    }

    fn text(&self) -> String {
        format!("Create {}", type_name(self.snapshot.id))
    }
}

/// Undo for an item about to be deleted; build it before removing the item.
#[derive(Debug, Clone)]
pub struct DeleteItemCommand {
    snapshot: ItemSnapshot,
}

impl DeleteItemCommand {
    pub fn new(model: &TimelineModel, id: ItemId) -> Option<Self> {
        Some(Self {
            snapshot: model.save_item(id)?,
        })
    }
}

impl UndoCommand for DeleteItemCommand {
    fn undo(&mut self, model: &mut TimelineModel) {
        model.load_item(&self.snapshot);
    }

    fn redo(&mut self, model: &mut TimelineModel) {
        model.remove_item(self.snapshot.id);
    }

    fn text(&self) -> String {
        format!("Delete {}", type_name(self.snapshot.id))
    }
}

/// Undo for an item that was moved from `old_start` to where it is now.
#[derive(Debug, Clone)]
pub struct MoveItemCommand {
    id: ItemId,
    old_start: i64,
    new_start: i64,
}

impl MoveItemCommand {
    pub fn new(model: &TimelineModel, id: ItemId, old_start: i64) -> Option<Self> {
        let new_start = model.item(id)?.start();
        Some(Self {
            id,
            old_start,
            new_start,
        })
    }

    fn restore(&self, model: &mut TimelineModel, start: i64) {
        let Some(item) = model.item(self.id) else {
            return;
        };
        if item.start() != start {
            model.modify_item_start(self.id, start, false);
        }
    }
}

impl UndoCommand for MoveItemCommand {
    fn undo(&mut self, model: &mut TimelineModel) {
        self.restore(model, self.old_start);
    }

    fn redo(&mut self, model: &mut TimelineModel) {
        self.restore(model, self.new_start);
    }

    fn text(&self) -> String {
        format!("Move {}", type_name(self.id))
    }
}

struct UndoEntry {
    command: Box<dyn UndoCommand>,
    recorded_at: DateTime<Utc>,
}

/// Linear undo/redo history.
pub struct UndoStack {
    undo: Vec<UndoEntry>,
    redo: Vec<UndoEntry>,
    /// Maximum undo depth; 0 means unlimited
    limit: usize,
    /// Undo depth at which the document was last saved
    clean_index: Option<usize>,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoStack {
    pub fn new() -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            limit: 0,
            clean_index: Some(0),
        }
    }

    /// Keep at most `limit` undo steps, dropping the oldest.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::new()
        }
    }

    /// Record an already applied command. Clears the redo history.
    pub fn push(&mut self, command: Box<dyn UndoCommand>) {
        tracing::debug!(text = %command.text(), "undo step recorded");
        self.undo.push(UndoEntry {
            command,
            recorded_at: Utc::now(),
        });
        if self.clean_index.is_some_and(|index| index >= self.undo.len()) {
            // The clean state lived on the discarded redo branch.
            self.clean_index = None;
        }
        self.redo.clear();
        if self.limit > 0 && self.undo.len() > self.limit {
            let excess = self.undo.len() - self.limit;
            self.undo.drain(..excess);
            self.clean_index = self
                .clean_index
                .and_then(|index| index.checked_sub(excess));
        }
    }

    pub fn undo(&mut self, model: &mut TimelineModel) -> bool {
        let Some(mut entry) = self.undo.pop() else {
            return false;
        };
        tracing::debug!(text = %entry.command.text(), "undo");
        entry.command.undo(model);
        self.redo.push(entry);
        true
    }

    pub fn redo(&mut self, model: &mut TimelineModel) -> bool {
        let Some(mut entry) = self.redo.pop() else {
            return false;
        };
        tracing::debug!(text = %entry.command.text(), "redo");
        entry.command.redo(model);
        self.undo.push(entry);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_text(&self) -> Option<String> {
        self.undo.last().map(|entry| entry.command.text())
    }

    pub fn redo_text(&self) -> Option<String> {
        self.redo.last().map(|entry| entry.command.text())
    }

    /// When the next undo step was recorded.
    pub fn undo_recorded_at(&self) -> Option<DateTime<Utc>> {
        self.undo.last().map(|entry| entry.recorded_at)
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Mark the current position as matching the saved document.
    pub fn set_clean(&mut self) {
        self.clean_index = Some(self.undo.len());
    }

    pub fn is_clean(&self) -> bool {
        self.clean_index == Some(self.undo.len())
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.clean_index = Some(0);
    }
}

impl std::fmt::Debug for UndoStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoStack")
            .field("undo", &self.undo.len())
            .field("redo", &self.redo.len())
            .field("limit", &self.limit)
            .field("clean_index", &self.clean_index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ItemConnId, ItemRole, PropertyValue, TimelineSettings};

    fn model() -> TimelineModel {
        TimelineModel::with_settings(TimelineSettings {
            row_count: 2,
            ..TimelineSettings::default()
        })
    }

    #[test]
    fn test_move_round_trip() {
        let mut model = model();
        let id = model.create_item(ItemKind::Arm, 0, 5, 10, false).unwrap();
        assert!(model.modify_item_start(id, 50, false));

        let mut stack = UndoStack::new();
        stack.push(Box::new(MoveItemCommand::new(&model, id, 5).unwrap()));
        assert_eq!(stack.undo_text().as_deref(), Some("Move Arm"));

        assert!(stack.undo(&mut model));
        assert_eq!(model.item(id).unwrap().start(), 5);
        assert!(stack.redo(&mut model));
        assert_eq!(model.item(id).unwrap().start(), 50);
    }

    #[test]
    fn test_move_of_missing_item_is_noop() {
        let mut model = model();
        let id = model.create_item(ItemKind::Arm, 0, 5, 10, false).unwrap();
        let mut command = MoveItemCommand::new(&model, id, 0).unwrap();
        model.remove_item(id);
        command.undo(&mut model);
        command.redo(&mut model);
        assert!(model.is_empty());
    }

    #[test]
    fn test_create_undo_redo_restores_identity_and_payload() {
        let mut model = model();
        let id = model.create_item(ItemKind::Aim, 1, 10, 5, false).unwrap();
        model.set_item_property(id, ItemRole::Position, &PropertyValue::Vec3([1.0, 2.0, 3.0]));
        let mut stack = UndoStack::new();
        stack.push(Box::new(CreateItemCommand::new(&model, id).unwrap()));

        stack.undo(&mut model);
        assert!(!model.exists(id));
        stack.redo(&mut model);
        assert_eq!(
            model.item_property(id, ItemRole::Position),
            Some(PropertyValue::Vec3([1.0, 2.0, 3.0]))
        );
        assert_eq!(model.item(id).unwrap().start(), 10);
    }

    #[test]
    fn test_delete_undo_restores_connections() {
        let mut model = model();
        let a = model.create_item(ItemKind::Arm, 0, 0, 10, true).unwrap();
        let b = model.create_item(ItemKind::Arm, 0, 20, 10, true).unwrap();
        let c = model.create_item(ItemKind::Arm, 0, 40, 10, true).unwrap();

        let mut stack = UndoStack::new();
        let command = DeleteItemCommand::new(&model, b).unwrap();
        model.remove_item(b);
        stack.push(Box::new(command));
        assert_eq!(model.connections(), vec![ItemConnId::new(a, c)]);
        assert_eq!(stack.undo_text().as_deref(), Some("Delete Arm"));

        stack.undo(&mut model);
        assert_eq!(model.connections(), vec![ItemConnId::new(a, b), ItemConnId::new(b, c)]);
        assert_eq!(model.item(b).unwrap().number(), 2);
        assert_eq!(model.item(c).unwrap().number(), 3);

        stack.redo(&mut model);
        assert!(!model.exists(b));
        assert_eq!(model.connections(), vec![ItemConnId::new(a, c)]);
    }

    #[test]
    fn test_push_clears_redo() {
        let mut model = model();
        let a = model.create_item(ItemKind::Zoom, 0, 0, 0, false).unwrap();
        let mut stack = UndoStack::new();
        stack.push(Box::new(CreateItemCommand::new(&model, a).unwrap()));
        stack.undo(&mut model);
        assert!(stack.can_redo());

        let b = model.create_item(ItemKind::Zoom, 0, 3, 0, false).unwrap();
        stack.push(Box::new(CreateItemCommand::new(&model, b).unwrap()));
        assert!(!stack.can_redo());
        assert_eq!(stack.redo_text(), None);
        assert!(!stack.redo(&mut model));
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut model = model();
        let mut stack = UndoStack::with_limit(2);
        for start in [0, 10, 20] {
            let id = model.create_item(ItemKind::Focus, 0, start, 0, false).unwrap();
            stack.push(Box::new(CreateItemCommand::new(&model, id).unwrap()));
        }
        assert_eq!(stack.undo_depth(), 2);
        assert!(stack.undo(&mut model));
        assert!(stack.undo(&mut model));
        assert!(!stack.undo(&mut model));
        assert_eq!(model.item_count(), 1);
    }

    #[test]
    fn test_clean_state() {
        let mut model = model();
        let mut stack = UndoStack::new();
        assert!(stack.is_clean());

        let id = model.create_item(ItemKind::Arm, 0, 0, 1, false).unwrap();
        stack.push(Box::new(CreateItemCommand::new(&model, id).unwrap()));
        assert!(!stack.is_clean());
        assert!(stack.undo_recorded_at().is_some());

        stack.set_clean();
        stack.undo(&mut model);
        assert!(!stack.is_clean());
        stack.redo(&mut model);
        assert!(stack.is_clean());

        stack.undo(&mut model);
        let other = model.create_item(ItemKind::Arm, 0, 5, 1, false).unwrap();
        stack.push(Box::new(CreateItemCommand::new(&model, other).unwrap()));
        assert!(!stack.is_clean());
    }

    #[test]
    fn test_redo_over_a_later_item_keeps_the_range_occupied() {
        let mut model = model();
        let long = model.create_item(ItemKind::Arm, 0, 0, 100, false).unwrap();
        let mut stack = UndoStack::new();
        stack.push(Box::new(CreateItemCommand::new(&model, long).unwrap()));
        stack.undo(&mut model);

        // Pushing would clear the redo branch, so the short item is not recorded.
        let short = model.create_item(ItemKind::Arm, 0, 5, 5, false).unwrap();
        assert!(stack.redo(&mut model));
        assert!(model.exists(long));
        assert!(model.exists(short));

        assert!(model.is_frame_range_occupied(0, 50, 1, None));
        assert!(model.is_frame_range_occupied(0, 50, 1, Some(short)));
        assert!(!model.is_frame_range_occupied(0, 50, 1, Some(long)));
        assert_eq!(model.create_item(ItemKind::Arm, 0, 50, 1, false), None);
        assert_eq!(model.item_count(), 2);
    }
}
