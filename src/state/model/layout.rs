use super::TimelineModel;
use crate::constants::{HIDDEN_ITEM_Y, MAX_ROW_COUNT};
use crate::state::{ItemId, ItemKind, TimelineEvent};

impl TimelineModel {
    // =========================================================================
    // Rows
    // =========================================================================

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Change the number of rows. Fails when `count` is outside
    /// `1..=MAX_ROW_COUNT` or would drop a row that still holds items.
    pub fn set_row_count(&mut self, count: usize) -> bool {
        if !(1..=MAX_ROW_COUNT).contains(&count) {
            tracing::warn!(count, "row count out of range");
            return false;
        }
        if let Some((&row, _)) = self.rows.range(count..).next() {
            tracing::warn!(count, row, "cannot drop a row that holds items");
            return false;
        }
        if count == self.row_count {
            return true;
        }
        self.row_count = count;
        self.hidden_rows.retain(|&row| row < count);
        self.locked_rows.retain(|&row| row < count);
        self.dirty = true;
        self.emit(TimelineEvent::RowCountChanged(count));
        true
    }

    pub fn is_row_hidden(&self, row: usize) -> bool {
        self.hidden_rows.contains(&row)
    }

    /// Hide or show a row. Items in this row and every later row are asked
    /// to refresh their y.
    pub fn set_row_hidden(&mut self, row: usize, hidden: bool) -> bool {
        if row >= self.row_count {
            return false;
        }
        let changed = if hidden {
            self.hidden_rows.insert(row)
        } else {
            self.hidden_rows.remove(&row)
        };
        if changed {
            self.dirty = true;
            let affected: Vec<ItemId> = self
                .rows
                .range(row..)
                .flat_map(|(_, index)| index.iter().map(|(_, id)| id))
                .collect();
            for id in affected {
                self.emit(TimelineEvent::RequestUpdateItemY(id));
            }
        }
        true
    }

    pub fn is_row_locked(&self, row: usize) -> bool {
        self.locked_rows.contains(&row)
    }

    /// Lock or unlock a row against edits.
    pub fn set_row_locked(&mut self, row: usize, locked: bool) -> bool {
        if row >= self.row_count {
            return false;
        }
        let changed = if locked {
            self.locked_rows.insert(row)
        } else {
            self.locked_rows.remove(&row)
        };
        if changed {
            self.dirty = true;
        }
        true
    }

    pub fn is_kind_disabled(&self, kind: ItemKind) -> bool {
        self.disabled_kinds.contains(&kind)
    }

    /// Disabled kinds cannot be created.
    pub fn set_kind_disabled(&mut self, kind: ItemKind, disabled: bool) {
        let changed = if disabled {
            self.disabled_kinds.insert(kind)
        } else {
            self.disabled_kinds.remove(&kind)
        };
        if changed {
            self.dirty = true;
        }
    }

    pub fn is_item_hidden(&self, id: ItemId) -> bool {
        self.is_row_hidden(id.row())
    }

    pub fn item_height(&self) -> f64 {
        self.item_height
    }

    /// Vertical position of an item: its row index minus the hidden rows
    /// above it, times the item height. Hidden and unknown items report
    /// [`HIDDEN_ITEM_Y`].
    pub fn item_y(&self, id: ItemId) -> f64 {
        if !self.exists(id) || self.is_item_hidden(id) {
            return HIDDEN_ITEM_Y;
        }
        let row = id.row();
        let visible_above = row - self.hidden_rows.range(..row).count();
        visible_above as f64 * self.item_height
    }

    // =========================================================================
    // Frame bounds
    // =========================================================================

    pub fn frame_minimum(&self) -> i64 {
        self.frame_range[0]
    }

    pub fn frame_maximum(&self) -> i64 {
        self.frame_range[1]
    }

    pub fn set_frame_minimum(&mut self, frame: i64) -> bool {
        if frame < 0 || frame > self.frame_range[1] {
            return false;
        }
        if frame != self.frame_range[0] {
            self.frame_range[0] = frame;
            self.dirty = true;
            self.emit(TimelineEvent::FrameMinimumChanged(frame));
        }
        true
    }

    pub fn set_frame_maximum(&mut self, frame: i64) -> bool {
        if frame < self.frame_range[0] {
            return false;
        }
        if frame != self.frame_range[1] {
            self.frame_range[1] = frame;
            self.dirty = true;
            self.emit(TimelineEvent::FrameMaximumChanged(frame));
        }
        true
    }

    pub fn is_frame_in_range(&self, frame: i64) -> bool {
        (self.frame_range[0]..=self.frame_range[1]).contains(&frame)
    }

    pub fn view_frame_minimum(&self) -> i64 {
        self.view_frame_range[0]
    }

    pub fn view_frame_maximum(&self) -> i64 {
        self.view_frame_range[1]
    }

    pub fn set_view_frame_minimum(&mut self, frame: i64) -> bool {
        if frame > self.view_frame_range[1] {
            return false;
        }
        if frame != self.view_frame_range[0] {
            self.view_frame_range[0] = frame;
            self.dirty = true;
            self.emit(TimelineEvent::ViewFrameMinimumChanged(frame));
        }
        true
    }

    pub fn set_view_frame_maximum(&mut self, frame: i64) -> bool {
        if frame < self.view_frame_range[0] {
            return false;
        }
        if frame != self.view_frame_range[1] {
            self.view_frame_range[1] = frame;
            self.dirty = true;
            self.emit(TimelineEvent::ViewFrameMaximumChanged(frame));
        }
        true
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn set_fps(&mut self, fps: f64) -> bool {
        if !fps.is_finite() || fps <= 0.0 {
            tracing::warn!(fps, "invalid frame rate");
            return false;
        }
        if fps != self.fps {
            self.fps = fps;
            self.dirty = true;
            self.emit(TimelineEvent::FpsChanged(fps));
        }
        true
    }
}
