//! Shared timeline constants.

/// Frame rate of a new timeline.
pub const DEFAULT_FPS: f64 = 30.0;
/// Rows of a new timeline.
pub const DEFAULT_ROW_COUNT: usize = 1;
/// Rows are encoded in 8 bits of the item id.
pub const MAX_ROW_COUNT: usize = 256;
/// Vertical size of one row.
pub const DEFAULT_ITEM_HEIGHT: f64 = 30.0;
/// Last frame of a new timeline (100 s at the default rate).
pub const DEFAULT_FRAME_MAXIMUM: i64 = 3000;
/// Y reported for items that are hidden or unknown.
pub const HIDDEN_ITEM_Y: f64 = -10_000.0;
/// First sequence index handed out by a fresh model.
pub const FIRST_ID_INDEX: u64 = 1;
