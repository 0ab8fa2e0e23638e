//! NLA Timeline Model
//!
//! The item store behind a non-linear timeline editor: typed items placed on
//! rows, kept ordered and numbered per row, optionally chained by connections,
//! persisted as JSON and edited through reversible commands.

pub mod constants;
pub mod core;
pub mod state;

pub use state::{
    CreateItemCommand, DeleteItemCommand, Item, ItemConnId, ItemId, ItemKind, ItemOperation,
    ItemRole, LoadError, MoveItemCommand, PropertyValue, RoleMask, TimelineEvent, TimelineModel,
    TimelineSettings, UndoCommand, UndoStack,
};
