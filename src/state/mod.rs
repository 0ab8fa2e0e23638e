//! State management module
//!
//! This module contains the timeline's data structures:
//! - ItemId: Packed item identifiers and connection ids
//! - Item: Typed items placed on rows
//! - TimelineModel: The item store, row index and connection graph
//! - Commands: Undo/redo for model edits

mod commands;
mod error;
mod events;
mod item;
mod item_id;
mod model;
mod settings;

pub use commands::*;
pub use error::*;
pub use events::{SubscriptionId, TimelineEvent};
pub use item::*;
pub use item_id::*;
pub use model::*;
pub use settings::*;
