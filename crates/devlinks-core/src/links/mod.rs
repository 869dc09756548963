//! Link collection editing
//!
//! - `buffer`: the pure edit buffer and its transitions
//! - `editor`: reconciliation of the buffer against a [`LinkStore`](crate::backend::LinkStore)

mod buffer;
mod editor;

pub use buffer::{BufferAction, BufferError, LinkBuffer, LinkField, SavePlan};
pub use editor::{EditorError, EditorState, LinkEditor, RemovedEntry, SaveOutcome, SaveStage};
