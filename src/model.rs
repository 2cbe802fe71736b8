//! Immutable tree documents, positions and transactions.
//!
//! Positions are character offsets into a flattened token stream: every block
//! contributes an open token, its content and a close token, while the root
//! contributes none. A paragraph holding `ab` at the start of a document thus
//! spans positions `0..4`, with its text between `1` and `3`.

use thiserror::Error;

mod history;
mod node;
mod position;
mod schema;
mod selection;
mod state;
mod transform;

pub use history::History;
pub use node::{Document, MarkSet, Node, TextRun, TextblockSpan};
pub use position::ResolvedPos;
pub use schema::{MarkType, NodeKind, Schema};
pub use selection::Selection;
pub use state::{EditorState, EditorStateBuilder};
pub use transform::{HistoryAction, InputRuleRecord, Transaction, TransactionMeta, TransformError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("position {pos} is outside the document (size {size})")]
    PositionOutOfRange { pos: usize, size: usize },
    #[error("range start {from} lies after its end {to}")]
    InvertedRange { from: usize, to: usize },
}
