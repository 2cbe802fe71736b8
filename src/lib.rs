//! A terminal note editor with ProseMirror-style editing behaviour: input
//! rules for code, edge navigation around inline code and code blocks, and
//! grouped undo history.

pub mod config;
pub mod editor;
pub mod logging;
pub mod model;
pub mod note_file;
pub mod render;
pub mod theme;
