use crate::model::EditorState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

/// Layout questions only a view can answer.
pub trait ViewGeometry {
    /// Whether moving the cursor once in `dir` would leave the textblock that
    /// currently holds the selection head.
    fn end_of_textblock(&self, state: &EditorState, dir: Direction) -> bool;
}

/// Geometry of an unwrapped view: a textblock's lines are exactly its
/// newline-separated segments.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogicalLines;

impl ViewGeometry for LogicalLines {
    fn end_of_textblock(&self, state: &EditorState, dir: Direction) -> bool {
        let head = state.selection().head();
        let Ok(resolved) = state.doc().resolve(head) else {
            return false;
        };
        if !resolved.is_in_textblock() {
            return false;
        }
        let depth = resolved.depth();
        let start = resolved.start(depth);
        let end = resolved.end(depth);
        match dir {
            Direction::Left => head == start,
            Direction::Right => head == end,
            Direction::Up => state
                .doc()
                .text_between(start, head, "")
                .map(|text| !text.contains('\n'))
                .unwrap_or(false),
            Direction::Down => state
                .doc()
                .text_between(head, end, "")
                .map(|text| !text.contains('\n'))
                .unwrap_or(false),
        }
    }
}
