//! Commands behind the code-block and inline-code key bindings.
//!
//! Every command inspects the state it is given and either declines (`None`,
//! leaving the state untouched so the next binding can try) or returns one
//! finished transaction for the view to apply.

use crate::model::{Document, MarkType, Node, NodeKind, Selection, TextRun, Transaction};

use super::geometry::Direction;
use super::CommandContext;

pub fn escape_code_block_right(cx: &CommandContext<'_>) -> Option<Transaction> {
    escape_code_block(cx, Direction::Right)
}

pub fn escape_code_block_down(cx: &CommandContext<'_>) -> Option<Transaction> {
    escape_code_block(cx, Direction::Down)
}

/// Appends an empty paragraph when the cursor is about to leave a code block
/// that ends the document, so there is always somewhere to go.
fn escape_code_block(cx: &CommandContext<'_>, dir: Direction) -> Option<Transaction> {
    let state = cx.state;
    let selection = state.selection();
    if !selection.is_empty() {
        return None;
    }
    let doc = state.doc();
    let to = doc.resolve(selection.to()).ok()?;
    if to.parent().kind() != NodeKind::CodeBlock {
        return None;
    }
    if selection.to() + 1 != doc.content_size() {
        return None;
    }
    if !cx.geometry.end_of_textblock(state, dir) {
        return None;
    }

    let mut tr = state.tr();
    tr.insert(doc.content_size(), Node::empty_paragraph()).ok()?;
    let end = tr.doc().content_size() - 1;
    tr.set_selection(Selection::cursor(end)).ok()?;
    tr.scroll_into_view();
    Some(tr)
}

/// Backspace at the very start of a code block turns the block back into
/// prose: it becomes a paragraph, merges into the paragraph before it, or
/// removes an empty paragraph in front of it.
pub fn delete_code_block_backward(cx: &CommandContext<'_>) -> Option<Transaction> {
    let state = cx.state;
    let selection = state.selection();
    if !selection.is_empty() {
        return None;
    }
    let doc = state.doc();
    let from = doc.resolve(selection.from()).ok()?;
    let depth = from.depth();
    if depth == 0 || from.start(depth) != selection.from() {
        return None;
    }
    let code_block = from.parent();
    if code_block.kind() != NodeKind::CodeBlock {
        return None;
    }

    let code_before = from.before(depth)?;
    let code_after = from.after(depth)?;
    let code_text = collapsed_text(code_block);
    let index = from.index(depth - 1);
    let previous = index
        .checked_sub(1)
        .and_then(|idx| from.node(depth - 1).child(idx));

    let mut tr = state.tr();
    match previous {
        Some(prev) if prev.kind() == NodeKind::Paragraph && prev.is_empty() => {
            let prev_before = code_before - prev.node_size();
            tr.delete(prev_before, code_before).ok()?;
        }
        Some(prev) if prev.kind() == NodeKind::Paragraph => {
            let prev_before = code_before - prev.node_size();
            let mut runs = collapsed_runs(prev);
            let junction = prev_before + 1 + prev.content_size();
            runs.push(TextRun::new(code_text));
            tr.replace_with(prev_before, code_after, vec![Node::paragraph(runs)])
                .ok()?;
            tr.set_selection(Selection::cursor(junction)).ok()?;
        }
        _ => {
            tr.replace_with(
                code_before,
                code_after,
                vec![Node::plain_paragraph(&code_text)],
            )
            .ok()?;
            tr.set_selection(Selection::cursor(code_before + 1)).ok()?;
        }
    }
    tr.scroll_into_view();
    Some(tr)
}

pub fn park_at_code_edge_right(cx: &CommandContext<'_>) -> Option<Transaction> {
    park_at_code_edge(cx, Direction::Right)
}

pub fn park_at_code_edge_left(cx: &CommandContext<'_>) -> Option<Transaction> {
    park_at_code_edge(cx, Direction::Left)
}

/// Holds the caret in place for one keypress when it is about to step off
/// the edge of an inline code run.
///
/// Moving right, the caret parks on the trailing edge of a run (code before
/// it, plain text or the block end after it). Moving left, it parks on the
/// leading edge (code after it, plain text or the block start before it).
fn park_at_code_edge(cx: &CommandContext<'_>, dir: Direction) -> Option<Transaction> {
    let state = cx.state;
    let code = state.schema().mark("code")?;
    let selection = state.selection();
    if !selection.is_empty() {
        return None;
    }
    let doc = state.doc();
    let pos = selection.from();
    let resolved = doc.resolve(pos).ok()?;
    if !resolved.is_in_textblock() {
        return None;
    }
    let depth = resolved.depth();
    let at_start = resolved.start(depth) == pos;
    let at_end = resolved.end(depth) == pos;
    let code_before = !at_start && char_has_mark(doc, pos, code);
    let code_after = !at_end && char_has_mark(doc, pos + 1, code);

    let on_edge = match dir {
        Direction::Right => code_before && !code_after,
        Direction::Left => code_after && !code_before,
        Direction::Up | Direction::Down => false,
    };
    if !on_edge || cx.edge.code_mark_next_char() {
        return None;
    }

    let mut tr = state.tr();
    tr.set_selection(Selection::cursor(pos)).ok()?;
    tr.meta_mut().boundary_park = true;
    tr.scroll_into_view();
    Some(tr)
}

pub fn toggle_bold(cx: &CommandContext<'_>) -> Option<Transaction> {
    toggle_mark(cx, "strong")
}

pub fn toggle_italics(cx: &CommandContext<'_>) -> Option<Transaction> {
    toggle_mark(cx, "italics")
}

/// Standard mark toggle: over a range the mark is removed when every
/// markable character already has it and added otherwise; on a collapsed
/// cursor the stored marks for the next typed character are flipped.
fn toggle_mark(cx: &CommandContext<'_>, name: &str) -> Option<Transaction> {
    let state = cx.state;
    let mark = state.schema().mark(name)?;
    let selection = state.selection();
    let doc = state.doc();
    let mut tr = state.tr();

    if selection.is_empty() {
        let resolved = doc.resolve(selection.head()).ok()?;
        if !resolved.parent().kind().allows_marks() {
            return None;
        }
        let active = state
            .stored_marks()
            .cloned()
            .unwrap_or_else(|| resolved.marks());
        if active.contains(mark) {
            tr.remove_stored_mark(mark);
        } else {
            tr.add_stored_mark(mark);
        }
        return Some(tr);
    }

    let (from, to) = (selection.from(), selection.to());
    let markable = doc.textblock_spans().iter().any(|span| {
        span.node.kind().allows_marks() && from.max(span.start) < to.min(span.end)
    });
    if !markable {
        return None;
    }
    if doc.range_fully_marked(from, to, mark) {
        tr.remove_mark(from, to, mark).ok()?;
    } else {
        tr.add_mark(from, to, mark).ok()?;
    }
    Some(tr)
}

pub fn undo(cx: &CommandContext<'_>) -> Option<Transaction> {
    cx.history.undo(cx.state)
}

pub fn redo(cx: &CommandContext<'_>) -> Option<Transaction> {
    cx.history.redo(cx.state)
}

/// Whether the character just before `pos` carries `mark` (or the one just
/// after, when `pos` starts its block).
pub(crate) fn char_has_mark(doc: &Document, pos: usize, mark: MarkType) -> bool {
    doc.resolve(pos)
        .map(|resolved| resolved.marks().contains(mark))
        .unwrap_or(false)
}

/// Text of a block with newlines flattened to spaces.
pub(crate) fn collapsed_text(node: &Node) -> String {
    node.text_content().replace('\n', " ")
}

fn collapsed_runs(node: &Node) -> Vec<TextRun> {
    node.runs()
        .iter()
        .map(|run| run.with_text(run.text().replace('\n', " ")))
        .collect()
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod commands_tests;
