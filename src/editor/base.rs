//! Plain editing: typing, line breaks, deletion and caret motion.

use crate::model::{
    Document, EditorState, MarkSet, Node, NodeKind, Selection, TextblockSpan, Transaction,
};

use super::CommandContext;

/// Replaces the selection with `text`, carrying the stored marks or the marks
/// at the cursor.
pub fn insert_text(state: &EditorState, text: &str) -> Option<Transaction> {
    let mut tr = state.tr();
    let selection = state.selection();
    let marks = match state.stored_marks() {
        Some(marks) => marks.clone(),
        None => state
            .doc()
            .resolve(selection.from())
            .ok()?
            .marks(),
    };
    if !selection.is_empty() {
        delete_range(&mut tr, selection.from(), selection.to())?;
    }
    let pos = tr.selection().from();
    tr.insert_text(pos, text, marks).ok()?;
    tr.set_selection(Selection::cursor(pos + text.chars().count()))
        .ok()?;
    tr.meta_mut().typing = true;
    tr.scroll_into_view();
    Some(tr)
}

/// Enter: a newline inside code blocks, otherwise splits the textblock.
pub fn split_block(cx: &CommandContext<'_>) -> Option<Transaction> {
    let state = cx.state;
    let mut tr = state.tr();
    let selection = state.selection();
    if !selection.is_empty() {
        delete_range(&mut tr, selection.from(), selection.to())?;
    }
    let pos = tr.selection().from();
    let (block, before, after, offset) = {
        let resolved = tr.doc().resolve(pos).ok()?;
        let depth = resolved.depth();
        if !resolved.is_in_textblock() {
            return None;
        }
        (
            resolved.parent().clone(),
            resolved.before(depth)?,
            resolved.after(depth)?,
            resolved.parent_offset(),
        )
    };

    let kind = block.kind();
    if kind == NodeKind::CodeBlock {
        tr.insert_text(pos, "\n", MarkSet::empty()).ok()?;
        tr.set_selection(Selection::cursor(pos + 1)).ok()?;
    } else {
        let total = block.content_size();
        let left = Node::textblock(kind, block.slice_runs(0, offset));
        let right_kind = match kind {
            NodeKind::Heading { .. } if offset == total => NodeKind::Paragraph,
            other => other,
        };
        let right = Node::textblock(right_kind, block.slice_runs(offset, total));
        let cursor = before + left.node_size() + 1;
        tr.replace_with(before, after, vec![left, right]).ok()?;
        tr.set_selection(Selection::cursor(cursor)).ok()?;
    }
    tr.scroll_into_view();
    Some(tr)
}

/// Backspace: deletes the selection, the previous character, or joins the
/// block with the textblock before it.
pub fn delete_backward(cx: &CommandContext<'_>) -> Option<Transaction> {
    let state = cx.state;
    let selection = state.selection();
    let mut tr = state.tr();
    if !selection.is_empty() {
        delete_range(&mut tr, selection.from(), selection.to())?;
        tr.scroll_into_view();
        return Some(tr);
    }
    let pos = selection.head();
    let resolved = state.doc().resolve(pos).ok()?;
    let depth = resolved.depth();
    if !resolved.is_in_textblock() || depth == 0 {
        return None;
    }
    if resolved.parent_offset() > 0 {
        tr.delete(pos - 1, pos).ok()?;
        tr.set_selection(Selection::cursor(pos - 1)).ok()?;
    } else {
        let index = resolved.index(depth - 1);
        let prev = index
            .checked_sub(1)
            .and_then(|idx| resolved.node(depth - 1).child(idx))?;
        let block_before = resolved.before(depth)?;
        join_textblocks(
            &mut tr,
            prev,
            resolved.parent(),
            block_before - prev.node_size(),
            resolved.after(depth)?,
        )?;
    }
    tr.scroll_into_view();
    Some(tr)
}

/// Delete: the forward mirror of [`delete_backward`].
pub fn delete_forward(cx: &CommandContext<'_>) -> Option<Transaction> {
    let state = cx.state;
    let selection = state.selection();
    let mut tr = state.tr();
    if !selection.is_empty() {
        delete_range(&mut tr, selection.from(), selection.to())?;
        tr.scroll_into_view();
        return Some(tr);
    }
    let pos = selection.head();
    let resolved = state.doc().resolve(pos).ok()?;
    let depth = resolved.depth();
    if !resolved.is_in_textblock() || depth == 0 {
        return None;
    }
    if pos < resolved.end(depth) {
        tr.delete(pos, pos + 1).ok()?;
    } else {
        let next = resolved.node(depth - 1).child(resolved.index(depth - 1) + 1)?;
        let block_after = resolved.after(depth)?;
        join_textblocks(
            &mut tr,
            resolved.parent(),
            next,
            resolved.before(depth)?,
            block_after + next.node_size(),
        )?;
    }
    tr.scroll_into_view();
    Some(tr)
}

pub fn move_left(cx: &CommandContext<'_>) -> Option<Transaction> {
    horizontal(cx.state, -1, false)
}

pub fn move_right(cx: &CommandContext<'_>) -> Option<Transaction> {
    horizontal(cx.state, 1, false)
}

pub fn extend_left(cx: &CommandContext<'_>) -> Option<Transaction> {
    horizontal(cx.state, -1, true)
}

pub fn extend_right(cx: &CommandContext<'_>) -> Option<Transaction> {
    horizontal(cx.state, 1, true)
}

pub fn move_up(cx: &CommandContext<'_>) -> Option<Transaction> {
    vertical(cx.state, -1)
}

pub fn move_down(cx: &CommandContext<'_>) -> Option<Transaction> {
    vertical(cx.state, 1)
}

pub fn line_start(cx: &CommandContext<'_>) -> Option<Transaction> {
    let state = cx.state;
    let head = state.selection().head();
    let (span, offset) = locate(state.doc(), head)?;
    let text = span_text(&span);
    let line_offset = line_start_offset(&text, offset);
    move_to(state, span.start + line_offset)
}

pub fn line_end(cx: &CommandContext<'_>) -> Option<Transaction> {
    let state = cx.state;
    let head = state.selection().head();
    let (span, offset) = locate(state.doc(), head)?;
    let text = span_text(&span);
    let chars: Vec<char> = text.chars().collect();
    let line_end = chars[offset..]
        .iter()
        .position(|ch| *ch == '\n')
        .map_or(chars.len(), |idx| offset + idx);
    move_to(state, span.start + line_end)
}

pub fn select_all(cx: &CommandContext<'_>) -> Option<Transaction> {
    let state = cx.state;
    let doc = state.doc();
    let start = Selection::at_start(doc).head();
    let end = Selection::at_end(doc).head();
    let mut tr = state.tr();
    tr.set_selection(Selection::range(start, end)).ok()?;
    Some(tr)
}

fn move_to(state: &EditorState, pos: usize) -> Option<Transaction> {
    let mut tr = state.tr();
    tr.set_selection(Selection::cursor(pos)).ok()?;
    tr.scroll_into_view();
    Some(tr)
}

fn horizontal(state: &EditorState, step: isize, extend: bool) -> Option<Transaction> {
    let selection = state.selection();
    if !extend && !selection.is_empty() {
        let target = if step < 0 {
            selection.from()
        } else {
            selection.to()
        };
        return move_to(state, target);
    }

    let doc = state.doc();
    let spans = doc.textblock_spans();
    let head = selection.head();
    let idx = spans
        .iter()
        .position(|span| span.start <= head && head <= span.end)?;
    let span = &spans[idx];
    let target = if step < 0 {
        if head > span.start {
            head - 1
        } else {
            spans.get(idx.checked_sub(1)?)?.end
        }
    } else if head < span.end {
        head + 1
    } else {
        spans.get(idx + 1)?.start
    };

    let mut tr = state.tr();
    let next = if extend {
        Selection::range(selection.anchor(), target)
    } else {
        Selection::cursor(target)
    };
    tr.set_selection(next).ok()?;
    tr.scroll_into_view();
    Some(tr)
}

/// Moves to the neighbouring logical line, keeping the column where the
/// target line is long enough.
fn vertical(state: &EditorState, step: isize) -> Option<Transaction> {
    let doc = state.doc();
    let spans = doc.textblock_spans();
    let head = state.selection().head();
    let idx = spans
        .iter()
        .position(|span| span.start <= head && head <= span.end)?;
    let span = &spans[idx];
    let text: Vec<char> = span_text(span).chars().collect();
    let offset = head - span.start;
    let line_start = line_start_offset_chars(&text, offset);
    let column = offset - line_start;

    let target = if step < 0 {
        if line_start > 0 {
            let prev_start = line_start_offset_chars(&text, line_start - 1);
            span.start + prev_start + column.min(line_start - 1 - prev_start)
        } else {
            let prev = spans.get(idx.checked_sub(1)?)?;
            let prev_text: Vec<char> = span_text(prev).chars().collect();
            let last_start = line_start_offset_chars(&prev_text, prev_text.len());
            prev.start + last_start + column.min(prev_text.len() - last_start)
        }
    } else {
        match text[offset..].iter().position(|ch| *ch == '\n') {
            Some(rel) => {
                let next_start = offset + rel + 1;
                let next_len = text[next_start..]
                    .iter()
                    .position(|ch| *ch == '\n')
                    .unwrap_or(text.len() - next_start);
                span.start + next_start + column.min(next_len)
            }
            None => {
                let next = spans.get(idx + 1)?;
                let next_text: Vec<char> = span_text(next).chars().collect();
                let first_len = next_text
                    .iter()
                    .position(|ch| *ch == '\n')
                    .unwrap_or(next_text.len());
                next.start + column.min(first_len)
            }
        }
    };
    move_to(state, target)
}

/// Deletes `from..to`, which may span sibling textblocks. The first block
/// keeps its kind and absorbs what is left of the last one.
fn delete_range(tr: &mut Transaction, from: usize, to: usize) -> Option<()> {
    let (same_parent, first, last, first_before, last_after, from_offset, to_offset) = {
        let doc = tr.doc();
        let rfrom = doc.resolve(from).ok()?;
        let rto = doc.resolve(to).ok()?;
        if !rfrom.is_in_textblock() || !rto.is_in_textblock() {
            return None;
        }
        if rfrom.same_parent(&rto) {
            (true, None, None, 0, 0, 0, 0)
        } else {
            let depth = rfrom.depth();
            if rto.depth() != depth || rfrom.path_to(depth - 1) != rto.path_to(depth - 1) {
                return None;
            }
            (
                false,
                Some(rfrom.parent().clone()),
                Some(rto.parent().clone()),
                rfrom.before(depth)?,
                rto.after(depth)?,
                rfrom.parent_offset(),
                rto.parent_offset(),
            )
        }
    };

    if same_parent {
        tr.delete(from, to).ok()?;
    } else {
        let first = first?;
        let last = last?;
        let mut runs = first.slice_runs(0, from_offset);
        runs.extend(last.slice_runs(to_offset, last.content_size()));
        let merged = Node::textblock(first.kind(), runs);
        tr.replace_with(first_before, last_after, vec![merged]).ok()?;
    }
    tr.set_selection(Selection::cursor(from)).ok()?;
    Some(())
}

/// Merges `second` into `first`, which must be adjacent siblings spanning
/// `first_before..second_after`. Only textblocks join; the cursor lands at
/// the seam.
fn join_textblocks(
    tr: &mut Transaction,
    first: &Node,
    second: &Node,
    first_before: usize,
    second_after: usize,
) -> Option<()> {
    if !first.is_textblock() || !second.is_textblock() {
        return None;
    }
    let mut runs = first.runs().to_vec();
    runs.extend(second.runs().iter().cloned());
    let merged = Node::textblock(first.kind(), runs);
    let seam = first_before + 1 + first.content_size();
    tr.replace_with(first_before, second_after, vec![merged])
        .ok()?;
    tr.set_selection(Selection::cursor(seam)).ok()?;
    Some(())
}

fn locate<'a>(doc: &'a Document, pos: usize) -> Option<(TextblockSpan<'a>, usize)> {
    doc.textblock_spans()
        .into_iter()
        .find(|span| span.start <= pos && pos <= span.end)
        .map(|span| (span, pos - span.start))
}

fn span_text(span: &TextblockSpan<'_>) -> String {
    span.node.text_content()
}

fn line_start_offset(text: &str, offset: usize) -> usize {
    let chars: Vec<char> = text.chars().collect();
    line_start_offset_chars(&chars, offset)
}

fn line_start_offset_chars(chars: &[char], offset: usize) -> usize {
    chars[..offset.min(chars.len())]
        .iter()
        .rposition(|ch| *ch == '\n')
        .map_or(0, |idx| idx + 1)
}
