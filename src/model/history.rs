use std::time::{Duration, Instant};

use super::node::Document;
use super::selection::Selection;
use super::state::EditorState;
use super::transform::{HistoryAction, Transaction};

#[derive(Clone, Debug, PartialEq, Eq)]
struct Entry {
    doc: Document,
    selection: Selection,
}

/// Linear undo/redo stack of document snapshots.
///
/// Undo and redo are ordinary transactions tagged with a [`HistoryAction`];
/// the stack itself only changes in [`History::record`], when the editor
/// applies a transaction.
#[derive(Clone, Debug)]
pub struct History {
    done: Vec<Entry>,
    undone: Vec<Entry>,
    depth: usize,
    group_delay: Duration,
    last_typing: Option<Instant>,
}

impl History {
    pub fn new(depth: usize, group_delay: Duration) -> Self {
        Self {
            done: Vec::new(),
            undone: Vec::new(),
            depth: depth.max(1),
            group_delay,
            last_typing: None,
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.done.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.undone.len()
    }

    /// Transaction restoring the most recent undo snapshot.
    pub fn undo(&self, state: &EditorState) -> Option<Transaction> {
        let entry = self.done.last()?;
        Some(restore(state, entry, HistoryAction::Undo))
    }

    pub fn redo(&self, state: &EditorState) -> Option<Transaction> {
        let entry = self.undone.last()?;
        Some(restore(state, entry, HistoryAction::Redo))
    }

    /// Updates the stacks for a transaction about to be applied to `before`.
    pub fn record(&mut self, before: &EditorState, tr: &Transaction, now: Instant) {
        let snapshot = Entry {
            doc: before.doc().clone(),
            selection: before.selection(),
        };
        match tr.meta().history {
            Some(HistoryAction::Undo) => {
                self.done.pop();
                self.undone.push(snapshot);
                self.last_typing = None;
            }
            Some(HistoryAction::Redo) => {
                self.undone.pop();
                self.push_done(snapshot);
                self.last_typing = None;
            }
            Some(HistoryAction::RevertInputRule) => {
                self.undone.clear();
                self.last_typing = None;
            }
            None => {
                if !tr.doc_changed() || !tr.meta().add_to_history {
                    return;
                }
                self.undone.clear();
                let joins_previous = tr.meta().typing
                    && self
                        .last_typing
                        .is_some_and(|last| now.duration_since(last) <= self.group_delay);
                if !joins_previous {
                    self.push_done(snapshot);
                }
                self.last_typing = tr.meta().typing.then_some(now);
            }
        }
    }

    fn push_done(&mut self, entry: Entry) {
        self.done.push(entry);
        if self.done.len() > self.depth {
            self.done.remove(0);
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(100, Duration::from_millis(500))
    }
}

fn restore(state: &EditorState, entry: &Entry, action: HistoryAction) -> Transaction {
    let mut tr = state.tr();
    tr.reset(entry.doc.clone(), entry.selection);
    tr.scroll_into_view();
    tr.meta_mut().history = Some(action);
    tr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MarkSet, Node};

    fn apply(history: &mut History, state: &EditorState, tr: Transaction, now: Instant) -> EditorState {
        history.record(state, &tr, now);
        state.apply(tr)
    }

    fn typed(state: &EditorState, text: &str) -> Transaction {
        let pos = state.selection().head();
        let mut tr = state.tr();
        tr.insert_text(pos, text, MarkSet::empty()).unwrap();
        tr.meta_mut().typing = true;
        tr
    }

    #[test]
    fn undo_and_redo_walk_the_stack() {
        let mut history = History::default();
        let now = Instant::now();
        let initial = EditorState::new(Document::new(vec![Node::plain_paragraph("")]));

        let mut tr = initial.tr();
        tr.insert_text(1, "a", MarkSet::empty()).unwrap();
        let first = apply(&mut history, &initial, tr, now);

        let undo = history.undo(&first).unwrap();
        let undone = apply(&mut history, &first, undo, now);
        assert_eq!(undone.doc(), initial.doc());
        assert_eq!(undone.selection(), initial.selection());
        assert_eq!(history.undo_depth(), 0);

        let redo = history.redo(&undone).unwrap();
        let redone = apply(&mut history, &undone, redo, now);
        assert_eq!(redone.doc(), first.doc());
        assert!(history.redo(&redone).is_none());
    }

    #[test]
    fn quick_typing_shares_one_step() {
        let mut history = History::default();
        let now = Instant::now();
        let mut state = EditorState::new(Document::empty());
        for (idx, ch) in ["a", "b", "c"].iter().enumerate() {
            let tr = typed(&state, ch);
            state = apply(&mut history, &state, tr, now + Duration::from_millis(idx as u64 * 100));
        }
        assert_eq!(history.undo_depth(), 1);

        let tr = typed(&state, "d");
        apply(&mut history, &state, tr, now + Duration::from_secs(5));
        assert_eq!(history.undo_depth(), 2);
    }

    #[test]
    fn depth_is_bounded() {
        let mut history = History::new(2, Duration::ZERO);
        let now = Instant::now();
        let mut state = EditorState::new(Document::empty());
        for _ in 0..4 {
            let pos = state.selection().head();
            let mut tr = state.tr();
            tr.insert_text(pos, "x", MarkSet::empty()).unwrap();
            state = apply(&mut history, &state, tr, now);
        }
        assert_eq!(history.undo_depth(), 2);
    }

    #[test]
    fn reverting_an_input_rule_adds_no_step() {
        let mut history = History::default();
        let now = Instant::now();
        let initial = EditorState::new(Document::new(vec![Node::plain_paragraph("``")]));

        let mut tr = initial.tr();
        tr.replace_with(0, 4, vec![Node::code_block("")]).unwrap();
        let rewritten = apply(&mut history, &initial, tr, now);
        assert_eq!(history.undo_depth(), 1);

        let mut tr = rewritten.tr();
        tr.reset(Document::new(vec![Node::plain_paragraph("```")]), Selection::cursor(4));
        tr.meta_mut().history = Some(HistoryAction::RevertInputRule);
        let reverted = apply(&mut history, &rewritten, tr, now);
        assert_eq!(history.undo_depth(), 1);

        let undo = history.undo(&reverted).unwrap();
        let undone = apply(&mut history, &reverted, undo, now);
        assert_eq!(undone.doc(), initial.doc());
    }

    #[test]
    fn selection_only_changes_are_not_recorded() {
        let mut history = History::default();
        let state = EditorState::new(Document::new(vec![Node::plain_paragraph("ab")]));
        let mut tr = state.tr();
        tr.set_selection(crate::model::Selection::cursor(2)).unwrap();
        apply(&mut history, &state, tr, Instant::now());
        assert_eq!(history.undo_depth(), 0);
    }
}
