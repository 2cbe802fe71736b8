use thiserror::Error;

use super::node::{Document, MarkSet, Node, TextRun, map_run_marks, normalize_runs, slice_runs};
use super::schema::{MarkType, NodeKind};
use super::selection::Selection;
use super::state::EditorState;
use super::ModelError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("positions {from} and {to} do not share a parent block")]
    MismatchedRange { from: usize, to: usize },
    #[error("range {from}..{to} does not lie inside a single textblock")]
    NotInTextblock { from: usize, to: usize },
    #[error("{child} cannot be placed inside {parent}")]
    InvalidContent { parent: NodeKind, child: NodeKind },
    #[error("selection {anchor}..{head} does not point into a textblock")]
    InvalidSelection { anchor: usize, head: usize },
}

/// Which history operation produced a transaction, if any.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryAction {
    Undo,
    Redo,
    /// Turns the latest input-rule rewrite back into plain typing. The
    /// rewrite's own undo step still leads back to the state before it.
    RevertInputRule,
}

/// Text input that was turned into an input-rule rewrite instead of being
/// inserted. Kept so the rewrite can be reverted into plain typing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputRuleRecord {
    pub rule: &'static str,
    pub from: usize,
    pub to: usize,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionMeta {
    pub add_to_history: bool,
    pub history: Option<HistoryAction>,
    pub input_rule: Option<InputRuleRecord>,
    pub boundary_park: bool,
    /// Plain typed text; consecutive typing transactions share one undo step.
    pub typing: bool,
}

impl Default for TransactionMeta {
    fn default() -> Self {
        Self {
            add_to_history: true,
            history: None,
            input_rule: None,
            boundary_park: false,
            typing: false,
        }
    }
}

/// An ordered batch of edits against one editor state.
///
/// Every step is applied to a private working copy as soon as it is added
/// and is validated first; a step that fails leaves the working copy as it
/// was and returns an error, and a caller that sees an error drops the whole
/// transaction. Nothing reaches an [`EditorState`] until
/// [`EditorState::apply`] consumes a finished transaction.
#[derive(Clone, Debug)]
pub struct Transaction {
    doc_before: Document,
    selection_before: Selection,
    doc: Document,
    selection: Selection,
    stored_marks: Option<MarkSet>,
    steps: usize,
    selection_set: bool,
    scroll_into_view: bool,
    meta: TransactionMeta,
}

impl Transaction {
    pub fn new(state: &EditorState) -> Self {
        Self {
            doc_before: state.doc().clone(),
            selection_before: state.selection(),
            doc: state.doc().clone(),
            selection: state.selection(),
            stored_marks: state.stored_marks().cloned(),
            steps: 0,
            selection_set: false,
            scroll_into_view: false,
            meta: TransactionMeta::default(),
        }
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn doc_before(&self) -> &Document {
        &self.doc_before
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn selection_before(&self) -> Selection {
        self.selection_before
    }

    pub fn stored_marks(&self) -> Option<&MarkSet> {
        self.stored_marks.as_ref()
    }

    pub fn doc_changed(&self) -> bool {
        self.steps > 0
    }

    pub fn step_count(&self) -> usize {
        self.steps
    }

    pub fn selection_set(&self) -> bool {
        self.selection_set
    }

    pub fn scrolled_into_view(&self) -> bool {
        self.scroll_into_view
    }

    pub fn meta(&self) -> &TransactionMeta {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut TransactionMeta {
        &mut self.meta
    }

    /// Replaces the sibling blocks between `from` and `to` with `nodes`.
    ///
    /// Both positions must sit between blocks of the same parent. Positions
    /// inside the replaced range map to its new end.
    pub fn replace_with(
        &mut self,
        from: usize,
        to: usize,
        nodes: Vec<Node>,
    ) -> Result<&mut Self, TransformError> {
        self.doc.check_range(from, to)?;
        let (path, start_index, end_index, parent_kind) = {
            let rfrom = self.doc.resolve(from)?;
            let rto = self.doc.resolve(to)?;
            if rfrom.is_in_textblock() || rto.is_in_textblock() || !rfrom.same_parent(&rto) {
                return Err(TransformError::MismatchedRange { from, to });
            }
            let depth = rfrom.depth();
            (
                rfrom.path_to(depth),
                rfrom.index(depth),
                rto.index(depth),
                rfrom.parent().kind(),
            )
        };
        for node in &nodes {
            if !parent_kind.accepts_child(node.kind()) {
                return Err(TransformError::InvalidContent {
                    parent: parent_kind,
                    child: node.kind(),
                });
            }
        }

        let inserted: usize = nodes.iter().map(Node::node_size).sum();
        let parent = self
            .doc
            .root_mut()
            .descendant_mut(&path)
            .and_then(Node::children_mut)
            .ok_or(TransformError::MismatchedRange { from, to })?;
        parent.splice(start_index..end_index, nodes);
        self.after_replace(from, to, inserted);
        Ok(self)
    }

    pub fn insert(&mut self, pos: usize, node: Node) -> Result<&mut Self, TransformError> {
        self.replace_with(pos, pos, vec![node])
    }

    /// Deletes `from..to`, either text inside one textblock or whole sibling
    /// blocks.
    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, TransformError> {
        if self.doc.resolve(from)?.is_in_textblock() {
            self.replace_text(from, to, Vec::new())
        } else {
            self.replace_with(from, to, Vec::new())
        }
    }

    /// Replaces text between two positions of the same textblock with `runs`.
    pub fn replace_text(
        &mut self,
        from: usize,
        to: usize,
        runs: Vec<TextRun>,
    ) -> Result<&mut Self, TransformError> {
        self.doc.check_range(from, to)?;
        let (path, start) = self.textblock_containing(from, to)?;
        let inserted: usize = runs.iter().map(TextRun::len).sum();
        let block = self
            .doc
            .root_mut()
            .descendant_mut(&path)
            .ok_or(TransformError::NotInTextblock { from, to })?;
        let kind = block.kind();
        let current = block
            .runs_mut()
            .ok_or(TransformError::NotInTextblock { from, to })?;
        let total: usize = current.iter().map(TextRun::len).sum();
        let mut next = slice_runs(current, 0, from - start);
        next.extend(runs);
        next.extend(slice_runs(current, to - start, total));
        *block = Node::textblock(kind, normalize_runs(next));
        self.after_replace(from, to, inserted);
        Ok(self)
    }

    pub fn insert_text(
        &mut self,
        pos: usize,
        text: &str,
        marks: MarkSet,
    ) -> Result<&mut Self, TransformError> {
        self.replace_text(pos, pos, vec![TextRun::with_marks(text, marks)])
    }

    /// Adds `mark` to all text in `from..to` inside textblocks that allow marks.
    pub fn add_mark(
        &mut self,
        from: usize,
        to: usize,
        mark: MarkType,
    ) -> Result<&mut Self, TransformError> {
        self.map_marks(from, to, |marks| marks.with(mark))
    }

    pub fn remove_mark(
        &mut self,
        from: usize,
        to: usize,
        mark: MarkType,
    ) -> Result<&mut Self, TransformError> {
        self.map_marks(from, to, |marks| marks.without(mark))
    }

    fn map_marks(
        &mut self,
        from: usize,
        to: usize,
        f: impl Fn(&MarkSet) -> MarkSet,
    ) -> Result<&mut Self, TransformError> {
        self.doc.check_range(from, to)?;
        let targets: Vec<(Vec<usize>, usize, usize)> = self
            .doc
            .textblock_spans()
            .into_iter()
            .filter(|span| span.node.kind().allows_marks())
            .filter_map(|span| {
                let lo = from.max(span.start);
                let hi = to.min(span.end);
                (lo < hi).then_some((span.start, lo - span.start, hi - span.start))
            })
            .map(|(start, lo, hi)| {
                let path = self
                    .doc
                    .resolve(start)
                    .map(|resolved| resolved.path_to(resolved.depth()))
                    .unwrap_or_default();
                (path, lo, hi)
            })
            .collect();

        let mut changed = false;
        for (path, lo, hi) in targets {
            let Some(block) = self.doc.root_mut().descendant_mut(&path) else {
                continue;
            };
            let kind = block.kind();
            let Some(runs) = block.runs_mut() else {
                continue;
            };
            let next = map_run_marks(runs, lo, hi, &f);
            if next != *runs {
                *block = Node::textblock(kind, next);
                changed = true;
            }
        }
        if changed {
            self.steps += 1;
            self.stored_marks = None;
        }
        Ok(self)
    }

    pub fn set_selection(&mut self, selection: Selection) -> Result<&mut Self, TransformError> {
        if !selection.is_valid_in(&self.doc) {
            return Err(TransformError::InvalidSelection {
                anchor: selection.anchor(),
                head: selection.head(),
            });
        }
        self.selection = selection;
        self.selection_set = true;
        self.stored_marks = None;
        Ok(self)
    }

    pub fn set_stored_marks(&mut self, marks: Option<MarkSet>) -> &mut Self {
        self.stored_marks = marks;
        self
    }

    /// Adds `mark` to the marks the next typed text will get.
    pub fn add_stored_mark(&mut self, mark: MarkType) -> &mut Self {
        let marks = self.effective_marks().with(mark);
        self.stored_marks = Some(marks);
        self
    }

    pub fn remove_stored_mark(&mut self, mark: MarkType) -> &mut Self {
        let marks = self.effective_marks().without(mark);
        self.stored_marks = Some(marks);
        self
    }

    /// Replaces the whole document and selection, as history navigation does.
    pub fn reset(&mut self, doc: Document, selection: Selection) -> &mut Self {
        let selection = selection.near(&doc);
        if doc != self.doc {
            self.steps += 1;
        }
        self.doc = doc;
        self.selection = selection;
        self.selection_set = true;
        self.stored_marks = None;
        self
    }

    pub fn scroll_into_view(&mut self) -> &mut Self {
        self.scroll_into_view = true;
        self
    }

    /// Selection the state will end up with, repaired if a step left an end
    /// outside any textblock.
    pub(crate) fn final_selection(&self) -> Selection {
        if self.selection.is_valid_in(&self.doc) {
            self.selection
        } else {
            self.selection.near(&self.doc)
        }
    }

    fn effective_marks(&self) -> MarkSet {
        if let Some(marks) = &self.stored_marks {
            return marks.clone();
        }
        self.doc
            .resolve(self.selection.head())
            .map(|resolved| resolved.marks())
            .unwrap_or_default()
    }

    fn textblock_containing(
        &self,
        from: usize,
        to: usize,
    ) -> Result<(Vec<usize>, usize), TransformError> {
        let rfrom = self.doc.resolve(from)?;
        let rto = self.doc.resolve(to)?;
        if !rfrom.is_in_textblock() || !rfrom.same_parent(&rto) {
            return Err(TransformError::NotInTextblock { from, to });
        }
        let depth = rfrom.depth();
        Ok((rfrom.path_to(depth), rfrom.start(depth)))
    }

    fn after_replace(&mut self, from: usize, to: usize, inserted: usize) {
        let removed = to - from;
        self.selection = self.selection.map(|pos| {
            if pos < from || (pos == from && removed > 0) {
                pos
            } else if pos >= to {
                pos - removed + inserted
            } else {
                from + inserted
            }
        });
        self.steps += 1;
        self.stored_marks = None;
    }
}
