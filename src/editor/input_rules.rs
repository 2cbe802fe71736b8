//! Rewrites triggered by typed text.

use regex::{Captures, Regex};
use tracing::debug;

use crate::model::{
    Document, EditorState, HistoryAction, InputRuleRecord, MarkType, Node, Selection, TextRun, Transaction,
};

use super::CommandContext;

/// Everything a rule handler gets to see about one match.
pub struct RuleMatch<'a> {
    pub state: &'a EditorState,
    pub captures: Captures<'a>,
    /// Where the match begins in the document.
    pub start: usize,
    /// Cursor position the typed text was about to be inserted at.
    pub from: usize,
    /// End of the range the typed text replaces.
    pub end: usize,
    pub typed: &'a str,
}

pub type RuleHandler = fn(&RuleMatch<'_>) -> Option<Transaction>;

pub struct InputRule {
    name: &'static str,
    pattern: Regex,
    handler: RuleHandler,
    undoable: bool,
}

impl InputRule {
    pub fn new(name: &'static str, pattern: &str, handler: RuleHandler) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            pattern: Regex::new(pattern)?,
            handler,
            undoable: true,
        })
    }

    pub fn not_undoable(mut self) -> Self {
        self.undoable = false;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// A triple backtick turns the block into a code block.
    pub fn code_block() -> Result<Self, regex::Error> {
        Self::new("code_block", r"```$", fenced_code_block)
    }

    /// `` `text` `` after a space or at line start becomes inline code.
    pub fn inline_code() -> Result<Self, regex::Error> {
        Self::new(
            "inline_code",
            r"(^| )`([^` ]|[^` ][^`]*[^` ])`$",
            inline_code,
        )
    }
}

impl std::fmt::Debug for InputRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("undoable", &self.undoable)
            .finish()
    }
}

/// The ordered rule set consulted on every text input.
#[derive(Debug)]
pub struct InputRules {
    rules: Vec<InputRule>,
    lookbehind: usize,
}

impl InputRules {
    pub fn new(rules: Vec<InputRule>, lookbehind: usize) -> Self {
        Self { rules, lookbehind }
    }

    /// The code-block and inline-code rules.
    pub fn standard(lookbehind: usize) -> Result<Self, regex::Error> {
        Ok(Self::new(
            vec![InputRule::code_block()?, InputRule::inline_code()?],
            lookbehind,
        ))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Offers `text`, about to replace `from..to`, to each rule in order and
    /// returns the first rewrite. `None` means the text should be inserted
    /// normally.
    pub fn handle_text_input(
        &self,
        state: &EditorState,
        from: usize,
        to: usize,
        text: &str,
    ) -> Option<Transaction> {
        let doc = state.doc();
        let rfrom = doc.resolve(from).ok()?;
        let rto = doc.resolve(to).ok()?;
        if !rfrom.is_in_textblock() || !rfrom.same_parent(&rto) || rfrom.parent().kind().is_code() {
            return None;
        }
        let block_start = rfrom.start(rfrom.depth());
        let window_start = from.saturating_sub(self.lookbehind).max(block_start);
        // A window cut mid-block keeps one character of context so `^` only
        // matches at the real start of the block.
        let context_start = if window_start > block_start {
            window_start - 1
        } else {
            window_start
        };
        let mut text_before = doc.text_between(context_start, from, "").ok()?;
        let search_start = text_before
            .char_indices()
            .nth(window_start - context_start)
            .map_or(text_before.len(), |(idx, _)| idx);
        text_before.push_str(text);

        let typed_len = text.chars().count();
        for rule in &self.rules {
            let Some(captures) = rule.pattern.captures_at(&text_before, search_start) else {
                continue;
            };
            let Some(whole) = captures.get(0) else {
                continue;
            };
            let match_len = whole.as_str().chars().count();
            if match_len < typed_len {
                continue;
            }
            let start = from + typed_len - match_len;
            let matched = RuleMatch {
                state,
                captures,
                start,
                from,
                end: to,
                typed: text,
            };
            let Some(mut tr) = (rule.handler)(&matched) else {
                continue;
            };
            debug!(rule = rule.name, start, end = to, "input rule fired");
            if rule.undoable {
                tr.meta_mut().input_rule = Some(InputRuleRecord {
                    rule: rule.name,
                    from,
                    to,
                    text: text.to_string(),
                });
            }
            return Some(tr);
        }
        None
    }
}

/// The last input-rule rewrite, kept by the view until anything else changes
/// the document or moves the selection.
#[derive(Clone, Debug)]
pub struct AppliedInputRule {
    doc_before: Document,
    selection_before: Selection,
    record: InputRuleRecord,
}

impl AppliedInputRule {
    pub fn from_transaction(tr: &Transaction) -> Option<Self> {
        let record = tr.meta().input_rule.clone()?;
        Some(Self {
            doc_before: tr.doc_before().clone(),
            selection_before: tr.selection_before(),
            record,
        })
    }

    pub fn record(&self) -> &InputRuleRecord {
        &self.record
    }
}

/// Reverts the most recent input-rule rewrite and inserts the text that
/// triggered it literally.
pub fn undo_input_rule(cx: &CommandContext<'_>) -> Option<Transaction> {
    let applied = cx.input_rule?;
    let InputRuleRecord { from, to, text, .. } = &applied.record;
    let mut tr = cx.state.tr();
    tr.reset(applied.doc_before.clone(), applied.selection_before);
    let marks = match cx.state.stored_marks() {
        Some(marks) => marks.clone(),
        None => applied.doc_before.resolve(*from).ok()?.marks(),
    };
    tr.replace_text(*from, *to, vec![TextRun::with_marks(text.as_str(), marks)])
        .ok()?;
    tr.set_selection(Selection::cursor(from + text.chars().count()))
        .ok()?;
    tr.scroll_into_view();
    tr.meta_mut().history = Some(HistoryAction::RevertInputRule);
    debug!(rule = applied.record.rule, "input rule undone");
    Some(tr)
}

fn fenced_code_block(m: &RuleMatch<'_>) -> Option<Transaction> {
    let doc = m.state.doc();
    let resolved = doc.resolve(m.start).ok()?;
    let depth = resolved.depth();
    let block = resolved.parent();
    let block_start = resolved.start(depth);
    let block_end = resolved.end(depth);
    let before = resolved.before(depth)?;
    let after = resolved.after(depth)?;
    let content = doc.text_between(m.end, block_end, "").ok()?;

    let mut tr = m.state.tr();
    if m.start == block_start {
        tr.replace_with(before, after, vec![Node::code_block(&content)])
            .ok()?;
        tr.set_selection(Selection::cursor(m.start)).ok()?;
    } else {
        let prefix = Node::textblock(block.kind(), block.slice_runs(0, m.start - block_start));
        tr.replace_with(before, after, vec![prefix, Node::code_block(&content)])
            .ok()?;
        tr.set_selection(Selection::cursor(m.start + 2)).ok()?;
    }
    tr.scroll_into_view();
    Some(tr)
}

fn inline_code(m: &RuleMatch<'_>) -> Option<Transaction> {
    let state = m.state;
    let code = state.schema().mark(MarkType::Code.name())?;
    let lead = m.captures.get(1).map_or(0, |g| g.as_str().chars().count());
    let content = m.captures.get(2)?.as_str();
    let content_len = content.chars().count();
    let open = m.start + lead;
    // The opening backtick has to be in the document already.
    if open >= m.from {
        return None;
    }
    let doc = state.doc();
    if doc.range_fully_marked(open, m.from, code) {
        return None;
    }

    let typed_content = m.typed.strip_suffix('`')?;
    let mut tr = state.tr();
    if !typed_content.is_empty() || m.from < m.end {
        let marks = doc.resolve(m.from).ok()?.marks();
        tr.replace_text(
            m.from,
            m.end,
            vec![TextRun::with_marks(typed_content, marks)],
        )
        .ok()?;
    }
    tr.delete(open, open + 1).ok()?;
    tr.add_mark(open, open + content_len, code).ok()?;
    tr.set_selection(Selection::cursor(open + content_len)).ok()?;
    tr.remove_stored_mark(code);
    Some(tr)
}
