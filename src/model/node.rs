use super::schema::{MarkType, NodeKind};
use super::{ModelError, ResolvedPos};

/// Ordered, duplicate-free set of marks attached to a text run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MarkSet(Vec<MarkType>);

impl MarkSet {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn contains(&self, mark: MarkType) -> bool {
        self.0.contains(&mark)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = MarkType> + '_ {
        self.0.iter().copied()
    }

    pub fn with(&self, mark: MarkType) -> Self {
        let mut marks = self.0.clone();
        if let Err(idx) = marks.binary_search(&mark) {
            marks.insert(idx, mark);
        }
        Self(marks)
    }

    pub fn without(&self, mark: MarkType) -> Self {
        Self(self.0.iter().copied().filter(|m| *m != mark).collect())
    }
}

impl FromIterator<MarkType> for MarkSet {
    fn from_iter<I: IntoIterator<Item = MarkType>>(iter: I) -> Self {
        let mut marks: Vec<MarkType> = iter.into_iter().collect();
        marks.sort();
        marks.dedup();
        Self(marks)
    }
}

/// A run of characters sharing one mark set and link target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextRun {
    text: String,
    marks: MarkSet,
    link: Option<String>,
}

impl TextRun {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_marks(text, MarkSet::empty())
    }

    pub fn marked(text: impl Into<String>, marks: impl IntoIterator<Item = MarkType>) -> Self {
        Self::with_marks(text, marks.into_iter().collect())
    }

    pub fn with_marks(text: impl Into<String>, marks: MarkSet) -> Self {
        Self {
            text: text.into(),
            marks,
            link: None,
        }
    }

    /// The same run pointing at `target`.
    pub fn linked(mut self, target: impl Into<String>) -> Self {
        self.link = Some(target.into());
        self
    }

    /// Same marks and link target over different text.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: self.marks.clone(),
            link: self.link.clone(),
        }
    }

    /// Link target carried over from the note file. Editing commands keep it
    /// on the characters it covers but never extend it to new text.
    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn marks(&self) -> &MarkSet {
        &self.marks
    }

    /// Length in characters, which is also the run's size in positions.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Content {
    Inline(Vec<TextRun>),
    Blocks(Vec<Node>),
}

/// An immutable block node. Textblocks carry normalised text runs, every other
/// kind carries child blocks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    kind: NodeKind,
    content: Content,
}

impl Node {
    /// Builds a textblock, merging adjacent runs with equal marks and dropping
    /// empty ones. Marks are stripped from kinds that do not allow them.
    pub fn textblock(kind: NodeKind, runs: Vec<TextRun>) -> Self {
        debug_assert!(kind.is_textblock(), "{kind} is not a textblock");
        let runs = if kind.allows_marks() {
            runs
        } else {
            runs.into_iter()
                .map(|run| TextRun::new(run.text))
                .collect()
        };
        Self {
            kind,
            content: Content::Inline(normalize_runs(runs)),
        }
    }

    pub fn container(kind: NodeKind, children: Vec<Node>) -> Self {
        debug_assert!(!kind.is_textblock(), "{kind} is a textblock");
        Self {
            kind,
            content: Content::Blocks(children),
        }
    }

    pub fn paragraph(runs: Vec<TextRun>) -> Self {
        Self::textblock(NodeKind::Paragraph, runs)
    }

    /// A paragraph holding `text` as a single unmarked run, or no run at all
    /// when `text` is empty.
    pub fn plain_paragraph(text: &str) -> Self {
        Self::paragraph(vec![TextRun::new(text)])
    }

    pub fn empty_paragraph() -> Self {
        Self::paragraph(Vec::new())
    }

    pub fn code_block(text: &str) -> Self {
        Self::textblock(NodeKind::CodeBlock, vec![TextRun::new(text)])
    }

    pub fn heading(level: u8, runs: Vec<TextRun>) -> Self {
        Self::textblock(NodeKind::Heading { level }, runs)
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_textblock(&self) -> bool {
        self.kind.is_textblock()
    }

    /// Child blocks; empty for textblocks.
    pub fn children(&self) -> &[Node] {
        match &self.content {
            Content::Blocks(children) => children,
            Content::Inline(_) => &[],
        }
    }

    /// Text runs; empty for containers.
    pub fn runs(&self) -> &[TextRun] {
        match &self.content {
            Content::Inline(runs) => runs,
            Content::Blocks(_) => &[],
        }
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children().get(index)
    }

    pub fn child_count(&self) -> usize {
        match &self.content {
            Content::Inline(runs) => runs.len(),
            Content::Blocks(children) => children.len(),
        }
    }

    pub fn content_size(&self) -> usize {
        match &self.content {
            Content::Inline(runs) => runs.iter().map(TextRun::len).sum(),
            Content::Blocks(children) => children.iter().map(Node::node_size).sum(),
        }
    }

    /// Size in positions including the open and close tokens.
    pub fn node_size(&self) -> usize {
        match self.kind {
            NodeKind::Doc => self.content_size(),
            _ => self.content_size() + 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content_size() == 0
    }

    /// All text inside the node, with nothing inserted between blocks.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.content {
            Content::Inline(runs) => runs.iter().for_each(|run| out.push_str(&run.text)),
            Content::Blocks(children) => children.iter().for_each(|child| child.collect_text(out)),
        }
    }

    /// Copy of this textblock's runs between two content offsets.
    pub fn slice_runs(&self, from: usize, to: usize) -> Vec<TextRun> {
        slice_runs(self.runs(), from, to)
    }

    /// Copy of this node with a different kind and the same runs.
    pub fn with_kind(&self, kind: NodeKind) -> Node {
        match &self.content {
            Content::Inline(runs) if kind.is_textblock() => Node::textblock(kind, runs.clone()),
            Content::Blocks(children) if !kind.is_textblock() => {
                Node::container(kind, children.clone())
            }
            _ => self.clone(),
        }
    }

    pub(crate) fn runs_mut(&mut self) -> Option<&mut Vec<TextRun>> {
        match &mut self.content {
            Content::Inline(runs) => Some(runs),
            Content::Blocks(_) => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match &mut self.content {
            Content::Blocks(children) => Some(children),
            Content::Inline(_) => None,
        }
    }

    pub(crate) fn descendant_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let mut node = self;
        for idx in path {
            node = node.children_mut()?.get_mut(*idx)?;
        }
        Some(node)
    }

    /// Locates the child containing content offset `offset`. Returns the child
    /// index and the content offset where that child starts; an offset equal to
    /// a child boundary yields the child after the boundary.
    pub(crate) fn find_index(&self, offset: usize) -> (usize, usize) {
        let mut start = 0;
        match &self.content {
            Content::Blocks(children) => {
                for (idx, child) in children.iter().enumerate() {
                    let end = start + child.node_size();
                    if offset < end {
                        return (idx, start);
                    }
                    start = end;
                }
                (children.len(), start)
            }
            Content::Inline(runs) => {
                for (idx, run) in runs.iter().enumerate() {
                    let end = start + run.len();
                    if offset < end {
                        return (idx, start);
                    }
                    start = end;
                }
                (runs.len(), start)
            }
        }
    }
}

/// The document root. Cloning is the only way to derive a new version; the
/// editor never mutates a document that has been handed out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    root: Node,
}

impl Document {
    /// Builds a document from top-level blocks. An empty block list yields a
    /// single empty paragraph so there is always somewhere to put the cursor.
    pub fn new(children: Vec<Node>) -> Self {
        let children = if children.is_empty() {
            vec![Node::empty_paragraph()]
        } else {
            children
        };
        Self {
            root: Node::container(NodeKind::Doc, children),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn children(&self) -> &[Node] {
        self.root.children()
    }

    pub fn content_size(&self) -> usize {
        self.root.content_size()
    }

    pub fn text_content(&self) -> String {
        self.root.text_content()
    }

    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos<'_>, ModelError> {
        ResolvedPos::resolve(self, pos)
    }

    /// Text between two positions. `block_separator` is inserted between the
    /// text of consecutive textblocks.
    pub fn text_between(
        &self,
        from: usize,
        to: usize,
        block_separator: &str,
    ) -> Result<String, ModelError> {
        self.check_range(from, to)?;
        let mut out = String::new();
        let mut first = true;
        for span in self.textblock_spans() {
            let lo = from.max(span.start);
            let hi = to.min(span.end);
            if lo >= hi {
                continue;
            }
            if !first {
                out.push_str(block_separator);
            }
            first = false;
            let runs = span.node.slice_runs(lo - span.start, hi - span.start);
            runs.iter().for_each(|run| out.push_str(run.text()));
        }
        Ok(out)
    }

    /// Whether any character in `from..to` carries `mark`. Only text in
    /// textblocks that allow marks is considered.
    pub fn range_has_mark(&self, from: usize, to: usize, mark: MarkType) -> bool {
        self.marked_chars(from, to, mark).0 > 0
    }

    /// Whether `from..to` contains text and every character carries `mark`.
    pub fn range_fully_marked(&self, from: usize, to: usize, mark: MarkType) -> bool {
        let (marked, total) = self.marked_chars(from, to, mark);
        total > 0 && marked == total
    }

    fn marked_chars(&self, from: usize, to: usize, mark: MarkType) -> (usize, usize) {
        let mut marked = 0;
        let mut total = 0;
        for span in self.textblock_spans() {
            let lo = from.max(span.start);
            let hi = to.min(span.end);
            if lo >= hi || !span.node.kind().allows_marks() {
                continue;
            }
            for run in span.node.slice_runs(lo - span.start, hi - span.start) {
                total += run.len();
                if run.marks().contains(mark) {
                    marked += run.len();
                }
            }
        }
        (marked, total)
    }

    /// Every textblock in document order with its content range.
    pub fn textblock_spans(&self) -> Vec<TextblockSpan<'_>> {
        fn walk<'a>(node: &'a Node, content_start: usize, out: &mut Vec<TextblockSpan<'a>>) {
            let mut pos = content_start;
            for child in node.children() {
                if child.is_textblock() {
                    out.push(TextblockSpan {
                        node: child,
                        start: pos + 1,
                        end: pos + 1 + child.content_size(),
                    });
                } else {
                    walk(child, pos + 1, out);
                }
                pos += child.node_size();
            }
        }
        let mut spans = Vec::new();
        walk(&self.root, 0, &mut spans);
        spans
    }

    pub(crate) fn check_range(&self, from: usize, to: usize) -> Result<(), ModelError> {
        let size = self.content_size();
        if from > to {
            return Err(ModelError::InvertedRange { from, to });
        }
        if to > size {
            return Err(ModelError::PositionOutOfRange { pos: to, size });
        }
        Ok(())
    }

    pub(crate) fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

/// A textblock together with the positions bounding its content.
#[derive(Clone, Copy, Debug)]
pub struct TextblockSpan<'a> {
    pub node: &'a Node,
    pub start: usize,
    pub end: usize,
}

pub(crate) fn normalize_runs(runs: Vec<TextRun>) -> Vec<TextRun> {
    let mut out: Vec<TextRun> = Vec::with_capacity(runs.len());
    for run in runs {
        if run.text.is_empty() {
            continue;
        }
        match out.last_mut() {
            Some(last) if last.marks == run.marks && last.link == run.link => {
                last.text.push_str(&run.text)
            }
            _ => out.push(run),
        }
    }
    out
}

pub(crate) fn slice_runs(runs: &[TextRun], from: usize, to: usize) -> Vec<TextRun> {
    let mut out = Vec::new();
    let mut start = 0;
    for run in runs {
        let len = run.len();
        let end = start + len;
        let lo = from.max(start);
        let hi = to.min(end);
        if lo < hi {
            let text: String = run
                .text
                .chars()
                .skip(lo - start)
                .take(hi - lo)
                .collect();
            out.push(TextRun {
                text,
                marks: run.marks.clone(),
                link: run.link.clone(),
            });
        }
        start = end;
    }
    out
}

/// Rewrites the marks of every character in `from..to`.
pub(crate) fn map_run_marks(
    runs: &[TextRun],
    from: usize,
    to: usize,
    f: impl Fn(&MarkSet) -> MarkSet,
) -> Vec<TextRun> {
    let total: usize = runs.iter().map(TextRun::len).sum();
    let mut out = slice_runs(runs, 0, from);
    for run in slice_runs(runs, from, to) {
        let marks = f(&run.marks);
        out.push(TextRun { marks, ..run });
    }
    out.extend(slice_runs(runs, to, total));
    normalize_runs(out)
}
