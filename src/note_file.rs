//! Reading and writing note files.
//!
//! Notes are stored as FTML or Markdown through `tdoc`. The editor works on
//! its own [`Document`], so loading converts the `tdoc` tree into editor nodes
//! and saving converts back. Checklists keep their checked state, link spans
//! become link targets on text runs, and every other inline style maps to a
//! mark.

use std::{
    fs,
    io::Cursor,
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use tdoc::{ChecklistItem, InlineStyle, Paragraph, Span, markdown, writer::Writer};

use crate::model::{Document, MarkSet, MarkType, Node, NodeKind, TextRun};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteFormat {
    Ftml,
    Markdown,
}

impl NoteFormat {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("md") | Some("markdown") | Some("mkd") | Some("mdown") => NoteFormat::Markdown,
            _ => NoteFormat::Ftml,
        }
    }
}

/// A loaded note and where it came from.
#[derive(Clone, Debug)]
pub struct NoteFile {
    pub document: Document,
    pub format: NoteFormat,
    /// False when the file did not exist yet.
    pub existed: bool,
}

/// Loads `path`. A missing file yields an empty document.
pub fn load(path: &Path) -> Result<NoteFile> {
    let format = NoteFormat::from_path(path);
    if !path.exists() {
        return Ok(NoteFile {
            document: Document::empty(),
            format,
            existed: false,
        });
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let document =
        parse(&content, format).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(NoteFile {
        document,
        format,
        existed: true,
    })
}

pub fn save(path: &Path, document: &Document, format: NoteFormat) -> Result<()> {
    let contents = serialize(document, format)?;
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

pub fn parse(content: &str, format: NoteFormat) -> Result<Document> {
    let parsed = match format {
        NoteFormat::Ftml => tdoc::parse(Cursor::new(content)).context("invalid FTML")?,
        NoteFormat::Markdown => markdown::parse(Cursor::new(content))
            .map_err(|err| anyhow!("invalid Markdown: {err}"))?,
    };
    Ok(from_tdoc(&parsed))
}

pub fn serialize(document: &Document, format: NoteFormat) -> Result<String> {
    let doc = to_tdoc(document);
    match format {
        NoteFormat::Ftml => Writer::new()
            .write_to_string(&doc)
            .context("failed to render FTML"),
        NoteFormat::Markdown => {
            let mut contents = Vec::new();
            markdown::write(&mut contents, &doc).context("failed to render Markdown")?;
            String::from_utf8(contents).context("Markdown output is not UTF-8")
        }
    }
}

pub fn from_tdoc(doc: &tdoc::Document) -> Document {
    Document::new(doc.paragraphs.iter().map(block_from_tdoc).collect())
}

fn block_from_tdoc(paragraph: &Paragraph) -> Node {
    match paragraph {
        Paragraph::Text { content } => Node::paragraph(runs_from_spans(content)),
        Paragraph::Header1 { content } => Node::heading(1, runs_from_spans(content)),
        Paragraph::Header2 { content } => Node::heading(2, runs_from_spans(content)),
        Paragraph::Header3 { content } => Node::heading(3, runs_from_spans(content)),
        Paragraph::CodeBlock { content } => Node::code_block(&plain_text(content)),
        Paragraph::Quote { children } => container(
            NodeKind::Blockquote,
            children.iter().map(block_from_tdoc).collect(),
        ),
        Paragraph::UnorderedList { entries } => list(NodeKind::BulletList, entries),
        Paragraph::OrderedList { entries } => list(NodeKind::OrderedList, entries),
        Paragraph::Checklist { items } => checklist(items),
    }
}

/// Containers always keep at least one child so every block has a text
/// position.
fn container(kind: NodeKind, mut children: Vec<Node>) -> Node {
    if children.is_empty() {
        children.push(Node::empty_paragraph());
    }
    Node::container(kind, children)
}

fn list(kind: NodeKind, entries: &[Vec<Paragraph>]) -> Node {
    let items = entries
        .iter()
        .map(|entry| {
            container(
                NodeKind::ListItem,
                entry.iter().map(block_from_tdoc).collect(),
            )
        })
        .collect();
    container_of_items(kind, items)
}

fn checklist(items: &[ChecklistItem]) -> Node {
    let items = items
        .iter()
        .map(|item| {
            let mut children = vec![Node::paragraph(runs_from_spans(&item.content))];
            if !item.children.is_empty() {
                children.push(checklist(&item.children));
            }
            Node::container(
                NodeKind::ChecklistItem {
                    checked: item.checked,
                },
                children,
            )
        })
        .collect();
    container_of_items(NodeKind::Checklist, items)
}

fn container_of_items(kind: NodeKind, mut items: Vec<Node>) -> Node {
    if items.is_empty() {
        let item = match kind {
            NodeKind::Checklist => NodeKind::ChecklistItem { checked: false },
            _ => NodeKind::ListItem,
        };
        items.push(container(item, Vec::new()));
    }
    Node::container(kind, items)
}

fn runs_from_spans(spans: &[Span]) -> Vec<TextRun> {
    let mut runs = Vec::new();
    for span in spans {
        collect_runs(span, &MarkSet::empty(), None, &mut runs);
    }
    runs
}

fn collect_runs(span: &Span, inherited: &MarkSet, link: Option<&str>, runs: &mut Vec<TextRun>) {
    let marks = match mark_for_style(span.style) {
        Some(mark) => inherited.with(mark),
        None => inherited.clone(),
    };
    let link = match (span.style, span.link_target.as_deref()) {
        (InlineStyle::Link, Some(target)) => Some(target),
        _ => link,
    };
    let mut push = |text: &str| {
        let run = TextRun::with_marks(text, marks.clone());
        runs.push(match link {
            Some(target) => run.linked(target),
            None => run,
        });
    };
    if !span.text.is_empty() {
        push(span.text.as_str());
    } else if span.children.is_empty()
        && let Some(target) = link.filter(|_| span.style == InlineStyle::Link)
    {
        // An autolink has no description; its target is the visible text.
        push(target);
    }
    for child in &span.children {
        collect_runs(child, &marks, link, runs);
    }
}

fn plain_text(spans: &[Span]) -> String {
    fn walk(span: &Span, out: &mut String) {
        out.push_str(&span.text);
        span.children.iter().for_each(|child| walk(child, out));
    }
    let mut out = String::new();
    spans.iter().for_each(|span| walk(span, &mut out));
    out
}

fn mark_for_style(style: InlineStyle) -> Option<MarkType> {
    match style {
        InlineStyle::Bold => Some(MarkType::Strong),
        InlineStyle::Italic => Some(MarkType::Italics),
        InlineStyle::Code => Some(MarkType::Code),
        InlineStyle::Underline => Some(MarkType::Underline),
        InlineStyle::Strike => Some(MarkType::Strike),
        InlineStyle::Highlight => Some(MarkType::Highlight),
        InlineStyle::None | InlineStyle::Link => None,
    }
}

fn style_for_mark(mark: MarkType) -> InlineStyle {
    match mark {
        MarkType::Strong => InlineStyle::Bold,
        MarkType::Italics => InlineStyle::Italic,
        MarkType::Code => InlineStyle::Code,
        MarkType::Underline => InlineStyle::Underline,
        MarkType::Strike => InlineStyle::Strike,
        MarkType::Highlight => InlineStyle::Highlight,
    }
}

pub fn to_tdoc(doc: &Document) -> tdoc::Document {
    let mut paragraphs = Vec::new();
    for node in doc.children() {
        paragraphs.extend(block_to_tdoc(node));
    }
    tdoc::Document::new().with_paragraphs(paragraphs)
}

fn block_to_tdoc(node: &Node) -> Vec<Paragraph> {
    let paragraph = match node.kind() {
        NodeKind::Paragraph => Paragraph::Text {
            content: spans_from_runs(node.runs()),
        },
        NodeKind::Heading { level } => {
            let content = spans_from_runs(node.runs());
            match level {
                0 | 1 => Paragraph::Header1 { content },
                2 => Paragraph::Header2 { content },
                _ => Paragraph::Header3 { content },
            }
        }
        NodeKind::CodeBlock => Paragraph::CodeBlock {
            content: vec![Span::new_text(node.text_content())],
        },
        NodeKind::Blockquote => Paragraph::Quote {
            children: blocks_to_tdoc(node.children()),
        },
        NodeKind::BulletList => Paragraph::UnorderedList {
            entries: list_entries(node),
        },
        NodeKind::OrderedList => Paragraph::OrderedList {
            entries: list_entries(node),
        },
        NodeKind::Checklist => Paragraph::Checklist {
            items: checklist_items(node),
        },
        NodeKind::ListItem | NodeKind::ChecklistItem { .. } | NodeKind::Doc => {
            return blocks_to_tdoc(node.children());
        }
    };
    vec![paragraph]
}

fn blocks_to_tdoc(nodes: &[Node]) -> Vec<Paragraph> {
    nodes.iter().flat_map(block_to_tdoc).collect()
}

fn list_entries(list: &Node) -> Vec<Vec<Paragraph>> {
    list.children()
        .iter()
        .map(|item| blocks_to_tdoc(item.children()))
        .collect()
}

fn checklist_items(list: &Node) -> Vec<ChecklistItem> {
    list.children()
        .iter()
        .map(|item| {
            let checked = matches!(item.kind(), NodeKind::ChecklistItem { checked: true });
            let mut content = Vec::new();
            let mut children = Vec::new();
            collect_checklist_item(item, &mut content, &mut children);
            ChecklistItem::new(checked)
                .with_content(content)
                .with_children(children)
        })
        .collect()
}

/// A checklist item holds one line of text in the file, so textblocks are
/// joined with newlines and nested checklists become child items.
fn collect_checklist_item(node: &Node, content: &mut Vec<Span>, children: &mut Vec<ChecklistItem>) {
    for child in node.children() {
        if child.kind() == NodeKind::Checklist {
            children.extend(checklist_items(child));
        } else if child.is_textblock() {
            if !content.is_empty() {
                content.push(Span::new_text("\n"));
            }
            content.extend(child.runs().iter().map(span_from_run));
        } else {
            collect_checklist_item(child, content, children);
        }
    }
}

fn spans_from_runs(runs: &[TextRun]) -> Vec<Span> {
    if runs.is_empty() {
        return vec![Span::new_text("")];
    }
    runs.iter().map(span_from_run).collect()
}

/// One span per run; several marks nest as styled wrapper spans and a link
/// target wraps the result in a link span.
fn span_from_run(run: &TextRun) -> Span {
    let mut marks = run.marks().iter().collect::<Vec<_>>().into_iter().rev();
    let mut span = Span::new_text(run.text());
    if let Some(innermost) = marks.next() {
        span.style = style_for_mark(innermost);
    }
    for mark in marks {
        let mut outer = Span::new_text("");
        outer.style = style_for_mark(mark);
        outer.children = vec![span];
        span = outer;
    }
    match run.link() {
        Some(target) => Span::new_styled(InlineStyle::Link)
            .with_children(vec![span])
            .with_link_target(target),
        None => span,
    }
}
