use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use unicode_width::UnicodeWidthChar;

use crate::model::{Document, MarkType, Node, NodeKind, Selection, TextRun};
use crate::theme::Theme;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorVisualPosition {
    pub line: usize,
    pub column: u16,
}

#[derive(Debug)]
pub struct RenderResult {
    pub lines: Vec<Line<'static>>,
    pub cursor: Option<CursorVisualPosition>,
    pub total_lines: usize,
}

/// Lays the document out into terminal lines no wider than `width`
/// (code blocks excepted), highlighting `selection` and locating its head.
pub fn render_document(
    document: &Document,
    selection: Selection,
    width: usize,
    theme: &Theme,
) -> RenderResult {
    let mut renderer = Renderer::new(width.max(1), selection, theme);
    renderer.render_blocks(document.children(), 0, "", "");
    renderer.finish()
}

struct Renderer<'a> {
    wrap_width: usize,
    selection: Selection,
    theme: &'a Theme,
    cursor: Option<CursorVisualPosition>,
    lines: Vec<Line<'static>>,
    current_line_index: usize,
}

impl<'a> Renderer<'a> {
    fn new(wrap_width: usize, selection: Selection, theme: &'a Theme) -> Self {
        Self {
            wrap_width,
            selection,
            theme,
            cursor: None,
            lines: Vec::new(),
            current_line_index: 0,
        }
    }

    /// `start` is the position of the first child's open token.
    fn render_blocks(
        &mut self,
        children: &[Node],
        start: usize,
        first_prefix: &str,
        continuation_prefix: &str,
    ) {
        if children.is_empty() {
            self.push_prefix_line(first_prefix);
            return;
        }
        let mut pos = start;
        for (idx, child) in children.iter().enumerate() {
            let prefix = if idx == 0 {
                first_prefix
            } else {
                self.push_prefix_line(continuation_prefix.trim_end());
                continuation_prefix
            };
            self.render_node(child, pos + 1, prefix, continuation_prefix);
            pos += child.node_size();
        }
    }

    /// `content_start` is the position right after the node's open token.
    fn render_node(
        &mut self,
        node: &Node,
        content_start: usize,
        first_prefix: &str,
        continuation_prefix: &str,
    ) {
        match node.kind() {
            NodeKind::Paragraph | NodeKind::Doc => self.render_textblock(
                node.runs(),
                content_start,
                first_prefix,
                continuation_prefix,
                Style::default(),
                self.wrap_width,
            ),
            NodeKind::Heading { level } => {
                self.render_heading(node, content_start, first_prefix, continuation_prefix, level)
            }
            NodeKind::CodeBlock => {
                self.render_code_block(node, content_start, first_prefix, continuation_prefix)
            }
            NodeKind::Blockquote => {
                let quote_first = format!("{first_prefix}| ");
                let quote_continuation = format!("{continuation_prefix}| ");
                self.render_blocks(
                    node.children(),
                    content_start,
                    &quote_first,
                    &quote_continuation,
                );
            }
            NodeKind::BulletList => {
                self.render_list(node, content_start, first_prefix, continuation_prefix, |_, _| {
                    "• ".to_string()
                })
            }
            NodeKind::OrderedList => {
                self.render_list(node, content_start, first_prefix, continuation_prefix, |idx, _| {
                    format!("{}. ", idx + 1)
                })
            }
            NodeKind::Checklist => {
                self.render_list(node, content_start, first_prefix, continuation_prefix, |_, item| {
                    match item.kind() {
                        NodeKind::ChecklistItem { checked: true } => "[x] ".to_string(),
                        _ => "[ ] ".to_string(),
                    }
                })
            }
            NodeKind::ListItem | NodeKind::ChecklistItem { .. } => self.render_blocks(
                node.children(),
                content_start,
                first_prefix,
                continuation_prefix,
            ),
        }
    }

    fn render_heading(
        &mut self,
        node: &Node,
        content_start: usize,
        first_prefix: &str,
        continuation_prefix: &str,
        level: u8,
    ) {
        let first_line = self.lines.len();
        self.render_textblock(
            node.runs(),
            content_start,
            first_prefix,
            continuation_prefix,
            self.theme.heading_style(level),
            self.wrap_width,
        );

        let underline_char = match level {
            0 | 1 => return,
            2 => '=',
            _ => '-',
        };
        let prefix_width = visible_width(continuation_prefix);
        let width = self.lines[first_line..]
            .iter()
            .map(|line| line_width(line).saturating_sub(prefix_width))
            .max()
            .unwrap_or(0);
        let underline = format!(
            "{continuation_prefix}{}",
            underline_string(width, underline_char)
        );
        self.push_styled_line(underline, self.theme.heading_style(level));
    }

    fn render_code_block(
        &mut self,
        node: &Node,
        content_start: usize,
        first_prefix: &str,
        continuation_prefix: &str,
    ) {
        let fence = self.code_block_fence(first_prefix);
        self.push_styled_line(fence, self.theme.code_fence_style());

        self.render_textblock(
            node.runs(),
            content_start,
            continuation_prefix,
            continuation_prefix,
            self.theme.code_block_style(),
            usize::MAX / 4,
        );

        let fence = self.code_block_fence(continuation_prefix);
        self.push_styled_line(fence, self.theme.code_fence_style());
    }

    fn render_list(
        &mut self,
        node: &Node,
        content_start: usize,
        first_prefix: &str,
        continuation_prefix: &str,
        marker: impl Fn(usize, &Node) -> String,
    ) {
        let mut pos = content_start;
        for (idx, item) in node.children().iter().enumerate() {
            let outer = if idx == 0 {
                first_prefix
            } else {
                self.push_prefix_line(continuation_prefix.trim_end());
                continuation_prefix
            };
            let label = marker(idx, item);
            let item_first = format!("{outer}{label}");
            let item_continuation = format!(
                "{continuation_prefix}{}",
                " ".repeat(visible_width(&label))
            );
            self.render_node(item, pos + 1, &item_first, &item_continuation);
            pos += item.node_size();
        }
    }

    fn render_textblock(
        &mut self,
        runs: &[TextRun],
        content_start: usize,
        first_prefix: &str,
        continuation_prefix: &str,
        base_style: Style,
        wrap_width: usize,
    ) {
        let fragments = self.collect_fragments(runs, content_start, base_style);
        let lines = wrap_fragments(
            &fragments,
            first_prefix,
            continuation_prefix,
            wrap_width,
            self.theme.marker_style(),
        );
        self.consume_lines(lines);
    }

    fn collect_fragments(
        &self,
        runs: &[TextRun],
        content_start: usize,
        base_style: Style,
    ) -> Vec<FragmentItem> {
        let content_size: usize = runs.iter().map(TextRun::len).sum();
        let head = self.selection.head();
        let cursor_offset = (content_start..=content_start + content_size)
            .contains(&head)
            .then(|| head - content_start);

        let mut tokenizer = Tokenizer::default();
        let mut offset = 0;
        for run in runs {
            let run_style = self.mark_style(base_style, run);
            for ch in run.text().chars() {
                if cursor_offset == Some(offset) {
                    tokenizer.cursor();
                }
                let pos = content_start + offset;
                let style = if self.is_selected(pos) {
                    run_style.patch(self.theme.selection_style())
                } else {
                    run_style
                };
                tokenizer.push(ch, style);
                offset += 1;
            }
        }
        if cursor_offset == Some(offset) {
            tokenizer.cursor();
        }
        tokenizer.finish()
    }

    fn mark_style(&self, base: Style, run: &TextRun) -> Style {
        let base = match run.link() {
            Some(_) => base.patch(self.theme.link_style()),
            None => base,
        };
        run.marks().iter().fold(base, |style, mark| match mark {
            MarkType::Strong => style.add_modifier(Modifier::BOLD),
            MarkType::Italics => style.add_modifier(Modifier::ITALIC),
            MarkType::Code => style.patch(self.theme.inline_code_style()),
            MarkType::Underline => style.add_modifier(Modifier::UNDERLINED),
            MarkType::Strike => style.add_modifier(Modifier::CROSSED_OUT),
            MarkType::Highlight => style.patch(self.theme.highlight_style()),
        })
    }

    fn is_selected(&self, pos: usize) -> bool {
        !self.selection.is_empty() && self.selection.from() <= pos && pos < self.selection.to()
    }

    fn push_prefix_line(&mut self, prefix: &str) {
        self.push_styled_line(prefix.to_string(), self.theme.marker_style());
    }

    fn push_styled_line(&mut self, content: String, style: Style) {
        self.lines.push(Line::from(vec![Span::styled(content, style)]));
        self.current_line_index += 1;
    }

    fn code_block_fence(&self, prefix: &str) -> String {
        const MIN_FENCE_WIDTH: usize = 4;
        let available_width = self.wrap_width.saturating_sub(visible_width(prefix));
        let dash_count = available_width.max(MIN_FENCE_WIDTH);
        format!("{}{}", prefix, "-".repeat(dash_count))
    }

    fn consume_lines(&mut self, outputs: Vec<LineOutput>) {
        for output in outputs {
            let spans: Vec<Span<'static>> = output
                .spans
                .into_iter()
                .map(|segment| Span::styled(segment.text, segment.style))
                .collect();
            if let Some(column) = output.cursor {
                self.cursor = Some(CursorVisualPosition {
                    line: self.current_line_index,
                    column,
                });
            }
            self.lines.push(Line::from(spans));
            self.current_line_index += 1;
        }
    }

    fn finish(mut self) -> RenderResult {
        if self.lines.is_empty() {
            self.lines.push(Line::from(""));
        }
        let total_lines = self.lines.len();
        RenderResult {
            lines: self.lines,
            cursor: self.cursor,
            total_lines,
        }
    }
}

#[derive(Clone, Debug)]
struct LineSegment {
    text: String,
    style: Style,
}

struct LineOutput {
    spans: Vec<LineSegment>,
    cursor: Option<u16>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FragmentKind {
    Word,
    Whitespace,
}

#[derive(Clone)]
struct Fragment {
    pieces: Vec<LineSegment>,
    kind: FragmentKind,
    width: usize,
    /// Column of the cursor relative to the fragment start.
    cursor: Option<usize>,
}

impl Fragment {
    fn new(kind: FragmentKind) -> Self {
        Self {
            pieces: Vec::new(),
            kind,
            width: 0,
            cursor: None,
        }
    }

    fn push_char(&mut self, ch: char, style: Style) {
        match self.pieces.last_mut() {
            Some(last) if last.style == style => last.text.push(ch),
            _ => self.pieces.push(LineSegment {
                text: ch.to_string(),
                style,
            }),
        }
        self.width += UnicodeWidthChar::width(ch).unwrap_or(0);
    }
}

enum FragmentItem {
    Token(Fragment),
    LineBreak,
}

/// Splits styled characters into words, whitespace runs and hard line
/// breaks, carrying the cursor along.
#[derive(Default)]
struct Tokenizer {
    items: Vec<FragmentItem>,
    current: Option<Fragment>,
    pending_cursor: bool,
}

impl Tokenizer {
    fn cursor(&mut self) {
        self.pending_cursor = true;
    }

    fn push(&mut self, ch: char, style: Style) {
        match ch {
            '\r' => {}
            '\n' => {
                self.flush();
                self.items.push(FragmentItem::LineBreak);
            }
            '\t' => {
                for _ in 0..4 {
                    self.push_visible(' ', style);
                }
            }
            ch => self.push_visible(ch, style),
        }
    }

    fn push_visible(&mut self, ch: char, style: Style) {
        let kind = if ch.is_whitespace() {
            FragmentKind::Whitespace
        } else {
            FragmentKind::Word
        };
        if self.current.as_ref().map(|token| token.kind) != Some(kind) {
            if let Some(token) = self.current.take() {
                self.items.push(FragmentItem::Token(token));
            }
            self.current = Some(Fragment::new(kind));
        }
        if let Some(token) = self.current.as_mut() {
            if std::mem::take(&mut self.pending_cursor) {
                token.cursor = Some(token.width);
            }
            token.push_char(ch, style);
        }
    }

    /// Ends the current token. A cursor still pending sits at its end, or in
    /// an empty token when there is nothing to attach it to.
    fn flush(&mut self) {
        let mut token = self.current.take();
        if std::mem::take(&mut self.pending_cursor) {
            let attached = token.get_or_insert_with(|| Fragment::new(FragmentKind::Word));
            attached.cursor = Some(attached.width);
        }
        if let Some(token) = token {
            self.items.push(FragmentItem::Token(token));
        }
    }

    fn finish(mut self) -> Vec<FragmentItem> {
        self.flush();
        self.items
    }
}

fn wrap_fragments(
    fragments: &[FragmentItem],
    first_prefix: &str,
    continuation_prefix: &str,
    width: usize,
    prefix_style: Style,
) -> Vec<LineOutput> {
    let mut outputs = Vec::new();
    let mut builder = LineBuilder::new(first_prefix, prefix_style);
    let mut pending_whitespace: Vec<Fragment> = Vec::new();

    for fragment in fragments {
        match fragment {
            FragmentItem::LineBreak => {
                builder.consume_pending(&mut pending_whitespace);
                outputs.push(builder.build_line());
                builder = LineBuilder::new(continuation_prefix, prefix_style);
            }
            FragmentItem::Token(token) => match token.kind {
                FragmentKind::Whitespace => {
                    pending_whitespace.push(token.clone());
                }
                FragmentKind::Word => {
                    let whitespace_width: usize =
                        pending_whitespace.iter().map(|item| item.width).sum();
                    if builder.width > builder.prefix_width
                        && builder.width + whitespace_width + token.width > width
                    {
                        builder.consume_pending(&mut pending_whitespace);
                        outputs.push(builder.build_line());
                        builder = LineBuilder::new(continuation_prefix, prefix_style);
                    }
                    builder.consume_pending(&mut pending_whitespace);
                    builder.append_token(token.clone());
                }
            },
        }
    }

    builder.consume_pending(&mut pending_whitespace);
    outputs.push(builder.build_line());
    outputs
}

struct LineBuilder {
    segments: Vec<LineSegment>,
    cursor: Option<u16>,
    width: usize,
    prefix_width: usize,
}

impl LineBuilder {
    fn new(prefix: &str, prefix_style: Style) -> Self {
        let prefix_width = visible_width(prefix);
        let mut segments = Vec::new();
        if !prefix.is_empty() {
            segments.push(LineSegment {
                text: prefix.to_string(),
                style: prefix_style,
            });
        }
        Self {
            segments,
            cursor: None,
            width: prefix_width,
            prefix_width,
        }
    }

    fn consume_pending(&mut self, pending_whitespace: &mut Vec<Fragment>) {
        for fragment in pending_whitespace.drain(..) {
            self.append_token(fragment);
        }
    }

    fn append_token(&mut self, fragment: Fragment) {
        if let Some(offset) = fragment.cursor {
            self.cursor = Some((self.width + offset) as u16);
        }
        self.width += fragment.width;
        self.segments.extend(fragment.pieces);
    }

    fn build_line(mut self) -> LineOutput {
        if self.segments.is_empty() {
            self.segments.push(LineSegment {
                text: String::new(),
                style: Style::default(),
            });
        }
        LineOutput {
            spans: self.segments,
            cursor: self.cursor,
        }
    }
}

fn visible_width(text: &str) -> usize {
    text.chars()
        .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(0))
        .sum()
}

fn line_width(line: &Line<'_>) -> usize {
    line.spans
        .iter()
        .map(|span| visible_width(span.content.as_ref()))
        .sum()
}

fn underline_string(width: usize, ch: char) -> String {
    std::iter::repeat_n(ch, width.max(1)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &Line<'_>) -> String {
        line.spans
            .iter()
            .map(|span| span.content.as_ref())
            .collect()
    }

    fn render(doc: &Document, selection: Selection, width: usize) -> RenderResult {
        render_document(doc, selection, width, &Theme::default())
    }

    fn texts(result: &RenderResult) -> Vec<String> {
        result.lines.iter().map(line_text).collect()
    }

    #[test]
    fn empty_document_renders_one_line() {
        let result = render(&Document::empty(), Selection::cursor(1), 20);
        assert_eq!(result.total_lines, 1);
        assert_eq!(
            result.cursor,
            Some(CursorVisualPosition { line: 0, column: 0 })
        );
    }

    #[test]
    fn paragraphs_are_separated_by_blank_lines() {
        let doc = Document::new(vec![
            Node::plain_paragraph("one"),
            Node::plain_paragraph("two"),
        ]);
        let result = render(&doc, Selection::cursor(7), 20);
        assert_eq!(texts(&result), vec!["one", "", "two"]);
        assert_eq!(
            result.cursor,
            Some(CursorVisualPosition { line: 2, column: 1 })
        );
    }

    #[test]
    fn long_paragraphs_wrap_at_word_boundaries() {
        let doc = Document::new(vec![Node::plain_paragraph("alpha beta gamma")]);
        // Cursor right before "gamma".
        let result = render(&doc, Selection::cursor(12), 11);
        assert_eq!(texts(&result), vec!["alpha beta ", "gamma"]);
        assert_eq!(
            result.cursor,
            Some(CursorVisualPosition { line: 1, column: 0 })
        );
    }

    #[test]
    fn cursor_at_paragraph_end() {
        let doc = Document::new(vec![Node::plain_paragraph("abc")]);
        let result = render(&doc, Selection::cursor(4), 20);
        assert_eq!(
            result.cursor,
            Some(CursorVisualPosition { line: 0, column: 3 })
        );
    }

    #[test]
    fn marks_map_to_styles() {
        let theme = Theme::default();
        let doc = Document::new(vec![Node::paragraph(vec![
            TextRun::marked("b", [MarkType::Strong]),
            TextRun::marked("i", [MarkType::Italics]),
            TextRun::marked("c", [MarkType::Code]),
        ])]);
        let result = render_document(&doc, Selection::cursor(1), 20, &theme);
        let spans = &result.lines[0].spans;
        assert_eq!(spans.len(), 3);
        assert!(spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert!(spans[1].style.add_modifier.contains(Modifier::ITALIC));
        assert_eq!(spans[2].style.fg, Some(theme.inline_code_fg));
    }

    #[test]
    fn code_blocks_get_fences_and_keep_their_lines() {
        let doc = Document::new(vec![Node::code_block("let a = 1;\nlet b = 2;")]);
        // Cursor at the start of the second line.
        let result = render(&doc, Selection::cursor(12), 8);
        assert_eq!(
            texts(&result),
            vec!["--------", "let a = 1;", "let b = 2;", "--------"]
        );
        assert_eq!(
            result.cursor,
            Some(CursorVisualPosition { line: 2, column: 0 })
        );
    }

    #[test]
    fn cursor_on_empty_line_of_code_block() {
        let doc = Document::new(vec![Node::code_block("a\n")]);
        let result = render(&doc, Selection::cursor(3), 10);
        assert_eq!(
            result.cursor,
            Some(CursorVisualPosition { line: 2, column: 0 })
        );
    }

    #[test]
    fn lists_and_quotes_get_prefixes() {
        let doc = Document::new(vec![
            Node::container(
                NodeKind::BulletList,
                vec![
                    Node::container(NodeKind::ListItem, vec![Node::plain_paragraph("a")]),
                    Node::container(NodeKind::ListItem, vec![Node::plain_paragraph("b")]),
                ],
            ),
            Node::container(
                NodeKind::OrderedList,
                vec![Node::container(
                    NodeKind::ListItem,
                    vec![Node::plain_paragraph("c")],
                )],
            ),
            Node::container(NodeKind::Blockquote, vec![Node::plain_paragraph("d")]),
        ]);
        let result = render(&doc, Selection::cursor(3), 20);
        assert_eq!(texts(&result), vec!["• a", "", "• b", "", "1. c", "", "| d"]);
        assert_eq!(
            result.cursor,
            Some(CursorVisualPosition { line: 0, column: 2 })
        );
    }

    #[test]
    fn checklist_items_show_their_state() {
        let item = |checked, text| {
            Node::container(
                NodeKind::ChecklistItem { checked },
                vec![Node::plain_paragraph(text)],
            )
        };
        let doc = Document::new(vec![Node::container(
            NodeKind::Checklist,
            vec![item(true, "done"), item(false, "open")],
        )]);
        let result = render(&doc, Selection::cursor(3), 20);
        assert_eq!(texts(&result), vec!["[x] done", "", "[ ] open"]);
    }

    #[test]
    fn headings_below_level_one_are_underlined() {
        let doc = Document::new(vec![Node::heading(2, vec![TextRun::new("Title")])]);
        let result = render(&doc, Selection::cursor(1), 20);
        assert_eq!(texts(&result), vec!["Title", "====="]);
    }

    #[test]
    fn selection_is_highlighted() {
        let theme = Theme::default();
        let doc = Document::new(vec![Node::plain_paragraph("abcd")]);
        let result = render_document(&doc, Selection::range(2, 4), 20, &theme);
        let spans: Vec<_> = result.lines[0]
            .spans
            .iter()
            .map(|span| (span.content.to_string(), span.style.bg))
            .collect();
        assert_eq!(
            spans,
            vec![
                ("a".to_string(), None),
                ("bc".to_string(), Some(theme.selection_bg)),
                ("d".to_string(), None),
            ]
        );
        assert_eq!(
            result.cursor,
            Some(CursorVisualPosition { line: 0, column: 3 })
        );
    }
}
