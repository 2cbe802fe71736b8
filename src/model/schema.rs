use std::fmt;

/// Block node kinds. `Doc` only ever appears as the document root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Doc,
    Paragraph,
    CodeBlock,
    Heading { level: u8 },
    Blockquote,
    BulletList,
    OrderedList,
    ListItem,
    Checklist,
    ChecklistItem { checked: bool },
}

impl NodeKind {
    /// Textblocks hold inline text runs; every other kind holds blocks.
    pub fn is_textblock(self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph | NodeKind::CodeBlock | NodeKind::Heading { .. }
        )
    }

    pub fn allows_marks(self) -> bool {
        matches!(self, NodeKind::Paragraph | NodeKind::Heading { .. })
    }

    pub fn is_code(self) -> bool {
        matches!(self, NodeKind::CodeBlock)
    }

    /// Whether a node of kind `child` may be placed directly inside `self`.
    pub fn accepts_child(self, child: NodeKind) -> bool {
        match self {
            NodeKind::Doc
            | NodeKind::Blockquote
            | NodeKind::ListItem
            | NodeKind::ChecklistItem { .. } => !matches!(
                child,
                NodeKind::Doc | NodeKind::ListItem | NodeKind::ChecklistItem { .. }
            ),
            NodeKind::BulletList | NodeKind::OrderedList => child == NodeKind::ListItem,
            NodeKind::Checklist => matches!(child, NodeKind::ChecklistItem { .. }),
            NodeKind::Paragraph | NodeKind::CodeBlock | NodeKind::Heading { .. } => false,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Doc => "doc",
            NodeKind::Paragraph => "paragraph",
            NodeKind::CodeBlock => "code_block",
            NodeKind::Heading { .. } => "heading",
            NodeKind::Blockquote => "blockquote",
            NodeKind::BulletList => "bullet_list",
            NodeKind::OrderedList => "ordered_list",
            NodeKind::ListItem => "list_item",
            NodeKind::Checklist => "checklist",
            NodeKind::ChecklistItem { .. } => "checklist_item",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Heading { level } => write!(f, "heading({level})"),
            NodeKind::ChecklistItem { checked } => write!(f, "checklist_item({checked})"),
            kind => f.write_str(kind.name()),
        }
    }
}

/// Inline mark types. The derive order is the canonical order inside a
/// [`MarkSet`](super::MarkSet).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MarkType {
    Strong,
    Italics,
    Code,
    Underline,
    Strike,
    Highlight,
}

impl MarkType {
    pub const ALL: [MarkType; 6] = [
        MarkType::Strong,
        MarkType::Italics,
        MarkType::Code,
        MarkType::Underline,
        MarkType::Strike,
        MarkType::Highlight,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MarkType::Strong => "strong",
            MarkType::Italics => "italics",
            MarkType::Code => "code",
            MarkType::Underline => "underline",
            MarkType::Strike => "strike",
            MarkType::Highlight => "highlight",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        MarkType::ALL.into_iter().find(|mark| mark.name() == name)
    }
}

impl fmt::Display for MarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The set of mark types an editor instance knows about.
///
/// Node kinds are closed and always present; marks can be left out, in which
/// case every command that needs the missing mark reports itself as not
/// applicable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    marks: Vec<MarkType>,
}

impl Schema {
    pub fn new(marks: impl IntoIterator<Item = MarkType>) -> Self {
        let mut marks: Vec<MarkType> = marks.into_iter().collect();
        marks.sort();
        marks.dedup();
        Self { marks }
    }

    pub fn basic() -> Self {
        Self::new(MarkType::ALL)
    }

    pub fn has_mark(&self, mark: MarkType) -> bool {
        self.marks.contains(&mark)
    }

    /// Looks a mark type up by name, returning `None` when it is unknown or not
    /// part of this schema.
    pub fn mark(&self, name: &str) -> Option<MarkType> {
        MarkType::from_name(name).filter(|mark| self.has_mark(*mark))
    }

    pub fn marks(&self) -> &[MarkType] {
        &self.marks
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::basic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_respects_schema_contents() {
        let schema = Schema::new([MarkType::Code]);
        assert_eq!(schema.mark("code"), Some(MarkType::Code));
        assert_eq!(schema.mark("strong"), None);
        assert_eq!(schema.mark("underline"), None);
        assert_eq!(Schema::basic().mark("italics"), Some(MarkType::Italics));
    }

    #[test]
    fn lists_only_accept_items() {
        assert!(NodeKind::BulletList.accepts_child(NodeKind::ListItem));
        assert!(!NodeKind::BulletList.accepts_child(NodeKind::Paragraph));
        assert!(NodeKind::ListItem.accepts_child(NodeKind::CodeBlock));
        assert!(!NodeKind::Paragraph.accepts_child(NodeKind::Paragraph));
    }

    #[test]
    fn checklists_only_accept_checklist_items() {
        let item = NodeKind::ChecklistItem { checked: true };
        assert!(NodeKind::Checklist.accepts_child(item));
        assert!(!NodeKind::Checklist.accepts_child(NodeKind::ListItem));
        assert!(!NodeKind::BulletList.accepts_child(item));
        assert!(item.accepts_child(NodeKind::Checklist));
        assert!(!item.accepts_child(item));
    }
}
