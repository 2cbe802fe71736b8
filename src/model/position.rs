use super::node::{Document, MarkSet, Node};
use super::ModelError;

#[derive(Clone, Copy, Debug)]
struct Level<'a> {
    node: &'a Node,
    index: usize,
    content_start: usize,
}

/// A document position annotated with its ancestors.
///
/// Depth 0 is the document root. For a position inside a textblock the
/// deepest level is that textblock, and `index(depth)` is the index of the
/// text run the position falls into.
#[derive(Clone, Debug)]
pub struct ResolvedPos<'a> {
    pos: usize,
    levels: Vec<Level<'a>>,
    parent_offset: usize,
    text_offset: usize,
}

impl<'a> ResolvedPos<'a> {
    pub(crate) fn resolve(doc: &'a Document, pos: usize) -> Result<Self, ModelError> {
        let size = doc.content_size();
        if pos > size {
            return Err(ModelError::PositionOutOfRange { pos, size });
        }

        let mut levels = Vec::new();
        let mut node = doc.root();
        let mut content_start = 0;
        let mut parent_offset = pos;
        loop {
            let (index, offset) = node.find_index(parent_offset);
            levels.push(Level {
                node,
                index,
                content_start,
            });
            let rem = parent_offset - offset;
            if node.is_textblock() {
                return Ok(Self {
                    pos,
                    levels,
                    parent_offset,
                    text_offset: rem,
                });
            }
            if rem == 0 {
                break;
            }
            let Some(child) = node.child(index) else {
                break;
            };
            node = child;
            content_start += offset + 1;
            parent_offset = rem - 1;
        }

        Ok(Self {
            pos,
            levels,
            parent_offset,
            text_offset: 0,
        })
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn node(&self, depth: usize) -> &'a Node {
        self.levels[depth.min(self.depth())].node
    }

    pub fn parent(&self) -> &'a Node {
        self.node(self.depth())
    }

    /// Index into the node at `depth`: the child the position points into (or
    /// sits before), or the text run for a textblock parent.
    pub fn index(&self, depth: usize) -> usize {
        self.levels[depth.min(self.depth())].index
    }

    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    /// Offset into the text run at `index(depth)`; zero at run boundaries.
    pub fn text_offset(&self) -> usize {
        self.text_offset
    }

    /// Position where the content of the node at `depth` begins.
    pub fn start(&self, depth: usize) -> usize {
        self.levels[depth.min(self.depth())].content_start
    }

    /// Position where the content of the node at `depth` ends.
    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content_size()
    }

    /// Position directly before the node at `depth`. The root has none.
    pub fn before(&self, depth: usize) -> Option<usize> {
        (depth > 0 && depth <= self.depth()).then(|| self.start(depth) - 1)
    }

    /// Position directly after the node at `depth`. The root has none.
    pub fn after(&self, depth: usize) -> Option<usize> {
        (depth > 0 && depth <= self.depth()).then(|| self.end(depth) + 1)
    }

    /// Child indices leading from the root to the node at `depth`.
    pub fn path_to(&self, depth: usize) -> Vec<usize> {
        self.levels[..depth.min(self.depth())]
            .iter()
            .map(|level| level.index)
            .collect()
    }

    pub fn is_in_textblock(&self) -> bool {
        self.parent().is_textblock()
    }

    /// Marks in effect at this position: those of the character before it, or
    /// of the character after it when the position starts its parent.
    pub fn marks(&self) -> MarkSet {
        let parent = self.parent();
        if !parent.is_textblock() || parent.is_empty() {
            return MarkSet::empty();
        }
        let runs = parent.runs();
        let index = self.index(self.depth());
        if self.text_offset > 0 {
            return runs[index].marks().clone();
        }
        match index.checked_sub(1).and_then(|idx| runs.get(idx)) {
            Some(before) => before.marks().clone(),
            None => runs
                .get(index)
                .map(|run| run.marks().clone())
                .unwrap_or_default(),
        }
    }

    /// Whether `other` lies in the same parent node as this position.
    pub fn same_parent(&self, other: &ResolvedPos<'_>) -> bool {
        self.depth() == other.depth() && self.start(self.depth()) == other.start(other.depth())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MarkType, NodeKind, TextRun};

    fn sample() -> Document {
        Document::new(vec![
            Node::paragraph(vec![
                TextRun::new("ab"),
                TextRun::marked("cd", [MarkType::Code]),
                TextRun::new("e"),
            ]),
            Node::container(
                NodeKind::Blockquote,
                vec![Node::plain_paragraph("q")],
            ),
        ])
    }

    #[test]
    fn resolves_inside_textblock() {
        let doc = sample();
        let pos = doc.resolve(3).unwrap();
        assert_eq!(pos.depth(), 1);
        assert_eq!(pos.parent().kind(), NodeKind::Paragraph);
        assert_eq!(pos.start(1), 1);
        assert_eq!(pos.end(1), 6);
        assert_eq!(pos.before(1), Some(0));
        assert_eq!(pos.after(1), Some(7));
        assert_eq!(pos.parent_offset(), 2);
        assert_eq!(pos.index(0), 0);
    }

    #[test]
    fn resolves_nested_blocks() {
        let doc = sample();
        let pos = doc.resolve(9).unwrap();
        assert_eq!(pos.depth(), 2);
        assert_eq!(pos.node(1).kind(), NodeKind::Blockquote);
        assert_eq!(pos.start(2), 9);
        assert_eq!(pos.path_to(2), vec![1, 0]);

        let between = doc.resolve(7).unwrap();
        assert_eq!(between.depth(), 0);
        assert_eq!(between.index(0), 1);
        assert!(!between.is_in_textblock());
    }

    #[test]
    fn marks_follow_the_character_before() {
        let doc = sample();
        assert!(doc.resolve(3).unwrap().marks().is_empty());
        assert!(doc.resolve(4).unwrap().marks().contains(MarkType::Code));
        assert!(doc.resolve(5).unwrap().marks().contains(MarkType::Code));
        assert!(doc.resolve(6).unwrap().marks().is_empty());
        assert!(doc.resolve(1).unwrap().marks().is_empty());
    }

    #[test]
    fn rejects_positions_past_the_end() {
        let doc = sample();
        assert!(doc.resolve(doc.content_size()).is_ok());
        assert!(matches!(
            doc.resolve(doc.content_size() + 1),
            Err(ModelError::PositionOutOfRange { .. })
        ));
    }
}
