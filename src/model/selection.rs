use super::node::Document;

/// Either a collapsed cursor (`anchor == head`) or a range. Both ends always
/// point into textblock content once a selection has been applied to a state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    anchor: usize,
    head: usize,
}

impl Selection {
    pub fn cursor(pos: usize) -> Self {
        Self {
            anchor: pos,
            head: pos,
        }
    }

    pub fn range(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn anchor(&self) -> usize {
        self.anchor
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    pub(crate) fn map(&self, f: impl Fn(usize) -> usize) -> Self {
        Self {
            anchor: f(self.anchor),
            head: f(self.head),
        }
    }

    /// Whether both ends point into textblock content of `doc`.
    pub fn is_valid_in(&self, doc: &Document) -> bool {
        is_text_position(doc, self.anchor) && is_text_position(doc, self.head)
    }

    /// Moves each end that does not point into a textblock to the nearest
    /// position that does.
    pub fn near(&self, doc: &Document) -> Self {
        let fix = |pos: usize| {
            if is_text_position(doc, pos) {
                pos
            } else {
                nearest_text_position(doc, pos)
            }
        };
        self.map(fix)
    }

    /// The first text position of the document.
    pub fn at_start(doc: &Document) -> Self {
        Self::cursor(nearest_text_position(doc, 0))
    }

    /// The last text position of the document.
    pub fn at_end(doc: &Document) -> Self {
        Self::cursor(nearest_text_position(doc, doc.content_size()))
    }
}

pub(crate) fn is_text_position(doc: &Document, pos: usize) -> bool {
    doc.resolve(pos)
        .map(|resolved| resolved.is_in_textblock())
        .unwrap_or(false)
}

/// Closest textblock content position to `pos`, preferring later positions on
/// a tie. Documents always contain at least one textblock; if one somehow does
/// not, `pos` is clamped to the document size.
pub(crate) fn nearest_text_position(doc: &Document, pos: usize) -> usize {
    let mut best: Option<(usize, usize)> = None;
    for span in doc.textblock_spans() {
        let candidate = pos.clamp(span.start, span.end);
        let distance = candidate.abs_diff(pos);
        let better = match best {
            None => true,
            Some((_, best_distance)) => {
                distance < best_distance || (distance == best_distance && candidate > pos)
            }
        };
        if better {
            best = Some((candidate, distance));
        }
    }
    best.map(|(candidate, _)| candidate)
        .unwrap_or_else(|| pos.min(doc.content_size()))
}
