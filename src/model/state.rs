use super::node::{Document, MarkSet};
use super::schema::Schema;
use super::selection::Selection;
use super::transform::Transaction;

/// One version of the editor: document, selection and stored marks.
#[derive(Clone, Debug)]
pub struct EditorState {
    doc: Document,
    selection: Selection,
    stored_marks: Option<MarkSet>,
    schema: Schema,
    version: u64,
}

impl EditorState {
    pub fn new(doc: Document) -> Self {
        Self::builder(doc).build()
    }

    pub fn builder(doc: Document) -> EditorStateBuilder {
        EditorStateBuilder {
            doc,
            selection: None,
            schema: Schema::basic(),
        }
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Marks the next typed text gets instead of the marks at the cursor.
    pub fn stored_marks(&self) -> Option<&MarkSet> {
        self.stored_marks.as_ref()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Incremented every time an applied transaction changes the document.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn tr(&self) -> Transaction {
        Transaction::new(self)
    }

    /// Produces the next state. The transaction was validated step by step
    /// while it was built, so applying it cannot fail.
    pub fn apply(&self, tr: Transaction) -> EditorState {
        let selection = tr.final_selection();
        let version = self.version + u64::from(tr.doc_changed());
        let stored_marks = tr.stored_marks().cloned();
        EditorState {
            doc: tr.doc().clone(),
            selection,
            stored_marks,
            schema: self.schema.clone(),
            version,
        }
    }
}

pub struct EditorStateBuilder {
    doc: Document,
    selection: Option<Selection>,
    schema: Schema,
}

impl EditorStateBuilder {
    pub fn selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn build(self) -> EditorState {
        let selection = match self.selection {
            Some(selection) => selection.near(&self.doc),
            None => Selection::at_start(&self.doc),
        };
        EditorState {
            doc: self.doc,
            selection,
            stored_marks: None,
            schema: self.schema,
            version: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;

    #[test]
    fn apply_bumps_version_only_for_document_changes() {
        let state = EditorState::new(Document::new(vec![Node::plain_paragraph("ab")]));
        assert_eq!(state.selection(), Selection::cursor(1));

        let mut tr = state.tr();
        tr.set_selection(Selection::cursor(3)).unwrap();
        let moved = state.apply(tr);
        assert_eq!(moved.version(), 0);
        assert_eq!(moved.selection(), Selection::cursor(3));

        let mut tr = moved.tr();
        tr.delete(1, 2).unwrap();
        let edited = moved.apply(tr);
        assert_eq!(edited.version(), 1);
        assert_eq!(edited.doc().text_content(), "b");
        assert_eq!(edited.selection(), Selection::cursor(2));
    }
}
