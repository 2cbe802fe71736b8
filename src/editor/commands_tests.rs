use super::*;
use crate::editor::{CommandContext, EdgeNavigation, LogicalLines};
use crate::model::{EditorState, History, Schema};

fn state(children: Vec<Node>, selection: Selection) -> EditorState {
    EditorState::builder(Document::new(children))
        .selection(selection)
        .build()
}

fn run_with(
    state: &EditorState,
    edge: &EdgeNavigation,
    command: fn(&CommandContext<'_>) -> Option<Transaction>,
) -> Option<Transaction> {
    let history = History::default();
    let cx = CommandContext {
        state,
        history: &history,
        edge,
        geometry: &LogicalLines,
        input_rule: None,
    };
    command(&cx)
}

fn run(
    state: &EditorState,
    command: fn(&CommandContext<'_>) -> Option<Transaction>,
) -> Option<EditorState> {
    run_with(state, &EdgeNavigation::new(), command).map(|tr| state.apply(tr))
}

fn code(text: &str) -> TextRun {
    TextRun::marked(text, [MarkType::Code])
}

#[test]
fn backspace_merges_code_into_previous_paragraph() {
    // "foo" spans 0..5, the code block content starts at 6.
    let state = state(
        vec![Node::plain_paragraph("foo"), Node::code_block("bar")],
        Selection::cursor(6),
    );
    let next = run(&state, delete_code_block_backward).unwrap();
    assert_eq!(next.doc().children().len(), 1);
    assert_eq!(next.doc().children()[0].kind(), NodeKind::Paragraph);
    assert_eq!(next.doc().text_content(), "foobar");
    assert_eq!(next.selection(), Selection::cursor(4));
}

#[test]
fn backspace_merge_keeps_previous_marks_and_flattens_newlines() {
    let prev = Node::paragraph(vec![TextRun::marked("bold", [MarkType::Strong])]);
    let state = state(
        vec![prev, Node::code_block("a\nb")],
        Selection::cursor(7),
    );
    let next = run(&state, delete_code_block_backward).unwrap();
    let runs = next.doc().children()[0].runs();
    assert_eq!(runs[0], TextRun::marked("bold", [MarkType::Strong]));
    assert_eq!(runs[1], TextRun::new("a b"));
}

#[test]
fn backspace_turns_leading_code_block_into_paragraph() {
    let state = state(vec![Node::code_block("bar")], Selection::cursor(1));
    let next = run(&state, delete_code_block_backward).unwrap();
    assert_eq!(next.doc().children()[0], Node::plain_paragraph("bar"));
    assert_eq!(next.selection(), Selection::cursor(1));
}

#[test]
fn backspace_removes_empty_paragraph_before_code() {
    let state = state(
        vec![Node::empty_paragraph(), Node::code_block("x")],
        Selection::cursor(3),
    );
    let next = run(&state, delete_code_block_backward).unwrap();
    assert_eq!(next.doc().children(), &[Node::code_block("x")]);
    assert_eq!(next.selection(), Selection::cursor(1));
}

#[test]
fn backspace_after_a_heading_converts_in_place() {
    let heading = Node::heading(2, vec![TextRun::new("Title")]);
    let state = state(
        vec![heading.clone(), Node::code_block("x\ny")],
        Selection::cursor(8),
    );
    let next = run(&state, delete_code_block_backward).unwrap();
    assert_eq!(
        next.doc().children(),
        &[heading, Node::plain_paragraph("x y")]
    );
    assert_eq!(next.selection(), Selection::cursor(8));
}

#[test]
fn backspace_inside_code_text_is_declined() {
    let state = state(vec![Node::code_block("bar")], Selection::cursor(2));
    assert!(run(&state, delete_code_block_backward).is_none());

    let prose = self::state(vec![Node::plain_paragraph("bar")], Selection::cursor(1));
    assert!(run(&prose, delete_code_block_backward).is_none());
}

#[test]
fn escape_appends_paragraph_after_final_code_block() {
    let state = state(vec![Node::code_block("x")], Selection::cursor(2));
    let next = run(&state, escape_code_block_right).unwrap();
    assert_eq!(
        next.doc().children(),
        &[Node::code_block("x"), Node::empty_paragraph()]
    );
    assert_eq!(next.selection(), Selection::cursor(4));
}

#[test]
fn escape_down_needs_the_last_line() {
    let state = state(vec![Node::code_block("a\nb")], Selection::cursor(2));
    assert!(run(&state, escape_code_block_down).is_none());

    let at_end = self::state(vec![Node::code_block("a\nb")], Selection::cursor(4));
    assert!(run(&at_end, escape_code_block_down).is_some());
}

#[test]
fn escape_is_declined_when_content_follows() {
    let state = state(
        vec![Node::code_block("x"), Node::plain_paragraph("after")],
        Selection::cursor(2),
    );
    assert!(run(&state, escape_code_block_right).is_none());
}

#[test]
fn park_right_fires_on_trailing_code_edge() {
    // "a" then code "bc" then "d": content 1..5, code covers 2..4.
    let block = Node::paragraph(vec![TextRun::new("a"), code("bc"), TextRun::new("d")]);
    let state = state(vec![block.clone()], Selection::cursor(4));
    let tr = run_with(&state, &EdgeNavigation::new(), park_at_code_edge_right).unwrap();
    assert!(tr.meta().boundary_park);
    assert!(!tr.doc_changed());
    assert_eq!(tr.selection(), Selection::cursor(4));

    let inside = self::state(vec![block], Selection::cursor(3));
    assert!(run(&inside, park_at_code_edge_right).is_none());
}

#[test]
fn park_right_fires_when_code_ends_the_block() {
    let block = Node::paragraph(vec![TextRun::new("a"), code("b")]);
    let state = state(vec![block], Selection::cursor(3));
    assert!(run(&state, park_at_code_edge_right).is_some());
}

#[test]
fn park_left_fires_on_leading_code_edge() {
    let block = Node::paragraph(vec![TextRun::new("a"), code("bc"), TextRun::new("d")]);
    let state = state(vec![block.clone()], Selection::cursor(2));
    assert!(run(&state, park_at_code_edge_left).is_some());

    let trailing = self::state(vec![block], Selection::cursor(4));
    assert!(run(&trailing, park_at_code_edge_left).is_none());
}

#[test]
fn park_is_declined_while_already_parked() {
    let block = Node::paragraph(vec![TextRun::new("a"), code("bc"), TextRun::new("d")]);
    let state = state(vec![block], Selection::cursor(4));
    let mut edge = EdgeNavigation::new();
    edge.park();
    edge.view_updated();
    assert!(run_with(&state, &edge, park_at_code_edge_right).is_none());
}

#[test]
fn toggle_adds_then_removes_over_a_range() {
    let state = state(vec![Node::plain_paragraph("hello")], Selection::range(1, 4));
    let bold = run(&state, toggle_bold).unwrap();
    assert!(bold.doc().range_fully_marked(1, 4, MarkType::Strong));
    let plain = run(&bold, toggle_bold).unwrap();
    assert!(!plain.doc().range_has_mark(1, 6, MarkType::Strong));
}

#[test]
fn toggle_on_cursor_flips_stored_marks() {
    let state = state(vec![Node::plain_paragraph("hi")], Selection::cursor(3));
    let next = run(&state, toggle_italics).unwrap();
    assert!(next.stored_marks().unwrap().contains(MarkType::Italics));
    assert_eq!(next.doc(), state.doc());
}

#[test]
fn toggle_without_schema_mark_is_not_handled() {
    let state = EditorState::builder(Document::new(vec![Node::plain_paragraph("hi")]))
        .selection(Selection::range(1, 3))
        .schema(Schema::new([MarkType::Italics, MarkType::Code]))
        .build();
    assert!(run(&state, toggle_bold).is_none());
    assert!(run(&state, toggle_italics).is_some());
}

#[test]
fn toggle_inside_code_block_is_not_handled() {
    let state = state(vec![Node::code_block("let")], Selection::range(1, 3));
    assert!(run(&state, toggle_bold).is_none());
}

#[test]
fn undo_without_history_is_not_handled() {
    let state = state(vec![Node::plain_paragraph("hi")], Selection::cursor(1));
    assert!(run(&state, undo).is_none());
    assert!(run(&state, redo).is_none());
}
