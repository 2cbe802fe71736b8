use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, trace};

use crate::config::EditorConfig;
use crate::model::{EditorState, History, Transaction};

pub mod base;
pub mod commands;
mod edge_nav;
mod geometry;
mod input_rules;
mod keymap;

pub use edge_nav::EdgeNavigation;
pub use geometry::{Direction, LogicalLines, ViewGeometry};
pub use input_rules::{
    AppliedInputRule, InputRule, InputRules, RuleHandler, RuleMatch, undo_input_rule,
};
pub use keymap::{Key, KeyName, KeyParseError, Keymap};

/// What a command gets to look at. Commands never mutate anything; they
/// return a transaction and the view applies it.
pub struct CommandContext<'a> {
    pub state: &'a EditorState,
    pub history: &'a History,
    pub edge: &'a EdgeNavigation,
    pub geometry: &'a dyn ViewGeometry,
    /// The last input-rule rewrite, while it is still the latest change.
    pub input_rule: Option<&'a AppliedInputRule>,
}

/// A key handler. `None` means the key was not handled.
pub type Command = for<'a> fn(&CommandContext<'a>) -> Option<Transaction>;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("invalid input rule pattern")]
    Pattern(#[from] regex::Error),
    #[error("invalid key binding")]
    Key(#[from] KeyParseError),
}

/// One open document: the current state plus everything that lives exactly
/// as long as the view does.
pub struct EditorView {
    state: EditorState,
    history: History,
    edge: EdgeNavigation,
    input_rule: Option<AppliedInputRule>,
    input_rules: InputRules,
    keymaps: Vec<Keymap>,
    geometry: Box<dyn ViewGeometry>,
    scroll_requested: bool,
}

impl EditorView {
    pub fn new(state: EditorState, config: &EditorConfig) -> Result<Self, EditorError> {
        let history = History::new(
            config.history_depth,
            Duration::from_millis(config.history_group_delay_ms),
        );
        Ok(Self {
            state,
            history,
            edge: EdgeNavigation::new(),
            input_rule: None,
            input_rules: InputRules::standard(config.input_rule_lookbehind)?,
            keymaps: default_keymaps()?,
            geometry: Box::new(LogicalLines),
            scroll_requested: false,
        })
    }

    pub fn with_geometry(mut self, geometry: impl ViewGeometry + 'static) -> Self {
        self.geometry = Box::new(geometry);
        self
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn edge_navigation(&self) -> &EdgeNavigation {
        &self.edge
    }

    pub fn keymaps(&self) -> &[Keymap] {
        &self.keymaps
    }

    /// Runs the key through the keymaps in order. Keys that no keymap
    /// handles and that type text go through [`EditorView::handle_text_input`].
    pub fn handle_key(&mut self, key: Key) -> bool {
        let mut handled = None;
        {
            let cx = self.context();
            for keymap in &self.keymaps {
                let Some(command) = keymap.get(&key) else {
                    continue;
                };
                if let Some(tr) = command(&cx) {
                    handled = Some((keymap.name(), tr));
                    break;
                }
            }
        }
        if let Some((keymap, tr)) = handled {
            debug!(keymap, key = %key, "key handled");
            self.dispatch(tr);
            return true;
        }
        match key.text() {
            Some(text) => self.handle_text_input(&text),
            None => false,
        }
    }

    /// Offers typed text to the input rules, inserting it plainly when none
    /// of them fires.
    pub fn handle_text_input(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let selection = self.state.selection();
        let tr = self
            .input_rules
            .handle_text_input(&self.state, selection.from(), selection.to(), text)
            .or_else(|| base::insert_text(&self.state, text));
        match tr {
            Some(tr) => {
                self.dispatch(tr);
                true
            }
            None => false,
        }
    }

    /// Runs a single command against the current state.
    pub fn run(&mut self, command: Command) -> bool {
        let tr = command(&self.context());
        match tr {
            Some(tr) => {
                self.dispatch(tr);
                true
            }
            None => false,
        }
    }

    /// Applies `tr` and updates everything that follows the state: history,
    /// the input-rule undo record and the edge-navigation flags.
    pub fn dispatch(&mut self, tr: Transaction) {
        if tr.meta().boundary_park {
            self.edge.park();
        }
        if let Some(action) = tr.meta().history {
            debug!(?action, "history step");
        }
        self.history.record(&self.state, &tr, Instant::now());
        self.input_rule = match AppliedInputRule::from_transaction(&tr) {
            Some(applied) => Some(applied),
            None if tr.doc_changed() || tr.selection_set() => None,
            None => self.input_rule.take(),
        };
        self.scroll_requested |= tr.scrolled_into_view();
        self.state = self.state.apply(tr);
        self.edge.view_updated();
        trace!(version = self.state.version(), "transaction applied");
    }

    /// Whether a transaction asked for the cursor to be scrolled into view
    /// since the last call.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }

    fn context(&self) -> CommandContext<'_> {
        CommandContext {
            state: &self.state,
            history: &self.history,
            edge: &self.edge,
            geometry: self.geometry.as_ref(),
            input_rule: self.input_rule.as_ref(),
        }
    }
}

/// The keymaps in the order they are consulted.
fn default_keymaps() -> Result<Vec<Keymap>, KeyParseError> {
    Ok(vec![
        Keymap::new("input_rule_undo").bind("Mod-z", undo_input_rule)?,
        Keymap::new("history")
            .bind("Mod-z", commands::undo)?
            .bind("Mod-y", commands::redo)?
            .bind("Mod-Shift-z", commands::redo)?,
        Keymap::new("formatting")
            .bind("Mod-b", commands::toggle_bold)?
            .bind("Mod-i", commands::toggle_italics)?,
        Keymap::new("code_block_backspace").bind("Backspace", commands::delete_code_block_backward)?,
        Keymap::new("code_block_escape")
            .bind("ArrowRight", commands::escape_code_block_right)?
            .bind("ArrowDown", commands::escape_code_block_down)?,
        Keymap::new("inline_code_edges")
            .bind("ArrowRight", commands::park_at_code_edge_right)?
            .bind("ArrowLeft", commands::park_at_code_edge_left)?,
        base_keymap()?,
    ])
}

fn base_keymap() -> Result<Keymap, KeyParseError> {
    Keymap::new("base")
        .bind("Enter", base::split_block)?
        .bind("Backspace", base::delete_backward)?
        .bind("Delete", base::delete_forward)?
        .bind("ArrowLeft", base::move_left)?
        .bind("ArrowRight", base::move_right)?
        .bind("ArrowUp", base::move_up)?
        .bind("ArrowDown", base::move_down)?
        .bind("Shift-ArrowLeft", base::extend_left)?
        .bind("Shift-ArrowRight", base::extend_right)?
        .bind("Home", base::line_start)?
        .bind("End", base::line_end)?
        .bind("Mod-a", base::select_all)
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod editor_tests;
