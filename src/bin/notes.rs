use std::{
    env, io,
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
};
use tracing::{error, info, warn};

use notes_tui::config::Config;
use notes_tui::editor::{EditorView, Key};
use notes_tui::logging;
use notes_tui::model::{Document, EditorState, Selection};
use notes_tui::note_file::{self, NoteFormat};
use notes_tui::render::render_document;
use notes_tui::theme::Theme;

const STATUS_TIMEOUT: Duration = Duration::from_secs(4);

fn main() -> Result<()> {
    run()
}

fn editor_wrap_configuration(width: usize) -> (usize, usize) {
    if width == 0 {
        return (1, 0);
    }
    if width < 60 {
        let wrap_width = width.saturating_sub(1).max(1);
        return (wrap_width, 0);
    }
    if width < 100 {
        let padding = 2.min(width / 2);
        let wrap_width = width.saturating_sub(padding.saturating_mul(2)).max(1);
        return (wrap_width, padding);
    }
    let max_padding = width.saturating_sub(1) / 2;
    let left_padding = (width.saturating_sub(100) / 2 + 4).min(max_padding);
    let wrap_width = width.saturating_sub(left_padding.saturating_mul(2)).max(1);
    (wrap_width, left_padding)
}

fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let Some(path_arg) = args.next() else {
        eprintln!("Usage: notes <note.ftml|note.md>");
        return Ok(());
    };
    let path = PathBuf::from(path_arg);

    let config = Config::load()?;
    let _log_guard = match logging::init(&config.log) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("logging disabled: {err:#}");
            None
        }
    };

    let mut app = App::open(path, &config)?;

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to initialize terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().ok();

    let res = run_app(&mut terminal, &mut app).context("application error");
    if let Err(err) = &res {
        error!("{err:#}");
    }

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    res
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();
    let mut needs_redraw = true;

    while !app.should_quit {
        if needs_redraw {
            terminal
                .draw(|frame| app.draw(frame))
                .context("failed to draw frame")?;
            needs_redraw = false;
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout).context("event poll failed")? {
            let evt = event::read().context("failed to read event")?;
            app.handle_event(evt)?;
            needs_redraw = true;
        }

        if last_tick.elapsed() >= tick_rate {
            let had_message = app.status_message.is_some();
            app.prune_status_message();
            last_tick = Instant::now();
            if had_message && app.status_message.is_none() {
                needs_redraw = true;
            }
        }
    }

    Ok(())
}

struct App {
    view: EditorView,
    theme: Theme,
    file_path: PathBuf,
    format: NoteFormat,
    saved: Document,
    wrap_width: Option<usize>,
    scroll_top: usize,
    follow_cursor: bool,
    last_viewport_height: usize,
    should_quit: bool,
    status_message: Option<(String, Instant)>,
}

impl App {
    fn open(path: PathBuf, config: &Config) -> Result<Self> {
        let format = NoteFormat::from_path(&path);
        let (document, status) = match note_file::load(&path) {
            Ok(note) if note.existed => (note.document, None),
            Ok(note) => (note.document, Some("New note".to_string())),
            Err(err) => {
                warn!(path = %path.display(), "{err:#}");
                (
                    Document::empty(),
                    Some(format!("{err:#}. Starting with an empty note.")),
                )
            }
        };
        info!(path = %path.display(), ?format, "note opened");

        let state = EditorState::builder(document.clone())
            .selection(Selection::at_start(&document))
            .build();
        let view = EditorView::new(state, &config.editor)?;

        Ok(Self {
            view,
            theme: Theme::default(),
            file_path: path,
            format,
            saved: document,
            wrap_width: config.editor.wrap_width,
            scroll_top: 0,
            follow_cursor: true,
            last_viewport_height: 0,
            should_quit: false,
            status_message: status.map(|msg| (msg, Instant::now())),
        })
    }

    fn dirty(&self) -> bool {
        self.view.state().doc() != &self.saved
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(
                key_event @ KeyEvent {
                    code,
                    modifiers,
                    kind: KeyEventKind::Press | KeyEventKind::Repeat,
                    ..
                },
            ) => match (code, modifiers) {
                (KeyCode::Char('q') | KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => {
                    self.should_quit = true;
                }
                (KeyCode::Char('s'), m) if m.contains(KeyModifiers::CONTROL) => {
                    self.save()?;
                }
                (KeyCode::PageUp, _) => self.scroll_by_lines(-(self.page_size() as isize)),
                (KeyCode::PageDown, _) => self.scroll_by_lines(self.page_size() as isize),
                _ => {
                    if let Some(key) = Key::from_event(&key_event) {
                        self.view.handle_key(key);
                    }
                    if self.view.take_scroll_request() {
                        self.follow_cursor = true;
                    }
                }
            },
            Event::Paste(text) => {
                self.view.handle_text_input(&text);
                self.follow_cursor |= self.view.take_scroll_request();
            }
            Event::Resize(..) => self.follow_cursor = true,
            _ => {}
        }
        Ok(())
    }

    fn page_size(&self) -> usize {
        self.last_viewport_height.saturating_sub(1).max(1)
    }

    fn scroll_by_lines(&mut self, delta: isize) {
        self.follow_cursor = false;
        self.scroll_top = self.scroll_top.saturating_add_signed(delta);
    }

    fn save(&mut self) -> Result<()> {
        let document = self.view.state().doc().clone();
        note_file::save(&self.file_path, &document, self.format)?;
        info!(path = %self.file_path.display(), "note saved");
        self.saved = document;
        self.status_message = Some(("Saved".to_string(), Instant::now()));
        Ok(())
    }

    fn prune_status_message(&mut self) {
        if let Some((_, instant)) = &self.status_message
            && instant.elapsed() > STATUS_TIMEOUT
        {
            self.status_message = None;
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height == 0 || area.width == 0 {
            return;
        }

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);
        let editor_area = vertical[0];
        let status_area = vertical[1];

        let (wrap_width, left_padding) = match self.wrap_width {
            Some(width) => (width.max(1), 0),
            None => editor_wrap_configuration(editor_area.width as usize),
        };
        let text_area = Rect {
            x: editor_area.x + left_padding as u16,
            width: editor_area.width.saturating_sub(left_padding as u16),
            ..editor_area
        };

        let state = self.view.state();
        let render = render_document(state.doc(), state.selection(), wrap_width, &self.theme);

        let viewport_height = text_area.height as usize;
        self.last_viewport_height = viewport_height;
        let max_scroll = render.total_lines.saturating_sub(viewport_height.max(1));
        if self.follow_cursor
            && let Some(cursor) = render.cursor
        {
            self.scroll_top = scroll_top_for_cursor(self.scroll_top, cursor.line, viewport_height);
            self.follow_cursor = false;
        }
        self.scroll_top = self.scroll_top.min(max_scroll);

        let paragraph = Paragraph::new(Text::from(render.lines))
            .block(Block::default().borders(Borders::NONE))
            .scroll((self.scroll_top as u16, 0));
        frame.render_widget(paragraph, text_area);

        if let Some(cursor) = render.cursor
            && cursor.line >= self.scroll_top
            && cursor.line < self.scroll_top + viewport_height
            && text_area.width > 0
        {
            let cursor_y = text_area.y + (cursor.line - self.scroll_top) as u16;
            let cursor_x = text_area.x + cursor.column.min(text_area.width - 1);
            frame.set_cursor_position(Position::new(cursor_x, cursor_y));
        }

        let status_line = self.status_line(status_area.width as usize);
        let status_widget = Paragraph::new(status_line)
            .block(Block::default().borders(Borders::NONE))
            .style(self.theme.status_bar_style());
        frame.render_widget(status_widget, status_area);
    }

    fn status_line(&mut self, terminal_width: usize) -> Line<'static> {
        self.prune_status_message();

        let state = self.view.state();
        let selection = state.selection();
        let position = if selection.is_empty() {
            format!("@{}", selection.head())
        } else {
            format!("@{}-{}", selection.from(), selection.to())
        };

        if let Some((message, _)) = &self.status_message {
            return Line::from(vec![
                Span::raw(format!("{position} ")),
                Span::raw(message.clone()),
            ]);
        }

        let marker = if self.dirty() { "*" } else { "" };
        let words = state.doc().text_content().split_whitespace().count();
        let mut spans = vec![
            Span::raw(format!("{position} ")),
            Span::styled(
                format!("{}{}", self.file_path.display(), marker),
                self.theme.filename_style(),
            ),
            Span::raw(format!(", {words} words")),
        ];

        let left_width: usize = spans.iter().map(|span| span.content.chars().count()).sum();
        let shortcuts = "^Z:Undo ^S:Save ^Q:Quit";
        let shortcuts_width = shortcuts.chars().count();
        if left_width + 1 + shortcuts_width <= terminal_width {
            let padding = terminal_width - left_width - shortcuts_width;
            spans.push(Span::raw(" ".repeat(padding)));
            spans.push(Span::raw(shortcuts));
        }

        Line::from(spans)
    }
}

/// Keeps one line of margin above and below the cursor when the viewport
/// allows it.
fn scroll_top_for_cursor(scroll_top: usize, cursor_line: usize, viewport: usize) -> usize {
    if viewport == 0 {
        return scroll_top;
    }
    let margin = if viewport >= 3 { 1 } else { 0 };
    let bottom_offset = viewport.saturating_sub(1).saturating_sub(margin);
    if cursor_line < scroll_top.saturating_add(margin) {
        cursor_line.saturating_sub(margin)
    } else if cursor_line > scroll_top.saturating_add(bottom_offset) {
        cursor_line.saturating_sub(bottom_offset)
    } else {
        scroll_top
    }
}
