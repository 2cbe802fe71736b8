use ratatui::style::{Color, Modifier, Style};

/// Colors used by the note view
#[derive(Clone, Debug)]
pub struct Theme {
    /// Foreground (text) color for the status bar
    pub status_bar_fg: Color,

    /// Background color for the status bar
    pub status_bar_bg: Color,

    /// Color for the note's file name in the status bar
    pub filename_color: Color,

    /// Foreground color for active selection
    pub selection_fg: Color,

    /// Background color for active selection
    pub selection_bg: Color,

    /// Foreground color for text with the code mark
    pub inline_code_fg: Color,

    /// Background color for text with the code mark
    pub inline_code_bg: Color,

    /// Foreground color for code block lines
    pub code_block_fg: Color,

    /// Color of the fence lines drawn around code blocks
    pub code_fence_fg: Color,

    /// Color of quote bars and list bullets
    pub marker_fg: Color,

    /// Background color for highlighted text
    pub highlight_bg: Color,

    /// Foreground color for linked text
    pub link_fg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            status_bar_fg: Color::White,
            status_bar_bg: Color::Blue,
            filename_color: Color::LightYellow,
            selection_fg: Color::White,
            selection_bg: Color::LightBlue,
            inline_code_fg: Color::LightRed,
            inline_code_bg: Color::Reset,
            code_block_fg: Color::LightGreen,
            code_fence_fg: Color::DarkGray,
            marker_fg: Color::DarkGray,
            highlight_bg: Color::Yellow,
            link_fg: Color::LightCyan,
        }
    }
}

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_bar_style(&self) -> Style {
        Style::default()
            .fg(self.status_bar_fg)
            .bg(self.status_bar_bg)
    }

    pub fn filename_style(&self) -> Style {
        Style::default().fg(self.filename_color)
    }

    pub fn selection_style(&self) -> Style {
        Style::default().fg(self.selection_fg).bg(self.selection_bg)
    }

    pub fn inline_code_style(&self) -> Style {
        Style::default()
            .fg(self.inline_code_fg)
            .bg(self.inline_code_bg)
    }

    pub fn code_block_style(&self) -> Style {
        Style::default().fg(self.code_block_fg)
    }

    pub fn code_fence_style(&self) -> Style {
        Style::default().fg(self.code_fence_fg)
    }

    pub fn highlight_style(&self) -> Style {
        Style::default().bg(self.highlight_bg)
    }

    pub fn link_style(&self) -> Style {
        Style::default()
            .fg(self.link_fg)
            .add_modifier(Modifier::UNDERLINED)
    }

    pub fn marker_style(&self) -> Style {
        Style::default().fg(self.marker_fg)
    }

    /// Headings are bold; level one is underlined as well.
    pub fn heading_style(&self, level: u8) -> Style {
        let style = Style::default().add_modifier(Modifier::BOLD);
        if level <= 1 {
            style.add_modifier(Modifier::UNDERLINED)
        } else {
            style
        }
    }
}
