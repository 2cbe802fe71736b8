use std::{collections::HashMap, fmt, str::FromStr};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use thiserror::Error;

use super::Command;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyParseError {
    #[error("empty key description")]
    Empty,
    #[error("unknown modifier `{0}`")]
    UnknownModifier(String),
    #[error("unknown key name `{0}`")]
    UnknownKey(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyName {
    Char(char),
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Backspace,
    Delete,
    Enter,
    Tab,
    Escape,
    Home,
    End,
    PageUp,
    PageDown,
}

impl KeyName {
    fn from_name(name: &str) -> Option<Self> {
        let key = match name {
            "ArrowLeft" | "Left" => KeyName::ArrowLeft,
            "ArrowRight" | "Right" => KeyName::ArrowRight,
            "ArrowUp" | "Up" => KeyName::ArrowUp,
            "ArrowDown" | "Down" => KeyName::ArrowDown,
            "Backspace" => KeyName::Backspace,
            "Delete" | "Del" => KeyName::Delete,
            "Enter" | "Return" => KeyName::Enter,
            "Tab" => KeyName::Tab,
            "Escape" | "Esc" => KeyName::Escape,
            "Home" => KeyName::Home,
            "End" => KeyName::End,
            "PageUp" => KeyName::PageUp,
            "PageDown" => KeyName::PageDown,
            "Space" => KeyName::Char(' '),
            _ => {
                let mut chars = name.chars();
                let ch = chars.next()?;
                if chars.next().is_some() {
                    return None;
                }
                KeyName::Char(ch)
            }
        };
        Some(key)
    }

    fn name(&self) -> String {
        match self {
            KeyName::Char(' ') => "Space".to_string(),
            KeyName::Char(ch) => ch.to_string(),
            KeyName::ArrowLeft => "ArrowLeft".to_string(),
            KeyName::ArrowRight => "ArrowRight".to_string(),
            KeyName::ArrowUp => "ArrowUp".to_string(),
            KeyName::ArrowDown => "ArrowDown".to_string(),
            KeyName::Backspace => "Backspace".to_string(),
            KeyName::Delete => "Delete".to_string(),
            KeyName::Enter => "Enter".to_string(),
            KeyName::Tab => "Tab".to_string(),
            KeyName::Escape => "Escape".to_string(),
            KeyName::Home => "Home".to_string(),
            KeyName::End => "End".to_string(),
            KeyName::PageUp => "PageUp".to_string(),
            KeyName::PageDown => "PageDown".to_string(),
        }
    }
}

/// A normalised key chord. `Mod` is the Control key.
///
/// Letters are stored lowercase with an explicit shift flag; other printable
/// characters already reflect shift and never carry it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Key {
    name: KeyName,
    ctrl: bool,
    alt: bool,
    shift: bool,
}

impl Key {
    pub fn new(name: KeyName) -> Self {
        Self {
            name,
            ctrl: false,
            alt: false,
            shift: false,
        }
        .normalized()
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self.normalized()
    }

    pub fn char(ch: char) -> Self {
        Self::new(KeyName::Char(ch))
    }

    pub fn name(&self) -> KeyName {
        self.name
    }

    /// Parses ProseMirror-style descriptions such as `Mod-Shift-z`.
    pub fn parse(spec: &str) -> Result<Self, KeyParseError> {
        if spec.is_empty() {
            return Err(KeyParseError::Empty);
        }
        // A trailing "-" names the minus key itself.
        let (modifiers, base) = match spec.strip_suffix("--") {
            Some(prefix) => (prefix, "-"),
            None if spec == "-" => ("", "-"),
            None => match spec.rsplit_once('-') {
                Some((modifiers, base)) => (modifiers, base),
                None => ("", spec),
            },
        };
        let name = KeyName::from_name(base).ok_or_else(|| KeyParseError::UnknownKey(base.into()))?;
        let mut key = Key {
            name,
            ctrl: false,
            alt: false,
            shift: false,
        };
        for modifier in modifiers.split('-').filter(|part| !part.is_empty()) {
            match modifier {
                "Mod" | "Ctrl" | "Control" | "c" => key.ctrl = true,
                "Alt" | "a" => key.alt = true,
                "Shift" | "s" => key.shift = true,
                other => return Err(KeyParseError::UnknownModifier(other.into())),
            }
        }
        Ok(key.normalized())
    }

    /// Converts a terminal key press. Releases, repeats of unknown keys and
    /// function keys yield `None`.
    pub fn from_event(event: &KeyEvent) -> Option<Self> {
        if event.kind == KeyEventKind::Release {
            return None;
        }
        let name = match event.code {
            KeyCode::Char(ch) => KeyName::Char(ch),
            KeyCode::Left => KeyName::ArrowLeft,
            KeyCode::Right => KeyName::ArrowRight,
            KeyCode::Up => KeyName::ArrowUp,
            KeyCode::Down => KeyName::ArrowDown,
            KeyCode::Backspace => KeyName::Backspace,
            KeyCode::Delete => KeyName::Delete,
            KeyCode::Enter => KeyName::Enter,
            KeyCode::Tab => KeyName::Tab,
            KeyCode::Esc => KeyName::Escape,
            KeyCode::Home => KeyName::Home,
            KeyCode::End => KeyName::End,
            KeyCode::PageUp => KeyName::PageUp,
            KeyCode::PageDown => KeyName::PageDown,
            _ => return None,
        };
        let modifiers = event.modifiers;
        Some(
            Key {
                name,
                ctrl: modifiers.contains(KeyModifiers::CONTROL),
                alt: modifiers.contains(KeyModifiers::ALT),
                shift: modifiers.contains(KeyModifiers::SHIFT),
            }
            .normalized(),
        )
    }

    /// Text this key types when no keymap handles it.
    pub fn text(&self) -> Option<String> {
        if self.ctrl || self.alt {
            return None;
        }
        match self.name {
            KeyName::Char(ch) if self.shift => Some(ch.to_uppercase().collect()),
            KeyName::Char(ch) => Some(ch.to_string()),
            _ => None,
        }
    }

    fn normalized(mut self) -> Self {
        if let KeyName::Char(ch) = self.name {
            if ch.is_uppercase() {
                self.name = KeyName::Char(ch.to_lowercase().next().unwrap_or(ch));
                self.shift = true;
            } else if !ch.is_alphabetic() {
                self.shift = false;
            }
        }
        self
    }
}

impl FromStr for Key {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::parse(s)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("Mod-")?;
        }
        if self.alt {
            f.write_str("Alt-")?;
        }
        if self.shift {
            f.write_str("Shift-")?;
        }
        f.write_str(&self.name.name())
    }
}

/// Named table of key bindings. The editor consults several keymaps in a
/// fixed order and stops at the first command that handles the key.
#[derive(Clone)]
pub struct Keymap {
    name: &'static str,
    bindings: HashMap<Key, Command>,
}

impl Keymap {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            bindings: HashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn bind(mut self, spec: &str, command: Command) -> Result<Self, KeyParseError> {
        let key = Key::parse(spec)?;
        self.bindings.insert(key, command);
        Ok(self)
    }

    pub fn get(&self, key: &Key) -> Option<Command> {
        self.bindings.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Debug for Keymap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.bindings.keys().map(Key::to_string).collect();
        keys.sort();
        f.debug_struct("Keymap")
            .field("name", &self.name)
            .field("keys", &keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prosemirror_names() {
        let key = Key::parse("Mod-b").unwrap();
        assert_eq!(key, Key::char('b').with_ctrl());
        assert_eq!(Key::parse("Mod-Shift-z").unwrap(), Key::char('Z').with_ctrl());
        assert_eq!(Key::parse("ArrowRight").unwrap(), Key::new(KeyName::ArrowRight));
        assert_eq!(
            Key::parse("Shift-ArrowLeft").unwrap(),
            Key::new(KeyName::ArrowLeft).with_shift()
        );
        assert_eq!(Key::parse("Mod--").unwrap(), Key::char('-').with_ctrl());
    }

    #[test]
    fn rejects_unknown_parts() {
        assert_eq!(Key::parse(""), Err(KeyParseError::Empty));
        assert_eq!(
            Key::parse("Hyper-x"),
            Err(KeyParseError::UnknownModifier("Hyper".into()))
        );
        assert_eq!(
            Key::parse("Mod-Banana"),
            Err(KeyParseError::UnknownKey("Banana".into()))
        );
    }

    #[test]
    fn converts_terminal_events() {
        let event = KeyEvent::new(KeyCode::Char('z'), KeyModifiers::CONTROL);
        assert_eq!(Key::from_event(&event), Some(Key::parse("Mod-z").unwrap()));

        let event = KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT);
        let key = Key::from_event(&event).unwrap();
        assert_eq!(key.text().as_deref(), Some("A"));

        let event = KeyEvent::new(KeyCode::Char('`'), KeyModifiers::NONE);
        assert_eq!(Key::from_event(&event).unwrap().text().as_deref(), Some("`"));

        let event = KeyEvent::new(KeyCode::F(5), KeyModifiers::NONE);
        assert_eq!(Key::from_event(&event), None);
    }

    #[test]
    fn displays_round_trip() {
        for spec in ["Mod-b", "Mod-Shift-z", "ArrowDown", "Shift-ArrowRight", "Backspace"] {
            assert_eq!(Key::parse(spec).unwrap().to_string(), spec);
        }
    }
}
