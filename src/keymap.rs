use anyhow::{bail, Result};
use crossterm::event::KeyCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Advance,
    Retreat,
    Descend,
    Ascend,
    Quit,
    Open,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyBindings {
    #[serde(default = "default_advance")]
    pub advance: char,
    #[serde(default = "default_retreat")]
    pub retreat: char,
    #[serde(default = "default_descend")]
    pub descend: char,
    #[serde(default = "default_ascend")]
    pub ascend: char,
    #[serde(default = "default_quit")]
    pub quit: char,
    #[serde(default = "default_open")]
    pub open: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            advance: default_advance(),
            retreat: default_retreat(),
            descend: default_descend(),
            ascend: default_ascend(),
            quit: default_quit(),
            open: default_open(),
        }
    }
}

fn default_advance() -> char {
    's'
}

fn default_retreat() -> char {
    'w'
}

fn default_descend() -> char {
    'd'
}

fn default_ascend() -> char {
    'a'
}

fn default_quit() -> char {
    'q'
}

fn default_open() -> char {
    'o'
}

impl KeyBindings {
    fn pairs(&self) -> [(char, Action); 6] {
        [
            (self.advance, Action::Advance),
            (self.retreat, Action::Retreat),
            (self.descend, Action::Descend),
            (self.ascend, Action::Ascend),
            (self.quit, Action::Quit),
            (self.open, Action::Open),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        let pairs = self.pairs();
        for (i, (key, action)) in pairs.iter().enumerate() {
            if key.is_control() || key.is_whitespace() {
                bail!("config: key for {action:?} must be a printable character");
            }
            if let Some((_, other)) = pairs[i + 1..].iter().find(|(other, _)| other == key) {
                bail!("config: key {key:?} is bound to both {action:?} and {other:?}");
            }
        }
        Ok(())
    }

    /// Hint for the status line, e.g. `s/w move  d in  a out  o browser  q quit`.
    pub fn hint(&self) -> String {
        format!(
            "{}/{} move  {} in  {} out  {} browser  {} quit",
            self.advance, self.retreat, self.descend, self.ascend, self.open, self.quit
        )
    }

    /// Maps a key to its action. Arrow keys, Enter, Backspace and Esc are
    /// fixed aliases on top of the configured characters.
    pub fn action(&self, code: KeyCode) -> Option<Action> {
        match code {
            KeyCode::Down => Some(Action::Advance),
            KeyCode::Up => Some(Action::Retreat),
            KeyCode::Right | KeyCode::Enter => Some(Action::Descend),
            KeyCode::Left | KeyCode::Backspace => Some(Action::Ascend),
            KeyCode::Esc => Some(Action::Quit),
            KeyCode::Char(ch) => self
                .pairs()
                .into_iter()
                .find(|(key, _)| *key == ch)
                .map(|(_, action)| action),
            _ => None,
        }
    }
}
