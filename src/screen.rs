#[cfg(test)]
use std::collections::VecDeque;
use std::io::{self, Stdout};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Text};
use ratatui::widgets::Paragraph;
use ratatui::Terminal;

const COLOR_BG: Color = Color::Rgb(30, 30, 46);

/// Where frames go and keys come from.
pub trait Screen {
    fn width(&self) -> usize;
    fn write_lines(&mut self, lines: Vec<Line<'static>>) -> Result<()>;
    /// Blocks for the next key press. A resize comes back as
    /// `KeyCode::Null` so the caller redraws.
    fn read_key(&mut self) -> Result<KeyCode>;
    fn clear(&mut self) -> Result<()>;
}

/// Full-screen terminal in raw mode. The terminal is restored on drop.
pub struct TerminalScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalScreen {
    pub fn new() -> Result<Self> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        Ok(Self { terminal })
    }
}

impl Screen for TerminalScreen {
    fn width(&self) -> usize {
        self.terminal
            .size()
            .map(|area| area.width as usize)
            .unwrap_or(80)
    }

    fn write_lines(&mut self, lines: Vec<Line<'static>>) -> Result<()> {
        let body = Paragraph::new(Text::from(lines)).style(Style::default().bg(COLOR_BG));
        self.terminal.draw(|frame| {
            let area = frame.size();
            frame.render_widget(body, area);
        })?;
        Ok(())
    }

    fn read_key(&mut self) -> Result<KeyCode> {
        loop {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if key.modifiers.contains(KeyModifiers::CONTROL)
                        && key.code == KeyCode::Char('c')
                    {
                        return Ok(KeyCode::Esc);
                    }
                    return Ok(key.code);
                }
                Event::Resize(_, _) => return Ok(KeyCode::Null),
                _ => {}
            }
        }
    }

    fn clear(&mut self) -> Result<()> {
        self.terminal.clear()?;
        Ok(())
    }
}

impl Drop for TerminalScreen {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = self.terminal.backend_mut().execute(LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Replays a fixed key sequence and records every frame as plain text.
/// Once the keys run out it answers `Esc`.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedScreen {
    width: usize,
    keys: VecDeque<KeyCode>,
    frames: Vec<Vec<String>>,
    clears: usize,
}

#[cfg(test)]
impl ScriptedScreen {
    pub fn new(width: usize, keys: impl IntoIterator<Item = KeyCode>) -> Self {
        Self {
            width,
            keys: keys.into_iter().collect(),
            frames: Vec::new(),
            clears: 0,
        }
    }

    pub fn frames(&self) -> &[Vec<String>] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&[String]> {
        self.frames.last().map(Vec::as_slice)
    }

    pub fn clears(&self) -> usize {
        self.clears
    }
}

#[cfg(test)]
impl Screen for ScriptedScreen {
    fn width(&self) -> usize {
        self.width
    }

    fn write_lines(&mut self, lines: Vec<Line<'static>>) -> Result<()> {
        let frame = lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect();
        self.frames.push(frame);
        Ok(())
    }

    fn read_key(&mut self) -> Result<KeyCode> {
        Ok(self.keys.pop_front().unwrap_or(KeyCode::Esc))
    }

    fn clear(&mut self) -> Result<()> {
        self.clears += 1;
        Ok(())
    }
}
