use std::io;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use ratatui::text::Line;
use tracing::{info, warn};

use crate::catalog::FeedCatalog;
use crate::client::{Api, ClientConfig, HttpClient};
use crate::config::{self, Config, UiConfig};
use crate::keymap::{Action, KeyBindings};
use crate::logging;
use crate::nav::NavigationState;
use crate::presenter::{self, View};
use crate::screen::{Screen, TerminalScreen};
use crate::text;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
}

pub fn run(options: RunOptions) -> Result<()> {
    let cfg = config::load(config::LoadOptions {
        config_file: options.config_file,
        env_prefix: None,
    })
    .context("load config")?;
    logging::init(&cfg.log).context("init logging")?;

    let state = navigation_state(&cfg)?;
    let screen = TerminalScreen::new().context("open terminal")?;
    info!(feeds = cfg.feeds.len(), "starting");

    let mut browser = Browser::new(screen, state, &cfg.ui, cfg.keys);
    browser.run()
}

pub fn navigation_state(cfg: &Config) -> Result<NavigationState> {
    let client = HttpClient::new(ClientConfig {
        user_agent: cfg.api.user_agent.clone(),
        timeout: cfg.api.timeout,
        http_client: None,
    })
    .context("build http client")?;
    let api = Rc::new(Api::new(Box::new(client), cfg.api.base_url.clone()));
    let catalog = FeedCatalog::new(api, cfg.feeds.clone());
    Ok(NavigationState::new(Rc::new(catalog)))
}

type Opener = Box<dyn FnMut(&str) -> io::Result<()>>;

enum Status {
    Info(String),
    Error(String),
}

/// The input loop: draw the current state, read one key, apply one
/// transition, repeat until Quit.
pub struct Browser<S: Screen> {
    screen: S,
    state: NavigationState,
    feed_window: usize,
    comment_window: usize,
    keys: KeyBindings,
    status: Option<Status>,
    opener: Opener,
}

impl<S: Screen> Browser<S> {
    pub fn new(screen: S, state: NavigationState, ui: &UiConfig, keys: KeyBindings) -> Self {
        Self {
            screen,
            state,
            feed_window: ui.feed_window,
            comment_window: ui.comment_window,
            keys,
            status: None,
            opener: Box::new(|url: &str| webbrowser::open(url)),
        }
    }

    /// Replaces the browser launcher used by the Open action.
    pub fn with_opener(mut self, opener: impl FnMut(&str) -> io::Result<()> + 'static) -> Self {
        self.opener = Box::new(opener);
        self
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }

    pub fn run(&mut self) -> Result<()> {
        loop {
            self.draw()?;
            let key = self.screen.read_key()?;
            match self.keys.action(key) {
                Some(Action::Quit) => break,
                Some(action) => self.apply(action),
                None => {}
            }
        }
        info!("quit");
        Ok(())
    }

    /// Runs one transition. Failures become the status line; the state
    /// itself is left as it was.
    pub fn apply(&mut self, action: Action) {
        let result = match action {
            Action::Advance => self.state.advance(),
            Action::Retreat => self.state.retreat(),
            Action::Descend => self.state.descend(),
            Action::Ascend => self.state.ascend(),
            Action::Open => {
                self.open_selected();
                return;
            }
            Action::Quit => Ok(()),
        };

        self.status = match result {
            Ok(()) => None,
            Err(err) => {
                warn!(?action, error = %err, "transition failed");
                Some(Status::Error(format!("Error: {err}")))
            }
        };
    }

    fn open_selected(&mut self) {
        self.status = match self.state.selected_link() {
            Ok(Some(url)) => match (self.opener)(&url) {
                Ok(()) => Some(Status::Info(format!("Opened {url} in your browser."))),
                Err(err) => Some(Status::Error(format!("Failed to open {url}: {err}"))),
            },
            Ok(None) => Some(Status::Info("Nothing to open here.".to_string())),
            Err(err) => Some(Status::Error(format!("Error: {err}"))),
        };
    }

    fn draw(&mut self) -> Result<()> {
        let view = View {
            feed_window: self.feed_window,
            comment_window: self.comment_window,
            width: self.screen.width(),
        };

        let mut lines = match presenter::render(&self.state, &view) {
            Ok(lines) => lines,
            Err(err) => {
                warn!(error = %err, "render failed");
                vec![Line::from(text::error(format!("Could not load this view: {err}")))]
            }
        };

        lines.push(Line::default());
        lines.push(match &self.status {
            Some(Status::Error(message)) => Line::from(text::error(message.clone())),
            Some(Status::Info(message)) => Line::from(text::muted(message.clone())),
            None => Line::from(text::muted(self.keys.hint())),
        });

        self.screen.clear()?;
        self.screen.write_lines(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crossterm::event::KeyCode;
    use serde_json::json;

    use crate::catalog::StoryType;
    use crate::client::MockClient;
    use crate::error::Error;
    use crate::nav::StateKind;
    use crate::screen::ScriptedScreen;

    const BASE: &str = "http://api.test/v0";

    fn state(mock: &MockClient) -> NavigationState {
        let api = Rc::new(Api::new(Box::new(mock.clone()), BASE));
        let catalog = FeedCatalog::new(
            api,
            vec![StoryType::Top.feed_spec(), StoryType::Ask.feed_spec()],
        );
        NavigationState::new(Rc::new(catalog))
    }

    fn fixture() -> MockClient {
        let mock = MockClient::new();
        mock.respond(format!("{BASE}/topstories.json"), json!([1]));
        mock.item(
            BASE,
            json!({"id": 1, "type": "story", "title": "Hello", "url": "https://hello.test", "kids": [2]}),
        );
        mock.item(BASE, json!({"id": 2, "type": "comment", "by": "x", "text": "hi"}));
        mock
    }

    fn browser(mock: &MockClient, keys: Vec<KeyCode>) -> Browser<ScriptedScreen> {
        Browser::new(
            ScriptedScreen::new(80, keys),
            state(mock),
            &UiConfig::default(),
            KeyBindings::default(),
        )
    }

    #[test]
    fn quits_on_first_key() {
        let mock = fixture();
        let mut browser = browser(&mock, vec![KeyCode::Char('q')]);
        browser.run().unwrap();
        assert_eq!(browser.screen().frames().len(), 1);
        assert_eq!(browser.screen().clears(), 1);
        let frame = browser.screen().last_frame().unwrap();
        assert_eq!(frame[2], "> Top stories");
        assert_eq!(frame.last().unwrap(), &KeyBindings::default().hint());
    }

    #[test]
    fn keys_drive_transitions() {
        let mock = fixture();
        let keys = vec![KeyCode::Char('d'), KeyCode::Enter, KeyCode::Char('x')];
        let mut browser = browser(&mock, keys);
        browser.run().unwrap();
        assert_eq!(browser.state().kind(), StateKind::AtPost);
        let frame = browser.screen().last_frame().unwrap();
        assert_eq!(frame[0], "Hello [story / 0] 1 comments");
        assert!(frame.iter().any(|line| line == "> (0) x: hi [0 replies]"));
    }

    #[test]
    fn failed_descend_shows_error_and_keeps_state() {
        let mock = fixture();
        mock.fail(
            format!("{BASE}/askstories.json"),
            Error::Transport {
                url: "asks".into(),
                reason: "offline".into(),
            },
        );
        let keys = vec![KeyCode::Char('s'), KeyCode::Char('d')];
        let mut browser = browser(&mock, keys);
        browser.run().unwrap();
        assert_eq!(browser.state().kind(), StateKind::AtCatalog);
        let frame = browser.screen().last_frame().unwrap();
        assert_eq!(frame[3], "> Top asks");
        assert_eq!(
            frame.last().unwrap(),
            "Error: request to asks failed: offline"
        );
    }

    #[test]
    fn open_uses_selected_link() {
        let mock = fixture();
        let opened = Rc::new(RefCell::new(Vec::new()));
        let sink = opened.clone();
        let keys = vec![KeyCode::Char('o'), KeyCode::Char('d'), KeyCode::Char('o')];
        let mut browser = browser(&mock, keys).with_opener(move |url| {
            sink.borrow_mut().push(url.to_string());
            Ok(())
        });
        browser.run().unwrap();
        assert_eq!(*opened.borrow(), vec!["https://hello.test".to_string()]);
        let frames = browser.screen().frames();
        assert_eq!(frames[1].last().unwrap(), "Nothing to open here.");
        assert_eq!(
            frames[3].last().unwrap(),
            "Opened https://hello.test in your browser."
        );
    }
}
