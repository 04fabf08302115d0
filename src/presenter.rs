use ratatui::text::{Line, Span};
use tracing::warn;

use crate::error::{Error, Result};
use crate::nav::{CommentCursor, Cursor, FeedCursor, NavigationState, PostCursor};
use crate::text;

const MARKER_SELECTED: &str = "> ";
const MARKER_IDLE: &str = "  ";
const MARKER_WIDTH: usize = 2;
const SEPARATOR_WIDTH: usize = 32;
const DEPTH_INDENT: usize = 2;

/// Rendering parameters: rows per window and the usable terminal width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct View {
    pub feed_window: usize,
    pub comment_window: usize,
    pub width: usize,
}

impl Default for View {
    fn default() -> Self {
        Self {
            feed_window: 8,
            comment_window: 3,
            width: 80,
        }
    }
}

/// The visible slice `[start, end)` of a list of `len` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
    pub len: usize,
}

impl Window {
    /// Aligns the window to a multiple of `size` so that it contains
    /// `index`, then cuts it at the end of the list.
    pub fn around(index: usize, len: usize, size: usize) -> Self {
        let size = size.max(1);
        let start = index - index % size;
        Self {
            start,
            end: (start + size).min(len),
            len,
        }
    }

    pub fn indices(&self) -> std::ops::Range<usize> {
        self.start..self.end.max(self.start)
    }

    /// `"{first}..{last} out of {total}"`, 1-based and inclusive.
    pub fn footer(&self) -> String {
        format!("{}..{} out of {}", self.start + 1, self.end, self.len)
    }
}

/// Builds the lines for the active frame. Rendering does not move any
/// cursor; it may fetch items that are about to be shown, which only fills
/// caches, so rendering the same state twice yields the same lines.
pub fn render(state: &NavigationState, view: &View) -> Result<Vec<Line<'static>>> {
    let mut lines = Vec::new();
    match state.cursor() {
        Cursor::Catalog(cursor) => {
            lines.push(Line::from(text::accent("Feeds")));
            lines.push(Line::default());
            let catalog = state.catalog();
            let window = Window::around(cursor.index(), catalog.feed_count(), view.feed_window);
            for index in window.indices() {
                let name = catalog.feed_name(index).unwrap_or_default();
                push_row(&mut lines, index == cursor.index(), name, 0, view.width);
            }
        }
        Cursor::Feed(cursor) => {
            let name = state
                .catalog()
                .feed_name(cursor.parent().index())
                .unwrap_or_default();
            render_feed(&mut lines, name, cursor, view)?;
        }
        Cursor::Post(cursor) => render_post(&mut lines, cursor, view)?,
    }
    Ok(lines)
}

fn render_feed(
    lines: &mut Vec<Line<'static>>,
    name: &str,
    cursor: &FeedCursor,
    view: &View,
) -> Result<()> {
    let feed = cursor.feed();
    let count = feed.id_count()?;
    lines.push(Line::from(vec![
        text::accent(name.to_string()),
        text::muted(format!(" ({count} stories)")),
    ]));
    lines.push(Line::default());

    if count == 0 {
        lines.push(Line::from(text::muted("(empty)")));
        return Ok(());
    }

    let window = Window::around(cursor.index(), count, view.feed_window);
    for index in window.indices() {
        let summary = feed
            .node_at(index)
            .and_then(|node| node.summary_line())
            .unwrap_or_else(|err| unavailable(&err));
        push_row(lines, index == cursor.index(), &summary, 0, view.width);
    }
    lines.push(Line::default());
    lines.push(Line::from(text::muted(window.footer())));
    Ok(())
}

fn render_post(lines: &mut Vec<Line<'static>>, cursor: &PostCursor, view: &View) -> Result<()> {
    let post = cursor.post();
    for line in text::wrap_indented(&post.summary_line()?, view.width, 0) {
        lines.push(Line::from(text::accent(line)));
    }
    if let Some(url) = post.url()? {
        lines.push(Line::from(text::muted(url.to_string())));
    }
    if let Some(body) = post.body_text()? {
        lines.push(Line::default());
        for line in text::wrap_indented(&body, view.width, 0) {
            lines.push(Line::from(text::plain(line)));
        }
    }
    lines.push(separator(view.width));

    let frame = cursor.comments();
    let ancestors = render_ancestors(lines, frame, view)?;
    // At the root frame the chain is empty; one separator is enough.
    if ancestors > 0 {
        lines.push(separator(view.width));
    }
    render_comments(lines, frame, ancestors * DEPTH_INDENT, view)
}

/// Writes the comments drilled into, outermost first, each indented by its
/// depth. The root frame focuses the post itself and is skipped. Returns
/// how many were written.
fn render_ancestors(
    lines: &mut Vec<Line<'static>>,
    frame: &CommentCursor,
    view: &View,
) -> Result<usize> {
    let frames = frame.frames();
    for (depth, ancestor) in frames.iter().skip(1).enumerate() {
        let reply = ancestor.node().reply_line()?;
        for line in text::wrap_indented(&reply, view.width, depth * DEPTH_INDENT) {
            lines.push(Line::from(text::depth(line, depth)));
        }
    }
    Ok(frames.len().saturating_sub(1))
}

fn render_comments(
    lines: &mut Vec<Line<'static>>,
    frame: &CommentCursor,
    indent: usize,
    view: &View,
) -> Result<()> {
    let node = frame.node();
    let count = node.child_count()?;
    if count == 0 {
        lines.push(Line::from(text::muted(format!(
            "{}No comments",
            " ".repeat(indent)
        ))));
        return Ok(());
    }

    let window = Window::around(frame.index(), count, view.comment_window);
    for index in window.indices() {
        if index > window.start {
            lines.push(Line::default());
        }
        let reply = node
            .child_at(index)
            .and_then(|child| child.reply_line())
            .unwrap_or_else(|err| unavailable(&err));
        let row = format!("({index}) {reply}");
        push_row(lines, index == frame.index(), &row, indent, view.width);
    }
    lines.push(Line::default());
    lines.push(Line::from(text::muted(window.footer())));
    Ok(())
}

/// Row text for an item that failed to load, so one bad item does not hide
/// the rest of its window.
fn unavailable(err: &Error) -> String {
    warn!(error = %err, "row unavailable");
    format!("[unavailable: {err}]")
}

/// Wraps `row` below `indent` and puts the selection marker on its first
/// line.
fn push_row(
    lines: &mut Vec<Line<'static>>,
    selected: bool,
    row: &str,
    indent: usize,
    width: usize,
) {
    let pad = indent + MARKER_WIDTH;
    let marker = if selected { MARKER_SELECTED } else { MARKER_IDLE };

    for (position, line) in text::wrap_indented(row, width, pad).into_iter().enumerate() {
        let line = if position == 0 {
            let rest = line.get(pad.min(line.len())..).unwrap_or_default();
            format!("{}{marker}{rest}", " ".repeat(indent))
        } else {
            line
        };
        let span: Span<'static> = if selected {
            text::selected(line)
        } else {
            text::plain(line)
        };
        lines.push(Line::from(span));
    }
}

fn separator(width: usize) -> Line<'static> {
    let width = if width == 0 {
        SEPARATOR_WIDTH
    } else {
        width.min(SEPARATOR_WIDTH)
    };
    Line::from(text::muted("-".repeat(width)))
}
