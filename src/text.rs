//! Text helpers for item bodies: entity decoding, stripping the small HTML
//! subset the API emits, wrapping, and the span styles used by the
//! presenter.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use regex::{Captures, Regex};
use textwrap::{wrap, Options as WrapOptions};

const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);
const COMMENT_DEPTH_COLORS: [Color; 6] = [
    Color::Rgb(250, 179, 135),
    Color::Rgb(166, 227, 161),
    Color::Rgb(203, 166, 247),
    Color::Rgb(245, 194, 231),
    Color::Rgb(137, 220, 235),
    Color::Rgb(249, 226, 175),
];

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("valid entity regex")
});
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(/?)([a-z0-9]+)[^>]*>").expect("valid tag regex"));

pub fn decode_entities(text: &str) -> Cow<'_, str> {
    ENTITY_RE.replace_all(text, |caps: &Captures| {
        let name = &caps[1];
        let decoded = if let Some(hex) = name
            .strip_prefix("#x")
            .or_else(|| name.strip_prefix("#X"))
        {
            u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
        } else if let Some(dec) = name.strip_prefix('#') {
            dec.parse::<u32>().ok().and_then(char::from_u32)
        } else {
            match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => None,
            }
        };
        match decoded {
            Some(ch) => ch.to_string(),
            None => caps[0].to_string(),
        }
    })
}

/// Flattens item markup into plain text. Paragraphs become blank-line
/// separated blocks, `<pre>` content keeps its line breaks, every other tag
/// is dropped and its text kept. Entities are decoded last.
pub fn strip_markup(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    let mut in_pre = false;

    for caps in TAG_RE.captures_iter(html) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        push_text(&mut out, &html[last..whole.start()], in_pre);
        last = whole.end();

        let closing = !caps[1].is_empty();
        match caps[2].to_ascii_lowercase().as_str() {
            "p" if !closing => paragraph_break(&mut out),
            "br" => out.push('\n'),
            "pre" => {
                paragraph_break(&mut out);
                in_pre = !closing;
            }
            _ => {}
        }
    }
    push_text(&mut out, &html[last..], in_pre);

    decode_entities(out.trim_end()).into_owned()
}

fn push_text(out: &mut String, text: &str, verbatim: bool) {
    if verbatim {
        out.push_str(text);
    } else {
        out.push_str(&text.replace('\n', " "));
    }
}

fn paragraph_break(out: &mut String) {
    let trimmed = out.trim_end_matches([' ', '\n']).len();
    if trimmed == 0 {
        out.clear();
        return;
    }
    out.truncate(trimmed);
    out.push_str("\n\n");
}

/// Wraps each line of `text` to `width` columns, prefixing every produced
/// line with `indent` spaces. Blank lines survive as empty strings.
pub fn wrap_indented(text: &str, width: usize, indent: usize) -> Vec<String> {
    let prefix = " ".repeat(indent);
    let wrap_width = width.max(indent + 1);
    let mut lines = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            lines.push(String::new());
            continue;
        }
        if width == 0 {
            lines.push(format!("{prefix}{line}"));
            continue;
        }
        let options = WrapOptions::new(wrap_width)
            .break_words(true)
            .initial_indent(&prefix)
            .subsequent_indent(&prefix);
        lines.extend(wrap(line, options).into_iter().map(Cow::into_owned));
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

pub fn plain(text: impl Into<String>) -> Span<'static> {
    Span::styled(text.into(), Style::default().fg(COLOR_TEXT_PRIMARY))
}

pub fn muted(text: impl Into<String>) -> Span<'static> {
    Span::styled(text.into(), Style::default().fg(COLOR_TEXT_SECONDARY))
}

pub fn accent(text: impl Into<String>) -> Span<'static> {
    Span::styled(
        text.into(),
        Style::default()
            .fg(COLOR_ACCENT)
            .add_modifier(Modifier::BOLD),
    )
}

pub fn selected(text: impl Into<String>) -> Span<'static> {
    Span::styled(
        text.into(),
        Style::default()
            .fg(COLOR_TEXT_PRIMARY)
            .bg(COLOR_SELECTED_BG)
            .add_modifier(Modifier::BOLD),
    )
}

pub fn error(text: impl Into<String>) -> Span<'static> {
    Span::styled(text.into(), Style::default().fg(COLOR_ERROR))
}

pub fn depth(text: impl Into<String>, depth: usize) -> Span<'static> {
    let color = COMMENT_DEPTH_COLORS[depth % COMMENT_DEPTH_COLORS.len()];
    Span::styled(text.into(), Style::default().fg(color))
}
