//! Text measurement and wrapping for rendered markup

use std::ops::Range;

use ratatui::style::Style;
use ratatui::text::{Line, Span};
use textwrap::WordSeparator;
use textwrap::core::{Fragment, Word, break_words};
use textwrap::wrap_algorithms::wrap_first_fit;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::markdown::{MarkedLine, MarkedText};

/// Wrapped text plus its measured extent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaidOutText {
    pub lines: Vec<Line<'static>>,
    /// Widest wrapped line, never more than the requested maximum
    pub width: u16,
    pub height: u16,
}

/// Given rendered markup and a maximum width, produce wrapped lines and their ideal size.
///
/// `measure` and `paint` both go through the same implementation so the painted
/// text always fits the measured rectangle.
pub trait TextLayout {
    fn layout(&self, text: &MarkedText, max_width: u16) -> LaidOutText;
}

/// `textwrap` first-fit wrapping that keeps span styles; over-long words are broken by column
#[derive(Debug, Clone, Copy, Default)]
pub struct WrapLayout;

impl TextLayout for WrapLayout {
    fn layout(&self, text: &MarkedText, max_width: u16) -> LaidOutText {
        let max_width = max_width.max(1);
        let mut lines = Vec::new();
        for marked in &text.lines {
            lines.extend(wrap_marked_line(marked, max_width));
        }
        let width = lines
            .iter()
            .map(|l| l.width())
            .max()
            .unwrap_or(0)
            .min(max_width as usize) as u16;
        let height = lines.len().min(u16::MAX as usize) as u16;
        LaidOutText {
            lines,
            width,
            height,
        }
    }
}

/// Wrap one rendered line according to its metadata
pub fn wrap_marked_line(marked: &MarkedLine, max_width: u16) -> Vec<Line<'static>> {
    if marked.no_wrap {
        hard_wrap(&marked.line, max_width)
    } else {
        style_wrap_with_indent(&marked.line, max_width, marked.indent_level)
    }
}

/// Span text joined into one string, with the byte range each style covers
struct FlatLine {
    text: String,
    runs: Vec<(Range<usize>, Style)>,
}

impl FlatLine {
    fn new(line: &Line<'_>) -> Self {
        let mut text = String::new();
        let mut runs = Vec::with_capacity(line.spans.len());
        for span in &line.spans {
            let start = text.len();
            text.push_str(&span.content);
            if text.len() > start {
                runs.push((start..text.len(), span.style));
            }
        }
        Self { text, runs }
    }

    /// Append the styled pieces of `range`, merging neighbours that share a style
    fn push_range(&self, range: Range<usize>, out: &mut Vec<Span<'static>>) {
        for (run, style) in &self.runs {
            let from = run.start.max(range.start);
            let to = run.end.min(range.end);
            if from >= to {
                continue;
            }
            let piece = &self.text[from..to];
            match out.last_mut() {
                Some(last) if last.style == *style => last.content.to_mut().push_str(piece),
                _ => out.push(Span::styled(piece.to_string(), *style)),
            }
        }
    }
}

/// A textwrap word plus where it starts in the flattened text
#[derive(Debug)]
struct PlacedWord<'a> {
    word: Word<'a>,
    start: usize,
}

impl PlacedWord<'_> {
    fn end(&self) -> usize {
        self.start + self.word.word.len()
    }
}

impl Fragment for PlacedWord<'_> {
    fn width(&self) -> f64 {
        Fragment::width(&self.word)
    }

    fn whitespace_width(&self) -> f64 {
        Fragment::whitespace_width(&self.word)
    }

    fn penalty_width(&self) -> f64 {
        Fragment::penalty_width(&self.word)
    }
}

/// Words from `find_words` and `break_words` tile the text in order
fn place(words: Vec<Word<'_>>) -> Vec<PlacedWord<'_>> {
    let mut offset = 0;
    words
        .into_iter()
        .map(|word| {
            let start = offset;
            offset += word.word.len() + word.whitespace.len();
            PlacedWord { word, start }
        })
        .collect()
}

/// Wrap a styled line at word boundaries while keeping each span's style.
/// Continuation lines are indented by `indent` columns.
pub fn style_wrap_with_indent(line: &Line<'_>, max_width: u16, indent: usize) -> Vec<Line<'static>> {
    let max_width = usize::from(max_width.max(1));
    let indent = if indent >= max_width { 0 } else { indent };
    let flat = FlatLine::new(line);

    let words = break_words(
        WordSeparator::AsciiSpace.find_words(&flat.text),
        max_width - indent,
    );
    let words = place(words);
    let line_widths = [max_width as f64, (max_width - indent) as f64];

    let mut output: Vec<Line<'static>> = wrap_first_fit(&words, &line_widths)
        .into_iter()
        .enumerate()
        .map(|(n, row)| {
            let mut spans = Vec::new();
            if n > 0 && indent > 0 {
                spans.push(Span::raw(" ".repeat(indent)));
            }
            if let (Some(first), Some(last)) = (row.first(), row.last()) {
                flat.push_range(first.start..last.end(), &mut spans);
            }
            Line::from(spans)
        })
        .collect();
    if output.is_empty() {
        output.push(Line::default());
    }
    output
}

/// Break at the exact column, used for code blocks. Trailing blanks are dropped.
fn hard_wrap(line: &Line<'_>, max_width: u16) -> Vec<Line<'static>> {
    let flat = FlatLine::new(line);
    let whole = Word::from(flat.text.as_str());
    let mut start = 0;
    let mut output: Vec<Line<'static>> = whole
        .break_apart(usize::from(max_width.max(1)))
        .map(|chunk| {
            let end = start + chunk.word.len();
            let mut spans = Vec::new();
            flat.push_range(start..end, &mut spans);
            start = end;
            Line::from(spans)
        })
        .collect();
    if output.is_empty() {
        output.push(Line::default());
    }
    output
}

/// Cut `text` to `max_width` columns, ending in `…` when something was dropped
pub fn truncate_with_ellipsis(text: &str, max_width: u16) -> String {
    let max_width = max_width as usize;
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if width + w + 1 > max_width {
            break;
        }
        out.push(ch);
        width += w;
    }
    out.push('…');
    out
}

/// Format file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Display width of a string in columns, saturated to `u16`
pub fn text_width(text: &str) -> u16 {
    text.width().min(u16::MAX as usize) as u16
}
