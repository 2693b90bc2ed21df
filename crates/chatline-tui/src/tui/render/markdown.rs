//! Markdown bodies as styled lines, each annotated with how it may be wrapped

use pulldown_cmark::{Alignment, Event, HeadingLevel, Options, Parser, Tag};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use tracing::trace;
use unicode_width::UnicodeWidthStr;

const QUOTE_BAR: &str = "▎ ";

/// One source line of rendered markup
#[derive(Debug, Clone, PartialEq)]
pub struct MarkedLine {
    pub line: Line<'static>,
    /// Break at the exact column instead of between words (code, tables)
    pub no_wrap: bool,
    /// Continuation lines start this many columns in, under the list item text
    pub indent_level: usize,
}

impl MarkedLine {
    pub fn wrapped(line: Line<'static>) -> Self {
        Self {
            line,
            no_wrap: false,
            indent_level: 0,
        }
    }

    pub fn verbatim(line: Line<'static>) -> Self {
        Self {
            line,
            no_wrap: true,
            indent_level: 0,
        }
    }

    pub fn hanging(mut self, columns: usize) -> Self {
        self.indent_level = columns;
        self
    }
}

/// Rendered markup: the inline-formatted form of a message body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkedText {
    pub lines: Vec<MarkedLine>,
}

impl MarkedText {
    /// Unformatted text, one line per source line
    pub fn raw(source: &str, style: Style) -> Self {
        Self {
            lines: source
                .split('\n')
                .map(|l| MarkedLine::wrapped(Line::from(Span::styled(l.to_string(), style))))
                .collect(),
        }
    }

    pub fn height(&self) -> usize {
        self.lines.len()
    }

    /// True when nothing but whitespace would be drawn
    pub fn is_blank(&self) -> bool {
        self.lines
            .iter()
            .flat_map(|l| l.line.spans.iter())
            .all(|s| s.content.trim().is_empty())
    }
}

/// Overlays patched onto the bubble's text style per markdown element
#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownStyles {
    pub heading: Style,
    pub emphasis: Style,
    pub strong: Style,
    pub strikethrough: Style,
    pub blockquote: Style,
    pub code: Style,
    pub code_block: Style,
    pub link: Style,
    pub list_marker: Style,
    pub table_border: Style,
    pub table_header: Style,
    pub task_checked: Style,
    pub task_unchecked: Style,
}

impl Default for MarkdownStyles {
    fn default() -> Self {
        let bold = Style::new().add_modifier(Modifier::BOLD);
        Self {
            heading: bold,
            emphasis: Style::new().add_modifier(Modifier::ITALIC),
            strong: bold,
            strikethrough: Style::new().add_modifier(Modifier::CROSSED_OUT),
            blockquote: Style::new().add_modifier(Modifier::ITALIC | Modifier::DIM),
            code: Style::new().fg(Color::Rgb(199, 37, 78)),
            code_block: Style::new().add_modifier(Modifier::DIM),
            link: Style::new()
                .fg(Color::Rgb(0, 102, 204))
                .add_modifier(Modifier::UNDERLINED),
            list_marker: bold,
            table_border: Style::new().add_modifier(Modifier::DIM),
            table_header: bold,
            task_checked: Style::new().fg(Color::Rgb(46, 160, 67)),
            task_unchecked: Style::new(),
        }
    }
}

/// Parse `input` as CommonMark with strikethrough, tables and task lists.
///
/// Styles are patched over `base`, so a bubble's text colour survives emphasis.
/// Horizontal rules are `rule_width` columns wide.
pub fn from_str_with_width(
    input: &str,
    styles: &MarkdownStyles,
    base: Style,
    rule_width: u16,
) -> MarkedText {
    let options =
        Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES | Options::ENABLE_TASKLISTS;
    let mut writer = Writer::new(styles, base, rule_width);
    for event in Parser::new_ext(input, options) {
        writer.event(event);
    }
    MarkedText {
        lines: writer.lines,
    }
}

/// Cells collected while a table is open; drawn in one go when it closes
struct TableBuilder {
    alignments: Vec<Alignment>,
    rows: Vec<Vec<String>>,
    header_rows: usize,
}

impl TableBuilder {
    fn new(alignments: Vec<Alignment>) -> Self {
        Self {
            alignments,
            rows: Vec::new(),
            header_rows: 0,
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(cell) = self.rows.last_mut().and_then(|row| row.last_mut()) {
            cell.push_str(text);
        }
    }

    fn column_widths(&self) -> Vec<usize> {
        let columns = self
            .rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(self.alignments.len());
        (0..columns)
            .map(|col| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .map(|cell| cell.width())
                    .max()
                    .unwrap_or(0)
                    + 2
            })
            .collect()
    }

    fn into_lines(self, border: Style, header: Style, body: Style) -> Vec<Line<'static>> {
        let widths = self.column_widths();
        let rule = |left: char, mid: char, right: char| {
            let inner: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
            Line::from(Span::styled(
                format!("{left}{}{right}", inner.join(&mid.to_string())),
                border,
            ))
        };

        let mut lines = vec![rule('┌', '┬', '┐')];
        let total = self.rows.len();
        for (index, row) in self.rows.iter().enumerate() {
            let is_header = index < self.header_rows && total > self.header_rows;
            let mut spans = vec![Span::styled("│", border)];
            for (col, width) in widths.iter().enumerate() {
                let text = row.get(col).map_or("", String::as_str);
                let align = self.alignments.get(col).copied().unwrap_or(Alignment::None);
                spans.push(Span::styled(
                    pad_cell(text, *width, align),
                    if is_header { header } else { body },
                ));
                spans.push(Span::styled("│", border));
            }
            lines.push(Line::from(spans));
            if is_header && index + 1 == self.header_rows {
                lines.push(rule('├', '┼', '┤'));
            }
        }
        lines.push(rule('└', '┴', '┘'));
        lines
    }
}

fn pad_cell(text: &str, width: usize, align: Alignment) -> String {
    let free = width.saturating_sub(text.width());
    let (left, right) = match align {
        Alignment::Right => (free.saturating_sub(1), free.min(1)),
        Alignment::Center => (free / 2, free - free / 2),
        Alignment::None | Alignment::Left => (free.min(1), free.saturating_sub(1)),
    };
    format!("{}{text}{}", " ".repeat(left), " ".repeat(right))
}

struct OpenLink {
    destination: String,
    text: String,
}

/// Streams parser events into marked lines
struct Writer<'s> {
    styles: &'s MarkdownStyles,
    base: Style,
    rule_width: u16,
    lines: Vec<MarkedLine>,
    /// Inline style stack; the top applies to new text
    inline: Vec<Style>,
    quote_depth: usize,
    /// Next number per open list, `None` for bullets
    lists: Vec<Option<u64>>,
    /// The current item's bullet has not been written yet
    marker_pending: bool,
    hanging: usize,
    in_code_block: bool,
    /// The last code line has no terminating newline yet
    code_line_open: bool,
    link: Option<OpenLink>,
    table: Option<TableBuilder>,
    /// A block closed; the next block starts after a blank line
    gap: bool,
}

impl<'s> Writer<'s> {
    fn new(styles: &'s MarkdownStyles, base: Style, rule_width: u16) -> Self {
        Self {
            styles,
            base,
            rule_width,
            lines: Vec::new(),
            inline: vec![base],
            quote_depth: 0,
            lists: Vec::new(),
            marker_pending: false,
            hanging: 0,
            in_code_block: false,
            code_line_open: false,
            link: None,
            table: None,
            gap: false,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) | Event::Html(text) => self.text(&text),
            Event::Code(code) => {
                let style = self.text_style().patch(self.styles.code);
                self.inline_text(&code, style);
            }
            Event::FootnoteReference(label) => {
                let style = self.text_style();
                self.inline_text(&format!("[^{label}]"), style);
            }
            Event::SoftBreak | Event::HardBreak => match self.table.as_mut() {
                Some(table) => table.push_text(" "),
                None => self.open_line(),
            },
            Event::Rule => {
                self.start_block();
                let style = self.base.patch(self.styles.blockquote);
                self.push_span(Span::styled("─".repeat(usize::from(self.rule_width)), style));
                self.gap = true;
            }
            Event::TaskListMarker(checked) => self.task_marker(checked),
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                // The first paragraph of a list item shares the bullet's line
                if !self.marker_pending {
                    self.start_block();
                }
            }
            Tag::Heading(level, _, _) => {
                self.start_block();
                let mut style = self.text_style().patch(self.styles.heading);
                if level == HeadingLevel::H1 {
                    style = style.add_modifier(Modifier::UNDERLINED);
                }
                self.inline.push(style);
            }
            Tag::BlockQuote => {
                self.separate();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(_) => {
                self.separate();
                self.in_code_block = true;
                self.code_line_open = false;
            }
            Tag::List(first) => {
                if self.lists.is_empty() {
                    self.separate();
                }
                self.lists.push(first);
            }
            Tag::Item => {
                self.separate();
                self.open_line();
                self.marker_pending = true;
                self.hanging = 0;
            }
            Tag::Table(alignments) => {
                self.separate();
                self.table = Some(TableBuilder::new(alignments));
            }
            Tag::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.rows.push(Vec::new());
                    table.header_rows += 1;
                }
            }
            Tag::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    table.rows.push(Vec::new());
                }
            }
            Tag::TableCell => {
                if let Some(row) = self.table.as_mut().and_then(|t| t.rows.last_mut()) {
                    row.push(String::new());
                }
            }
            Tag::Emphasis => self.push_inline(self.styles.emphasis),
            Tag::Strong => self.push_inline(self.styles.strong),
            Tag::Strikethrough => self.push_inline(self.styles.strikethrough),
            Tag::Link(_, destination, _) => {
                self.flush_marker();
                self.link = Some(OpenLink {
                    destination: destination.to_string(),
                    text: String::new(),
                });
            }
            Tag::Image(_, _, _) => {
                let style = self.text_style();
                self.inline_text("[image: ", style);
            }
            Tag::FootnoteDefinition(_) => {}
        }
    }

    fn end(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.gap = true,
            Tag::Heading(..) => {
                self.inline.pop();
                self.gap = true;
            }
            Tag::BlockQuote => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.gap = true;
            }
            Tag::CodeBlock(_) => {
                self.in_code_block = false;
                self.gap = true;
            }
            Tag::List(_) => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.gap = true;
                }
            }
            Tag::Item => {
                self.flush_marker();
                self.gap = false;
            }
            Tag::Table(_) => {
                if let Some(table) = self.table.take() {
                    let border = self.base.patch(self.styles.table_border);
                    let header = self.base.patch(self.styles.table_header);
                    for line in table.into_lines(border, header, self.base) {
                        self.lines.push(MarkedLine::verbatim(line));
                    }
                }
                self.gap = true;
            }
            Tag::Emphasis | Tag::Strong | Tag::Strikethrough => {
                self.inline.pop();
            }
            Tag::Link(..) => self.close_link(),
            Tag::Image(..) => {
                let style = self.text_style();
                self.inline_text("]", style);
            }
            Tag::TableHead | Tag::TableRow | Tag::TableCell | Tag::FootnoteDefinition(_) => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(table) = self.table.as_mut() {
            table.push_text(text);
            return;
        }
        if self.in_code_block {
            let style = self.text_style();
            for segment in text.split_inclusive('\n') {
                if !self.code_line_open {
                    self.open_line();
                }
                let content = segment.trim_end_matches('\n');
                if !content.is_empty() {
                    self.push_span(Span::styled(content.to_string(), style));
                }
                self.code_line_open = !segment.ends_with('\n');
            }
            return;
        }
        if let Some(link) = self.link.as_mut() {
            link.text.push_str(text);
        }
        let style = self.text_style();
        for (i, part) in text.lines().enumerate() {
            if i > 0 {
                self.open_line();
            }
            self.inline_text(part, style);
        }
    }

    /// Text that stays on the current line
    fn inline_text(&mut self, text: &str, style: Style) {
        if let Some(table) = self.table.as_mut() {
            table.push_text(text);
            return;
        }
        self.flush_marker();
        if text.is_empty() {
            return;
        }
        self.push_span(Span::styled(text.to_string(), style));
    }

    fn close_link(&mut self) {
        let Some(link) = self.link.take() else {
            return;
        };
        // Autolinks already show their destination
        if link.text == link.destination || link.destination.is_empty() {
            return;
        }
        let style = self.text_style();
        self.inline_text(" (", style);
        self.inline_text(&link.destination, style.patch(self.styles.link));
        self.inline_text(")", style);
    }

    fn push_inline(&mut self, overlay: Style) {
        self.flush_marker();
        let style = self.text_style().patch(overlay);
        trace!(target: "chatline::markdown", "inline style {:?}", style);
        self.inline.push(style);
    }

    /// Style for new text: the inline stack plus block overlays
    fn text_style(&self) -> Style {
        let mut style = self.inline.last().copied().unwrap_or(self.base);
        if self.quote_depth > 0 {
            style = style.patch(self.styles.blockquote);
        }
        if self.in_code_block {
            style = style.patch(self.styles.code_block);
        }
        style
    }

    /// Blank line if a block just closed
    fn separate(&mut self) {
        if self.gap && !self.lines.is_empty() {
            self.open_line();
        }
        self.gap = false;
    }

    fn start_block(&mut self) {
        self.separate();
        self.open_line();
    }

    fn open_line(&mut self) {
        let mut spans = Vec::new();
        let bar = self.base.patch(self.styles.blockquote);
        for _ in 0..self.quote_depth {
            spans.push(Span::styled(QUOTE_BAR, bar));
        }
        let line = Line::from(spans);
        let marked = if self.in_code_block {
            MarkedLine::verbatim(line)
        } else if self.lists.is_empty() {
            MarkedLine::wrapped(line)
        } else {
            MarkedLine::wrapped(line).hanging(self.hanging + self.quote_depth * QUOTE_BAR.width())
        };
        self.lines.push(marked);
    }

    fn push_span(&mut self, span: Span<'static>) {
        if self.lines.is_empty() {
            self.open_line();
        }
        if let Some(last) = self.lines.last_mut() {
            last.line.spans.push(span);
        }
    }

    fn list_indent(&self) -> String {
        " ".repeat(self.lists.len().saturating_sub(1) * 2)
    }

    fn set_hanging(&mut self, marker: &str) {
        self.hanging = marker.width();
        let columns = self.hanging + self.quote_depth * QUOTE_BAR.width();
        if let Some(last) = self.lines.last_mut() {
            last.indent_level = columns;
        }
    }

    fn flush_marker(&mut self) {
        if !self.marker_pending {
            return;
        }
        self.marker_pending = false;
        let indent = self.list_indent();
        let marker = match self.lists.last_mut() {
            Some(Some(number)) => {
                let current = *number;
                *number += 1;
                format!("{indent}{current}. ")
            }
            Some(None) => format!("{indent}• "),
            None => return,
        };
        self.set_hanging(&marker);
        let style = self.base.patch(self.styles.list_marker);
        self.push_span(Span::styled(marker, style));
    }

    fn task_marker(&mut self, checked: bool) {
        if self.lists.is_empty() {
            return;
        }
        self.marker_pending = false;
        let (checkbox, overlay) = if checked {
            ("[✓] ", self.styles.task_checked)
        } else {
            ("[ ] ", self.styles.task_unchecked)
        };
        let marker = format!("{}{checkbox}", self.list_indent());
        self.set_hanging(&marker);
        self.push_span(Span::styled(marker, self.base.patch(overlay)));
    }
}
