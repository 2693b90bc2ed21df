//! Source text to inline-formatted markup, plus highlight injection

use ratatui::style::Style;
use ratatui::text::Span;
use regex::{Regex, RegexBuilder};
use tracing::warn;

use super::markdown::{self, MarkdownStyles, MarkedText};

/// Turns a message body into styled markup. Never fails: implementations fall back
/// to the unmodified source text.
pub trait MarkupRenderer {
    fn render(&self, source: &str, base: Style) -> MarkedText;
}

/// CommonMark renderer backed by pulldown-cmark
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    styles: MarkdownStyles,
    rule_width: u16,
}

impl MarkdownRenderer {
    pub fn new(styles: MarkdownStyles) -> Self {
        Self {
            styles,
            rule_width: 16,
        }
    }
}

impl MarkupRenderer for MarkdownRenderer {
    fn render(&self, source: &str, base: Style) -> MarkedText {
        if source.trim().is_empty() {
            return MarkedText::raw(source, base);
        }
        let rule_width = if self.rule_width == 0 { 16 } else { self.rule_width };
        let text = markdown::from_str_with_width(source, &self.styles, base, rule_width);
        if text.is_blank() {
            warn!(
                target: "chatline::markup",
                "markdown produced no visible text, falling back to raw source"
            );
            return MarkedText::raw(source, base);
        }
        text
    }
}

/// Renders the source verbatim
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRenderer;

impl MarkupRenderer for PlainRenderer {
    fn render(&self, source: &str, base: Style) -> MarkedText {
        MarkedText::raw(source, base)
    }
}

/// One literal to highlight and the style laid over each occurrence
#[derive(Debug, Clone)]
pub struct Highlight {
    pattern: Regex,
    style: Style,
}

impl Highlight {
    /// Case-sensitive literal match
    pub fn literal(text: &str, style: Style) -> Option<Self> {
        if text.is_empty() {
            return None;
        }
        let pattern = Regex::new(&regex::escape(text)).ok()?;
        Some(Self { pattern, style })
    }

    /// Case-insensitive literal match
    pub fn literal_ignore_case(text: &str, style: Style) -> Option<Self> {
        if text.is_empty() {
            return None;
        }
        let pattern = RegexBuilder::new(&regex::escape(text))
            .case_insensitive(true)
            .build()
            .ok()?;
        Some(Self { pattern, style })
    }
}

/// Patch every occurrence of every highlight, in order. All occurrences are
/// replaced, not just the first; matches never span two styled runs.
pub fn apply_highlights(text: &mut MarkedText, highlights: &[Highlight]) {
    if highlights.is_empty() {
        return;
    }
    for marked in &mut text.lines {
        for highlight in highlights {
            let spans = std::mem::take(&mut marked.line.spans);
            let mut out = Vec::with_capacity(spans.len());
            for span in spans {
                split_span(span, highlight, &mut out);
            }
            marked.line.spans = out;
        }
    }
}

fn split_span(span: Span<'static>, highlight: &Highlight, out: &mut Vec<Span<'static>>) {
    let content = span.content.as_ref();
    let mut last = 0;
    let mut matched = false;
    for m in highlight.pattern.find_iter(content) {
        if m.start() == m.end() {
            continue;
        }
        matched = true;
        if m.start() > last {
            out.push(Span::styled(content[last..m.start()].to_string(), span.style));
        }
        out.push(Span::styled(
            m.as_str().to_string(),
            span.style.patch(highlight.style),
        ));
        last = m.end();
    }
    if !matched {
        out.push(span);
        return;
    }
    if last < content.len() {
        out.push(Span::styled(content[last..].to_string(), span.style));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Color;

    fn spans(text: &MarkedText) -> Vec<(String, Style)> {
        text.lines[0]
            .line
            .spans
            .iter()
            .map(|s| (s.content.to_string(), s.style))
            .collect()
    }

    #[test]
    fn test_link_definition_only_falls_back_to_source() {
        let renderer = MarkdownRenderer::default();
        let text = renderer.render("[ref]: https://example.com", Style::default());
        assert_eq!(spans(&text)[0].0, "[ref]: https://example.com");
    }

    #[test]
    fn test_empty_body_renders_one_empty_line() {
        let text = MarkdownRenderer::default().render("", Style::default());
        assert_eq!(text.height(), 1);
    }

    #[test]
    fn test_mention_highlight_is_case_sensitive() {
        let hl = Style::default().bg(Color::Yellow);
        let mut text = PlainRenderer.render("@Ann and @ann", Style::default());
        let rules: Vec<_> = Highlight::literal("@Ann", hl).into_iter().collect();
        apply_highlights(&mut text, &rules);
        let parts = spans(&text);
        assert_eq!(parts[0], ("@Ann".to_string(), hl));
        assert_eq!(parts[1].0, " and @ann");
    }

    #[test]
    fn test_empty_literal_is_ignored() {
        assert!(Highlight::literal("", Style::default()).is_none());
        assert!(Highlight::literal_ignore_case("", Style::default()).is_none());
    }
}
