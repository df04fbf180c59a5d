//! Slide to text conversion shared by the preview and live views.

use deck_common::{ContentBlock, Layout, Slide};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthChar;

pub fn slide_lines(slide: &Slide) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for block in &slide.blocks {
        match block {
            ContentBlock::Heading { level, text } => {
                let style = match level {
                    1 => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    _ => Style::default().add_modifier(Modifier::BOLD),
                };
                lines.push(Line::from(Span::styled(text.clone(), style)));
                lines.push(Line::from(""));
            }
            ContentBlock::Paragraph { text } => {
                lines.push(Line::from(text.clone()));
                lines.push(Line::from(""));
            }
            ContentBlock::Bullets { items } => {
                for item in items {
                    let mut spans = vec![Span::raw("  • ")];
                    if let Some(title) = &item.title {
                        spans.push(Span::styled(
                            title.clone(),
                            Style::default().add_modifier(Modifier::BOLD),
                        ));
                        if !item.text.is_empty() {
                            spans.push(Span::raw(": "));
                        }
                    }
                    spans.push(Span::raw(item.text.clone()));
                    lines.push(Line::from(spans));
                }
                lines.push(Line::from(""));
            }
            ContentBlock::Image { query } => {
                lines.push(Line::from(Span::styled(
                    format!("[image: {query}]"),
                    Style::default().fg(Color::Magenta),
                )));
            }
            ContentBlock::Notes { text } => {
                lines.push(Line::from(Span::styled(
                    format!("notes: {text}"),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
            }
            ContentBlock::Raw { tag, text } => {
                lines.push(Line::from(Span::styled(
                    format!("<{tag}> {text}"),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
    }

    if slide.generating {
        lines.push(Line::from(Span::styled(
            "generating…",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::SLOW_BLINK),
        )));
    }
    lines
}

/// One-line label for the slide list, cut to `width` terminal columns.
pub fn slide_label(slide: &Slide, width: usize) -> String {
    let marker = if slide.generating { '…' } else { ' ' };
    let title = slide.title().unwrap_or("(untitled)");
    let label = format!("{:>2}{marker} {title}", slide.index + 1);
    truncate_to_width(&label, width)
}

pub fn layout_name(layout: &Layout) -> &str {
    match layout {
        Layout::Default => "default",
        Layout::Left => "left",
        Layout::Right => "right",
        Layout::Vertical => "vertical",
        Layout::Custom(name) => name,
    }
}

fn truncate_to_width(text: &str, width: usize) -> String {
    let mut used = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        out.push(c);
    }
    out
}
