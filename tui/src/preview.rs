use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use deck_common::Slide;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::Text,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use tokio::time::Duration;

use crate::render::{layout_name, slide_label, slide_lines};
use crate::terminal;

/// Slide list navigation shared by the preview and live views.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Navigator {
    pub current: usize,
}

impl Navigator {
    /// Returns `false` when the key is not a navigation key.
    pub fn handle(&mut self, key: KeyCode, len: usize) -> bool {
        match key {
            KeyCode::Right | KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('l') => {
                if self.current + 1 < len {
                    self.current += 1;
                }
            }
            KeyCode::Left | KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('h') => {
                self.current = self.current.saturating_sub(1);
            }
            KeyCode::Home => self.current = 0,
            KeyCode::End => self.current = len.saturating_sub(1),
            _ => return false,
        }
        true
    }

    pub fn clamp(&mut self, len: usize) {
        self.current = self.current.min(len.saturating_sub(1));
    }
}

pub struct SlidePreview {
    slides: Vec<Slide>,
    nav: Navigator,
    should_quit: bool,
}

impl SlidePreview {
    pub fn new(slides: Vec<Slide>) -> Self {
        Self {
            slides,
            nav: Navigator::default(),
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut terminal = terminal::enter()?;

        let result = async {
            while !self.should_quit {
                terminal.draw(|f| self.ui(f))?;

                if event::poll(Duration::from_millis(100))? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind == KeyEventKind::Press {
                            self.handle_key_event(key.code);
                        }
                    }
                }
            }
            Ok::<(), anyhow::Error>(())
        }
        .await;

        terminal::leave(&mut terminal)?;
        result
    }

    fn handle_key_event(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            other => {
                self.nav.handle(other, self.slides.len());
            }
        }
    }

    fn ui(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(f.area());

        draw_deck(f, chunks[0], &self.slides, self.nav, "Slide Preview");

        let controls = "Navigation: ← → (or j k) | Home/End | Press 'q' to quit";
        let footer = Paragraph::new(controls)
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(footer, chunks[1]);
    }
}

/// Slide list on the left, current slide on the right.
pub(crate) fn draw_deck(
    f: &mut Frame,
    area: ratatui::layout::Rect,
    slides: &[Slide],
    nav: Navigator,
    title: &str,
) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(0)])
        .split(area);

    let label_width = usize::from(columns[0].width.saturating_sub(4));
    let items: Vec<ListItem> = slides
        .iter()
        .map(|s| ListItem::new(slide_label(s, label_width)))
        .collect();
    let mut state = ListState::default();
    if !slides.is_empty() {
        state.select(Some(nav.current));
    }
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!("{title} ({})", slides.len())))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, columns[0], &mut state);

    let (content, heading) = match slides.get(nav.current) {
        Some(slide) => (
            Text::from(slide_lines(slide)),
            format!(
                "Slide {}/{} · {}",
                nav.current + 1,
                slides.len(),
                layout_name(&slide.layout)
            ),
        ),
        None => (Text::from("No slides available"), "Slide".to_string()),
    };
    let slide = Paragraph::new(content)
        .block(Block::default().borders(Borders::ALL).title(heading))
        .wrap(Wrap { trim: true });
    f.render_widget(slide, columns[1]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_bounds() {
        let mut nav = Navigator::default();
        assert!(nav.handle(KeyCode::Left, 3));
        assert_eq!(nav.current, 0);
        nav.handle(KeyCode::Right, 3);
        nav.handle(KeyCode::Char('j'), 3);
        nav.handle(KeyCode::Right, 3);
        assert_eq!(nav.current, 2);
        nav.handle(KeyCode::Home, 3);
        assert_eq!(nav.current, 0);
        nav.handle(KeyCode::End, 3);
        assert_eq!(nav.current, 2);
        assert!(!nav.handle(KeyCode::Char('x'), 3));
    }

    #[test]
    fn test_navigation_on_empty_deck() {
        let mut nav = Navigator::default();
        nav.handle(KeyCode::Right, 0);
        nav.handle(KeyCode::End, 0);
        assert_eq!(nav.current, 0);
    }

    #[test]
    fn test_quit_key() {
        let mut preview = SlidePreview::new(Vec::new());
        preview.handle_key_event(KeyCode::Char('q'));
        assert!(preview.should_quit);
    }
}
