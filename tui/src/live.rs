use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind};
use deck_common::Slide;
use deck_core::GenerationEvent;
use futures_util::StreamExt;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use tokio::sync::mpsc;

use crate::preview::{draw_deck, Navigator};
use crate::terminal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Waiting,
    Outline,
    Slides,
    Done,
    Failed(String),
}

/// State of a deck that is still being generated.
pub struct LiveDeckApp {
    outline: Vec<String>,
    slides: Vec<Slide>,
    nav: Navigator,
    /// Jump to the newest slide as it arrives until the user navigates away.
    follow: bool,
    phase: Phase,
    presentation_id: Option<String>,
    should_quit: bool,
}

impl Default for LiveDeckApp {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveDeckApp {
    pub fn new() -> Self {
        Self {
            outline: Vec::new(),
            slides: Vec::new(),
            nav: Navigator::default(),
            follow: true,
            phase: Phase::Waiting,
            presentation_id: None,
            should_quit: false,
        }
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub async fn run(&mut self, mut events: mpsc::Receiver<GenerationEvent>) -> Result<()> {
        let mut terminal = terminal::enter()?;
        let mut input = EventStream::new();
        let mut events_open = true;

        let result = async {
            while !self.should_quit {
                terminal.draw(|f| self.ui(f))?;

                tokio::select! {
                    ev = events.recv(), if events_open => match ev {
                        Some(ev) => self.apply(ev),
                        None => events_open = false,
                    },
                    maybe = input.next() => match maybe {
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            self.handle_key_event(key.code);
                        }
                        Some(Err(e)) => return Err(e.into()),
                        None => self.should_quit = true,
                        _ => {}
                    },
                }
            }
            Ok::<(), anyhow::Error>(())
        }
        .await;

        terminal::leave(&mut terminal)?;
        result
    }

    pub fn apply(&mut self, event: GenerationEvent) {
        match event {
            GenerationEvent::OutlineStarted => self.phase = Phase::Outline,
            GenerationEvent::OutlineUpdated(topics) => self.outline = topics,
            GenerationEvent::OutlineCompleted(topics) => {
                self.outline = topics;
                self.phase = Phase::Waiting;
            }
            GenerationEvent::SlidesStarted => {
                self.phase = Phase::Slides;
                self.slides.clear();
                self.nav = Navigator::default();
            }
            GenerationEvent::SlidesUpdated(slides) => self.set_slides(slides),
            GenerationEvent::SlidesCompleted(slides) => {
                self.set_slides(slides);
                self.phase = Phase::Done;
            }
            GenerationEvent::Saved { presentation_id } => {
                self.presentation_id = Some(presentation_id);
            }
            GenerationEvent::Error { message } => {
                tracing::warn!("generation error: {message}");
                self.phase = Phase::Failed(message);
            }
        }
    }

    fn set_slides(&mut self, slides: Vec<Slide>) {
        self.slides = slides;
        if self.follow {
            self.nav.current = self.slides.len().saturating_sub(1);
        } else {
            self.nav.clamp(self.slides.len());
        }
    }

    fn handle_key_event(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('f') => {
                self.follow = true;
                self.nav.current = self.slides.len().saturating_sub(1);
            }
            other => {
                if self.nav.handle(other, self.slides.len()) {
                    self.follow = self.nav.current + 1 >= self.slides.len();
                }
            }
        }
    }

    fn status(&self) -> String {
        let phase = match &self.phase {
            Phase::Waiting => "waiting".to_string(),
            Phase::Outline => format!("outlining ({} topics)", self.outline.len()),
            Phase::Slides => format!("generating ({} slides)", self.slides.len()),
            Phase::Done => format!("done ({} slides)", self.slides.len()),
            Phase::Failed(message) => format!("error: {message}"),
        };
        match &self.presentation_id {
            Some(id) => format!("{phase} · saved as {id}"),
            None => phase,
        }
    }

    fn ui(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(f.area());

        let color = match self.phase {
            Phase::Failed(_) => Color::Red,
            Phase::Done => Color::Green,
            _ => Color::Cyan,
        };
        let header = Paragraph::new(self.status())
            .style(Style::default().fg(color))
            .block(Block::default().borders(Borders::ALL).title("Deck"));
        f.render_widget(header, chunks[0]);

        if self.slides.is_empty() && !self.outline.is_empty() {
            let lines: Vec<Line> = self
                .outline
                .iter()
                .enumerate()
                .map(|(i, topic)| Line::from(format!("{:>2}. {topic}", i + 1)))
                .collect();
            let outline = Paragraph::new(Text::from(lines))
                .block(Block::default().borders(Borders::ALL).title("Outline"))
                .wrap(Wrap { trim: true });
            f.render_widget(outline, chunks[1]);
        } else {
            draw_deck(f, chunks[1], &self.slides, self.nav, "Slides");
        }

        let follow = if self.follow { "on" } else { "off" };
        let footer = Paragraph::new(format!(
            "← → (or j k) navigate | f follow ({follow}) | Press 'q' to quit"
        ))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
        f.render_widget(footer, chunks[2]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_common::Layout as SlideLayout;

    fn slides(n: usize) -> Vec<Slide> {
        (0..n).map(|i| Slide::new(i, SlideLayout::Default)).collect()
    }

    #[test]
    fn test_follows_newest_slide() {
        let mut app = LiveDeckApp::new();
        app.apply(GenerationEvent::SlidesStarted);
        app.apply(GenerationEvent::SlidesUpdated(slides(2)));
        assert_eq!(app.nav.current, 1);
        app.apply(GenerationEvent::SlidesUpdated(slides(4)));
        assert_eq!(app.nav.current, 3);
        assert_eq!(app.phase(), &Phase::Slides);
    }

    #[test]
    fn test_navigating_back_stops_following() {
        let mut app = LiveDeckApp::new();
        app.apply(GenerationEvent::SlidesUpdated(slides(3)));
        app.handle_key_event(KeyCode::Left);
        assert!(!app.follow);
        app.apply(GenerationEvent::SlidesUpdated(slides(5)));
        assert_eq!(app.nav.current, 1);

        app.handle_key_event(KeyCode::End);
        assert!(app.follow);
        app.apply(GenerationEvent::SlidesCompleted(slides(6)));
        assert_eq!(app.nav.current, 5);
        assert_eq!(app.phase(), &Phase::Done);
    }

    #[test]
    fn test_status_line() {
        let mut app = LiveDeckApp::new();
        app.apply(GenerationEvent::OutlineStarted);
        app.apply(GenerationEvent::OutlineUpdated(vec!["A".into(), "B".into()]));
        assert_eq!(app.status(), "outlining (2 topics)");

        app.apply(GenerationEvent::SlidesCompleted(slides(1)));
        app.apply(GenerationEvent::Saved { presentation_id: "p1".into() });
        assert_eq!(app.status(), "done (1 slides) · saved as p1");

        app.apply(GenerationEvent::Error { message: "boom".into() });
        assert!(app.status().starts_with("error: boom"));
    }
}
