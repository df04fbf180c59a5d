//! Drives outline and slide generation: reads the backend stream, feeds the
//! parsers and publishes updates at most once per frame.

use deck_common::{OutlineRequest, PresentationContent, Slide, SlidesRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::client::{DeckBackend, ResponseEvent};
use crate::coalesce::FrameCoalescer;
use crate::error::{DeckError, Result};
use crate::outline::parse_outline;
use crate::slide_parser::SlideParser;

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    OutlineStarted,
    OutlineUpdated(Vec<String>),
    OutlineCompleted(Vec<String>),
    SlidesStarted,
    SlidesUpdated(Vec<Slide>),
    SlidesCompleted(Vec<Slide>),
    Saved { presentation_id: String },
    Error { message: String },
}

pub struct GenerationManager {
    backend: Arc<dyn DeckBackend>,
    parser: SlideParser,
    events: mpsc::Sender<GenerationEvent>,
    frame_interval: Duration,
}

impl GenerationManager {
    pub fn new(
        backend: Arc<dyn DeckBackend>,
        events: mpsc::Sender<GenerationEvent>,
        frame_interval: Duration,
    ) -> Self {
        Self {
            backend,
            parser: SlideParser::new(),
            events,
            frame_interval: frame_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn backend(&self) -> &Arc<dyn DeckBackend> {
        &self.backend
    }

    async fn emit(&self, event: GenerationEvent) {
        // a listener that went away is not our problem
        if self.events.send(event).await.is_err() {
            tracing::trace!("generation event dropped, no listener");
        }
    }

    fn frames(&self) -> tokio::time::Interval {
        let mut frames = tokio::time::interval(self.frame_interval);
        frames.set_missed_tick_behavior(MissedTickBehavior::Delay);
        frames
    }

    /// Stream an outline, publishing the parsed topics as they grow.
    pub async fn generate_outline(
        &mut self,
        request: OutlineRequest,
        presentation_id: Option<&str>,
    ) -> Result<Vec<String>> {
        tracing::info!(prompt = %request.prompt, cards = request.number_of_cards, "starting outline generation");
        self.emit(GenerationEvent::OutlineStarted).await;

        let mut rx = match self.backend.stream_outline(request).await {
            Ok(rx) => rx,
            Err(e) => return Err(self.fail(e).await),
        };

        let mut accumulated = String::new();
        let mut coalescer = FrameCoalescer::new();
        let mut frames = self.frames();

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(ResponseEvent::TextDelta(delta)) => {
                        accumulated.push_str(&delta);
                        coalescer.offer(parse_outline(&accumulated));
                    }
                    Some(ResponseEvent::Completed) => break,
                    Some(ResponseEvent::Error(message)) => {
                        return Err(self.fail(DeckError::Stream(message)).await);
                    }
                    None => {
                        return Err(self.fail(DeckError::Stream("outline stream closed".into())).await);
                    }
                },
                _ = frames.tick(), if coalescer.is_pending() => {
                    if let Some(items) = coalescer.take() {
                        self.emit(GenerationEvent::OutlineUpdated(items)).await;
                    }
                }
            }
        }
        coalescer.cancel();

        let outline = parse_outline(&accumulated);
        tracing::info!(topics = outline.len(), "outline generation finished");
        self.emit(GenerationEvent::OutlineCompleted(outline.clone())).await;

        if let Some(id) = presentation_id {
            self.persist(id, PresentationContent::outline(outline.clone()), None)
                .await;
        }
        Ok(outline)
    }

    /// Stream slide markup, publishing the reconstructed deck as it grows.
    pub async fn generate_slides(
        &mut self,
        request: SlidesRequest,
        presentation_id: Option<&str>,
    ) -> Result<Vec<Slide>> {
        tracing::info!(title = %request.title, topics = request.outline.len(), "starting slide generation");
        let title = request.title.clone();
        self.parser.reset();
        self.emit(GenerationEvent::SlidesStarted).await;

        let mut rx = match self.backend.stream_slides(request).await {
            Ok(rx) => rx,
            Err(e) => return Err(self.fail(e).await),
        };

        let mut accumulated = String::new();
        let mut coalescer = FrameCoalescer::new();
        let mut frames = self.frames();

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(ResponseEvent::TextDelta(delta)) => {
                        accumulated.push_str(&delta);
                        self.parser.parse_chunk(&accumulated);
                        coalescer.offer(self.parser.get_all_slides());
                    }
                    Some(ResponseEvent::Completed) => break,
                    Some(ResponseEvent::Error(message)) => {
                        self.parser.reset();
                        return Err(self.fail(DeckError::Stream(message)).await);
                    }
                    None => {
                        self.parser.reset();
                        return Err(self.fail(DeckError::Stream("slide stream closed".into())).await);
                    }
                },
                _ = frames.tick(), if coalescer.is_pending() => {
                    if let Some(slides) = coalescer.take() {
                        self.emit(GenerationEvent::SlidesUpdated(slides)).await;
                    }
                }
            }
        }
        coalescer.cancel();

        self.parser.finalize();
        self.parser.clear_all_generating_marks();
        let slides = self.parser.get_all_slides();
        tracing::info!(slides = slides.len(), bytes = accumulated.len(), "slide generation finished");
        self.emit(GenerationEvent::SlidesCompleted(slides.clone())).await;

        if let Some(id) = presentation_id {
            self.persist(id, PresentationContent::slides(slides.clone()), Some(title))
                .await;
        }
        Ok(slides)
    }

    async fn persist(&self, id: &str, content: PresentationContent, title: Option<String>) {
        match self.backend.update_presentation(id, content, title).await {
            Ok(_) => {
                tracing::info!(presentation_id = id, "presentation updated");
                self.emit(GenerationEvent::Saved {
                    presentation_id: id.to_string(),
                })
                .await;
            }
            Err(e) => {
                tracing::error!(presentation_id = id, "failed to update presentation: {e}");
                self.emit(GenerationEvent::Error {
                    message: format!("Failed to save presentation: {e}"),
                })
                .await;
            }
        }
    }

    async fn fail(&self, error: DeckError) -> DeckError {
        tracing::error!("generation failed: {error}");
        self.emit(GenerationEvent::Error {
            message: error.to_string(),
        })
        .await;
        error
    }
}
