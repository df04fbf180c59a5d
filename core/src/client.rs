use async_trait::async_trait;
use deck_common::{
    BackendKind, DeckConfig, ImageRequest, ImageResponse, OutlineRequest, Presentation,
    PresentationContent, PresentationCreate, SlidesRequest,
};
use deck_fastapi::{FastApiClient, StreamEvent};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, Receiver};
use tokio::sync::Mutex;

use crate::error::{DeckError, Result};
use crate::markup::escape_markup;
use crate::outline::{outline_points, outline_titles};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseEvent {
    TextDelta(String),
    Completed,
    Error(String),
}

/// Data-access capability: generation streams plus presentation storage.
#[async_trait]
pub trait DeckBackend: Send + Sync {
    async fn stream_outline(&self, request: OutlineRequest) -> Result<Receiver<ResponseEvent>>;

    async fn stream_slides(&self, request: SlidesRequest) -> Result<Receiver<ResponseEvent>>;

    async fn create_presentation(&self, request: PresentationCreate) -> Result<Presentation>;

    async fn get_presentation(&self, id: &str) -> Result<Presentation>;

    async fn update_presentation(
        &self,
        id: &str,
        content: PresentationContent,
        title: Option<String>,
    ) -> Result<Presentation>;

    async fn list_presentations(&self, user_email: &str) -> Result<Vec<Presentation>>;

    async fn delete_presentations(&self, ids: &[String]) -> Result<()>;

    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResponse>;
}

/// Pick the provider once, at startup.
pub fn backend_from_config(config: &DeckConfig) -> Result<Arc<dyn DeckBackend>> {
    match config.backend {
        BackendKind::Stub => {
            tracing::info!("using in-process stub backend");
            Ok(Arc::new(StubBackend::new(Duration::from_millis(config.stub_delay_ms))))
        }
        BackendKind::FastApi => {
            if config.api_base_url.trim().is_empty() {
                return Err(DeckError::Config("api_base_url is empty".to_string()));
            }
            tracing::info!(url = %config.api_base_url, "using FastAPI backend");
            Ok(Arc::new(FastApiBackend::new(
                &config.api_base_url,
                config.user_email.clone(),
            )))
        }
    }
}

/// Development provider: canned generations and an in-memory store.
pub struct StubBackend {
    delay: Duration,
    piece_len: usize,
    store: Mutex<HashMap<String, Presentation>>,
}

impl StubBackend {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            piece_len: 12,
            store: Mutex::new(HashMap::new()),
        }
    }

    fn stream_text(&self, text: String) -> Receiver<ResponseEvent> {
        let (tx, rx) = mpsc::channel(32);
        let delay = self.delay;
        let pieces = split_pieces(&text, self.piece_len);
        tokio::spawn(async move {
            for piece in pieces {
                if tx.send(ResponseEvent::TextDelta(piece)).await.is_err() {
                    return;
                }
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            let _ = tx.send(ResponseEvent::Completed).await;
        });
        rx
    }
}

fn split_pieces(text: &str, piece_len: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(piece_len.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Markdown outline the stub "generates" for a prompt.
pub fn stub_outline(request: &OutlineRequest) -> String {
    let count = request.number_of_cards.max(1);
    let prompt = request.prompt.trim();
    let mut out = String::new();
    for i in 0..count {
        let title = match i {
            0 => format!("Introduction to {prompt}"),
            last if last + 1 == count => "Summary and Next Steps".to_string(),
            n => format!("{prompt}: Part {n}"),
        };
        out.push_str(&format!(
            "# {title}\n- Key idea {} about {prompt}\n- Why it matters\n\n",
            i + 1
        ));
    }
    out
}

/// Slide markup the stub "generates" for an outline.
pub fn stub_markup(request: &SlidesRequest) -> String {
    const LAYOUTS: [&str; 3] = ["left", "right", "vertical"];
    let tone = escape_markup(&request.tone);
    let mut out = String::from("<PRESENTATION>\n");

    let mut topics: Vec<(String, Vec<String>)> = request
        .outline
        .iter()
        .map(|item| {
            let title = outline_titles(std::slice::from_ref(item))
                .into_iter()
                .next()
                .unwrap_or_default();
            (title, outline_points(item))
        })
        .filter(|(title, _)| !title.is_empty())
        .collect();
    if topics.is_empty() {
        topics.push((request.title.clone(), Vec::new()));
    }

    for (i, (title, points)) in topics.iter().enumerate() {
        let title = escape_markup(title);
        out.push_str(&format!("<SECTION layout=\"{}\">\n", LAYOUTS[i % LAYOUTS.len()]));
        out.push_str(&format!("<H1>{title}</H1>\n<BULLETS>\n"));
        if points.is_empty() {
            out.push_str(&format!("<DIV><H3>Overview</H3><P>What {title} means for us.</P></DIV>\n"));
        }
        for point in points {
            let point = escape_markup(point);
            out.push_str(&format!("<DIV><H3>{point}</H3><P>{point}, explained.</P></DIV>\n"));
        }
        out.push_str("</BULLETS>\n");
        out.push_str(&format!("<IMG query=\"{title}, {tone} illustration\" />\n"));
        out.push_str(&format!("<NOTE>Present {title} in a {tone} tone.</NOTE>\n"));
        out.push_str("</SECTION>\n");
    }
    out.push_str("</PRESENTATION>");
    out
}

#[async_trait]
impl DeckBackend for StubBackend {
    async fn stream_outline(&self, request: OutlineRequest) -> Result<Receiver<ResponseEvent>> {
        Ok(self.stream_text(stub_outline(&request)))
    }

    async fn stream_slides(&self, request: SlidesRequest) -> Result<Receiver<ResponseEvent>> {
        Ok(self.stream_text(stub_markup(&request)))
    }

    async fn create_presentation(&self, request: PresentationCreate) -> Result<Presentation> {
        let stamp = now();
        let presentation = Presentation {
            id: uuid::Uuid::new_v4().to_string(),
            title: request.title,
            content: request.content,
            theme: request.theme.unwrap_or_else(|| "default".to_string()),
            language: request.language.unwrap_or_else(|| "English".to_string()),
            tone: request.tone.unwrap_or_else(|| "Professional".to_string()),
            user_id: request.user_email,
            created_at: stamp.clone(),
            updated_at: stamp,
            is_public: false,
            slug: None,
        };
        let mut store = self.store.lock().await;
        store.insert(presentation.id.clone(), presentation.clone());
        Ok(presentation)
    }

    async fn get_presentation(&self, id: &str) -> Result<Presentation> {
        let store = self.store.lock().await;
        store
            .get(id)
            .cloned()
            .ok_or_else(|| DeckError::NotFound(id.to_string()))
    }

    async fn update_presentation(
        &self,
        id: &str,
        content: PresentationContent,
        title: Option<String>,
    ) -> Result<Presentation> {
        let mut store = self.store.lock().await;
        let presentation = store
            .get_mut(id)
            .ok_or_else(|| DeckError::NotFound(id.to_string()))?;

        let mut merged = match std::mem::take(&mut presentation.content) {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        if let Some(slides) = content.slides {
            merged.insert("slides".to_string(), serde_json::to_value(slides)?);
        }
        if let Some(outline) = content.outline {
            merged.insert("outline".to_string(), serde_json::to_value(outline)?);
        }
        presentation.content = serde_json::Value::Object(merged);
        if let Some(title) = title.filter(|t| !t.is_empty()) {
            presentation.title = title;
        }
        presentation.updated_at = now();
        Ok(presentation.clone())
    }

    async fn list_presentations(&self, user_email: &str) -> Result<Vec<Presentation>> {
        let store = self.store.lock().await;
        let mut list: Vec<Presentation> = store
            .values()
            .filter(|p| p.user_id == user_email)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(list)
    }

    async fn delete_presentations(&self, ids: &[String]) -> Result<()> {
        let mut store = self.store.lock().await;
        for id in ids {
            if store.remove(id).is_none() {
                tracing::debug!(%id, "delete of unknown presentation ignored");
            }
        }
        Ok(())
    }

    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResponse> {
        Ok(ImageResponse {
            success: true,
            url: Some(format!("stub://images/{}.png", uuid::Uuid::new_v4())),
            prompt: Some(request.prompt),
            model: Some("stub".to_string()),
            error: None,
        })
    }
}

/// Adapter to wrap FastApiClient into DeckBackend
pub struct FastApiBackend {
    inner: FastApiClient,
    user_email: String,
}

impl FastApiBackend {
    pub fn new(base_url: &str, user_email: String) -> Self {
        Self {
            inner: FastApiClient::new(base_url),
            user_email,
        }
    }

    fn forward(mut rx_text: Receiver<StreamEvent>) -> Receiver<ResponseEvent> {
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            while let Some(event) = rx_text.recv().await {
                let (mapped, last) = match event {
                    StreamEvent::Text(text) => (ResponseEvent::TextDelta(text), false),
                    StreamEvent::Done => (ResponseEvent::Completed, true),
                    StreamEvent::Failed(message) => (ResponseEvent::Error(message), true),
                };
                if tx.send(mapped).await.is_err() || last {
                    return;
                }
            }
            let _ = tx
                .send(ResponseEvent::Error("stream closed before completion".to_string()))
                .await;
        });
        rx
    }
}

#[async_trait]
impl DeckBackend for FastApiBackend {
    async fn stream_outline(&self, request: OutlineRequest) -> Result<Receiver<ResponseEvent>> {
        let rx = self.inner.stream_outline(&request).await?;
        Ok(Self::forward(rx))
    }

    async fn stream_slides(&self, request: SlidesRequest) -> Result<Receiver<ResponseEvent>> {
        let rx = self.inner.stream_slides(&request).await?;
        Ok(Self::forward(rx))
    }

    async fn create_presentation(&self, mut request: PresentationCreate) -> Result<Presentation> {
        request.user_email = self.user_email.clone();
        Ok(self.inner.create_presentation(&request).await?)
    }

    async fn get_presentation(&self, id: &str) -> Result<Presentation> {
        Ok(self.inner.get_presentation(id).await?)
    }

    async fn update_presentation(
        &self,
        id: &str,
        content: PresentationContent,
        title: Option<String>,
    ) -> Result<Presentation> {
        Ok(self
            .inner
            .update_presentation(id, &content, title.as_deref())
            .await?)
    }

    async fn list_presentations(&self, user_email: &str) -> Result<Vec<Presentation>> {
        Ok(self.inner.list_presentations(user_email).await?)
    }

    async fn delete_presentations(&self, ids: &[String]) -> Result<()> {
        Ok(self.inner.delete_presentations(ids).await?)
    }

    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResponse> {
        Ok(self.inner.generate_image(&request, &self.user_email).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slide_parser::SlideParser;

    async fn collect(mut rx: Receiver<ResponseEvent>) -> String {
        let mut text = String::new();
        while let Some(event) = rx.recv().await {
            match event {
                ResponseEvent::TextDelta(delta) => text.push_str(&delta),
                ResponseEvent::Completed => break,
                ResponseEvent::Error(e) => panic!("unexpected stream error: {e}"),
            }
        }
        text
    }

    #[test]
    fn test_split_pieces_keeps_characters_whole() {
        let pieces = split_pieces("日本語のスライド", 3);
        assert_eq!(pieces, vec!["日本語", "のスラ", "イド"]);
    }

    #[tokio::test]
    async fn test_stub_outline_stream() {
        let backend = StubBackend::new(Duration::ZERO);
        let rx = backend
            .stream_outline(OutlineRequest {
                prompt: "Rust".into(),
                number_of_cards: 3,
                language: "English".into(),
            })
            .await
            .unwrap();
        let text = collect(rx).await;
        let items = crate::outline::parse_outline(&text);
        assert_eq!(
            outline_titles(&items),
            vec!["Introduction to Rust", "Rust: Part 1", "Summary and Next Steps"]
        );
    }

    #[tokio::test]
    async fn test_stub_markup_parses_into_one_slide_per_topic() {
        let backend = StubBackend::new(Duration::ZERO);
        let rx = backend
            .stream_slides(SlidesRequest {
                title: "Deck".into(),
                outline: vec!["# Safety & Speed\n- no GC".into(), "# Tooling".into()],
                language: "English".into(),
                tone: "casual".into(),
            })
            .await
            .unwrap();
        let text = collect(rx).await;

        let mut parser = SlideParser::new();
        parser.parse_chunk(&text);
        parser.finalize();
        let slides = parser.get_all_slides();
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].title(), Some("Safety & Speed"));
        assert_eq!(slides[1].title(), Some("Tooling"));
    }

    #[tokio::test]
    async fn test_stub_store_lifecycle() {
        let backend = StubBackend::new(Duration::ZERO);
        let created = backend
            .create_presentation(PresentationCreate {
                title: "Draft".into(),
                content: serde_json::json!({ "slides": [] }),
                theme: None,
                language: None,
                tone: None,
                user_email: "a@example.com".into(),
            })
            .await
            .unwrap();
        assert_eq!(created.theme, "default");

        let updated = backend
            .update_presentation(
                &created.id,
                PresentationContent::outline(vec!["# One".into()]),
                Some("Final".into()),
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.content["outline"][0], "# One");
        // untouched keys survive the merge
        assert!(updated.content["slides"].is_array());

        let listed = backend.list_presentations("a@example.com").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(backend.list_presentations("b@example.com").await.unwrap().is_empty());

        backend.delete_presentations(&[created.id.clone()]).await.unwrap();
        assert!(matches!(
            backend.get_presentation(&created.id).await,
            Err(DeckError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_forward_maps_events() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(StreamEvent::Text("<SEC".into())).await.unwrap();
        tx.send(StreamEvent::Done).await.unwrap();
        let mut out = FastApiBackend::forward(rx);
        assert_eq!(out.recv().await, Some(ResponseEvent::TextDelta("<SEC".into())));
        assert_eq!(out.recv().await, Some(ResponseEvent::Completed));
        assert_eq!(out.recv().await, None);
    }

    #[tokio::test]
    async fn test_forward_reports_truncated_stream() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(StreamEvent::Text("partial".into())).await.unwrap();
        drop(tx);
        let mut out = FastApiBackend::forward(rx);
        assert_eq!(out.recv().await, Some(ResponseEvent::TextDelta("partial".into())));
        assert!(matches!(out.recv().await, Some(ResponseEvent::Error(_))));
    }

    #[test]
    fn test_backend_from_config_rejects_empty_url() {
        let config = DeckConfig {
            api_base_url: "  ".into(),
            ..DeckConfig::default()
        };
        assert!(matches!(backend_from_config(&config), Err(DeckError::Config(_))));
    }
}
