use anyhow::{anyhow, Result};
use deck_common::{
    ImageRequest, ImageResponse, OutlineRequest, Presentation, PresentationContent,
    PresentationCreate, SlidesRequest,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::mpsc;

use crate::decode::Utf8Accumulator;

/// One piece of a streamed response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Text(String),
    Done,
    Failed(String),
}

/// REST client for the FastAPI presentation backend.
#[derive(Debug, Clone)]
pub struct FastApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl FastApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn stream_outline(&self, request: &OutlineRequest) -> Result<mpsc::Receiver<StreamEvent>> {
        self.stream_text("presentation/outline", request).await
    }

    pub async fn stream_slides(&self, request: &SlidesRequest) -> Result<mpsc::Receiver<StreamEvent>> {
        self.stream_text("presentation/generate", request).await
    }

    pub async fn create_presentation(&self, request: &PresentationCreate) -> Result<Presentation> {
        let resp = self
            .http
            .post(self.url("presentation/create"))
            .json(request)
            .send()
            .await?;
        read_json(resp, "create presentation").await
    }

    pub async fn get_presentation(&self, id: &str) -> Result<Presentation> {
        let resp = self.http.get(self.url(&format!("presentation/{id}"))).send().await?;
        read_json(resp, "get presentation").await
    }

    pub async fn update_presentation(
        &self,
        id: &str,
        content: &PresentationContent,
        title: Option<&str>,
    ) -> Result<Presentation> {
        let mut body = serde_json::json!({ "content": content });
        if let Some(title) = title.filter(|t| !t.is_empty()) {
            body["title"] = serde_json::Value::String(title.to_string());
        }
        let resp = self
            .http
            .put(self.url(&format!("presentation/{id}")))
            .json(&body)
            .send()
            .await?;
        read_json(resp, "update presentation").await
    }

    pub async fn list_presentations(&self, user_email: &str) -> Result<Vec<Presentation>> {
        let resp = self
            .http
            .get(self.url(&format!("presentation/user/{user_email}")))
            .send()
            .await?;
        read_json(resp, "get user presentations").await
    }

    pub async fn delete_presentations(&self, ids: &[String]) -> Result<()> {
        let body = serde_json::json!({ "presentation_ids": ids });
        let resp = self
            .http
            .delete(self.url("presentation/delete"))
            .json(&body)
            .send()
            .await?;
        let _: serde_json::Value = read_json(resp, "delete presentations").await?;
        Ok(())
    }

    pub async fn generate_image(&self, request: &ImageRequest, user_email: &str) -> Result<ImageResponse> {
        let body = ImageRequest {
            prompt: request.prompt.clone(),
            model: Some("dalle".to_string()),
            user_email: Some(user_email.to_string()),
        };
        let resp = self
            .http
            .post(self.url("presentation/generate-image"))
            .json(&body)
            .send()
            .await?;
        read_json(resp, "generate image").await
    }

    /// POST `body` and forward the decoded response text as it arrives.
    async fn stream_text<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<mpsc::Receiver<StreamEvent>> {
        let url = self.url(path);
        tracing::debug!(%url, "opening stream");

        let resp = self.http.post(&url).json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            tracing::warn!(%url, %status, "stream request rejected");
            return Err(anyhow!("{path} failed with http {status}: {text}"));
        }

        let stream = resp.bytes_stream();
        let (tx, rx) = mpsc::channel::<StreamEvent>(64);
        tokio::spawn(async move {
            use futures_util::StreamExt;
            let mut decoder = Utf8Accumulator::new();
            let mut stream = Box::pin(stream);
            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        tracing::trace!(bytes = bytes.len(), "received chunk");
                        let text = decoder.push(&bytes);
                        if !text.is_empty() && tx.send(StreamEvent::Text(text)).await.is_err() {
                            // receiver gone, nobody is listening anymore
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("stream chunk error: {e}");
                        let _ = tx.send(StreamEvent::Failed(e.to_string())).await;
                        return;
                    }
                }
            }
            let rest = decoder.finish();
            if !rest.is_empty() {
                let _ = tx.send(StreamEvent::Text(rest)).await;
            }
            tracing::debug!("stream finished");
            let _ = tx.send(StreamEvent::Done).await;
        });
        Ok(rx)
    }
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response, what: &str) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(anyhow!("Failed to {what}: http {status}: {text}"));
    }
    resp.json::<T>()
        .await
        .map_err(|e| anyhow!("Failed to {what}: bad response body: {e}"))
}
