pub mod live;
pub mod preview;
pub mod render;
mod terminal;

use anyhow::Result;
use deck_core::{GenerationEvent, SlideParser};
use std::path::Path;
use tokio::sync::mpsc;

pub use live::*;
pub use preview::*;

/// Run slide preview for a markup file
pub async fn run_preview<P: AsRef<Path>>(file_path: P) -> Result<()> {
    let content = tokio::fs::read_to_string(file_path).await?;
    let mut parser = SlideParser::new();
    parser.parse_chunk(&content);
    parser.finalize();

    let mut preview = SlidePreview::new(parser.get_all_slides());
    preview.run().await
}

/// Show a deck while it is generated, until the user quits.
pub async fn run_live(events: mpsc::Receiver<GenerationEvent>) -> Result<()> {
    let mut app = LiveDeckApp::new();
    app.run(events).await
}
