//! Streaming slide-deck reconstruction and the generation flow around it.

pub mod client;
pub mod coalesce;
pub mod error;
pub mod generation;
pub mod markup;
pub mod outline;
pub mod slide_parser;

pub use client::{backend_from_config, DeckBackend, FastApiBackend, ResponseEvent, StubBackend};
pub use coalesce::FrameCoalescer;
pub use error::{DeckError, Result};
pub use generation::{GenerationEvent, GenerationManager};
pub use outline::{outline_titles, parse_outline};
pub use slide_parser::SlideParser;
