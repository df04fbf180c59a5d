//! Thin client for the FastAPI presentation service.

pub mod client;
pub mod decode;

pub use client::{FastApiClient, StreamEvent};
pub use decode::Utf8Accumulator;
