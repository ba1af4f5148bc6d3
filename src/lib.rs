//! Outfit-to-playlist captioning
//!
//! Sends a photo of a person to a hosted vision model, asks it to read the
//! outfit and mood in context (e.g. the weather), and validates the answer into
//! a typed music recommendation: genres, mood tags and a playlist title.

pub mod ai;
pub mod errlog;
pub mod error;
pub mod image;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod vocab;

pub use error::{Error, Result};
pub use pipeline::{CaptionPipeline, PipelineServices};
