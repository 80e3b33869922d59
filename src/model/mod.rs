//! The generative model as the engine sees it: corner patterns in, latent
//! vectors out; a latent vector in, a pattern out.
//!
//! Calls can be slow, so the engine never makes them on its own thread. They
//! go through [`worker`], which runs the model on a background thread and
//! hands results back tagged with the ticket they were issued under.

use std::fmt;

use crate::pipeline::pattern::{CornerSet, Pattern};

pub mod grid_model;
pub mod worker;

pub use grid_model::GridModel;
pub use worker::{ModelClient, ModelReply, ModelRequest, ModelWorker, Ticket};

pub type LatentVector = Vec<f32>;

/// Failure of a model call. The engine logs these and keeps its old state.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Encoding the corner set failed.
    Encode(String),
    /// Decoding a latent vector failed.
    Decode(String),
    /// Input had the wrong dimensions for this model.
    Shape(String),
    /// The request queue was full and the request was dropped.
    QueueFull,
    /// The worker thread is gone.
    Disconnected,
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Encode(msg) => write!(f, "encode failed: {}", msg),
            ModelError::Decode(msg) => write!(f, "decode failed: {}", msg),
            ModelError::Shape(msg) => write!(f, "shape mismatch: {}", msg),
            ModelError::QueueFull => write!(f, "model queue full"),
            ModelError::Disconnected => write!(f, "model worker disconnected"),
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;

pub trait PatternEncoder {
    /// Encode all four corners in one call so they share a latent basis.
    fn encode(&mut self, corners: &CornerSet<Pattern>) -> Result<CornerSet<LatentVector>>;
}

pub trait PatternDecoder {
    /// Decode a latent vector. Stochastic: `temperature` controls how far
    /// the output may stray, and equal inputs can decode differently.
    fn decode(&mut self, latent: &[f32], temperature: f32) -> Result<Pattern>;
}

/// A model the worker thread can own.
pub trait LatentModel: PatternEncoder + PatternDecoder + Send {}

impl<T: PatternEncoder + PatternDecoder + Send> LatentModel for T {}
