//! Audio layer — microphone capture and decibel estimation.
//!
//! # Flow
//!
//! ```text
//! Microphone → cpal callback → AudioBlock → bounded mpsc (drop-on-full)
//!           → PipelineRunner → estimate_decibels
//! ```

pub mod capture;
pub mod level;

pub use capture::{AudioBlock, AudioCapture, CaptureError, StreamHandle};
pub use level::estimate_decibels;
