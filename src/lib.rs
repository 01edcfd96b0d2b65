//! Ambient noise monitor — microphone sampling, decibel classification and
//! remote alert/metrics delivery.
//!
//! # Overview
//!
//! ```text
//! Microphone ─▶ audio::AudioCapture ─▶ bounded queue ─▶ pipeline::PipelineRunner
//!                                                            ├─▶ sink::AlertSink
//!                                                            └─▶ sink::MetricsSink
//! ```
//!
//! * [`audio`] — cpal capture and RMS → decibel estimation.
//! * [`pipeline`] — severity classification, bounded history, the consumer
//!   loop and the [`NoiseMonitor`](pipeline::NoiseMonitor) lifecycle.
//! * [`sink`] — alert and metrics delivery traits plus their HTTP
//!   implementations.
//! * [`config`] — TOML settings loaded once at startup.

pub mod audio;
pub mod config;
pub mod pipeline;
pub mod sink;
