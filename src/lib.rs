//! Prompt-to-image studio: a Gemini-backed generation proxy plus a
//! history-aware client layer.
//!
//! The `image-studio` binary serves `POST /generate-image`; the `studio-cli`
//! binary drives the [`controller`] state machine against it and keeps a
//! bounded, persisted prompt history.

pub mod config;
pub mod controller;
pub mod gemini;
pub mod history;
pub mod server;
pub mod storage;
