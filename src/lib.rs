//! COVID-19 Radar Library
//!
//! Fetches COVID-19 time series, caches them on disk and renders them as
//! launcher feedback. The binary in `main.rs` is a thin wrapper around `app`.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod feedback;
pub mod update;
