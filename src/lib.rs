//! News ingestion and distribution pipeline for a Tamil-language portal:
//! pulls partner RSS feeds, rewrites stories with a generative model, holds
//! them for moderation, relays published stories to Facebook and alerts
//! operators when the pipeline stalls.

pub mod ai;
pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod models;
pub mod services;
pub mod web;

pub use app::App;
pub use config::Config;
pub use error::{AppError, Result};
