//! Student Feedback Analyzer.
//!
//! Students submit a rating and comments per subject; the dashboard shows
//! per-subject averages, a word cloud, and Gemini-backed sentiment labels and
//! summaries for the selected subject.

pub mod analysis;
pub mod analytics;
pub mod config;
pub mod csv_store;
pub mod database;
pub mod error;
pub mod feedback;
pub mod gemini;
pub mod pages;
pub mod routes;
pub mod storage;

pub use error::{FeedbackError, Result};
