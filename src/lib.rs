//! # Timetable Console
//!
//! A terminal admin console for a timetable REST API.
//!
//! ## Features
//! - Browse the schedule, groups, teachers, rooms and subjects
//! - Create, edit and delete records through forms
//! - Filter, sort and search the loaded tables
//! - Export Word, PDF and Excel documents, import bulk files
//! - Headless `dump`, `export` and `import` commands
//!
//! ## Architecture
//! Actor-based with channels:
//! - UI Layer (Ratatui) - synchronous
//! - App Layer (State machine)
//! - Network Layer (Tokio runtime)

pub mod app;
pub mod cache;
pub mod collate;
pub mod config;
pub mod constants;
pub mod error;
pub mod headless;
pub mod messages;
pub mod models;
pub mod network;
pub mod prefs;
pub mod ui;
pub mod view;

// Re-export commonly used types
pub use app::{AppActor, AppState};
pub use error::ConsoleError;
pub use messages::{NetworkCommand, NetworkResponse, RenderState, UiEvent};
pub use models::{Record, RecordDraft, ResourceKind};
pub use network::{ApiClient, NetworkActor};
