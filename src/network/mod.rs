//! Network layer - REST calls against the timetable API
//!
//! The Network actor receives commands and sends back responses.

pub mod actor;
pub mod client;
pub mod documents;
pub mod loader;

pub use actor::NetworkActor;
pub use client::{ApiClient, PayloadEncoding};
