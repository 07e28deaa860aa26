//! Multilingual personal-finance assistant backend.
//!
//! Uploaded documents (PDF, Word, Excel, CSV, images) are analyzed into a
//! uniform record, summarized into plain-language insights, and folded into
//! per-conversation context for language-adaptive advice generation backed
//! by an OpenAI-compatible model endpoint. Conversations, messages, and
//! documents are persisted in SQLite.

pub mod advisor;
pub mod analyzer;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod files;
pub mod insights;
pub mod llm;
pub mod logging;
pub mod service;

pub use error::{Error, Result};
pub use service::{AdviceOutcome, AdvisorService, UploadOutcome};
