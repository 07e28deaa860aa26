//! Conversation-context value types handed to the advice generator.
//!
//! Both sequences are derived read-only from a conversation's persisted state
//! at the moment advice is requested; entries are never cached across
//! requests because conversations mutate continuously.

use crate::analyzer::AnalysisRecord;
use serde::{Deserialize, Serialize};

/// Roles a prior turn can carry. Persisted rows with any other role string
/// are skipped when context is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One prior turn, ordered by timestamp ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: String,
}

/// One previously uploaded document, ordered by upload time ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentContext {
    pub file_name: String,
    pub file_type: String,
    pub analysis: AnalysisRecord,
}

/// The context pair consumed by the advice generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationContext {
    pub turns: Vec<ConversationTurn>,
    pub documents: Vec<DocumentContext>,
}
