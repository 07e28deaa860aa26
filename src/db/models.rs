use crate::analyzer::AnalysisRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    /// Most recently detected or declared language; advisory only.
    pub language: String,
    /// Bumped on every append; guards optimistic concurrency checks.
    pub revision: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    pub timestamp: String,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Document {
    pub id: String,
    pub conversation_id: String,
    pub file_name: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub analysis: AnalysisRecord,
    pub uploaded_at: String,
}

/// A conversation with its ordered messages and documents nested, as served
/// by the conversation read API.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<Message>,
    pub documents: Vec<Document>,
}

/// Fields for a document row persisted alongside an exchange. The id is
/// generated up front so the caller can reference it from message metadata.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: String,
    pub file_name: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub analysis: AnalysisRecord,
}

impl NewDocument {
    pub fn new(
        file_name: impl Into<String>,
        file_path: impl Into<String>,
        file_type: impl Into<String>,
        file_size: i64,
        analysis: AnalysisRecord,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_name: file_name.into(),
            file_path: file_path.into(),
            file_type: file_type.into(),
            file_size,
            analysis,
        }
    }
}

/// One turn to persist: role is implied by position in the exchange.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub content: String,
    pub metadata: Option<serde_json::Value>,
}

impl NewMessage {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(content: impl Into<String>, metadata: serde_json::Value) -> Self {
        Self {
            content: content.into(),
            metadata: Some(metadata),
        }
    }
}
