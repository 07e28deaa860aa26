pub mod models;

use crate::context::{ConversationContext, ConversationTurn, DocumentContext, TurnRole};
use crate::error::{Error, Result};
use chrono::Utc;
use models::{Conversation, ConversationDetail, Document, Message, NewDocument, NewMessage};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

/// Durable store for conversations, messages, and documents.
pub struct Database {
    conn: Mutex<Connection>,
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

impl Database {
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA foreign_keys=ON;

            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                language TEXT NOT NULL DEFAULT 'en',
                revision INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                metadata TEXT,
                FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL,
                file_name TEXT NOT NULL,
                file_path TEXT NOT NULL,
                file_type TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                analysis TEXT NOT NULL,
                uploaded_at TEXT NOT NULL,
                FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_messages_conversation
                ON messages(conversation_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_documents_conversation
                ON documents(conversation_id, uploaded_at);
            ",
        )?;
        Ok(())
    }

    // ── Conversations ──

    pub fn create_conversation(&self, user_id: &str) -> Result<Conversation> {
        let conn = self.conn.lock().unwrap();
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_rfc3339();
        conn.execute(
            "INSERT INTO conversations (id, user_id, language, revision, created_at, updated_at)
             VALUES (?1, ?2, 'en', 0, ?3, ?3)",
            params![id, user_id, now],
        )?;
        Ok(Conversation {
            id,
            user_id: user_id.to_string(),
            language: "en".to_string(),
            revision: 0,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Look up a conversation owned by the given user. Missing or
    /// foreign-owned ids both read as not found.
    pub fn get_conversation(&self, id: &str, user_id: &str) -> Result<Conversation> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT id, user_id, language, revision, created_at, updated_at
             FROM conversations WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
            map_conversation,
        );
        match result {
            Ok(conv) => Ok(conv),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(Error::ConversationNotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_language(&self, conversation_id: &str, language: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE conversations SET language = ?1 WHERE id = ?2",
            params![language, conversation_id],
        )?;
        Ok(())
    }

    /// All conversations for a user, most recently updated first, with
    /// nested ordered messages and documents.
    pub fn conversations(&self, user_id: &str) -> Result<Vec<ConversationDetail>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, language, revision, created_at, updated_at
             FROM conversations WHERE user_id = ?1 ORDER BY updated_at DESC",
        )?;
        let conversations: Vec<Conversation> = stmt
            .query_map(params![user_id], map_conversation)?
            .collect::<rusqlite::Result<_>>()?;

        conversations
            .into_iter()
            .map(|conversation| {
                Ok(ConversationDetail {
                    messages: load_messages(&conn, &conversation.id)?,
                    documents: load_documents(&conn, &conversation.id)?,
                    conversation,
                })
            })
            .collect()
    }

    pub fn conversation_detail(&self, id: &str, user_id: &str) -> Result<ConversationDetail> {
        let conversation = self.get_conversation(id, user_id)?;
        let conn = self.conn.lock().unwrap();
        Ok(ConversationDetail {
            messages: load_messages(&conn, &conversation.id)?,
            documents: load_documents(&conn, &conversation.id)?,
            conversation,
        })
    }

    // ── Context assembly ──

    /// Context pair for the advisor: messages ordered by timestamp ascending
    /// (insertion order breaks ties) and documents by upload time ascending.
    /// Rows with unrecognized roles are skipped.
    pub fn conversation_context(&self, conversation_id: &str) -> Result<ConversationContext> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT role, content, timestamp FROM messages
             WHERE conversation_id = ?1 ORDER BY timestamp ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![conversation_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut turns = Vec::new();
        for row in rows {
            let (role, content, timestamp) = row?;
            let role = match role.as_str() {
                "user" => TurnRole::User,
                "assistant" => TurnRole::Assistant,
                other => {
                    tracing::warn!(role = other, "skipping message with unrecognized role");
                    continue;
                }
            };
            turns.push(ConversationTurn {
                role,
                content,
                timestamp,
            });
        }

        let mut stmt = conn.prepare(
            "SELECT file_name, file_type, analysis FROM documents
             WHERE conversation_id = ?1 ORDER BY uploaded_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![conversation_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (file_name, file_type, analysis_json) = row?;
            documents.push(DocumentContext {
                file_name,
                file_type,
                analysis: serde_json::from_str(&analysis_json)?,
            });
        }

        Ok(ConversationContext { turns, documents })
    }

    // ── Appends ──

    /// Persist one exchange (optional document, user turn, assistant turn)
    /// atomically. The revision check rejects a caller whose view of the
    /// conversation went stale, so racing requests cannot interleave or lose
    /// a turn pair.
    pub fn append_exchange(
        &self,
        conversation_id: &str,
        expected_revision: i64,
        document: Option<&NewDocument>,
        user: &NewMessage,
        assistant: &NewMessage,
    ) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let now = now_rfc3339();

        let updated = tx.execute(
            "UPDATE conversations SET revision = revision + 1, updated_at = ?1
             WHERE id = ?2 AND revision = ?3",
            params![now, conversation_id, expected_revision],
        )?;
        if updated == 0 {
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM conversations WHERE id = ?1)",
                params![conversation_id],
                |row| row.get(0),
            )?;
            return Err(if exists {
                Error::ConversationConflict(conversation_id.to_string())
            } else {
                Error::ConversationNotFound(conversation_id.to_string())
            });
        }

        if let Some(doc) = document {
            tx.execute(
                "INSERT INTO documents (id, conversation_id, file_name, file_path, file_type, file_size, analysis, uploaded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    doc.id,
                    conversation_id,
                    doc.file_name,
                    doc.file_path,
                    doc.file_type,
                    doc.file_size,
                    serde_json::to_string(&doc.analysis)?,
                    now
                ],
            )?;
        }

        insert_message(&tx, conversation_id, "user", user, &now)?;
        insert_message(&tx, conversation_id, "assistant", assistant, &now)?;

        tx.commit()?;
        Ok(())
    }
}

fn insert_message(
    tx: &rusqlite::Transaction<'_>,
    conversation_id: &str,
    role: &str,
    message: &NewMessage,
    now: &str,
) -> Result<()> {
    let metadata = message
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    tx.execute(
        "INSERT INTO messages (id, conversation_id, role, content, timestamp, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            uuid::Uuid::new_v4().to_string(),
            conversation_id,
            role,
            message.content,
            now,
            metadata
        ],
    )?;
    Ok(())
}

fn map_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        language: row.get(2)?,
        revision: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn load_messages(conn: &Connection, conversation_id: &str) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(
        "SELECT id, conversation_id, role, content, timestamp, metadata FROM messages
         WHERE conversation_id = ?1 ORDER BY timestamp ASC, rowid ASC",
    )?;
    let rows = stmt.query_map(params![conversation_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
        ))
    })?;

    let mut messages = Vec::new();
    for row in rows {
        let (id, conversation_id, role, content, timestamp, metadata) = row?;
        messages.push(Message {
            id,
            conversation_id,
            role,
            content,
            timestamp,
            metadata: metadata.as_deref().map(serde_json::from_str).transpose()?,
        });
    }
    Ok(messages)
}

fn load_documents(conn: &Connection, conversation_id: &str) -> Result<Vec<Document>> {
    let mut stmt = conn.prepare(
        "SELECT id, conversation_id, file_name, file_path, file_type, file_size, analysis, uploaded_at
         FROM documents WHERE conversation_id = ?1 ORDER BY uploaded_at ASC, rowid ASC",
    )?;
    let rows = stmt.query_map(params![conversation_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, i64>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, String>(7)?,
        ))
    })?;

    let mut documents = Vec::new();
    for row in rows {
        let (id, conversation_id, file_name, file_path, file_type, file_size, analysis, uploaded_at) =
            row?;
        documents.push(Document {
            id,
            conversation_id,
            file_name,
            file_path,
            file_type,
            file_size,
            analysis: serde_json::from_str(&analysis)?,
            uploaded_at,
        });
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::tabular::{analyze_table, Table};
    use crate::analyzer::{AnalysisDetails, AnalysisRecord, AnalysisType};

    fn sample_record() -> AnalysisRecord {
        let table = Table::new(
            vec!["Date".into(), "Balance".into()],
            vec![
                vec!["2024-01-01".into(), "100".into()],
                vec!["2024-01-02".into(), "200".into()],
            ],
        );
        AnalysisRecord {
            analysis_type: AnalysisType::DataAnalysis,
            summary: "CSV file with 2 rows and 2 columns".into(),
            text_content: "CSV File Analysis".into(),
            details: AnalysisDetails::Csv(analyze_table(&table)),
        }
    }

    fn new_document(record: &AnalysisRecord) -> NewDocument {
        NewDocument {
            id: uuid::Uuid::new_v4().to_string(),
            file_name: "statement.csv".into(),
            file_path: "uploads/abc.csv".into(),
            file_type: "CSV File".into(),
            file_size: 64,
            analysis: record.clone(),
        }
    }

    #[test]
    fn test_analysis_record_round_trips_through_document_context() {
        let db = Database::open_in_memory().unwrap();
        let conv = db.create_conversation("user-1").unwrap();
        let record = sample_record();

        db.append_exchange(
            &conv.id,
            conv.revision,
            Some(&new_document(&record)),
            &NewMessage::plain("Uploaded document: statement.csv"),
            &NewMessage::plain("advice"),
        )
        .unwrap();

        let context = db.conversation_context(&conv.id).unwrap();
        assert_eq!(context.documents.len(), 1);
        assert_eq!(context.documents[0].analysis, record);
        assert_eq!(context.documents[0].file_type, "CSV File");
    }

    #[test]
    fn test_context_orders_turns_and_skips_unknown_roles() {
        let db = Database::open_in_memory().unwrap();
        let conv = db.create_conversation("user-1").unwrap();
        db.append_exchange(
            &conv.id,
            0,
            None,
            &NewMessage::plain("A"),
            &NewMessage::plain("B"),
        )
        .unwrap();
        db.append_exchange(
            &conv.id,
            1,
            None,
            &NewMessage::plain("C"),
            &NewMessage::plain("D"),
        )
        .unwrap();

        // a row with an unrecognized role is skipped, not surfaced
        db.conn
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO messages (id, conversation_id, role, content, timestamp)
                 VALUES ('x', ?1, 'system', 'ignored', ?2)",
                params![conv.id, now_rfc3339()],
            )
            .unwrap();

        let context = db.conversation_context(&conv.id).unwrap();
        let contents: Vec<&str> = context.turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["A", "B", "C", "D"]);
        assert_eq!(context.turns[0].role, TurnRole::User);
        assert_eq!(context.turns[1].role, TurnRole::Assistant);
    }

    #[test]
    fn test_stale_revision_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let conv = db.create_conversation("user-1").unwrap();
        db.append_exchange(
            &conv.id,
            conv.revision,
            None,
            &NewMessage::plain("A"),
            &NewMessage::plain("B"),
        )
        .unwrap();

        // same revision again: the first append already bumped it
        let err = db
            .append_exchange(
                &conv.id,
                conv.revision,
                None,
                &NewMessage::plain("C"),
                &NewMessage::plain("D"),
            )
            .unwrap_err();
        assert!(matches!(err, Error::ConversationConflict(_)));
        assert_eq!(err.status_code(), 409);

        // nothing from the rejected exchange was persisted
        let context = db.conversation_context(&conv.id).unwrap();
        assert_eq!(context.turns.len(), 2);
    }

    #[test]
    fn test_foreign_owned_conversation_reads_as_not_found() {
        let db = Database::open_in_memory().unwrap();
        let conv = db.create_conversation("user-1").unwrap();
        let err = db.get_conversation(&conv.id, "user-2").unwrap_err();
        assert!(matches!(err, Error::ConversationNotFound(_)));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_conversation_detail_nests_ordered_history() {
        let db = Database::open_in_memory().unwrap();
        let conv = db.create_conversation("user-1").unwrap();
        let record = sample_record();
        db.append_exchange(
            &conv.id,
            0,
            Some(&new_document(&record)),
            &NewMessage::with_metadata("upload", serde_json::json!({"file_type": "CSV File"})),
            &NewMessage::plain("advice"),
        )
        .unwrap();

        let detail = db.conversation_detail(&conv.id, "user-1").unwrap();
        assert_eq!(detail.messages.len(), 2);
        assert_eq!(detail.documents.len(), 1);
        assert_eq!(detail.conversation.revision, 1);
        assert_eq!(
            detail.messages[0].metadata.as_ref().unwrap()["file_type"],
            "CSV File"
        );
    }
}
