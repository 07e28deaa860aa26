//! Orchestration for the upload and advice flows: sequences analyzer,
//! insight extraction, context assembly, advice generation, and persistence.

use crate::advisor::FinancialAdvisor;
use crate::analyzer::{AnalysisRecord, DocumentAnalyzer, FileCategory};
use crate::config::AppConfig;
use crate::db::models::{ConversationDetail, NewDocument, NewMessage};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::files::{self, FileStore, MAX_FILE_SIZE};
use crate::insights::document_insights;
use crate::llm::sutra::{SutraClient, SutraConfig};
use crate::llm::ChatCompletion;
use serde::Serialize;
use std::path::Path;

pub struct AdvisorService<C: ChatCompletion> {
    db: Database,
    advisor: FinancialAdvisor<C>,
    analyzer: DocumentAnalyzer,
    files: FileStore,
}

#[derive(Debug, Serialize)]
pub struct UploadOutcome {
    pub file_path: String,
    pub file_type: String,
    pub file_size: u64,
    pub analysis: AnalysisRecord,
    pub advice: String,
    pub insights: Vec<String>,
    pub conversation_id: String,
}

#[derive(Debug, Serialize)]
pub struct AdviceOutcome {
    pub answer: String,
    pub conversation_id: String,
}

impl AdvisorService<SutraClient> {
    /// Wire up the production service from startup configuration. The model
    /// credential was already validated when the config was constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut sutra = SutraConfig::new(config.api_key.clone());
        sutra.base_url = config.base_url.clone();
        sutra.model = config.model.clone();
        Ok(Self::new(
            Database::new(&config.database_path)?,
            FinancialAdvisor::new(SutraClient::new(sutra)),
            DocumentAnalyzer::new(),
            FileStore::new(config.upload_dir.clone()),
        ))
    }
}

impl<C: ChatCompletion> AdvisorService<C> {
    pub fn new(
        db: Database,
        advisor: FinancialAdvisor<C>,
        analyzer: DocumentAnalyzer,
        files: FileStore,
    ) -> Self {
        Self {
            db,
            advisor,
            analyzer,
            files,
        }
    }

    /// Upload flow: validate, analyze, advise, and persist the exchange.
    /// A failure after the file is saved deletes it before surfacing.
    pub async fn upload_document(
        &self,
        user_id: &str,
        file_name: &str,
        bytes: &[u8],
        conversation_id: Option<&str>,
    ) -> Result<UploadOutcome> {
        tracing::info!(file = file_name, "starting document upload");

        // 1. Reject unsupported extensions and oversize payloads before any I/O
        let ext = files::extension_of(file_name);
        if FileCategory::from_extension(&ext) == FileCategory::Unknown {
            return Err(Error::UnsupportedFormat(ext));
        }
        if bytes.len() as u64 > MAX_FILE_SIZE {
            return Err(Error::FileTooLarge {
                size: bytes.len() as u64,
                limit: MAX_FILE_SIZE,
            });
        }

        // 2. Resolve the conversation and assemble its current context
        let conversation = self.get_or_create_conversation(user_id, conversation_id)?;
        let context = self.db.conversation_context(&conversation.id)?;

        // 3. Persist the upload, then analyze it
        let saved_path = self.files.save(file_name, bytes)?;
        tracing::info!(path = %saved_path.display(), "file saved, starting analysis");
        let analysis = self
            .cleanup_on_failure(&saved_path, self.analyzer.analyze(&saved_path).await)?;
        let file_type = analysis.file_type();
        tracing::info!(%file_type, "document analysis completed");

        // 4. Generate advice and insights from the analysis
        let advice = self.cleanup_on_failure(
            &saved_path,
            self.advisor.document_advice(&analysis, &context.turns).await,
        )?;
        let insights = document_insights(&analysis);
        tracing::info!(count = insights.len(), "generated insights");

        // 5. Persist document + both turns atomically
        let document = NewDocument::new(
            file_name,
            saved_path.display().to_string(),
            file_type.label(),
            bytes.len() as i64,
            analysis.clone(),
        );
        let user_message = NewMessage::with_metadata(
            format!("Uploaded document: {}", file_name),
            serde_json::json!({ "file_id": document.id, "file_type": file_type.label() }),
        );
        let assistant_message =
            NewMessage::with_metadata(advice.clone(), serde_json::json!({ "insights": insights }));
        self.cleanup_on_failure(
            &saved_path,
            self.db.append_exchange(
                &conversation.id,
                conversation.revision,
                Some(&document),
                &user_message,
                &assistant_message,
            ),
        )?;

        // 6. Refresh the conversation's advisory language from the content.
        // The exchange is already committed, so a detection failure here only
        // leaves the previous language in place.
        if !analysis.text_content.is_empty() {
            match self.advisor.detect_language(&analysis.text_content).await {
                Ok(language) => self.db.set_language(&conversation.id, &language)?,
                Err(err) => tracing::warn!(%err, "language refresh skipped"),
            }
        }

        Ok(UploadOutcome {
            file_path: saved_path.display().to_string(),
            file_type: file_type.label().to_string(),
            file_size: bytes.len() as u64,
            analysis,
            advice,
            insights,
            conversation_id: conversation.id,
        })
    }

    /// Advice flow: answer a free-form message with full conversation and
    /// document context, persisting both turns.
    pub async fn get_advice(
        &self,
        user_id: &str,
        message: &str,
        language: Option<&str>,
        conversation_id: Option<&str>,
    ) -> Result<AdviceOutcome> {
        let conversation = self.get_or_create_conversation(user_id, conversation_id)?;
        let context = self.db.conversation_context(&conversation.id)?;

        let answer = self
            .advisor
            .get_advice(message, language, &context.turns, &context.documents)
            .await?;

        self.db.append_exchange(
            &conversation.id,
            conversation.revision,
            None,
            &NewMessage::plain(message),
            &NewMessage::plain(answer.clone()),
        )?;

        // Declared language wins; otherwise detect, best-effort once the
        // exchange is committed.
        match language {
            Some(lang) => self.db.set_language(&conversation.id, lang)?,
            None => match self.advisor.detect_language(message).await {
                Ok(lang) => self.db.set_language(&conversation.id, &lang)?,
                Err(err) => tracing::warn!(%err, "language refresh skipped"),
            },
        }

        Ok(AdviceOutcome {
            answer,
            conversation_id: conversation.id,
        })
    }

    /// All conversations for a user, most recently updated first.
    pub fn conversations(&self, user_id: &str) -> Result<Vec<ConversationDetail>> {
        self.db.conversations(user_id)
    }

    /// One conversation with nested messages and documents.
    pub fn conversation(&self, user_id: &str, conversation_id: &str) -> Result<ConversationDetail> {
        self.db.conversation_detail(conversation_id, user_id)
    }

    fn get_or_create_conversation(
        &self,
        user_id: &str,
        conversation_id: Option<&str>,
    ) -> Result<crate::db::models::Conversation> {
        match conversation_id {
            Some(id) => self.db.get_conversation(id, user_id),
            None => self.db.create_conversation(user_id),
        }
    }

    /// Delete a partially processed upload before surfacing the error.
    fn cleanup_on_failure<T>(&self, path: &Path, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            tracing::warn!(path = %path.display(), %err, "upload failed, removing file");
            self.files.remove(path);
        }
        result
    }
}
