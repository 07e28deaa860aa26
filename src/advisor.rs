//! Language-adaptive advice generation: builds prompt message sequences from
//! conversation and document context and invokes the model once per call.

use crate::analyzer::{AnalysisDetails, AnalysisRecord};
use crate::context::{ConversationTurn, DocumentContext, TurnRole};
use crate::error::Result;
use crate::llm::{ChatCompletion, ChatMessage};

pub struct FinancialAdvisor<C: ChatCompletion> {
    llm: C,
}

impl<C: ChatCompletion> FinancialAdvisor<C> {
    pub fn new(llm: C) -> Self {
        Self { llm }
    }

    /// Detect the language of `text`, returning a short language code.
    /// An empty model response falls back to `"en"`; a failed model call
    /// propagates as an advice-generation error.
    pub async fn detect_language(&self, text: &str) -> Result<String> {
        let prompt = format!(
            "Detect the language of the following text and respond with only the language code \
             (e.g., 'en' for English, 'es' for Spanish, 'fr' for French, 'de' for German, \
             'hi' for Hindi, 'ta' for Tamil, 'te' for Telugu, 'ml' for Malayalam, 'kn' for Kannada, etc.).\n\n\
             Text: {}\n\nLanguage code:",
            text
        );
        let response = self.llm.complete(&[ChatMessage::user(prompt)]).await?;
        let detected = response.trim().to_lowercase();
        Ok(if detected.is_empty() {
            "en".to_string()
        } else {
            detected
        })
    }

    /// Free-form advice for a user message, with prior turns and uploaded
    /// documents folded into the prompt. Detects the language first when
    /// none is declared.
    pub async fn get_advice(
        &self,
        message: &str,
        language: Option<&str>,
        conversation_context: &[ConversationTurn],
        document_context: &[DocumentContext],
    ) -> Result<String> {
        let language = match language {
            Some(lang) => lang.to_string(),
            None => self.detect_language(message).await?,
        };

        let mut system = format!(
            "You are a helpful multilingual financial advisor. The user has asked a question in {}.\n\
             IMPORTANT: You must respond in the exact same language as the user's question.\n\n\
             Language guidelines:\n\
             - If the user writes in English, respond in English\n\
             - If the user writes in Tamil, respond in Tamil\n\
             - If the user writes in Hindi, respond in Hindi\n\
             - If the user writes in Spanish, respond in Spanish\n\
             - If the user writes in French, respond in French\n\
             - If the user writes in German, respond in German\n\
             - If the user writes in any other language, respond in that same language\n\n\
             Always match the user's language exactly and provide helpful financial advice.\n",
            language
        );

        if !document_context.is_empty() {
            system.push_str("\nIMPORTANT DOCUMENT CONTEXT:\n");
            for doc in document_context {
                system.push_str(&format!("\n📄 Document: {}\n", doc.file_name));
                system.push_str(&format!("Type: {}\n", doc.file_type));
                system.push_str(&format!("Summary: {}\n", doc.analysis.summary));
                if !doc.analysis.text_content.is_empty() {
                    system.push_str(&format!(
                        "Content Preview: {}...\n",
                        preview(&doc.analysis.text_content, 500)
                    ));
                }
            }
            system.push_str("\nUse this document context to provide more relevant and specific advice.\n");
        }

        let mut messages = vec![ChatMessage::system(system)];
        replay_context(&mut messages, conversation_context);
        messages.push(ChatMessage::user(message));

        Ok(self.llm.complete(&messages).await?)
    }

    /// Advice triggered by a document upload, with the response language
    /// matched to the document content.
    pub async fn document_advice(
        &self,
        record: &AnalysisRecord,
        conversation_context: &[ConversationTurn],
    ) -> Result<String> {
        let language = if record.text_content.is_empty() {
            "en".to_string()
        } else {
            self.detect_language(&record.text_content).await?
        };

        let mut system = format!(
            "You are an expert financial advisor analyzing documents. Provide practical, \
             actionable financial advice based on the document analysis.\n\n\
             IMPORTANT: You must respond in {} language to match the document content.\n\n\
             Focus on:\n\
             - Key financial insights from the document\n\
             - Actionable recommendations\n\
             - Budgeting and expense management advice\n\
             - Investment or savings opportunities\n\
             - Risk assessment if applicable\n\n\
             Provide clear, specific, and practical advice.\n",
            language
        );
        if !conversation_context.is_empty() {
            system.push_str(
                "\nCONVERSATION CONTEXT:\nConsider the previous conversation when providing advice.\n",
            );
        }

        let mut messages = vec![ChatMessage::system(system)];
        replay_context(&mut messages, conversation_context);
        messages.push(ChatMessage::user(document_prompt(record)));

        Ok(self.llm.complete(&messages).await?)
    }
}

/// Replay prior turns in order as alternating user/assistant messages.
fn replay_context(messages: &mut Vec<ChatMessage>, context: &[ConversationTurn]) {
    for turn in context {
        messages.push(match turn.role {
            TurnRole::User => ChatMessage::user(turn.content.clone()),
            TurnRole::Assistant => ChatMessage::assistant(turn.content.clone()),
        });
    }
}

/// Format-specific analysis prompt for document-triggered advice.
fn document_prompt(record: &AnalysisRecord) -> String {
    let file_type = record.file_type();
    match &record.details {
        AnalysisDetails::Csv(analysis) => tabular_prompt(
            file_type.label(),
            &record.summary,
            analysis.rows,
            analysis.columns,
            &analysis.column_names,
            &analysis.numeric_columns,
            analysis
                .potential_financial_columns
                .as_deref()
                .unwrap_or(&[]),
        ),
        AnalysisDetails::Excel(details) => {
            // ordered unions across sheets; the per-sheet lists stay in the record
            let column_names = union(details.sheets.values().map(|s| &s.column_names));
            let numeric = union(details.sheets.values().map(|s| &s.numeric_columns));
            let financial: Vec<String> = {
                let lists: Vec<Vec<String>> = details
                    .sheets
                    .values()
                    .filter_map(|s| s.potential_financial_columns.clone())
                    .collect();
                union(lists.iter())
            };
            tabular_prompt(
                file_type.label(),
                &record.summary,
                details.total_rows,
                details.total_columns,
                &column_names,
                &numeric,
                &financial,
            )
        }
        AnalysisDetails::Pdf(_) | AnalysisDetails::Word(_) => format!(
            "I have analyzed a {} with the following content:\n\n\
             Document Summary: {}\n\n\
             Content Preview:\n{}...\n\n\
             Based on this financial document, provide specific insights and recommendations.\n\
             Focus on key financial information, potential action items, and advice for better financial management.",
            file_type.label(),
            record.summary,
            preview(&record.text_content, 1000)
        ),
        AnalysisDetails::Image(_) => format!(
            "I have analyzed an image document with OCR text extraction:\n\n\
             Image Summary: {}\n\n\
             Extracted Text:\n{}\n\n\
             Based on this financial document image, provide insights and recommendations.\n\
             Focus on any financial information that can be extracted and provide relevant advice.",
            record.summary, record.text_content
        ),
    }
}

fn tabular_prompt(
    file_type: &str,
    summary: &str,
    rows: usize,
    columns: usize,
    column_names: &[String],
    numeric_columns: &[String],
    financial_columns: &[String],
) -> String {
    format!(
        "I have analyzed a {} with the following characteristics:\n\n\
         File Summary: {}\n\n\
         Data Details:\n\
         - Rows: {}\n\
         - Columns: {}\n\
         - Column Names: {}\n\
         - Numeric Columns: {}\n\
         - Potential Financial Columns: {}\n\n\
         Based on this financial data, provide specific insights and recommendations for better financial management.\n\
         Focus on actionable advice related to budgeting, expense tracking, and financial planning.",
        file_type,
        summary,
        rows,
        columns,
        column_names.join(", "),
        numeric_columns.join(", "),
        financial_columns.join(", ")
    )
}

/// First `limit` characters of `text`, on a char boundary.
fn preview(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Ordered, deduplicated union of string lists.
fn union<'a>(lists: impl Iterator<Item = &'a Vec<String>>) -> Vec<String> {
    let mut seen = Vec::new();
    for list in lists {
        for item in list {
            if !seen.contains(item) {
                seen.push(item.clone());
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::tabular::{analyze_table, Table};
    use crate::analyzer::AnalysisType;
    use crate::llm::{ChatRole, LlmError};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted model: pops queued replies and records every invocation.
    struct StubLlm {
        replies: Mutex<VecDeque<String>>,
        calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl StubLlm {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Vec<ChatMessage>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatCompletion for StubLlm {
        async fn complete(
            &self,
            messages: &[ChatMessage],
        ) -> std::result::Result<String, LlmError> {
            self.calls.lock().unwrap().push(messages.to_vec());
            Ok(self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default())
        }
    }

    fn turn(role: TurnRole, content: &str) -> ConversationTurn {
        ConversationTurn {
            role,
            content: content.to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_detect_language_defaults_to_english_on_empty_reply() {
        let advisor = FinancialAdvisor::new(StubLlm::new(&[""]));
        assert_eq!(advisor.detect_language("").await.unwrap(), "en");
    }

    #[tokio::test]
    async fn test_detect_language_normalizes_reply() {
        let advisor = FinancialAdvisor::new(StubLlm::new(&["  TA \n"]));
        assert_eq!(advisor.detect_language("வணக்கம்").await.unwrap(), "ta");
    }

    #[tokio::test]
    async fn test_get_advice_replays_context_in_order() {
        let advisor = FinancialAdvisor::new(StubLlm::new(&["answer"]));
        let context = vec![turn(TurnRole::User, "A"), turn(TurnRole::Assistant, "B")];

        let answer = advisor
            .get_advice("C", Some("en"), &context, &[])
            .await
            .unwrap();
        assert_eq!(answer, "answer");

        let calls = advisor.llm.calls();
        assert_eq!(calls.len(), 1); // declared language: no detection call
        let sequence: Vec<(ChatRole, &str)> = calls[0]
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(sequence.len(), 4);
        assert_eq!(sequence[0].0, ChatRole::System);
        assert_eq!(sequence[1], (ChatRole::User, "A"));
        assert_eq!(sequence[2], (ChatRole::Assistant, "B"));
        assert_eq!(sequence[3], (ChatRole::User, "C"));
    }

    #[tokio::test]
    async fn test_get_advice_detects_language_when_undeclared() {
        let advisor = FinancialAdvisor::new(StubLlm::new(&["fr", "réponse"]));
        let answer = advisor.get_advice("Bonjour", None, &[], &[]).await.unwrap();
        assert_eq!(answer, "réponse");

        let calls = advisor.llm.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0][0].content.contains("Language code:"));
        assert!(calls[1][0].content.contains("a question in fr"));
    }

    #[tokio::test]
    async fn test_document_context_blocks_are_attributable_and_truncated() {
        let advisor = FinancialAdvisor::new(StubLlm::new(&["ok"]));
        let long_text = "x".repeat(600);
        let record = AnalysisRecord {
            analysis_type: AnalysisType::TextExtraction,
            summary: "PDF document with 1 pages containing 600 words".into(),
            text_content: long_text,
            details: AnalysisDetails::Pdf(crate::analyzer::PdfDetails {
                page_count: 1,
                word_count: 600,
                char_count: 600,
            }),
        };
        let docs = vec![DocumentContext {
            file_name: "report.pdf".into(),
            file_type: "PDF Document".into(),
            analysis: record,
        }];

        advisor
            .get_advice("what does it say?", Some("en"), &[], &docs)
            .await
            .unwrap();

        let calls = advisor.llm.calls();
        let system = &calls[0][0].content;
        assert!(system.contains("📄 Document: report.pdf"));
        assert!(system.contains("Type: PDF Document"));
        assert!(system.contains("Summary: PDF document with 1 pages"));
        let preview_len = system
            .split("Content Preview: ")
            .nth(1)
            .unwrap()
            .split("...")
            .next()
            .unwrap()
            .len();
        assert_eq!(preview_len, 500);
    }

    #[tokio::test]
    async fn test_document_advice_uses_tabular_template_for_csv() {
        let advisor = FinancialAdvisor::new(StubLlm::new(&["en", "advice"]));
        let table = Table::new(
            vec!["Date".into(), "Amount".into()],
            vec![vec!["2024-01-01".into(), "100".into()]],
        );
        let record = AnalysisRecord {
            analysis_type: AnalysisType::DataAnalysis,
            summary: "CSV file with 1 rows and 2 columns".into(),
            text_content: "CSV File Analysis".into(),
            details: AnalysisDetails::Csv(analyze_table(&table)),
        };

        let answer = advisor.document_advice(&record, &[]).await.unwrap();
        assert_eq!(answer, "advice");

        let calls = advisor.llm.calls();
        let prompt = &calls[1].last().unwrap().content;
        assert!(prompt.contains("I have analyzed a CSV File"));
        assert!(prompt.contains("- Rows: 1"));
        assert!(prompt.contains("- Column Names: Date, Amount"));
        assert!(prompt.contains("- Numeric Columns: Amount"));
        assert!(prompt.contains("- Potential Financial Columns: Amount"));
    }

    #[tokio::test]
    async fn test_document_advice_skips_detection_for_empty_text() {
        let advisor = FinancialAdvisor::new(StubLlm::new(&["advice"]));
        let record = AnalysisRecord {
            analysis_type: AnalysisType::DataAnalysis,
            summary: "CSV file with 0 rows and 0 columns".into(),
            text_content: String::new(),
            details: AnalysisDetails::Csv(analyze_table(&Table::default())),
        };

        advisor.document_advice(&record, &[]).await.unwrap();
        let calls = advisor.llm.calls();
        assert_eq!(calls.len(), 1); // straight to advice, language defaulted
        assert!(calls[0][0].content.contains("respond in en language"));
    }
}
