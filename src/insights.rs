//! Format-aware bullet insights derived from an analysis record.

use crate::analyzer::{AnalysisDetails, AnalysisRecord};

/// Vocabulary scanned for in extracted text, in emission order.
pub const FINANCIAL_KEYWORDS: &[&str] = &[
    "expense",
    "income",
    "budget",
    "investment",
    "profit",
    "loss",
    "revenue",
    "cost",
    "salary",
    "payment",
    "transaction",
    "account",
    "balance",
    "credit",
    "debit",
    "loan",
    "mortgage",
    "insurance",
    "tax",
    "savings",
];

/// Derive human-readable insights from a record. Pure and infallible: rules
/// apply in a fixed order and missing data simply emits nothing.
pub fn document_insights(record: &AnalysisRecord) -> Vec<String> {
    let mut insights = Vec::new();

    match &record.details {
        AnalysisDetails::Excel(details) => {
            insights.push(format!(
                "📊 Excel file contains {} sheets with {} total rows",
                details.sheet_count, details.total_rows
            ));
            let financial = financial_columns(record);
            if !financial.is_empty() {
                insights.push(format!(
                    "💰 Detected financial columns: {}",
                    financial.join(", ")
                ));
            }
            let numeric: Vec<&str> = details
                .sheets
                .values()
                .flat_map(|sheet| sheet.numeric_columns.iter().map(String::as_str))
                .collect();
            if !numeric.is_empty() {
                insights.push(format!(
                    "📈 Contains {} numeric columns for analysis",
                    numeric.len()
                ));
            }
        }
        AnalysisDetails::Csv(analysis) => {
            insights.push(format!(
                "📋 CSV file with {} rows and {} columns",
                analysis.rows, analysis.columns
            ));
            if let Some(financial) = &analysis.potential_financial_columns {
                insights.push(format!(
                    "💰 Financial data columns identified: {}",
                    financial.join(", ")
                ));
            }
        }
        AnalysisDetails::Pdf(details) => {
            insights.push(format!(
                "📄 PDF document with {} pages",
                details.page_count
            ));
            insights.push(format!(
                "📝 Contains {} words of text content",
                details.word_count
            ));
        }
        AnalysisDetails::Word(details) => {
            insights.push(format!(
                "📝 Word document with {} paragraphs",
                details.paragraph_count
            ));
            if details.table_count > 0 {
                insights.push(format!(
                    "📊 Contains {} tables with structured data",
                    details.table_count
                ));
            }
        }
        AnalysisDetails::Image(details) => {
            insights.push(format!(
                "🖼️ Image document ({}x{})",
                details.image_size.0, details.image_size.1
            ));
            insights.push(format!("🔍 OCR extracted {} words", details.word_count));
        }
    }

    if !record.text_content.is_empty() {
        let text_lower = record.text_content.to_lowercase();
        let found: Vec<&str> = FINANCIAL_KEYWORDS
            .iter()
            .filter(|kw| text_lower.contains(*kw))
            .take(5)
            .copied()
            .collect();
        if !found.is_empty() {
            insights.push(format!("💼 Financial keywords found: {}", found.join(", ")));
        }
    }

    if !financial_columns(record).is_empty() {
        insights.push("💰 Expense data found".to_string());
    }

    let credit_markers = ["credit", "debit", "balance"];
    let has_credit_column = column_names(record).iter().any(|name| {
        let lower = name.to_lowercase();
        credit_markers.iter().any(|marker| lower.contains(marker))
    });
    if has_credit_column {
        insights.push("🏦 Credit information found".to_string());
    }

    insights
}

/// Financial-keyword columns for any record shape: the CSV list, or the
/// ordered, deduplicated union across Excel sheets. Other formats have none.
fn financial_columns(record: &AnalysisRecord) -> Vec<String> {
    match &record.details {
        AnalysisDetails::Csv(analysis) => analysis
            .potential_financial_columns
            .clone()
            .unwrap_or_default(),
        AnalysisDetails::Excel(details) => {
            let mut seen = Vec::new();
            for sheet in details.sheets.values() {
                if let Some(cols) = &sheet.potential_financial_columns {
                    for col in cols {
                        if !seen.contains(col) {
                            seen.push(col.clone());
                        }
                    }
                }
            }
            seen
        }
        _ => Vec::new(),
    }
}

fn column_names(record: &AnalysisRecord) -> Vec<String> {
    match &record.details {
        AnalysisDetails::Csv(analysis) => analysis.column_names.clone(),
        AnalysisDetails::Excel(details) => details
            .sheets
            .values()
            .flat_map(|sheet| sheet.column_names.iter().cloned())
            .collect(),
        _ => Vec::new(),
    }
}
