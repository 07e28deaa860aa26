use super::{extraction_error, AnalysisDetails, AnalysisRecord, AnalysisType, FileCategory, PdfDetails};
use crate::error::Result;
use std::fs;
use std::path::Path;

/// Extract text per page in page order; pages yielding no text are skipped
/// rather than failing the whole document.
pub fn analyze(path: &Path) -> Result<AnalysisRecord> {
    let bytes = fs::read(path).map_err(|e| extraction_error(FileCategory::Pdf, e))?;
    let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
        .map_err(|e| extraction_error(FileCategory::Pdf, e))?;

    let page_count = pages.len();
    let text_parts: Vec<&str> = pages
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    let full_text = text_parts.join("\n");

    let word_count = full_text.split_whitespace().count();
    let char_count = full_text.chars().count();

    Ok(AnalysisRecord {
        analysis_type: AnalysisType::TextExtraction,
        summary: format!(
            "PDF document with {} pages containing {} words",
            page_count, word_count
        ),
        text_content: full_text,
        details: AnalysisDetails::Pdf(PdfDetails {
            page_count,
            word_count,
            char_count,
        }),
    })
}
