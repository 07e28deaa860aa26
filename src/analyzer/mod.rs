//! Document analysis: one uploaded file in, one uniform `AnalysisRecord` out.
//!
//! Dispatch is a pure mapping from extension to format category; each
//! category has its own analyzer submodule. Adding a format means adding one
//! `AnalysisDetails` variant, one submodule, and one table entry here.

pub mod csv_file;
pub mod excel;
pub mod image_file;
pub mod ocr;
pub mod pdf;
pub mod tabular;
pub mod word;

use crate::error::{Error, Result};
use indexmap::IndexMap;
use ocr::{OcrEngine, TesseractOcr};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tabular::TabularAnalysis;

/// Extensions the ingestion layer accepts, in dispatch-table order.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xlsx", "xls", "csv", "png", "jpg", "jpeg", "bmp", "tiff",
];

/// Format category an extension maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileCategory {
    #[serde(rename = "PDF Document")]
    Pdf,
    #[serde(rename = "Word Document")]
    Word,
    #[serde(rename = "Excel Spreadsheet")]
    Excel,
    #[serde(rename = "CSV File")]
    Csv,
    #[serde(rename = "Image")]
    Image,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl FileCategory {
    /// Extension (lowercase, without the dot) → category. Unknown extensions
    /// are rejected by the dispatcher before any file I/O.
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "pdf" => FileCategory::Pdf,
            "doc" | "docx" => FileCategory::Word,
            "xlsx" | "xls" => FileCategory::Excel,
            "csv" => FileCategory::Csv,
            "png" | "jpg" | "jpeg" | "bmp" | "tiff" => FileCategory::Image,
            _ => FileCategory::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileCategory::Pdf => "PDF Document",
            FileCategory::Word => "Word Document",
            FileCategory::Excel => "Excel Spreadsheet",
            FileCategory::Csv => "CSV File",
            FileCategory::Image => "Image",
            FileCategory::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How the text/data in a record was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    TextExtraction,
    DataAnalysis,
    OcrExtraction,
}

/// Uniform output of analyzing one uploaded document.
///
/// The four always-present fields (`file_type` via the details tag,
/// `analysis_type`, `summary`, `text_content`) never vary in type, so a
/// client can render a summary without knowing which branch produced the
/// record. Created once per upload, never mutated, embedded verbatim into
/// the persisted conversation document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub analysis_type: AnalysisType,
    pub summary: String,
    pub text_content: String,
    #[serde(flatten)]
    pub details: AnalysisDetails,
}

impl AnalysisRecord {
    pub fn file_type(&self) -> FileCategory {
        match self.details {
            AnalysisDetails::Pdf(_) => FileCategory::Pdf,
            AnalysisDetails::Word(_) => FileCategory::Word,
            AnalysisDetails::Excel(_) => FileCategory::Excel,
            AnalysisDetails::Csv(_) => FileCategory::Csv,
            AnalysisDetails::Image(_) => FileCategory::Image,
        }
    }
}

/// Format-specific payload; the serde tag doubles as the `file_type` field
/// so which fields exist for which type is checked at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "file_type")]
pub enum AnalysisDetails {
    #[serde(rename = "PDF Document")]
    Pdf(PdfDetails),
    #[serde(rename = "Word Document")]
    Word(WordDetails),
    #[serde(rename = "Excel Spreadsheet")]
    Excel(ExcelDetails),
    #[serde(rename = "CSV File")]
    Csv(TabularAnalysis),
    #[serde(rename = "Image")]
    Image(ImageDetails),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfDetails {
    pub page_count: usize,
    pub word_count: usize,
    pub char_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordDetails {
    pub paragraph_count: usize,
    pub table_count: usize,
    pub word_count: usize,
    pub char_count: usize,
    /// Table rows across all tables, each a sequence of cell strings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcelDetails {
    pub sheet_count: usize,
    pub sheets: IndexMap<String, TabularAnalysis>,
    pub total_rows: usize,
    pub total_columns: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDetails {
    /// Pixel dimensions, width then height.
    pub image_size: (u32, u32),
    pub image_mode: String,
    pub word_count: usize,
    pub char_count: usize,
}

/// Dispatches a file to the analyzer for its declared extension.
pub struct DocumentAnalyzer {
    ocr: Box<dyn OcrEngine>,
}

impl Default for DocumentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentAnalyzer {
    pub fn new() -> Self {
        Self {
            ocr: Box::new(TesseractOcr::default()),
        }
    }

    /// Replace the OCR backend (tests use a stub).
    pub fn with_ocr(ocr: Box<dyn OcrEngine>) -> Self {
        Self { ocr }
    }

    /// Analyze a document, failing with `UnsupportedFormat` before any I/O
    /// when the extension maps to no analyzer.
    pub async fn analyze(&self, path: &Path) -> Result<AnalysisRecord> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match FileCategory::from_extension(&ext) {
            FileCategory::Pdf => pdf::analyze(path),
            FileCategory::Word => word::analyze(path),
            FileCategory::Excel => excel::analyze(path),
            FileCategory::Csv => csv_file::analyze(path),
            FileCategory::Image => image_file::analyze(path, self.ocr.as_ref()).await,
            FileCategory::Unknown => Err(Error::UnsupportedFormat(ext)),
        }
    }
}

/// Wrap an extraction failure with the format that was being processed.
pub(crate) fn extraction_error(category: FileCategory, err: impl fmt::Display) -> Error {
    Error::Analysis {
        category,
        message: err.to_string(),
    }
}
