use super::{extraction_error, AnalysisDetails, AnalysisRecord, AnalysisType, FileCategory, WordDetails};
use crate::error::Result;
use regex::Regex;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

// A .docx is a zip container; the body lives in word/document.xml. Paragraph
// and table runs are pulled straight from the XML, which avoids a dedicated
// OOXML dependency for the little structure needed here.

fn paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<w:p(?: [^>]*)?>.*?</w:p>|<w:p/>").expect("valid regex"))
}

fn text_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<w:t(?: [^>]*)?>([^<]*)</w:t>").expect("valid regex"))
}

fn table_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<w:tbl(?: [^>]*)?>.*?</w:tbl>").expect("valid regex"))
}

fn row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<w:tr(?: [^>]*)?>.*?</w:tr>").expect("valid regex"))
}

fn cell_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<w:tc(?: [^>]*)?>.*?</w:tc>").expect("valid regex"))
}

/// Concatenate non-blank paragraph texts in document order, then walk every
/// table, flattening each row's cells joined by `" | "` into the same text
/// stream while also capturing the rows structurally.
pub fn analyze(path: &Path) -> Result<AnalysisRecord> {
    let file = File::open(path).map_err(|e| extraction_error(FileCategory::Word, e))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| extraction_error(FileCategory::Word, e))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| extraction_error(FileCategory::Word, e))?
        .read_to_string(&mut xml)
        .map_err(|e| extraction_error(FileCategory::Word, e))?;

    // Tables are lifted out first so their paragraphs are not double-counted
    // as body paragraphs.
    let mut table_rows: Vec<Vec<String>> = Vec::new();
    let mut table_count = 0usize;
    for table in table_re().find_iter(&xml) {
        table_count += 1;
        for row in row_re().find_iter(table.as_str()) {
            let cells: Vec<String> = cell_re()
                .find_iter(row.as_str())
                .map(|cell| runs_text(cell.as_str()))
                .collect();
            table_rows.push(cells);
        }
    }
    let body = table_re().replace_all(&xml, "");

    let mut paragraph_count = 0usize;
    let mut text_parts: Vec<String> = Vec::new();
    for paragraph in paragraph_re().find_iter(&body) {
        paragraph_count += 1;
        let text = runs_text(paragraph.as_str());
        if !text.is_empty() {
            text_parts.push(text);
        }
    }
    for row in &table_rows {
        text_parts.push(row.join(" | "));
    }

    let full_text = text_parts.join("\n");
    let word_count = full_text.split_whitespace().count();
    let char_count = full_text.chars().count();

    Ok(AnalysisRecord {
        analysis_type: AnalysisType::TextExtraction,
        summary: format!(
            "Word document with {} paragraphs and {} tables",
            paragraph_count, table_count
        ),
        text_content: full_text,
        details: AnalysisDetails::Word(WordDetails {
            paragraph_count,
            table_count,
            word_count,
            char_count,
            tables: table_rows,
        }),
    })
}

/// Concatenated `<w:t>` run texts within a fragment, entity-unescaped and trimmed.
fn runs_text(fragment: &str) -> String {
    let mut out = String::new();
    for run in text_run_re().captures_iter(fragment) {
        out.push_str(&unescape_xml(&run[1]));
    }
    out.trim().to_string()
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn write_docx(path: &Path, document_xml: &str) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("word/document.xml", FileOptions::default())
            .unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        writer.finish().unwrap();
    }

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<w:document><w:body>
<w:p><w:r><w:t>Monthly budget overview</w:t></w:r></w:p>
<w:p/>
<w:p><w:r><w:t>Rent &amp; utilities due</w:t></w:r></w:p>
<w:tbl>
<w:tr><w:tc><w:p><w:r><w:t>Category</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Amount</w:t></w:r></w:p></w:tc></w:tr>
<w:tr><w:tc><w:p><w:r><w:t>Rent</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>1200</w:t></w:r></w:p></w:tc></w:tr>
</w:tbl>
</w:body></w:document>"#;

    #[test]
    fn test_paragraphs_and_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("budget.docx");
        write_docx(&path, SAMPLE);

        let record = analyze(&path).unwrap();
        let details = match &record.details {
            AnalysisDetails::Word(d) => d,
            other => panic!("expected word details, got {:?}", other),
        };
        assert_eq!(details.paragraph_count, 3); // blank paragraph counts too
        assert_eq!(details.table_count, 1);
        assert_eq!(
            details.tables,
            vec![
                vec!["Category".to_string(), "Amount".to_string()],
                vec!["Rent".to_string(), "1200".to_string()],
            ]
        );
        assert!(record.text_content.contains("Monthly budget overview"));
        assert!(record.text_content.contains("Rent & utilities due"));
        assert!(record.text_content.contains("Category | Amount"));
        assert_eq!(
            record.summary,
            "Word document with 3 paragraphs and 1 tables"
        );
    }

    #[test]
    fn test_not_a_zip_is_an_analysis_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.doc");
        std::fs::write(&path, b"\xd0\xcf\x11\xe0 legacy binary").unwrap();
        let err = analyze(&path).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Analysis {
                category: FileCategory::Word,
                ..
            }
        ));
    }
}
