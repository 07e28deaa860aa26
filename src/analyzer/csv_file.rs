use super::tabular::{self, Table};
use super::{extraction_error, AnalysisDetails, AnalysisRecord, AnalysisType, FileCategory};
use crate::error::Result;
use std::path::Path;

/// Parse the file as a single table, profile it, and build the text stream:
/// header, counts, column names, a 10-row preview, and a descriptive
/// statistics table when numeric columns exist.
pub fn analyze(path: &Path) -> Result<AnalysisRecord> {
    let table = read_table(path)?;
    let analysis = tabular::analyze_table(&table);

    let mut text_content = Vec::new();
    text_content.push("CSV File Analysis".to_string());
    text_content.push(format!(
        "Rows: {}, Columns: {}",
        analysis.rows, analysis.columns
    ));
    text_content.push(format!("Columns: {}", analysis.column_names.join(", ")));

    if !table.rows.is_empty() {
        text_content.push("\nSample data:".to_string());
        text_content.push(tabular::render_preview(&table, 10));
    }

    if analysis.numeric_statistics.is_some() {
        text_content.push("\nNumeric columns summary:".to_string());
        text_content.push(tabular::render_statistics(&analysis));
    }

    Ok(AnalysisRecord {
        analysis_type: AnalysisType::DataAnalysis,
        summary: format!(
            "CSV file with {} rows and {} columns",
            analysis.rows, analysis.columns
        ),
        text_content: text_content.join("\n"),
        details: AnalysisDetails::Csv(analysis),
    })
}

fn read_table(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| extraction_error(FileCategory::Csv, e))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| extraction_error(FileCategory::Csv, e))?
        .iter()
        .map(String::from)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| extraction_error(FileCategory::Csv, e))?;
        rows.push(record.iter().map(String::from).collect());
    }

    Ok(Table::new(columns, rows))
}
