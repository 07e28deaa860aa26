use super::tabular::{self, Table, TabularAnalysis};
use super::{extraction_error, AnalysisDetails, AnalysisRecord, AnalysisType, ExcelDetails, FileCategory};
use crate::error::Result;
use calamine::{open_workbook_auto, Data, Reader};
use indexmap::IndexMap;
use std::path::Path;

/// Run every sheet through the tabular routine, appending a formatted block
/// per sheet to the shared text stream and accumulating row/column totals.
pub fn analyze(path: &Path) -> Result<AnalysisRecord> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| extraction_error(FileCategory::Excel, e))?;
    let sheet_names = workbook.sheet_names().to_owned();

    let mut sheets: IndexMap<String, TabularAnalysis> = IndexMap::new();
    let mut text_content = Vec::new();
    let mut total_rows = 0usize;
    let mut total_columns = 0usize;

    for name in &sheet_names {
        let range = workbook
            .worksheet_range(name)
            .map_err(|e| extraction_error(FileCategory::Excel, e))?;
        let table = range_to_table(&range);
        let analysis = tabular::analyze_table(&table);

        text_content.push(sheet_block(name, &table, &analysis));
        total_rows += analysis.rows;
        total_columns += analysis.columns;
        sheets.insert(name.clone(), analysis);
    }

    Ok(AnalysisRecord {
        analysis_type: AnalysisType::DataAnalysis,
        summary: format!(
            "Excel file with {} sheets, {} total rows",
            sheets.len(),
            total_rows
        ),
        text_content: text_content.join("\n"),
        details: AnalysisDetails::Excel(ExcelDetails {
            sheet_count: sheets.len(),
            sheets,
            total_rows,
            total_columns,
        }),
    })
}

/// First row is the header; remaining rows become string cells.
fn range_to_table(range: &calamine::Range<Data>) -> Table {
    let mut rows_iter = range.rows();
    let columns: Vec<String> = rows_iter
        .next()
        .map(|header| header.iter().map(cell_to_string).collect())
        .unwrap_or_default();
    let rows: Vec<Vec<String>> = rows_iter
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    Table::new(columns, rows)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => tabular::format_number(*f),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn sheet_block(name: &str, table: &Table, analysis: &TabularAnalysis) -> String {
    let mut block = Vec::new();
    block.push(format!("\n--- Sheet: {} ---", name));
    block.push(format!(
        "Rows: {}, Columns: {}",
        analysis.rows, analysis.columns
    ));
    block.push(format!("Columns: {}", analysis.column_names.join(", ")));
    if !table.rows.is_empty() {
        block.push("Sample data:".to_string());
        block.push(tabular::render_preview(table, 5));
    }
    block.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_rendering_drops_integral_fraction() {
        assert_eq!(cell_to_string(&Data::Float(1200.0)), "1200");
        assert_eq!(cell_to_string(&Data::Float(12.5)), "12.50");
        assert_eq!(cell_to_string(&Data::Int(7)), "7");
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::String("Rent".into())), "Rent");
    }

    #[test]
    fn test_sheet_block_skips_preview_when_empty() {
        let table = Table::new(vec!["Amount".into()], vec![]);
        let analysis = tabular::analyze_table(&table);
        let block = sheet_block("Q1", &table, &analysis);
        assert!(block.contains("--- Sheet: Q1 ---"));
        assert!(block.contains("Rows: 0, Columns: 1"));
        assert!(!block.contains("Sample data:"));
    }

    #[test]
    fn test_sheet_block_with_rows() {
        let table = Table::new(
            vec!["Item".into(), "Total".into()],
            vec![vec!["rent".into(), "1200".into()]],
        );
        let analysis = tabular::analyze_table(&table);
        let block = sheet_block("Expenses", &table, &analysis);
        assert!(block.contains("Sample data:"));
        assert!(block.contains("| Item | Total |"));
        assert!(block.contains("| rent | 1200 |"));
    }

    #[test]
    fn test_missing_file_is_an_analysis_error() {
        let err = analyze(Path::new("/nonexistent/book.xlsx")).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Analysis {
                category: FileCategory::Excel,
                ..
            }
        ));
    }
}
