//! Shared column-level profiling for spreadsheet-like data (Excel sheets,
//! CSV). Cells are raw strings; an empty string counts as null.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Column names whose lowercase form flags a likely financial column.
pub const FINANCIAL_COLUMN_KEYWORDS: &[&str] = &[
    "amount", "price", "cost", "fee", "balance", "total", "sum", "revenue", "income", "expense",
];

/// In-memory table handed to the analysis routine.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Cell at (row, col); ragged rows read as empty.
    fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    #[serde(rename = "25%")]
    pub p25: f64,
    #[serde(rename = "50%")]
    pub p50: f64,
    #[serde(rename = "75%")]
    pub p75: f64,
    pub max: f64,
}

/// Column-level profile of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularAnalysis {
    pub rows: usize,
    pub columns: usize,
    pub column_names: Vec<String>,
    pub data_types: IndexMap<String, String>,
    pub null_counts: IndexMap<String, usize>,
    pub numeric_columns: Vec<String>,
    pub text_columns: Vec<String>,
    pub date_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_statistics: Option<IndexMap<String, ColumnStats>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potential_financial_columns: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Numeric,
    Date,
    Text,
}

impl ColumnType {
    fn name(self) -> &'static str {
        match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Date => "date",
            ColumnType::Text => "text",
        }
    }
}

/// Profile a table: counts, per-column types and nulls, type partitions,
/// descriptive statistics for numeric columns, and the financial-keyword
/// column subsequence.
pub fn analyze_table(table: &Table) -> TabularAnalysis {
    let row_count = table.rows.len();
    let col_count = table.columns.len();

    let mut data_types = IndexMap::new();
    let mut null_counts = IndexMap::new();
    let mut numeric_columns = Vec::new();
    let mut text_columns = Vec::new();
    let mut date_columns = Vec::new();
    let mut statistics: IndexMap<String, ColumnStats> = IndexMap::new();

    for (idx, name) in table.columns.iter().enumerate() {
        let mut values = Vec::new();
        let mut nulls = 0usize;
        for row in 0..row_count {
            let cell = table.cell(row, idx).trim();
            if cell.is_empty() {
                nulls += 1;
            } else {
                values.push(cell.to_string());
            }
        }

        let column_type = infer_type(&values);
        data_types.insert(name.clone(), column_type.name().to_string());
        null_counts.insert(name.clone(), nulls);
        match column_type {
            ColumnType::Numeric => {
                numeric_columns.push(name.clone());
                let numbers: Vec<f64> = values.iter().filter_map(|v| parse_number(v)).collect();
                if let Some(stats) = describe(&numbers) {
                    statistics.insert(name.clone(), stats);
                }
            }
            ColumnType::Date => date_columns.push(name.clone()),
            ColumnType::Text => text_columns.push(name.clone()),
        }
    }

    let financial: Vec<String> = table
        .columns
        .iter()
        .filter(|name| {
            let lower = name.to_lowercase();
            FINANCIAL_COLUMN_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .cloned()
        .collect();

    TabularAnalysis {
        rows: row_count,
        columns: col_count,
        column_names: table.columns.clone(),
        data_types,
        null_counts,
        numeric_columns,
        text_columns,
        date_columns,
        numeric_statistics: if statistics.is_empty() {
            None
        } else {
            Some(statistics)
        },
        potential_financial_columns: if financial.is_empty() {
            None
        } else {
            Some(financial)
        },
    }
}

/// A column is numeric or date only if every non-null cell parses as one.
/// Columns with no non-null cells type as text.
fn infer_type(values: &[String]) -> ColumnType {
    if values.is_empty() {
        return ColumnType::Text;
    }
    if values.iter().all(|v| parse_number(v).is_some()) {
        return ColumnType::Numeric;
    }
    if values.iter().all(|v| parse_date(v)) {
        return ColumnType::Date;
    }
    ColumnType::Text
}

fn parse_number(value: &str) -> Option<f64> {
    let parsed: f64 = value.trim().parse().ok()?;
    parsed.is_finite().then_some(parsed)
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y"];

fn parse_date(value: &str) -> bool {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(value, fmt).is_ok())
}

/// Descriptive statistics matching pandas `describe`: sample standard
/// deviation (0.0 for a single value) and linearly interpolated percentiles.
fn describe(values: &[f64]) -> Option<ColumnStats> {
    if values.is_empty() {
        return None;
    }
    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let std = if count < 2 {
        0.0
    } else {
        let variance =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count as f64 - 1.0);
        variance.sqrt()
    };

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    Some(ColumnStats {
        count,
        mean,
        std,
        min: sorted[0],
        p25: percentile(&sorted, 0.25),
        p50: percentile(&sorted, 0.50),
        p75: percentile(&sorted, 0.75),
        max: sorted[count - 1],
    })
}

fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
    }
}

/// Render the first `limit` rows as a pipe table.
pub fn render_preview(table: &Table, limit: usize) -> String {
    let mut lines = Vec::new();
    lines.push(format!("| {} |", table.columns.join(" | ")));
    lines.push(format!(
        "|{}|",
        table.columns.iter().map(|_| " --- ").collect::<Vec<_>>().join("|")
    ));
    for row in 0..table.rows.len().min(limit) {
        let cells: Vec<&str> = (0..table.columns.len())
            .map(|col| table.cell(row, col))
            .collect();
        lines.push(format!("| {} |", cells.join(" | ")));
    }
    lines.join("\n")
}

/// Render a describe-style pipe table for the numeric columns.
pub fn render_statistics(analysis: &TabularAnalysis) -> String {
    let stats = match &analysis.numeric_statistics {
        Some(stats) if !stats.is_empty() => stats,
        _ => return String::new(),
    };

    let names: Vec<&String> = stats.keys().collect();
    let mut lines = Vec::new();
    lines.push(format!(
        "|  | {} |",
        names
            .iter()
            .map(|n| n.as_str())
            .collect::<Vec<_>>()
            .join(" | ")
    ));
    lines.push(format!(
        "|{}|",
        (0..=names.len()).map(|_| " --- ").collect::<Vec<_>>().join("|")
    ));

    let rows: [(&str, fn(&ColumnStats) -> String); 8] = [
        ("count", |s| s.count.to_string()),
        ("mean", |s| format_number(s.mean)),
        ("std", |s| format_number(s.std)),
        ("min", |s| format_number(s.min)),
        ("25%", |s| format_number(s.p25)),
        ("50%", |s| format_number(s.p50)),
        ("75%", |s| format_number(s.p75)),
        ("max", |s| format_number(s.max)),
    ];
    for (label, project) in rows {
        let cells: Vec<String> = stats.values().map(project).collect();
        lines.push(format!("| {} | {} |", label, cells.join(" | ")));
    }
    lines.join("\n")
}

/// Integral values render without a fractional part, everything else to two
/// decimal places.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        Table::new(
            vec!["Date".into(), "Amount".into(), "Category".into()],
            vec![
                vec!["2024-01-01".into(), "100".into(), "rent".into()],
                vec!["2024-01-02".into(), "200".into(), "food".into()],
                vec!["2024-01-03".into(), "150".into(), "".into()],
            ],
        )
    }

    #[test]
    fn test_numeric_and_financial_classification() {
        let analysis = analyze_table(&sample_table());
        assert_eq!(analysis.rows, 3);
        assert_eq!(analysis.columns, 3);
        assert_eq!(analysis.numeric_columns, vec!["Amount"]);
        assert_eq!(analysis.date_columns, vec!["Date"]);
        assert_eq!(analysis.text_columns, vec!["Category"]);
        assert_eq!(
            analysis.potential_financial_columns,
            Some(vec!["Amount".to_string()])
        );
        assert_eq!(analysis.null_counts["Category"], 1);
        assert_eq!(analysis.data_types["Amount"], "numeric");
    }

    #[test]
    fn test_statistics_match_describe() {
        let analysis = analyze_table(&sample_table());
        let stats = &analysis.numeric_statistics.unwrap()["Amount"];
        assert_eq!(stats.count, 3);
        assert!((stats.mean - 150.0).abs() < 1e-9);
        assert!((stats.std - 50.0).abs() < 1e-9);
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.p25, 125.0);
        assert_eq!(stats.p50, 150.0);
        assert_eq!(stats.p75, 175.0);
        assert_eq!(stats.max, 200.0);
    }

    #[test]
    fn test_empty_table_has_no_statistics() {
        let table = Table::new(vec!["Amount".into()], vec![]);
        let analysis = analyze_table(&table);
        assert_eq!(analysis.rows, 0);
        assert!(analysis.numeric_statistics.is_none());
        // no values, so the column types as text rather than numeric
        assert_eq!(analysis.text_columns, vec!["Amount"]);
    }

    #[test]
    fn test_render_preview_limits_rows() {
        let preview = render_preview(&sample_table(), 2);
        let lines: Vec<&str> = preview.lines().collect();
        assert_eq!(lines.len(), 4); // header, separator, two rows
        assert_eq!(lines[0], "| Date | Amount | Category |");
        assert!(lines[2].contains("2024-01-01"));
    }

    #[test]
    fn test_ragged_rows_read_as_null() {
        let table = Table::new(
            vec!["A".into(), "B".into()],
            vec![vec!["1".into()], vec!["2".into(), "3".into()]],
        );
        let analysis = analyze_table(&table);
        assert_eq!(analysis.null_counts["B"], 1);
        assert_eq!(analysis.numeric_columns, vec!["A", "B"]);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(150.0), "150");
        assert_eq!(format_number(33.333), "33.33");
    }
}
