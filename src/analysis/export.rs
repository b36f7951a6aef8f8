use std::{
    fmt,
    fs::File,
    io::{
        BufWriter,
        Write,
    },
    path::Path,
};

use chrono::{
    Local,
    NaiveDateTime,
};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::info;

use super::{
    counts::FindingCounts,
    patterns::PatternKey,
    ranking::rank,
};
use crate::core::{
    models::Language,
    TalosError,
};

const UTF8_BOM: &str = "\u{feff}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// JSON for a `.json` extension, CSV otherwise.
    pub fn from_path(path: &Path) -> ExportFormat {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ExportFormat::Json,
            _ => ExportFormat::Csv,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Which table layout a result is exported with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportShape {
    /// `Element, Occurrences`
    Scalar,
    /// `Pattern, Full_Example, Occurrences` plus one column per observed POS.
    Patterns,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Count(u32),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(text) => write!(f, "{}", text),
            Cell::Count(count) => write!(f, "{}", count),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ExportTable {
    pub fn build(counts: &FindingCounts, shape: ExportShape) -> ExportTable {
        match shape {
            ExportShape::Scalar => Self::scalar(counts),
            ExportShape::Patterns => Self::patterns(counts),
        }
    }

    fn scalar(counts: &FindingCounts) -> ExportTable {
        let rows = rank(counts)
            .into_iter()
            .map(|finding| vec![Cell::Text(finding.label), Cell::Count(finding.count)])
            .collect();

        ExportTable { columns: vec!["Element".into(), "Occurrences".into()], rows }
    }

    /// POS columns are named by the tag observed at each position; a tag repeated in
    /// one row gets `_2`, `_3`... Columns appear in first-seen order after the fixed three.
    fn patterns(counts: &FindingCounts) -> ExportTable {
        let mut columns: Vec<String> =
            vec!["Pattern".into(), "Full_Example".into(), "Occurrences".into()];
        let mut keyed_rows: Vec<Vec<(String, Cell)>> = Vec::new();

        for finding in rank(counts) {
            let mut row: Vec<(String, Cell)> = Vec::new();

            match PatternKey::parse(&finding.label) {
                Some(key) => {
                    row.push(("Pattern".into(), Cell::Text(key.pattern())));
                    row.push(("Full_Example".into(), Cell::Text(key.example())));
                    row.push(("Occurrences".into(), Cell::Count(finding.count)));

                    for (tag, word) in key.tags.iter().zip(&key.words) {
                        let mut column = tag.clone();
                        let mut suffix = 1;
                        while row.iter().any(|(name, _)| *name == column) {
                            suffix += 1;
                            column = format!("{}_{}", tag, suffix);
                        }
                        if !columns.contains(&column) {
                            columns.push(column.clone());
                        }
                        row.push((column, Cell::Text(word.clone())));
                    }
                }
                None => {
                    row.push(("Pattern".into(), Cell::Text(finding.label)));
                    row.push(("Full_Example".into(), Cell::Text(String::new())));
                    row.push(("Occurrences".into(), Cell::Count(finding.count)));
                }
            }

            keyed_rows.push(row);
        }

        let rows = keyed_rows
            .into_iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| {
                        row.iter()
                            .find(|(name, _)| name == column)
                            .map(|(_, cell)| cell.clone())
                            .unwrap_or_else(|| Cell::Text(String::new()))
                    })
                    .collect()
            })
            .collect();

        ExportTable { columns, rows }
    }
}

/// Fixed statistics block appended to every export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSummary {
    #[serde(rename = "Total Occurrences")]
    pub total_occurrences: u64,
    #[serde(rename = "Unique Elements")]
    pub unique_elements: usize,
    #[serde(rename = "Average per Element")]
    pub average_per_element: f64,
    #[serde(rename = "Language Detected")]
    pub language: String,
    #[serde(rename = "NLP Engine")]
    pub engine: String,
}

impl ExportSummary {
    pub fn new(counts: &FindingCounts, language: Language, engine: &str) -> ExportSummary {
        let total_occurrences = counts.total();
        let unique_elements = counts.len();
        let average_per_element = if unique_elements == 0 {
            0.0
        } else {
            total_occurrences as f64 / unique_elements as f64
        };

        ExportSummary {
            total_occurrences,
            unique_elements,
            average_per_element,
            language: language.name().to_string(),
            engine: engine.to_string(),
        }
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Total Occurrences", self.total_occurrences.to_string()),
            ("Unique Elements", self.unique_elements.to_string()),
            ("Average per Element", format!("{:.2}", self.average_per_element)),
            ("Language Detected", self.language.clone()),
            ("NLP Engine", self.engine.clone()),
        ]
    }
}

/// A results table together with its summary block, ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportReport {
    #[serde(flatten)]
    pub table: ExportTable,
    pub statistics: ExportSummary,
}

impl ExportReport {
    pub fn new(
        counts: &FindingCounts,
        shape: ExportShape,
        language: Language,
        engine: &str,
    ) -> ExportReport {
        ExportReport {
            table: ExportTable::build(counts, shape),
            statistics: ExportSummary::new(counts, language, engine),
        }
    }

    /// Writes CSV or JSON depending on the path's extension.
    pub fn write(&self, path: &Path) -> Result<(), TalosError> {
        let format = ExportFormat::from_path(path);
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        match format {
            ExportFormat::Csv => self.write_csv(&mut writer)?,
            ExportFormat::Json => serde_json::to_writer_pretty(&mut writer, self)?,
        }
        writer.flush()?;

        info!("Exported {} rows to {}", self.table.rows.len(), path.display());
        Ok(())
    }

    pub fn write_csv<W: Write>(&self, writer: &mut W) -> Result<(), TalosError> {
        write!(writer, "{}", UTF8_BOM)?;

        // The summary block has fewer columns than the table
        {
            let mut records = WriterBuilder::new().flexible(true).from_writer(&mut *writer);
            records.write_record(&self.table.columns)?;
            for row in &self.table.rows {
                records.write_record(row.iter().map(|cell| cell.to_string()))?;
            }
            records.flush()?;
        }

        // An empty record would be written as `""`, so the separator line goes
        // straight to the underlying writer
        writeln!(writer)?;

        let mut records = WriterBuilder::new().flexible(true).from_writer(writer);
        records.write_record(["Statistic", "Value"])?;
        for (statistic, value) in self.statistics.rows() {
            records.write_record([statistic.to_string(), value])?;
        }
        records.flush()?;
        Ok(())
    }
}

/// `talos_{export_name}_{YYYYMMDD_HHMM}.{ext}` in local time.
pub fn default_file_name(export_name: &str, format: ExportFormat) -> String {
    file_name_at(export_name, format, Local::now().naive_local())
}

pub fn file_name_at(export_name: &str, format: ExportFormat, at: NaiveDateTime) -> String {
    format!("talos_{}_{}.{}", export_name, at.format("%Y%m%d_%H%M"), format.extension())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    #[test]
    fn test_scalar_table_is_ranked() {
        let counts: FindingCounts = ["fig", "apple", "apple"].into_iter().collect();
        let table = ExportTable::build(&counts, ExportShape::Scalar);
        assert_eq!(table.columns, vec!["Element", "Occurrences"]);
        assert_eq!(table.rows[0], vec![text("apple"), Cell::Count(2)]);
        assert_eq!(table.rows[1], vec![text("fig"), Cell::Count(1)]);
    }

    #[test]
    fn test_pattern_table_columns() {
        let mut counts = FindingCounts::new();
        counts.add("[ADJ_NOUN]: red car");
        counts.add_n("[ADJ_ADJ_NOUN]: big red car", 2);
        counts.add("garbage");

        let table = ExportTable::build(&counts, ExportShape::Patterns);
        assert_eq!(
            table.columns,
            vec!["Pattern", "Full_Example", "Occurrences", "ADJ", "ADJ_2", "NOUN"]
        );
        assert_eq!(
            table.rows[0],
            vec![
                text("ADJ_ADJ_NOUN"),
                text("big red car"),
                Cell::Count(2),
                text("big"),
                text("red"),
                text("car"),
            ]
        );
        assert_eq!(
            table.rows[1],
            vec![text("ADJ_NOUN"), text("red car"), Cell::Count(1), text("red"), text(""), text("car")]
        );
        assert_eq!(table.rows[2][0], text("garbage"));
        assert_eq!(table.rows[2][1], text(""));
    }

    #[test]
    fn test_summary() {
        let counts: FindingCounts = ["a", "a", "a", "b"].into_iter().collect();
        let summary = ExportSummary::new(&counts, Language::AncientGreek, "Stanza");
        assert_eq!(summary.total_occurrences, 4);
        assert_eq!(summary.unique_elements, 2);
        assert!((summary.average_per_element - 2.0).abs() < f64::EPSILON);
        assert_eq!(summary.language, "Ancient Greek");

        let empty = ExportSummary::new(&FindingCounts::new(), Language::English, "spaCy");
        assert_eq!(empty.average_per_element, 0.0);
    }

    #[test]
    fn test_csv_output() {
        let counts: FindingCounts = ["hello, world", "say \"hi\"", "hello, world"].into_iter().collect();
        let report = ExportReport::new(&counts, ExportShape::Scalar, Language::English, "spaCy");

        let mut buffer = Vec::new();
        report.write_csv(&mut buffer).unwrap();
        let csv = String::from_utf8(buffer).unwrap();

        assert!(csv.starts_with('\u{feff}'));
        let lines: Vec<&str> = csv.trim_start_matches('\u{feff}').lines().collect();
        assert_eq!(lines[0], "Element,Occurrences");
        assert_eq!(lines[1], "\"hello, world\",2");
        assert_eq!(lines[2], "\"say \"\"hi\"\"\",1");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "Statistic,Value");
        assert_eq!(lines[5], "Total Occurrences,3");
        assert_eq!(lines[7], "Average per Element,1.50");
        assert_eq!(lines[9], "NLP Engine,spaCy");
    }

    #[test]
    fn test_pattern_csv_keeps_every_column() {
        let counts: FindingCounts =
            ["[ADJ_NOUN]: big house", "[ADJ_NOUN]: red car", "[ADJ_NOUN]: big house"]
                .into_iter()
                .collect();
        let report = ExportReport::new(&counts, ExportShape::Patterns, Language::English, "spaCy");

        let mut buffer = Vec::new();
        report.write_csv(&mut buffer).unwrap();
        let csv = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = csv.trim_start_matches('\u{feff}').lines().collect();

        let width = lines[0].split(',').count();
        assert!(width > 2);
        assert_eq!(lines[1].split(',').count(), width);
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "Statistic,Value");
        assert_eq!(lines[5], "Total Occurrences,3");
    }

    #[test]
    fn test_json_file_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        let counts: FindingCounts = ["car", "car", "house"].into_iter().collect();
        let report = ExportReport::new(&counts, ExportShape::Scalar, Language::French, "spaCy");
        report.write(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["columns"][0], "Element");
        assert_eq!(value["rows"][0][0], "car");
        assert_eq!(value["rows"][0][1], 2);
        assert_eq!(value["statistics"]["Unique Elements"], 2);
        assert_eq!(value["statistics"]["Language Detected"], "French");
    }

    #[test]
    fn test_file_names() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap().and_hms_opt(14, 5, 0).unwrap();
        assert_eq!(file_name_at("nouns", ExportFormat::Csv, at), "talos_nouns_20240309_1405.csv");
        assert_eq!(ExportFormat::from_path(Path::new("out.JSON")), ExportFormat::Json);
        assert_eq!(ExportFormat::from_path(Path::new("out.txt")), ExportFormat::Csv);
    }
}
