//! Tabular loading for the server: reads an uploaded file into named
//! columns and works out which of them are numeric.

use serde_json::Value;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use thiserror::Error;

use crate::upload::file_extension;

/// Cell texts read as "no value"
const MISSING_MARKERS: [&str; 8] = ["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Archive(#[from] zip::result::ZipError),

    #[error("No CSV file found in zip archive")]
    NoCsvInArchive,

    #[error("file contains no columns")]
    Empty,

    #[error("{0}")]
    Shape(String),

    #[error("{0}")]
    Unsupported(String),

    #[error("Column '{0}' not found")]
    MissingColumn(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Missing,
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// JSON form used in chart traces; missing cells become `null`
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            CellValue::Text(s) => Value::String(s.clone()),
            CellValue::Missing => Value::Null,
        }
    }

    pub fn display(&self) -> String {
        match self {
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Missing => "nan".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<CellValue>,
    /// Every present value is a number
    pub numeric: bool,
}

impl Column {
    fn infer(name: String, raw: Vec<String>) -> Self {
        let numeric = raw.iter().all(|cell| {
            let cell = cell.trim();
            MISSING_MARKERS.contains(&cell) || cell.parse::<f64>().is_ok()
        });

        let values = raw
            .into_iter()
            .map(|cell| {
                let trimmed = cell.trim();
                if MISSING_MARKERS.contains(&trimmed) {
                    CellValue::Missing
                } else if numeric {
                    trimmed
                        .parse::<f64>()
                        .map(CellValue::Number)
                        .unwrap_or(CellValue::Missing)
                } else {
                    CellValue::Text(cell)
                }
            })
            .collect();

        Column {
            name,
            values,
            numeric,
        }
    }

    pub fn to_json(&self) -> Vec<Value> {
        self.values.iter().map(CellValue::to_json).collect()
    }

    /// Mean of the numeric values, ignoring missing cells
    pub fn mean(&self) -> Option<f64> {
        let (sum, count) = self
            .values
            .iter()
            .filter_map(CellValue::as_f64)
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        (count > 0).then(|| sum / count as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataTable {
    columns: Vec<Column>,
    row_count: usize,
}

impl DataTable {
    /// Builds a table from a header row and text rows.
    ///
    /// Short rows are padded with missing cells, extra trailing cells are
    /// dropped.
    pub fn from_records(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, TableError> {
        if headers.is_empty() {
            return Err(TableError::Empty);
        }

        let row_count = rows.len();
        let mut raw: Vec<Vec<String>> = vec![Vec::with_capacity(row_count); headers.len()];
        for row in rows {
            let mut cells = row.into_iter();
            for column in raw.iter_mut() {
                column.push(cells.next().unwrap_or_default());
            }
        }

        let columns = headers
            .into_iter()
            .zip(raw)
            .map(|(name, values)| Column::infer(name, values))
            .collect();

        Ok(DataTable { columns, row_count })
    }

    /// Reads delimited text with a header row.
    pub fn read_delimited<R: Read>(reader: R, delimiter: u8) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Self::from_records(headers, rows)
    }

    /// Reads text whose fields are separated by runs of whitespace.
    pub fn read_whitespace(text: &str) -> Result<Self, TableError> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());
        let headers: Vec<String> = lines
            .next()
            .ok_or(TableError::Empty)?
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let rows = lines
            .map(|line| line.split_whitespace().map(str::to_string).collect())
            .collect();

        Self::from_records(headers, rows)
    }

    /// Reads either a list of records or an object of columns.
    ///
    /// Column objects may hold arrays or index-keyed objects.
    pub fn read_json(text: &str) -> Result<Self, TableError> {
        let value: Value = serde_json::from_str(text)?;

        match value {
            Value::Array(records) => {
                let mut headers: Vec<String> = Vec::new();
                for record in &records {
                    let Value::Object(fields) = record else {
                        return Err(TableError::Shape(
                            "expected a list of JSON objects".to_string(),
                        ));
                    };
                    for key in fields.keys() {
                        if !headers.contains(key) {
                            headers.push(key.clone());
                        }
                    }
                }
                let rows = records
                    .iter()
                    .map(|record| {
                        headers
                            .iter()
                            .map(|h| json_cell(record.get(h).unwrap_or(&Value::Null)))
                            .collect()
                    })
                    .collect();
                Self::from_records(headers, rows)
            }
            Value::Object(columns) => {
                let mut headers = Vec::with_capacity(columns.len());
                let mut raw: Vec<Vec<String>> = Vec::with_capacity(columns.len());
                for (name, values) in columns {
                    let cells: Vec<String> = match values {
                        Value::Array(items) => items.iter().map(json_cell).collect(),
                        Value::Object(by_index) => by_index.values().map(json_cell).collect(),
                        scalar => vec![json_cell(&scalar)],
                    };
                    headers.push(name);
                    raw.push(cells);
                }

                let row_count = raw.iter().map(Vec::len).max().unwrap_or(0);
                let rows = (0..row_count)
                    .map(|i| {
                        raw.iter()
                            .map(|column| column.get(i).cloned().unwrap_or_default())
                            .collect()
                    })
                    .collect();
                Self::from_records(headers, rows)
            }
            _ => Err(TableError::Shape(
                "expected a JSON array or object".to_string(),
            )),
        }
    }

    /// Reads the first `.csv` member of a ZIP archive, in archive order.
    pub fn read_archive<R: Read + Seek>(reader: R) -> Result<Self, TableError> {
        let mut archive = zip::ZipArchive::new(reader)?;
        for index in 0..archive.len() {
            let entry = archive.by_index(index)?;
            if entry.is_file() && entry.name().ends_with(".csv") {
                return Self::read_delimited(entry, b',');
            }
        }
        Err(TableError::NoCsvInArchive)
    }

    /// Loads a stored upload, picking the reader from its extension.
    ///
    /// # Arguments
    /// * `path` - Path of the stored file
    ///
    /// # Returns
    /// * `Result<DataTable, TableError>` - The parsed table or the reason it could not be read
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = file_extension(&name).unwrap_or_default();

        match extension.as_str() {
            "csv" => Self::read_delimited(File::open(path)?, b','),
            "txt" => {
                let text = std::fs::read_to_string(path)?;
                Self::read_text(&text)
            }
            "log" => {
                let text = std::fs::read_to_string(path)?;
                Self::read_whitespace(&text).or_else(|_| Self::read_delimited(text.as_bytes(), b'\t'))
            }
            "json" => Self::read_json(&std::fs::read_to_string(path)?),
            "zip" => Self::read_archive(File::open(path)?),
            other => Err(TableError::Unsupported(format!(
                "Unsupported file type: {}",
                other
            ))),
        }
    }

    /// Tab separated first, then comma, then whitespace: the first reading
    /// that yields more than one column wins.
    fn read_text(text: &str) -> Result<Self, TableError> {
        for delimiter in [b'\t', b','] {
            if let Ok(table) = Self::read_delimited(text.as_bytes(), delimiter) {
                if table.columns.len() > 1 {
                    return Ok(table);
                }
            }
        }
        Self::read_whitespace(text)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn numeric_column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.numeric)
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn column(&self, name: &str) -> Result<&Column, TableError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }
}

fn json_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn csv_columns_keep_order_and_numeric_subset() {
        let table = DataTable::read_delimited("a,b,c\nx,1,2.5\ny,3,\n".as_bytes(), b',').unwrap();
        assert_eq!(table.column_names(), ["a", "b", "c"]);
        assert_eq!(table.numeric_column_names(), ["b", "c"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("c").unwrap().values[1], CellValue::Missing);
    }

    #[test]
    fn mixed_column_is_text() {
        let table = DataTable::read_delimited("v\n1\nabc\n".as_bytes(), b',').unwrap();
        assert!(table.numeric_column_names().is_empty());
        assert_eq!(
            table.column("v").unwrap().values[0],
            CellValue::Text("1".into())
        );
    }

    #[test]
    fn short_rows_are_padded() {
        let table = DataTable::read_delimited("a,b\n1\n2,3\n".as_bytes(), b',').unwrap();
        assert_eq!(table.column("b").unwrap().values[0], CellValue::Missing);
        assert_eq!(table.column("b").unwrap().values[1], CellValue::Number(3.0));
    }

    #[test]
    fn whitespace_tables_split_on_runs() {
        let table = DataTable::read_whitespace("time   rtt\n0  12.1\n\n1\t13.4\n").unwrap();
        assert_eq!(table.column_names(), ["time", "rtt"]);
        assert_eq!(table.row_count(), 2);
        let mean = table.column("rtt").unwrap().mean().unwrap();
        assert!((mean - 12.75).abs() < 1e-9);
    }

    #[test]
    fn json_records_and_column_objects() {
        let records =
            DataTable::read_json(r#"[{"name": "a", "v": 1}, {"name": "b", "v": null}]"#).unwrap();
        assert_eq!(records.column_names(), ["name", "v"]);
        assert_eq!(records.numeric_column_names(), ["v"]);

        let columns = DataTable::read_json(r#"{"x": [1, 2, 3], "y": {"0": 4, "1": 5}}"#).unwrap();
        assert_eq!(columns.row_count(), 3);
        assert_eq!(columns.column("y").unwrap().values[2], CellValue::Missing);

        assert!(matches!(
            DataTable::read_json("42"),
            Err(TableError::Shape(_))
        ));
    }

    #[test]
    fn missing_column_message_names_it() {
        let table = DataTable::read_delimited("a\n1\n".as_bytes(), b',').unwrap();
        let err = table.column("zz").unwrap_err();
        assert_eq!(err.to_string(), "Column 'zz' not found");
    }

    #[test]
    fn load_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();

        let txt = dir.path().join("data.txt");
        std::fs::File::create(&txt)
            .unwrap()
            .write_all(b"a,b\n1,2\n")
            .unwrap();
        assert_eq!(DataTable::load(&txt).unwrap().column_names(), ["a", "b"]);

        let tsv = dir.path().join("tabs.txt");
        std::fs::write(&tsv, "a\tb\n1\t2\n").unwrap();
        assert_eq!(DataTable::load(&tsv).unwrap().column_names(), ["a", "b"]);

        let zip = dir.path().join("bundle.zip");
        let bundle = zipped(&[("readme.md", "notes"), ("data.csv", "a,b\n1,2\n")]);
        std::fs::write(&zip, bundle).unwrap();
        assert_eq!(DataTable::load(&zip).unwrap().column_names(), ["a", "b"]);

        let broken = dir.path().join("broken.zip");
        std::fs::write(&broken, b"PK").unwrap();
        assert!(matches!(
            DataTable::load(&broken),
            Err(TableError::Archive(_))
        ));
    }

    fn zipped(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, body) in entries {
            writer
                .start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn archive_reads_first_csv_member() {
        let bytes = zipped(&[
            ("readme.md", "notes"),
            ("first.csv", "x,y\n1,2\n3,4\n"),
            ("second.csv", "p\nq\n"),
        ]);
        let table = DataTable::read_archive(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(table.column_names(), ["x", "y"]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn archive_without_csv_is_refused() {
        let bytes = zipped(&[("notes.txt", "a b\n1 2\n"), ("data.CSV.bak", "a\n1\n")]);
        let err = DataTable::read_archive(std::io::Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, TableError::NoCsvInArchive));
        assert_eq!(err.to_string(), "No CSV file found in zip archive");
    }

    #[test]
    fn non_finite_numbers_serialise_as_null() {
        assert_eq!(CellValue::Number(f64::INFINITY).to_json(), Value::Null);
        assert_eq!(CellValue::Number(2.0).to_json(), serde_json::json!(2.0));
    }
}
