//! File parsing for uploads: CSV and JSON become tabular data that feeds
//! the preview table and the chat context; anything else imports as a
//! metadata-only record.

use chrono::Local;
use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;

use crate::library::{Category, Document, FileKind, Visibility};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("JSON data must be an array of objects")]
    JsonShape,
}

/// Parsed rows with their column order preserved.
#[derive(Debug, Clone, Default)]
pub struct TabularData {
    pub columns: Vec<String>,
    pub records: Vec<Map<String, Value>>,
}

impl TabularData {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// A JSON snippet of up to `limit` records, used as LLM context.
    pub fn sample_json(&self, limit: usize) -> String {
        let sample: Vec<&Map<String, Value>> = self.records.iter().take(limit).collect();
        serde_json::to_string(&sample).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn cell_text(record: &Map<String, Value>, column: &str) -> String {
        match record.get(column) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

pub fn parse_csv(content: &str) -> Result<TabularData, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut row = Map::new();
        for (i, column) in columns.iter().enumerate() {
            let raw = record.get(i).unwrap_or("");
            // keep numbers typed so the chat context and sort heuristics
            // see them as numbers
            let value = match raw.parse::<f64>() {
                Ok(n) if !raw.is_empty() => {
                    serde_json::Number::from_f64(n).map(Value::Number).unwrap_or_else(|| Value::String(raw.to_string()))
                }
                _ => Value::String(raw.to_string()),
            };
            row.insert(column.clone(), value);
        }
        records.push(row);
    }

    Ok(TabularData { columns, records })
}

pub fn parse_json(content: &str) -> Result<TabularData, ImportError> {
    let value: Value = serde_json::from_str(content)?;
    let Value::Array(items) = value else {
        return Err(ImportError::JsonShape);
    };

    let mut columns: Vec<String> = Vec::new();
    let mut records = Vec::new();
    for item in items {
        let Value::Object(map) = item else {
            return Err(ImportError::JsonShape);
        };
        for key in map.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        records.push(map);
    }

    Ok(TabularData { columns, records })
}

/// Parse a file's contents into tabular data if its kind supports it.
pub fn load_tabular(path: &Path) -> Result<Option<TabularData>, ImportError> {
    let kind = kind_of(path);
    if !kind.is_tabular() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let data = match kind {
        FileKind::Csv => parse_csv(&content)?,
        FileKind::Json => parse_json(&content)?,
        _ => unreachable!("is_tabular covers csv and json only"),
    };
    Ok(Some(data))
}

pub fn kind_of(path: &Path) -> FileKind {
    path.extension()
        .and_then(|e| e.to_str())
        .map(FileKind::from_extension)
        .unwrap_or(FileKind::Other)
}

/// Build a library record for a file on disk, parsing its contents when
/// the kind is tabular.
pub fn import_document(
    path: &Path,
    title: &str,
    category: Category,
    visibility: Visibility,
) -> Result<(Document, Option<TabularData>), ImportError> {
    let metadata = std::fs::metadata(path).map_err(|source| ImportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let data = load_tabular(path)?;

    let document = Document {
        title: title.to_string(),
        size_bytes: metadata.len(),
        kind: kind_of(path),
        modified: Local::now().date_naive(),
        category,
        uploaded_by: "You".to_string(),
        visibility,
    };
    Ok((document, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn csv_parses_headers_and_rows() {
        let data = parse_csv("name,amount\nwidget,3\ngadget,5\n").unwrap();
        assert_eq!(data.columns, vec!["name", "amount"]);
        assert_eq!(data.len(), 2);
        assert_eq!(TabularData::cell_text(&data.records[0], "name"), "widget");
        // numeric cells stay numbers
        assert_eq!(data.records[0]["amount"], serde_json::json!(3.0));
    }

    #[test]
    fn csv_tolerates_short_rows() {
        let data = parse_csv("a,b\n1\n").unwrap();
        assert_eq!(TabularData::cell_text(&data.records[0], "b"), "");
    }

    #[test]
    fn json_array_of_objects_parses() {
        let data = parse_json(r#"[{"x": 1, "y": "two"}, {"x": 2, "z": true}]"#).unwrap();
        assert_eq!(data.columns, vec!["x", "y", "z"]);
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn json_scalar_is_rejected() {
        assert!(matches!(parse_json("42"), Err(ImportError::JsonShape)));
        assert!(matches!(parse_json(r#"["a", "b"]"#), Err(ImportError::JsonShape)));
    }

    #[test]
    fn sample_json_caps_record_count() {
        let data = parse_csv("n\n1\n2\n3\n").unwrap();
        let sample = data.sample_json(2);
        let parsed: Vec<Map<String, Value>> = serde_json::from_str(&sample).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn import_document_fills_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "id,total").unwrap();
        writeln!(file, "1,9.50").unwrap();

        let (doc, data) =
            import_document(&path, "Orders", Category::Pending, Visibility::Private).unwrap();
        assert_eq!(doc.title, "Orders");
        assert_eq!(doc.kind, FileKind::Csv);
        assert!(doc.size_bytes > 0);
        assert_eq!(data.unwrap().len(), 1);
    }

    #[test]
    fn non_tabular_files_import_metadata_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let (doc, data) =
            import_document(&path, "Notes", Category::General, Visibility::Shared).unwrap();
        assert_eq!(doc.kind, FileKind::Pdf);
        assert!(data.is_none());
    }
}
