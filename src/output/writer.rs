use super::OutputFormat;
use crate::cache::CellValue;
use crate::error::OutputError;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const WRITER_BUFFER_SIZE: usize = 256 * 1024;

/// A row keyed by field name, serialized as an object in field order.
struct Record<'a> {
    names: &'a [String],
    values: &'a [CellValue],
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.names.len()))?;
        for (name, value) in self.names.iter().zip(self.values) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

enum Sink {
    Csv(csv::Writer<BufWriter<File>>),
    Json {
        writer: BufWriter<File>,
        first: bool,
    },
    JsonLines(BufWriter<File>),
}

/// Streams the rows of one day file in the selected format.
pub struct RowWriter {
    sink: Sink,
    path: PathBuf,
    names: Vec<String>,
    rows: u64,
}

impl RowWriter {
    /// Create `path` and write the format's preamble (CSV header, JSON `[`).
    pub fn create(path: &Path, format: OutputFormat, names: Vec<String>) -> Result<Self, OutputError> {
        let io_err = |source| OutputError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::with_capacity(WRITER_BUFFER_SIZE, file);

        let sink = match format {
            OutputFormat::Csv => {
                let mut csv = csv::WriterBuilder::new().from_writer(writer);
                csv.write_record(&names)?;
                Sink::Csv(csv)
            }
            OutputFormat::Json => {
                writer.write_all(b"[").map_err(io_err)?;
                Sink::Json {
                    writer,
                    first: true,
                }
            }
            OutputFormat::JsonLines => Sink::JsonLines(writer),
        };

        Ok(Self {
            sink,
            path: path.to_path_buf(),
            names,
            rows: 0,
        })
    }

    pub fn write_row(&mut self, values: &[CellValue]) -> Result<(), OutputError> {
        let io_err = |source| OutputError::Io {
            path: self.path.clone(),
            source,
        };
        let record = Record {
            names: &self.names,
            values,
        };

        match &mut self.sink {
            Sink::Csv(csv) => {
                csv.write_record(values.iter().map(|v| v.to_string()))?;
            }
            Sink::Json { writer, first } => {
                let sep: &[u8] = if *first { b"\n" } else { b",\n" };
                writer.write_all(sep).map_err(io_err)?;
                serde_json::to_writer(&mut *writer, &record)?;
                *first = false;
            }
            Sink::JsonLines(writer) => {
                serde_json::to_writer(&mut *writer, &record)?;
                writer.write_all(b"\n").map_err(io_err)?;
            }
        }

        self.rows += 1;
        Ok(())
    }

    /// Write the format's trailer, flush and return the number of rows written.
    pub fn finish(self) -> Result<u64, OutputError> {
        let io_err = |source| OutputError::Io {
            path: self.path.clone(),
            source,
        };

        match self.sink {
            Sink::Csv(mut csv) => csv.flush().map_err(io_err)?,
            Sink::Json { mut writer, .. } => {
                writer.write_all(b"\n]\n").map_err(io_err)?;
                writer.flush().map_err(io_err)?;
            }
            Sink::JsonLines(mut writer) => writer.flush().map_err(io_err)?,
        }

        Ok(self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names() -> Vec<String> {
        vec!["id".to_string(), "new-label".to_string()]
    }

    fn rows() -> Vec<Vec<CellValue>> {
        vec![
            vec![CellValue::Int(1), CellValue::from("a, b")],
            vec![CellValue::Float(2.5), CellValue::Null],
        ]
    }

    fn write(format: OutputFormat) -> (String, u64) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out");
        let mut writer = RowWriter::create(&path, format, names()).unwrap();
        for row in rows() {
            writer.write_row(&row).unwrap();
        }
        let count = writer.finish().unwrap();
        (fs::read_to_string(&path).unwrap(), count)
    }

    #[test]
    fn test_csv_quotes_and_empty_nulls() {
        let (content, count) = write(OutputFormat::Csv);
        assert_eq!(count, 2);
        assert_eq!(content, "id,new-label\n1,\"a, b\"\n2.5,\n");
    }

    #[test]
    fn test_json_array_keeps_types_and_order() {
        let (content, count) = write(OutputFormat::Json);
        assert_eq!(count, 2);

        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        let rows = parsed.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], serde_json::json!(1));
        assert_eq!(rows[0]["new-label"], serde_json::json!("a, b"));
        assert_eq!(rows[1]["id"], serde_json::json!(2.5));
        assert!(rows[1]["new-label"].is_null());

        let first_line = content.lines().nth(1).unwrap();
        assert!(first_line.find("\"id\"").unwrap() < first_line.find("\"new-label\"").unwrap());
    }

    #[test]
    fn test_empty_json_is_valid_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.json");
        let writer = RowWriter::create(&path, OutputFormat::Json, names()).unwrap();
        assert_eq!(writer.finish().unwrap(), 0);

        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, serde_json::json!([]));
    }

    #[test]
    fn test_jsonl_one_object_per_line() {
        let (content, count) = write(OutputFormat::JsonLines);
        assert_eq!(count, 2);
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"id":1,"new-label":"a, b"}"#);
        assert_eq!(lines[1], r#"{"id":2.5,"new-label":null}"#);
    }
}
