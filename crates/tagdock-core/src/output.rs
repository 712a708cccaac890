//! JSON / JSON Lines output for sessions and caption results.

use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::caption::CaptionOutcome;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON value
    Json,
    /// One JSON object per line
    JsonLines,
}

/// Serializes items to a writer in the chosen format.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// `pretty` only affects [`OutputFormat::Json`]; JSON Lines is always compact.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    /// Write one item followed by a newline.
    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        self.write_value(item)?;
        self.items_written += 1;
        Ok(())
    }

    /// Write a batch: a single array for JSON, one line per item for JSON Lines.
    pub fn write_all<T: Serialize>(&mut self, items: &[T]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                self.write_value(items)?;
                self.items_written += items.len();
            }
            OutputFormat::JsonLines => {
                for item in items {
                    self.write(item)?;
                }
            }
        }
        Ok(())
    }

    pub fn items_written(&self) -> usize {
        self.items_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn write_value<T: Serialize + ?Sized>(&mut self, value: &T) -> io::Result<()> {
        if self.pretty && self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.writer, value).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, value).map_err(io::Error::other)?;
        }
        writeln!(self.writer)
    }
}

/// One line of `tagdock caption` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptionRecord {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&CaptionOutcome> for CaptionRecord {
    fn from(outcome: &CaptionOutcome) -> Self {
        match outcome {
            CaptionOutcome::Success { path, caption } => Self {
                path: path.clone(),
                caption: Some(caption.clone()),
                error: None,
            },
            CaptionOutcome::Failure { path, message } => Self {
                path: path.clone(),
                caption: None,
                error: Some(message.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<CaptionRecord> {
        vec![
            CaptionRecord::from(&CaptionOutcome::Success {
                path: PathBuf::from("a.jpg"),
                caption: "a dog".to_string(),
            }),
            CaptionRecord::from(&CaptionOutcome::Failure {
                path: PathBuf::from("b.jpg"),
                message: "Failed to decode".to_string(),
            }),
        ]
    }

    #[test]
    fn test_jsonl_one_record_per_line() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::JsonLines, true);
        writer.write_all(&records()).unwrap();
        assert_eq!(writer.items_written(), 2);

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"path":"a.jpg","caption":"a dog"}"#,
                r#"{"path":"b.jpg","error":"Failed to decode"}"#,
            ]
        );
    }

    #[test]
    fn test_json_batch_is_an_array() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Json, true);
        writer.write_all(&records()).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.starts_with('['));
        assert!(output.trim_end().ends_with(']'));
        assert!(output.contains('\n'));
    }
}
