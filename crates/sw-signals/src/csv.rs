//! Engine CSV result reader.
//!
//! Layout: a header of quoted signal names (`"time","x","R[1,2]"`), then one
//! row of numbers per output sample. The `time` column is the abscissa.
//! A trailing separator on every line is tolerated.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::dataset::Dataset;
use crate::{SignalError, SignalResult};

const TIME_COLUMN: &str = "time";

#[derive(Debug, Clone, Default)]
pub struct CsvDataset {
    order: Vec<String>,
    columns: HashMap<String, Vec<f64>>,
}

impl CsvDataset {
    pub fn open(path: &Path) -> SignalResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> SignalResult<Self> {
        let mut lines = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let (_, header_line) = lines.next().ok_or(SignalError::Parse {
            line: 1,
            message: "missing header".to_string(),
        })?;
        let mut header = split_record(header_line).map_err(|message| SignalError::Parse {
            line: 1,
            message,
        })?;
        if header.last().is_some_and(|name| name.is_empty()) {
            header.pop();
        }
        if let Some(position) = header.iter().position(String::is_empty) {
            return Err(SignalError::Parse {
                line: 1,
                message: format!("empty signal name in column {}", position + 1),
            });
        }

        let mut values: Vec<Vec<f64>> = vec![Vec::new(); header.len()];
        for (index, line) in lines {
            let line_no = index + 1;
            let mut fields = split_record(line).map_err(|message| SignalError::Parse {
                line: line_no,
                message,
            })?;
            if fields.len() == header.len() + 1 && fields.last().is_some_and(|f| f.is_empty()) {
                fields.pop();
            }
            if fields.len() != header.len() {
                return Err(SignalError::Parse {
                    line: line_no,
                    message: format!("expected {} fields, found {}", header.len(), fields.len()),
                });
            }
            for (column, field) in values.iter_mut().zip(&fields) {
                let value: f64 = field.trim().parse().map_err(|_| SignalError::Parse {
                    line: line_no,
                    message: format!("not a number: '{field}'"),
                })?;
                column.push(value);
            }
        }

        let mut columns = HashMap::with_capacity(header.len());
        for (name, samples) in header.iter().zip(values) {
            if columns.insert(name.clone(), samples).is_some() {
                return Err(SignalError::Parse {
                    line: 1,
                    message: format!("duplicate signal name '{name}'"),
                });
            }
        }

        Ok(Self {
            order: header,
            columns,
        })
    }
}

impl Dataset for CsvDataset {
    fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    fn data(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    fn abscissa(&self) -> Option<&[f64]> {
        self.data(TIME_COLUMN)
    }
}

/// Split one CSV line, honouring double quotes and `""` escapes.
fn split_record(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(current);
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\"time\",\"ball.h\",\"R[1,2]\",\n0,1,5,\n0.5,0.75,5,\n1,0,5,\n";

    #[test]
    fn parses_quoted_header_with_commas() {
        let ds = CsvDataset::parse(SAMPLE).unwrap();
        assert_eq!(ds.names(), vec!["time", "ball.h", "R[1,2]"]);
        assert_eq!(ds.data("R[1,2]"), Some(&[5.0, 5.0, 5.0][..]));
        assert_eq!(ds.abscissa(), Some(&[0.0, 0.5, 1.0][..]));
    }

    #[test]
    fn no_time_column_means_no_axis() {
        let ds = CsvDataset::parse("a,b\n1,2\n").unwrap();
        assert!(ds.abscissa().is_none());
        assert_eq!(ds.data("b"), Some(&[2.0][..]));
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = CsvDataset::parse("time,a\n0,1\n1\n").unwrap_err();
        assert!(matches!(err, SignalError::Parse { line: 3, .. }));
    }

    #[test]
    fn rejects_non_numeric() {
        let err = CsvDataset::parse("time,a\n0,abc\n").unwrap_err();
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(CsvDataset::parse("\n\n").is_err());
    }

    #[test]
    fn split_handles_escaped_quotes() {
        let fields = split_record(r#""a""b",c"#).unwrap();
        assert_eq!(fields, vec!["a\"b".to_string(), "c".to_string()]);
        assert!(split_record("\"open").is_err());
    }
}
