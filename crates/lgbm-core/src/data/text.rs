//! Delimited and LibSVM text data files.
//!
//! The format is detected from the first data line:
//! - LibSVM when any whitespace token contains `:` (`label idx:value ...`)
//! - tab separated when the line contains a tab
//! - comma separated when it contains a comma
//! - whitespace separated otherwise
//!
//! `na`, `nan`, `null` and empty fields read as NaN.

use std::fs;
use std::path::Path;

use ndarray::Array2;

use crate::error::ErrorKind;

/// Largest feature index accepted in a LibSVM file. Rows are densified, so
/// an index sets the width of every row.
const MAX_LIBSVM_INDEX: usize = 1 << 20;

/// Cap on densified LibSVM cells (`rows * columns`).
const MAX_LIBSVM_CELLS: usize = 1 << 28;

/// Errors from reading text data files.
#[derive(Debug, thiserror::Error)]
pub enum TextReadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("line {line}: expected {expected} columns, found {actual}")]
    InconsistentColumns {
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("label column {column} is outside the {n_columns} columns of the file")]
    LabelColumnOutOfRange { column: usize, n_columns: usize },

    #[error("{0} contains no data rows")]
    Empty(String),
}

impl TextReadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TextReadError::Io { .. } => ErrorKind::ResourceUnavailable,
            _ => ErrorKind::MalformedInput,
        }
    }
}

/// Layout of a text data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Tsv,
    Csv,
    Whitespace,
    LibSvm,
}

impl TextFormat {
    fn detect(line: &str) -> Self {
        if line.split_whitespace().any(|t| t.contains(':')) {
            TextFormat::LibSvm
        } else if line.contains('\t') {
            TextFormat::Tsv
        } else if line.contains(',') {
            TextFormat::Csv
        } else {
            TextFormat::Whitespace
        }
    }

    fn split<'a>(self, line: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        match self {
            TextFormat::Tsv => Box::new(line.split('\t')),
            TextFormat::Csv => Box::new(line.split(',')),
            TextFormat::Whitespace | TextFormat::LibSvm => Box::new(line.split_whitespace()),
        }
    }
}

/// Parsed numeric table, row-major.
///
/// For LibSVM input, column 0 holds the label (NaN when a row has none)
/// and column `1 + idx` holds feature `idx`.
#[derive(Debug, Clone)]
pub struct TextTable {
    pub format: TextFormat,
    pub n_rows: usize,
    pub n_cols: usize,
    values: Vec<f64>,
    header: Option<Vec<String>>,
}

impl TextTable {
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.n_cols + col]
    }

    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Split off the label column: returns feature-major features, labels
    /// and the names of the remaining columns when a header was present.
    ///
    /// LibSVM tables always take the label from column 0.
    pub fn split_label(
        &self,
        label_column: usize,
    ) -> Result<(Array2<f64>, Vec<f32>, Option<Vec<String>>), TextReadError> {
        let label_column = if self.format == TextFormat::LibSvm { 0 } else { label_column };
        if label_column >= self.n_cols {
            return Err(TextReadError::LabelColumnOutOfRange {
                column: label_column,
                n_columns: self.n_cols,
            });
        }
        let feature_cols: Vec<usize> = (0..self.n_cols).filter(|&c| c != label_column).collect();
        let features = Array2::from_shape_fn((feature_cols.len(), self.n_rows), |(f, r)| {
            self.get(r, feature_cols[f])
        });
        let labels = (0..self.n_rows)
            .map(|r| self.get(r, label_column) as f32)
            .collect();
        let names = self
            .header
            .as_ref()
            .map(|h| feature_cols.iter().map(|&c| h[c].clone()).collect());
        Ok((features, labels, names))
    }

    /// Row-major `[n_rows, n_features]` features for prediction.
    ///
    /// Drops `label_column` when the table is wider than `n_features`
    /// (always for LibSVM). Missing trailing features read as 0.
    pub fn prediction_rows(&self, n_features: usize, label_column: usize) -> Array2<f64> {
        let drop = if self.format == TextFormat::LibSvm {
            Some(0)
        } else if self.n_cols > n_features && label_column < self.n_cols {
            Some(label_column)
        } else {
            None
        };
        let cols: Vec<usize> = (0..self.n_cols).filter(|&c| Some(c) != drop).collect();
        let width = n_features.max(cols.len());
        Array2::from_shape_fn((self.n_rows, width), |(r, f)| {
            cols.get(f).map_or(0.0, |&c| self.get(r, c))
        })
    }
}

fn parse_value(token: &str, line: usize) -> Result<f64, TextReadError> {
    let token = token.trim();
    if token.is_empty()
        || token.eq_ignore_ascii_case("na")
        || token.eq_ignore_ascii_case("nan")
        || token.eq_ignore_ascii_case("null")
    {
        return Ok(f64::NAN);
    }
    token.parse::<f64>().map_err(|_| TextReadError::Parse {
        line,
        message: format!("cannot parse '{token}' as a number"),
    })
}

fn sanitize_name(name: &str) -> String {
    let name: String = name
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    if name.is_empty() { "_".to_string() } else { name }
}

/// Read a text data file.
pub fn read_text_file(path: &Path, has_header: bool) -> Result<TextTable, TextReadError> {
    let content = fs::read_to_string(path).map_err(|source| TextReadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_text(&content, has_header).map_err(|e| match e {
        TextReadError::Empty(_) => TextReadError::Empty(path.display().to_string()),
        other => other,
    })
}

/// Parse text data held in memory.
pub fn parse_text(content: &str, has_header: bool) -> Result<TextTable, TextReadError> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end_matches('\r')))
        .filter(|(_, l)| !l.trim().is_empty());

    let header_line = if has_header { lines.next() } else { None };
    let data_lines: Vec<(usize, &str)> = lines.collect();
    let Some(&(_, first)) = data_lines.first() else {
        return Err(TextReadError::Empty("input".to_string()));
    };

    let format = TextFormat::detect(first);
    let header = header_line.map(|(_, l)| format.split(l).map(sanitize_name).collect::<Vec<_>>());

    let mut table = if format == TextFormat::LibSvm {
        parse_libsvm(&data_lines)?
    } else {
        parse_delimited(format, &data_lines)?
    };
    // LibSVM headers carry no usable column names
    if let Some(header) = header {
        if format != TextFormat::LibSvm && header.len() == table.n_cols {
            table.header = Some(header);
        }
    }
    Ok(table)
}

fn parse_delimited(format: TextFormat, lines: &[(usize, &str)]) -> Result<TextTable, TextReadError> {
    let mut values = Vec::new();
    let mut n_cols = 0usize;
    for (row, &(line_no, line)) in lines.iter().enumerate() {
        let before = values.len();
        for token in format.split(line) {
            values.push(parse_value(token, line_no)?);
        }
        let width = values.len() - before;
        if row == 0 {
            n_cols = width;
        } else if width != n_cols {
            return Err(TextReadError::InconsistentColumns {
                line: line_no,
                expected: n_cols,
                actual: width,
            });
        }
    }
    Ok(TextTable {
        format,
        n_rows: lines.len(),
        n_cols,
        values,
        header: None,
    })
}

fn parse_libsvm(lines: &[(usize, &str)]) -> Result<TextTable, TextReadError> {
    let mut rows: Vec<(f64, Vec<(usize, f64)>)> = Vec::with_capacity(lines.len());
    let mut max_idx: Option<usize> = None;

    for &(line_no, line) in lines {
        let mut tokens = line.split_whitespace().peekable();
        let label = match tokens.peek() {
            Some(t) if !t.contains(':') => {
                let v = parse_value(t, line_no)?;
                tokens.next();
                v
            }
            _ => f64::NAN,
        };
        let mut pairs = Vec::new();
        for token in tokens {
            let (idx, value) = token.split_once(':').ok_or_else(|| TextReadError::Parse {
                line: line_no,
                message: format!("expected 'index:value', found '{token}'"),
            })?;
            let idx: usize = idx.trim().parse().map_err(|_| TextReadError::Parse {
                line: line_no,
                message: format!("invalid feature index '{idx}'"),
            })?;
            if idx > MAX_LIBSVM_INDEX {
                return Err(TextReadError::Parse {
                    line: line_no,
                    message: format!("feature index {idx} exceeds the limit of {MAX_LIBSVM_INDEX}"),
                });
            }
            max_idx = Some(max_idx.map_or(idx, |m| m.max(idx)));
            pairs.push((idx, parse_value(value, line_no)?));
        }
        rows.push((label, pairs));
    }

    let n_cols = 1 + max_idx.map_or(0, |m| m + 1);
    let n_cells = rows
        .len()
        .checked_mul(n_cols)
        .filter(|&cells| cells <= MAX_LIBSVM_CELLS)
        .ok_or_else(|| TextReadError::Parse {
            line: lines.last().map_or(0, |&(line_no, _)| line_no),
            message: format!("{} rows x {n_cols} columns is too large to densify", rows.len()),
        })?;
    let mut values = vec![0.0; n_cells];
    for (r, (label, pairs)) in rows.iter().enumerate() {
        values[r * n_cols] = *label;
        for &(idx, v) in pairs {
            values[r * n_cols + 1 + idx] = v;
        }
    }
    Ok(TextTable {
        format: TextFormat::LibSvm,
        n_rows: rows.len(),
        n_cols,
        values,
        header: None,
    })
}

/// Read one weight per non-empty line.
pub fn read_weight_file(path: &Path) -> Result<Vec<f32>, TextReadError> {
    let content = fs::read_to_string(path).map_err(|source| TextReadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    content
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| parse_value(l, i + 1).map(|v| v as f32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1\t0.5\t2", TextFormat::Tsv)]
    #[case("1,0.5,2", TextFormat::Csv)]
    #[case("1 0.5 2", TextFormat::Whitespace)]
    #[case("1 0:0.5 3:2", TextFormat::LibSvm)]
    #[case("0:0.5 3:2", TextFormat::LibSvm)]
    fn detect_format(#[case] line: &str, #[case] expected: TextFormat) {
        assert_eq!(TextFormat::detect(line), expected);
    }

    #[test]
    fn parse_tsv_with_label() {
        let table = parse_text("1\t0.5\t2\n0\t1.5\tna\n", false).unwrap();
        assert_eq!((table.n_rows, table.n_cols), (2, 3));
        let (features, labels, names) = table.split_label(0).unwrap();
        assert_eq!(labels, vec![1.0, 0.0]);
        assert_eq!(features.dim(), (2, 2));
        assert_eq!(features[[0, 1]], 1.5);
        assert!(features[[1, 1]].is_nan());
        assert!(names.is_none());
    }

    #[test]
    fn parse_csv_with_header() {
        let table = parse_text("y,age,income\r\n1,30,5.5\r\n\r\n0,40,6\r\n", true).unwrap();
        let (_, labels, names) = table.split_label(0).unwrap();
        assert_eq!(labels, vec![1.0, 0.0]);
        assert_eq!(names.unwrap(), vec!["age".to_string(), "income".to_string()]);
    }

    #[test]
    fn label_column_in_middle() {
        let table = parse_text("1 9 2\n3 8 4\n", false).unwrap();
        let (features, labels, _) = table.split_label(1).unwrap();
        assert_eq!(labels, vec![9.0, 8.0]);
        assert_eq!(features[[0, 1]], 3.0);
        assert_eq!(features[[1, 1]], 4.0);
    }

    #[test]
    fn inconsistent_columns_report_line() {
        let err = parse_text("1\t2\t3\n\n1\t2\n", false).unwrap_err();
        assert!(matches!(
            err,
            TextReadError::InconsistentColumns { line: 3, expected: 3, actual: 2 }
        ));
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn bad_number_reports_line() {
        let err = parse_text("1,2\n1,abc\n", false).unwrap_err();
        assert!(matches!(err, TextReadError::Parse { line: 2, .. }));
    }

    #[test]
    fn empty_input_is_error() {
        assert!(matches!(parse_text("\n\n", false), Err(TextReadError::Empty(_))));
    }

    #[test]
    fn libsvm_rows() {
        let table = parse_text("1 0:1.5 2:3\n0 1:2\n", false).unwrap();
        assert_eq!(table.format, TextFormat::LibSvm);
        assert_eq!(table.n_cols, 4);
        let (features, labels, _) = table.split_label(3).unwrap();
        assert_eq!(labels, vec![1.0, 0.0]);
        assert_eq!(features.dim(), (3, 2));
        assert_eq!(features[[2, 0]], 3.0);
        assert_eq!(features[[1, 0]], 0.0);
        assert_eq!(features[[1, 1]], 2.0);
    }

    #[test]
    fn libsvm_index_is_bounded() {
        let err = parse_text("1 0:1.5\n0 4000000000:2\n", false).unwrap_err();
        assert!(matches!(err, TextReadError::Parse { line: 2, .. }), "{err}");
        assert_eq!(err.kind(), ErrorKind::MalformedInput);

        let table = parse_text(&format!("1 {MAX_LIBSVM_INDEX}:1\n"), false).unwrap();
        assert_eq!(table.n_cols, MAX_LIBSVM_INDEX + 2);
    }

    #[test]
    fn prediction_rows_drop_label_when_wider() {
        let table = parse_text("1\t0.5\t2\n0\t1.5\t3\n", false).unwrap();
        let rows = table.prediction_rows(2, 0);
        assert_eq!(rows.dim(), (2, 2));
        assert_eq!(rows[[1, 1]], 3.0);

        // Same width as the model: nothing dropped
        let rows = table.prediction_rows(3, 0);
        assert_eq!(rows[[0, 0]], 1.0);
    }

    #[test]
    fn missing_file_is_resource_error() {
        let err = read_text_file(Path::new("/definitely/not/here.txt"), false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceUnavailable);
    }
}
