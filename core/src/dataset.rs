//! Tabular reader for the per-run result files.
//!
//! Rows that fail validation are dropped with a warning; a file is only
//! rejected when it has no header or lacks a required column.

use std::{fs::File, io::Read, path::Path};

use csv::{ReaderBuilder, StringRecord};
use tracing::warn;

use crate::error::{EvaluationError, Result};

pub const EVALUATED_COLUMN: &str = "evaluated";
pub const SELECTED_COLUMN: &str = "selectedMethod";
pub const SIMILARITY_COLUMN: &str = "similarity_1";
pub const RECOMMENDED_COLUMNS: [&str; 5] = [
    "recommendedMethod_1",
    "recommendedMethod_2",
    "recommendedMethod_3",
    "recommendedMethod_4",
    "recommendedMethod_5",
];

/// One recommendation event as reported by the evaluation tool.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultRow {
    pub evaluated: bool,
    pub selected_method: Option<String>,
    pub recommended: [Option<String>; 5],
    pub similarity: Option<f64>,
}

impl ResultRow {
    /// 1-based rank of the selected method among the recommendations.
    pub fn hit_rank(&self) -> Option<usize> {
        let selected = self.selected_method.as_deref()?;
        self.recommended
            .iter()
            .position(|candidate| candidate.as_deref() == Some(selected))
            .map(|index| index + 1)
    }

    pub fn is_top1_hit(&self) -> bool {
        self.hit_rank() == Some(1)
    }
}

#[derive(Clone, Debug, Default)]
pub struct LoadedRows {
    pub rows: Vec<ResultRow>,
    pub dropped: usize,
}

#[derive(Clone, Copy, Debug)]
struct Columns {
    evaluated: usize,
    selected: usize,
    recommended: [usize; 5],
    similarity: usize,
}

impl Columns {
    fn locate(headers: &StringRecord, source: &Path) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim() == name)
                .ok_or_else(|| EvaluationError::unreadable(source, format!("missing column '{name}'")))
        };

        let mut recommended = [0; 5];
        for (slot, name) in recommended.iter_mut().zip(RECOMMENDED_COLUMNS) {
            *slot = find(name)?;
        }

        Ok(Self {
            evaluated: find(EVALUATED_COLUMN)?,
            selected: find(SELECTED_COLUMN)?,
            recommended,
            similarity: find(SIMILARITY_COLUMN)?,
        })
    }

    fn parse(&self, record: &StringRecord, width: usize, line: u64) -> Result<ResultRow> {
        if record.len() != width {
            return Err(EvaluationError::malformed(
                line,
                format!("expected {width} fields, found {}", record.len()),
            ));
        }

        let field = |index: usize| record.get(index).map(str::trim).unwrap_or_default();
        let text = |index: usize| Some(field(index)).filter(|value| !value.is_empty()).map(str::to_string);

        let evaluated = parse_bool(field(self.evaluated)).ok_or_else(|| {
            EvaluationError::malformed(
                line,
                format!("'{}' is not a boolean", field(self.evaluated)),
            )
        })?;
        let similarity = match field(self.similarity) {
            "" => None,
            raw => Some(
                raw.parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .ok_or_else(|| {
                        EvaluationError::malformed(line, format!("similarity '{raw}' is not numeric"))
                    })?,
            ),
        };

        Ok(ResultRow {
            evaluated,
            selected_method: text(self.selected),
            recommended: self.recommended.map(text),
            similarity,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") || value == "1" {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") || value == "0" {
        Some(false)
    } else {
        None
    }
}

/// Load the rows of one result file.
pub fn load_rows(path: &Path) -> Result<LoadedRows> {
    let file = File::open(path).map_err(|err| EvaluationError::unreadable(path, err))?;
    read_rows(file, path)
}

/// Parse result rows from any reader; `source` only names the input in errors.
pub fn read_rows<R: Read>(reader: R, source: &Path) -> Result<LoadedRows> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|err| EvaluationError::unreadable(source, err))?
        .clone();
    let columns = Columns::locate(&headers, source)?;

    let mut loaded = LoadedRows::default();
    for record in reader.records() {
        let parsed = match record {
            Ok(record) => {
                let line = record.position().map(|pos| pos.line()).unwrap_or_default();
                columns.parse(&record, headers.len(), line)
            }
            Err(err) => {
                let line = err.position().map(|pos| pos.line()).unwrap_or_default();
                Err(EvaluationError::malformed(line, err))
            }
        };

        match parsed {
            Ok(row) => loaded.rows.push(row),
            Err(err) => {
                warn!(file = %source.display(), "dropping row: {err}");
                loaded.dropped += 1;
            }
        }
    }

    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "evaluated,selectedMethod,recommendedMethod_1,recommendedMethod_2,recommendedMethod_3,recommendedMethod_4,recommendedMethod_5,similarity_1\n";

    fn read(body: &str) -> Result<LoadedRows> {
        read_rows(format!("{HEADER}{body}").as_bytes(), Path::new("test.csv"))
    }

    #[test]
    fn parses_well_formed_rows() {
        let loaded = read("True,foo,foo,bar,,,,0.75\nfalse,,,,,,,\n").unwrap();
        assert_eq!(loaded.dropped, 0);
        assert_eq!(loaded.rows.len(), 2);

        let first = &loaded.rows[0];
        assert!(first.evaluated);
        assert_eq!(first.selected_method.as_deref(), Some("foo"));
        assert_eq!(first.recommended[1].as_deref(), Some("bar"));
        assert_eq!(first.recommended[2], None);
        assert_eq!(first.similarity, Some(0.75));
        assert!(first.is_top1_hit());

        let second = &loaded.rows[1];
        assert!(!second.evaluated);
        assert_eq!(second.similarity, None);
    }

    #[test]
    fn drops_malformed_rows_and_keeps_going() {
        let body = "true,a,a,b,c,d,e,0.5\n\
                    true,a,a,b\n\
                    maybe,a,a,b,c,d,e,0.5\n\
                    true,a,a,b,c,d,e,high\n\
                    false,a,b,c,d,e,f,0.1\n";
        let loaded = read(body).unwrap();
        assert_eq!(loaded.rows.len(), 2);
        assert_eq!(loaded.dropped, 3);
    }

    #[test]
    fn missing_column_rejects_the_file() {
        let input = "evaluated,selectedMethod,recommendedMethod_1\ntrue,a,a\n";
        let err = read_rows(input.as_bytes(), Path::new("short.csv")).unwrap_err();
        match err {
            EvaluationError::UnreadableFile { reason, .. } => {
                assert!(reason.contains("recommendedMethod_2"), "{reason}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn column_order_does_not_matter() {
        let input = "similarity_1,recommendedMethod_5,recommendedMethod_4,recommendedMethod_3,recommendedMethod_2,recommendedMethod_1,selectedMethod,evaluated\n\
                     0.2,e,d,c,b,a,c,1\n";
        let loaded = read_rows(input.as_bytes(), Path::new("shuffled.csv")).unwrap();
        assert_eq!(loaded.rows[0].hit_rank(), Some(3));
        assert_eq!(loaded.rows[0].similarity, Some(0.2));
    }

    #[test]
    fn empty_selection_never_matches() {
        let row = ResultRow {
            evaluated: true,
            selected_method: None,
            recommended: Default::default(),
            similarity: None,
        };
        assert_eq!(row.hit_rank(), None);
    }
}
