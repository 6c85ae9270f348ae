use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::debug;

use crate::types::{Choice, CoordinateTable, Question};

/// Largest absolute coordinate accepted from a coordinates file.
pub const MAX_COORDINATE: i32 = 1_000_000;

#[derive(Debug, thiserror::Error)]
pub enum CoordsError {
    #[error("Coords data file: {} does not exist.", .0.display())]
    NotFound(PathBuf),

    #[error("unable to read coords data file {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("line {line}: {token:?} is not an integer coordinate")]
    InvalidNumber { line: usize, token: String },

    #[error("line {}: coordinate {} is outside -{}..={}", .line, .value, MAX_COORDINATE, MAX_COORDINATE)]
    OutOfRange { line: usize, value: i32 },

    #[error("line {line}: {count} values cannot be grouped into (x, y) pairs")]
    OddValueCount { line: usize, count: usize },

    #[error("Coords data file: {} does not contain any questions.", .0.display())]
    Empty(PathBuf),
}

/// Loads the bubble layout from a delimited text file. Every non-empty line
/// is one question; its values are taken two at a time as `x y` pairs.
pub fn load_coordinate_table(
    path: &Path,
    delimiter: char,
) -> Result<CoordinateTable, CoordsError> {
    if !path.is_file() {
        return Err(CoordsError::NotFound(path.to_path_buf()));
    }

    let file = File::open(path).map_err(|e| CoordsError::Io(path.to_path_buf(), e))?;
    let table = parse_coordinate_table(BufReader::new(file), delimiter)
        .map_err(|e| match e {
            CoordsError::Io(_, source) => CoordsError::Io(path.to_path_buf(), source),
            other => other,
        })?;

    if table.is_empty() {
        return Err(CoordsError::Empty(path.to_path_buf()));
    }

    debug!(
        "loaded {} questions from {}",
        table.len(),
        path.display()
    );
    Ok(table)
}

pub fn parse_coordinate_table<R: BufRead>(
    reader: R,
    delimiter: char,
) -> Result<CoordinateTable, CoordsError> {
    let mut questions = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| CoordsError::Io(PathBuf::new(), e))?;
        if let Some(question) = parse_question(&line, index + 1, delimiter)? {
            questions.push(question);
        }
    }

    Ok(CoordinateTable::new(questions))
}

/// Parses one record. Lines with no values yield `None`.
fn parse_question(
    line: &str,
    line_number: usize,
    delimiter: char,
) -> Result<Option<Question>, CoordsError> {
    let values = line
        .split(delimiter)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            token.parse::<i32>().map_err(|_| CoordsError::InvalidNumber {
                line: line_number,
                token: token.to_string(),
            })
        })
        .collect::<Result<Vec<i32>, CoordsError>>()?;

    if values.is_empty() {
        return Ok(None);
    }

    let limit = MAX_COORDINATE.unsigned_abs();
    if let Some(&value) = values.iter().find(|v| v.unsigned_abs() > limit) {
        return Err(CoordsError::OutOfRange {
            line: line_number,
            value,
        });
    }

    if values.len() % 2 != 0 {
        return Err(CoordsError::OddValueCount {
            line: line_number,
            count: values.len(),
        });
    }

    Ok(Some(
        values
            .chunks_exact(2)
            .map(|pair| Choice::new(pair[0], pair[1]))
            .collect(),
    ))
}
