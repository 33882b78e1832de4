//! Board point representation and coordinate translation.
//!
//! Two notations meet at the engine boundary:
//! - SGF point codes: two lowercase letters `a..y`, column then row, counted
//!   from the top-left corner (`dp` is the lower-left star point on 19x19).
//! - Engine vertices: a column letter that skips `I`, then the row number
//!   counted from the bottom (`D4`).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Largest board both notations can address.
pub const MAX_BOARD_SIZE: u8 = 25;

const SGF_LETTERS: &[u8; 25] = b"abcdefghijklmnopqrstuvwxy";
const VERTEX_LETTERS: &[u8; 25] = b"ABCDEFGHJKLMNOPQRSTUVWXYZ";

/// Errors that can occur when translating coordinates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinateError {
    #[error("unsupported board size {0} (expected 2-{max})", max = MAX_BOARD_SIZE)]
    UnsupportedBoardSize(u8),

    #[error("malformed SGF point '{0}'")]
    MalformedSgf(String),

    #[error("malformed engine vertex '{0}'")]
    MalformedVertex(String),

    #[error("point '{point}' is outside a {size}x{size} board")]
    OutOfRange { point: String, size: u8 },
}

fn check_size(size: u8) -> Result<(), CoordinateError> {
    if (2..=MAX_BOARD_SIZE).contains(&size) {
        Ok(())
    } else {
        Err(CoordinateError::UnsupportedBoardSize(size))
    }
}

/// An intersection on the board.
///
/// `col` counts from the left edge and `row` from the top edge, both
/// zero-based, matching SGF orientation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    col: u8,
    row: u8,
}

impl Point {
    /// Creates a point, validating it against the board size.
    pub fn new(col: u8, row: u8, size: u8) -> Result<Self, CoordinateError> {
        check_size(size)?;
        if col >= size || row >= size {
            return Err(CoordinateError::OutOfRange {
                point: format!("({}, {})", col, row),
                size,
            });
        }
        Ok(Point { col, row })
    }

    /// Column index from the left edge.
    #[inline]
    pub const fn col(self) -> u8 {
        self.col
    }

    /// Row index from the top edge.
    #[inline]
    pub const fn row(self) -> u8 {
        self.row
    }

    /// Parses an SGF point code such as `dp`.
    pub fn from_sgf(code: &str, size: u8) -> Result<Self, CoordinateError> {
        check_size(size)?;
        let bytes = code.as_bytes();
        if bytes.len() != 2 {
            return Err(CoordinateError::MalformedSgf(code.to_string()));
        }
        let index = |b: u8| SGF_LETTERS.iter().position(|&l| l == b);
        match (index(bytes[0]), index(bytes[1])) {
            (Some(col), Some(row)) if col < size as usize && row < size as usize => Ok(Point {
                col: col as u8,
                row: row as u8,
            }),
            (Some(_), Some(_)) => Err(CoordinateError::OutOfRange {
                point: code.to_string(),
                size,
            }),
            _ => Err(CoordinateError::MalformedSgf(code.to_string())),
        }
    }

    /// Returns the SGF point code.
    pub fn to_sgf(self) -> String {
        let mut s = String::with_capacity(2);
        s.push(SGF_LETTERS[self.col as usize] as char);
        s.push(SGF_LETTERS[self.row as usize] as char);
        s
    }

    /// Parses an engine vertex such as `D4` (case-insensitive).
    pub fn from_vertex(vertex: &str, size: u8) -> Result<Self, CoordinateError> {
        check_size(size)?;
        let vertex = vertex.trim();
        let mut chars = vertex.chars();
        let letter = chars
            .next()
            .ok_or_else(|| CoordinateError::MalformedVertex(vertex.to_string()))?
            .to_ascii_uppercase();
        let number: u8 = chars
            .as_str()
            .parse()
            .map_err(|_| CoordinateError::MalformedVertex(vertex.to_string()))?;
        let col = VERTEX_LETTERS
            .iter()
            .position(|&l| l as char == letter)
            .ok_or_else(|| CoordinateError::MalformedVertex(vertex.to_string()))?;

        if col >= size as usize || number == 0 || number > size {
            return Err(CoordinateError::OutOfRange {
                point: vertex.to_string(),
                size,
            });
        }

        Ok(Point {
            col: col as u8,
            row: size - number,
        })
    }

    /// Returns the engine vertex for this point on a board of the given size.
    pub fn to_vertex(self, size: u8) -> String {
        format!(
            "{}{}",
            VERTEX_LETTERS[self.col as usize] as char,
            size - self.row
        )
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point({})", self.to_sgf())
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sgf())
    }
}

/// A move: a stone on a point, or a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    Pass,
    Play(Point),
}

impl Move {
    /// Parses an SGF move value. The empty value, and `tt` on boards up to
    /// 19x19, mean pass.
    pub fn from_sgf(code: &str, size: u8) -> Result<Self, CoordinateError> {
        check_size(size)?;
        if code.is_empty() || (code == "tt" && size <= 19) {
            return Ok(Move::Pass);
        }
        Point::from_sgf(code, size).map(Move::Play)
    }

    /// Parses an engine vertex, accepting `pass` in any case.
    pub fn from_vertex(vertex: &str, size: u8) -> Result<Self, CoordinateError> {
        if vertex.trim().eq_ignore_ascii_case("pass") {
            check_size(size)?;
            return Ok(Move::Pass);
        }
        Point::from_vertex(vertex, size).map(Move::Play)
    }

    /// Returns the SGF value (empty string for a pass).
    pub fn to_sgf(self) -> String {
        match self {
            Move::Pass => String::new(),
            Move::Play(p) => p.to_sgf(),
        }
    }

    /// Returns the engine vertex (`pass` for a pass).
    pub fn to_vertex(self, size: u8) -> String {
        match self {
            Move::Pass => "pass".to_string(),
            Move::Play(p) => p.to_vertex(size),
        }
    }

    #[inline]
    pub const fn is_pass(self) -> bool {
        matches!(self, Move::Pass)
    }
}

/// Converts an SGF move value into an engine vertex.
///
/// ```
/// assert_eq!(go_core::convert_coordinate("dp", 19).unwrap(), "D4");
/// assert_eq!(go_core::convert_coordinate("", 19).unwrap(), "pass");
/// ```
pub fn convert_coordinate(sgf: &str, size: u8) -> Result<String, CoordinateError> {
    Move::from_sgf(sgf, size).map(|m| m.to_vertex(size))
}

/// Converts an engine vertex into an SGF move value.
///
/// ```
/// assert_eq!(go_core::parse_coordinate("D4", 19).unwrap(), "dp");
/// assert_eq!(go_core::parse_coordinate("pass", 19).unwrap(), "");
/// ```
pub fn parse_coordinate(vertex: &str, size: u8) -> Result<String, CoordinateError> {
    Move::from_vertex(vertex, size).map(Move::to_sgf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sgf_to_vertex() {
        assert_eq!(convert_coordinate("aa", 19).unwrap(), "A19");
        assert_eq!(convert_coordinate("dp", 19).unwrap(), "D4");
        assert_eq!(convert_coordinate("pd", 19).unwrap(), "Q16");
        assert_eq!(convert_coordinate("ss", 19).unwrap(), "T1");
        assert_eq!(convert_coordinate("ia", 9).unwrap(), "J9");
    }

    #[test]
    fn vertex_to_sgf() {
        assert_eq!(parse_coordinate("A19", 19).unwrap(), "aa");
        assert_eq!(parse_coordinate("q16", 19).unwrap(), "pd");
        assert_eq!(parse_coordinate("J9", 9).unwrap(), "ia");
        assert_eq!(parse_coordinate("PASS", 13).unwrap(), "");
    }

    #[test]
    fn column_i_is_skipped() {
        assert!(matches!(
            Point::from_vertex("I5", 19),
            Err(CoordinateError::MalformedVertex(_))
        ));
        assert_eq!(Point::from_vertex("J5", 19).unwrap().col(), 8);
    }

    #[test]
    fn pass_codes() {
        assert_eq!(Move::from_sgf("", 19).unwrap(), Move::Pass);
        assert_eq!(Move::from_sgf("tt", 19).unwrap(), Move::Pass);
        assert_eq!(Move::from_sgf("tt", 9), Err(CoordinateError::OutOfRange {
            point: "tt".to_string(),
            size: 9
        }));
        assert!(Move::Pass.is_pass());
    }

    #[test]
    fn rejects_points_outside_board() {
        assert!(matches!(
            convert_coordinate("jj", 9),
            Err(CoordinateError::OutOfRange { .. })
        ));
        assert!(matches!(
            parse_coordinate("K10", 9),
            Err(CoordinateError::OutOfRange { .. })
        ));
        assert!(matches!(
            parse_coordinate("A0", 9),
            Err(CoordinateError::OutOfRange { .. })
        ));
        assert!(Point::new(9, 0, 9).is_err());
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(
            convert_coordinate("d", 19),
            Err(CoordinateError::MalformedSgf(_))
        ));
        assert!(matches!(
            convert_coordinate("D4", 19),
            Err(CoordinateError::MalformedSgf(_))
        ));
        assert!(matches!(
            parse_coordinate("4D", 19),
            Err(CoordinateError::MalformedVertex(_))
        ));
        assert!(matches!(
            parse_coordinate("", 19),
            Err(CoordinateError::MalformedVertex(_))
        ));
    }

    #[test]
    fn rejects_unsupported_board_size() {
        assert_eq!(
            convert_coordinate("aa", 26),
            Err(CoordinateError::UnsupportedBoardSize(26))
        );
        assert_eq!(
            parse_coordinate("A1", 1),
            Err(CoordinateError::UnsupportedBoardSize(1))
        );
    }

    fn size_and_point() -> impl Strategy<Value = (u8, u8, u8)> {
        prop_oneof![Just(9u8), Just(13u8), Just(19u8)]
            .prop_flat_map(|size| (Just(size), 0..size, 0..size))
    }

    proptest! {
        #[test]
        fn coordinate_round_trip((size, col, row) in size_and_point()) {
            let code = Point::new(col, row, size).unwrap().to_sgf();
            let vertex = convert_coordinate(&code, size).unwrap();
            prop_assert_eq!(parse_coordinate(&vertex, size).unwrap(), code);
        }
    }
}
