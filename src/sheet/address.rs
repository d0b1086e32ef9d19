use std::fmt;
use std::sync::OnceLock;

use itertools::iproduct;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::SheetSettings;
use crate::errors::{SheetError, SheetResult};

/// A reference to a single cell within a worksheet.
///
/// Rows and columns are **0-indexed**:
/// - `row = 0` is Excel row `1`
/// - `col = 0` is Excel column `A`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

fn a1_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\$?([A-Za-z]+)\$?([0-9]+)$").expect("valid A1 pattern"))
}

impl CellRef {
    #[inline]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Convert to Excel A1 notation (e.g. `A1`, `BC32`).
    pub fn to_a1(self) -> String {
        format!("{}{}", col_to_name(self.col), u64::from(self.row) + 1)
    }

    /// Parse an A1-style reference (e.g. `A1`, `$B$2`) within Excel's limits.
    pub fn from_a1(a1: &str) -> SheetResult<Self> {
        Self::from_a1_with(a1, &SheetSettings::default())
    }

    pub fn from_a1_with(a1: &str, limits: &SheetSettings) -> SheetResult<Self> {
        let s = a1.trim();
        let caps = a1_pattern()
            .captures(s)
            .ok_or_else(|| SheetError::Parse(format!("not an A1 reference: {:?}", a1)))?;

        let col = name_to_col(&caps[1])?;
        if col >= limits.max_cols {
            return Err(SheetError::Parse(format!("column out of range: {}", &caps[1])));
        }
        let row_1_based: u32 = caps[2]
            .parse()
            .map_err(|_| SheetError::Parse(format!("invalid row: {}", &caps[2])))?;
        if row_1_based == 0 || row_1_based > limits.max_rows {
            return Err(SheetError::Parse(format!("row out of range: {}", row_1_based)));
        }
        Ok(Self::new(row_1_based - 1, col))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

/// A rectangular, inclusive region within a worksheet.
///
/// Always normalized such that `start.row <= end.row` and
/// `start.col <= end.col`. Deserialized ranges are normalized as well.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RangeCorners")]
pub struct Range {
    pub start: CellRef,
    pub end: CellRef,
}

#[derive(Deserialize)]
struct RangeCorners {
    start: CellRef,
    end: CellRef,
}

impl From<RangeCorners> for Range {
    fn from(corners: RangeCorners) -> Self {
        Range::new(corners.start, corners.end)
    }
}

impl Range {
    /// Construct a new range, normalizing coordinates if needed.
    pub const fn new(a: CellRef, b: CellRef) -> Self {
        let start_row = if a.row <= b.row { a.row } else { b.row };
        let end_row = if a.row <= b.row { b.row } else { a.row };
        let start_col = if a.col <= b.col { a.col } else { b.col };
        let end_col = if a.col <= b.col { b.col } else { a.col };
        Self {
            start: CellRef::new(start_row, start_col),
            end: CellRef::new(end_row, end_col),
        }
    }

    #[inline]
    pub const fn contains(&self, cell: CellRef) -> bool {
        cell.row >= self.start.row
            && cell.row <= self.end.row
            && cell.col >= self.start.col
            && cell.col <= self.end.col
    }

    /// True if the two ranges share at least one cell.
    #[inline]
    pub const fn intersects(&self, other: &Range) -> bool {
        self.start.row <= other.end.row
            && other.start.row <= self.end.row
            && self.start.col <= other.end.col
            && other.start.col <= self.end.col
    }

    #[inline]
    pub const fn width(&self) -> u64 {
        (self.end.col - self.start.col) as u64 + 1
    }

    #[inline]
    pub const fn height(&self) -> u64 {
        (self.end.row - self.start.row) as u64 + 1
    }

    /// Same range with corners reordered, for values built from raw fields.
    #[inline]
    pub const fn normalized(self) -> Self {
        Self::new(self.start, self.end)
    }

    #[inline]
    pub const fn is_single_cell(&self) -> bool {
        self.start.row == self.end.row && self.start.col == self.end.col
    }

    /// Row-major iteration over every cell in the range.
    pub fn cells(&self) -> impl Iterator<Item = CellRef> {
        iproduct!(self.start.row..=self.end.row, self.start.col..=self.end.col)
            .map(|(row, col)| CellRef::new(row, col))
    }

    /// Parse `A1:B2` or a single-cell reference like `C3`.
    pub fn from_a1(a1: &str) -> SheetResult<Self> {
        let s = a1.trim();
        match s.split_once(':') {
            None => {
                let cell = CellRef::from_a1(s)?;
                Ok(Range::new(cell, cell))
            }
            Some((a, b)) => Ok(Range::new(CellRef::from_a1(a)?, CellRef::from_a1(b)?)),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

/// Convert a 0-indexed column to letters (`0 -> A`, `26 -> AA`).
pub fn col_to_name(col: u32) -> String {
    let mut n = u64::from(col) + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Convert column letters to a 0-indexed column (`A -> 0`).
pub fn name_to_col(name: &str) -> SheetResult<u32> {
    let mut col: u32 = 0;
    for ch in name.chars() {
        if !ch.is_ascii_alphabetic() {
            return Err(SheetError::Parse(format!("invalid column: {}", name)));
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        col = col
            .checked_mul(26)
            .and_then(|c| c.checked_add(digit))
            .ok_or_else(|| SheetError::Parse(format!("column overflow: {}", name)))?;
    }
    col.checked_sub(1)
        .ok_or_else(|| SheetError::Parse("empty column".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("A1", CellRef::new(0, 0))]
    #[case("$B$2", CellRef::new(1, 1))]
    #[case("z26", CellRef::new(25, 25))]
    #[case("AA1", CellRef::new(0, 26))]
    #[case("XFD1048576", CellRef::new(1_048_575, 16_383))]
    fn test_from_a1(#[case] input: &str, #[case] expected: CellRef) {
        assert_eq!(CellRef::from_a1(input).unwrap(), expected);
        assert_eq!(CellRef::from_a1(&expected.to_a1()).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("1A")]
    #[case("A0")]
    #[case("XFE1")]
    #[case("A1048577")]
    #[case("A1B")]
    fn test_from_a1_rejects(#[case] input: &str) {
        assert!(matches!(CellRef::from_a1(input), Err(SheetError::Parse(_))));
    }

    #[test]
    fn test_range_normalizes_and_displays() {
        let range = Range::from_a1("C3:A1").unwrap();
        assert_eq!(range.start, CellRef::new(0, 0));
        assert_eq!(range.to_string(), "A1:C3");
        assert_eq!((range.width(), range.height()), (3, 3));
        assert_eq!(range.cells().count(), 9);
    }

    #[test]
    fn test_to_a1_at_u32_limits() {
        assert_eq!(col_to_name(u32::MAX), "MWLQKWV");
        assert_eq!(CellRef::new(u32::MAX, 0).to_a1(), "A4294967296");
    }

    #[test]
    fn test_deserialize_normalizes_corners() {
        let range: Range = toml::from_str("start = { row = 1, col = 1 }\nend = { row = 0, col = 0 }\n").unwrap();
        assert_eq!(range, Range::from_a1("A1:B2").unwrap());
    }

    #[test]
    fn test_intersects() {
        let a = Range::from_a1("A1:B2").unwrap();
        assert!(a.intersects(&Range::from_a1("B2:C3").unwrap()));
        assert!(!a.intersects(&Range::from_a1("C1:D2").unwrap()));
    }
}
