use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::SheetSettings;
use crate::errors::{SheetError, SheetResult};
use crate::sheet::address::{CellRef, Range};

/// Value stored in a cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    String(String),
    Number(f64),
    Boolean(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

/// A merged rectangle. Its value lives in the anchor (top-left) cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergedRegion {
    pub range: Range,
}

impl MergedRegion {
    pub const fn new(range: Range) -> Self {
        Self { range }
    }

    pub const fn anchor(&self) -> CellRef {
        self.range.start
    }
}

impl fmt::Display for MergedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.range)
    }
}

/// A fixed-size grid of sparse cells plus its merged regions.
///
/// Only non-empty values are stored. Inside a merged region only the anchor
/// cell carries a value; reads of any covered cell return the anchor's value.
#[derive(Clone, Debug, PartialEq)]
pub struct Worksheet {
    name: String,
    rows: u32,
    cols: u32,
    cells: BTreeMap<CellRef, CellValue>,
    merged: Vec<MergedRegion>,
}

impl Worksheet {
    pub fn new(name: &str, rows: u32, cols: u32) -> SheetResult<Self> {
        Self::with_settings(name, rows, cols, &SheetSettings::default())
    }

    pub fn with_settings(name: &str, rows: u32, cols: u32, limits: &SheetSettings) -> SheetResult<Self> {
        if rows == 0 || cols == 0 || rows > limits.max_rows || cols > limits.max_cols {
            return Err(SheetError::InvalidDimensions {
                rows,
                cols,
                max_rows: limits.max_rows,
                max_cols: limits.max_cols,
            });
        }
        Ok(Self {
            name: name.to_string(),
            rows,
            cols,
            cells: BTreeMap::new(),
            merged: Vec::new(),
        })
    }

    /// Assemble a worksheet from externally loaded state.
    ///
    /// Cells are bounds-checked. Merged ranges are normalized but otherwise
    /// only validated when they are dissolved.
    #[instrument(level = "debug", skip(cells, merged))]
    pub fn from_parts(
        name: &str,
        rows: u32,
        cols: u32,
        cells: impl IntoIterator<Item = (CellRef, CellValue)>,
        merged: impl IntoIterator<Item = Range>,
    ) -> SheetResult<Self> {
        let mut sheet = Self::new(name, rows, cols)?;
        for (cell, value) in cells {
            sheet.check_bounds(cell)?;
            sheet.put(cell, value);
        }
        sheet.merged = merged
            .into_iter()
            .map(|range| MergedRegion::new(range.normalized()))
            .collect();
        Ok(sheet)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    /// True if the whole range lies inside the grid.
    pub fn contains_range(&self, range: &Range) -> bool {
        self.contains(range.start) && self.contains(range.end)
    }

    fn check_bounds(&self, cell: CellRef) -> SheetResult<()> {
        if self.contains(cell) {
            Ok(())
        } else {
            Err(SheetError::OutOfBounds {
                cell,
                rows: self.rows,
                cols: self.cols,
            })
        }
    }

    /// Displayed value: the anchor's value for cells covered by a merge.
    pub fn value(&self, cell: CellRef) -> CellValue {
        let source = self.region_at(cell).map_or(cell, |r| r.anchor());
        self.stored_value(source).cloned().unwrap_or_default()
    }

    /// Value physically stored at `cell`, ignoring merges.
    pub fn stored_value(&self, cell: CellRef) -> Option<&CellValue> {
        self.cells.get(&cell)
    }

    /// Writes a value. Writes inside a merged region go to its anchor cell.
    #[instrument(level = "trace", skip(self, value))]
    pub fn set_value(&mut self, cell: CellRef, value: CellValue) -> SheetResult<()> {
        self.check_bounds(cell)?;
        let target = self.region_at(cell).map_or(cell, |r| r.anchor());
        self.put(target, value);
        Ok(())
    }

    /// Raw write without merge redirection. Empty values are not stored.
    pub(crate) fn put(&mut self, cell: CellRef, value: CellValue) {
        if value.is_empty() {
            self.cells.remove(&cell);
        } else {
            self.cells.insert(cell, value);
        }
    }

    /// Stored non-empty cells in row-major order.
    pub fn iter_cells(&self) -> impl Iterator<Item = (CellRef, &CellValue)> {
        self.cells.iter().map(|(cell, value)| (*cell, value))
    }

    pub fn merged_regions(&self) -> &[MergedRegion] {
        &self.merged
    }

    /// The merged region covering `cell`, if any.
    pub fn region_at(&self, cell: CellRef) -> Option<&MergedRegion> {
        self.merged.iter().find(|r| r.range.contains(cell))
    }

    /// Merges `range`, keeping only the anchor's value.
    ///
    /// Fails if the range leaves the grid or overlaps an existing merge.
    #[instrument(level = "debug", skip(self), fields(sheet = %self.name))]
    pub fn merge_range(&mut self, range: Range) -> SheetResult<()> {
        let range = range.normalized();
        if !self.contains_range(&range) {
            return Err(SheetError::InvalidRegion {
                region: range,
                reason: format!("exceeds worksheet bounds ({} rows x {} columns)", self.rows, self.cols),
            });
        }
        if let Some(existing) = self.merged.iter().find(|r| r.range.intersects(&range)) {
            return Err(SheetError::InvalidRegion {
                region: range,
                reason: format!("overlaps merged region {}", existing),
            });
        }
        let anchor = range.start;
        self.cells
            .retain(|cell, _| *cell == anchor || !range.contains(*cell));
        self.merged.push(MergedRegion::new(range));
        debug!(region = %range, "merged");
        Ok(())
    }

    /// Removes every merged region intersecting `range` without filling.
    /// Returns the number of regions removed.
    #[instrument(level = "debug", skip(self), fields(sheet = %self.name))]
    pub fn unmerge_range(&mut self, range: Range) -> usize {
        let before = self.merged.len();
        self.merged.retain(|r| !r.range.intersects(&range));
        before - self.merged.len()
    }

    pub(crate) fn take_merged_regions(&mut self) -> Vec<MergedRegion> {
        std::mem::take(&mut self.merged)
    }
}
