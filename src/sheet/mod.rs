//! Worksheet grid with merged regions, and the unmerge utility.

pub mod address;
pub mod unmerge;
pub mod worksheet;

pub use address::{col_to_name, name_to_col, CellRef, Range};
pub use unmerge::{unmerge_and_fill_cells, UnmergeReport};
pub use worksheet::{CellValue, MergedRegion, Worksheet};
