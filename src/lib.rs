//! Personal toolkit: arena-backed ownership trees and worksheet helpers.
//!
//! - [`arena`]: ordered N-ary trees with cycle-checked attach/detach and a
//!   single-pass deep copy
//! - [`traverse`]: lazy pre-, post- and level-order walks with filter/stop rules
//! - [`sheet`]: worksheet grid and [`sheet::unmerge_and_fill_cells`]

pub mod arena;
pub mod config;
pub mod errors;
pub mod sheet;
pub mod traverse;
pub mod tree_traits;
pub mod util;

pub use arena::{Attributes, NodeData, NodeId, Tree, TreeHooks, TreeNode};
pub use errors::{ConfigError, SheetError, SheetResult, TreeError, TreeResult};
pub use sheet::{unmerge_and_fill_cells, CellRef, CellValue, MergedRegion, Range, Worksheet};
pub use traverse::Order;
pub use tree_traits::TreeNodeConvert;
