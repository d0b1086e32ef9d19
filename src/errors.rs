use std::path::PathBuf;
use thiserror::Error;

use crate::arena::NodeId;
use crate::sheet::{CellRef, Range};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Cannot attach {node} below {parent}: {node} is an ancestor of (or equal to) {parent}")]
    Cycle { node: NodeId, parent: NodeId },

    #[error("Node not found in tree: {0}")]
    NodeNotFound(NodeId),

    #[error("Cannot add node {0} multiple times as child")]
    DuplicateChild(NodeId),

    #[error("Change to {node} rejected: {reason}")]
    Rejected { node: NodeId, reason: String },
}

pub type TreeResult<T> = Result<T, TreeError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SheetError {
    #[error("Invalid merged region {region}: {reason}")]
    InvalidRegion { region: Range, reason: String },

    #[error("Cell {cell} is outside the worksheet ({rows} rows x {cols} columns)")]
    OutOfBounds { cell: CellRef, rows: u32, cols: u32 },

    #[error("Invalid worksheet dimensions: {rows} rows x {cols} columns (limit {max_rows} x {max_cols})")]
    InvalidDimensions {
        rows: u32,
        cols: u32,
        max_rows: u32,
        max_cols: u32,
    },

    #[error("Failed to parse reference: {0}")]
    Parse(String),
}

pub type SheetResult<T> = Result<T, SheetError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Config source error: {0}")]
    Source(#[from] config::ConfigError),

    #[error("Failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
