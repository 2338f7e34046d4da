//! Data loading and inspection
//!
//! Tables are loaded wholesale into a polars `DataFrame`; there is no
//! chunking or streaming.

pub mod columns;
pub mod loader;
pub mod summary;

pub use self::loader::{
    load_data, load_from_bytes, load_from_reader, write_parquet, DataFormat,
};
pub use self::summary::{
    infer_column_roles, target_distribution, value_counts, ColumnRoles, DatasetSummary,
    TargetDistribution,
};
