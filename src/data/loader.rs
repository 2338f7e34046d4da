//! Format-agnostic tabular loader
//!
//! Supports loading whole tables from:
//! - CSV files with a header row (schema inferred from every row)
//! - Parquet files
//!
//! The format is chosen by file extension; anything unrecognised is read as CSV.

use crate::core::Result;
use log::{info, warn};
use polars::prelude::*;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

/// On-disk table formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Parquet,
}

impl DataFormat {
    /// Detect the format from a file extension, defaulting to CSV
    pub fn detect<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .as_deref()
        {
            Some("parquet") | Some("pq") => DataFormat::Parquet,
            Some("csv") | Some("txt") => DataFormat::Csv,
            Some(other) => {
                warn!("Unknown file extension '{other}', assuming CSV");
                DataFormat::Csv
            }
            None => {
                warn!("No file extension, assuming CSV");
                DataFormat::Csv
            }
        }
    }
}

/// Load a table from a file, choosing the reader by extension
pub fn load_data<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let path = path.as_ref();
    let format = DataFormat::detect(path);
    let df = match format {
        DataFormat::Csv => csv_options()
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?,
        DataFormat::Parquet => ParquetReader::new(File::open(path)?).finish()?,
    };

    info!(
        "Loaded {:?} as {format:?}: {} rows x {} columns",
        path,
        df.height(),
        df.width()
    );
    Ok(df)
}

/// Load a table from an in-memory buffer, e.g. an uploaded file
pub fn load_from_bytes(bytes: Vec<u8>, format: DataFormat) -> Result<DataFrame> {
    let cursor = Cursor::new(bytes);
    let df = match format {
        DataFormat::Csv => csv_options().into_reader_with_file_handle(cursor).finish()?,
        DataFormat::Parquet => ParquetReader::new(cursor).finish()?,
    };
    Ok(df)
}

/// Load a table from any reader by buffering it fully
pub fn load_from_reader<R: Read>(mut reader: R, format: DataFormat) -> Result<DataFrame> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    load_from_bytes(bytes, format)
}

fn csv_options() -> CsvReadOptions {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
}

/// Write a table as Parquet
pub fn write_parquet<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> Result<()> {
    let file = File::create(path)?;
    ParquetWriter::new(file).finish(df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_format_detection() {
        assert_eq!(DataFormat::detect("data.csv"), DataFormat::Csv);
        assert_eq!(DataFormat::detect("data.CSV"), DataFormat::Csv);
        assert_eq!(DataFormat::detect("data.parquet"), DataFormat::Parquet);
        assert_eq!(DataFormat::detect("data.pq"), DataFormat::Parquet);
        assert_eq!(DataFormat::detect("data"), DataFormat::Csv);
        assert_eq!(DataFormat::detect("data.xlsx"), DataFormat::Csv);
    }

    #[test]
    fn test_load_csv_with_mixed_types() {
        let mut temp_file = NamedTempFile::with_suffix(".csv").expect("Failed to create temp file");
        writeln!(temp_file, "a,b,cat").expect("Failed to write");
        writeln!(temp_file, "1.5,3,x").expect("Failed to write");
        writeln!(temp_file, "2.5,4,y").expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        let df = load_data(temp_file.path()).unwrap();
        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.column("a").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("b").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("cat").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_late_float_widens_integer_column() {
        let mut csv = String::from("x,y\n");
        for i in 0..150 {
            csv.push_str(&format!("{i},{}\n", i % 2));
        }
        csv.push_str("1.5,0\n");

        let df = load_from_bytes(csv.into_bytes(), DataFormat::Csv).unwrap();
        assert_eq!(df.height(), 151);
        assert_eq!(df.column("x").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("y").unwrap().dtype(), &DataType::Int64);
        let x = df.column("x").unwrap().as_materialized_series().f64().unwrap();
        assert_eq!(x.get(150), Some(1.5));
    }

    #[test]
    fn test_load_from_bytes() {
        let bytes = b"x,y\n1,2\n3,4\n".to_vec();
        let df = load_from_bytes(bytes, DataFormat::Csv).unwrap();
        assert_eq!(df.shape(), (2, 2));
    }

    #[test]
    fn test_load_from_reader() {
        let reader: &[u8] = b"x,label\n1,a\n2,b\n3,a\n";
        let df = load_from_reader(reader, DataFormat::Csv).unwrap();
        assert_eq!(df.shape(), (3, 2));
    }

    #[test]
    fn test_missing_file() {
        assert!(load_data("does/not/exist.csv").is_err());
    }
}
