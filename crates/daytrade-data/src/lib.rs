//! Historical bar loading.
//!
//! Bars are read in file order. Ordering and completeness are checked by
//! the engine, which halts on a gap rather than repairing it here.

mod csv_source;

pub use csv_source::CsvDataSource;

use std::path::{Path, PathBuf};

use daytrade_core::error::DataError;
use daytrade_core::types::Bar;

/// Resolve the CSV file for `symbol`.
///
/// `data` is either a single CSV file or a directory holding
/// `<SYMBOL>.csv` files (upper- or lowercase).
pub fn symbol_path(data: &Path, symbol: &str) -> Result<PathBuf, DataError> {
    if data.is_file() {
        return Ok(data.to_path_buf());
    }
    if !data.is_dir() {
        return Err(DataError::NoDataAvailable(data.display().to_string()));
    }
    [symbol.to_uppercase(), symbol.to_lowercase(), symbol.to_string()]
        .iter()
        .map(|name| data.join(format!("{name}.csv")))
        .find(|path| path.is_file())
        .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))
}

/// Load the bars for `symbol` from a file or directory.
pub fn load_symbol(data: &Path, symbol: &str) -> Result<Vec<Bar>, DataError> {
    let path = symbol_path(data, symbol)?;
    CsvDataSource::new(&path)?.load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CSV: &str = "timestamp,open,high,low,close,volume\n\
                       2024-01-15 09:30:00,100,101,99,100.5,1000\n";

    #[test]
    fn test_symbol_path_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("AAPL.csv"), CSV).unwrap();
        fs::write(dir.path().join("msft.csv"), CSV).unwrap();

        assert_eq!(symbol_path(dir.path(), "aapl").unwrap(), dir.path().join("AAPL.csv"));
        assert_eq!(symbol_path(dir.path(), "MSFT").unwrap(), dir.path().join("msft.csv"));
        assert!(matches!(
            symbol_path(dir.path(), "TSLA"),
            Err(DataError::SymbolNotFound(s)) if s == "TSLA"
        ));
    }

    #[test]
    fn test_single_file_serves_any_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bars.csv");
        fs::write(&file, CSV).unwrap();

        let bars = load_symbol(&file, "ANY").unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 100.5);
    }

    #[test]
    fn test_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            load_symbol(&missing, "AAPL"),
            Err(DataError::NoDataAvailable(_))
        ));
    }
}
