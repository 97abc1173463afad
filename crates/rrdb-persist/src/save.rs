//! `Save` memory mode: a plain file, written in full on an explicit
//! `save()` call and read back in full at startup. No continuous mapping,
//! so there's nothing to keep open between saves.

use crate::error::PersistError;
use crate::framing::{checksum_for, decode, encode};
use crate::header::{ChartFileHeader, DimensionFileHeader};
use std::fs;
use std::path::Path;

fn io_err(path: &Path, source: std::io::Error) -> PersistError {
    PersistError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Writes a dimension's header and current values to `path`, replacing any
/// existing file. `header.checksum` is overwritten with the checksum of
/// `values` before serializing.
pub fn save_dimension(path: &Path, mut header: DimensionFileHeader, values: &[i32]) -> Result<(), PersistError> {
    header.checksum = checksum_for(values);
    let bytes = encode(&header, values)?;
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, &bytes).map_err(|e| io_err(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

/// Loads a dimension's header and values back from `path`, verifying the
/// magic and checksum.
pub fn load_dimension(path: &Path) -> Result<(DimensionFileHeader, Vec<i32>), PersistError> {
    let bytes = fs::read(path).map_err(|e| io_err(path, e))?;
    let path_str = path.display().to_string();
    let (header, values): (DimensionFileHeader, Vec<i32>) = decode(&path_str, &bytes)?;

    if header.magic != crate::header::DIMENSION_MAGIC {
        return Err(PersistError::MagicMismatch {
            path: path_str,
            expected: crate::header::DIMENSION_MAGIC,
            found: header.magic.clone(),
        });
    }
    let computed = checksum_for(&values);
    if computed != header.checksum {
        return Err(PersistError::ChecksumMismatch {
            path: path_str,
            expected: header.checksum,
            computed,
        });
    }
    Ok((header, values))
}

/// Writes a chart's metadata file, replacing any existing one. There is no
/// value array to checksum; the checksum covers only the header fields.
pub fn save_chart_header(path: &Path, mut header: ChartFileHeader) -> Result<(), PersistError> {
    header.checksum = checksum_for(&[]);
    let bytes = encode(&header, &[])?;
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, &bytes).map_err(|e| io_err(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

/// Loads a chart's metadata file back from `path`, verifying its magic.
pub fn load_chart_header(path: &Path) -> Result<ChartFileHeader, PersistError> {
    let bytes = fs::read(path).map_err(|e| io_err(path, e))?;
    let path_str = path.display().to_string();
    let (header, _values): (ChartFileHeader, Vec<i32>) = decode(&path_str, &bytes)?;

    if header.magic != crate::header::CHART_MAGIC {
        return Err(PersistError::MagicMismatch {
            path: path_str,
            expected: crate::header::CHART_MAGIC,
            found: header.magic.clone(),
        });
    }
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_header_and_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("received.db");
        let header = DimensionFileHeader::new(
            "received".to_string(),
            "received".to_string(),
            8,
            1000,
            1,
            5,
            2,
            10,
            100,
        );
        let values = vec![1, 2, 3, 4, 5];
        save_dimension(&path, header.clone(), &values).unwrap();

        let (loaded_header, loaded_values) = load_dimension(&path).unwrap();
        assert_eq!(loaded_header.id, header.id);
        assert_eq!(loaded_header.entries, header.entries);
        assert_eq!(loaded_values, values);
    }

    #[test]
    fn detects_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("received.db");
        let header = DimensionFileHeader::new("received".to_string(), "received".to_string(), 1, 1, 1, 3, 0, 0, 0);
        save_dimension(&path, header, &[1, 2, 3]).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();

        assert!(load_dimension(&path).is_err());
    }

    #[test]
    fn chart_header_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chart.meta");
        let header = ChartFileHeader::new(
            "net.eth0".to_string(),
            "net".to_string(),
            "eth0".to_string(),
            "network".to_string(),
            "net.net".to_string(),
            "kilobits/s".to_string(),
            100,
            1,
            60,
        );
        save_chart_header(&path, header.clone()).unwrap();

        let loaded = load_chart_header(&path).unwrap();
        assert_eq!(loaded.id, header.id);
        assert_eq!(loaded.entries, header.entries);
    }
}
