//! Serializes a dense integer genotype matrix to a `.bed` file, one variant
//! block at a time, writing to a temporary sibling file and renaming into
//! place so a failure mid-stream never leaves a partial file at the
//! caller-visible path.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::ArrayView2;

use crate::codec;
use crate::error::{CustomError, Result};

/// Maps a decoded value back to its 2-bit raw code. `value` must be one of
/// `0`, `1`, `2`, or the missing sentinel (`-127` for the integer matrices
/// this writer accepts); anything else is `InvalidGenotype`.
fn value_to_raw(value: i8, count_a1: bool, row: usize, col: usize) -> Result<u8> {
    let count = match value {
        -127 => return Ok(0b01),
        0 | 1 | 2 => value as u8,
        other => {
            return Err(CustomError::InvalidGenotype {
                value: other as f64,
                row,
                col,
            });
        }
    };
    let count = if count_a1 { count } else { 2 - count };
    Ok(match count {
        2 => 0b00,
        1 => 0b10,
        0 => 0b11,
        _ => unreachable!("count out of 0..=2"),
    })
}

/// Writes `values` (shape `(iid_count, sid_count)`, one row per individual)
/// to `path` as a SNP-major `.bed` file under the given counting
/// convention.
pub fn write(path: &Path, values: ArrayView2<i8>, count_a1: bool) -> Result<()> {
    let (iid_count, sid_count) = values.dim();
    let bpv = codec::bytes_per_variant(iid_count);

    let tmp_path = sibling_tmp_path(path);
    {
        let file = File::create(&tmp_path).map_err(|e| CustomError::Write {
            source: e,
            path: tmp_path.clone(),
        })?;
        let mut out = BufWriter::new(file);
        out.write_all(&codec::MAGIC).map_err(|e| CustomError::Write {
            source: e,
            path: tmp_path.clone(),
        })?;

        let mut block = vec![0u8; bpv];
        for col in 0..sid_count {
            block.iter_mut().for_each(|b| *b = 0);
            for row in 0..iid_count {
                let raw = value_to_raw(values[[row, col]], count_a1, row, col)?;
                let byte_idx = row / 4;
                let shift = (row % 4) * 2;
                block[byte_idx] |= raw << shift;
            }
            out.write_all(&block).map_err(|e| CustomError::Write {
                source: e,
                path: tmp_path.clone(),
            })?;
        }
        out.flush().map_err(|e| CustomError::Write {
            source: e,
            path: tmp_path.clone(),
        })?;
    }

    std::fs::rename(&tmp_path, path).map_err(|e| CustomError::Write {
        source: e,
        path: path.to_path_buf(),
    })?;
    Ok(())
}

fn sibling_tmp_path(path: &Path) -> std::path::PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
