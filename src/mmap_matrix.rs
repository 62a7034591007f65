//! A thin view over a memory-mapped, column-major `float64` matrix stored
//! at a fixed byte offset inside an arbitrary file. `FileDot` and
//! `FileBLessAATB` both stream individual columns out of this without ever
//! materializing the whole matrix, so `A` may be larger than RAM.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{CustomError, Result};

pub struct MmapMatrix {
    mmap: Mmap,
    offset: usize,
    iid_count: usize,
    sid_count: usize,
}

impl MmapMatrix {
    pub fn open(path: &Path, offset: usize, iid_count: usize, sid_count: usize) -> Result<Self> {
        let with_path = |source: std::io::Error| CustomError::ReadWithPath {
            source,
            path: path.to_path_buf(),
        };
        let file = File::open(path).map_err(with_path)?;
        let needed = offset + iid_count * sid_count * size_of::<f64>();
        let actual = file.metadata().map_err(with_path)?.len();
        if actual < needed as u64 {
            return Err(CustomError::Truncated {
                expected: needed as u64,
                found: actual,
                iid_count,
                sid_count,
            });
        }
        // Safety: the file is not expected to be mutated concurrently by
        // another process for the lifetime of this mapping; the caller
        // owns exclusive access to the path for the duration of the call.
        let mmap = unsafe { Mmap::map(&file) }.map_err(with_path)?;
        Ok(Self {
            mmap,
            offset,
            iid_count,
            sid_count,
        })
    }

    pub fn iid_count(&self) -> usize {
        self.iid_count
    }

    pub fn sid_count(&self) -> usize {
        self.sid_count
    }

    /// Reads column `col` into a freshly-allocated `Vec<f64>` of length
    /// `iid_count`, decoding little-endian `f64` values directly out of the
    /// memory map.
    pub fn column(&self, col: usize) -> Vec<f64> {
        let start = self.offset + col * self.iid_count * size_of::<f64>();
        let mut out = Vec::with_capacity(self.iid_count);
        for row in 0..self.iid_count {
            let byte_offset = start + row * size_of::<f64>();
            let bytes: [u8; 8] = self.mmap[byte_offset..byte_offset + 8]
                .try_into()
                .expect("exactly 8 bytes");
            out.push(f64::from_le_bytes(bytes));
        }
        out
    }
}
