//! Subset-read engine: decode selected (row, variant) cells from a `.bed`
//! file into a caller-supplied dense output, fanning the variant dimension
//! across the shared thread pool.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use ndarray::{Array2, ArrayViewMut1, ArrayViewMut2, Axis, ShapeBuilder};

use crate::codec::{self, DecodeTable, GenotypeValue};
use crate::dtype::{Dtype, Layout};
use crate::error::{CustomError, Result};
use crate::index::BoundedIndex;
use crate::threadpool::{BedThreadPool, resolve_num_threads};

/// Validates the header and declared geometry against the file on disk.
/// Called eagerly unless the caller defers it with `skip_format_check`.
pub fn validate_geometry(path: &Path, iid_count: usize, sid_count: usize) -> Result<()> {
    let with_path = |source: std::io::Error| CustomError::ReadWithPath {
        source,
        path: path.to_path_buf(),
    };
    let mut file = File::open(path).map_err(with_path)?;
    let mut header = [0u8; 3];
    file.read_exact(&mut header).map_err(with_path)?;
    codec::validate_header(header)?;

    let expected = codec::expected_file_size(iid_count, sid_count);
    let actual = file.metadata().map_err(with_path)?.len();
    if actual != expected {
        return Err(CustomError::Truncated {
            expected,
            found: actual,
            iid_count,
            sid_count,
        });
    }
    Ok(())
}

/// A fully-resolved request to read a subset of a `.bed` file.
pub struct ReadRequest<'a> {
    pub path: &'a Path,
    pub iid_count: usize,
    pub sid_count: usize,
    pub count_a1: bool,
    /// `None` means "every individual", matching the full dimension.
    pub row_index: Option<&'a [i64]>,
    /// `None` means "every variant".
    pub variant_index: Option<&'a [i64]>,
    pub dtype: Dtype,
    pub layout: Layout,
    pub skip_format_check: bool,
    pub num_threads: Option<i64>,
}

/// A decoded subset, tagged by the element type that was requested.
pub enum DecodedMatrix {
    I8(Array2<i8>),
    F32(Array2<f32>),
    F64(Array2<f64>),
}

impl DecodedMatrix {
    pub fn shape(&self) -> (usize, usize) {
        match self {
            DecodedMatrix::I8(a) => a.dim(),
            DecodedMatrix::F32(a) => a.dim(),
            DecodedMatrix::F64(a) => a.dim(),
        }
    }
}

/// Resolves indices, allocates an output buffer of the requested dtype and
/// layout, and performs the subset read.
pub fn read(request: &ReadRequest) -> Result<DecodedMatrix> {
    let rows = resolve_index(request.row_index, request.iid_count)?;
    let variants = resolve_index(request.variant_index, request.sid_count)?;
    let pool = BedThreadPool::new(resolve_num_threads(request.num_threads, None)?)?;

    let matrix = match request.dtype {
        Dtype::I8 => {
            let mut out = allocate::<i8>(rows.len(), variants.len(), request.layout);
            read_subset(
                request.path,
                request.iid_count,
                request.sid_count,
                request.count_a1,
                &rows,
                &variants,
                out.view_mut(),
                request.skip_format_check,
                &pool,
            )?;
            DecodedMatrix::I8(out)
        }
        Dtype::F32 => {
            let mut out = allocate::<f32>(rows.len(), variants.len(), request.layout);
            read_subset(
                request.path,
                request.iid_count,
                request.sid_count,
                request.count_a1,
                &rows,
                &variants,
                out.view_mut(),
                request.skip_format_check,
                &pool,
            )?;
            DecodedMatrix::F32(out)
        }
        Dtype::F64 => {
            let mut out = allocate::<f64>(rows.len(), variants.len(), request.layout);
            read_subset(
                request.path,
                request.iid_count,
                request.sid_count,
                request.count_a1,
                &rows,
                &variants,
                out.view_mut(),
                request.skip_format_check,
                &pool,
            )?;
            DecodedMatrix::F64(out)
        }
    };
    Ok(matrix)
}

fn resolve_index(raw: Option<&[i64]>, bound: usize) -> Result<BoundedIndex> {
    match raw {
        Some(raw) => BoundedIndex::validate(raw, bound),
        None => Ok(BoundedIndex::full(bound)),
    }
}

fn allocate<V>(nrows: usize, ncols: usize, layout: Layout) -> Array2<V>
where
    V: Clone + num_traits::Zero,
{
    match layout {
        Layout::RowMajor => Array2::zeros((nrows, ncols)),
        Layout::ColumnMajor => Array2::zeros((nrows, ncols).f()),
    }
}

/// Decodes the selected (row, variant) cells into `out`, fanning variant
/// shards across `pool`. `out` must already have shape
/// `(rows.len(), variants.len())`.
#[allow(clippy::too_many_arguments)]
pub fn read_subset<V: GenotypeValue>(
    path: &Path,
    iid_count: usize,
    sid_count: usize,
    count_a1: bool,
    rows: &BoundedIndex,
    variants: &BoundedIndex,
    mut out: ArrayViewMut2<V>,
    skip_format_check: bool,
    pool: &BedThreadPool,
) -> Result<()> {
    if !skip_format_check {
        validate_geometry(path, iid_count, sid_count)?;
    }
    if rows.is_empty() || variants.is_empty() {
        return Ok(());
    }

    let bpv = codec::bytes_per_variant(iid_count);
    let table = DecodeTable::<V>::build(count_a1);
    let row_positions = rows.as_slice();
    let variant_positions = variants.as_slice();

    let shard_ranges = pool.shard_ranges(variants.len());
    let mut remaining: Vec<ArrayViewMut1<V>> = out.axis_iter_mut(Axis(1)).collect();
    let mut shard_columns: Vec<Vec<ArrayViewMut1<V>>> = Vec::with_capacity(shard_ranges.len());
    for range in &shard_ranges {
        let tail = remaining.split_off(range.len().min(remaining.len()));
        shard_columns.push(std::mem::replace(&mut remaining, tail));
    }

    let mut errors: Vec<Option<CustomError>> = (0..shard_ranges.len()).map(|_| None).collect();
    pool.scope(|scope| {
        for ((range, columns), slot) in shard_ranges
            .into_iter()
            .zip(shard_columns.into_iter())
            .zip(errors.iter_mut())
        {
            let table = &table;
            scope.spawn(move |_| {
                let result = read_shard(
                    path,
                    bpv,
                    row_positions,
                    &variant_positions[range],
                    columns,
                    table,
                );
                if let Err(e) = result {
                    *slot = Some(e);
                }
            });
        }
    });

    for slot in errors {
        if let Some(e) = slot {
            return Err(e);
        }
    }
    Ok(())
}

fn read_shard<V: GenotypeValue>(
    path: &Path,
    bytes_per_variant: usize,
    row_positions: &[usize],
    variant_positions: &[usize],
    mut columns: Vec<ArrayViewMut1<V>>,
    table: &DecodeTable<V>,
) -> Result<()> {
    let with_path = |source: std::io::Error| CustomError::ReadWithPath {
        source,
        path: path.to_path_buf(),
    };
    let mut file = File::open(path).map_err(with_path)?;
    let mut block = vec![0u8; bytes_per_variant];

    for (&variant_pos, column) in variant_positions.iter().zip(columns.iter_mut()) {
        let offset = codec::variant_offset(variant_pos, bytes_per_variant);
        file.seek(SeekFrom::Start(offset)).map_err(with_path)?;
        file.read_exact(&mut block).map_err(with_path)?;
        for (r, &row) in row_positions.iter().enumerate() {
            let byte = block[row / 4];
            let slot = row % 4;
            column[r] = table.decode(byte, slot);
        }
    }
    Ok(())
}
