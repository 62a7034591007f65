//! Streams `A` from a column-major `float64` matrix file once, updating
//! `aTb = AᵀB` and `aaTb = B − A·(AᵀB)` as it goes, rank-1 at a time.

use std::ops::Range;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{Array2, ArrayView2, ArrayViewMut1, Axis};

use crate::error::{CustomError, Result};
use crate::mmap_matrix::MmapMatrix;
use crate::threadpool::BedThreadPool;

/// Computes `aTb = AᵀB` and `aaTb = B − A·aTb` for the `iid_count x
/// sid_count` column-major matrix `A` stored at `offset` in the file at
/// `path`, and the in-memory `B` (`iid_count x b_cols`). `log_frequency >
/// 0` emits a progress update through the ambient progress bar every that
/// many streamed columns of `A`.
pub fn file_b_less_aatb(
    path: &Path,
    offset: usize,
    iid_count: usize,
    sid_count: usize,
    b: ArrayView2<f64>,
    log_frequency: usize,
    pool: &BedThreadPool,
) -> Result<(Array2<f64>, Array2<f64>)> {
    let (b_rows, b_cols) = b.dim();
    if b_rows != iid_count {
        return Err(CustomError::InvalidConfiguration {
            message: format!("B has {b_rows} rows but iid_count is {iid_count}"),
        });
    }

    let matrix = MmapMatrix::open(path, offset, iid_count, sid_count)?;
    let mut a_t_b = Array2::<f64>::zeros((sid_count, b_cols));
    let mut aa_tb = b.to_owned();

    if sid_count == 0 || b_cols == 0 {
        return Ok((a_t_b, aa_tb));
    }

    let shard_ranges = pool.shard_ranges(b_cols);
    let progress = build_progress(log_frequency, sid_count);

    for i in 0..sid_count {
        let a_i = matrix.column(i);

        {
            let row = a_t_b.row_mut(i);
            let chunks = split_1d(row, &shard_ranges);
            pool.scope(|scope| {
                for (range, mut chunk) in shard_ranges.iter().cloned().zip(chunks.into_iter()) {
                    let a_i = &a_i;
                    let b = &b;
                    scope.spawn(move |_| {
                        for (local, c) in range.enumerate() {
                            let mut sum = 0.0;
                            for r in 0..iid_count {
                                sum += a_i[r] * b[[r, c]];
                            }
                            chunk[local] = sum;
                        }
                    });
                }
            });
        }

        {
            let a_t_b_row: Vec<f64> = a_t_b.row(i).to_vec();
            let columns: Vec<ArrayViewMut1<f64>> = aa_tb.axis_iter_mut(Axis(1)).collect();
            let shard_cols = split_groups(columns, &shard_ranges);
            pool.scope(|scope| {
                for (range, cols) in shard_ranges.iter().cloned().zip(shard_cols.into_iter()) {
                    let a_i = &a_i;
                    let a_t_b_row = &a_t_b_row;
                    scope.spawn(move |_| {
                        for (local, mut col) in cols.into_iter().enumerate() {
                            let c = range.start + local;
                            let coeff = a_t_b_row[c];
                            for r in 0..iid_count {
                                col[r] -= a_i[r] * coeff;
                            }
                        }
                    });
                }
            });
        }

        if let Some(pb) = &progress
            && log_frequency > 0
            && (i + 1) % log_frequency == 0
        {
            pb.set_position((i + 1) as u64);
        }
    }
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    Ok((a_t_b, aa_tb))
}

fn split_1d<'a>(
    mut view: ArrayViewMut1<'a, f64>,
    shard_ranges: &[Range<usize>],
) -> Vec<ArrayViewMut1<'a, f64>> {
    let mut out = Vec::with_capacity(shard_ranges.len());
    for range in shard_ranges {
        let len = range.len().min(view.len());
        let (left, right) = view.split_at(Axis(0), len);
        out.push(left);
        view = right;
    }
    out
}

fn split_groups<'a>(
    mut items: Vec<ArrayViewMut1<'a, f64>>,
    shard_ranges: &[Range<usize>],
) -> Vec<Vec<ArrayViewMut1<'a, f64>>> {
    let mut out = Vec::with_capacity(shard_ranges.len());
    for range in shard_ranges {
        let tail = items.split_off(range.len().min(items.len()));
        out.push(std::mem::replace(&mut items, tail));
    }
    out
}

fn build_progress(log_frequency: usize, total: usize) -> Option<ProgressBar> {
    if log_frequency == 0 {
        return None;
    }
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:30} {pos}/{len} columns").unwrap(),
    );
    Some(pb)
}
