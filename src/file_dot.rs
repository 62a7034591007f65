//! Streaming symmetric Gram accumulator: `G = AᵀA` for a tall, column-major
//! `float64` matrix that may be larger than RAM. Only the lower triangle is
//! computed from the memory map; the upper triangle is mirrored at the end.

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{Array2, ArrayViewMut1, Axis};

use crate::error::Result;
use crate::mmap_matrix::MmapMatrix;
use crate::threadpool::BedThreadPool;

/// Computes `G = AᵀA` for the `iid_count x sid_count` column-major matrix
/// stored at `offset` in the file at `path`, processing `sid_step` columns
/// of the right-hand block at a time. `log_frequency > 0` emits a progress
/// update through the ambient progress bar every that many blocks.
pub fn file_dot(
    path: &Path,
    offset: usize,
    iid_count: usize,
    sid_count: usize,
    sid_step: usize,
    log_frequency: usize,
    pool: &BedThreadPool,
) -> Result<Array2<f64>> {
    let matrix = MmapMatrix::open(path, offset, iid_count, sid_count)?;
    let mut g = Array2::<f64>::zeros((sid_count, sid_count));
    if sid_count == 0 || sid_step == 0 {
        return Ok(g);
    }

    let total_blocks = sid_count.div_ceil(sid_step);
    let progress = build_progress(log_frequency, total_blocks, "blocks");

    let mut s = 0;
    let mut block_num = 0;
    while s < sid_count {
        let w = sid_step.min(sid_count - s);
        let slab: Vec<Vec<f64>> = (0..w).map(|j| matrix.column(s + j)).collect();

        compute_block(&matrix, &mut g, s, w, &slab, pool);

        s += w;
        block_num += 1;
        if let Some(pb) = &progress
            && log_frequency > 0
            && block_num % log_frequency == 0
        {
            pb.set_position(block_num as u64);
        }
    }
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    for i in 0..sid_count {
        for j in (i + 1)..sid_count {
            g[[i, j]] = g[[j, i]];
        }
    }
    Ok(g)
}

/// Fills `g[s.., s..s+w]` with `Aᵀ[r] · A[s:s+w]` for every `r` in
/// `[s, sid_count)`, parallelizing over the row-block dimension.
fn compute_block(
    matrix: &MmapMatrix,
    g: &mut Array2<f64>,
    s: usize,
    w: usize,
    slab: &[Vec<f64>],
    pool: &BedThreadPool,
) {
    let sid_count = matrix.sid_count();
    let n_rows = sid_count - s;
    if n_rows == 0 {
        return;
    }

    let shard_ranges = pool.shard_ranges(n_rows);
    let mut remaining: Vec<ArrayViewMut1<f64>> = g
        .slice_mut(ndarray::s![s.., s..s + w])
        .axis_iter_mut(Axis(0))
        .collect();
    let mut shard_rows: Vec<Vec<ArrayViewMut1<f64>>> = Vec::with_capacity(shard_ranges.len());
    for range in &shard_ranges {
        let tail = remaining.split_off(range.len().min(remaining.len()));
        shard_rows.push(std::mem::replace(&mut remaining, tail));
    }

    pool.scope(|scope| {
        for (range, rows) in shard_ranges.into_iter().zip(shard_rows.into_iter()) {
            scope.spawn(move |_| {
                for (local_r, mut row) in range.clone().zip(rows.into_iter()) {
                    let r = s + local_r;
                    let col_r = matrix.column(r);
                    for (j, slab_col) in slab.iter().enumerate() {
                        let dot: f64 = col_r.iter().zip(slab_col.iter()).map(|(a, b)| a * b).sum();
                        row[j] = dot;
                    }
                }
            });
        }
    });
}

fn build_progress(log_frequency: usize, total: usize, unit: &str) -> Option<ProgressBar> {
    if log_frequency == 0 {
        return None;
    }
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::with_template(&format!("[{{elapsed_precise}}] {{bar:30}} {{pos}}/{{len}} {unit}"))
            .unwrap(),
    );
    Some(pb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threadpool::BedThreadPool;
    use std::io::Write;

    fn write_column_major(path: &Path, offset: usize, columns: &[&[f64]]) {
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(&vec![0u8; offset]).unwrap();
        for col in columns {
            for &v in *col {
                f.write_all(&v.to_le_bytes()).unwrap();
            }
        }
    }

    #[test]
    fn s5_small_gram_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        // A = [[1,2,3],[4,5,6]] (2 rows x 3 cols), column-major storage
        write_column_major(&path, 0, &[&[1.0, 4.0], &[2.0, 5.0], &[3.0, 6.0]]);

        let pool = BedThreadPool::new(2).unwrap();
        let g = file_dot(&path, 0, 2, 3, 2, 0, &pool).unwrap();

        let expected = [
            [17.0, 22.0, 27.0],
            [22.0, 29.0, 36.0],
            [27.0, 36.0, 45.0],
        ];
        for i in 0..3 {
            for j in 0..3 {
                assert!(
                    (g[[i, j]] - expected[i][j]).abs() < 1e-10,
                    "i={i} j={j} got={} want={}",
                    g[[i, j]],
                    expected[i][j]
                );
            }
        }
    }

    #[test]
    fn gram_matrix_is_symmetric_for_larger_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        let iid_count = 11;
        let sid_count = 7;
        let columns: Vec<Vec<f64>> = (0..sid_count)
            .map(|c| (0..iid_count).map(|r| (r * 13 + c * 7) as f64 * 0.1).collect())
            .collect();
        let refs: Vec<&[f64]> = columns.iter().map(|c| c.as_slice()).collect();
        write_column_major(&path, 8, &refs);

        let pool = BedThreadPool::new(3).unwrap();
        let g = file_dot(&path, 8, iid_count, sid_count, 3, 0, &pool).unwrap();
        for i in 0..sid_count {
            for j in 0..sid_count {
                assert!((g[[i, j]] - g[[j, i]]).abs() < 1e-10, "i={i} j={j}");
            }
        }
        // Spot check against a naive dot product.
        let naive: f64 = columns[2].iter().zip(columns[5].iter()).map(|(a, b)| a * b).sum();
        assert!((g[[2, 5]] - naive).abs() < 1e-10);
    }
}
