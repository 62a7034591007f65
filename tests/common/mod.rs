use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

const PLINK_HEADER: [u8; 3] = [0x6c, 0x1b, 0x01];

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// A small 3-individual x 4-variant dataset matching the decoder's S1 fixture:
/// rows (A1-counted) are [1,0,NaN,0], [2,0,NaN,2], [0,1,2,0].
pub struct Dataset {
    pub dir: PathBuf,
    pub bed: PathBuf,
    pub fam: PathBuf,
    pub bim: PathBuf,
    pub iid_count: usize,
    pub sid_count: usize,
}

fn unique_dir(label: &str) -> PathBuf {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir()
        .join("bedrs-cli-tests")
        .join(format!("{}-{}-{}", std::process::id(), id, label));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write_small_dataset(label: &str) -> Dataset {
    let dir = unique_dir(label);
    let bed = dir.join("small.bed");
    let fam = dir.join("small.fam");
    let bim = dir.join("small.bim");

    let mut f = File::create(&bed).unwrap();
    f.write_all(&PLINK_HEADER).unwrap();
    f.write_all(&[0b11_00_10]).unwrap();
    f.write_all(&[0b10_11_11]).unwrap();
    f.write_all(&[0b00_01_01]).unwrap();
    f.write_all(&[0b11_00_11]).unwrap();
    drop(f);

    let mut fam_file = File::create(&fam).unwrap();
    for i in 1..=3 {
        writeln!(fam_file, "FAM IND{i} 0 0 1 -9").unwrap();
    }
    drop(fam_file);

    let mut bim_file = File::create(&bim).unwrap();
    for i in 1..=4 {
        writeln!(bim_file, "1\trs{i}\t0.0\t{i}\tA\tG").unwrap();
    }
    drop(bim_file);

    Dataset {
        dir,
        bed,
        fam,
        bim,
        iid_count: 3,
        sid_count: 4,
    }
}

/// Writes a column-major `f64` matrix to `path`, zero-padded by `offset`
/// leading bytes, for the `dot` / `b-less-aatb` numerical routines.
pub fn write_column_major_f64(path: &Path, offset: usize, columns: &[Vec<f64>]) {
    let mut f = File::create(path).unwrap();
    f.write_all(&vec![0u8; offset]).unwrap();
    for col in columns {
        for &v in col {
            f.write_all(&v.to_le_bytes()).unwrap();
        }
    }
}

pub fn linspace(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![0.0; n];
    }
    (0..n).map(|i| i as f64 / (n - 1) as f64).collect()
}
