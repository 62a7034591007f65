use std::fs::File;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use ndarray::{Array2, ArrayBase, Data, Dimension};
use ndarray_npy::{NpzReader, ReadNpyExt, WritableElement, WriteNpyExt};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::dtype::{Dtype, Layout};
use crate::error::{CustomError, Result};
use crate::file_b_less_aatb::file_b_less_aatb;
use crate::file_dot::file_dot;
use crate::metadata::{read_bim, read_fam};
use crate::reader::{DecodedMatrix, ReadRequest, read, validate_geometry};
use crate::threadpool::{BedThreadPool, resolve_num_threads};
use crate::writer;

#[derive(Parser, Debug)]
#[command(version, about = "Decode, write, and run streaming numerical routines over PLINK .bed genotype matrices.")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a .bed header and report geometry, optionally peeking at sidecar metadata.
    Info {
        #[arg(long)]
        bed: PathBuf,
        #[arg(long)]
        fam: Option<PathBuf>,
        #[arg(long)]
        bim: Option<PathBuf>,
    },
    /// Decode a subset of a .bed file and write it to an .npz archive.
    Read {
        #[arg(long)]
        bed: PathBuf,
        #[arg(long)]
        fam: PathBuf,
        #[arg(long)]
        bim: PathBuf,
        #[arg(long)]
        rows: Option<String>,
        #[arg(long)]
        variants: Option<String>,
        #[arg(long, default_value = "f32")]
        dtype: String,
        #[arg(long, default_value = "C")]
        layout: String,
        #[arg(long)]
        count_a2: bool,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        num_threads: Option<i64>,
    },
    /// Round-trip a previously dumped .npz matrix back into a fresh .bed file.
    Write {
        #[arg(long = "in")]
        input: PathBuf,
        #[arg(long)]
        bed: PathBuf,
        #[arg(long)]
        count_a2: bool,
    },
    /// Stream a symmetric Gram matrix (AᵀA) from a column-major float64 file.
    Dot {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        iid_count: usize,
        #[arg(long)]
        sid_count: usize,
        #[arg(long, default_value_t = 500)]
        sid_step: usize,
        #[arg(long, default_value_t = 0)]
        log_frequency: usize,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        num_threads: Option<i64>,
    },
    /// Stream aTb = AᵀB and aaTb = B - A·aTb from a column-major float64 file.
    BLessAatb {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        iid_count: usize,
        #[arg(long)]
        sid_count: usize,
        #[arg(long)]
        b: PathBuf,
        #[arg(long, default_value_t = 0)]
        log_frequency: usize,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        num_threads: Option<i64>,
    },
}

fn parse_index_list(spec: &str) -> Result<Vec<i64>> {
    spec.split(',')
        .map(|field| field.trim())
        .filter(|field| !field.is_empty())
        .map(|field| {
            field.parse::<i64>().map_err(|_| CustomError::FieldParse {
                line_num: 0,
                file: "index list",
                value: field.to_string(),
            })
        })
        .collect()
}

fn zip_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated)
}

/// Builds a `.npz`-shaped zip archive one entry at a time: `ndarray-npy`
/// arrays plus arbitrary sidecar files (JSON id lists, in this crate's
/// case), in the same zip-plus-sidecar shape used elsewhere in the corpus.
struct NpzBuilder {
    zip: ZipWriter<File>,
    out: PathBuf,
}

impl NpzBuilder {
    fn create(out: &Path) -> Result<Self> {
        let file = File::create(out).map_err(|e| CustomError::Write {
            source: e,
            path: out.to_path_buf(),
        })?;
        Ok(Self {
            zip: ZipWriter::new(file),
            out: out.to_path_buf(),
        })
    }

    fn add_array<A, S, D>(&mut self, name: &str, array: &ArrayBase<S, D>) -> Result<()>
    where
        A: WritableElement,
        S: Data<Elem = A>,
        D: Dimension,
    {
        self.zip.start_file(format!("{name}.npy"), zip_options())?;
        array.write_npy(&mut self.zip).map_err(CustomError::from)
    }

    fn add_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.zip.start_file(name, zip_options())?;
        std::io::Write::write_all(&mut self.zip, bytes).map_err(|e| CustomError::Write {
            source: e,
            path: self.out.clone(),
        })
    }

    fn finish(self) -> Result<()> {
        self.zip.finish()?;
        Ok(())
    }
}

pub fn run(args: &Args) -> Result<()> {
    match &args.command {
        Command::Info { bed, fam, bim } => run_info(bed, fam.as_deref(), bim.as_deref()),
        Command::Read {
            bed,
            fam,
            bim,
            rows,
            variants,
            dtype,
            layout,
            count_a2,
            out,
            num_threads,
        } => run_read(
            bed,
            fam,
            bim,
            rows.as_deref(),
            variants.as_deref(),
            dtype,
            layout,
            *count_a2,
            out,
            *num_threads,
        ),
        Command::Write {
            input,
            bed,
            count_a2,
        } => run_write(input, bed, *count_a2),
        Command::Dot {
            path,
            offset,
            iid_count,
            sid_count,
            sid_step,
            log_frequency,
            out,
            num_threads,
        } => run_dot(
            path,
            *offset,
            *iid_count,
            *sid_count,
            *sid_step,
            *log_frequency,
            out,
            *num_threads,
        ),
        Command::BLessAatb {
            path,
            offset,
            iid_count,
            sid_count,
            b,
            log_frequency,
            out,
            num_threads,
        } => run_b_less_aatb(
            path,
            *offset,
            *iid_count,
            *sid_count,
            b,
            *log_frequency,
            out,
            *num_threads,
        ),
    }
}

fn run_info(bed: &Path, fam: Option<&Path>, bim: Option<&Path>) -> Result<()> {
    let fam_records = fam.map(read_fam).transpose()?;
    let bim_records = bim.map(read_bim).transpose()?;
    let iid_count = fam_records.as_ref().map(|r| r.len());
    let sid_count = bim_records.as_ref().map(|r| r.len());

    if let (Some(iid_count), Some(sid_count)) = (iid_count, sid_count) {
        validate_geometry(bed, iid_count, sid_count)?;
        println!("bed: {}", bed.display());
        println!("iid_count: {iid_count}");
        println!("sid_count: {sid_count}");
        println!(
            "file size: {} bytes",
            crate::codec::expected_file_size(iid_count, sid_count)
        );
    } else {
        let size = std::fs::metadata(bed)
            .map_err(|e| CustomError::ReadWithPath {
                source: e,
                path: bed.to_path_buf(),
            })?
            .len();
        println!("bed: {}", bed.display());
        println!("file size: {size} bytes (pass --fam/--bim for geometry validation)");
    }

    if let Some(records) = &fam_records {
        println!("first .fam records:");
        for record in records.iter().take(5) {
            println!("  {} {}", record.family_id, record.individual_id);
        }
    }
    if let Some(records) = &bim_records {
        println!("first .bim records:");
        for record in records.iter().take(5) {
            println!("  {} {}", record.chromosome, record.variant_id);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_read(
    bed: &Path,
    fam: &Path,
    bim: &Path,
    rows: Option<&str>,
    variants: Option<&str>,
    dtype: &str,
    layout: &str,
    count_a2: bool,
    out: &Path,
    num_threads: Option<i64>,
) -> Result<()> {
    let fam_records = read_fam(fam)?;
    let bim_records = read_bim(bim)?;
    let iid_count = fam_records.len();
    let sid_count = bim_records.len();

    let row_index = rows.map(parse_index_list).transpose()?;
    let variant_index = variants.map(parse_index_list).transpose()?;

    let request = ReadRequest {
        path: bed,
        iid_count,
        sid_count,
        count_a1: !count_a2,
        row_index: row_index.as_deref(),
        variant_index: variant_index.as_deref(),
        dtype: Dtype::parse(dtype)?,
        layout: Layout::parse(layout)?,
        skip_format_check: false,
        num_threads,
    };
    let decoded = read(&request)?;

    let row_ids: Vec<String> = row_index
        .as_deref()
        .map(|idx| idx.iter().map(|&i| fam_records[i as usize].individual_id.clone()).collect())
        .unwrap_or_else(|| fam_records.iter().map(|r| r.individual_id.clone()).collect());
    let variant_ids: Vec<String> = variant_index
        .as_deref()
        .map(|idx| idx.iter().map(|&i| bim_records[i as usize].variant_id.clone()).collect())
        .unwrap_or_else(|| bim_records.iter().map(|r| r.variant_id.clone()).collect());

    let row_ids_json = serde_json::to_vec(&row_ids)?;
    let variant_ids_json = serde_json::to_vec(&variant_ids)?;

    let mut npz = NpzBuilder::create(out)?;
    match decoded {
        DecodedMatrix::I8(arr) => npz.add_array("matrix", &arr)?,
        DecodedMatrix::F32(arr) => npz.add_array("matrix", &arr)?,
        DecodedMatrix::F64(arr) => npz.add_array("matrix", &arr)?,
    }
    npz.add_bytes("row_ids.json", &row_ids_json)?;
    npz.add_bytes("variant_ids.json", &variant_ids_json)?;
    npz.finish()
}

fn run_write(input: &Path, bed: &Path, count_a2: bool) -> Result<()> {
    let file = File::open(input).map_err(|e| CustomError::ReadWithPath {
        source: e,
        path: input.to_path_buf(),
    })?;
    let mut npz = NpzReader::new(file)?;
    let values: Array2<i8> = npz.by_name("matrix")?;
    writer::write(bed, values.view(), !count_a2)
}

#[allow(clippy::too_many_arguments)]
fn run_dot(
    path: &Path,
    offset: usize,
    iid_count: usize,
    sid_count: usize,
    sid_step: usize,
    log_frequency: usize,
    out: &Path,
    num_threads: Option<i64>,
) -> Result<()> {
    let pool = BedThreadPool::new(resolve_num_threads(num_threads, None)?)?;
    let g = file_dot(path, offset, iid_count, sid_count, sid_step, log_frequency, &pool)?;
    let mut npz = NpzBuilder::create(out)?;
    npz.add_array("gram", &g)?;
    npz.finish()
}

#[allow(clippy::too_many_arguments)]
fn run_b_less_aatb(
    path: &Path,
    offset: usize,
    iid_count: usize,
    sid_count: usize,
    b_path: &Path,
    log_frequency: usize,
    out: &Path,
    num_threads: Option<i64>,
) -> Result<()> {
    let b_file = File::open(b_path).map_err(|e| CustomError::ReadWithPath {
        source: e,
        path: b_path.to_path_buf(),
    })?;
    let b: Array2<f64> = Array2::read_npy(b_file)?;

    let pool = BedThreadPool::new(resolve_num_threads(num_threads, None)?)?;
    let (a_t_b, aa_tb) = file_b_less_aatb(path, offset, iid_count, sid_count, b.view(), log_frequency, &pool)?;

    let mut npz = NpzBuilder::create(out)?;
    npz.add_array("a_t_b", &a_t_b)?;
    npz.add_array("aa_tb", &aa_tb)?;
    npz.finish()
}

