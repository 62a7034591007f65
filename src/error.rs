use thiserror::Error;

#[derive(Debug, Error)]
pub enum CustomError {
    #[error("not a PLINK .bed file: missing or invalid magic bytes")]
    NotBed,

    #[error(".bed file is individual-major; only SNP-major files are supported")]
    NotSnpMajor,

    #[error(
        "file truncated: geometry requires {expected} bytes (iid_count={iid_count}, sid_count={sid_count}) but found {found}"
    )]
    Truncated {
        expected: u64,
        found: u64,
        iid_count: usize,
        sid_count: usize,
    },

    #[error("index {idx} out of bounds for dimension of size {bound}")]
    IndexOutOfBounds { idx: i64, bound: usize },

    #[error("index array length {len} exceeds the supported positive 32-bit range")]
    IndexTooLarge { len: usize },

    #[error("property {key} has length {found} but expected {expected}")]
    MetadataLengthMismatch {
        key: String,
        expected: usize,
        found: usize,
    },

    #[error("unknown property key: {key}")]
    UnknownProperty { key: String },

    #[error("unsupported dtype: {dtype} (expected one of i8, f32, f64)")]
    UnsupportedDtype { dtype: String },

    #[error("unsupported layout: {layout} (expected \"C\" or \"F\")")]
    UnsupportedLayout { layout: String },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("invalid genotype value {value} at row {row}, column {col}")]
    InvalidGenotype { value: f64, row: usize, col: usize },

    #[error("could not build thread pool")]
    ThreadPoolBuild(#[from] rayon::ThreadPoolBuildError),

    #[error("could not read {path}")]
    ReadWithPath {
        #[source]
        source: std::io::Error,
        path: std::path::PathBuf,
    },

    #[error("could not write to {path}")]
    Write {
        #[source]
        source: std::io::Error,
        path: std::path::PathBuf,
    },

    #[error("expected {expected} fields (got {n_fields}) in line {line_num} of .fam file")]
    FamFields {
        line_num: usize,
        n_fields: usize,
        expected: usize,
    },

    #[error("expected {expected} fields (got {n_fields}) in line {line_num} of .bim file")]
    BimFields {
        line_num: usize,
        n_fields: usize,
        expected: usize,
    },

    #[error("could not parse field in line {line_num} of {file}: {value}")]
    FieldParse {
        line_num: usize,
        file: &'static str,
        value: String,
    },

    #[error("could not write to NPZ")]
    NpzWrite(#[from] ndarray_npy::WriteNpzError),

    #[error("could not read NPZ")]
    NpzRead(#[from] ndarray_npy::ReadNpzError),

    #[error("could not write NPY array")]
    NpyWrite(#[from] ndarray_npy::WriteNpyError),

    #[error("could not read NPY array")]
    NpyRead(#[from] ndarray_npy::ReadNpyError),

    #[error("could not write to ZIP")]
    ZipWrite(#[from] zip::result::ZipError),

    #[error("could not serialize JSON sidecar")]
    JsonWrite(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CustomError>;
