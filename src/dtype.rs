use crate::error::{CustomError, Result};

/// Numeric element type recognized at the read/write API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dtype {
    I8,
    F32,
    F64,
}

impl Dtype {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "i8" => Ok(Dtype::I8),
            "f32" => Ok(Dtype::F32),
            "f64" => Ok(Dtype::F64),
            other => Err(CustomError::UnsupportedDtype {
                dtype: other.to_string(),
            }),
        }
    }
}

impl std::str::FromStr for Dtype {
    type Err = CustomError;

    fn from_str(s: &str) -> Result<Self> {
        Dtype::parse(s)
    }
}

/// Buffer memory order requested at the read API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// "C" — row-major / individual-major.
    RowMajor,
    /// "F" — column-major / variant-major.
    ColumnMajor,
}

impl Layout {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "C" => Ok(Layout::RowMajor),
            "F" => Ok(Layout::ColumnMajor),
            other => Err(CustomError::UnsupportedLayout {
                layout: other.to_string(),
            }),
        }
    }
}

impl std::str::FromStr for Layout {
    type Err = CustomError;

    fn from_str(s: &str) -> Result<Self> {
        Layout::parse(s)
    }
}
