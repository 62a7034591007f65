//! Line-oriented readers for PLINK's `.fam` and `.bim` sidecar text files.
//! Each is a single pass returning typed columns and a row count; neither
//! caches results nor replaces properties across calls.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{CustomError, Result};

const FAM_FIELDS: usize = 6;
const BIM_FIELDS: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct FamRecord {
    pub family_id: String,
    pub individual_id: String,
    pub father_id: String,
    pub mother_id: String,
    pub sex: i8,
    pub phenotype: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BimRecord {
    pub chromosome: String,
    pub variant_id: String,
    pub centimorgan: f32,
    pub base_pair: i32,
    pub allele1: String,
    pub allele2: String,
}

fn read_with_path(path: &Path) -> impl Fn(std::io::Error) -> CustomError {
    let path = path.to_path_buf();
    move |source| CustomError::ReadWithPath {
        source,
        path: path.clone(),
    }
}

fn parse_field<T: std::str::FromStr>(
    value: &str,
    line_num: usize,
    file: &'static str,
) -> Result<T> {
    value.parse().map_err(|_| CustomError::FieldParse {
        line_num,
        file,
        value: value.to_string(),
    })
}

/// Reads one record per individual from a whitespace-separated `.fam` file.
/// The number of records is the matrix's `iid_count`.
pub fn read_fam(path: &Path) -> Result<Vec<FamRecord>> {
    let f = File::open(path).map_err(read_with_path(path))?;
    let mut records = Vec::new();
    for (line_idx, line) in BufReader::new(f).lines().enumerate() {
        let line = line.map_err(read_with_path(path))?;
        let fields: Vec<_> = line.split_whitespace().collect();
        if fields.len() != FAM_FIELDS {
            return Err(CustomError::FamFields {
                line_num: line_idx + 1,
                n_fields: fields.len(),
                expected: FAM_FIELDS,
            });
        }
        records.push(FamRecord {
            family_id: fields[0].to_string(),
            individual_id: fields[1].to_string(),
            father_id: fields[2].to_string(),
            mother_id: fields[3].to_string(),
            sex: parse_field(fields[4], line_idx + 1, "fam")?,
            phenotype: fields[5].to_string(),
        });
    }
    Ok(records)
}

/// Reads one record per variant from a tab-separated `.bim` file. The
/// number of records is the matrix's `sid_count`.
pub fn read_bim(path: &Path) -> Result<Vec<BimRecord>> {
    let f = File::open(path).map_err(read_with_path(path))?;
    let mut records = Vec::new();
    for (line_idx, line) in BufReader::new(f).lines().enumerate() {
        let line = line.map_err(read_with_path(path))?;
        let fields: Vec<_> = line.split('\t').collect();
        if fields.len() != BIM_FIELDS {
            return Err(CustomError::BimFields {
                line_num: line_idx + 1,
                n_fields: fields.len(),
                expected: BIM_FIELDS,
            });
        }
        records.push(BimRecord {
            chromosome: fields[0].to_string(),
            variant_id: fields[1].to_string(),
            centimorgan: parse_field(fields[2], line_idx + 1, "bim")?,
            base_pair: parse_field(fields[3], line_idx + 1, "bim")?,
            allele1: fields[4].to_string(),
            allele2: fields[5].to_string(),
        });
    }
    Ok(records)
}
