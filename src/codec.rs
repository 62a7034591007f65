//! Pure, allocation-light functions shared by the reader and writer: header
//! validation, variant-block byte geometry, and the 256-entry decode table
//! that is the only place the A1/A2 flip and the missing-value sentinel live.

use crate::error::{CustomError, Result};

pub const MAGIC: [u8; 3] = [0x6c, 0x1b, 0x01];
const SNP_MAJOR: u8 = 0x01;

/// Validates the three-byte `.bed` header. `bytes` must be exactly the first
/// three bytes of the file.
pub fn validate_header(bytes: [u8; 3]) -> Result<()> {
    if bytes[0] != MAGIC[0] || bytes[1] != MAGIC[1] {
        return Err(CustomError::NotBed);
    }
    if bytes[2] != SNP_MAJOR {
        return Err(CustomError::NotSnpMajor);
    }
    Ok(())
}

/// Number of bytes used to store one variant's genotypes, two bits per
/// individual, rounded up to a whole byte.
pub fn bytes_per_variant(iid_count: usize) -> usize {
    iid_count.div_ceil(4)
}

/// Byte offset of variant `variant_idx`'s block, counting past the header.
pub fn variant_offset(variant_idx: usize, bytes_per_variant: usize) -> u64 {
    3 + (variant_idx as u64) * (bytes_per_variant as u64)
}

/// Expected total file size for the declared geometry.
pub fn expected_file_size(iid_count: usize, sid_count: usize) -> u64 {
    3 + (sid_count as u64) * (bytes_per_variant(iid_count) as u64)
}

/// A numeric element type the decode table can be specialized for.
pub trait GenotypeValue: Copy + Send + Sync + 'static {
    /// `count` is 0, 1, or 2 copies of the counted allele.
    fn from_count(count: u8) -> Self;
    fn missing() -> Self;
}

impl GenotypeValue for i8 {
    fn from_count(count: u8) -> Self {
        count as i8
    }

    fn missing() -> Self {
        -127
    }
}

impl GenotypeValue for f32 {
    fn from_count(count: u8) -> Self {
        count as f32
    }

    fn missing() -> Self {
        f32::NAN
    }
}

impl GenotypeValue for f64 {
    fn from_count(count: u8) -> Self {
        count as f64
    }

    fn missing() -> Self {
        f64::NAN
    }
}

/// Raw 2-bit code (0..=3) to allele count under the A1-counted convention,
/// or `None` for the missing sentinel. See §3 of the format's data model:
/// raw 0 is homozygous-first (count 2), raw 1 is missing, raw 2 is
/// heterozygous (count 1), raw 3 is homozygous-second (count 0).
fn raw_to_count_a1(raw: u8) -> Option<u8> {
    match raw {
        0b00 => Some(2),
        0b01 => None,
        0b10 => Some(1),
        0b11 => Some(0),
        _ => unreachable!("2-bit code out of range"),
    }
}

fn raw_to_count(raw: u8, count_a1: bool) -> Option<u8> {
    raw_to_count_a1(raw).map(|count| if count_a1 { count } else { 2 - count })
}

/// A 256-entry lookup table mapping a raw genotype byte to its four decoded
/// values, one per individual packed into that byte (lowest two bits first).
/// Built once per read/write call and shared by reference across worker
/// threads; immutable after construction.
pub struct DecodeTable<V> {
    table: Box<[[V; 4]; 256]>,
}

impl<V: GenotypeValue> DecodeTable<V> {
    pub fn build(count_a1: bool) -> Self {
        let mut table = Box::new([[V::missing(); 4]; 256]);
        for (byte, row) in table.iter_mut().enumerate() {
            for (slot, value) in row.iter_mut().enumerate() {
                let raw = ((byte as u8) >> (slot * 2)) & 0b11;
                *value = match raw_to_count(raw, count_a1) {
                    Some(count) => V::from_count(count),
                    None => V::missing(),
                };
            }
        }
        Self { table }
    }

    #[inline]
    pub fn decode(&self, byte: u8, slot: usize) -> V {
        self.table[byte as usize][slot]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_magic() {
        let err = validate_header([0x00, 0x1b, 0x01]).unwrap_err();
        assert!(matches!(err, CustomError::NotBed));
    }

    #[test]
    fn rejects_individual_major() {
        let err = validate_header([0x6c, 0x1b, 0x00]).unwrap_err();
        assert!(matches!(err, CustomError::NotSnpMajor));
    }

    #[test]
    fn accepts_valid_header() {
        validate_header(MAGIC).unwrap();
    }

    #[test]
    fn bytes_per_variant_rounds_up() {
        assert_eq!(bytes_per_variant(0), 0);
        assert_eq!(bytes_per_variant(1), 1);
        assert_eq!(bytes_per_variant(4), 1);
        assert_eq!(bytes_per_variant(5), 2);
        assert_eq!(bytes_per_variant(8), 2);
    }

    #[test]
    fn variant_offset_accounts_for_header() {
        assert_eq!(variant_offset(0, 2), 3);
        assert_eq!(variant_offset(3, 2), 9);
    }

    #[test]
    fn decode_table_a1_matches_spec_mapping() {
        let table = DecodeTable::<f64>::build(true);
        // byte with all four slots set to each raw code in turn
        let byte = 0b00_01_10_11u8; // slot0=11(raw3), slot1=10(raw2), slot2=01(raw1), slot3=00(raw0)
        assert_eq!(table.decode(byte, 0), 0.0); // raw 3 -> count 0
        assert_eq!(table.decode(byte, 1), 1.0); // raw 2 -> count 1
        assert!(table.decode(byte, 2).is_nan()); // raw 1 -> missing
        assert_eq!(table.decode(byte, 3), 2.0); // raw 0 -> count 2
    }

    #[test]
    fn decode_table_a2_swaps_homozygous_counts() {
        let a1 = DecodeTable::<i8>::build(true);
        let a2 = DecodeTable::<i8>::build(false);
        for byte in 0..=255u8 {
            for slot in 0..4 {
                let v1 = a1.decode(byte, slot);
                let v2 = a2.decode(byte, slot);
                if v1 == -127 {
                    assert_eq!(v2, -127);
                } else {
                    assert_eq!(v2, 2 - v1);
                }
            }
        }
    }
}
