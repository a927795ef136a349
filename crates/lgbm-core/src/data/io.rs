//! Binary Dataset snapshots.
//!
//! A snapshot stores the binned columns together with the bin table, so
//! loading never re-bins. It is a fixed 32-byte header followed by a
//! postcard payload:
//!
//! ```text
//! bytes   field
//! 0..4    "LGBD"
//! 4..6    format version (u16 LE)
//! 6..8    flags (u16 LE): 1 = zstd payload, 2 = label, 4 = weight
//! 8..12   payload length in bytes (u32 LE)
//! 12..16  CRC32 of the stored payload (u32 LE)
//! 16..20  features (u32 LE)
//! 20..28  rows (u64 LE)
//! 28..32  zero
//! ```
//!
//! With the `storage-compression` feature, payloads of 32 KiB and more are
//! zstd-compressed; the checksum covers the bytes as stored.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::binned::{BinColumn, BinMapper};
use crate::error::ErrorKind;

pub const MAGIC: &[u8; 4] = b"LGBD";
pub const FORMAT_VERSION: u16 = 1;
pub const HEADER_SIZE: usize = 32;

#[cfg(feature = "storage-compression")]
const COMPRESS_FROM: usize = 32 * 1024;
#[cfg(feature = "storage-compression")]
const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("cannot encode dataset snapshot: {0}")]
    Encode(#[from] postcard::Error),

    #[error("dataset snapshot of {0} bytes is too large")]
    TooLarge(usize),

    #[cfg(feature = "storage-compression")]
    #[error("cannot compress dataset snapshot: {0}")]
    Compress(std::io::Error),
}

#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a binary dataset file")]
    NotADataset,

    #[error("binary dataset format version {0} is not supported (expected {FORMAT_VERSION})")]
    UnsupportedVersion(u16),

    #[error("binary dataset truncated: need {expected} bytes, have {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("binary dataset checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    Checksum { stored: u32, computed: u32 },

    #[error("cannot decode binary dataset: {0}")]
    Decode(#[from] postcard::Error),

    #[error("binary dataset is inconsistent: {0}")]
    Inconsistent(String),

    #[cfg(feature = "storage-compression")]
    #[error("cannot decompress binary dataset: {0}")]
    Decompress(std::io::Error),
}

impl DeserializeError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::MalformedInput
    }
}

// =============================================================================
// Header
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Flags {
    compressed: bool,
    has_label: bool,
    has_weight: bool,
}

impl Flags {
    const COMPRESSED: u16 = 1;
    const LABEL: u16 = 2;
    const WEIGHT: u16 = 4;

    fn bits(self) -> u16 {
        let bit = |set: bool, value: u16| if set { value } else { 0 };
        bit(self.compressed, Self::COMPRESSED) | bit(self.has_label, Self::LABEL) | bit(self.has_weight, Self::WEIGHT)
    }

    fn from_bits(bits: u16) -> Self {
        Self {
            compressed: bits & Self::COMPRESSED != 0,
            has_label: bits & Self::LABEL != 0,
            has_weight: bits & Self::WEIGHT != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    flags: Flags,
    payload_len: u32,
    crc: u32,
    n_features: u32,
    n_rows: u64,
}

impl Header {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&self.flags.bits().to_le_bytes());
        out.extend_from_slice(&self.payload_len.to_le_bytes());
        out.extend_from_slice(&self.crc.to_le_bytes());
        out.extend_from_slice(&self.n_features.to_le_bytes());
        out.extend_from_slice(&self.n_rows.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
    }

    fn read(bytes: &[u8]) -> Result<Self, DeserializeError> {
        let Some(head) = bytes.get(..HEADER_SIZE) else {
            return Err(DeserializeError::Truncated {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        };
        if &head[..4] != MAGIC {
            return Err(DeserializeError::NotADataset);
        }
        let le = |range: std::ops::Range<usize>| -> u64 {
            head[range].iter().rev().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
        };
        let version = le(4..6) as u16;
        if version != FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(version));
        }
        Ok(Self {
            flags: Flags::from_bits(le(6..8) as u16),
            payload_len: le(8..12) as u32,
            crc: le(12..16) as u32,
            n_features: le(16..20) as u32,
            n_rows: le(20..28),
        })
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// A Dataset's contents as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    pub n_rows: usize,
    pub feature_names: Vec<String>,
    pub mappers: Vec<BinMapper>,
    pub columns: Vec<BinColumn>,
    pub label: Option<Vec<f32>>,
    pub weight: Option<Vec<f32>>,
}

impl Snapshot {
    pub fn encode(&self) -> Result<Vec<u8>, SerializeError> {
        let payload = postcard::to_allocvec(self)?;
        let (stored, compressed) = compress(payload)?;
        let header = Header {
            flags: Flags {
                compressed,
                has_label: self.label.is_some(),
                has_weight: self.weight.is_some(),
            },
            payload_len: u32::try_from(stored.len()).map_err(|_| SerializeError::TooLarge(stored.len()))?,
            crc: crc32fast::hash(&stored),
            n_features: u32::try_from(self.mappers.len()).map_err(|_| SerializeError::TooLarge(stored.len()))?,
            n_rows: self.n_rows as u64,
        };

        let mut out = Vec::with_capacity(HEADER_SIZE + stored.len());
        header.write(&mut out);
        out.extend_from_slice(&stored);
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DeserializeError> {
        let header = Header::read(bytes)?;
        let end = HEADER_SIZE + header.payload_len as usize;
        let stored = bytes.get(HEADER_SIZE..end).ok_or(DeserializeError::Truncated {
            expected: end,
            actual: bytes.len(),
        })?;
        let computed = crc32fast::hash(stored);
        if computed != header.crc {
            return Err(DeserializeError::Checksum {
                stored: header.crc,
                computed,
            });
        }

        let payload = decompress(stored, header.flags.compressed)?;
        let snapshot: Snapshot = postcard::from_bytes(&payload)?;
        snapshot.check(&header)?;
        Ok(snapshot)
    }

    /// Cross-checks between header and payload that decoding cannot catch.
    fn check(&self, header: &Header) -> Result<(), DeserializeError> {
        let inconsistent = |msg: String| Err(DeserializeError::Inconsistent(msg));
        let n_features = header.n_features as usize;
        if self.n_rows as u64 != header.n_rows {
            return inconsistent(format!("header has {} rows, payload {}", header.n_rows, self.n_rows));
        }
        if self.mappers.len() != n_features
            || self.columns.len() != n_features
            || self.feature_names.len() != n_features
        {
            return inconsistent(format!(
                "{n_features} features with {} bin mappers, {} columns and {} names",
                self.mappers.len(),
                self.columns.len(),
                self.feature_names.len()
            ));
        }
        if self.n_rows == 0 || n_features == 0 {
            return inconsistent(format!("empty dataset: {} rows, {n_features} features", self.n_rows));
        }
        if let Some(f) = self.mappers.iter().position(|m| !m.is_well_formed()) {
            return inconsistent(format!("feature {f} has malformed bin boundaries"));
        }
        if header.flags.has_label != self.label.is_some() || header.flags.has_weight != self.weight.is_some() {
            return inconsistent("field flags disagree with payload".into());
        }
        for (f, (column, mapper)) in self.columns.iter().zip(&self.mappers).enumerate() {
            if column.len() != self.n_rows {
                return inconsistent(format!("feature {f} has {} rows", column.len()));
            }
            if column.max_bin().is_some_and(|b| b >= mapper.n_bins()) {
                return inconsistent(format!("feature {f} has a bin past its {} bins", mapper.n_bins()));
            }
        }
        for (name, field) in [("label", &self.label), ("weight", &self.weight)] {
            if let Some(values) = field.as_ref().filter(|v| v.len() != self.n_rows) {
                return inconsistent(format!("{name} has {} values", values.len()));
            }
        }
        Ok(())
    }
}

#[cfg(feature = "storage-compression")]
fn compress(payload: Vec<u8>) -> Result<(Vec<u8>, bool), SerializeError> {
    if payload.len() < COMPRESS_FROM {
        return Ok((payload, false));
    }
    let packed = zstd::encode_all(payload.as_slice(), ZSTD_LEVEL).map_err(SerializeError::Compress)?;
    Ok((packed, true))
}

#[cfg(not(feature = "storage-compression"))]
fn compress(payload: Vec<u8>) -> Result<(Vec<u8>, bool), SerializeError> {
    Ok((payload, false))
}

#[cfg(feature = "storage-compression")]
fn decompress(stored: &[u8], compressed: bool) -> Result<std::borrow::Cow<'_, [u8]>, DeserializeError> {
    if !compressed {
        return Ok(stored.into());
    }
    zstd::decode_all(stored)
        .map(Into::into)
        .map_err(DeserializeError::Decompress)
}

#[cfg(not(feature = "storage-compression"))]
fn decompress(stored: &[u8], compressed: bool) -> Result<std::borrow::Cow<'_, [u8]>, DeserializeError> {
    if compressed {
        return Err(DeserializeError::Inconsistent(
            "payload is zstd-compressed; enable the storage-compression feature".into(),
        ));
    }
    Ok(stored.into())
}
