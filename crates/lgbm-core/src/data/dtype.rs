//! Element-type tags for caller-supplied buffers.
//!
//! Buffers arrive as untyped memory plus an integer tag. The tag is turned
//! into a [`DType`] once at the boundary and the memory into a typed
//! [`NumericSlice`], so later code never reinterprets bytes.

use std::ffi::c_void;

use super::DatasetError;

/// Element type of a buffer: tag 0 = f32, 1 = f64, 2 = i32, 3 = i64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DType {
    Float32 = 0,
    Float64 = 1,
    Int32 = 2,
    Int64 = 3,
}

impl DType {
    pub fn from_tag(tag: i32) -> Result<Self, DatasetError> {
        match tag {
            0 => Ok(DType::Float32),
            1 => Ok(DType::Float64),
            2 => Ok(DType::Int32),
            3 => Ok(DType::Int64),
            _ => Err(DatasetError::UnsupportedDtype { tag }),
        }
    }

    pub fn tag(self) -> i32 {
        self as i32
    }

    pub fn is_float(self) -> bool {
        matches!(self, DType::Float32 | DType::Float64)
    }

    pub fn name(self) -> &'static str {
        match self {
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
        }
    }
}

/// Borrowed buffer with a known element type.
#[derive(Debug, Clone, Copy)]
pub enum NumericSlice<'a> {
    F32(&'a [f32]),
    F64(&'a [f64]),
    I32(&'a [i32]),
    I64(&'a [i64]),
}

impl<'a> NumericSlice<'a> {
    /// View raw memory as a typed slice.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads of `len` elements of `dtype` and suitably
    /// aligned, and the memory must not be mutated for `'a`. A null `ptr` is
    /// only allowed when `len == 0`.
    pub unsafe fn from_raw(ptr: *const c_void, dtype: DType, len: usize) -> Self {
        if len == 0 || ptr.is_null() {
            return match dtype {
                DType::Float32 => NumericSlice::F32(&[]),
                DType::Float64 => NumericSlice::F64(&[]),
                DType::Int32 => NumericSlice::I32(&[]),
                DType::Int64 => NumericSlice::I64(&[]),
            };
        }
        // SAFETY: guaranteed by the caller.
        unsafe {
            match dtype {
                DType::Float32 => NumericSlice::F32(std::slice::from_raw_parts(ptr.cast(), len)),
                DType::Float64 => NumericSlice::F64(std::slice::from_raw_parts(ptr.cast(), len)),
                DType::Int32 => NumericSlice::I32(std::slice::from_raw_parts(ptr.cast(), len)),
                DType::Int64 => NumericSlice::I64(std::slice::from_raw_parts(ptr.cast(), len)),
            }
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            NumericSlice::F32(_) => DType::Float32,
            NumericSlice::F64(_) => DType::Float64,
            NumericSlice::I32(_) => DType::Int32,
            NumericSlice::I64(_) => DType::Int64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            NumericSlice::F32(s) => s.len(),
            NumericSlice::F64(s) => s.len(),
            NumericSlice::I32(s) => s.len(),
            NumericSlice::I64(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Require a floating-point buffer and return its values as f64.
    pub fn float_values(&self, role: &'static str) -> Result<FloatValues<'a>, DatasetError> {
        match *self {
            NumericSlice::F32(s) => Ok(FloatValues::F32(s)),
            NumericSlice::F64(s) => Ok(FloatValues::F64(s)),
            other => Err(DatasetError::DtypeMismatch {
                role,
                expected: "float32 or float64",
                actual: other.dtype(),
            }),
        }
    }

    /// Require an integer buffer of non-negative offsets/indices.
    pub fn offsets(&self, role: &'static str) -> Result<Vec<usize>, DatasetError> {
        let to_usize = |i: usize, v: i64| {
            usize::try_from(v).map_err(|_| {
                DatasetError::InvalidSparse(format!("{role}[{i}] = {v} is negative"))
            })
        };
        match *self {
            NumericSlice::I32(s) => s
                .iter()
                .enumerate()
                .map(|(i, &v)| to_usize(i, v as i64))
                .collect(),
            NumericSlice::I64(s) => s.iter().enumerate().map(|(i, &v)| to_usize(i, v)).collect(),
            other => Err(DatasetError::DtypeMismatch {
                role,
                expected: "int32 or int64",
                actual: other.dtype(),
            }),
        }
    }
}

/// Floating-point values that read as f64.
#[derive(Debug, Clone, Copy)]
pub enum FloatValues<'a> {
    F32(&'a [f32]),
    F64(&'a [f64]),
}

impl FloatValues<'_> {
    pub fn len(&self) -> usize {
        match self {
            FloatValues::F32(s) => s.len(),
            FloatValues::F64(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> f64 {
        match self {
            FloatValues::F32(s) => s[i] as f64,
            FloatValues::F64(s) => s[i],
        }
    }

    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            FloatValues::F32(s) => s.to_vec(),
            FloatValues::F64(s) => s.iter().map(|&v| v as f32).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, DType::Float32)]
    #[case(1, DType::Float64)]
    #[case(2, DType::Int32)]
    #[case(3, DType::Int64)]
    fn tag_round_trip(#[case] tag: i32, #[case] dtype: DType) {
        assert_eq!(DType::from_tag(tag).unwrap(), dtype);
        assert_eq!(dtype.tag(), tag);
    }

    #[rstest]
    #[case(-1)]
    #[case(4)]
    #[case(42)]
    fn unknown_tags_rejected(#[case] tag: i32) {
        assert!(matches!(
            DType::from_tag(tag),
            Err(DatasetError::UnsupportedDtype { .. })
        ));
    }

    #[test]
    fn from_raw_reads_typed_memory() {
        let data = [1.5f64, 2.5];
        let slice = unsafe { NumericSlice::from_raw(data.as_ptr().cast(), DType::Float64, 2) };
        let values = slice.float_values("data").unwrap();
        assert_eq!(values.get(1), 2.5);
    }

    #[test]
    fn integer_buffer_is_not_float() {
        let data = [1i32, 2];
        let err = NumericSlice::I32(&data).float_values("data").unwrap_err();
        assert!(matches!(err, DatasetError::DtypeMismatch { actual: DType::Int32, .. }));
    }

    #[test]
    fn offsets_reject_floats_and_negatives() {
        assert!(NumericSlice::F64(&[0.0]).offsets("indptr").is_err());
        assert!(NumericSlice::I64(&[0, -1]).offsets("indptr").is_err());
        assert_eq!(NumericSlice::I32(&[0, 3]).offsets("indptr").unwrap(), vec![0, 3]);
    }
}
