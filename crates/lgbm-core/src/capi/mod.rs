//! Flat C API.
//!
//! Every entry point returns `0` on success and the negated [`ErrorKind`]
//! code on failure. The failure message is kept per thread and read back
//! with [`LGBM_GetLastError`]. Panics never cross the boundary; they are
//! reported as `ResourceUnavailable`.
//!
//! Datasets and boosters live in process-wide [`HandleArena`]s and are
//! addressed by opaque handles. Output arguments are only written on
//! success.

#![allow(non_snake_case, clippy::too_many_arguments)]

mod handles;

use std::cell::RefCell;
use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::booster::Booster;
use crate::config::{BoosterConfig, DatasetConfig, Params};
use crate::data::{DType, Dataset, DatasetError, NumericSlice, RawFeatures};
use crate::predict::PredictKind;
use crate::{Error, ErrorKind, Result};

pub use handles::{HandleArena, HandleKind, RawHandle};

// =============================================================================
// Registries
// =============================================================================

static DATASETS: Mutex<HandleArena<Arc<Dataset>>> = Mutex::new(HandleArena::new(HandleKind::Dataset));
static BOOSTERS: Mutex<HandleArena<Arc<Mutex<Booster>>>> =
    Mutex::new(HandleArena::new(HandleKind::Booster));

fn datasets() -> MutexGuard<'static, HandleArena<Arc<Dataset>>> {
    DATASETS.lock().unwrap_or_else(PoisonError::into_inner)
}

fn boosters() -> MutexGuard<'static, HandleArena<Arc<Mutex<Booster>>>> {
    BOOSTERS.lock().unwrap_or_else(PoisonError::into_inner)
}

fn dataset(handle: RawHandle) -> Result<Arc<Dataset>> {
    datasets().get(handle).map(Arc::clone)
}

/// Resolve a `reference` argument: a pointer to a Dataset handle, where a
/// null pointer or a null handle both mean "no reference".
///
/// # Safety
///
/// `reference` must be null or point to a readable handle.
unsafe fn optional_dataset(reference: *const RawHandle) -> Result<Option<Arc<Dataset>>> {
    // SAFETY: caller contract.
    match unsafe { reference.as_ref() } {
        Some(&handle) if !handle.is_null() => dataset(handle).map(Some),
        _ => Ok(None),
    }
}

/// Run `f` on a booster. The registry lock is released before the booster
/// is locked, so long rounds do not block other handles.
fn with_booster<T>(handle: RawHandle, f: impl FnOnce(&mut Booster) -> Result<T>) -> Result<T> {
    let booster = boosters().get(handle).map(Arc::clone)?;
    let mut guard = booster.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}

// =============================================================================
// Error reporting
// =============================================================================

struct LastError {
    message: CString,
    kind: Option<ErrorKind>,
}

thread_local! {
    static LAST_ERROR: RefCell<LastError> = RefCell::new(LastError {
        message: CString::from(c"Everything is fine"),
        kind: None,
    });
}

fn set_last_error(kind: ErrorKind, message: &str) {
    let message = CString::new(message.replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|last| *last.borrow_mut() = LastError {
        message,
        kind: Some(kind),
    });
}

/// Run an entry point body, translating its outcome into a return code.
fn api_call(f: impl FnOnce() -> Result<()>) -> c_int {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => 0,
        Ok(Err(err)) => {
            let kind = err.kind();
            set_last_error(kind, &err.to_string());
            -kind.code()
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            let kind = ErrorKind::ResourceUnavailable;
            set_last_error(kind, &format!("internal error: {message}"));
            -kind.code()
        }
    }
}

/// Message of the last failure on the calling thread.
///
/// The pointer stays valid until the next failing call on the same thread.
#[unsafe(no_mangle)]
pub extern "C" fn LGBM_GetLastError() -> *const c_char {
    LAST_ERROR.with(|last| last.borrow().message.as_ptr())
}

/// Code of the last failure's [`ErrorKind`] on the calling thread, or `0`.
#[unsafe(no_mangle)]
pub extern "C" fn LGBM_GetLastErrorKind() -> c_int {
    LAST_ERROR.with(|last| last.borrow().kind.map_or(0, ErrorKind::code))
}

// =============================================================================
// Argument conversion
// =============================================================================

fn null_argument(what: &str) -> Error {
    Error::InvalidArgument(format!("{what} must not be null"))
}

/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn c_str<'a>(ptr: *const c_char, what: &str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(null_argument(what));
    }
    // SAFETY: non-null and NUL-terminated per the caller.
    let s = unsafe { CStr::from_ptr(ptr) };
    s.to_str()
        .map_err(|_| Error::InvalidArgument(format!("{what} is not valid UTF-8")))
}

/// Parameter string; null reads as empty.
///
/// # Safety
///
/// As [`c_str`].
unsafe fn params(ptr: *const c_char) -> Result<Params> {
    if ptr.is_null() {
        return Ok(Params::default());
    }
    // SAFETY: forwarded.
    let input = unsafe { c_str(ptr, "parameters") }?;
    Ok(Params::parse(input)?)
}

/// # Safety
///
/// `ptr` must be null or valid for writes of `T`.
unsafe fn out<'a, T>(ptr: *mut T, what: &str) -> Result<&'a mut T> {
    // SAFETY: null is rejected; otherwise valid per the caller.
    unsafe { ptr.as_mut() }.ok_or_else(|| null_argument(what))
}

/// # Safety
///
/// `ptr` must be valid for reads of `len` values of the type named by `tag`.
unsafe fn numeric<'a>(ptr: *const c_void, tag: c_int, len: usize, what: &str) -> Result<NumericSlice<'a>> {
    let dtype = DType::from_tag(tag)?;
    if ptr.is_null() && len > 0 {
        return Err(null_argument(what));
    }
    // SAFETY: forwarded.
    Ok(unsafe { NumericSlice::from_raw(ptr, dtype, len) })
}

/// # Safety
///
/// `ptr` must be valid for reads of `len` values.
unsafe fn slice<'a, T>(ptr: *const T, len: usize, what: &str) -> Result<&'a [T]> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(null_argument(what));
    }
    // SAFETY: non-null and valid per the caller.
    Ok(unsafe { std::slice::from_raw_parts(ptr, len) })
}

/// # Safety
///
/// `ptr` must be valid for writes of `len` values.
unsafe fn slice_mut<'a, T>(ptr: *mut T, len: usize, what: &str) -> Result<&'a mut [T]> {
    if len == 0 {
        return Ok(&mut []);
    }
    if ptr.is_null() {
        return Err(null_argument(what));
    }
    // SAFETY: non-null and valid per the caller.
    Ok(unsafe { std::slice::from_raw_parts_mut(ptr, len) })
}

fn count(value: i64, what: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::InvalidArgument(format!("{what} must be non-negative, got {value}")))
}

/// `num_iteration <= 0` selects every iteration.
fn iteration_limit(num_iteration: c_int) -> Option<usize> {
    (num_iteration > 0).then_some(num_iteration as usize)
}

fn to_c_int(value: usize, what: &str) -> Result<c_int> {
    c_int::try_from(value).map_err(|_| Error::InvalidArgument(format!("{what} {value} does not fit in a C int")))
}

/// Copy `text` plus a NUL into a caller buffer of `buffer_len` bytes when it
/// fits; the needed size is always reported.
///
/// # Safety
///
/// `out_str` must be valid for writes of `buffer_len` bytes.
unsafe fn write_string(text: &str, buffer_len: i64, out_len: *mut i64, out_str: *mut c_char) -> Result<()> {
    // SAFETY: forwarded.
    let out_len = unsafe { out(out_len, "out_len") }?;
    let needed = text.len() + 1;
    if count(buffer_len, "buffer_len")? >= needed {
        // SAFETY: forwarded.
        let buffer = unsafe { slice_mut(out_str.cast::<u8>(), needed, "out_str") }?;
        buffer[..text.len()].copy_from_slice(text.as_bytes());
        buffer[text.len()] = 0;
    }
    *out_len = needed as i64;
    Ok(())
}

// =============================================================================
// Dataset
// =============================================================================

fn register_dataset(dataset: Dataset, out: &mut RawHandle) {
    *out = datasets().insert(Arc::new(dataset));
}

/// Load a Dataset from a delimited or LibSVM text file.
///
/// # Safety
///
/// String arguments must be NUL-terminated; `reference` is null or points
/// to a handle; `out` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_CreateDatasetFromFile(
    filename: *const c_char,
    parameters: *const c_char,
    reference: *const RawHandle,
    out: *mut RawHandle,
) -> c_int {
    api_call(|| {
        // SAFETY: caller contract.
        let (filename, params, out) = unsafe {
            (
                c_str(filename, "filename")?,
                self::params(parameters)?,
                self::out(out, "out")?,
            )
        };
        let config = DatasetConfig::from_params(&params)?;
        // SAFETY: caller contract.
        let reference = unsafe { optional_dataset(reference)? };
        let dataset = Dataset::from_file(Path::new(filename), &config, reference.as_deref())?;
        register_dataset(dataset, out);
        Ok(())
    })
}

/// Load a Dataset written by [`LGBM_DatasetSaveBinary`].
///
/// # Safety
///
/// `filename` must be NUL-terminated; `out` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_CreateDatasetFromBinaryFile(
    filename: *const c_char,
    out: *mut RawHandle,
) -> c_int {
    api_call(|| {
        // SAFETY: caller contract.
        let (filename, out) = unsafe { (c_str(filename, "filename")?, self::out(out, "out")?) };
        let dataset = Dataset::load_binary(Path::new(filename))?;
        register_dataset(dataset, out);
        Ok(())
    })
}

/// Build a Dataset from compressed sparse rows.
///
/// # Safety
///
/// `indptr` holds `nindptr` values of `indptr_type`; `indices` and `data`
/// hold `nelem` values; `reference` is null or points to a handle; `out`
/// must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_CreateDatasetFromCSR(
    indptr: *const c_void,
    indptr_type: c_int,
    indices: *const i32,
    data: *const c_void,
    data_type: c_int,
    nindptr: i64,
    nelem: i64,
    num_col: i64,
    parameters: *const c_char,
    reference: *const RawHandle,
    out: *mut RawHandle,
) -> c_int {
    api_call(|| {
        let nindptr = count(nindptr, "nindptr")?;
        let nelem = count(nelem, "nelem")?;
        let num_col = count(num_col, "num_col")?;
        // SAFETY: caller contract.
        let (indptr, indices, data, params, out) = unsafe {
            (
                numeric(indptr, indptr_type, nindptr, "indptr")?,
                slice(indices, nelem, "indices")?,
                numeric(data, data_type, nelem, "data")?,
                self::params(parameters)?,
                self::out(out, "out")?,
            )
        };
        let config = DatasetConfig::from_params(&params)?;
        // SAFETY: caller contract.
        let reference = unsafe { optional_dataset(reference)? };
        let dataset = Dataset::from_csr(indptr, indices, data, num_col, &config, reference.as_deref())?;
        register_dataset(dataset, out);
        Ok(())
    })
}

/// Build a Dataset from compressed sparse columns.
///
/// # Safety
///
/// `col_ptr` holds `ncol_ptr` values of `col_ptr_type`; `indices` and
/// `data` hold `nelem` values; `reference` is null or points to a handle;
/// `out` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_CreateDatasetFromCSC(
    col_ptr: *const c_void,
    col_ptr_type: c_int,
    indices: *const i32,
    data: *const c_void,
    data_type: c_int,
    ncol_ptr: i64,
    nelem: i64,
    num_row: i64,
    parameters: *const c_char,
    reference: *const RawHandle,
    out: *mut RawHandle,
) -> c_int {
    api_call(|| {
        let ncol_ptr = count(ncol_ptr, "ncol_ptr")?;
        let nelem = count(nelem, "nelem")?;
        let num_row = count(num_row, "num_row")?;
        // SAFETY: caller contract.
        let (col_ptr, indices, data, params, out) = unsafe {
            (
                numeric(col_ptr, col_ptr_type, ncol_ptr, "col_ptr")?,
                slice(indices, nelem, "indices")?,
                numeric(data, data_type, nelem, "data")?,
                self::params(parameters)?,
                self::out(out, "out")?,
            )
        };
        let config = DatasetConfig::from_params(&params)?;
        // SAFETY: caller contract.
        let reference = unsafe { optional_dataset(reference)? };
        let dataset = Dataset::from_csc(col_ptr, indices, data, num_row, &config, reference.as_deref())?;
        register_dataset(dataset, out);
        Ok(())
    })
}

/// Build a Dataset from a dense matrix.
///
/// # Safety
///
/// `data` holds `nrow * ncol` values of `data_type`; `reference` is null or
/// points to a handle; `out` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_CreateDatasetFromMat(
    data: *const c_void,
    data_type: c_int,
    nrow: i32,
    ncol: i32,
    is_row_major: c_int,
    parameters: *const c_char,
    reference: *const RawHandle,
    out: *mut RawHandle,
) -> c_int {
    api_call(|| {
        let nrow = count(nrow.into(), "nrow")?;
        let ncol = count(ncol.into(), "ncol")?;
        let len = nrow
            .checked_mul(ncol)
            .ok_or_else(|| Error::InvalidArgument(format!("{nrow} x {ncol} overflows")))?;
        // SAFETY: caller contract.
        let (data, params, out) = unsafe {
            (
                numeric(data, data_type, len, "data")?,
                self::params(parameters)?,
                self::out(out, "out")?,
            )
        };
        let config = DatasetConfig::from_params(&params)?;
        // SAFETY: caller contract.
        let reference = unsafe { optional_dataset(reference)? };
        let dataset = Dataset::from_dense(data, nrow, ncol, is_row_major != 0, &config, reference.as_deref())?;
        register_dataset(dataset, out);
        Ok(())
    })
}

/// Release a Dataset handle. Boosters built on it keep working.
#[unsafe(no_mangle)]
pub extern "C" fn LGBM_DatasetFree(handle: RawHandle) -> c_int {
    api_call(|| datasets().remove(handle).map(drop))
}

/// # Safety
///
/// `filename` must be NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_DatasetSaveBinary(handle: RawHandle, filename: *const c_char) -> c_int {
    api_call(|| {
        // SAFETY: caller contract.
        let filename = unsafe { c_str(filename, "filename") }?;
        dataset(handle)?.save_binary(Path::new(filename))
    })
}

/// Set the `label` or `weight` field. Fails once a booster uses the Dataset.
///
/// # Safety
///
/// `field_data` holds `num_element` values of `type_`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_DatasetSetField(
    handle: RawHandle,
    field_name: *const c_char,
    field_data: *const c_void,
    num_element: i32,
    type_: c_int,
) -> c_int {
    api_call(|| {
        let len = count(num_element.into(), "num_element")?;
        // SAFETY: caller contract.
        let (name, values) = unsafe {
            (
                c_str(field_name, "field_name")?,
                numeric(field_data, type_, len, "field_data")?,
            )
        };
        let mut registry = datasets();
        let shared = registry.get_mut(handle)?;
        let dataset = Arc::get_mut(shared).ok_or_else(|| DatasetError::FieldLocked(name.to_string()))?;
        dataset.set_field(name, values)?;
        Ok(())
    })
}

/// Read the `label` or `weight` field as float32. An unset field reports
/// length 0 and a null pointer. The pointer lives as long as the Dataset.
///
/// # Safety
///
/// `field_name` must be NUL-terminated; out pointers must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_DatasetGetField(
    handle: RawHandle,
    field_name: *const c_char,
    out_len: *mut i32,
    out_ptr: *mut *const c_void,
    out_type: *mut c_int,
) -> c_int {
    api_call(|| {
        // SAFETY: caller contract.
        let (name, out_len, out_ptr, out_type) = unsafe {
            (
                c_str(field_name, "field_name")?,
                out(out_len, "out_len")?,
                out(out_ptr, "out_ptr")?,
                out(out_type, "out_type")?,
            )
        };
        let dataset = dataset(handle)?;
        let (len, ptr) = match dataset.get_field(name)? {
            Some(values) => (to_c_int(values.len(), "field length")?, values.as_ptr().cast()),
            None => (0, std::ptr::null()),
        };
        *out_len = len;
        *out_ptr = ptr;
        *out_type = DType::Float32.tag();
        Ok(())
    })
}

/// # Safety
///
/// `out` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_DatasetGetNumData(handle: RawHandle, out: *mut i64) -> c_int {
    api_call(|| {
        // SAFETY: caller contract.
        let out = unsafe { self::out(out, "out") }?;
        *out = dataset(handle)?.num_data() as i64;
        Ok(())
    })
}

/// # Safety
///
/// `out` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_DatasetGetNumFeature(handle: RawHandle, out: *mut i64) -> c_int {
    api_call(|| {
        // SAFETY: caller contract.
        let out = unsafe { self::out(out, "out") }?;
        *out = dataset(handle)?.num_feature() as i64;
        Ok(())
    })
}

// =============================================================================
// Booster
// =============================================================================

fn register_booster(booster: Booster, out: &mut RawHandle) {
    *out = boosters().insert(Arc::new(Mutex::new(booster)));
}

/// Create a booster on `train` with `n_valid` named validation Datasets.
///
/// # Safety
///
/// `valid_datas` and `valid_names` hold `n_valid` entries; names are
/// NUL-terminated; `out` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_BoosterCreate(
    train_data: RawHandle,
    valid_datas: *const RawHandle,
    valid_names: *const *const c_char,
    n_valid: c_int,
    parameters: *const c_char,
    out: *mut RawHandle,
) -> c_int {
    api_call(|| {
        let n_valid = count(n_valid.into(), "n_valid")?;
        // SAFETY: caller contract.
        let (handles, names, params, out) = unsafe {
            (
                slice(valid_datas, n_valid, "valid_datas")?,
                slice(valid_names, n_valid, "valid_names")?,
                self::params(parameters)?,
                self::out(out, "out")?,
            )
        };
        let config = BoosterConfig::from_params(&params)?;
        let train = dataset(train_data)?;
        let mut valid = Vec::with_capacity(n_valid);
        for (&handle, &name) in handles.iter().zip(names) {
            // SAFETY: caller contract.
            let name = unsafe { c_str(name, "valid_names") }?;
            valid.push((name.to_string(), dataset(handle)?));
        }
        register_booster(Booster::new(train, valid, config)?, out);
        Ok(())
    })
}

/// Load a text model. The booster can predict and save, not train.
///
/// # Safety
///
/// `filename` must be NUL-terminated; `out` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_BoosterLoadFromModelfile(filename: *const c_char, out: *mut RawHandle) -> c_int {
    api_call(|| {
        // SAFETY: caller contract.
        let (filename, out) = unsafe { (c_str(filename, "filename")?, self::out(out, "out")?) };
        let booster = Booster::load_model(Path::new(filename))?;
        register_booster(booster, out);
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn LGBM_BoosterFree(handle: RawHandle) -> c_int {
    api_call(|| boosters().remove(handle).map(drop))
}

/// Run one boosting round; `is_finished` is set to 1 once training is over.
///
/// # Safety
///
/// `is_finished` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_BoosterUpdateOneIter(handle: RawHandle, is_finished: *mut c_int) -> c_int {
    api_call(|| {
        // SAFETY: caller contract.
        let is_finished = unsafe { out(is_finished, "is_finished") }?;
        let finished = with_booster(handle, Booster::update_one_iter)?;
        *is_finished = c_int::from(finished);
        Ok(())
    })
}

/// Run one round with caller gradients and hessians, one per training row.
///
/// # Safety
///
/// `grad` and `hess` hold one value per training row; `is_finished` must
/// be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_BoosterUpdateOneIterCustom(
    handle: RawHandle,
    grad: *const f32,
    hess: *const f32,
    is_finished: *mut c_int,
) -> c_int {
    api_call(|| {
        // SAFETY: caller contract.
        let is_finished = unsafe { out(is_finished, "is_finished") }?;
        let finished = with_booster(handle, |booster| {
            let n = booster.num_train_data();
            // SAFETY: caller contract.
            let (grad, hess) = unsafe { (slice(grad, n, "grad")?, slice(hess, n, "hess")?) };
            booster.update_one_iter_custom(grad, hess)
        })?;
        *is_finished = c_int::from(finished);
        Ok(())
    })
}

/// Metrics of validation set `data_idx` (zero-based).
///
/// # Safety
///
/// `out_results` must hold [`LGBM_BoosterGetEvalCounts`] floats.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_BoosterEval(
    handle: RawHandle,
    data_idx: c_int,
    out_len: *mut i64,
    out_results: *mut f32,
) -> c_int {
    api_call(|| {
        let index = count(data_idx.into(), "data_idx")?;
        // SAFETY: caller contract.
        let out_len = unsafe { out(out_len, "out_len") }?;
        with_booster(handle, |booster| {
            let values = booster.eval(index)?;
            // SAFETY: caller contract.
            let results = unsafe { slice_mut(out_results, values.len(), "out_results") }?;
            for (dst, &v) in results.iter_mut().zip(values) {
                *dst = v as f32;
            }
            *out_len = values.len() as i64;
            Ok(())
        })
    })
}

/// Number of values [`LGBM_BoosterEval`] writes.
///
/// # Safety
///
/// `out_len` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_BoosterGetEvalCounts(handle: RawHandle, out_len: *mut c_int) -> c_int {
    api_call(|| {
        // SAFETY: caller contract.
        let out_len = unsafe { out(out_len, "out_len") }?;
        *out_len = with_booster(handle, |b| to_c_int(b.eval_names().len(), "metric count"))?;
        Ok(())
    })
}

/// # Safety
///
/// `out_iteration` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_BoosterGetCurrentIteration(handle: RawHandle, out_iteration: *mut c_int) -> c_int {
    api_call(|| {
        // SAFETY: caller contract.
        let out_iteration = unsafe { out(out_iteration, "out_iteration") }?;
        *out_iteration = with_booster(handle, |b| to_c_int(b.current_iteration(), "iteration"))?;
        Ok(())
    })
}

/// # Safety
///
/// `out_len` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_BoosterGetNumClasses(handle: RawHandle, out_len: *mut c_int) -> c_int {
    api_call(|| {
        // SAFETY: caller contract.
        let out_len = unsafe { out(out_len, "out_len") }?;
        *out_len = with_booster(handle, |b| to_c_int(b.num_classes(), "class count"))?;
        Ok(())
    })
}

/// Length of the prediction buffer for `num_row` rows.
///
/// # Safety
///
/// `out_len` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_BoosterCalcNumPredict(
    handle: RawHandle,
    num_row: c_int,
    predict_type: c_int,
    num_iteration: c_int,
    out_len: *mut i64,
) -> c_int {
    api_call(|| {
        let num_row = count(num_row.into(), "num_row")?;
        let kind = PredictKind::from_code(predict_type)?;
        // SAFETY: caller contract.
        let out_len = unsafe { out(out_len, "out_len") }?;
        *out_len = with_booster(handle, |b| {
            Ok(b.predictor(kind, iteration_limit(num_iteration)).num_predictions(num_row) as i64)
        })?;
        Ok(())
    })
}

/// Save the first `num_iteration` iterations (all when `<= 0`).
///
/// # Safety
///
/// `filename` must be NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_BoosterSaveModel(
    handle: RawHandle,
    num_iteration: c_int,
    filename: *const c_char,
) -> c_int {
    api_call(|| {
        // SAFETY: caller contract.
        let filename = unsafe { c_str(filename, "filename") }?;
        with_booster(handle, |b| b.save_model(Path::new(filename), iteration_limit(num_iteration)))
    })
}

/// Text model into a caller buffer. `out_len` receives the size needed,
/// NUL included; nothing is copied when `buffer_len` is smaller.
///
/// # Safety
///
/// `out_str` must be writable for `buffer_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_BoosterSaveModelToString(
    handle: RawHandle,
    num_iteration: c_int,
    buffer_len: i64,
    out_len: *mut i64,
    out_str: *mut c_char,
) -> c_int {
    api_call(|| {
        let text = with_booster(handle, |b| Ok(b.save_model_to_string(iteration_limit(num_iteration))))?;
        // SAFETY: caller contract.
        unsafe { write_string(&text, buffer_len, out_len, out_str) }
    })
}

/// JSON dump into a caller buffer, sized like
/// [`LGBM_BoosterSaveModelToString`].
///
/// # Safety
///
/// `out_str` must be writable for `buffer_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_BoosterDumpModel(
    handle: RawHandle,
    num_iteration: c_int,
    buffer_len: i64,
    out_len: *mut i64,
    out_str: *mut c_char,
) -> c_int {
    api_call(|| {
        let json = with_booster(handle, |b| b.dump_model(iteration_limit(num_iteration)))?;
        // SAFETY: caller contract.
        unsafe { write_string(&json, buffer_len, out_len, out_str) }
    })
}

/// Predict a dense matrix.
///
/// # Safety
///
/// `data` holds `nrow * ncol` values of `data_type`; `out_result` must hold
/// [`LGBM_BoosterCalcNumPredict`] doubles.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_BoosterPredictForMat(
    handle: RawHandle,
    data: *const c_void,
    data_type: c_int,
    nrow: i32,
    ncol: i32,
    is_row_major: c_int,
    predict_type: c_int,
    num_iteration: c_int,
    out_result: *mut f64,
) -> c_int {
    api_call(|| {
        let nrow = count(nrow.into(), "nrow")?;
        let ncol = count(ncol.into(), "ncol")?;
        let kind = PredictKind::from_code(predict_type)?;
        let len = nrow
            .checked_mul(ncol)
            .ok_or_else(|| Error::InvalidArgument(format!("{nrow} x {ncol} overflows")))?;
        // SAFETY: caller contract.
        let data = unsafe { numeric(data, data_type, len, "data") }?;
        let raw = RawFeatures::from_dense(data, nrow, ncol, is_row_major != 0)?;
        with_booster(handle, |b| {
            let predictions = b.predict_matrix(raw.rows(), kind, iteration_limit(num_iteration));
            // SAFETY: caller contract.
            let out = unsafe { slice_mut(out_result, predictions.len(), "out_result") }?;
            out.copy_from_slice(&predictions);
            Ok(())
        })
    })
}

/// Predict rows in compressed sparse row form.
///
/// # Safety
///
/// Buffers as in [`LGBM_CreateDatasetFromCSR`]; `out_result` must hold
/// [`LGBM_BoosterCalcNumPredict`] doubles for `nindptr - 1` rows.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_BoosterPredictForCSR(
    handle: RawHandle,
    indptr: *const c_void,
    indptr_type: c_int,
    indices: *const i32,
    data: *const c_void,
    data_type: c_int,
    nindptr: i64,
    nelem: i64,
    num_col: i64,
    predict_type: c_int,
    num_iteration: c_int,
    out_len: *mut i64,
    out_result: *mut f64,
) -> c_int {
    api_call(|| {
        let nindptr = count(nindptr, "nindptr")?;
        let nelem = count(nelem, "nelem")?;
        let num_col = count(num_col, "num_col")?;
        let kind = PredictKind::from_code(predict_type)?;
        // SAFETY: caller contract.
        let (indptr, indices, data, out_len) = unsafe {
            (
                numeric(indptr, indptr_type, nindptr, "indptr")?,
                slice(indices, nelem, "indices")?,
                numeric(data, data_type, nelem, "data")?,
                out(out_len, "out_len")?,
            )
        };
        with_booster(handle, |b| {
            let predictions = b.predict_csr(indptr, indices, data, num_col, kind, iteration_limit(num_iteration))?;
            // SAFETY: caller contract.
            let out = unsafe { slice_mut(out_result, predictions.len(), "out_result") }?;
            out.copy_from_slice(&predictions);
            *out_len = predictions.len() as i64;
            Ok(())
        })
    })
}

/// Predict every row of a text file into `result_filename`.
///
/// # Safety
///
/// File names must be NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LGBM_BoosterPredictForFile(
    handle: RawHandle,
    predict_type: c_int,
    num_iteration: c_int,
    data_has_header: c_int,
    data_filename: *const c_char,
    result_filename: *const c_char,
) -> c_int {
    api_call(|| {
        let kind = PredictKind::from_code(predict_type)?;
        // SAFETY: caller contract.
        let (input, output) = unsafe {
            (
                c_str(data_filename, "data_filename")?,
                c_str(result_filename, "result_filename")?,
            )
        };
        with_booster(handle, |b| {
            b.predict_file(
                Path::new(input),
                Path::new(output),
                data_has_header != 0,
                kind,
                iteration_limit(num_iteration),
            )
        })
    })
}
