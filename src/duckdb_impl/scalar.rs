//! Shared DuckDB scalar invoke helpers.
//!
//! These helpers centralize flat vector access, per-row NULL checks,
//! `duckdb_string_t` decoding and output insertion.
//!
//! # Safety
//! These helpers MUST only be called from within a DuckDB scalar `invoke()` while the
//! underlying vectors are valid, with input/output logical types matching the helper.

use std::error::Error;
use std::ffi::CString;

use duckdb::{
    Result,
    core::{DataChunkHandle, FlatVector, Inserter, LogicalTypeId},
    vtab::arrow::WritableVector,
};
use libduckdb_sys::duckdb_string_t;

#[derive(Debug, Clone)]
pub enum VarcharOutput {
    Null,
    Value(String),
}

/// Decode a DuckDB string value into a Rust-owned `String`.
///
/// # Safety
///
/// `s` must come from a non-NULL `duckdb_string_t` row of a vector that is
/// valid for the active invocation.
pub unsafe fn decode_duckdb_string(s: &duckdb_string_t) -> String {
    // SAFETY: Reading the inlined length is valid for both string layouts.
    let len = unsafe { s.value.inlined.length } as usize;
    if len == 0 {
        return String::new();
    }

    let bytes = if len <= 12 {
        // SAFETY: Strings of at most 12 bytes are stored inline.
        let inlined = unsafe { &s.value.inlined.inlined };
        // SAFETY: `inlined` holds `len` initialized bytes.
        unsafe { std::slice::from_raw_parts(inlined.as_ptr() as *const u8, len) }
    } else {
        // SAFETY: Longer strings point at DuckDB-owned storage of `len` bytes.
        let ptr = unsafe { s.value.pointer.ptr };
        unsafe { std::slice::from_raw_parts(ptr as *const u8, len) }
    };

    String::from_utf8_lossy(bytes).into_owned()
}

fn ensure_type(
    vec: &FlatVector,
    expected: LogicalTypeId,
    label: &str,
) -> Result<(), Box<dyn Error>> {
    let actual = vec.logical_type().id();
    if actual != expected {
        return Err(format!(
            "scalar helper type mismatch: {label} expected {expected:?}, got {actual:?}"
        )
        .into());
    }
    Ok(())
}

/// Invoke a unary `VARCHAR -> UBIGINT` scalar.
///
/// Outputs NULL when the input row is NULL or when `f` returns `None`.
pub fn invoke_unary_varchar_to_u64_nullable<F>(
    input: &DataChunkHandle,
    output: &mut dyn WritableVector,
    mut f: F,
) -> Result<(), Box<dyn Error>>
where
    F: FnMut(&str) -> Option<u64>,
{
    let len = input.len();
    let input_vec = input.flat_vector(0);
    ensure_type(&input_vec, LogicalTypeId::Varchar, "input[0]")?;
    let input_slice = input_vec.as_slice::<duckdb_string_t>();
    let mut output_vec = output.flat_vector();
    ensure_type(&output_vec, LogicalTypeId::UBigint, "output")?;

    for (i, s) in input_slice.iter().take(len).enumerate() {
        if input_vec.row_is_null(i as u64) {
            output_vec.set_null(i);
            continue;
        }

        // SAFETY: Row nullability is checked above.
        let val = unsafe { decode_duckdb_string(s) };
        match f(&val) {
            Some(v) => output_vec.as_mut_slice::<u64>()[i] = v,
            None => output_vec.set_null(i),
        }
    }

    Ok(())
}

/// Invoke a binary `VARCHAR, VARCHAR -> VARCHAR` scalar that outputs NULL
/// when either input is NULL.
pub fn invoke_binary_varchar_varchar_to_varchar<F>(
    input: &DataChunkHandle,
    output: &mut dyn WritableVector,
    mut f: F,
) -> Result<(), Box<dyn Error>>
where
    F: FnMut(&str, &str) -> Result<VarcharOutput, Box<dyn Error>>,
{
    let len = input.len();
    let input_vec_0 = input.flat_vector(0);
    let input_vec_1 = input.flat_vector(1);
    ensure_type(&input_vec_0, LogicalTypeId::Varchar, "input[0]")?;
    ensure_type(&input_vec_1, LogicalTypeId::Varchar, "input[1]")?;
    let input_slice_0 = input_vec_0.as_slice::<duckdb_string_t>();
    let input_slice_1 = input_vec_1.as_slice::<duckdb_string_t>();
    let mut output_vec = output.flat_vector();
    ensure_type(&output_vec, LogicalTypeId::Varchar, "output")?;

    for (i, (left_s, right_s)) in input_slice_0
        .iter()
        .take(len)
        .zip(input_slice_1.iter().take(len))
        .enumerate()
    {
        if input_vec_0.row_is_null(i as u64) || input_vec_1.row_is_null(i as u64) {
            output_vec.set_null(i);
            continue;
        }

        // SAFETY: Both input rows are checked non-NULL above.
        let left = unsafe { decode_duckdb_string(left_s) };
        // SAFETY: Both input rows are checked non-NULL above.
        let right = unsafe { decode_duckdb_string(right_s) };
        match f(&left, &right)? {
            VarcharOutput::Null => output_vec.set_null(i),
            VarcharOutput::Value(v) => output_vec.insert(i, CString::new(v)?),
        }
    }

    Ok(())
}
