use std::error::Error;
use std::ffi::{CStr, CString};
use std::os::raw::c_void;
use std::str::FromStr;

use duckdb::vtab::BindInfo;
use libduckdb_sys::{
    duckdb_bind_get_named_parameter, duckdb_bind_info, duckdb_destroy_value, duckdb_free,
    duckdb_get_varchar, duckdb_is_null_value,
};

/// State of an optional `VARCHAR` named parameter at bind time.
#[derive(Debug, Eq, PartialEq)]
pub(crate) enum NamedParameterVarchar {
    Missing,
    Null,
    Value(String),
}

impl NamedParameterVarchar {
    /// Parse the value, treating omitted, NULL and the literal string
    /// `'null'` as "use the default".
    pub(crate) fn parse_or_default<T>(self, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr<Err = String>,
    {
        match self {
            Self::Missing | Self::Null => Ok(default),
            Self::Value(raw) if raw.trim().eq_ignore_ascii_case("null") => Ok(default),
            Self::Value(raw) => raw.parse::<T>().map_err(Into::into),
        }
    }
}

pub(crate) fn get_named_parameter_varchar(
    bind: &BindInfo,
    name: &str,
) -> Result<NamedParameterVarchar, Box<dyn Error>> {
    let name_cstr = CString::new(name)?;

    // SAFETY: The returned value is owned by us and valid only for this bind callback.
    let mut value =
        unsafe { duckdb_bind_get_named_parameter(bind_info_ptr(bind), name_cstr.as_ptr()) };
    if value.is_null() {
        return Ok(NamedParameterVarchar::Missing);
    }

    // SAFETY: `value` is a valid `duckdb_value` handle and is destroyed exactly once below.
    let result = unsafe {
        if duckdb_is_null_value(value) {
            Ok(NamedParameterVarchar::Null)
        } else {
            let varchar = duckdb_get_varchar(value);
            if varchar.is_null() {
                Err(format!("Failed to read named parameter '{}' as VARCHAR", name).into())
            } else {
                let text = CStr::from_ptr(varchar).to_string_lossy().into_owned();
                duckdb_free(varchar as *mut c_void);
                Ok(NamedParameterVarchar::Value(text))
            }
        }
    };

    // SAFETY: `value` has not been destroyed yet and must be released once.
    unsafe {
        duckdb_destroy_value(&mut value);
    }

    result
}

fn bind_info_ptr(bind: &BindInfo) -> duckdb_bind_info {
    // SAFETY: `duckdb::vtab::BindInfo` wraps a single `duckdb_bind_info` field and exposes
    // no raw accessor; re-check this layout whenever the pinned duckdb-rs version changes.
    unsafe { *(bind as *const BindInfo as *const duckdb_bind_info) }
}
