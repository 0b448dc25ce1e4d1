//! Purpose: C ABI bridge for bindings (librecops).
//! Exports: C-callable client and record-operation functions plus buffer/error helpers.
//! Role: Stable ABI surface for non-Rust bindings.
//! Invariants: JSON bytes in/out; opaque handles; explicit free functions.
//! Invariants: Output buffers are written only when the call succeeds.
//! Invariants: `rops_error.code` carries the store status code; `kind` the error kind.
#![allow(clippy::result_large_err)]
#![allow(non_camel_case_types)]

use crate::api::{
    Client, Key, StoreOptions, build_key, metadata_json, parse_bin_names, parse_operations,
};
use crate::core::error::{Error, ErrorKind};
use crate::store_paths::default_store_dir;
use serde_json::Value;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::PathBuf;
use std::ptr;

#[repr(C)]
pub struct rops_client {
    client: Client,
}

#[repr(C)]
pub struct rops_buf {
    data: *mut u8,
    len: usize,
}

#[repr(C)]
pub struct rops_error {
    code: i32,
    kind: i32,
    message: *mut c_char,
}

/// Opens a directory-backed client; a null `store_dir` uses the default directory.
#[unsafe(no_mangle)]
pub extern "C" fn rops_client_new(
    store_dir: *const c_char,
    default_ttl: u32,
    out_client: *mut *mut rops_client,
    out_err: *mut *mut rops_error,
) -> i32 {
    if out_client.is_null() {
        return fail(out_err, param("out_client is null"));
    }
    let dir = if store_dir.is_null() {
        default_store_dir()
    } else {
        match parse_c_str(store_dir, "store_dir") {
            Ok(dir) => PathBuf::from(dir),
            Err(err) => return fail(out_err, err),
        }
    };
    let options = StoreOptions::new().with_default_ttl(default_ttl);
    let client = match Client::open_dir(dir, options) {
        Ok(client) => client,
        Err(err) => return fail(out_err, err),
    };
    let handle = Box::new(rops_client { client });
    unsafe {
        *out_client = Box::into_raw(handle);
    }
    0
}

/// Creates a client over a private in-process store.
#[unsafe(no_mangle)]
pub extern "C" fn rops_client_new_memory(
    default_ttl: u32,
    out_client: *mut *mut rops_client,
    out_err: *mut *mut rops_error,
) -> i32 {
    if out_client.is_null() {
        return fail(out_err, param("out_client is null"));
    }
    let client = Client::memory(StoreOptions::new().with_default_ttl(default_ttl));
    let handle = Box::new(rops_client { client });
    unsafe {
        *out_client = Box::into_raw(handle);
    }
    0
}

#[unsafe(no_mangle)]
pub extern "C" fn rops_client_free(client: *mut rops_client) {
    if client.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(client));
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn rops_operate(
    client: *mut rops_client,
    key_json: *const u8,
    key_len: usize,
    ops_json: *const u8,
    ops_len: usize,
    options_json: *const u8,
    options_len: usize,
    out_bins: *mut rops_buf,
    out_err: *mut *mut rops_error,
) -> i32 {
    run(out_err, || {
        let client = borrow_client(client)?;
        let key = parse_key(key_json, key_len)?;
        let operations = parse_operations(&parse_json_bytes(ops_json, ops_len, "ops_json")?)?;
        let options = parse_optional_json(options_json, options_len, "options_json")?;
        check_out_buf(out_bins)?;
        let bins = client.operate(&key, operations, options.as_ref())?;
        write_json_buf(out_bins, &Value::Object(bins))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn rops_append(
    client: *mut rops_client,
    key_json: *const u8,
    key_len: usize,
    bin: *const c_char,
    text: *const c_char,
    options_json: *const u8,
    options_len: usize,
    out_err: *mut *mut rops_error,
) -> i32 {
    run(out_err, || {
        let client = borrow_client(client)?;
        let key = parse_key(key_json, key_len)?;
        let bin = parse_c_str(bin, "bin")?;
        let text = parse_c_str(text, "text")?;
        let options = parse_optional_json(options_json, options_len, "options_json")?;
        client.append(&key, bin, text, options.as_ref())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn rops_prepend(
    client: *mut rops_client,
    key_json: *const u8,
    key_len: usize,
    bin: *const c_char,
    text: *const c_char,
    options_json: *const u8,
    options_len: usize,
    out_err: *mut *mut rops_error,
) -> i32 {
    run(out_err, || {
        let client = borrow_client(client)?;
        let key = parse_key(key_json, key_len)?;
        let bin = parse_c_str(bin, "bin")?;
        let text = parse_c_str(text, "text")?;
        let options = parse_optional_json(options_json, options_len, "options_json")?;
        client.prepend(&key, bin, text, options.as_ref())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn rops_increment(
    client: *mut rops_client,
    key_json: *const u8,
    key_len: usize,
    bin: *const c_char,
    offset: i64,
    initial_value: i64,
    options_json: *const u8,
    options_len: usize,
    out_err: *mut *mut rops_error,
) -> i32 {
    run(out_err, || {
        let client = borrow_client(client)?;
        let key = parse_key(key_json, key_len)?;
        let bin = parse_c_str(bin, "bin")?;
        let options = parse_optional_json(options_json, options_len, "options_json")?;
        client.increment(&key, bin, offset, initial_value, options.as_ref())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn rops_touch(
    client: *mut rops_client,
    key_json: *const u8,
    key_len: usize,
    ttl: u32,
    options_json: *const u8,
    options_len: usize,
    out_err: *mut *mut rops_error,
) -> i32 {
    run(out_err, || {
        let client = borrow_client(client)?;
        let key = parse_key(key_json, key_len)?;
        let options = parse_optional_json(options_json, options_len, "options_json")?;
        client.touch(&key, ttl, options.as_ref())
    })
}

/// Writes `{"generation": .., "ttl": ..}` to `out_metadata`.
#[unsafe(no_mangle)]
pub extern "C" fn rops_exists(
    client: *mut rops_client,
    key_json: *const u8,
    key_len: usize,
    options_json: *const u8,
    options_len: usize,
    out_metadata: *mut rops_buf,
    out_err: *mut *mut rops_error,
) -> i32 {
    run(out_err, || {
        let client = borrow_client(client)?;
        let key = parse_key(key_json, key_len)?;
        let options = parse_optional_json(options_json, options_len, "options_json")?;
        check_out_buf(out_metadata)?;
        let metadata = client.exists(&key, options.as_ref())?;
        write_json_buf(out_metadata, &metadata_json(&metadata))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn rops_remove(
    client: *mut rops_client,
    key_json: *const u8,
    key_len: usize,
    options_json: *const u8,
    options_len: usize,
    out_err: *mut *mut rops_error,
) -> i32 {
    run(out_err, || {
        let client = borrow_client(client)?;
        let key = parse_key(key_json, key_len)?;
        let options = parse_optional_json(options_json, options_len, "options_json")?;
        client.remove(&key, options.as_ref())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn rops_remove_bins(
    client: *mut rops_client,
    key_json: *const u8,
    key_len: usize,
    bins_json: *const u8,
    bins_len: usize,
    options_json: *const u8,
    options_len: usize,
    out_err: *mut *mut rops_error,
) -> i32 {
    run(out_err, || {
        let client = borrow_client(client)?;
        let key = parse_key(key_json, key_len)?;
        let bins = parse_bin_names(&parse_json_bytes(bins_json, bins_len, "bins_json")?)?;
        let options = parse_optional_json(options_json, options_len, "options_json")?;
        client.remove_bins(&key, &bins, options.as_ref())
    })
}

/// Writes `{"bins": {..}, "metadata": {..}}`; a null `bins_json` reads every bin.
#[unsafe(no_mangle)]
pub extern "C" fn rops_get(
    client: *mut rops_client,
    key_json: *const u8,
    key_len: usize,
    bins_json: *const u8,
    bins_len: usize,
    options_json: *const u8,
    options_len: usize,
    out_record: *mut rops_buf,
    out_err: *mut *mut rops_error,
) -> i32 {
    run(out_err, || {
        let client = borrow_client(client)?;
        let key = parse_key(key_json, key_len)?;
        let bins = parse_optional_json(bins_json, bins_len, "bins_json")?
            .map(|bins| parse_bin_names(&bins))
            .transpose()?;
        let options = parse_optional_json(options_json, options_len, "options_json")?;
        check_out_buf(out_record)?;
        let record = client.get(&key, bins.as_deref(), options.as_ref())?;
        write_json_buf(out_record, &record.to_json())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn rops_put(
    client: *mut rops_client,
    key_json: *const u8,
    key_len: usize,
    bins_json: *const u8,
    bins_len: usize,
    options_json: *const u8,
    options_len: usize,
    out_err: *mut *mut rops_error,
) -> i32 {
    run(out_err, || {
        let client = borrow_client(client)?;
        let key = parse_key(key_json, key_len)?;
        let Value::Object(bins) = parse_json_bytes(bins_json, bins_len, "bins_json")? else {
            return Err(param("bins_json must be a JSON object"));
        };
        let options = parse_optional_json(options_json, options_len, "options_json")?;
        client.put(&key, &bins, options.as_ref())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn rops_buf_free(buf: *mut rops_buf) {
    if buf.is_null() {
        return;
    }
    unsafe {
        let buf = &mut *buf;
        if !buf.data.is_null() {
            drop(Vec::from_raw_parts(buf.data, buf.len, buf.len));
        }
        buf.data = ptr::null_mut();
        buf.len = 0;
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn rops_error_free(err: *mut rops_error) {
    if err.is_null() {
        return;
    }
    unsafe {
        let err = Box::from_raw(err);
        if !err.message.is_null() {
            drop(CString::from_raw(err.message));
        }
    }
}

fn run(out_err: *mut *mut rops_error, call: impl FnOnce() -> Result<(), Error>) -> i32 {
    match call() {
        Ok(()) => 0,
        Err(err) => fail(out_err, err),
    }
}

fn borrow_client<'a>(client: *mut rops_client) -> Result<&'a Client, Error> {
    if client.is_null() {
        return Err(param("client is null"));
    }
    Ok(unsafe { &(*client).client })
}

fn parse_c_str<'a>(input: *const c_char, name: &str) -> Result<&'a str, Error> {
    if input.is_null() {
        return Err(param(format!("{name} is null")));
    }
    unsafe { CStr::from_ptr(input) }
        .to_str()
        .map_err(|_| param(format!("{name} is not valid UTF-8")))
}

fn parse_key(bytes: *const u8, len: usize) -> Result<Key, Error> {
    build_key(&parse_json_bytes(bytes, len, "key_json")?)
}

fn parse_json_bytes(bytes: *const u8, len: usize, name: &str) -> Result<Value, Error> {
    if bytes.is_null() {
        return Err(param(format!("{name} is null")));
    }
    let slice = unsafe { std::slice::from_raw_parts(bytes, len) };
    let text = std::str::from_utf8(slice)
        .map_err(|err| param(format!("{name} is not valid UTF-8")).with_source(err))?;
    serde_json::from_str(text).map_err(|err| param(format!("{name} is not valid JSON")).with_source(err))
}

fn parse_optional_json(bytes: *const u8, len: usize, name: &str) -> Result<Option<Value>, Error> {
    if bytes.is_null() {
        return Ok(None);
    }
    parse_json_bytes(bytes, len, name).map(Some)
}

fn check_out_buf(out: *mut rops_buf) -> Result<(), Error> {
    if out.is_null() {
        return Err(param("output buffer is null"));
    }
    Ok(())
}

fn write_json_buf(out: *mut rops_buf, value: &Value) -> Result<(), Error> {
    check_out_buf(out)?;
    let json_bytes = serde_json::to_vec(value).map_err(|err| {
        Error::new(ErrorKind::Demarshal)
            .with_message("failed to serialize result")
            .with_source(err)
    })?;
    unsafe {
        let buf = &mut *out;
        let mut data = json_bytes.into_boxed_slice();
        buf.len = data.len();
        buf.data = data.as_mut_ptr();
        std::mem::forget(data);
    }
    Ok(())
}

fn fail(out_err: *mut *mut rops_error, err: Error) -> i32 {
    if out_err.is_null() {
        return -1;
    }
    let error = Box::new(rops_error {
        code: err.code(),
        kind: error_kind_code(err.kind()),
        message: to_c_string(&err.describe()),
    });
    unsafe {
        *out_err = Box::into_raw(error);
    }
    -1
}

fn param(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Param).with_message(message)
}

fn to_c_string(input: &str) -> *mut c_char {
    CString::new(input)
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

fn error_kind_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Param => 1,
        ErrorKind::Store => 2,
        ErrorKind::Demarshal => 3,
    }
}
