mod error;
mod handle;
mod types;

pub use error::*;
pub use handle::*;
pub use types::*;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::AssertUnwindSafe;

use tracing_subscriber::EnvFilter;

use error::{fail, filter_failure, transform_failure};

/// Execute a closure that returns a `TPStatus`, catching any panics
/// and converting them into `TPStatus::ErrorInternal`.
fn catch_panic<F: FnOnce() -> TPStatus>(f: F) -> TPStatus {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(status) => status,
        Err(_) => fail(TPStatus::ErrorInternal, "internal panic"),
    }
}

/// Borrow a C string argument as UTF-8.
unsafe fn c_str<'a>(ptr: *const c_char, what: &str) -> Result<&'a str, TPStatus> {
    if ptr.is_null() {
        return Err(fail(TPStatus::ErrorInvalidArgument, format!("{} is null", what)));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|e| fail(TPStatus::ErrorInvalidArgument, format!("invalid {}: {}", what, e)))
}

/// Hand a buffer to the caller; it must be released with `tp_free_buffer`.
unsafe fn give_buffer(data: Vec<u8>, output: *mut *mut u8, output_len: *mut usize) {
    let data = data.into_boxed_slice();
    *output_len = data.len();
    *output = Box::into_raw(data) as *mut u8;
}

/// Install a `tracing` subscriber writing to stderr. The filter comes from
/// `RUST_LOG` and defaults to `info`. Calling it again is a no-op.
#[no_mangle]
pub extern "C" fn tp_init_logging() -> TPStatus {
    catch_panic(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        // A subscriber installed earlier, by us or by the host, is kept.
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
        TPStatus::Ok
    })
}

/// Create a transform element.
///
/// On success, writes a heap-allocated `TPTransform` pointer into `*out`.
/// The caller must later call `tp_transform_destroy`.
#[no_mangle]
pub unsafe extern "C" fn tp_transform_create(out: *mut *mut TPTransform) -> TPStatus {
    catch_panic(|| {
        if out.is_null() {
            return fail(TPStatus::ErrorInvalidArgument, "out is null");
        }
        *out = Box::into_raw(Box::new(TPTransform::new()));
        TPStatus::Ok
    })
}

/// Destroy a transform element. Passing a null pointer is a no-op.
#[no_mangle]
pub unsafe extern "C" fn tp_transform_destroy(transform: *mut TPTransform) -> TPStatus {
    if transform.is_null() {
        return TPStatus::Ok;
    }
    drop(Box::from_raw(transform));
    TPStatus::Ok
}

/// Set a transform property (`mode`, `option`, `acceleration`, `silent`,
/// `debug`) from its string form.
#[no_mangle]
pub unsafe extern "C" fn tp_transform_set_property(
    transform: *mut TPTransform,
    name: *const c_char,
    value: *const c_char,
) -> TPStatus {
    catch_panic(|| {
        if transform.is_null() {
            return fail(TPStatus::ErrorInvalidArgument, "transform is null");
        }
        let (name, value) = match (c_str(name, "name"), c_str(value, "value")) {
            (Ok(n), Ok(v)) => (n, v),
            (Err(status), _) | (_, Err(status)) => return status,
        };
        match (*transform).element.set_property(name, value) {
            Ok(()) => TPStatus::Ok,
            Err(e) => transform_failure(e),
        }
    })
}

/// Bind the transform to its input stream and write the resulting output
/// stream into `*output`.
#[no_mangle]
pub unsafe extern "C" fn tp_transform_configure(
    transform: *mut TPTransform,
    input: *const TPTensorConfig,
    output: *mut TPTensorConfig,
) -> TPStatus {
    catch_panic(|| {
        if transform.is_null() || input.is_null() || output.is_null() {
            return fail(TPStatus::ErrorInvalidArgument, "null argument");
        }
        let config = match (*input).to_stream_config() {
            Ok(c) => c,
            Err(e) => return fail(TPStatus::ErrorInvalidArgument, e),
        };
        match (*transform).element.configure(&config) {
            Ok(out) => {
                *output = TPTensorConfig::from(&out);
                TPStatus::Ok
            }
            Err(e) => transform_failure(e),
        }
    })
}

/// Transform one buffer.
///
/// On success, writes a heap-allocated buffer into `*output` and its length
/// into `*output_len`. The caller must free it with `tp_free_buffer`.
#[no_mangle]
pub unsafe extern "C" fn tp_transform_process(
    transform: *mut TPTransform,
    input: *const u8,
    input_len: usize,
    output: *mut *mut u8,
    output_len: *mut usize,
) -> TPStatus {
    catch_panic(|| {
        if transform.is_null() || output.is_null() || output_len.is_null() {
            return fail(TPStatus::ErrorInvalidArgument, "null argument");
        }
        let Some(input) = input_slice(input, input_len) else {
            return fail(TPStatus::ErrorInvalidArgument, "input is null");
        };
        match (*transform).element.process(input) {
            Ok(data) => {
                give_buffer(data, output, output_len);
                TPStatus::Ok
            }
            Err(e) => transform_failure(e),
        }
    })
}

/// Create a filter element bound to the process-wide back-end registry.
#[no_mangle]
pub unsafe extern "C" fn tp_filter_create(out: *mut *mut TPFilter) -> TPStatus {
    catch_panic(|| {
        if out.is_null() {
            return fail(TPStatus::ErrorInvalidArgument, "out is null");
        }
        *out = Box::into_raw(Box::new(TPFilter::new()));
        TPStatus::Ok
    })
}

/// Destroy a filter element, closing its back-end. Passing a null pointer
/// is a no-op.
#[no_mangle]
pub unsafe extern "C" fn tp_filter_destroy(filter: *mut TPFilter) -> TPStatus {
    if filter.is_null() {
        return TPStatus::Ok;
    }
    catch_panic(|| {
        drop(Box::from_raw(filter));
        TPStatus::Ok
    })
}

/// Set a filter property (`framework`, `model`, `input`, `inputtype`,
/// `output`, `outputtype`, `silent`, `debug`) from its string form.
#[no_mangle]
pub unsafe extern "C" fn tp_filter_set_property(
    filter: *mut TPFilter,
    name: *const c_char,
    value: *const c_char,
) -> TPStatus {
    catch_panic(|| {
        if filter.is_null() {
            return fail(TPStatus::ErrorInvalidArgument, "filter is null");
        }
        let (name, value) = match (c_str(name, "name"), c_str(value, "value")) {
            (Ok(n), Ok(v)) => (n, v),
            (Err(status), _) | (_, Err(status)) => return status,
        };
        match (*filter).element.set_property(name, value) {
            Ok(()) => TPStatus::Ok,
            Err(e) => filter_failure(e),
        }
    })
}

/// Run inference on one buffer. Ownership of `*output` follows
/// `tp_transform_process`.
#[no_mangle]
pub unsafe extern "C" fn tp_filter_process(
    filter: *mut TPFilter,
    input: *const u8,
    input_len: usize,
    output: *mut *mut u8,
    output_len: *mut usize,
) -> TPStatus {
    catch_panic(|| {
        if filter.is_null() || output.is_null() || output_len.is_null() {
            return fail(TPStatus::ErrorInvalidArgument, "null argument");
        }
        let Some(input) = input_slice(input, input_len) else {
            return fail(TPStatus::ErrorInvalidArgument, "input is null");
        };
        match (*filter).element.process(input) {
            Ok(data) => {
                give_buffer(data, output, output_len);
                TPStatus::Ok
            }
            Err(e) => filter_failure(e),
        }
    })
}

/// Retrieve the last error message.
///
/// Returns a pointer to a C string describing the most recent error on this
/// thread, or null if there is none. The caller must free the returned
/// string with `tp_free_string`.
#[no_mangle]
pub extern "C" fn tp_last_error() -> *mut c_char {
    match error::take_last_error() {
        Some(e) => e.into_raw(),
        None => std::ptr::null_mut(),
    }
}

/// Free a string previously returned by `tp_last_error`.
#[no_mangle]
pub unsafe extern "C" fn tp_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Free a buffer returned by `tp_transform_process` or `tp_filter_process`.
#[no_mangle]
pub unsafe extern "C" fn tp_free_buffer(data: *mut u8, len: usize) {
    if !data.is_null() {
        drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(data, len)));
    }
}

unsafe fn input_slice<'a>(data: *const u8, len: usize) -> Option<&'a [u8]> {
    if len == 0 {
        return Some(&[]);
    }
    if data.is_null() {
        return None;
    }
    Some(std::slice::from_raw_parts(data, len))
}
