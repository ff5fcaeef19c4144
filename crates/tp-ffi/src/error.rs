use std::cell::RefCell;
use std::ffi::CString;
use std::fmt::Display;

use tp_filter::FilterError;
use tp_transform::TransformError;

use crate::types::TPStatus;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Store an error message for later retrieval via `tp_last_error`.
pub fn set_last_error(msg: impl Display) {
    let msg = msg.to_string().replace('\0', " ");
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Take the last error message, leaving `None` in its place.
pub fn take_last_error() -> Option<CString> {
    LAST_ERROR.with(|e| e.borrow_mut().take())
}

/// Record `msg` and return `status`.
pub(crate) fn fail(status: TPStatus, msg: impl Display) -> TPStatus {
    set_last_error(msg);
    status
}

pub(crate) fn transform_failure(err: TransformError) -> TPStatus {
    fail(err.category().into(), err)
}

pub(crate) fn filter_failure(err: FilterError) -> TPStatus {
    fail(err.category().into(), err)
}
