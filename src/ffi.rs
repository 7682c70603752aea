//! FFI bindings for Ovula
//!
//! C-compatible entry points for mobile and desktop hosts. All functions
//! take and return null-terminated UTF-8 strings; returned strings are
//! allocated here and must be freed with `ovula_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::dates::{self, WeekStart};
use crate::error::CycleError;
use crate::schema::parse_date_str;
use crate::tracker::{month_view_json, project_cycle_json, summarize_history_json};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(e) => {
            set_last_error(&format!("Output contains a NUL byte at position {}", e.nul_position()));
            ptr::null_mut()
        }
    }
}

/// Hand a result to the host, recording the error on failure
fn into_c_result(result: Result<String, CycleError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Project one cycle and return the projection as JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string holding
///   `{"start_date", "period_length", "cycle_length"}`.
/// - Returns a newly allocated string that must be freed with `ovula_free_string`.
/// - Returns NULL on error; call `ovula_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn ovula_project_cycle(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    into_c_result(project_cycle_json(&json_str))
}

/// Summarize a cycle list and return the summary as JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string holding a JSON array of
///   cycle records or a `{success, data}` envelope.
/// - `today` is a `YYYY-MM-DD` C string, or NULL for the local date.
/// - Returns a newly allocated string that must be freed with `ovula_free_string`.
/// - Returns NULL on error; call `ovula_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn ovula_summarize_history(
    json: *const c_char,
    today: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let today = if today.is_null() {
        dates::today()
    } else {
        let parsed = cstr_to_string(today)
            .ok_or_else(|| CycleError::InvalidInput("today is not valid UTF-8".to_string()))
            .and_then(|s| parse_date_str(&s));
        match parsed {
            Ok(date) => date,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    into_c_result(summarize_history_json(&json_str, today))
}

/// Build the month grid for one cycle record and return it as JSON.
///
/// Weeks start on Monday.
///
/// # Safety
/// - `json` must be a valid null-terminated C string holding one cycle record,
///   bare or enveloped.
/// - `month` is 1-based.
/// - Returns a newly allocated string that must be freed with `ovula_free_string`.
/// - Returns NULL on error; call `ovula_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn ovula_month_view(
    json: *const c_char,
    year: i32,
    month: u32,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    into_c_result(month_view_json(&json_str, year, month, WeekStart::Monday))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Ovula functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an Ovula function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn ovula_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Ovula function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn ovula_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Ovula library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn ovula_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
