//! A lexer plugin exporting three lexers, built as a shared library so the
//! loader tests can open it through the system dynamic linker.
//!
//! Each factory returns the address of a distinct static in this library.
//! Callers may compare the pointers but never dereference them.

use std::ffi::c_void;
use std::ptr::addr_of;

static ALPHA: u8 = 1;
static BETA: u8 = 2;
static GAMMA: u8 = 3;

unsafe extern "C" fn create_alpha() -> *mut c_void {
    addr_of!(ALPHA) as *mut c_void
}

unsafe extern "C" fn create_beta() -> *mut c_void {
    addr_of!(BETA) as *mut c_void
}

unsafe extern "C" fn create_gamma() -> *mut c_void {
    addr_of!(GAMMA) as *mut c_void
}

extlex_core::export_lexers! {
    "Alpha" => create_alpha,
    "Beta" => create_beta,
    "Gamma" => create_gamma,
}
