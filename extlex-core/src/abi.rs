//! ABI definitions for external lexer libraries.
//!
//! A lexer plugin is a shared library exporting exactly three functions with
//! the platform calling convention (`__stdcall` on 32-bit Windows, C elsewhere):
//!
//! ```c
//! int  GetLexerCount();
//! void GetLexerName(unsigned int index, char *name, int buflength);
//! LexerFactoryFunction GetLexerFactory(unsigned int index);
//! ```
//!
//! The factory returned for an index is called with the C calling convention
//! and produces an opaque lexer instance owned by the host editor.

use std::ffi::{c_char, c_int, c_uint, c_void};

/// Symbol reporting how many lexers the library exports.
pub const COUNT_SYMBOL: &str = "GetLexerCount";

/// Symbol writing the name of the lexer at an index into a caller buffer.
pub const NAME_SYMBOL: &str = "GetLexerName";

/// Symbol returning the factory for the lexer at an index.
pub const FACTORY_SYMBOL: &str = "GetLexerFactory";

/// Capacity of the buffer handed to `GetLexerName`, including the terminator.
pub const NAME_BUFFER_LEN: usize = 100;

/// Creates a lexer instance. A null return means the lexer is unavailable.
pub type LexerFactoryFn = unsafe extern "C" fn() -> *mut c_void;

/// Function signature for `GetLexerCount`.
pub type GetLexerCountFn = unsafe extern "system" fn() -> c_int;

/// Function signature for `GetLexerName`.
pub type GetLexerNameFn = unsafe extern "system" fn(index: c_uint, name: *mut c_char, buf_len: c_int);

/// Function signature for `GetLexerFactory`.
pub type GetLexerFactoryFn = unsafe extern "system" fn(index: c_uint) -> Option<LexerFactoryFn>;

/// Copies `name` into a caller-provided buffer, truncating on a character
/// boundary so the result is always null-terminated and valid UTF-8.
///
/// # Safety
///
/// `buf` must be null or point to at least `buf_len` writable bytes.
pub unsafe fn copy_name(name: &str, buf: *mut c_char, buf_len: c_int) {
    if buf.is_null() || buf_len <= 0 {
        return;
    }

    let mut len = name.len().min(buf_len as usize - 1);
    while !name.is_char_boundary(len) {
        len -= 1;
    }

    unsafe {
        std::ptr::copy_nonoverlapping(name.as_ptr(), buf.cast::<u8>(), len);
        *buf.add(len) = 0;
    }
}

/// Declares the lexers exported by a plugin library.
///
/// This macro generates `GetLexerCount`, `GetLexerName` and `GetLexerFactory`
/// for a fixed table of names and factories. Invoke it once per `cdylib`.
///
/// # Example
///
/// ```rust,ignore
/// use std::ffi::c_void;
///
/// unsafe extern "C" fn create_ini() -> *mut c_void {
///     Box::into_raw(Box::new(IniLexer::default())).cast()
/// }
///
/// extlex_core::export_lexers! {
///     "ini" => create_ini,
/// }
/// ```
#[macro_export]
macro_rules! export_lexers {
    ($($name:expr => $factory:path),+ $(,)?) => {
        static EXTLEX_EXPORTED_LEXERS: &[(&str, $crate::abi::LexerFactoryFn)] =
            &[$(($name, $factory as $crate::abi::LexerFactoryFn)),+];

        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "system" fn GetLexerCount() -> ::std::ffi::c_int {
            EXTLEX_EXPORTED_LEXERS.len() as ::std::ffi::c_int
        }

        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "system" fn GetLexerName(
            index: ::std::ffi::c_uint,
            name: *mut ::std::ffi::c_char,
            buf_len: ::std::ffi::c_int,
        ) {
            let lexer_name = EXTLEX_EXPORTED_LEXERS
                .get(index as usize)
                .map(|(lexer_name, _)| *lexer_name)
                .unwrap_or("");
            $crate::abi::copy_name(lexer_name, name, buf_len);
        }

        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "system" fn GetLexerFactory(
            index: ::std::ffi::c_uint,
        ) -> ::std::option::Option<$crate::abi::LexerFactoryFn> {
            EXTLEX_EXPORTED_LEXERS
                .get(index as usize)
                .map(|(_, factory)| *factory)
        }
    };
}
