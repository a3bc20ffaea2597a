//! Native shared-library loading using libloading.
//!
//! **Security Note**: loading a library runs its initialisers and every
//! resolved function is called without validation. Only load lexer plugins
//! from trusted locations.

use std::ffi::c_void;
use std::ptr::NonNull;

use tracing::debug;

/// An opened (or failed-to-open) native module.
pub trait NativeModule: Send {
    /// Returns true if the module was opened successfully.
    fn is_valid(&self) -> bool;

    /// Resolves an exported symbol by name. Returns `None` for invalid modules
    /// and missing symbols.
    fn find_function(&self, name: &str) -> Option<NonNull<c_void>>;

    /// Describes why the module failed to open, if it did.
    fn error(&self) -> Option<&str> {
        None
    }
}

/// Opens native modules by path.
pub trait ModuleLoader: Send + Sync {
    /// Opens the module at `path`. Never fails: an unusable path yields a
    /// module whose [`NativeModule::is_valid`] is false.
    fn open(&self, path: &str) -> Box<dyn NativeModule>;
}

/// Loader backed by the operating system's dynamic linker.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibLoader;

impl ModuleLoader for LibLoader {
    fn open(&self, path: &str) -> Box<dyn NativeModule> {
        Box::new(DynamicLibrary::open(path))
    }
}

/// A shared library handle. The library is unloaded when this is dropped.
pub struct DynamicLibrary {
    path: String,
    library: Result<libloading::Library, String>,
}

impl DynamicLibrary {
    /// Opens the library at `path`, remembering the failure instead of
    /// returning it.
    pub fn open(path: &str) -> Self {
        debug!("Opening native library {}", path);

        // SAFETY: plugin libraries are trusted; their initialisers run here.
        let library = unsafe { libloading::Library::new(path) }.map_err(|e| e.to_string());

        Self {
            path: path.to_string(),
            library,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl NativeModule for DynamicLibrary {
    fn is_valid(&self) -> bool {
        self.library.is_ok()
    }

    fn find_function(&self, name: &str) -> Option<NonNull<c_void>> {
        let library = self.library.as_ref().ok()?;

        // SAFETY: the symbol is read as a raw address and never dereferenced here.
        let symbol: libloading::Symbol<*mut c_void> =
            unsafe { library.get(name.as_bytes()) }.ok()?;

        NonNull::new(*symbol)
    }

    fn error(&self) -> Option<&str> {
        self.library.as_ref().err().map(String::as_str)
    }
}

impl Drop for DynamicLibrary {
    fn drop(&mut self) {
        if self.library.is_ok() {
            debug!("Unloading native library {}", self.path);
        }
    }
}

impl std::fmt::Debug for DynamicLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicLibrary")
            .field("path", &self.path)
            .field("valid", &self.is_valid())
            .finish()
    }
}
