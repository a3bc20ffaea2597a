//! A single lexer plugin library and the lexers discovered in it.

use std::ffi::{c_char, c_int, c_uint, c_void};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::abi::{
    GetLexerCountFn, GetLexerFactoryFn, GetLexerNameFn, COUNT_SYMBOL, FACTORY_SYMBOL,
    NAME_BUFFER_LEN, NAME_SYMBOL,
};
use crate::catalogue::Catalogue;
use crate::error::LoadError;
use crate::lexer::{LanguageId, LexerModule, PluginLexerModule};
use crate::native::{ModuleLoader, NativeModule};

/// One loaded plugin library.
///
/// Construction never fails. A path that cannot be opened, or a library that
/// is not a lexer plugin, yields an empty library that keeps the reason in
/// [`PluginLibrary::error`].
///
/// Dropping the library removes its lexers from the catalogue, releases them,
/// and only then unloads the native module.
pub struct PluginLibrary {
    path: String,
    error: Option<LoadError>,
    catalogue: Arc<Catalogue>,
    // Declared before `native` so modules are dropped before the unload.
    modules: Vec<Arc<PluginLexerModule>>,
    native: Box<dyn NativeModule>,
}

impl PluginLibrary {
    /// Opens `path` and registers every lexer it exports with `catalogue`.
    pub fn load(path: &str, loader: &dyn ModuleLoader, catalogue: Arc<Catalogue>) -> Self {
        let native = loader.open(path);
        let mut library = Self {
            path: path.to_string(),
            error: None,
            catalogue,
            modules: Vec::new(),
            native,
        };

        match library.discover() {
            Ok(count) => info!("Loaded {} lexer(s) from {}", count, library.path),
            Err(e) => {
                match &e {
                    LoadError::Open { .. } => warn!("{}", e),
                    _ => debug!("Skipping {}: {}", library.path, e),
                }
                library.error = Some(e);
            }
        }

        library
    }

    fn discover(&mut self) -> Result<usize, LoadError> {
        if !self.native.is_valid() {
            return Err(LoadError::Open {
                path: self.path.clone(),
                reason: self.native.error().unwrap_or("invalid module").to_string(),
            });
        }

        // SAFETY: the plugin ABI fixes these signatures; the library is trusted.
        let get_count: GetLexerCountFn =
            unsafe { self.resolve(COUNT_SYMBOL) }.ok_or(LoadError::NotALexerPlugin)?;
        let get_name: GetLexerNameFn =
            unsafe { self.resolve(NAME_SYMBOL) }.ok_or(LoadError::MissingSymbol(NAME_SYMBOL))?;
        let get_factory: GetLexerFactoryFn = unsafe { self.resolve(FACTORY_SYMBOL) }
            .ok_or(LoadError::MissingSymbol(FACTORY_SYMBOL))?;

        // The count is trusted; only a negative value is rejected.
        let count = unsafe { get_count() }.max(0) as c_uint;

        for index in 0..count {
            let mut buffer: [c_char; NAME_BUFFER_LEN] = [0; NAME_BUFFER_LEN];
            unsafe { get_name(index, buffer.as_mut_ptr(), NAME_BUFFER_LEN as c_int) };
            let name = name_from_buffer(&mut buffer);

            let module = Arc::new(PluginLexerModule::new(LanguageId::AUTOMATIC, name));
            unsafe { module.bind(get_factory, index) };

            let shared: Arc<dyn LexerModule> = module.clone();
            self.catalogue.add_module_ref(&shared);

            debug!(
                "Registered lexer '{}' (index {}) from {}",
                module.name(),
                index,
                self.path
            );
            self.modules.push(module);
        }

        Ok(self.modules.len())
    }

    /// Resolves `name` and reinterprets it as the function pointer type `F`.
    ///
    /// # Safety
    ///
    /// `F` must be a function pointer type matching the exported symbol.
    unsafe fn resolve<F: Copy>(&self, name: &str) -> Option<F> {
        debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<*mut c_void>());
        let address = self.native.find_function(name)?.as_ptr();
        Some(unsafe { std::mem::transmute_copy::<*mut c_void, F>(&address) })
    }

    /// The path this library was requested with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Why this library contributed no lexers, if it didn't.
    pub fn error(&self) -> Option<&LoadError> {
        self.error.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.native.is_valid()
    }

    pub fn modules(&self) -> impl Iterator<Item = &PluginLexerModule> {
        self.modules.iter().map(Arc::as_ref)
    }

    pub fn lexer_names(&self) -> Vec<String> {
        self.modules().map(|m| m.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Summary of this library for display.
    pub fn info(&self) -> LibraryInfo {
        LibraryInfo {
            path: self.path.clone(),
            lexers: self.lexer_names(),
            error: self.error.as_ref().map(|e| e.to_string()),
        }
    }
}

impl Drop for PluginLibrary {
    fn drop(&mut self) {
        for module in &self.modules {
            self.catalogue.remove(module.id());
            module.release();
        }
        if !self.modules.is_empty() {
            debug!("Released {} lexer(s) from {}", self.modules.len(), self.path);
        }
    }
}

impl std::fmt::Debug for PluginLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginLibrary")
            .field("path", &self.path)
            .field("error", &self.error)
            .field("modules", &self.modules)
            .finish()
    }
}

/// Summary information about a loaded library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryInfo {
    pub path: String,
    pub lexers: Vec<String>,
    pub error: Option<String>,
}

impl std::fmt::Display for LibraryInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error {
            Some(error) => write!(f, "{} - no lexers ({})", self.path, error),
            None => write!(
                f,
                "{} - {} lexer(s): {}",
                self.path,
                self.lexers.len(),
                self.lexers.join(", ")
            ),
        }
    }
}

/// Reads a name written by `GetLexerName`, forcing termination at the end of
/// the buffer so a misbehaving plugin cannot cause an over-read.
fn name_from_buffer(buffer: &mut [c_char]) -> String {
    let Some(last) = buffer.last_mut() else {
        return String::new();
    };
    *last = 0;

    let bytes: Vec<u8> = buffer.iter().take_while(|&&c| c != 0).map(|&c| c as u8).collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_from(bytes: &[u8], len: usize) -> Vec<c_char> {
        let mut buffer = vec![0 as c_char; len];
        for (slot, byte) in buffer.iter_mut().zip(bytes) {
            *slot = *byte as c_char;
        }
        buffer
    }

    #[test]
    fn test_name_stops_at_terminator() {
        let mut buffer = buffer_from(b"lua\0garbage", 16);
        assert_eq!(name_from_buffer(&mut buffer), "lua");
    }

    #[test]
    fn test_unterminated_name_is_truncated() {
        let mut buffer = buffer_from(b"abcdefgh", 8);
        assert_eq!(name_from_buffer(&mut buffer), "abcdefg");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut buffer = buffer_from(&[b'a', 0xff, b'b', 0], 8);
        assert_eq!(name_from_buffer(&mut buffer), "a\u{fffd}b");
    }

    #[test]
    fn test_empty_buffer() {
        assert_eq!(name_from_buffer(&mut []), "");
    }

    #[test]
    fn test_info_display() {
        let info = LibraryInfo {
            path: "/plugins/liblua.so".to_string(),
            lexers: vec!["lua".to_string(), "moon".to_string()],
            error: None,
        };
        assert_eq!(info.to_string(), "/plugins/liblua.so - 2 lexer(s): lua, moon");
    }
}
