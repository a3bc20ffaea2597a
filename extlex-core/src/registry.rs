//! Plugin registry for loading lexer libraries once per path.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::catalogue::Catalogue;
use crate::library::{LibraryInfo, PluginLibrary};
use crate::native::{LibLoader, ModuleLoader};

static INSTANCE: Mutex<Option<PluginRegistry>> = Mutex::new(None);

/// Owns every loaded [`PluginLibrary`], at most one per path.
///
/// Loading is fail-soft: a bad path or a library that is not a lexer plugin is
/// kept as an empty library and never reported to the caller.
pub struct PluginRegistry {
    loader: Arc<dyn ModuleLoader>,
    catalogue: Arc<Catalogue>,
    libraries: Vec<PluginLibrary>,
}

impl PluginRegistry {
    /// Creates an empty registry that opens libraries with `loader` and
    /// registers their lexers in `catalogue`.
    pub fn new(loader: Arc<dyn ModuleLoader>, catalogue: Arc<Catalogue>) -> Self {
        Self {
            loader,
            catalogue,
            libraries: Vec::new(),
        }
    }

    /// Loads the library at `path` unless a library with the same path is
    /// already held, in which case nothing happens.
    pub fn load(&mut self, path: &str) {
        if self.contains(path) {
            debug!("Lexer library {} is already loaded", path);
            return;
        }

        let library = PluginLibrary::load(path, self.loader.as_ref(), self.catalogue.clone());
        self.libraries.push(library);
    }

    /// Loads each path in order.
    pub fn load_all<I, S>(&mut self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            self.load(path.as_ref());
        }
    }

    /// Drops every library, unregistering and releasing all of their lexers.
    pub fn clear(&mut self) {
        if !self.libraries.is_empty() {
            debug!("Unloading {} lexer libraries", self.libraries.len());
        }
        self.libraries.clear();
    }

    pub fn contains(&self, path: &str) -> bool {
        self.libraries.iter().any(|l| l.path() == path)
    }

    pub fn get(&self, path: &str) -> Option<&PluginLibrary> {
        self.libraries.iter().find(|l| l.path() == path)
    }

    pub fn libraries(&self) -> impl Iterator<Item = &PluginLibrary> {
        self.libraries.iter()
    }

    pub fn infos(&self) -> Vec<LibraryInfo> {
        self.libraries.iter().map(PluginLibrary::info).collect()
    }

    /// Total number of lexers across all libraries.
    pub fn lexer_count(&self) -> usize {
        self.libraries.iter().map(PluginLibrary::len).sum()
    }

    pub fn catalogue(&self) -> &Arc<Catalogue> {
        &self.catalogue
    }

    /// Number of libraries held, including empty ones.
    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    /// Runs `f` against the process-wide registry, creating it on first use
    /// with the system loader and [`Catalogue::global`].
    ///
    /// `f` must not call back into `with_instance` or `delete_instance`.
    pub fn with_instance<R>(f: impl FnOnce(&mut PluginRegistry) -> R) -> R {
        let mut instance = INSTANCE.lock().unwrap_or_else(PoisonError::into_inner);
        let registry = instance.get_or_insert_with(|| {
            debug!("Creating process-wide lexer plugin registry");
            PluginRegistry::new(Arc::new(LibLoader), Catalogue::global())
        });
        f(registry)
    }

    /// Returns true if the process-wide registry currently exists.
    pub fn has_instance() -> bool {
        INSTANCE
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Destroys the process-wide registry and everything it loaded. Safe to
    /// call when it was never created.
    pub fn delete_instance() {
        let instance = INSTANCE
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(registry) = instance {
            debug!(
                "Tearing down lexer plugin registry ({} libraries)",
                registry.len()
            );
            drop(registry);
        }
    }
}

impl Drop for PluginRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("libraries", &self.libraries)
            .finish()
    }
}

/// Loads a lexer library into the process-wide registry.
pub fn load_external_lexer(path: &str) {
    PluginRegistry::with_instance(|registry| registry.load(path));
}

/// Tears down the process-wide registry when dropped.
///
/// Rust never runs destructors for statics, so the host keeps one of these
/// alive for the life of `main`. Every plugin library is then unloaded before
/// the process exits, whether or not anything cleared the registry first.
///
/// Install exactly one hook per process and let `main` own it. Nothing stops
/// a second [`install`](ShutdownHook::install), but dropping *any* hook tears
/// down the registry, including libraries other code still expects to be
/// loaded. A later [`load_external_lexer`] simply starts a fresh registry.
#[must_use = "the plugin registry is torn down when the hook is dropped"]
#[derive(Debug, Default)]
pub struct ShutdownHook {
    _private: (),
}

impl ShutdownHook {
    pub fn install() -> Self {
        Self::default()
    }
}

impl Drop for ShutdownHook {
    fn drop(&mut self) {
        PluginRegistry::delete_instance();
    }
}
