//! Lexer capabilities, built-in and plugin-sourced.

use std::ffi::{c_uint, c_void};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::OnceLock;

use tracing::debug;

use crate::abi::{GetLexerFactoryFn, LexerFactoryFn};

/// Numeric language identifier a host uses to select a lexer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LanguageId(pub i32);

impl LanguageId {
    pub const CONTAINER: LanguageId = LanguageId(0);
    pub const NULL: LanguageId = LanguageId(1);
    /// Placeholder asking the catalogue to assign the next free identifier.
    pub const AUTOMATIC: LanguageId = LanguageId(1000);
}

/// Process-unique identity of a lexer module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModuleId(u64);

impl ModuleId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// An opaque lexer instance produced by a factory. The host drives lexing and
/// folding through it and is responsible for releasing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawLexer(NonNull<c_void>);

impl RawLexer {
    pub fn new(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// A named lexer the catalogue can hand to the host.
///
/// # Safety
///
/// [`create_lexer`](LexerModule::create_lexer) calls whatever
/// [`factory`](LexerModule::factory) returns from safe code. Implementors must
/// only return factories that are sound to call, with no arguments, for as
/// long as the module is alive.
///
/// ```compile_fail
/// use extlex_core::{LanguageId, LexerModule, ModuleId};
/// use extlex_core::abi::LexerFactoryFn;
///
/// struct Anything(LexerFactoryFn);
///
/// impl LexerModule for Anything {
///     fn id(&self) -> ModuleId { unimplemented!() }
///     fn language(&self) -> LanguageId { LanguageId::NULL }
///     fn name(&self) -> &str { "anything" }
///     fn factory(&self) -> Option<LexerFactoryFn> { Some(self.0) }
/// }
/// ```
pub unsafe trait LexerModule: Send + Sync {
    fn id(&self) -> ModuleId;

    fn language(&self) -> LanguageId;

    fn name(&self) -> &str;

    /// Called by the catalogue to replace an [`LanguageId::AUTOMATIC`] tag.
    fn set_language(&self, _language: LanguageId) {}

    /// Returns the factory producing lexer instances, if one is available.
    fn factory(&self) -> Option<LexerFactoryFn>;

    /// Creates a lexer instance. `None` means this module lexes nothing.
    fn create_lexer(&self) -> Option<RawLexer> {
        let factory = self.factory()?;
        // SAFETY: implementors only hand out factories that are sound to
        // call while the module is alive.
        RawLexer::new(unsafe { factory() })
    }
}

/// A lexer compiled into the host.
pub struct BuiltinLexerModule {
    id: ModuleId,
    language: LanguageId,
    name: String,
    factory: Option<LexerFactoryFn>,
}

impl BuiltinLexerModule {
    /// # Safety
    ///
    /// `factory`, if present, must be sound to call with no arguments at any
    /// time while the module is alive. [`LexerModule::create_lexer`] calls it
    /// from safe code.
    ///
    /// ```compile_fail
    /// use extlex_core::{BuiltinLexerModule, LanguageId};
    ///
    /// let module = BuiltinLexerModule::new(LanguageId(3), "cpp", None);
    /// ```
    pub unsafe fn new(
        language: LanguageId,
        name: impl Into<String>,
        factory: Option<LexerFactoryFn>,
    ) -> Self {
        Self {
            id: ModuleId::next(),
            language,
            name: name.into(),
            factory,
        }
    }
}

unsafe impl LexerModule for BuiltinLexerModule {
    fn id(&self) -> ModuleId {
        self.id
    }

    fn language(&self) -> LanguageId {
        self.language
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn factory(&self) -> Option<LexerFactoryFn> {
        self.factory
    }
}

#[derive(Clone, Copy)]
struct Binding {
    index: c_uint,
    factory: Option<LexerFactoryFn>,
}

/// One lexer exported by a plugin library, identified by its index there.
///
/// The owning [`crate::PluginLibrary`] binds the factory once, right after
/// construction, and releases the module before unloading the library. A
/// released module keeps its name but no longer creates lexers.
pub struct PluginLexerModule {
    id: ModuleId,
    language: AtomicI32,
    name: String,
    binding: OnceLock<Binding>,
    released: AtomicBool,
}

impl PluginLexerModule {
    pub fn new(language: LanguageId, name: impl Into<String>) -> Self {
        Self {
            id: ModuleId::next(),
            language: AtomicI32::new(language.0),
            name: name.into(),
            binding: OnceLock::new(),
            released: AtomicBool::new(false),
        }
    }

    /// Resolves this module's factory through the library's `GetLexerFactory`.
    ///
    /// Only the first call has any effect; later calls return false. A null
    /// factory is accepted and leaves the module inert.
    ///
    /// # Safety
    ///
    /// `resolver` must be callable and `index` must be valid for it. The
    /// library it came from must stay loaded until [`Self::release`] is called.
    pub unsafe fn bind(&self, resolver: GetLexerFactoryFn, index: c_uint) -> bool {
        if self.binding.get().is_some() {
            debug!("Lexer '{}' is already bound", self.name);
            return false;
        }

        let factory = unsafe { resolver(index) };
        if factory.is_none() {
            debug!("Lexer '{}' (index {}) has no factory", self.name, index);
        }

        self.binding.set(Binding { index, factory }).is_ok()
    }

    /// Index of this lexer within its library, once bound.
    pub fn index(&self) -> Option<c_uint> {
        self.binding.get().map(|b| b.index)
    }

    pub fn is_bound(&self) -> bool {
        self.binding.get().is_some()
    }

    /// Detaches the module from its library's code. Called before unload.
    pub fn release(&self) {
        self.released.store(true, Ordering::Release);
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

// SAFETY: the factory is only handed out between a successful bind and
// `release`, which the owning library calls before it unloads the code.
unsafe impl LexerModule for PluginLexerModule {
    fn id(&self) -> ModuleId {
        self.id
    }

    fn language(&self) -> LanguageId {
        LanguageId(self.language.load(Ordering::Relaxed))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_language(&self, language: LanguageId) {
        self.language.store(language.0, Ordering::Relaxed);
    }

    fn factory(&self) -> Option<LexerFactoryFn> {
        if self.is_released() {
            return None;
        }
        self.binding.get().and_then(|b| b.factory)
    }
}

impl std::fmt::Debug for PluginLexerModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginLexerModule")
            .field("id", &self.id)
            .field("language", &self.language())
            .field("name", &self.name)
            .field("index", &self.index())
            .field("released", &self.is_released())
            .finish()
    }
}
