//! The catalogue of lexers the host consults by name or language.
//!
//! Built-in lexers are owned by the catalogue. Plugin lexers are owned by
//! their [`crate::PluginLibrary`] and held here only weakly, so an entry can
//! never outlive the module it refers to. Libraries also remove their entries
//! explicitly before unloading.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use tracing::debug;

use crate::lexer::{LanguageId, LexerModule, ModuleId};

enum Entry {
    Owned(Arc<dyn LexerModule>),
    Borrowed {
        id: ModuleId,
        module: Weak<dyn LexerModule>,
    },
}

impl Entry {
    fn id(&self) -> ModuleId {
        match self {
            Entry::Owned(module) => module.id(),
            Entry::Borrowed { id, .. } => *id,
        }
    }

    fn get(&self) -> Option<Arc<dyn LexerModule>> {
        match self {
            Entry::Owned(module) => Some(module.clone()),
            Entry::Borrowed { module, .. } => module.upgrade(),
        }
    }

    fn is_live(&self) -> bool {
        match self {
            Entry::Owned(_) => true,
            Entry::Borrowed { module, .. } => module.strong_count() > 0,
        }
    }
}

struct CatalogueState {
    entries: Vec<Entry>,
    next_language: i32,
}

/// Registry of lexer modules, searched in registration order.
pub struct Catalogue {
    state: Mutex<CatalogueState>,
}

impl Catalogue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CatalogueState {
                entries: Vec::new(),
                next_language: LanguageId::AUTOMATIC.0 + 1,
            }),
        }
    }

    /// The process-wide catalogue used by the process-wide plugin registry.
    pub fn global() -> Arc<Catalogue> {
        static GLOBAL: OnceLock<Arc<Catalogue>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Catalogue::new())).clone()
    }

    fn state(&self) -> MutexGuard<'_, CatalogueState> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.entries.retain(Entry::is_live);
        state
    }

    fn assign_language(state: &mut CatalogueState, module: &dyn LexerModule) {
        if module.language() == LanguageId::AUTOMATIC {
            module.set_language(LanguageId(state.next_language));
            state.next_language += 1;
        }
    }

    /// Adds a lexer the catalogue owns.
    pub fn add_lexer_module(&self, module: Arc<dyn LexerModule>) {
        let mut state = self.state();
        Self::assign_language(&mut state, module.as_ref());
        debug!("Catalogue: added lexer '{}'", module.name());
        state.entries.push(Entry::Owned(module));
    }

    /// Adds a lexer owned elsewhere. The entry disappears once the last strong
    /// reference to `module` is dropped, or when [`Self::remove`] is called.
    pub fn add_module_ref(&self, module: &Arc<dyn LexerModule>) {
        let mut state = self.state();
        Self::assign_language(&mut state, module.as_ref());
        debug!("Catalogue: added plugin lexer '{}'", module.name());
        state.entries.push(Entry::Borrowed {
            id: module.id(),
            module: Arc::downgrade(module),
        });
    }

    /// Removes the entry for `id`. Returns true if one was present.
    pub fn remove(&self, id: ModuleId) -> bool {
        let mut state = self.state();
        let before = state.entries.len();
        state.entries.retain(|e| e.id() != id);
        state.entries.len() != before
    }

    /// Finds the first registered lexer called `name`.
    pub fn find(&self, name: &str) -> Option<Arc<dyn LexerModule>> {
        self.state()
            .entries
            .iter()
            .filter_map(Entry::get)
            .find(|m| m.name() == name)
    }

    /// Finds the first registered lexer for `language`.
    pub fn find_by_language(&self, language: LanguageId) -> Option<Arc<dyn LexerModule>> {
        self.state()
            .entries
            .iter()
            .filter_map(Entry::get)
            .find(|m| m.language() == language)
    }

    /// Returns every live lexer in registration order.
    pub fn modules(&self) -> Vec<Arc<dyn LexerModule>> {
        self.state().entries.iter().filter_map(Entry::get).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.modules().iter().map(|m| m.name().to_string()).collect()
    }

    pub fn contains(&self, id: ModuleId) -> bool {
        self.state().entries.iter().any(|e| e.id() == id)
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Catalogue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Catalogue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalogue")
            .field("names", &self.names())
            .finish()
    }
}
