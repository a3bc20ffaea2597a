//! In-process stand-in for the dynamic linker.
//!
//! Each fake library is a table of symbol names to real function addresses
//! in the test binary, so discovery calls genuine `extern "system"` code.

#![allow(dead_code)]

use std::collections::HashMap;
use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use extlex_core::{ModuleLoader, NativeModule};

pub type SymbolTable = Vec<(&'static str, usize)>;

#[derive(Default)]
pub struct FakeLoader {
    libraries: Mutex<HashMap<String, SymbolTable>>,
    live_modules: Arc<AtomicUsize>,
    opens: AtomicUsize,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `path` openable, exporting `symbols`.
    pub fn with_library(self, path: &str, symbols: SymbolTable) -> Self {
        self.libraries
            .lock()
            .unwrap()
            .insert(path.to_string(), symbols);
        self
    }

    /// Number of successfully opened modules not yet dropped.
    pub fn live_modules(&self) -> usize {
        self.live_modules.load(Ordering::SeqCst)
    }

    /// Number of `open` calls, successful or not.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl ModuleLoader for FakeLoader {
    fn open(&self, path: &str) -> Box<dyn NativeModule> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        let symbols = self.libraries.lock().unwrap().get(path).cloned();
        if symbols.is_some() {
            self.live_modules.fetch_add(1, Ordering::SeqCst);
        }

        Box::new(FakeModule {
            symbols,
            live_modules: self.live_modules.clone(),
        })
    }
}

struct FakeModule {
    symbols: Option<SymbolTable>,
    live_modules: Arc<AtomicUsize>,
}

impl NativeModule for FakeModule {
    fn is_valid(&self) -> bool {
        self.symbols.is_some()
    }

    fn find_function(&self, name: &str) -> Option<NonNull<c_void>> {
        self.symbols
            .as_ref()?
            .iter()
            .find(|(symbol, _)| *symbol == name)
            .and_then(|(_, address)| NonNull::new(*address as *mut c_void))
    }

    fn error(&self) -> Option<&str> {
        if self.symbols.is_none() {
            Some("no such file")
        } else {
            None
        }
    }
}

impl Drop for FakeModule {
    fn drop(&mut self) {
        if self.symbols.is_some() {
            self.live_modules.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
