//! Loading of lexers packaged as native shared libraries.
//!
//! A host hands plugin paths to the [`PluginRegistry`]. Each path is opened at
//! most once; every lexer the library exports becomes a [`PluginLexerModule`]
//! registered in the [`Catalogue`], where it is found exactly like a built-in
//! lexer. Loading never fails: unusable paths simply contribute nothing.
//!
//! Plugin code runs unchecked inside the host process. The lexer count a
//! library reports is trusted, so a plugin whose name or factory functions
//! cannot serve every index it advertises can crash the host.

pub mod abi;
pub mod catalogue;
pub mod error;
pub mod lexer;
pub mod library;
pub mod native;
pub mod registry;
pub mod settings;

pub use catalogue::Catalogue;
pub use error::LoadError;
pub use lexer::{BuiltinLexerModule, LanguageId, LexerModule, ModuleId, PluginLexerModule, RawLexer};
pub use library::{LibraryInfo, PluginLibrary};
pub use native::{DynamicLibrary, LibLoader, ModuleLoader, NativeModule};
pub use registry::{load_external_lexer, PluginRegistry, ShutdownHook};
pub use settings::LexerPluginSettings;
