use thiserror::Error;

/// Reasons a plugin library contributed no lexers.
///
/// These never reach the caller of [`crate::PluginRegistry::load`]; the library
/// keeps the error so hosts can report why a path produced nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("failed to open {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("library does not export {}", crate::abi::COUNT_SYMBOL)]
    NotALexerPlugin,

    #[error("library exports a lexer count but is missing {0}")]
    MissingSymbol(&'static str),
}
