//! Configuration of which lexer plugins to load.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Lexer plugin settings, usually read from a TOML file:
///
/// ```toml
/// paths = ["/opt/lexers/libmarkdown.so"]
/// directories = ["/usr/lib/editor/lexers"]
/// load_path = "/home/me/lexers/liba.so:/home/me/lexers/libb.so"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LexerPluginSettings {
    /// When false no plugins are loaded.
    pub enabled: bool,

    /// Plugin libraries loaded in order.
    pub paths: Vec<PathBuf>,

    /// Directories scanned for shared libraries, loaded after `paths`.
    pub directories: Vec<PathBuf>,

    /// Several library paths joined with the platform path separator.
    pub load_path: Option<String>,
}

impl Default for LexerPluginSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            paths: Vec::new(),
            directories: Vec::new(),
            load_path: None,
        }
    }
}

impl LexerPluginSettings {
    /// Loads settings from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read lexer settings from {path:?}"))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse lexer settings from {path:?}"))
    }

    /// Default settings location (`~/.extlex/settings.toml`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".extlex").join("settings.toml"))
    }

    /// Returns the candidate plugin paths in load order, without duplicates:
    /// explicit `paths`, then `load_path`, then matches from `directories`.
    pub fn plugin_paths(&self) -> Vec<PathBuf> {
        if !self.enabled {
            return Vec::new();
        }

        let mut candidates = self.paths.clone();

        if let Some(load_path) = &self.load_path {
            candidates.extend(std::env::split_paths(load_path).filter(|p| !p.as_os_str().is_empty()));
        }

        for dir in &self.directories {
            candidates.extend(shared_libraries_in(dir));
        }

        let mut seen = HashSet::new();
        candidates.retain(|p| seen.insert(p.clone()));
        candidates
    }
}

/// Lists files in `dir` carrying the platform's shared-library extension,
/// sorted by path.
fn shared_libraries_in(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read lexer directory {:?}: {}", dir, e);
            return Vec::new();
        }
    };

    let mut libraries: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext == std::env::consts::DLL_EXTENSION)
        })
        .collect();

    libraries.sort();
    libraries
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn library_name(stem: &str) -> String {
        format!("{stem}.{}", std::env::consts::DLL_EXTENSION)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = LexerPluginSettings::load(&temp.path().join("settings.toml")).unwrap();

        assert_eq!(settings, LexerPluginSettings::default());
        assert!(settings.enabled);
    }

    #[test]
    fn test_parse_settings() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.toml");
        fs::write(
            &path,
            r#"
enabled = true
paths = ["/opt/lexers/a.so", "/opt/lexers/b.so"]
"#,
        )
        .unwrap();

        let settings = LexerPluginSettings::load(&path).unwrap();

        assert_eq!(
            settings.paths,
            vec![PathBuf::from("/opt/lexers/a.so"), PathBuf::from("/opt/lexers/b.so")]
        );
        assert!(settings.directories.is_empty());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.toml");
        fs::write(&path, "paths = [").unwrap();

        let err = LexerPluginSettings::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_directory_scan_filters_by_extension() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(library_name("zeta")), b"").unwrap();
        fs::write(temp.path().join(library_name("alpha")), b"").unwrap();
        fs::write(temp.path().join("README.md"), b"").unwrap();
        fs::create_dir(temp.path().join(library_name("nested"))).unwrap();

        let settings = LexerPluginSettings {
            directories: vec![temp.path().to_path_buf()],
            ..Default::default()
        };

        assert_eq!(
            settings.plugin_paths(),
            vec![
                temp.path().join(library_name("alpha")),
                temp.path().join(library_name("zeta")),
            ]
        );
    }

    #[test]
    fn test_paths_are_ordered_and_deduplicated() {
        let load_path = std::env::join_paths(["/lexers/b.so", "/lexers/a.so"])
            .unwrap()
            .into_string()
            .unwrap();

        let settings = LexerPluginSettings {
            paths: vec![PathBuf::from("/lexers/a.so")],
            load_path: Some(load_path),
            ..Default::default()
        };

        assert_eq!(
            settings.plugin_paths(),
            vec![PathBuf::from("/lexers/a.so"), PathBuf::from("/lexers/b.so")]
        );
    }

    #[test]
    fn test_disabled_loads_nothing() {
        let settings = LexerPluginSettings {
            enabled: false,
            paths: vec![PathBuf::from("/lexers/a.so")],
            ..Default::default()
        };

        assert!(settings.plugin_paths().is_empty());
    }

    #[test]
    fn test_missing_directory_is_skipped() {
        let settings = LexerPluginSettings {
            directories: vec![PathBuf::from("/nonexistent/lexers")],
            ..Default::default()
        };

        assert!(settings.plugin_paths().is_empty());
    }
}
