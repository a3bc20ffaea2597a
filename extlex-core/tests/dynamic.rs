//! Loads a real lexer plugin through the system dynamic linker and tears it
//! down with the process-wide hook. Kept in its own test binary because it
//! drives the global registry and catalogue.

use std::collections::HashSet;
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::{Path, PathBuf};
use std::process::Command;

use extlex_core::{load_external_lexer, Catalogue, LexerModule, PluginRegistry, ShutdownHook};

/// Builds the `extlex-fixture` cdylib into a private target directory and
/// returns the path of the shared library.
fn build_fixture() -> PathBuf {
    let workspace = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("extlex-core lives inside the workspace");
    // A separate target directory keeps clear of the lock the outer build holds.
    let target_dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join("fixture");

    let status = Command::new(env!("CARGO"))
        .current_dir(workspace)
        .args(["build", "--quiet", "--offline", "-p", "extlex-fixture", "--target-dir"])
        .arg(&target_dir)
        .status()
        .expect("failed to run cargo");
    assert!(status.success(), "building extlex-fixture failed");

    let library = target_dir
        .join("debug")
        .join(format!("{DLL_PREFIX}extlex_fixture{DLL_SUFFIX}"));
    assert!(library.is_file(), "missing {}", library.display());
    library
}

#[test]
fn test_real_plugin_loads_and_unloads_with_hook() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let fixture = build_fixture();
    let path = fixture.to_string_lossy();

    PluginRegistry::delete_instance();
    let catalogue = Catalogue::global();
    assert!(catalogue.is_empty());

    let hook = ShutdownHook::install();

    load_external_lexer(&path);
    load_external_lexer(&path);

    let (libraries, lexers, error) = PluginRegistry::with_instance(|registry| {
        let library = registry.get(&path).expect("library is registered");
        assert!(library.is_valid());
        (
            registry.len(),
            registry.lexer_count(),
            library.error().cloned(),
        )
    });
    assert_eq!(libraries, 1);
    assert_eq!(lexers, 3);
    assert_eq!(error, None);
    assert_eq!(catalogue.names(), vec!["Alpha", "Beta", "Gamma"]);

    let modules = catalogue.modules();
    let instances: HashSet<_> = modules
        .iter()
        .map(|module| module.create_lexer().expect("factory returns a lexer"))
        .map(|lexer| lexer.as_ptr())
        .collect();
    assert_eq!(instances.len(), 3);

    let languages: HashSet<_> = modules.iter().map(|module| module.language()).collect();
    assert_eq!(languages.len(), 3);

    let held = catalogue.find("Beta").expect("Beta is registered");
    drop(modules);

    drop(hook);

    assert!(!PluginRegistry::has_instance());
    assert!(catalogue.is_empty());
    assert!(catalogue.names().is_empty());
    assert!(catalogue.find("Alpha").is_none());
    // The library is gone; a module still held must not reach into it.
    assert!(held.create_lexer().is_none());
}
