use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use extlex_core::{Catalogue, LexerPluginSettings, PluginRegistry, ShutdownHook};

#[derive(Parser, Debug)]
#[command(name = "extlex")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Load external lexer libraries and list the lexers they provide")]
struct Args {
    /// Lexer libraries to load, after any configured ones
    paths: Vec<PathBuf>,

    /// Settings file (defaults to ~/.extlex/settings.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Ignore configured plugin paths and load only those given
    #[arg(long)]
    no_config: bool,

    /// Also print libraries that contributed no lexers
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    setup_tracing();
    let args = Args::parse();

    // Unloads every plugin library before main returns.
    let _shutdown = ShutdownHook::install();

    let mut paths = if args.no_config {
        Vec::new()
    } else {
        load_settings(args.config.as_ref())?.plugin_paths()
    };
    paths.extend(args.paths);

    info!("Loading {} lexer libraries", paths.len());

    let infos = PluginRegistry::with_instance(|registry| {
        registry.load_all(paths.iter().map(|p| p.to_string_lossy()));
        registry.infos()
    });

    for library in &infos {
        if args.verbose || library.error.is_none() {
            println!("{library}");
        }
    }

    let lexers = Catalogue::global().modules();
    if lexers.is_empty() {
        println!("No external lexers found");
        return Ok(());
    }

    println!();
    for lexer in &lexers {
        println!("{:>6}  {}", lexer.language().0, lexer.name());
    }

    Ok(())
}

fn load_settings(config: Option<&PathBuf>) -> Result<LexerPluginSettings> {
    let path = match config {
        Some(path) => path.clone(),
        None => match LexerPluginSettings::default_path() {
            Some(path) => path,
            None => return Ok(LexerPluginSettings::default()),
        },
    };

    LexerPluginSettings::load(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))
}

fn setup_tracing() {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter)
        .init();
}
