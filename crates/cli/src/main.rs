//! dirpatch: directory tree patch-set generator
//!
//! Compares an old and a new version of a directory tree and produces:
//! - one VCDIFF delta per changed file (via xdelta3)
//! - a tar.gz archive of wholly new files plus the directory skeleton
//! - a manifest of additions, updates, and removals
//! - optionally, a single versioned release package

mod progress;

use std::path::PathBuf;

use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use color_eyre::Result;
use tracing::{debug, warn};

use dirpatch_core::config::CONFIG_FILE;
use dirpatch_core::{PatchConfig, Patcher, XdeltaProvider};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default())
    .valid(AnsiColor::Green.on_default())
    .invalid(AnsiColor::Red.on_default());

#[derive(Parser, Debug)]
#[command(name = "dirpatch")]
#[command(version)]
#[command(styles = STYLES)]
#[command(about = "Generate binary patch sets between two directory trees")]
#[command(long_about = r#"
dirpatch compares two versions of a directory tree and produces:

  • one VCDIFF (RFC 3284) delta per changed file, via xdelta3
  • a tar.gz archive of wholly new files and the directory skeleton
  • a manifest listing additions, updates and removals
  • optionally a single versioned release package

Examples:
  dirpatch -o v1 -n v2 --manifest         Diff trees, write patchedFiles.json
  dirpatch --manifest -p 1.2              Full patch set packaged as p1-2/
  dirpatch -l                             Manifest only, no artifacts
"#)]
struct Cli {
    /// Config file to load before applying flags
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the old tree version
    #[arg(short, long, value_name = "DIR")]
    old: Option<PathBuf>,

    /// Directory holding the new tree version
    #[arg(short, long, value_name = "DIR")]
    new: Option<PathBuf>,

    /// Directory receiving per-file .upd deltas
    #[arg(short = 't', long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Base name of the new-files archive (".tar.gz" is appended)
    #[arg(short = 'z', long, value_name = "NAME")]
    archive: Option<String>,

    /// Gzip compression level 0-9; anything else falls back to 6
    #[arg(short, long, value_name = "LEVEL")]
    gzip: Option<String>,

    /// Write the patchedFiles.json manifest
    #[arg(short = 'x', long)]
    manifest: bool,

    /// Write only the manifest, skipping deltas and the archive
    #[arg(short = 'l', long)]
    manifest_only: bool,

    /// Package all artifacts under p<version>/
    #[arg(short, long, value_name = "VERSION")]
    pack: Option<String>,

    /// Delta binary to invoke
    #[arg(long, value_name = "BIN", default_value = "xdelta3")]
    delta_bin: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = build_config(&cli)?;
    debug!("resolved configuration: {config:?}");

    let provider = XdeltaProvider::with_binary(&cli.delta_bin);
    let patcher = Patcher::new(config, provider);
    let mut progress = progress::CargoProgress::new();
    let summary = patcher.run(&mut progress)?;
    progress.finished(&summary);

    Ok(())
}

/// Load the config file, then overlay every flag the user passed
fn build_config(cli: &Cli) -> Result<PatchConfig> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    if cli.config.is_some() && !config_path.exists() {
        warn!("config file {} not found, using defaults", config_path.display());
    }

    let mut config = PatchConfig::load(&config_path)?;
    if let Some(old) = &cli.old {
        config.old_root = old.clone();
    }
    if let Some(new) = &cli.new {
        config.new_root = new.clone();
    }
    if let Some(out) = &cli.out {
        config.out_root = out.clone();
    }
    if let Some(archive) = &cli.archive {
        config.archive_name = archive.clone();
    }
    if let Some(level) = &cli.gzip {
        config.gzip_level = parse_gzip_level(level);
    }
    if cli.manifest {
        config.manifest = true;
    }
    if cli.manifest_only {
        config.manifest_only = true;
    }
    if let Some(version) = &cli.pack {
        config.version = Some(version.clone());
    }
    Ok(config)
}

/// Lenient level parsing: non-numeric input becomes an out-of-range value
/// that the archive builder clamps to the default
fn parse_gzip_level(raw: &str) -> i64 {
    raw.trim().parse().unwrap_or(-1)
}
