//! Deterministic tar.gz archive construction
//!
//! Files stream straight from disk through the tar framer into the gzip
//! encoder; the archive is never buffered whole in memory. Entries are
//! appended in sorted relative-path order so identical staging trees
//! produce identical archives.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::{debug, warn};

use crate::scan::Scanner;

/// Gzip level substituted for out-of-range requests
pub const DEFAULT_GZIP_LEVEL: u32 = 6;

/// Clamp a requested gzip level into `[0, 9]`.
///
/// Anything outside the range silently becomes [`DEFAULT_GZIP_LEVEL`];
/// in-range values pass through exactly.
#[must_use]
pub fn clamp_level(level: i64) -> u32 {
    if (0..=9).contains(&level) {
        level as u32
    } else {
        DEFAULT_GZIP_LEVEL
    }
}

/// Builds one compressed archive from a staging tree
pub struct ArchiveBuilder {
    output: PathBuf,
    level: u32,
}

impl ArchiveBuilder {
    #[must_use]
    pub fn new(output: impl Into<PathBuf>, level: i64) -> Self {
        let clamped = clamp_level(level);
        if i64::from(clamped) != level {
            warn!("gzip level {level} out of range, using {clamped}");
        }
        Self {
            output: output.into(),
            level: clamped,
        }
    }

    /// Effective gzip level after clamping
    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Stream `staging_root` into a gzip-compressed tar at the output path.
    ///
    /// Directories become explicit entries, so empty directories survive a
    /// round trip. File mode bits are carried from the staged files.
    /// Returns the compressed size in bytes.
    ///
    /// # Errors
    /// Returns an error if the staging tree cannot be read or the archive
    /// cannot be written.
    pub fn build(&self, staging_root: &Path) -> Result<u64> {
        let layout = Scanner::new(staging_root).scan_layout()?;
        debug!(
            "archiving {} entries at gzip level {}",
            layout.len(),
            self.level
        );

        let file = File::create(&self.output)
            .wrap_err_with(|| format!("failed to create archive {}", self.output.display()))?;
        let encoder = GzEncoder::new(BufWriter::new(file), Compression::new(self.level));
        let mut builder = tar::Builder::new(encoder);

        for entry in &layout {
            let source = staging_root.join(&entry.path);
            if entry.is_dir {
                builder
                    .append_dir(&entry.path, &source)
                    .wrap_err_with(|| format!("failed to archive {}", entry.path.display()))?;
            } else {
                builder
                    .append_path_with_name(&source, &entry.path)
                    .wrap_err_with(|| format!("failed to archive {}", entry.path.display()))?;
            }
        }

        let encoder = builder
            .into_inner()
            .wrap_err("failed to finish tar stream")?;
        let mut writer = encoder.finish().wrap_err("failed to finish gzip stream")?;
        writer.flush().wrap_err("failed to flush archive")?;
        drop(writer);

        let bytes = std::fs::metadata(&self.output)
            .wrap_err_with(|| format!("failed to stat archive {}", self.output.display()))?
            .len();
        Ok(bytes)
    }
}
