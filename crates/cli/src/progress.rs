//! Cargo-style progress output for dirpatch
//!
//! ```text
//!      Scanned 14 old entries, 17 new entries
//!   Classified 3 updated, 2 new, 1 removed
//!        Delta [===========>             ] 2/3 src/main.rs
//!     Archived newFiles.tar.gz (1.2 MiB)
//!     Finished in 0.8s
//! ```

use std::io::Write as _;
use std::path::Path;
use std::time::Instant;

use dirpatch_core::{ChangeSet, PatchSummary, Progress};

/// Status verbs (right-aligned to 12 chars)
struct Status;

impl Status {
    const SCANNED: &str = "Scanned";
    const CLASSIFIED: &str = "Classified";
    const DELTA: &str = "Delta";
    const ARCHIVED: &str = "Archived";
    const PACKAGED: &str = "Packaged";
    const FINISHED: &str = "Finished";
}

fn print_status(status: &str, message: &str) {
    let mut term = console::Term::stderr();
    let style = console::Style::new().green().bold();
    let _ = writeln!(term, "{:>12} {}", style.apply_to(status), message);
}

/// Progress reporter rendering each pipeline milestone as a status line
pub struct CargoProgress {
    start: Instant,
    bar: Option<indicatif::ProgressBar>,
}

impl CargoProgress {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            bar: None,
        }
    }

    /// Final summary line, printed after the run returns
    pub fn finished(&self, summary: &PatchSummary) {
        let changes = &summary.changes;
        let mut message = format!(
            "{} updated, {} new, {} removed in {:.1}s",
            changes.updated.len(),
            changes.new_files.len(),
            changes.removed_files.len() + changes.removed_directories.len(),
            self.start.elapsed().as_secs_f64()
        );
        if let Some(package_dir) = &summary.package_dir {
            message.push_str(&format!(" ({})", package_dir.display()));
        }
        print_status(Status::FINISHED, &message);
    }

    fn delta_bar(total: usize) -> indicatif::ProgressBar {
        let bar = indicatif::ProgressBar::new(total as u64);
        bar.set_style(
            indicatif::ProgressStyle::default_bar()
                .template("{spinner:.green} {msg:>12} [{bar:25.cyan/dim}] {pos}/{len} {prefix:.dim}")
                .expect("valid template"),
        );
        bar.set_message(Status::DELTA);
        bar
    }
}

impl Progress for CargoProgress {
    fn scanned(&mut self, old_entries: usize, new_entries: usize) {
        print_status(
            Status::SCANNED,
            &format!("{old_entries} old entries, {new_entries} new entries"),
        );
    }

    fn classified(&mut self, changes: &ChangeSet) {
        print_status(
            Status::CLASSIFIED,
            &format!(
                "{} updated, {} new, {} removed",
                changes.updated.len(),
                changes.new_files.len(),
                changes.removed_files.len() + changes.removed_directories.len()
            ),
        );
    }

    fn delta(&mut self, index: usize, total: usize, path: &Path) {
        let bar = self.bar.get_or_insert_with(|| Self::delta_bar(total));
        bar.set_position(index as u64);
        bar.set_prefix(path.display().to_string());
    }

    fn archived(&mut self, archive: &Path, bytes: u64) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        let size = humansize::format_size(bytes, humansize::BINARY);
        print_status(
            Status::ARCHIVED,
            &format!(
                "{} ({size})",
                archive.file_name().unwrap_or_default().to_string_lossy()
            ),
        );
    }

    fn packaged(&mut self, package_dir: &Path) {
        print_status(Status::PACKAGED, &package_dir.display().to_string());
    }
}
