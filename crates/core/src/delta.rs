//! Binary delta production via an external VCDIFF provider
//!
//! The diff algorithm itself stays outside the engine: a [`DeltaProvider`]
//! turns an (old, new) file pair into an RFC 3284 delta artifact on disk.
//! The default provider shells out to `xdelta3`; tests substitute their own.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

/// Extension appended to a relative path to name its delta artifact
pub const DELTA_SUFFIX: &str = "upd";

/// Produces binary deltas between file versions
pub trait DeltaProvider {
    /// Write a delta at `output` that reconstructs `new` from `old`.
    ///
    /// `old` may not exist; the provider must then emit a full-content
    /// delta.
    ///
    /// # Errors
    /// Returns [`DeltaFailure`] when the delta cannot be produced. The
    /// caller treats this as fatal to the whole run.
    fn compute_delta(&self, old: &Path, new: &Path, output: &Path) -> Result<(), DeltaFailure>;
}

impl<T: DeltaProvider + ?Sized> DeltaProvider for &T {
    fn compute_delta(&self, old: &Path, new: &Path, output: &Path) -> Result<(), DeltaFailure> {
        (**self).compute_delta(old, new, output)
    }
}

/// Failure of a single delta invocation.
///
/// Carries both input paths, the output path, and the failing command so
/// the operator can reproduce the invocation verbatim.
#[derive(Debug)]
pub struct DeltaFailure {
    pub old: PathBuf,
    pub new: PathBuf,
    pub output: PathBuf,
    pub detail: String,
}

impl DeltaFailure {
    #[must_use]
    pub fn new(old: &Path, new: &Path, output: &Path, detail: impl Into<String>) -> Self {
        Self {
            old: old.to_path_buf(),
            new: new.to_path_buf(),
            output: output.to_path_buf(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for DeltaFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "could not create delta for {} (old: {}, output: {}): {}",
            self.new.display(),
            self.old.display(),
            self.output.display(),
            self.detail
        )
    }
}

impl std::error::Error for DeltaFailure {}

/// Location of the delta artifact for one updated file
#[must_use]
pub fn delta_output_path(out_root: &Path, relative: &Path) -> PathBuf {
    let mut name = relative.as_os_str().to_os_string();
    name.push(".");
    name.push(DELTA_SUFFIX);
    out_root.join(&name)
}

/// Delta provider shelling out to the `xdelta3` binary
pub struct XdeltaProvider {
    binary: String,
}

impl Default for XdeltaProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl XdeltaProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::with_binary("xdelta3")
    }

    /// Use a different binary name or path (tests, platform packaging)
    #[must_use]
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

/// Arguments for one xdelta3 encode run.
///
/// `-s <old>` is omitted when the old file is missing, which makes xdelta3
/// emit a self-contained full-content delta.
fn xdelta_args(old: &Path, new: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-f".into(), "-e".into()];
    if old.is_file() {
        args.push("-s".into());
        args.push(old.into());
    }
    args.push(new.into());
    args.push(output.into());
    args
}

fn render_command(binary: &str, args: &[OsString]) -> String {
    let mut rendered = String::from(binary);
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&arg.to_string_lossy());
    }
    rendered
}

impl DeltaProvider for XdeltaProvider {
    fn compute_delta(&self, old: &Path, new: &Path, output: &Path) -> Result<(), DeltaFailure> {
        let args = xdelta_args(old, new, output);
        debug!("running {}", render_command(&self.binary, &args));

        match Command::new(&self.binary).args(&args).output() {
            Ok(result) if result.status.success() => Ok(()),
            Ok(result) => {
                let stderr = String::from_utf8_lossy(&result.stderr);
                Err(DeltaFailure::new(
                    old,
                    new,
                    output,
                    format!(
                        "`{}` exited with {}: {}",
                        render_command(&self.binary, &args),
                        result.status,
                        stderr.trim()
                    ),
                ))
            }
            Err(err) => Err(DeltaFailure::new(
                old,
                new,
                output,
                format!("failed to spawn `{}`: {err}", self.binary),
            )),
        }
    }
}
