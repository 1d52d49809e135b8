//! Analysis cache for open files.
//!
//! Each analysed file is stamped with the blake3 hash of its contents.
//! Invalidation drops the stamp; re-analysis recomputes it and runs the
//! optional `[editor] reanalyze` hook.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::config::FILE_PLACEHOLDER;
use crate::utils::exec::{Cmd, EMPTY_FILTER, format_error};

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    #[inline]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First 16 hex chars
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Hash file contents. `None` if the file cannot be read.
pub fn hash_file(path: &Path) -> Option<ContentHash> {
    let file = File::open(path).ok()?;

    let mut reader = BufReader::with_capacity(64 * 1024, file);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buffer[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => return None,
        }
    }

    Some(ContentHash::new(*hasher.finalize().as_bytes()))
}

pub struct AnalysisCache {
    root: PathBuf,
    hook: Option<Vec<String>>,
    stamps: RwLock<FxHashMap<PathBuf, ContentHash>>,
}

impl AnalysisCache {
    pub fn new(root: impl Into<PathBuf>, hook: Option<Vec<String>>) -> Self {
        Self {
            root: root.into(),
            hook,
            stamps: RwLock::new(FxHashMap::default()),
        }
    }

    #[cfg(test)]
    pub fn get(&self, file: &Path) -> Option<ContentHash> {
        self.stamps.read().get(file).copied()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.stamps.read().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.stamps.read().is_empty()
    }

    /// Drop the stamp for `file`, returning it if there was one.
    pub fn invalidate(&self, file: &Path) -> Option<ContentHash> {
        self.stamps.write().remove(file)
    }

    /// Stamp `file` afresh and run the hook.
    ///
    /// Blocks for as long as the hook runs.
    pub fn reanalyze(&self, file: &Path) -> Option<ContentHash> {
        let Some(hash) = hash_file(file) else {
            crate::debug!("refresh"; "{} unreadable, skipping analysis", file.display());
            self.stamps.write().remove(file);
            return None;
        };
        self.stamps.write().insert(file.to_path_buf(), hash);
        crate::debug!("refresh"; "{} -> {}", file.display(), hash);

        if let Some(hook) = &self.hook {
            self.run_hook(hook, file);
        }
        Some(hash)
    }

    fn run_hook(&self, hook: &[String], file: &Path) {
        let argv = hook_argv(hook, file);
        let Some(name) = argv.first().cloned() else {
            return;
        };

        match Cmd::from_slice(&argv).cwd(&self.root).output() {
            Ok(output) if output.status.success() => {}
            Ok(output) => {
                crate::log!("error"; "{}", format_error(&name, &output, &EMPTY_FILTER));
            }
            Err(e) => crate::log!("error"; "reanalyze hook failed: {:#}", e),
        }
    }
}

/// Hook arguments with every `{file}` replaced by the file path.
fn hook_argv(hook: &[String], file: &Path) -> Vec<String> {
    let file = file.to_string_lossy();
    hook.iter()
        .map(|arg| arg.replace(FILE_PLACEHOLDER, &file))
        .collect()
}
