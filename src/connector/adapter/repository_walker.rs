use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::application::interfaces::RepositoryWalker;
use crate::domain::Language;

/// Number of leading bytes inspected by the binary-content heuristic.
const SNIFF_LEN: usize = 8000;

/// `ignore`-backed [`RepositoryWalker`]: gitignore-aware, skips hidden
/// directories and binary files, rejects files above `max_bytes`, and only
/// returns paths whose extension maps to a registered [`Language`].
pub struct FileSystemRepositoryWalker {
    max_bytes: u64,
    extra_ignore_dirs: Vec<String>,
}

impl FileSystemRepositoryWalker {
    pub fn new() -> Self {
        Self {
            max_bytes: 500 * 1024,
            extra_ignore_dirs: Vec::new(),
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_extra_ignore_dirs(mut self, dirs: Vec<String>) -> Self {
        self.extra_ignore_dirs = dirs;
        self
    }
}

impl Default for FileSystemRepositoryWalker {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryWalker for FileSystemRepositoryWalker {
    fn discover(&self, repo_path: &Path) -> Vec<PathBuf> {
        let mut walker = WalkBuilder::new(repo_path);
        walker.hidden(true).git_ignore(true).git_global(true).git_exclude(true);

        if !self.extra_ignore_dirs.is_empty() {
            let mut overrides = ignore::overrides::OverrideBuilder::new(repo_path);
            for dir in &self.extra_ignore_dirs {
                let _ = overrides.add(&format!("!{dir}"));
            }
            if let Ok(built) = overrides.build() {
                walker.overrides(built);
            }
        }

        let mut paths: Vec<PathBuf> = walker
            .build()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.into_path())
            .filter(|path| path.is_file())
            .filter(|path| Language::from_path(path).is_known())
            .filter(|path| self.within_size_limit(path))
            .filter(|path| !is_binary(path))
            .collect();

        paths.sort();
        paths
    }
}

impl FileSystemRepositoryWalker {
    fn within_size_limit(&self, path: &Path) -> bool {
        match std::fs::metadata(path) {
            Ok(meta) => meta.len() <= self.max_bytes,
            Err(_) => false,
        }
    }
}

/// A file is treated as binary if a NUL byte appears in its first
/// [`SNIFF_LEN`] bytes — the heuristic git and ripgrep use. Unreadable
/// files are conservatively treated as binary (skipped).
fn is_binary(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return true;
    };
    let mut buf = [0u8; SNIFF_LEN];
    let read = match file.read(&mut buf) {
        Ok(n) => n,
        Err(_) => return true,
    };
    buf[..read].contains(&0)
}
