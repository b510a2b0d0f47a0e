//! Package descriptors and the per-build `package.json` cache.
//!
//! Each directory's `package.json` is read and parsed at most once per
//! build; the parsed [`PackageDescriptor`] is shared behind an `Arc` and
//! never changes afterwards.

use super::cache::OnceMap;
use crate::error::ResolveError;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Extensions ignored when comparing `browser` map keys with file paths.
const BROWSER_KEY_EXTENSIONS: &[&str] = &[".js", ".mjs", ".cjs", ".json"];

/// Replacement declared in a `browser` map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserTarget {
    /// Resolve this path (relative to the package root) instead.
    Path(String),
    /// `false`: resolve to an empty module.
    Disabled,
}

/// The `browser` field of a `package.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserField {
    /// String form: replaces `main`.
    Entry(String),
    /// Object form: module id / file to replacement, in declaration order.
    Map(Vec<(String, BrowserTarget)>),
}

impl BrowserField {
    fn parse(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Entry(s.clone())),
            Value::Object(map) => {
                let entries = map
                    .iter()
                    .filter_map(|(key, target)| {
                        let target = match target {
                            Value::String(s) => BrowserTarget::Path(s.clone()),
                            Value::Bool(false) => BrowserTarget::Disabled,
                            _ => return None,
                        };
                        Some((key.clone(), target))
                    })
                    .collect();
                Some(Self::Map(entries))
            }
            _ => None,
        }
    }
}

/// Parsed `package.json` of a package directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    /// Absolute package directory.
    pub root: PathBuf,
    pub name: String,
    pub version: Option<String>,
    pub main: Option<String>,
    pub browser: Option<BrowserField>,
}

impl PackageDescriptor {
    /// Parse `package.json` content for the package rooted at `root`.
    ///
    /// Only malformed JSON is an error; fields with unexpected types are
    /// treated as absent. A missing `name` falls back to the directory name.
    pub fn parse(root: &Path, content: &str) -> Result<Self, serde_json::Error> {
        let json: Value = serde_json::from_str(content)?;
        let text = |key: &str| json.get(key).and_then(Value::as_str).map(str::to_string);

        Ok(Self {
            root: root.to_path_buf(),
            name: text("name").unwrap_or_else(|| dir_name(root)),
            version: text("version"),
            main: text("main").filter(|m| !m.is_empty()),
            browser: json.get("browser").and_then(BrowserField::parse),
        })
    }

    /// Descriptor for a package directory without a `package.json`.
    #[must_use]
    pub fn synthetic(root: &Path, name: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            name: name.to_string(),
            version: None,
            main: None,
            browser: None,
        }
    }

    /// Entry point of the package, honouring the `browser` field when enabled.
    #[must_use]
    pub fn entry(&self, browser: bool) -> Option<BrowserTarget> {
        if browser {
            match &self.browser {
                Some(BrowserField::Entry(entry)) => {
                    return Some(BrowserTarget::Path(entry.clone()));
                }
                Some(BrowserField::Map(_)) => {
                    if let Some(target) = self.main.as_deref().and_then(|m| self.browser_file(m)) {
                        return Some(target.clone());
                    }
                }
                None => {}
            }
        }
        self.main.clone().map(BrowserTarget::Path)
    }

    /// `browser` map replacement for a bare module id (`"fs"`, `"./x"` excluded).
    #[must_use]
    pub fn browser_module(&self, id: &str) -> Option<&BrowserTarget> {
        self.browser_map()
            .iter()
            .find(|(key, _)| !is_file_key(key) && key == id)
            .map(|(_, target)| target)
    }

    /// `browser` map replacement for a file, given relative to the package root.
    #[must_use]
    pub fn browser_file(&self, rel: &str) -> Option<&BrowserTarget> {
        let wanted = file_key(rel);
        self.browser_map()
            .iter()
            .find(|(key, _)| file_key(key) == wanted)
            .map(|(_, target)| target)
    }

    fn browser_map(&self) -> &[(String, BrowserTarget)] {
        match &self.browser {
            Some(BrowserField::Map(entries)) => entries,
            _ => &[],
        }
    }
}

fn dir_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_file_key(key: &str) -> bool {
    key.starts_with("./") || key.starts_with("../") || key.starts_with('/')
}

/// Canonical form of a file key: no leading `./`, no JavaScript extension.
fn file_key(key: &str) -> &str {
    let key = key.trim_start_matches("./");
    BROWSER_KEY_EXTENSIONS
        .iter()
        .find_map(|ext| key.strip_suffix(ext))
        .unwrap_or(key)
}

/// Result of looking up a directory's `package.json`.
pub type PackageLookup = Result<Option<Arc<PackageDescriptor>>, ResolveError>;

/// Per-build cache of parsed `package.json` files, keyed by directory.
#[derive(Debug, Default)]
pub struct PackageCache {
    entries: OnceMap<PathBuf, PackageLookup>,
    reads: AtomicUsize,
}

impl PackageCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor for the package at `dir`, or `None` without a `package.json`.
    ///
    /// # Errors
    /// Returns `PackageMetadata` if the file exists but cannot be read or parsed.
    pub fn get(&self, dir: &Path) -> PackageLookup {
        self.entries
            .get_or_init(&dir.to_path_buf(), || self.load(dir))
    }

    fn load(&self, dir: &Path) -> PackageLookup {
        let path = dir.join("package.json");
        self.reads.fetch_add(1, Ordering::Relaxed);

        let content = fuse_util::fs::read_optional(&path).map_err(|e| {
            ResolveError::PackageMetadata {
                path: path.clone(),
                cause: Arc::new(e),
            }
        })?;
        let Some(content) = content else {
            return Ok(None);
        };

        let descriptor = PackageDescriptor::parse(dir, &content).map_err(|e| {
            ResolveError::PackageMetadata {
                path: path.clone(),
                cause: Arc::new(e),
            }
        })?;
        debug!(
            path = %path.display(),
            name = %descriptor.name,
            version = ?descriptor.version,
            "loaded package.json"
        );
        Ok(Some(Arc::new(descriptor)))
    }

    /// Number of `package.json` read attempts since the last [`clear`](Self::clear).
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.reads.store(0, Ordering::Relaxed);
    }
}
