//! Resolution requests and results.

use super::alias::AliasTable;
use super::pkg_json_cache::PackageDescriptor;
use super::ts_paths::TsPaths;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Prefix of a forced statement: ids rooted at the resolution root.
pub const FORCED_PREFIX: &str = "~/";

/// One specifier to resolve, as seen from one importing file.
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    /// Project root; resolution root for `fuseBoxPath`.
    pub home_dir: Option<PathBuf>,
    /// Absolute path of the importing file.
    pub file_path: Option<PathBuf>,
    /// The raw specifier.
    pub target: String,
    pub alias: Option<Arc<AliasTable>>,
    pub typescript_paths: Option<Arc<TsPaths>>,
    /// Package the importer lives in, when it is inside a dependency.
    pub package: Option<Arc<PackageDescriptor>>,
}

impl ResolveRequest {
    /// A request with only a specifier (enough for external URLs).
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    /// A request issued by `file_path` inside the project at `home_dir`.
    #[must_use]
    pub fn from_file(
        home_dir: impl Into<PathBuf>,
        file_path: impl Into<PathBuf>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            home_dir: Some(home_dir.into()),
            file_path: Some(file_path.into()),
            target: target.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_home_dir(mut self, home_dir: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(home_dir.into());
        self
    }

    #[must_use]
    pub fn with_file_path(mut self, file_path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    #[must_use]
    pub fn with_alias(mut self, alias: Arc<AliasTable>) -> Self {
        self.alias = Some(alias);
        self
    }

    #[must_use]
    pub fn with_typescript_paths(mut self, paths: Arc<TsPaths>) -> Self {
        self.typescript_paths = Some(paths);
        self
    }

    #[must_use]
    pub fn with_package(mut self, package: Arc<PackageDescriptor>) -> Self {
        self.package = Some(package);
        self
    }

    /// Key under which the outcome of this request is memoized.
    ///
    /// Tables are identified by content fingerprint, so equal tables built
    /// separately share entries.
    pub(crate) fn cache_key(&self) -> ResolutionKey {
        ResolutionKey {
            home_dir: self.home_dir.clone(),
            file_path: self.file_path.clone(),
            target: self.target.clone(),
            alias: self.alias.as_ref().map(|a| a.fingerprint().to_string()),
            typescript_paths: self
                .typescript_paths
                .as_ref()
                .map(|t| t.fingerprint().to_string()),
            package_root: self.package.as_ref().map(|p| p.root.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ResolutionKey {
    home_dir: Option<PathBuf>,
    file_path: Option<PathBuf>,
    target: String,
    alias: Option<String>,
    typescript_paths: Option<String>,
    package_root: Option<PathBuf>,
}

/// A specifier resolved to a file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Absolute path, extension included. Exists at resolution time.
    pub abs_path: PathBuf,
    /// Source extension found on disk, with its leading dot.
    pub extension: String,
    /// Posix path relative to the resolution root, output extension applied.
    pub fuse_box_path: String,
    /// Canonical import string (`~/` + `fuse_box_path`) when the original
    /// specifier must be rewritten.
    pub forced_statement: Option<String>,
    /// Owning dependency package, when resolution crossed into one.
    pub package: Option<Arc<PackageDescriptor>>,
}

/// Result of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedModule {
    /// Absolute URL; left for the runtime to load.
    External { specifier: String },
    File(ResolvedFile),
    /// Disabled by a `browser` map entry; emitted as an empty module.
    EmptyStub {
        specifier: String,
        package: Option<Arc<PackageDescriptor>>,
    },
}

impl ResolvedModule {
    #[must_use]
    pub fn is_external(&self) -> bool {
        matches!(self, Self::External { .. })
    }

    #[must_use]
    pub fn is_empty_stub(&self) -> bool {
        matches!(self, Self::EmptyStub { .. })
    }

    #[must_use]
    pub fn as_file(&self) -> Option<&ResolvedFile> {
        match self {
            Self::File(file) => Some(file),
            _ => None,
        }
    }

    #[must_use]
    pub fn abs_path(&self) -> Option<&Path> {
        self.as_file().map(|f| f.abs_path.as_path())
    }

    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.as_file().map(|f| f.extension.as_str())
    }

    #[must_use]
    pub fn fuse_box_path(&self) -> Option<&str> {
        self.as_file().map(|f| f.fuse_box_path.as_str())
    }

    #[must_use]
    pub fn forced_statement(&self) -> Option<&str> {
        self.as_file().and_then(|f| f.forced_statement.as_deref())
    }

    #[must_use]
    pub fn package(&self) -> Option<&Arc<PackageDescriptor>> {
        match self {
            Self::File(file) => file.package.as_ref(),
            Self::EmptyStub { package, .. } => package.as_ref(),
            Self::External { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_uses_table_content() {
        let a = ResolveRequest::from_file("/p", "/p/index.js", "x")
            .with_alias(Arc::new(AliasTable::new().alias("x$", "./y")));
        let b = ResolveRequest::from_file("/p", "/p/index.js", "x")
            .with_alias(Arc::new(AliasTable::new().alias("x$", "./y")));
        let c = ResolveRequest::from_file("/p", "/p/index.js", "x")
            .with_alias(Arc::new(AliasTable::new().alias("x$", "./z")));
        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
    }

    #[test]
    fn test_accessors() {
        let file = ResolvedModule::File(ResolvedFile {
            abs_path: PathBuf::from("/p/a.ts"),
            extension: ".ts".into(),
            fuse_box_path: "a.js".into(),
            forced_statement: Some("~/a.js".into()),
            package: None,
        });
        assert!(!file.is_external());
        assert_eq!(file.fuse_box_path(), Some("a.js"));
        assert_eq!(file.forced_statement(), Some("~/a.js"));
        assert_eq!(file.abs_path(), Some(Path::new("/p/a.ts")));

        let external = ResolvedModule::External {
            specifier: "https://cdn/x.js".into(),
        };
        assert!(external.is_external());
        assert!(external.abs_path().is_none());
        assert!(external.forced_statement().is_none());
    }
}
