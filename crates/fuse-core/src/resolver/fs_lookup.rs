//! Filesystem lookup: extension probing, directory `package.json` main,
//! and `index` fallback.

use super::cache::{Probe, ProbeCache};
use super::pkg_json_cache::{BrowserTarget, PackageCache};
use crate::config::ResolverConfig;
use crate::error::ResolveError;
use crate::paths::{append_extension, extension_of, normalize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Maximum number of tried paths to record.
const MAX_TRIED_PATHS: usize = 20;

/// Maximum chain of `package.json` main indirections followed.
const MAX_MAIN_DEPTH: usize = 8;

/// A file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Located {
    pub path: PathBuf,
    /// Source extension, with its leading dot.
    pub extension: String,
}

/// What a lookup landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    File(Located),
    /// A `browser` map disabled the entry (`false`).
    Disabled,
}

/// Paths probed during one resolution, for diagnostics.
#[derive(Debug, Default)]
pub(crate) struct Trail {
    tried: Vec<PathBuf>,
    cause: Option<Arc<io::Error>>,
}

impl Trail {
    pub(crate) fn record(&mut self, path: &Path) {
        if self.tried.len() < MAX_TRIED_PATHS {
            self.tried.push(path.to_path_buf());
        }
    }

    fn note_cause(&mut self, cause: Arc<io::Error>) {
        self.cause.get_or_insert(cause);
    }

    pub(crate) fn not_found(self, specifier: &str, importer: &Path) -> ResolveError {
        ResolveError::ModuleNotFound {
            specifier: specifier.to_string(),
            importer: importer.to_path_buf(),
            tried: self.tried,
            cause: self.cause,
        }
    }
}

/// Filesystem resolver over the shared probe and package caches.
pub(crate) struct FsResolver<'a> {
    config: &'a ResolverConfig,
    probes: &'a ProbeCache,
    packages: &'a PackageCache,
}

impl<'a> FsResolver<'a> {
    pub(crate) fn new(
        config: &'a ResolverConfig,
        probes: &'a ProbeCache,
        packages: &'a PackageCache,
    ) -> Self {
        Self {
            config,
            probes,
            packages,
        }
    }

    pub(crate) fn packages(&self) -> &'a PackageCache {
        self.packages
    }

    /// Whether `path` is a directory (recorded in the trail).
    pub(crate) fn is_dir(&self, path: &Path, trail: &mut Trail) -> bool {
        trail.record(path);
        match self.probes.probe(path) {
            Probe::Dir => true,
            Probe::Inaccessible(cause) => {
                trail.note_cause(cause);
                false
            }
            Probe::File | Probe::Missing => false,
        }
    }

    fn is_file(&self, path: &Path, trail: &mut Trail) -> bool {
        trail.record(path);
        match self.probes.probe(path) {
            Probe::File => true,
            Probe::Inaccessible(cause) => {
                trail.note_cause(cause);
                false
            }
            Probe::Dir | Probe::Missing => false,
        }
    }

    /// Resolve a candidate path with or without an extension.
    ///
    /// # Errors
    /// Only `package.json` failures are errors; not finding anything is `Ok(None)`.
    pub(crate) fn resolve(
        &self,
        candidate: &Path,
        trail: &mut Trail,
    ) -> Result<Option<Outcome>, ResolveError> {
        self.resolve_at_depth(candidate, trail, 0)
    }

    /// Resolve `dir` as a directory: `package.json` entry, then `index`.
    pub(crate) fn resolve_directory(
        &self,
        dir: &Path,
        trail: &mut Trail,
    ) -> Result<Option<Outcome>, ResolveError> {
        self.directory_at_depth(dir, trail, 0)
    }

    fn resolve_at_depth(
        &self,
        candidate: &Path,
        trail: &mut Trail,
        depth: usize,
    ) -> Result<Option<Outcome>, ResolveError> {
        if let Some(found) = self.resolve_file(candidate, trail) {
            return Ok(Some(Outcome::File(found)));
        }

        if self.is_dir(candidate, trail) {
            return self.directory_at_depth(candidate, trail, depth);
        }

        Ok(None)
    }

    fn directory_at_depth(
        &self,
        dir: &Path,
        trail: &mut Trail,
        depth: usize,
    ) -> Result<Option<Outcome>, ResolveError> {
        if depth < MAX_MAIN_DEPTH {
            if let Some(pkg) = self.packages.get(dir)? {
                match pkg.entry(self.config.browser_overrides) {
                    Some(BrowserTarget::Path(main)) => {
                        let main_path = normalize(&dir.join(&main));
                        if main_path != normalize(dir) {
                            if let Some(outcome) =
                                self.resolve_at_depth(&main_path, trail, depth + 1)?
                            {
                                return Ok(Some(outcome));
                            }
                        }
                    }
                    Some(BrowserTarget::Disabled) => return Ok(Some(Outcome::Disabled)),
                    None => {}
                }
            }
        }

        Ok(self
            .resolve_file(&dir.join("index"), trail)
            .map(Outcome::File))
    }

    /// Exact file (when it carries an extension), then each probed extension.
    fn resolve_file(&self, candidate: &Path, trail: &mut Trail) -> Option<Located> {
        if let Some(extension) = extension_of(candidate) {
            if self.is_file(candidate, trail) {
                return Some(Located {
                    path: candidate.to_path_buf(),
                    extension,
                });
            }
        }

        for ext in &self.config.extensions {
            let with_ext = append_extension(candidate, ext);
            if self.is_file(&with_ext, trail) {
                return Some(Located {
                    path: with_ext,
                    extension: ext.clone(),
                });
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    struct Fixture {
        config: ResolverConfig,
        probes: ProbeCache,
        packages: PackageCache,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                config: ResolverConfig::default(),
                probes: ProbeCache::new(),
                packages: PackageCache::new(),
            }
        }

        fn resolve(&self, candidate: &Path) -> Option<Outcome> {
            let fs = FsResolver::new(&self.config, &self.probes, &self.packages);
            fs.resolve(candidate, &mut Trail::default()).unwrap()
        }
    }

    fn file(outcome: Option<Outcome>) -> Located {
        match outcome {
            Some(Outcome::File(located)) => located,
            other => panic!("expected a file, got {other:?}"),
        }
    }

    #[test]
    fn test_exact_file_with_extension() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("style.css"), "").unwrap();

        let found = file(Fixture::new().resolve(&dir.path().join("style.css")));
        assert_eq!(found.extension, ".css");
    }

    #[test]
    fn test_extension_priority() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("dep.ts"), "").unwrap();
        fs::write(dir.path().join("dep.js"), "").unwrap();

        let found = file(Fixture::new().resolve(&dir.path().join("dep")));
        assert_eq!(found.extension, ".js");
        assert!(found.path.ends_with("dep.js"));
    }

    #[test]
    fn test_dotted_name_appends_extension() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("jquery.min.js"), "").unwrap();

        let found = file(Fixture::new().resolve(&dir.path().join("jquery.min")));
        assert!(found.path.ends_with("jquery.min.js"));
    }

    #[test]
    fn test_file_wins_over_directory() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("utils")).unwrap();
        fs::write(dir.path().join("utils/index.js"), "").unwrap();
        fs::write(dir.path().join("utils.ts"), "").unwrap();

        let found = file(Fixture::new().resolve(&dir.path().join("utils")));
        assert!(found.path.ends_with("utils.ts"));
    }

    #[test]
    fn test_directory_index() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("some4")).unwrap();
        fs::write(dir.path().join("some4/index.tsx"), "").unwrap();

        let found = file(Fixture::new().resolve(&dir.path().join("some4")));
        assert_eq!(found.extension, ".tsx");
        assert!(found.path.ends_with("some4/index.tsx"));
    }

    #[test]
    fn test_directory_package_main() {
        let dir = tempdir().unwrap();
        let some5 = dir.path().join("some5");
        fs::create_dir(&some5).unwrap();
        fs::write(some5.join("package.json"), r#"{"main":"foo.js"}"#).unwrap();
        fs::write(some5.join("foo.js"), "").unwrap();
        fs::write(some5.join("index.js"), "").unwrap();

        let found = file(Fixture::new().resolve(&some5));
        assert!(found.path.ends_with("some5/foo.js"));
    }

    #[test]
    fn test_main_without_extension_and_main_directory() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("pkg");
        fs::create_dir_all(pkg.join("lib")).unwrap();
        fs::write(pkg.join("package.json"), r#"{"main":"./lib"}"#).unwrap();
        fs::write(pkg.join("lib/index.ts"), "").unwrap();

        let found = file(Fixture::new().resolve(&pkg));
        assert!(found.path.ends_with("pkg/lib/index.ts"));
    }

    #[test]
    fn test_missing_main_falls_back_to_index() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("pkg");
        fs::create_dir(&pkg).unwrap();
        fs::write(pkg.join("package.json"), r#"{"main":"gone.js"}"#).unwrap();
        fs::write(pkg.join("index.js"), "").unwrap();

        let found = file(Fixture::new().resolve(&pkg));
        assert!(found.path.ends_with("pkg/index.js"));
    }

    #[test]
    fn test_self_referencing_main_terminates() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("pkg");
        fs::create_dir(&pkg).unwrap();
        fs::write(pkg.join("package.json"), r#"{"main":"."}"#).unwrap();
        fs::write(pkg.join("index.js"), "").unwrap();

        let found = file(Fixture::new().resolve(&pkg));
        assert!(found.path.ends_with("pkg/index.js"));
    }

    #[test]
    fn test_browser_disabled_main() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("pkg");
        fs::create_dir(&pkg).unwrap();
        fs::write(
            pkg.join("package.json"),
            r#"{"main":"node.js","browser":{"./node.js":false}}"#,
        )
        .unwrap();
        fs::write(pkg.join("node.js"), "").unwrap();

        let fixture = Fixture::new();
        assert_eq!(fixture.resolve(&pkg), Some(Outcome::Disabled));

        let node = Fixture {
            config: ResolverConfig::default().with_browser_overrides(false),
            ..Fixture::new()
        };
        assert!(file(node.resolve(&pkg)).path.ends_with("node.js"));
    }

    #[test]
    fn test_not_found_records_tried() {
        let dir = tempdir().unwrap();
        let fixture = Fixture::new();
        let fs = FsResolver::new(&fixture.config, &fixture.probes, &fixture.packages);
        let mut trail = Trail::default();

        let outcome = fs.resolve(&dir.path().join("nope"), &mut trail).unwrap();
        assert!(outcome.is_none());

        let err = trail.not_found("./nope", &dir.path().join("index.js"));
        assert_eq!(err.code(), "MODULE_NOT_FOUND");
        assert!(err.tried().iter().any(|p| p.ends_with("nope.js")));
        assert!(err.tried().len() <= MAX_TRIED_PATHS);
    }

    #[test]
    fn test_malformed_package_json_is_error() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("pkg");
        fs::create_dir(&pkg).unwrap();
        fs::write(pkg.join("package.json"), "{").unwrap();

        let fixture = Fixture::new();
        let fs = FsResolver::new(&fixture.config, &fixture.probes, &fixture.packages);
        let err = fs.resolve(&pkg, &mut Trail::default()).unwrap_err();
        assert_eq!(err.code(), "PACKAGE_METADATA_ERROR");
    }
}
