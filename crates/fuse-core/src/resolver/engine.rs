//! The resolution orchestrator.
//!
//! Sequence per request: external check, alias, importer-package `browser`
//! remap, then either filesystem lookup (relative/absolute) or TypeScript
//! paths followed by `node_modules` (bare). The landing file is then mapped
//! to its bundle id and the forced statement decided.
//!
//! A [`Resolver`] owns every cache for one build. Outcomes, including
//! failures, are memoized per request key.

use super::cache::{OnceMap, ProbeCache};
use super::fs_lookup::{FsResolver, Located, Outcome, Trail};
use super::node_modules;
use super::pkg_json_cache::{BrowserTarget, PackageCache, PackageDescriptor};
use super::request::{
    ResolutionKey, ResolveRequest, ResolvedFile, ResolvedModule, FORCED_PREFIX,
};
use super::ts_paths::TsPaths;
use crate::config::ResolverConfig;
use crate::error::{warning_codes, ConfigWarning, ResolveError};
use crate::paths::{
    is_absolute_specifier, is_bare_specifier, is_external_url, is_within, normalize,
    relative_posix, strip_extension, to_posix,
};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Outcome of one resolution.
pub type ResolveOutcome = Result<ResolvedModule, ResolveError>;

/// Cache sizes, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    /// Memoized request outcomes.
    pub resolutions: usize,
    /// Cached `package.json` lookups.
    pub packages: usize,
    /// `package.json` read attempts.
    pub package_reads: usize,
    /// Cached filesystem probes.
    pub probes: usize,
}

/// Where a lookup landed, before bundle ids are computed.
struct Landing {
    outcome: Outcome,
    /// Resolution root for the bundle id.
    root: PathBuf,
    /// Root-relative path the specifier names at face value.
    naive: String,
    package: Option<Arc<PackageDescriptor>>,
    rewritten: bool,
}

/// Configuration warnings, each logged once.
#[derive(Debug, Default)]
struct WarningLog {
    seen: Mutex<Vec<ConfigWarning>>,
}

impl WarningLog {
    fn report(&self, warning: ConfigWarning) {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        if seen.contains(&warning) {
            return;
        }
        warn!(code = warning.code, "{}", warning.message);
        seen.push(warning);
    }

    fn snapshot(&self) -> Vec<ConfigWarning> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn clear(&self) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Module resolver for one build.
///
/// Safe to share between threads; concurrent requests for the same key
/// resolve once.
#[derive(Debug, Default)]
pub struct Resolver {
    config: ResolverConfig,
    probes: ProbeCache,
    packages: PackageCache,
    results: OnceMap<ResolutionKey, ResolveOutcome>,
    warnings: WarningLog,
}

impl Resolver {
    #[must_use]
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// The `package.json` cache shared by every resolution of this build.
    #[must_use]
    pub fn packages(&self) -> &PackageCache {
        &self.packages
    }

    /// Resolve one specifier.
    ///
    /// # Errors
    /// `ModuleNotFound` when nothing on disk matches, `PackageMetadata` for an
    /// unparseable `package.json` on the way, `SpecifierInvalid` and
    /// `MissingContext` for malformed requests.
    pub fn resolve(&self, request: &ResolveRequest) -> ResolveOutcome {
        if is_external_url(&request.target) {
            debug!(specifier = %request.target, "external");
            return Ok(ResolvedModule::External {
                specifier: request.target.clone(),
            });
        }

        self.report_rejected(request);
        let key = request.cache_key();
        self.results
            .get_or_init(&key, || self.resolve_uncached(request))
    }

    /// Resolve independent requests in parallel, keeping input order.
    #[must_use]
    pub fn resolve_all(&self, requests: &[ResolveRequest]) -> Vec<ResolveOutcome> {
        requests.par_iter().map(|r| self.resolve(r)).collect()
    }

    /// Configuration warnings reported so far.
    #[must_use]
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        self.warnings.snapshot()
    }

    #[must_use]
    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            resolutions: self.results.len(),
            packages: self.packages.len(),
            package_reads: self.packages.reads(),
            probes: self.probes.len(),
        }
    }

    /// Drop every cache and warning, as on a build restart.
    pub fn clear(&self) {
        self.results.clear();
        self.packages.clear();
        self.probes.clear();
        self.warnings.clear();
    }

    fn report_rejected(&self, request: &ResolveRequest) {
        if let Some(alias) = &request.alias {
            for err in alias.rejected() {
                self.warnings
                    .report(ConfigWarning::new(warning_codes::INVALID_ALIAS, err.to_string()));
            }
        }
        if let Some(paths) = &request.typescript_paths {
            for err in paths.rejected() {
                self.warnings.report(ConfigWarning::new(
                    warning_codes::INVALID_PATH_MAPPING,
                    err.to_string(),
                ));
            }
        }
    }

    fn resolve_uncached(&self, request: &ResolveRequest) -> ResolveOutcome {
        let target = request.target.as_str();
        if target.is_empty() {
            return Err(ResolveError::SpecifierInvalid);
        }
        let home = request
            .home_dir
            .as_deref()
            .map(normalize)
            .ok_or_else(|| missing_context(target, "homeDir"))?;
        let file = request
            .file_path
            .as_deref()
            .map(normalize)
            .ok_or_else(|| missing_context(target, "filePath"))?;
        let importer_dir = file.parent().map_or_else(|| home.clone(), Path::to_path_buf);

        let fs = FsResolver::new(&self.config, &self.probes, &self.packages);
        let mut trail = Trail::default();

        let mut spec = target.to_string();
        let mut base_dir = importer_dir.clone();
        let mut rewritten = false;
        let mut aliased = false;

        if let Some(rewrite) = request.alias.as_deref().and_then(|a| a.rewrite(target)) {
            debug!(specifier = target, rewrite = %rewrite, "alias matched");
            spec = rewrite;
            base_dir.clone_from(&home);
            rewritten = true;
            aliased = true;
        }

        if self.config.browser_overrides && is_bare_specifier(&spec) {
            if let Some(pkg) = &request.package {
                match pkg.browser_module(&spec) {
                    Some(BrowserTarget::Disabled) => {
                        debug!(specifier = target, package = %pkg.name, "disabled by browser map");
                        return Ok(ResolvedModule::EmptyStub {
                            specifier: target.to_string(),
                            package: Some(Arc::clone(pkg)),
                        });
                    }
                    Some(BrowserTarget::Path(replacement)) => {
                        debug!(specifier = target, replacement = %replacement, "browser map");
                        spec.clone_from(replacement);
                        base_dir.clone_from(&pkg.root);
                        rewritten = true;
                    }
                    None => {}
                }
            }
        }

        let landing = if is_bare_specifier(&spec) {
            let ts = if aliased {
                None
            } else {
                request.typescript_paths.as_deref()
            };
            self.resolve_bare(&spec, ts, &home, &importer_dir, &fs, &mut trail)?
        } else {
            resolve_path(&spec, &base_dir, request, &home, &fs, &mut trail)?
        };

        let Some(mut landing) = landing else {
            debug!(specifier = target, importer = %file.display(), "not found");
            return Err(trail.not_found(target, &file));
        };
        landing.rewritten |= rewritten;

        self.emit(target, landing, &file, &fs, trail)
    }

    /// TypeScript paths (when configured), then `node_modules`.
    fn resolve_bare(
        &self,
        spec: &str,
        ts: Option<&TsPaths>,
        home: &Path,
        importer_dir: &Path,
        fs: &FsResolver<'_>,
        trail: &mut Trail,
    ) -> Result<Option<Landing>, ResolveError> {
        if let Some(ts) = ts {
            if let Some(landing) = self.resolve_ts_paths(spec, ts, home, fs, trail)? {
                return Ok(Some(landing));
            }
        }

        let Some(hit) = node_modules::resolve_package(fs, spec, importer_dir, home, trail)? else {
            return Ok(None);
        };
        Ok(Some(Landing {
            outcome: hit.outcome,
            root: hit.package.root.clone(),
            naive: hit.subpath.unwrap_or_default(),
            package: Some(hit.package),
            rewritten: false,
        }))
    }

    fn resolve_ts_paths(
        &self,
        spec: &str,
        ts: &TsPaths,
        home: &Path,
        fs: &FsResolver<'_>,
        trail: &mut Trail,
    ) -> Result<Option<Landing>, ResolveError> {
        let candidates = if ts.has_paths() {
            let Some(matched) = ts.match_specifier(spec) else {
                return Ok(None);
            };
            debug!(
                specifier = spec,
                pattern = %matched.pattern,
                candidates = matched.candidates.len(),
                "paths pattern matched"
            );
            matched.candidates
        } else if is_within(home, ts.base_url()) {
            vec![ts.base_url_candidate(spec)]
        } else {
            self.warnings.report(ConfigWarning::new(
                warning_codes::BASE_URL_OUTSIDE_HOME,
                format!(
                    "baseURL {} is outside {}; implicit baseURL lookups are disabled",
                    to_posix(ts.base_url()),
                    to_posix(home)
                ),
            ));
            return Ok(None);
        };

        for candidate in candidates {
            if let Some(outcome) = fs.resolve(&candidate, trail)? {
                return Ok(Some(Landing {
                    outcome,
                    root: home.to_path_buf(),
                    naive: relative_posix(home, &candidate),
                    package: None,
                    rewritten: true,
                }));
            }
        }
        Ok(None)
    }

    /// Apply file-level `browser` remaps, then compute the bundle id.
    fn emit(
        &self,
        target: &str,
        landing: Landing,
        importer: &Path,
        fs: &FsResolver<'_>,
        mut trail: Trail,
    ) -> ResolveOutcome {
        let Landing {
            outcome,
            root,
            naive,
            package,
            rewritten,
        } = landing;
        let stub = |package: Option<Arc<PackageDescriptor>>| ResolvedModule::EmptyStub {
            specifier: target.to_string(),
            package,
        };

        let Outcome::File(mut located) = outcome else {
            return Ok(stub(package));
        };

        let mut remapped = false;
        if let (true, Some(pkg)) = (self.config.browser_overrides, package.as_ref()) {
            let rel = relative_posix(&pkg.root, &located.path);
            match pkg.browser_file(&rel) {
                Some(BrowserTarget::Disabled) => return Ok(stub(package.clone())),
                Some(BrowserTarget::Path(replacement)) => {
                    let candidate = normalize(&pkg.root.join(replacement));
                    if candidate != located.path {
                        match fs.resolve(&candidate, &mut trail)? {
                            Some(Outcome::File(found)) => {
                                debug!(from = %rel, to = %found.path.display(), "browser file remap");
                                located = found;
                                remapped = true;
                            }
                            Some(Outcome::Disabled) => return Ok(stub(package.clone())),
                            None => return Err(trail.not_found(target, importer)),
                        }
                    }
                }
                None => {}
            }
        }

        let file = self.resolved_file(located, &root, &naive, package, rewritten || remapped);
        debug!(
            specifier = target,
            path = %file.abs_path.display(),
            fuse_box_path = %file.fuse_box_path,
            forced = ?file.forced_statement,
            "resolved"
        );
        Ok(ResolvedModule::File(file))
    }

    fn resolved_file(
        &self,
        located: Located,
        root: &Path,
        naive: &str,
        package: Option<Arc<PackageDescriptor>>,
        rewritten: bool,
    ) -> ResolvedFile {
        let ext = located.extension.as_str();
        let out_ext = self.config.output_extension(ext);
        let rel = relative_posix(root, &located.path);
        let stem = strip_extension(&rel, ext);
        let fuse_box_path = format!("{stem}{out_ext}");

        let forced =
            rewritten || ext != out_ext || !matches_naive(stem, strip_extension(naive, ext));

        ResolvedFile {
            forced_statement: forced.then(|| format!("{FORCED_PREFIX}{fuse_box_path}")),
            fuse_box_path,
            abs_path: located.path.clone(),
            extension: located.extension.clone(),
            package,
        }
    }
}

/// Relative or absolute specifier through the filesystem resolver.
fn resolve_path(
    spec: &str,
    base_dir: &Path,
    request: &ResolveRequest,
    home: &Path,
    fs: &FsResolver<'_>,
    trail: &mut Trail,
) -> Result<Option<Landing>, ResolveError> {
    let candidate = if is_absolute_specifier(spec) {
        normalize(Path::new(spec))
    } else {
        normalize(&base_dir.join(spec))
    };

    let Some(outcome) = fs.resolve(&candidate, trail)? else {
        return Ok(None);
    };

    let (root, package) = match &request.package {
        Some(pkg) if is_within(&pkg.root, &candidate) => (pkg.root.clone(), Some(Arc::clone(pkg))),
        _ => (home.to_path_buf(), None),
    };
    Ok(Some(Landing {
        naive: relative_posix(&root, &candidate),
        outcome,
        root,
        package,
        rewritten: false,
    }))
}

/// Whether the resolved stem is what the specifier says at face value:
/// the path itself or its `index`.
fn matches_naive(stem: &str, naive: &str) -> bool {
    if naive.is_empty() {
        return stem == "index";
    }
    stem == naive
        || stem
            .strip_prefix(naive)
            .is_some_and(|rest| rest == "/index")
}

fn missing_context(specifier: &str, field: &'static str) -> ResolveError {
    ResolveError::MissingContext {
        specifier: specifier.to_string(),
        field,
    }
}
