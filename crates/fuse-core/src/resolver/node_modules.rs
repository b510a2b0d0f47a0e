//! Bare specifier resolution through `node_modules` ancestry.

use super::fs_lookup::{FsResolver, Outcome, Trail};
use super::pkg_json_cache::PackageDescriptor;
use crate::error::ResolveError;
use crate::paths::{is_within, normalize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A bare specifier resolved into a dependency package.
#[derive(Debug, Clone)]
pub(crate) struct PackageHit {
    pub package: Arc<PackageDescriptor>,
    pub subpath: Option<String>,
    pub outcome: Outcome,
}

/// Split a bare specifier into package name and optional subpath.
///
/// `lodash/fp` is `("lodash", Some("fp"))`, `@scope/pkg/sub/path` is
/// `("@scope/pkg", Some("sub/path"))`. Returns `None` for specifiers that
/// cannot name a package (`@scope` alone, empty names).
pub(crate) fn parse_bare_specifier(spec: &str) -> Option<(&str, Option<&str>)> {
    let name_end = if spec.starts_with('@') {
        // Scoped package: the name runs to the second slash
        let first = spec.find('/')?;
        spec[first + 1..].find('/').map(|i| first + 1 + i)
    } else {
        spec.find('/')
    };

    let (name, subpath) = match name_end {
        Some(end) => (&spec[..end], Some(&spec[end + 1..])),
        None => (spec, None),
    };

    let valid = !name.is_empty()
        && !name.ends_with('/')
        && !(name.starts_with('@') && !name.contains('/'));
    if !valid {
        return None;
    }

    let subpath = subpath
        .map(|s| s.trim_start_matches('/'))
        .filter(|s| !s.is_empty());
    Some((name, subpath))
}

/// Find `<dir>/node_modules/<name>` walking up from `start`.
///
/// The walk stops after `stop` (the project root) or at the filesystem root.
/// Directories that are themselves `node_modules` are skipped.
pub(crate) fn find_package_dir(
    fs: &FsResolver<'_>,
    start: &Path,
    stop: &Path,
    name: &str,
    trail: &mut Trail,
) -> Option<PathBuf> {
    for dir in start.ancestors() {
        let is_node_modules = dir.file_name().is_some_and(|n| n == "node_modules");
        if !is_node_modules {
            let pkg_dir = dir.join("node_modules").join(name);
            if fs.is_dir(&pkg_dir, trail) {
                return Some(pkg_dir);
            }
        }

        if dir == stop {
            break;
        }
    }
    None
}

/// Resolve a bare specifier into a dependency package.
///
/// Returns `Ok(None)` when no package directory exists or when the package
/// has no resolvable entry for the requested subpath.
///
/// # Errors
/// Returns `PackageMetadata` if the package's `package.json` is malformed.
pub(crate) fn resolve_package(
    fs: &FsResolver<'_>,
    spec: &str,
    importer_dir: &Path,
    root: &Path,
    trail: &mut Trail,
) -> Result<Option<PackageHit>, ResolveError> {
    let Some((name, subpath)) = parse_bare_specifier(spec) else {
        return Ok(None);
    };

    let Some(pkg_dir) = find_package_dir(fs, importer_dir, root, name, trail) else {
        debug!(package = name, from = %importer_dir.display(), "package not found");
        return Ok(None);
    };

    let package = match fs.packages().get(&pkg_dir)? {
        Some(package) => package,
        None => Arc::new(PackageDescriptor::synthetic(&pkg_dir, name)),
    };
    debug!(
        package = %package.name,
        version = ?package.version,
        dir = %pkg_dir.display(),
        subpath = ?subpath,
        "found package"
    );

    let outcome = match subpath {
        None => fs.resolve_directory(&pkg_dir, trail)?,
        Some(sub) => {
            let candidate = normalize(&pkg_dir.join(sub));
            if !is_within(&pkg_dir, &candidate) {
                debug!(package = name, subpath = sub, "subpath leaves the package");
                return Ok(None);
            }
            fs.resolve(&candidate, trail)?
        }
    };

    Ok(outcome.map(|outcome| PackageHit {
        package,
        subpath: subpath.map(str::to_string),
        outcome,
    }))
}
