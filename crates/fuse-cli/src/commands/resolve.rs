//! `fuse-resolve resolve` command implementation.

use fuse_core::error::ConfigWarning;
use fuse_core::paths::{normalize, to_posix};
use fuse_core::resolver::{AliasTable, ResolveRequest, ResolvedModule, Resolver, TsPaths};
use fuse_core::version::SCHEMA_VERSION;
use fuse_core::{ResolveError, ResolverConfig};
use miette::{miette, IntoDiagnostic, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Arguments of the resolve command.
#[derive(Debug, Clone, Default)]
pub struct ResolveArgs {
    pub targets: Vec<String>,
    pub from: Option<PathBuf>,
    pub home: Option<PathBuf>,
    /// `KEY=TARGET` entries, in order.
    pub aliases: Vec<String>,
    pub base_url: Option<PathBuf>,
    pub paths: Option<PathBuf>,
    pub extensions: Vec<String>,
    pub no_browser: bool,
}

/// JSON output of the resolve command.
#[derive(Debug, Serialize)]
struct ResolveJsonOutput {
    ok: bool,
    schema_version: u32,
    home: String,
    from: String,
    results: Vec<ResolveJsonEntry>,
    warnings: Vec<WarningJson>,
}

#[derive(Debug, Serialize)]
struct ResolveJsonEntry {
    specifier: String,
    /// `resolved`, `external`, `empty` or `unresolved`.
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    abs_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fuse_box_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    forced_statement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    package: Option<PackageJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tried: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PackageJson {
    name: String,
    version: Option<String>,
    root: String,
}

#[derive(Debug, Serialize)]
struct WarningJson {
    code: &'static str,
    message: String,
}

impl From<&ConfigWarning> for WarningJson {
    fn from(w: &ConfigWarning) -> Self {
        Self {
            code: w.code,
            message: w.message.clone(),
        }
    }
}

impl ResolveJsonEntry {
    fn new(specifier: &str, status: &'static str) -> Self {
        Self {
            specifier: specifier.to_string(),
            status,
            abs_path: None,
            extension: None,
            fuse_box_path: None,
            forced_statement: None,
            package: None,
            error_code: None,
            error_message: None,
            tried: Vec::new(),
        }
    }

    fn from_outcome(specifier: &str, outcome: &Result<ResolvedModule, ResolveError>) -> Self {
        match outcome {
            Ok(ResolvedModule::External { .. }) => Self::new(specifier, "external"),
            Ok(ResolvedModule::EmptyStub { package, .. }) => Self {
                package: package.as_deref().map(PackageJson::from),
                ..Self::new(specifier, "empty")
            },
            Ok(ResolvedModule::File(file)) => Self {
                abs_path: Some(to_posix(&file.abs_path)),
                extension: Some(file.extension.clone()),
                fuse_box_path: Some(file.fuse_box_path.clone()),
                forced_statement: file.forced_statement.clone(),
                package: file.package.as_deref().map(PackageJson::from),
                ..Self::new(specifier, "resolved")
            },
            Err(err) => Self {
                error_code: Some(err.code()),
                error_message: Some(err.to_string()),
                tried: err.tried().iter().map(|p| to_posix(p)).collect(),
                ..Self::new(specifier, "unresolved")
            },
        }
    }
}

impl From<&fuse_core::PackageDescriptor> for PackageJson {
    fn from(pkg: &fuse_core::PackageDescriptor) -> Self {
        Self {
            name: pkg.name.clone(),
            version: pkg.version.clone(),
            root: to_posix(&pkg.root),
        }
    }
}

/// Run the resolve command.
///
/// Exits with code 2 if any specifier is unresolved.
pub fn run(cwd: &Path, args: ResolveArgs, json: bool) -> Result<()> {
    let home = args
        .home
        .as_deref()
        .map_or_else(|| normalize(cwd), |h| absolutize(cwd, h));
    let from = args
        .from
        .as_deref()
        .map_or_else(|| home.join("index.js"), |f| absolutize(cwd, f));

    let alias = build_alias(&args.aliases)?;
    let typescript_paths = build_ts_paths(cwd, &home, &args)?;

    let mut config = ResolverConfig::default().with_browser_overrides(!args.no_browser);
    if !args.extensions.is_empty() {
        config = config.with_extensions(&args.extensions);
    }
    let resolver = Resolver::new(config);

    let requests: Vec<ResolveRequest> = args
        .targets
        .iter()
        .map(|target| {
            let mut request = ResolveRequest::from_file(&home, &from, target.as_str());
            if let Some(alias) = &alias {
                request = request.with_alias(Arc::clone(alias));
            }
            if let Some(paths) = &typescript_paths {
                request = request.with_typescript_paths(Arc::clone(paths));
            }
            request
        })
        .collect();

    debug!(
        home = %home.display(),
        from = %from.display(),
        targets = requests.len(),
        "resolving"
    );
    let outcomes = resolver.resolve_all(&requests);
    let all_resolved = outcomes.iter().all(Result::is_ok);
    let warnings = resolver.warnings();

    if json {
        let output = ResolveJsonOutput {
            ok: all_resolved,
            schema_version: SCHEMA_VERSION,
            home: to_posix(&home),
            from: to_posix(&from),
            results: args
                .targets
                .iter()
                .zip(&outcomes)
                .map(|(target, outcome)| ResolveJsonEntry::from_outcome(target, outcome))
                .collect(),
            warnings: warnings.iter().map(WarningJson::from).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
    } else {
        for (target, outcome) in args.targets.iter().zip(&outcomes) {
            print_outcome_human(target, outcome);
        }
        if !warnings.is_empty() {
            println!();
            println!("Warnings:");
            for warning in &warnings {
                println!("  {warning}");
            }
        }
    }

    // Exit with code 2 if unresolved
    if !all_resolved {
        std::process::exit(2);
    }
    Ok(())
}

fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    normalize(&cwd.join(path))
}

/// Parse `KEY=TARGET` entries into an alias table.
fn build_alias(entries: &[String]) -> Result<Option<Arc<AliasTable>>> {
    if entries.is_empty() {
        return Ok(None);
    }

    let mut table = AliasTable::new();
    for raw in entries {
        let (key, target) = raw
            .split_once('=')
            .ok_or_else(|| miette!("invalid --alias '{raw}': expected KEY=TARGET"))?;
        table = table.alias(key, target);
    }
    Ok(Some(Arc::new(table)))
}

/// `baseURL` from `--base-url` (default: home) and `paths` from `--paths`.
///
/// The paths file holds either the `paths` object itself or an object with
/// a `paths` key.
fn build_ts_paths(cwd: &Path, home: &Path, args: &ResolveArgs) -> Result<Option<Arc<TsPaths>>> {
    if args.base_url.is_none() && args.paths.is_none() {
        return Ok(None);
    }

    let base_url = args
        .base_url
        .as_deref()
        .map_or_else(|| home.to_path_buf(), |b| absolutize(cwd, b));

    let Some(paths_file) = &args.paths else {
        return Ok(Some(Arc::new(TsPaths::new(base_url))));
    };

    let content = fuse_util::fs::read_to_string_lossy(&absolutize(cwd, paths_file))
        .into_diagnostic()?;
    let value: Value = serde_json::from_str(&content).into_diagnostic()?;
    let paths = value.get("paths").unwrap_or(&value);
    Ok(Some(Arc::new(TsPaths::from_json(base_url, paths))))
}

/// Print one outcome in human-readable format.
fn print_outcome_human(target: &str, outcome: &Result<ResolvedModule, ResolveError>) {
    println!("Specifier: {target}");
    match outcome {
        Ok(ResolvedModule::External { .. }) => println!("  External"),
        Ok(ResolvedModule::EmptyStub { package, .. }) => {
            println!("  Empty module");
            if let Some(pkg) = package {
                println!("  Package: {}", pkg.name);
            }
        }
        Ok(ResolvedModule::File(file)) => {
            println!("  Resolved: {}", file.abs_path.display());
            println!("  FuseBox path: {}", file.fuse_box_path);
            if let Some(ref forced) = file.forced_statement {
                println!("  Forced statement: {forced}");
            }
            if let Some(ref pkg) = file.package {
                match &pkg.version {
                    Some(version) => println!("  Package: {}@{version}", pkg.name),
                    None => println!("  Package: {}", pkg.name),
                }
            }
        }
        Err(err) => {
            println!("  Status: UNRESOLVED");
            println!("  Error: {}", err.code());
            println!("  Message: {err}");
            if !err.tried().is_empty() {
                println!("  Tried paths:");
                for path in err.tried() {
                    println!("    - {}", path.display());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_alias_keeps_order() {
        let table = build_alias(&["ui=./src/ui".into(), "ui/button$=./b".into()])
            .unwrap()
            .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rewrite("ui/button").as_deref(), Some("./src/ui/button"));
    }

    #[test]
    fn test_build_alias_rejects_missing_separator() {
        assert!(build_alias(&["nope".into()]).is_err());
        assert!(build_alias(&[]).unwrap().is_none());
    }

    #[test]
    fn test_entry_for_unresolved() {
        let err = ResolveError::ModuleNotFound {
            specifier: "./x".into(),
            importer: PathBuf::from("/p/index.js"),
            tried: vec![PathBuf::from("/p/x.js")],
            cause: None,
        };
        let entry = ResolveJsonEntry::from_outcome("./x", &Err(err));
        assert_eq!(entry.status, "unresolved");
        assert_eq!(entry.error_code, Some("MODULE_NOT_FOUND"));
        assert_eq!(entry.tried, vec!["/p/x.js".to_string()]);
    }
}
