//! Path and extension utilities.
//!
//! Everything here is pure: no filesystem access. Paths are normalized
//! lexically (`.` and `..` folded) and rendered with forward slashes for
//! bundle-relative ids.

use std::path::{Component, Path, PathBuf};

/// Default source extensions, in probing priority order.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".js", ".jsx", ".ts", ".tsx", ".mjs", ".json"];

/// Default source extensions that are emitted under a different extension.
///
/// TypeScript variants map to their JavaScript counterpart; everything else
/// passes through unchanged.
pub const OUTPUT_EXTENSIONS: &[(&str, &str)] = &[
    (".ts", ".js"),
    (".tsx", ".jsx"),
    (".mts", ".mjs"),
    (".cts", ".cjs"),
];

/// Extension of the final path component, with its leading dot.
///
/// Dotfiles such as `.babelrc` have no extension.
#[must_use]
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
}

/// Append `ext` to the file name without replacing an existing extension.
///
/// `jquery.min` + `.js` is `jquery.min.js`, not `jquery.js`.
#[must_use]
pub fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(ext);
    PathBuf::from(os)
}

/// Fold `.` and `..` components without touching the filesystem.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Render a path with forward slashes.
#[must_use]
pub fn to_posix(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Posix-style path of `path` relative to `root`.
///
/// Paths outside `root` climb with `..` segments. Both inputs are
/// normalized first.
#[must_use]
pub fn relative_posix(root: &Path, path: &Path) -> String {
    let root = normalize(root);
    let path = normalize(path);

    let root_parts: Vec<Component<'_>> = root.components().collect();
    let path_parts: Vec<Component<'_>> = path.components().collect();

    let common = root_parts
        .iter()
        .zip(&path_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = Vec::new();
    for _ in common..root_parts.len() {
        segments.push("..".to_string());
    }
    for part in &path_parts[common..] {
        segments.push(part.as_os_str().to_string_lossy().into_owned());
    }
    segments.join("/")
}

/// Strip `ext` from the end of `path` if present.
#[must_use]
pub fn strip_extension<'a>(path: &'a str, ext: &str) -> &'a str {
    path.strip_suffix(ext).unwrap_or(path)
}

/// Whether `path` is `root` or lies beneath it (lexically).
#[must_use]
pub fn is_within(root: &Path, path: &Path) -> bool {
    normalize(path).starts_with(normalize(root))
}

/// Check if a specifier is an absolute URL (`https://…`, `//cdn…`, `data:`).
#[must_use]
pub fn is_external_url(spec: &str) -> bool {
    if spec.starts_with("//") || spec.starts_with("data:") {
        return true;
    }

    let Some(pos) = spec.find("://") else {
        return false;
    };
    let scheme = &spec[..pos];
    scheme.len() > 1
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Check if a specifier is relative (`./`, `../`, `.` or `..`).
#[must_use]
pub fn is_relative_specifier(spec: &str) -> bool {
    spec == "." || spec == ".." || spec.starts_with("./") || spec.starts_with("../")
}

/// Check if a specifier is an absolute filesystem path.
#[must_use]
pub fn is_absolute_specifier(spec: &str) -> bool {
    // Unix absolute
    if spec.starts_with('/') {
        return true;
    }

    // Windows absolute: C:\, D:/, etc.
    let bytes = spec.as_bytes();
    if bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
    {
        return true;
    }

    // UNC path: \\server\share
    spec.starts_with("\\\\")
}

/// Check if a specifier names a package (neither relative nor absolute).
#[must_use]
pub fn is_bare_specifier(spec: &str) -> bool {
    !is_relative_specifier(spec) && !is_absolute_specifier(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("/a/b.tsx")).as_deref(), Some(".tsx"));
        assert_eq!(extension_of(Path::new("/a/jquery.min")).as_deref(), Some(".min"));
        assert_eq!(extension_of(Path::new("/a/b")), None);
        assert_eq!(extension_of(Path::new("/a/.babelrc")), None);
    }

    #[test]
    fn test_append_extension_keeps_dots() {
        assert_eq!(
            append_extension(Path::new("/a/jquery.min"), ".js"),
            PathBuf::from("/a/jquery.min.js")
        );
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/a/b/")), PathBuf::from("/a/b"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize(Path::new("../a/./b")), PathBuf::from("../a/b"));
    }

    #[test]
    fn test_relative_posix() {
        assert_eq!(
            relative_posix(Path::new("/home/p"), Path::new("/home/p/src/a.js")),
            "src/a.js"
        );
        assert_eq!(
            relative_posix(Path::new("/home/p/"), Path::new("/home/p/./b/../a.js")),
            "a.js"
        );
        assert_eq!(
            relative_posix(Path::new("/home/p"), Path::new("/home/shared/a.js")),
            "../shared/a.js"
        );
        assert_eq!(relative_posix(Path::new("/home/p"), Path::new("/home/p")), "");
    }

    #[test]
    fn test_is_within() {
        assert!(is_within(Path::new("/p"), Path::new("/p/a/b")));
        assert!(is_within(Path::new("/p"), Path::new("/p")));
        assert!(!is_within(Path::new("/p"), Path::new("/pp/a")));
        assert!(!is_within(Path::new("/p/a"), Path::new("/p/a/../b")));
    }

    #[test]
    fn test_external_urls() {
        assert!(is_external_url("https://cdn.example.com/lib.js"));
        assert!(is_external_url("http://example.com"));
        assert!(is_external_url("//cdn.example.com/lib.js"));
        assert!(is_external_url("data:text/javascript,export{}"));
        assert!(!is_external_url("./http://nope"));
        assert!(!is_external_url("lodash"));
        assert!(!is_external_url("C:/x"));
    }

    #[test]
    fn test_specifier_kinds() {
        assert!(is_relative_specifier("./a"));
        assert!(is_relative_specifier("../a"));
        assert!(is_relative_specifier("."));
        assert!(!is_relative_specifier(".a"));
        assert!(is_absolute_specifier("/abs"));
        assert!(is_absolute_specifier("C:\\abs"));
        assert!(is_absolute_specifier("\\\\server\\share"));
        assert!(is_bare_specifier("@scope/pkg"));
        assert!(is_bare_specifier("lodash/fp"));
        assert!(!is_bare_specifier("./lodash"));
    }
}
