use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Boxed cause shared between cached copies of an error.
pub type SharedCause = Arc<dyn std::error::Error + Send + Sync>;

/// Resolution error for a single specifier.
///
/// Errors are cheap to clone so failed resolutions can be memoized next to
/// successful ones.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    #[error("Specifier is empty")]
    SpecifierInvalid,

    #[error("Cannot resolve '{specifier}' without {field}")]
    MissingContext {
        specifier: String,
        field: &'static str,
    },

    #[error("Cannot resolve '{specifier}' from '{}'", importer.display())]
    ModuleNotFound {
        specifier: String,
        importer: PathBuf,
        /// Candidate paths probed (capped).
        tried: Vec<PathBuf>,
        #[source]
        cause: Option<Arc<std::io::Error>>,
    },

    #[error("Invalid path mapping '{pattern}': {reason}")]
    InvalidPathMapping { pattern: String, reason: String },

    #[error("Invalid package.json at {}: {cause}", path.display())]
    PackageMetadata {
        path: PathBuf,
        #[source]
        cause: SharedCause,
    },
}

impl ResolveError {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::SpecifierInvalid => "SPECIFIER_INVALID",
            Self::MissingContext { .. } => "MISSING_CONTEXT",
            Self::ModuleNotFound { .. } => "MODULE_NOT_FOUND",
            Self::InvalidPathMapping { .. } => "INVALID_PATH_MAPPING",
            Self::PackageMetadata { .. } => "PACKAGE_METADATA_ERROR",
        }
    }

    /// Candidate paths probed before giving up (empty for other variants).
    #[must_use]
    pub fn tried(&self) -> &[PathBuf] {
        match self {
            Self::ModuleNotFound { tried, .. } => tried,
            _ => &[],
        }
    }

    pub(crate) fn invalid_mapping(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPathMapping {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }
}

/// Warning codes for non-fatal configuration problems.
pub mod warning_codes {
    pub const INVALID_PATH_MAPPING: &str = "INVALID_PATH_MAPPING";
    pub const INVALID_ALIAS: &str = "INVALID_ALIAS";
    pub const BASE_URL_OUTSIDE_HOME: &str = "BASE_URL_OUTSIDE_HOME";
}

/// Non-fatal configuration problem, reported once per build.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigWarning {
    pub code: &'static str,
    pub message: String,
}

impl ConfigWarning {
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_screaming_snake_case() {
        let errors = [
            ResolveError::SpecifierInvalid,
            ResolveError::invalid_mapping("a/*/*", "too many wildcards"),
            ResolveError::ModuleNotFound {
                specifier: "./x".into(),
                importer: PathBuf::from("/p/index.js"),
                tried: vec![],
                cause: None,
            },
        ];
        for err in &errors {
            assert!(err
                .code()
                .chars()
                .all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_not_found_message_and_source() {
        let err = ResolveError::ModuleNotFound {
            specifier: "./missing".into(),
            importer: PathBuf::from("/p/index.js"),
            tried: vec![PathBuf::from("/p/missing.js")],
            cause: Some(Arc::new(std::io::Error::from(
                std::io::ErrorKind::PermissionDenied,
            ))),
        };
        assert_eq!(err.to_string(), "Cannot resolve './missing' from '/p/index.js'");
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.tried().len(), 1);
    }

    #[test]
    fn test_warning_display() {
        let w = ConfigWarning::new(warning_codes::BASE_URL_OUTSIDE_HOME, "baseURL /x");
        assert_eq!(w.to_string(), "[BASE_URL_OUTSIDE_HOME] baseURL /x");
    }
}
