//! TypeScript `baseUrl` + `paths` mapping.
//!
//! Patterns hold at most one `*`. Patterns are tried in declaration order;
//! the first one that matches produces the ordered candidate list (one per
//! substitution template), resolved against `baseUrl`. Existence is not
//! checked here.

use crate::error::ResolveError;
use crate::paths::{normalize, to_posix};
use fuse_util::hash::blake3_fields;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// A pattern or template split on its wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Wildcard {
    raw: String,
    prefix: String,
    /// Text after the `*`; `None` when there is no wildcard.
    suffix: Option<String>,
}

impl Wildcard {
    fn parse(raw: &str) -> Result<Self, &'static str> {
        match raw.matches('*').count() {
            0 => Ok(Self {
                raw: raw.to_string(),
                prefix: raw.to_string(),
                suffix: None,
            }),
            1 => {
                let (prefix, suffix) = raw.split_once('*').unwrap_or((raw, ""));
                Ok(Self {
                    raw: raw.to_string(),
                    prefix: prefix.to_string(),
                    suffix: Some(suffix.to_string()),
                })
            }
            _ => Err("at most one '*' wildcard is allowed"),
        }
    }

    /// Match `spec`, returning the wildcard capture (empty for exact patterns).
    fn capture<'a>(&self, spec: &'a str) -> Option<&'a str> {
        match &self.suffix {
            None => (spec == self.prefix).then_some(""),
            Some(suffix) => {
                if spec.len() < self.prefix.len() + suffix.len() {
                    return None;
                }
                spec.strip_prefix(self.prefix.as_str())?
                    .strip_suffix(suffix.as_str())
            }
        }
    }

    fn substitute(&self, capture: &str) -> String {
        match &self.suffix {
            None => self.prefix.clone(),
            Some(suffix) => format!("{}{capture}{suffix}", self.prefix),
        }
    }
}

#[derive(Debug, Clone)]
struct PathPattern {
    pattern: Wildcard,
    templates: Vec<Wildcard>,
}

/// Candidates produced by a matching pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsMatch {
    /// The pattern that matched, as declared.
    pub pattern: String,
    /// Absolute candidate paths, in template order.
    pub candidates: Vec<PathBuf>,
}

/// `baseUrl` plus an ordered `paths` table.
#[derive(Debug, Clone)]
pub struct TsPaths {
    base_url: PathBuf,
    patterns: Vec<PathPattern>,
    rejected: Vec<ResolveError>,
    fingerprint: OnceLock<String>,
}

impl TsPaths {
    /// A `baseUrl`-only configuration (no `paths` table).
    #[must_use]
    pub fn new(base_url: impl Into<PathBuf>) -> Self {
        Self {
            base_url: normalize(&base_url.into()),
            patterns: Vec::new(),
            rejected: Vec::new(),
            fingerprint: OnceLock::new(),
        }
    }

    /// Add a pattern with its substitution templates.
    ///
    /// Invalid patterns or templates are recorded in
    /// [`rejected`](Self::rejected) and skipped.
    pub fn with_path<I, S>(mut self, pattern: &str, templates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let templates: Vec<String> = templates
            .into_iter()
            .map(|t| t.as_ref().to_string())
            .collect();
        self.push(pattern, &templates);
        self
    }

    /// Build from the `paths` object of a TypeScript config, keeping key order.
    #[must_use]
    pub fn from_json(base_url: impl Into<PathBuf>, paths: &Value) -> Self {
        let mut config = Self::new(base_url);
        let Some(map) = paths.as_object() else {
            config.rejected.push(ResolveError::invalid_mapping(
                "paths",
                "paths must be an object",
            ));
            return config;
        };

        for (pattern, value) in map {
            let Some(list) = value.as_array() else {
                config.rejected.push(ResolveError::invalid_mapping(
                    pattern.clone(),
                    "substitutions must be an array",
                ));
                continue;
            };

            let mut templates = Vec::with_capacity(list.len());
            for item in list {
                match item.as_str() {
                    Some(s) => templates.push(s.to_string()),
                    None => config.rejected.push(ResolveError::invalid_mapping(
                        pattern.clone(),
                        format!("substitution {item} is not a string"),
                    )),
                }
            }
            config.push(pattern, &templates);
        }
        config
    }

    fn push(&mut self, pattern: &str, templates: &[String]) {
        let parsed = match Wildcard::parse(pattern) {
            Ok(parsed) => parsed,
            Err(reason) => {
                self.rejected
                    .push(ResolveError::invalid_mapping(pattern, reason));
                return;
            }
        };

        if templates.is_empty() {
            self.rejected.push(ResolveError::invalid_mapping(
                pattern,
                "substitutions must not be empty",
            ));
            return;
        }

        let mut valid = Vec::with_capacity(templates.len());
        for template in templates {
            match Wildcard::parse(template) {
                Ok(t) => valid.push(t),
                Err(reason) => self.rejected.push(ResolveError::invalid_mapping(
                    format!("{pattern} -> {template}"),
                    reason,
                )),
            }
        }

        if !valid.is_empty() {
            self.patterns.push(PathPattern {
                pattern: parsed,
                templates: valid,
            });
            self.fingerprint = OnceLock::new();
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &Path {
        &self.base_url
    }

    /// Whether a `paths` table with at least one usable pattern is configured.
    #[must_use]
    pub fn has_paths(&self) -> bool {
        !self.patterns.is_empty()
    }

    /// Entries dropped while building the table.
    #[must_use]
    pub fn rejected(&self) -> &[ResolveError] {
        &self.rejected
    }

    /// Match `spec` against the patterns in declaration order.
    #[must_use]
    pub fn match_specifier(&self, spec: &str) -> Option<PathsMatch> {
        self.patterns.iter().find_map(|entry| {
            let capture = entry.pattern.capture(spec)?;
            let candidates = entry
                .templates
                .iter()
                .map(|t| normalize(&self.base_url.join(t.substitute(capture))))
                .collect();
            Some(PathsMatch {
                pattern: entry.pattern.raw.clone(),
                candidates,
            })
        })
    }

    /// The implicit candidate for a `baseUrl`-only configuration.
    #[must_use]
    pub fn base_url_candidate(&self, spec: &str) -> PathBuf {
        normalize(&self.base_url.join(spec))
    }

    /// Content fingerprint, stable for equal configurations.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        self.fingerprint.get_or_init(|| {
            let base = to_posix(&self.base_url);
            let mut fields: Vec<&str> = vec![base.as_str()];
            for entry in &self.patterns {
                fields.push(entry.pattern.raw.as_str());
                fields.extend(entry.templates.iter().map(|t| t.raw.as_str()));
                fields.push("\u{0}");
            }
            blake3_fields(fields)
        })
    }
}
