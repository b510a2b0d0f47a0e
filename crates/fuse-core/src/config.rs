use crate::paths::{DEFAULT_EXTENSIONS, OUTPUT_EXTENSIONS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Runtime configuration for the fuse-resolve CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}

/// Resolver configuration shared by every resolution in a build.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Extensions to probe when a candidate has none (in order).
    pub extensions: Vec<String>,
    /// Source extension -> extension emitted in the bundle.
    pub output_extensions: Vec<(String, String)>,
    /// Honour the `browser` field of `package.json` files.
    pub browser_overrides: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            output_extensions: OUTPUT_EXTENSIONS
                .iter()
                .map(|(source, output)| ((*source).to_string(), (*output).to_string()))
                .collect(),
            browser_overrides: true,
        }
    }
}

impl ResolverConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the extension priority list. Entries without a leading dot get one.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| dotted(e.as_ref()))
            .collect();
        self
    }

    /// Emit files with extension `source` under `output`, replacing any
    /// existing mapping for `source`.
    #[must_use]
    pub fn with_output_extension(mut self, source: &str, output: &str) -> Self {
        let source = dotted(source);
        let output = dotted(output);
        match self.output_extensions.iter_mut().find(|(s, _)| *s == source) {
            Some(entry) => entry.1 = output,
            None => self.output_extensions.push((source, output)),
        }
        self
    }

    /// Enable or disable `browser` field handling.
    #[must_use]
    pub fn with_browser_overrides(mut self, enabled: bool) -> Self {
        self.browser_overrides = enabled;
        self
    }

    /// Extension used for `ext` in the emitted bundle. Unmapped extensions
    /// pass through unchanged.
    #[must_use]
    pub fn output_extension<'a>(&'a self, ext: &'a str) -> &'a str {
        self.output_extensions
            .iter()
            .find(|(source, _)| source == ext)
            .map_or(ext, |(_, output)| output.as_str())
    }
}

fn dotted(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_priority_order() {
        let config = ResolverConfig::default();
        assert_eq!(config.extensions[..4], [".js", ".jsx", ".ts", ".tsx"]);
        assert!(config.browser_overrides);
    }

    #[test]
    fn test_with_extensions_adds_dot() {
        let config = ResolverConfig::new().with_extensions(["ts", ".js"]);
        assert_eq!(config.extensions, vec![".ts", ".js"]);
    }

    #[test]
    fn test_output_extension_map() {
        let config = ResolverConfig::default();
        assert_eq!(config.output_extension(".ts"), ".js");
        assert_eq!(config.output_extension(".tsx"), ".jsx");
        assert_eq!(config.output_extension(".js"), ".js");
        assert_eq!(config.output_extension(".css"), ".css");

        let config = config
            .with_output_extension("scss", ".css")
            .with_output_extension(".ts", ".mjs");
        assert_eq!(config.output_extension(".scss"), ".css");
        assert_eq!(config.output_extension(".ts"), ".mjs");
        assert_eq!(config.output_extension(".tsx"), ".jsx");
    }

    #[test]
    fn test_cli_config_builders() {
        let config = Config::new(PathBuf::from("/p"))
            .with_verbosity(2)
            .with_json_logs(true);
        assert_eq!(config.cwd, PathBuf::from("/p"));
        assert_eq!(config.verbosity, 2);
        assert!(config.json_logs);
    }
}
