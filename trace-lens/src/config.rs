use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::error::TraceLensError;

/// File name looked up at the workspace root by [`TraceLensConfig::load`].
pub const CONFIG_FILE_NAME: &str = "trace-lens.toml";

/// Configuration for test extraction and trace lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceLensConfig {
    /// Directory holding trace snapshots, relative to the workspace root
    #[serde(default = "default_traces_dir")]
    pub traces_dir: String,

    /// Bare callee names that declare a test group or test case
    #[serde(default = "default_test_functions")]
    pub test_functions: Vec<String>,

    /// Tag helper: any `tag(...).name(title, body)` call is a declaration
    #[serde(default = "default_tag_function")]
    pub tag_function: String,

    /// Accepted `name.<modifier>(title, body)` suffixes
    #[serde(default = "default_modifiers")]
    pub modifiers: Vec<String>,

    /// Treat a source with syntax errors as having no tests at all
    #[serde(default = "default_true")]
    pub require_clean_parse: bool,
}

fn default_traces_dir() -> String {
    "traces".to_string()
}

fn default_test_functions() -> Vec<String> {
    vec!["describe".to_string(), "it".to_string()]
}

fn default_tag_function() -> String {
    "tags".to_string()
}

fn default_modifiers() -> Vec<String> {
    vec!["only".to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for TraceLensConfig {
    fn default() -> Self {
        Self {
            traces_dir: default_traces_dir(),
            test_functions: default_test_functions(),
            tag_function: default_tag_function(),
            modifiers: default_modifiers(),
            require_clean_parse: default_true(),
        }
    }
}

impl TraceLensConfig {
    /// Load `trace-lens.toml` from the workspace root, falling back to the
    /// defaults when the file does not exist.
    pub fn load(workspace_root: &Path) -> Result<Self> {
        let path = workspace_root.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            debug!("no {CONFIG_FILE_NAME} under {}; using defaults", workspace_root.display());
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
            .map_err(|err| TraceLensError::Config(format!("{}: {err}", path.display())))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|err| TraceLensError::Config(err.to_string()))?;
        config.validate().map_err(TraceLensError::Config)?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.test_functions.iter().all(|name| name.trim().is_empty()) {
            return Err("test_functions must name at least one function".into());
        }

        if self.tag_function.trim().is_empty() {
            return Err("tag_function must not be empty".into());
        }

        let traces_dir = Path::new(&self.traces_dir);
        if self.traces_dir.trim().is_empty() || traces_dir.is_absolute() {
            return Err("traces_dir must be a non-empty path relative to the workspace".into());
        }

        Ok(())
    }

    pub fn traces_path(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(&self.traces_dir)
    }

    pub(crate) fn is_test_function(&self, name: &str) -> bool {
        self.test_functions.iter().any(|candidate| candidate == name)
    }

    pub(crate) fn is_modifier(&self, name: &str) -> bool {
        self.modifiers.iter().any(|candidate| candidate == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_is_valid() {
        let config = TraceLensConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.traces_dir, "traces");
        assert!(config.is_test_function("describe"));
        assert!(config.is_test_function("it"));
        assert!(!config.is_test_function("test"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TraceLensConfig::from_toml_str(
            r#"
traces_dir = "out/traces"
test_functions = ["describe", "it", "test"]
"#,
        )
        .unwrap();

        assert_eq!(config.traces_dir, "out/traces");
        assert!(config.is_test_function("test"));
        assert_eq!(config.tag_function, "tags");
        assert_eq!(config.modifiers, vec!["only".to_string()]);
        assert!(config.require_clean_parse);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = TraceLensConfig::from_toml_str("trace_dir = \"x\"").unwrap_err();
        assert!(matches!(err, TraceLensError::Config(_)));
    }

    #[test]
    fn test_invalid_config() {
        let mut config = TraceLensConfig::default();
        config.test_functions.clear();
        assert!(config.validate().is_err());

        let mut config = TraceLensConfig::default();
        config.traces_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TraceLensConfig::load(dir.path()).unwrap();
        assert_eq!(config, TraceLensConfig::default());
    }

    #[test]
    fn test_load_reads_workspace_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "tag_function = \"labels\"\n").unwrap();
        let config = TraceLensConfig::load(dir.path()).unwrap();
        assert_eq!(config.tag_function, "labels");
        assert_eq!(config.traces_path(dir.path()), dir.path().join("traces"));
    }
}
