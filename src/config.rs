//! tierfix configuration.
//!
//! Resolved through a chain, first hit wins:
//!
//! 1. `--config <path>`: explicit; the file must exist
//! 2. `./tierfix.toml`: per-project
//! 3. `~/.tierfix/config.toml`: per-user
//! 4. built-in defaults
//!
//! Every key is optional. Relative store paths resolve under `state-dir`.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

use crate::storage::StorePaths;

/// tierfix configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Directory holding the stores.
    pub state_dir: PathBuf,

    pub manifest: PathBuf,
    pub outcomes: PathBuf,
    pub unresolved_outcomes: PathBuf,
    pub dispatch_map: PathBuf,
    pub human_backlog: PathBuf,

    /// Where dispatch transcripts land, one file per dispatch.
    pub transcripts_dir: PathBuf,

    /// Which files in `transcripts-dir` are transcripts.
    pub transcript_glob: String,

    /// Where `write-batch` puts prompt files.
    pub batch_dir: PathBuf,

    /// How issue ids look inside transcript text.
    pub issue_id_pattern: String,

    /// Automatic re-dispatches an issue gets before it falls to a human.
    pub max_escalations: u32,

    /// Stripped from file paths in human-facing output.
    pub path_prefix: Option<String>,

    pub campaign: CampaignConfig,

    /// Ordered path conventions for deriving a module from a file path.
    pub module_conventions: Vec<ModuleConvention>,

    /// Ordered path markers for inferring a project tag.
    pub projects: Vec<ProjectMarker>,
}

/// Campaign size limits, in distinct files per campaign.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CampaignConfig {
    pub mechanical_max_files: usize,
    pub max_files: usize,
}

/// A path regex whose first capture group names the module.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleConvention {
    pub pattern: String,
    #[serde(default)]
    pub strip_suffix: Option<String>,
}

/// Files whose path contains `marker` belong to project `name`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectMarker {
    pub name: String,
    pub marker: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".tierfix"),
            manifest: PathBuf::from("lint-manifest.json"),
            outcomes: PathBuf::from("lint-outcomes.json"),
            unresolved_outcomes: PathBuf::from("lint-unresolved-outcomes.json"),
            dispatch_map: PathBuf::from("task-issue-map.json"),
            human_backlog: PathBuf::from("lint-human-backlog.md"),
            transcripts_dir: PathBuf::from("transcripts"),
            transcript_glob: "*.output".to_string(),
            batch_dir: PathBuf::from("batch-prompts"),
            issue_id_pattern: r"lint-\d{4}".to_string(),
            max_escalations: 2,
            path_prefix: None,
            campaign: CampaignConfig::default(),
            module_conventions: default_module_conventions(),
            projects: Vec::new(),
        }
    }
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            mechanical_max_files: 40,
            max_files: 25,
        }
    }
}

fn default_module_conventions() -> Vec<ModuleConvention> {
    vec![
        // Angular apps: src/app/<module>/
        ModuleConvention {
            pattern: "/src/app/([^/]+)/".to_string(),
            strip_suffix: None,
        },
        // Monorepos: packages/<package>/
        ModuleConvention {
            pattern: "/packages/([^/]+)/".to_string(),
            strip_suffix: None,
        },
        // Rust crates: src/<module>/ or src/<module>.rs
        ModuleConvention {
            pattern: "/src/([^/]+)".to_string(),
            strip_suffix: Some(".rs".to_string()),
        },
    ]
}

impl Config {
    /// Load config through the resolution chain.
    pub fn load(explicit: Option<&Path>) -> Result<Self, String> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(format!("no config file found at {}", path.display()));
            }
            return Self::from_file(path);
        }

        let local = PathBuf::from("tierfix.toml");
        if local.exists() {
            return Self::from_file(&local);
        }

        if let Some(path) = Self::user_path()
            && path.exists()
        {
            return Self::from_file(&path);
        }

        tracing::debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    /// The per-user config path: `~/.tierfix/config.toml`.
    pub fn user_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".tierfix").join("config.toml"))
    }

    fn from_file(path: &Path) -> Result<Self, String> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;

        let config = Self::parse(&contents)
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse and validate config text.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(contents).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        self.issue_id_regex()?;
        for convention in &self.module_conventions {
            Regex::new(&convention.pattern)
                .map_err(|e| format!("invalid module convention '{}': {e}", convention.pattern))?;
        }
        if self.campaign.mechanical_max_files == 0 || self.campaign.max_files == 0 {
            return Err("campaign file limits must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn issue_id_regex(&self) -> Result<Regex, String> {
        Regex::new(&self.issue_id_pattern)
            .map_err(|e| format!("invalid issue-id-pattern '{}': {e}", self.issue_id_pattern))
    }

    /// Resolve a configured path under `state-dir` unless it is absolute.
    pub fn in_state_dir(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.state_dir.join(path)
        }
    }

    pub fn store_paths(&self) -> StorePaths {
        StorePaths {
            manifest: self.in_state_dir(&self.manifest),
            outcomes: self.in_state_dir(&self.outcomes),
            unresolved_outcomes: self.in_state_dir(&self.unresolved_outcomes),
            dispatch_map: self.in_state_dir(&self.dispatch_map),
        }
    }

    /// Strip the configured prefix for display.
    pub fn display_path<'a>(&self, path: &'a str) -> &'a str {
        self.path_prefix
            .as_deref()
            .and_then(|prefix| path.strip_prefix(prefix))
            .unwrap_or(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.max_escalations, 2);
        assert_eq!(config.campaign.mechanical_max_files, 40);
        assert_eq!(config.campaign.max_files, 25);
        assert_eq!(config.module_conventions.len(), 3);
        assert_eq!(
            config.store_paths().manifest,
            PathBuf::from(".tierfix/lint-manifest.json")
        );
    }

    #[test]
    fn parses_kebab_case_keys() {
        let config = Config::parse(
            r#"
            state-dir = "/srv/lint"
            transcripts-dir = "/tmp/tasks"
            issue-id-pattern = "ISSUE-[0-9]+"
            max-escalations = 1
            path-prefix = "/projects/app/"

            [campaign]
            max-files = 10

            [[module-conventions]]
            pattern = "/lib/([^/]+)/"

            [[projects]]
            name = "web"
            marker = "/web/"
            "#,
        )
        .unwrap();

        assert_eq!(config.state_dir, PathBuf::from("/srv/lint"));
        assert_eq!(
            config.in_state_dir(&config.transcripts_dir),
            PathBuf::from("/tmp/tasks")
        );
        assert_eq!(config.campaign.max_files, 10);
        assert_eq!(config.campaign.mechanical_max_files, 40);
        assert_eq!(config.module_conventions.len(), 1);
        assert_eq!(config.projects[0].name, "web");
        assert_eq!(config.display_path("/projects/app/src/x.ts"), "src/x.ts");
        assert_eq!(config.display_path("/elsewhere/x.ts"), "/elsewhere/x.ts");
    }

    #[test]
    fn rejects_invalid_regex() {
        let err = Config::parse(r#"issue-id-pattern = "lint-(""#).unwrap_err();
        assert!(err.contains("issue-id-pattern"));

        let err = Config::parse(
            r#"
            [[module-conventions]]
            pattern = "(["
            "#,
        )
        .unwrap_err();
        assert!(err.contains("module convention"));
    }

    #[test]
    fn rejects_zero_campaign_limit() {
        let err = Config::parse("[campaign]\nmax-files = 0").unwrap_err();
        assert!(err.contains("at least 1"));
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Config::load(Some(&missing)).unwrap_err();
        assert!(err.contains("no config file found"));

        let present = dir.path().join("tierfix.toml");
        fs::write(&present, "max-escalations = 5").unwrap();
        assert_eq!(Config::load(Some(&present)).unwrap().max_escalations, 5);
    }
}
