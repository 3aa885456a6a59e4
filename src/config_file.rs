use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

const PROJECT_FILE: &str = ".keystatrc";

/// Configuration file handler for keystat
#[derive(Debug, Default, PartialEq)]
pub struct ConfigFile {
    pub defaults: Option<String>,
}

impl ConfigFile {
    /// Find project-level .keystatrc by walking up from the current directory
    pub fn find_project_config() -> Option<PathBuf> {
        let current = env::current_dir().ok()?;
        Self::find_project_config_from(&current)
    }

    /// Find project-level .keystatrc by walking up from `start`
    pub fn find_project_config_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let config_path = current.join(PROJECT_FILE);
            if config_path.is_file() {
                return Some(config_path);
            }
            if !current.pop() {
                // Reached filesystem root
                return None;
            }
        }
    }

    /// Get list of user config file locations in order of preference
    pub fn get_user_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if cfg!(windows) {
            if let Ok(appdata) = env::var("APPDATA") {
                paths.push(PathBuf::from(appdata).join("keystat").join("config.ini"));
            }
            if let Ok(userprofile) = env::var("USERPROFILE") {
                paths.push(PathBuf::from(userprofile).join(PROJECT_FILE));
            }
        } else {
            // 1. $XDG_CONFIG_HOME/keystat/config.ini
            // 2. ~/.config/keystat/config.ini
            // 3. ~/.keystatrc
            let home = env::var("HOME").ok().map(PathBuf::from);
            if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
                paths.push(PathBuf::from(xdg).join("keystat").join("config.ini"));
            }
            if let Some(home) = &home {
                let fallback = home.join(".config").join("keystat").join("config.ini");
                if !paths.contains(&fallback) {
                    paths.push(fallback);
                }
                paths.push(home.join(PROJECT_FILE));
            }
        }

        paths
    }

    /// Load configuration with precedence: project > user > built-in defaults
    pub fn load() -> Result<Self> {
        let user = Self::get_user_config_paths().into_iter().find(|p| p.is_file());
        Self::load_layers(user.as_deref(), Self::find_project_config().as_deref())
    }

    fn load_layers(user: Option<&Path>, project: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        for path in [user, project].into_iter().flatten() {
            let layer = Self::load_from_path(path)?;
            config = Self::merge_configs(config, layer);
        }
        Ok(config)
    }

    /// Load configuration with optional custom config file path
    pub fn load_with_custom_path(custom_path: Option<&str>) -> Result<Self> {
        match custom_path {
            Some(path) => Self::load_from_path(Path::new(path)),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Ok(Self::parse_ini_content(&content))
    }

    fn parse_ini_content(content: &str) -> Self {
        let mut defaults = None;
        let mut in_root = true;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                in_root = false;
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                // unknown keys and sections are ignored
                if in_root && key.trim() == "defaults" {
                    defaults = Some(value.trim().to_string());
                }
            }
        }

        Self { defaults }
    }

    /// Merge two configuration objects, with the second taking precedence
    fn merge_configs(base: Self, overlay: Self) -> Self {
        Self {
            defaults: overlay.defaults.or(base.defaults),
        }
    }

    /// Insert the configured default arguments right after the program name
    /// so that explicit command-line arguments override them.
    pub fn process_args(&self, args: Vec<String>) -> Result<Vec<String>> {
        let Some(defaults) = &self.defaults else {
            return Ok(args);
        };

        let default_args = shell_words::split(defaults)
            .context("Invalid defaults: failed to parse arguments")?;

        let mut args = args.into_iter();
        let mut result = Vec::with_capacity(default_args.len() + args.len());
        result.extend(args.next());
        result.extend(default_args);
        result.extend(args);
        Ok(result)
    }
}
