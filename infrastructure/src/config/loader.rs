//! Configuration file loader with multi-source merging

use super::file_config::{ConfigError, FileConfig};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "webpilot";
const PROJECT_FILES: [&str; 2] = ["webpilot.toml", ".webpilot.toml"];
const ENV_PREFIX: &str = "WEBPILOT_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. Environment: `WEBPILOT_<SECTION>__<KEY>` (e.g. `WEBPILOT_AGENT__MAX_CYCLES=10`)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./webpilot.toml` or `./.webpilot.toml`
    /// 4. XDG config: `$XDG_CONFIG_HOME/webpilot/config.toml`
    /// 5. Default values
    ///
    /// CLI flags are applied on top by the caller.
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, ConfigError> {
        if let Some(path) = config_path
            && !path.exists()
        {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let global = Self::global_config_path().filter(|p| p.exists());
        let project = Self::project_config_path();

        Self::figment(global.as_deref(), project.as_deref(), config_path)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// File layers only, in merge order
    fn figment(global: Option<&Path>, project: Option<&Path>, explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        for path in [global, project, explicit].into_iter().flatten() {
            figment = figment.merge(Toml::file(path));
        }

        figment
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Get the global config file path
    ///
    /// Returns XDG_CONFIG_HOME/webpilot/config.toml if set,
    /// otherwise falls back to ~/.config/webpilot/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Describe the config sources being used (for --show-config)
    pub fn describe_sources(config_path: Option<&Path>) -> Vec<String> {
        let mut lines = vec!["Configuration sources (in priority order):".to_string()];

        lines.push(format!("  [ENV  ] Environment: {}<SECTION>__<KEY>", ENV_PREFIX));

        if let Some(path) = config_path {
            let mark = if path.exists() { "FOUND" } else { "MISS " };
            lines.push(format!("  [{}] Explicit: {}", mark, path.display()));
        }

        match Self::project_config_path() {
            Some(path) => lines.push(format!("  [FOUND] Project: {}", path.display())),
            None => lines.push("  [     ] Project: ./webpilot.toml or ./.webpilot.toml".to_string()),
        }

        if let Some(path) = Self::global_config_path() {
            let mark = if path.exists() { "FOUND" } else { "     " };
            lines.push(format!("  [{}] Global:  {}", mark, path.display()));
        }

        lines.push("  [     ] Default: built-in defaults".to_string());
        lines
    }

    /// Print the config file locations being used (for debugging)
    pub fn print_config_sources(config_path: Option<&Path>) {
        for line in Self::describe_sources(config_path) {
            println!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.agent.max_cycles, 25);
        assert!(config.browser.headless);
        assert_eq!(config.models.candidates.len(), 6);
    }

    #[test]
    fn test_global_config_path_returns_some() {
        // Should return a path (even if file doesn't exist)
        let path = ConfigLoader::global_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.ends_with("webpilot/config.toml"));
    }

    #[test]
    fn test_file_layers_override_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.toml");
        let project = dir.path().join("project.toml");
        let explicit = dir.path().join("explicit.toml");

        fs::write(
            &global,
            "[agent]\nmax_cycles = 5\nhistory_window = 2\n[browser]\nheadless = false\n",
        )
        .unwrap();
        fs::write(&project, "[agent]\nmax_cycles = 7\n").unwrap();
        fs::write(&explicit, "[agent]\nhistory_window = 9\n").unwrap();

        let config: FileConfig = ConfigLoader::figment(
            Some(global.as_path()),
            Some(project.as_path()),
            Some(explicit.as_path()),
        )
        .extract()
        .unwrap();

        assert_eq!(config.agent.max_cycles, 7);
        assert_eq!(config.agent.history_window, 9);
        assert!(!config.browser.headless);
        // Untouched keys keep their defaults
        assert_eq!(config.agent.max_action_failures, 3);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = ConfigLoader::load(Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(p) if p == missing));
    }

    #[test]
    fn test_invalid_toml_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[agent]\nmax_cycles = \"many\"\n").unwrap();

        let result: Result<FileConfig, _> =
            ConfigLoader::figment(None, None, Some(path.as_path())).extract();
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides_files() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "webpilot.toml",
                "[agent]\nmax_cycles = 7\n[browser]\nstart_url = \"https://example.com\"\n",
            )?;
            jail.set_env("WEBPILOT_AGENT__MAX_CYCLES", "11");
            jail.set_env("WEBPILOT_BROWSER__HEADLESS", "false");

            let config = ConfigLoader::load(None).map_err(|e| e.to_string())?;
            assert_eq!(config.agent.max_cycles, 11);
            assert!(!config.browser.headless);
            assert_eq!(config.browser.start_url, "https://example.com");
            Ok(())
        });
    }

    #[test]
    fn test_describe_sources_lists_layers() {
        let lines = ConfigLoader::describe_sources(Some(Path::new("/no/such/file.toml")));
        assert!(lines[0].starts_with("Configuration sources"));
        assert!(lines.iter().any(|l| l.contains("WEBPILOT_")));
        assert!(lines.iter().any(|l| l.contains("[MISS ] Explicit: /no/such/file.toml")));
        assert!(lines.last().unwrap().contains("Default"));
    }
}
