use crate::ui::Theme;
use anyhow::{Context, Result};
use ratatui::style::Color;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub source: Option<String>,
    pub docker_bin: String,
    pub opener: String,
    pub exec_shell: String,
    pub theme: Theme,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            source: None,
            docker_bin: "docker".to_string(),
            opener: default_opener().to_string(),
            exec_shell: "bash".to_string(),
            theme: Theme::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigFile {
    #[serde(default, alias = "docker")]
    docker_bin: Option<String>,
    #[serde(default, alias = "browser")]
    opener: Option<String>,
    #[serde(default, alias = "shell")]
    exec_shell: Option<String>,
    #[serde(default)]
    theme: ThemeOverrides,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ThemeOverrides {
    #[serde(default)]
    accent: Option<String>,
    #[serde(default)]
    header: Option<String>,
    #[serde(default)]
    muted: Option<String>,
    #[serde(default)]
    selected_fg: Option<String>,
    #[serde(default)]
    selected_bg: Option<String>,
    #[serde(default)]
    legend: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    spinner: Option<String>,
}

/// Loads the config from `explicit` or from the first discovered location.
/// No file at all means defaults; a file that exists but does not parse is an error.
pub fn load(explicit: Option<&Path>) -> Result<RuntimeConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match discover_config_path() {
            Some(path) => path,
            None => return Ok(RuntimeConfig::default()),
        },
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let mut config =
        parse(&raw).with_context(|| format!("failed to parse config {}", path.display()))?;
    config.source = Some(path.display().to_string());
    Ok(config)
}

pub fn parse(raw: &str) -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::default();
    if raw.trim().is_empty() {
        return Ok(config);
    }

    let parsed: ConfigFile = serde_yaml::from_str(raw).context("invalid YAML")?;
    if let Some(docker_bin) = non_empty(parsed.docker_bin) {
        config.docker_bin = docker_bin;
    }
    if let Some(opener) = non_empty(parsed.opener) {
        config.opener = opener;
    }
    if let Some(exec_shell) = non_empty(parsed.exec_shell) {
        config.exec_shell = exec_shell;
    }

    let theme = &mut config.theme;
    let overrides = parsed.theme;
    apply_color(&mut theme.accent, overrides.accent, "accent")?;
    apply_color(&mut theme.header, overrides.header, "header")?;
    apply_color(&mut theme.muted, overrides.muted, "muted")?;
    apply_color(&mut theme.selected_fg, overrides.selected_fg, "selected_fg")?;
    apply_color(&mut theme.selected_bg, overrides.selected_bg, "selected_bg")?;
    apply_color(&mut theme.legend, overrides.legend, "legend")?;
    apply_color(&mut theme.error, overrides.error, "error")?;
    apply_color(&mut theme.spinner, overrides.spinner, "spinner")?;

    Ok(config)
}

fn apply_color(slot: &mut Color, value: Option<String>, key: &str) -> Result<()> {
    let Some(value) = non_empty(value) else {
        return Ok(());
    };
    *slot = Color::from_str(&value)
        .map_err(|_| anyhow::anyhow!("theme.{key}: unknown color '{value}'"))?;
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn default_opener() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    }
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("T_DOCKER_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("t-docker.yaml"),
        PathBuf::from("t-docker.yml"),
        PathBuf::from(".t-docker.yaml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let user_candidates = [
            PathBuf::from(&home).join(".config/t-docker/config.yaml"),
            PathBuf::from(&home).join(".config/t-docker/config.yml"),
        ];
        for candidate in user_candidates {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::{load, parse};
    use crate::ui::Theme;
    use ratatui::style::Color;
    use std::path::Path;

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse("").expect("empty config");
        assert_eq!(config.docker_bin, "docker");
        assert_eq!(config.exec_shell, "bash");
        assert_eq!(config.theme, Theme::default());
    }

    #[test]
    fn overrides_binaries_and_theme_colors() {
        let raw = "docker_bin: podman\n\
                   shell: sh\n\
                   theme:\n  muted: \"244\"\n  accent: \"#34d399\"\n  error: red\n";
        let config = parse(raw).expect("valid config");
        assert_eq!(config.docker_bin, "podman");
        assert_eq!(config.exec_shell, "sh");
        assert_eq!(config.theme.muted, Color::Indexed(244));
        assert_eq!(config.theme.accent, Color::Rgb(0x34, 0xd3, 0x99));
        assert_eq!(config.theme.error, Color::Red);
        assert_eq!(config.theme.legend, Theme::default().legend);
    }

    #[test]
    fn blank_values_keep_defaults() {
        let config = parse("opener: \"  \"\n").expect("valid config");
        assert!(!config.opener.trim().is_empty());
    }

    #[test]
    fn unknown_color_is_an_error() {
        let error = parse("theme:\n  muted: not-a-colour\n").expect_err("bad color");
        assert!(format!("{error:#}").contains("theme.muted"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let error = load(Some(Path::new("/nonexistent/t-docker.yaml"))).expect_err("missing");
        assert!(format!("{error:#}").contains("failed to read config"));
    }
}
