use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::diagram::Direction;

/// Flowchart direction as spelled on the command line.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirection {
    Lr,
    Td,
}

impl From<FlowDirection> for Direction {
    fn from(value: FlowDirection) -> Self {
        match value {
            FlowDirection::Lr => Self::LeftRight,
            FlowDirection::Td => Self::TopDown,
        }
    }
}

/// Defaults that may come from the config files or the command line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub perf: bool,
    pub force_half_cell: bool,
    pub direction: Option<FlowDirection>,
    pub service_url: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub mmdc: Option<PathBuf>,
    pub render_debug_log: Option<PathBuf>,
}

impl ConfigFlags {
    /// Merge `other` over `self`: switches add up, values in `other` win.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            perf: self.perf || other.perf,
            force_half_cell: self.force_half_cell || other.force_half_cell,
            direction: other.direction.or(self.direction),
            service_url: other
                .service_url
                .clone()
                .or_else(|| self.service_url.clone()),
            output_dir: other
                .output_dir
                .clone()
                .or_else(|| self.output_dir.clone()),
            mmdc: other.mmdc.clone().or_else(|| self.mmdc.clone()),
            render_debug_log: other
                .render_debug_log
                .clone()
                .or_else(|| self.render_debug_log.clone()),
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("mindmapper").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("mindmapper")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("mindmapper").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("mindmapper")
                .join("config");
        }
    }

    local_override_path()
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".mindmapperrc")
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# mindmapper defaults (saved with --save)".to_string()];
    if flags.perf {
        lines.push("--perf".to_string());
    }
    if flags.force_half_cell {
        lines.push("--force-half-cell".to_string());
    }
    if let Some(direction) = flags.direction {
        let value = match direction {
            FlowDirection::Lr => "lr",
            FlowDirection::Td => "td",
        };
        lines.push(format!("--direction {value}"));
    }
    if let Some(url) = &flags.service_url {
        lines.push(format!("--service-url {url}"));
    }
    if let Some(dir) = &flags.output_dir {
        lines.push(format!("--output-dir {}", dir.display()));
    }
    if let Some(mmdc) = &flags.mmdc {
        lines.push(format!("--mmdc {}", mmdc.display()));
    }
    if let Some(path) = &flags.render_debug_log {
        lines.push(format!("--render-debug-log {}", path.display()));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the flags this file understands out of a token list. Unknown
/// tokens (positional input, `--save`, ...) are skipped.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let (name, inline) = match token.split_once('=') {
            Some((name, value)) if name.starts_with("--") => (name, Some(value)),
            _ => (token, None),
        };
        let mut value = || {
            inline.map(ToOwned::to_owned).or_else(|| {
                let next = tokens.get(i + 1).cloned();
                if next.is_some() {
                    i += 1;
                }
                next
            })
        };
        match name {
            "--perf" => flags.perf = true,
            "--force-half-cell" => flags.force_half_cell = true,
            "--direction" => flags.direction = value().as_deref().and_then(parse_direction),
            "--service-url" => flags.service_url = value(),
            "--output-dir" => flags.output_dir = value().map(PathBuf::from),
            "--mmdc" => flags.mmdc = value().map(PathBuf::from),
            "--render-debug-log" => flags.render_debug_log = value().map(PathBuf::from),
            _ => {}
        }
        i += 1;
    }
    flags
}

fn parse_direction(s: &str) -> Option<FlowDirection> {
    match s.to_ascii_lowercase().as_str() {
        "lr" => Some(FlowDirection::Lr),
        "td" | "tb" => Some(FlowDirection::Td),
        _ => None,
    }
}
